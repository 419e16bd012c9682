// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
	Buy,
	Sell,
}

impl Side {
	pub fn opposite(self) -> Side {
		match self {
			Side::Buy => Side::Sell,
			Side::Sell => Side::Buy,
		}
	}

	/// Whether a taker at `taker_price` on this side crosses a maker
	/// resting at `maker_price` on the opposite side.
	pub fn crosses(self, taker_price: Price, maker_price: Price) -> bool {
		match self {
			Side::Buy => taker_price >= maker_price,
			Side::Sell => taker_price <= maker_price,
		}
	}
}

/// Limit price in ticks of one hundredth.
///
/// The wire format is a decimal with two fractional digits. Prices are
/// scaled to integer ticks at parse time so that textually equal prices
/// are identical map keys; the decimal form exists only at the I/O edge.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Price(u64);

impl Price {
	pub fn from_ticks(ticks: u64) -> Self {
		Price(ticks)
	}

	pub fn ticks(self) -> u64 {
		self.0
	}
}

impl fmt::Display for Price {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
	}
}

/// Errors from parsing the decimal wire form of a price
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsePriceError {
	#[error("price is negative")]
	Negative,
	#[error("malformed price")]
	Malformed,
	#[error("price out of range")]
	OutOfRange,
}

impl FromStr for Price {
	type Err = ParsePriceError;

	/// Parses `<digits>[.<digits>]` into ticks, rounding half away from
	/// zero at the second fractional digit. A leading sign is rejected
	/// outright; the sign check must not rely on the integer parse.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.starts_with('-') {
			return Err(ParsePriceError::Negative);
		}
		let (int_part, frac_part) = match s.split_once('.') {
			Some((int_part, frac_part)) => (int_part, frac_part),
			None => (s, ""),
		};
		if int_part.is_empty() && frac_part.is_empty() {
			return Err(ParsePriceError::Malformed);
		}
		let all_digits =
			|field: &str| field.bytes().all(|b| b.is_ascii_digit());
		if !all_digits(int_part) || !all_digits(frac_part) {
			return Err(ParsePriceError::Malformed);
		}

		let whole: u64 = if int_part.is_empty() {
			0
		} else {
			int_part.parse().map_err(|_| ParsePriceError::OutOfRange)?
		};

		let mut frac = frac_part.bytes();
		let tens = u64::from(frac.next().unwrap_or(b'0') - b'0');
		let units = u64::from(frac.next().unwrap_or(b'0') - b'0');
		let round_up = frac.next().is_some_and(|b| b >= b'5');

		whole
			.checked_mul(100)
			.and_then(|t| t.checked_add(tens * 10 + units))
			.and_then(|t| t.checked_add(u64::from(round_up)))
			.map(Price)
			.ok_or(ParsePriceError::OutOfRange)
	}
}

/// A live limit order.
///
/// Constructed by the validator and owned by the book from insertion
/// until it is fully filled or cancelled. `quantity` is the remaining
/// open quantity and is strictly positive while the order rests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
	pub order_id: u64,
	pub quantity: u64,
	pub price: Price,
	pub side: Side,
}

/// Typed operation handed from the validator to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
	/// Place a new order (wire tag 0)
	Add(Order),
	/// Remove a resting order (wire tag 1)
	Cancel { order_id: u64 },
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_price_parse_two_fraction_digits() {
		assert_eq!("100.00".parse(), Ok(Price::from_ticks(10_000)));
		assert_eq!("100.05".parse(), Ok(Price::from_ticks(10_005)));
		assert_eq!("0.01".parse(), Ok(Price::from_ticks(1)));
	}

	#[test]
	fn test_price_parse_short_forms() {
		assert_eq!("100".parse(), Ok(Price::from_ticks(10_000)));
		assert_eq!("100.5".parse(), Ok(Price::from_ticks(10_050)));
		assert_eq!("100.".parse(), Ok(Price::from_ticks(10_000)));
		assert_eq!(".25".parse(), Ok(Price::from_ticks(25)));
	}

	#[test]
	fn test_price_parse_rounds_half_away_from_zero() {
		assert_eq!("1.005".parse(), Ok(Price::from_ticks(101)));
		assert_eq!("1.004".parse(), Ok(Price::from_ticks(100)));
		assert_eq!("1.0049".parse(), Ok(Price::from_ticks(100)));
		assert_eq!("99.999".parse(), Ok(Price::from_ticks(10_000)));
	}

	#[test]
	fn test_price_parse_rejects_sign_and_garbage() {
		assert_eq!(
			"-100.00".parse::<Price>(),
			Err(ParsePriceError::Negative)
		);
		assert_eq!("".parse::<Price>(), Err(ParsePriceError::Malformed));
		assert_eq!(".".parse::<Price>(), Err(ParsePriceError::Malformed));
		assert_eq!("1e3".parse::<Price>(), Err(ParsePriceError::Malformed));
		assert_eq!(
			"10,0".parse::<Price>(),
			Err(ParsePriceError::Malformed)
		);
		assert_eq!(
			"+100.00".parse::<Price>(),
			Err(ParsePriceError::Malformed)
		);
	}

	#[test]
	fn test_price_display_matches_wire_form() {
		assert_eq!(Price::from_ticks(10_000).to_string(), "100.00");
		assert_eq!(Price::from_ticks(9_905).to_string(), "99.05");
		assert_eq!(Price::from_ticks(7).to_string(), "0.07");
	}

	#[test]
	fn test_side_crossing() {
		let p = |s: &str| s.parse::<Price>().unwrap();
		assert!(Side::Buy.crosses(p("100.00"), p("99.00")));
		assert!(Side::Buy.crosses(p("100.00"), p("100.00")));
		assert!(!Side::Buy.crosses(p("99.00"), p("100.00")));
		assert!(Side::Sell.crosses(p("99.00"), p("100.00")));
		assert!(!Side::Sell.crosses(p("101.00"), p("100.00")));
	}
}
