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

use thiserror::Error;

use crate::types::{Order, OrderCommand, ParsePriceError, Price, Side};

/// Rejection reasons for a tokenized message
///
/// The rendered message is what reaches the diagnostic stream; tests
/// match on substrings, not on the exact format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidateError {
	#[error("empty message")]
	Empty,
	#[error("invalid message format: unrecognized tag {0:?}")]
	UnknownTag(String),
	#[error("invalid message format: expected {expected} fields for tag {tag}, got {got}")]
	FieldCount {
		tag: char,
		expected: usize,
		got: usize,
	},
	#[error("invalid order: malformed order id {0:?}")]
	OrderId(String),
	#[error("invalid order: unknown side {0:?}")]
	SideField(String),
	#[error("invalid order: quantity is negative")]
	NegativeQuantity,
	#[error("invalid order: malformed quantity {0:?}")]
	Quantity(String),
	#[error("invalid order: quantity is zero")]
	ZeroQuantity,
	#[error("invalid order: {0}")]
	Price(#[from] ParsePriceError),
	#[error("invalid order: price must be positive")]
	ZeroPrice,
}

/// Strict base-10 parse: digits only, so a sign or any other stray
/// character rejects instead of wrapping or being tolerated.
fn parse_u64_strict(field: &str) -> Option<u64> {
	if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	field.parse().ok()
}

/// Turn a token list into a typed command
///
/// Wire grammar:
/// - `0,<order_id>,<side>,<quantity>,<price>` places an order; `side`
///   is the literal `0` (buy) or `1` (sell)
/// - `1,<order_id>` cancels an order
///
/// Quantity and price both get an explicit leading-sign check before
/// the numeric parse, so negative values are reported as negative
/// rather than as generic parse failures.
pub fn validate(tokens: &[String]) -> Result<OrderCommand, ValidateError> {
	let Some(tag) = tokens.first() else {
		return Err(ValidateError::Empty);
	};

	match tag.as_str() {
		"0" => {
			if tokens.len() != 5 {
				return Err(ValidateError::FieldCount {
					tag: '0',
					expected: 5,
					got: tokens.len(),
				});
			}

			let order_id = parse_u64_strict(&tokens[1])
				.ok_or_else(|| ValidateError::OrderId(tokens[1].clone()))?;

			let side = match tokens[2].as_str() {
				"0" => Side::Buy,
				"1" => Side::Sell,
				other => return Err(ValidateError::SideField(other.to_string())),
			};

			let quantity_field = &tokens[3];
			if quantity_field.starts_with('-') {
				return Err(ValidateError::NegativeQuantity);
			}
			let quantity = parse_u64_strict(quantity_field)
				.ok_or_else(|| ValidateError::Quantity(quantity_field.clone()))?;
			if quantity == 0 {
				return Err(ValidateError::ZeroQuantity);
			}

			let price = tokens[4].parse::<Price>()?;
			if price.ticks() == 0 {
				return Err(ValidateError::ZeroPrice);
			}

			Ok(OrderCommand::Add(Order {
				order_id,
				quantity,
				price,
				side,
			}))
		}
		"1" => {
			if tokens.len() != 2 {
				return Err(ValidateError::FieldCount {
					tag: '1',
					expected: 2,
					got: tokens.len(),
				});
			}
			let order_id = parse_u64_strict(&tokens[1])
				.ok_or_else(|| ValidateError::OrderId(tokens[1].clone()))?;
			Ok(OrderCommand::Cancel { order_id })
		}
		other => Err(ValidateError::UnknownTag(other.to_string())),
	}
}
