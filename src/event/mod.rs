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

use serde::{Deserialize, Serialize};

use crate::types::Price;

/// Events produced by the matching engine
///
/// Each match step emits a fixed sequence: the trade itself, then the
/// fill notice for the aggressive order, then the fill notice for the
/// resting order. `Display` renders the wire form carried on the logger
/// `out` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
	/// A trade executed at the maker's price (wire tag 2)
	Trade { quantity: u64, price: Price },
	/// An order was completely filled (wire tag 3)
	Filled { order_id: u64 },
	/// An order was partially filled; carries the remaining open
	/// quantity (wire tag 4)
	PartiallyFilled { order_id: u64, remaining: u64 },
}

impl fmt::Display for EngineEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			EngineEvent::Trade { quantity, price } => {
				write!(f, "2,{quantity},{price}")
			}
			EngineEvent::Filled { order_id } => write!(f, "3,{order_id}"),
			EngineEvent::PartiallyFilled {
				order_id,
				remaining,
			} => write!(f, "4,{order_id},{remaining}"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_wire_form() {
		let price = "100.00".parse::<Price>().unwrap();
		assert_eq!(
			EngineEvent::Trade {
				quantity: 5,
				price
			}
			.to_string(),
			"2,5,100.00"
		);
		assert_eq!(EngineEvent::Filled { order_id: 11 }.to_string(), "3,11");
		assert_eq!(
			EngineEvent::PartiallyFilled {
				order_id: 22,
				remaining: 7
			}
			.to_string(),
			"4,22,7"
		);
	}
}
