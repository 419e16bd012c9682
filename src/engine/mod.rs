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

use tracing::debug;

use crate::event::EngineEvent;
use crate::logger::LoggerHandle;
use crate::orderbook::OrderBook;
use crate::types::{Order, OrderCommand};

/// Single-threaded matching core
///
/// The engine owns the book exclusively and applies commands one at a
/// time on the engine stage thread; identical input sequences produce
/// identical event sequences.
///
/// Matching applies strict price-time priority: better-priced levels
/// match first, and within a level the oldest order matches first. The
/// trade always prints at the resting (maker) price. Rejections
/// (duplicate add, unknown cancel) leave the book untouched and surface
/// only as diagnostics on the logger `err` channel.
pub struct MatchingEngine {
	book: OrderBook,
	logger: LoggerHandle,
}

impl MatchingEngine {
	pub fn new(logger: LoggerHandle) -> Self {
		Self {
			book: OrderBook::new(),
			logger,
		}
	}

	/// Apply a validated command
	pub fn apply(&mut self, command: OrderCommand) {
		match command {
			OrderCommand::Add(order) => self.add_order(order),
			OrderCommand::Cancel { order_id } => self.cancel_order(order_id),
		}
	}

	/// Place an order: match against the opposite side, then rest any
	/// remainder at its limit price
	pub fn add_order(&mut self, order: Order) {
		if self.book.contains(order.order_id) {
			self.logger
				.log_err(format!("duplicate order id: {}", order.order_id));
			return;
		}

		let mut taker = order;
		self.match_order(&mut taker);
		if taker.quantity > 0 {
			self.book.insert(taker);
		}
		debug!(
			target: "engine",
			order_id = order.order_id,
			resting = taker.quantity,
			"order processed"
		);
		debug_assert_eq!(self.book.verify_integrity(), Ok(()));
	}

	/// Remove a resting order
	pub fn cancel_order(&mut self, order_id: u64) {
		match self.book.cancel(order_id) {
			Some(_) => {
				debug!(target: "engine", order_id, "order cancelled");
			}
			None => {
				self.logger.log_err(format!("order not found: {order_id}"));
			}
		}
		debug_assert_eq!(self.book.verify_integrity(), Ok(()));
	}

	/// Match loop: walk the opposite side best level first while the
	/// taker has quantity and still crosses
	///
	/// Every step emits, in order, the trade, the taker's fill notice,
	/// then the maker's fill notice.
	fn match_order(&mut self, taker: &mut Order) {
		let logger = self.logger.clone();

		while taker.quantity > 0 {
			let (opposite, index) = self.book.opposite_mut(taker.side);
			let Some(level) = opposite.best_level_mut() else {
				break;
			};
			let maker_price = level.price();
			if !taker.side.crosses(taker.price, maker_price) {
				break;
			}
			let Some(maker) = level.front().copied() else {
				break;
			};

			// Maker price wins; trade size is what both can give.
			let trade_quantity = taker.quantity.min(maker.quantity);
			emit(
				&logger,
				EngineEvent::Trade {
					quantity: trade_quantity,
					price: maker_price,
				},
			);

			taker.quantity -= trade_quantity;
			if taker.quantity > 0 {
				emit(
					&logger,
					EngineEvent::PartiallyFilled {
						order_id: taker.order_id,
						remaining: taker.quantity,
					},
				);
			} else {
				emit(
					&logger,
					EngineEvent::Filled {
						order_id: taker.order_id,
					},
				);
			}

			let remaining = level.fill_front(trade_quantity).unwrap_or(0);
			if remaining == 0 {
				emit(
					&logger,
					EngineEvent::Filled {
						order_id: maker.order_id,
					},
				);
				index.remove(&maker.order_id);
				opposite.remove_level_if_empty(maker_price);
			} else {
				emit(
					&logger,
					EngineEvent::PartiallyFilled {
						order_id: maker.order_id,
						remaining,
					},
				);
				if let Some(entry) = index.get_mut(&maker.order_id) {
					entry.quantity = remaining;
				}
			}
		}
	}

	pub fn book(&self) -> &OrderBook {
		&self.book
	}
}

fn emit(logger: &LoggerHandle, event: EngineEvent) {
	logger.log_out(event.to_string());
}
