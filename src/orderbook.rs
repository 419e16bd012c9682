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

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::types::{Order, Price, Side};

/// Secondary index over resting orders: id to the order's recorded side,
/// price and latest open quantity. Used to route cancels and to reflect
/// residual quantity after partial fills.
pub type OrderIndex = HashMap<u64, Order>;

/// Price level in the order book
///
/// A price level holds all resting orders at one price in time priority
/// (first in, first out), plus the maintained total open quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceLevel {
	price: Price,
	orders: VecDeque<Order>,
	total_quantity: u64,
}

impl PriceLevel {
	fn new(price: Price) -> Self {
		Self {
			price,
			orders: VecDeque::new(),
			total_quantity: 0,
		}
	}

	pub fn price(&self) -> Price {
		self.price
	}

	pub fn add_order(&mut self, order: Order) {
		self.total_quantity += order.quantity;
		self.orders.push_back(order);
	}

	pub fn remove_order(&mut self, order_id: u64) -> Option<Order> {
		let pos = self.orders.iter().position(|o| o.order_id == order_id)?;
		let order = self.orders.remove(pos)?;
		self.total_quantity -= order.quantity;
		Some(order)
	}

	pub fn front(&self) -> Option<&Order> {
		self.orders.front()
	}

	/// Reduce the front order by `quantity`, popping it when exhausted
	///
	/// Returns the front order's remaining quantity. The caller must not
	/// pass more than the front order currently holds.
	pub fn fill_front(&mut self, quantity: u64) -> Option<u64> {
		let order = self.orders.front_mut()?;
		order.quantity -= quantity;
		self.total_quantity -= quantity;
		let remaining = order.quantity;
		if remaining == 0 {
			self.orders.pop_front();
		}
		Some(remaining)
	}

	pub fn is_empty(&self) -> bool {
		self.orders.is_empty()
	}

	pub fn order_count(&self) -> usize {
		self.orders.len()
	}

	pub fn total_quantity(&self) -> u64 {
		self.total_quantity
	}

	pub fn orders(&self) -> impl Iterator<Item = &Order> {
		self.orders.iter()
	}
}

/// One side of the book: price levels ordered best-first
///
/// Both sides share this implementation; only which end of the map is
/// "best" differs (highest price for bids, lowest for asks). Levels are
/// keyed by price ticks so textually equal prices land on one level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSide {
	side: Side,
	levels: BTreeMap<u64, PriceLevel>,
}

impl BookSide {
	pub fn new(side: Side) -> Self {
		Self {
			side,
			levels: BTreeMap::new(),
		}
	}

	pub fn side(&self) -> Side {
		self.side
	}

	pub fn add_order(&mut self, order: Order) {
		self.levels
			.entry(order.price.ticks())
			.or_insert_with(|| PriceLevel::new(order.price))
			.add_order(order);
	}

	/// Remove an order resting at a known price; drops the level when it
	/// becomes empty
	pub fn remove_order(&mut self, price: Price, order_id: u64) -> Option<Order> {
		let level = self.levels.get_mut(&price.ticks())?;
		let order = level.remove_order(order_id);
		if level.is_empty() {
			self.levels.remove(&price.ticks());
		}
		order
	}

	/// Best price on this side, if any
	pub fn best_price(&self) -> Option<Price> {
		match self.side {
			Side::Buy => self.levels.last_key_value(),
			Side::Sell => self.levels.first_key_value(),
		}
		.map(|(_, level)| level.price())
	}

	/// Mutable access to the best level
	pub fn best_level_mut(&mut self) -> Option<&mut PriceLevel> {
		match self.side {
			Side::Buy => self.levels.last_entry().map(|entry| entry.into_mut()),
			Side::Sell => self.levels.first_entry().map(|entry| entry.into_mut()),
		}
	}

	/// Drop the level at `price` if it holds no orders
	pub fn remove_level_if_empty(&mut self, price: Price) {
		if self
			.levels
			.get(&price.ticks())
			.is_some_and(PriceLevel::is_empty)
		{
			self.levels.remove(&price.ticks());
		}
	}

	pub fn level(&self, price: Price) -> Option<&PriceLevel> {
		self.levels.get(&price.ticks())
	}

	pub fn levels(&self) -> impl Iterator<Item = &PriceLevel> {
		self.levels.values()
	}

	pub fn is_empty(&self) -> bool {
		self.levels.is_empty()
	}

	pub fn order_count(&self) -> usize {
		self.levels.values().map(PriceLevel::order_count).sum()
	}
}

/// Single-instrument limit order book (single-threaded)
///
/// Owns both sides and the order index. All operations run on the
/// engine thread; there is no concurrent access and no locking.
///
/// Between operations the following hold:
/// - every indexed id rests exactly once, on its recorded side at its
///   recorded price, with the recorded quantity
/// - no resting order has zero quantity and no level is empty
/// - the best bid is strictly below the best ask
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBook {
	bids: BookSide,
	asks: BookSide,
	index: OrderIndex,
}

impl OrderBook {
	pub fn new() -> Self {
		Self {
			bids: BookSide::new(Side::Buy),
			asks: BookSide::new(Side::Sell),
			index: OrderIndex::new(),
		}
	}

	pub fn contains(&self, order_id: u64) -> bool {
		self.index.contains_key(&order_id)
	}

	/// Rest an order on its own side and record it in the index
	pub fn insert(&mut self, order: Order) {
		match order.side {
			Side::Buy => self.bids.add_order(order),
			Side::Sell => self.asks.add_order(order),
		}
		self.index.insert(order.order_id, order);
	}

	/// Remove a resting order via the index; `None` when unknown
	pub fn cancel(&mut self, order_id: u64) -> Option<Order> {
		let entry = self.index.remove(&order_id)?;
		let book = match entry.side {
			Side::Buy => &mut self.bids,
			Side::Sell => &mut self.asks,
		};
		book.remove_order(entry.price, order_id)
	}

	/// The side an aggressive order on `taker_side` matches against,
	/// together with the index (the match loop updates both in step)
	pub fn opposite_mut(&mut self, taker_side: Side) -> (&mut BookSide, &mut OrderIndex) {
		match taker_side {
			Side::Buy => (&mut self.asks, &mut self.index),
			Side::Sell => (&mut self.bids, &mut self.index),
		}
	}

	pub fn bids(&self) -> &BookSide {
		&self.bids
	}

	pub fn asks(&self) -> &BookSide {
		&self.asks
	}

	pub fn best_bid(&self) -> Option<Price> {
		self.bids.best_price()
	}

	pub fn best_ask(&self) -> Option<Price> {
		self.asks.best_price()
	}

	pub fn order_count(&self) -> usize {
		self.bids.order_count() + self.asks.order_count()
	}

	pub fn is_empty(&self) -> bool {
		self.bids.is_empty() && self.asks.is_empty()
	}

	/// Check the structural invariants, returning a description of the
	/// first violation found
	///
	/// Violations are unreachable through the public operations; this is
	/// the test-suite and debug-assertion hook, not a runtime path.
	pub fn verify_integrity(&self) -> Result<(), String> {
		for (order_id, entry) in &self.index {
			let book = match entry.side {
				Side::Buy => &self.bids,
				Side::Sell => &self.asks,
			};
			let level = book.level(entry.price).ok_or_else(|| {
				format!("order {order_id} indexed at missing level {}", entry.price)
			})?;
			let occurrences = level
				.orders()
				.filter(|o| o.order_id == *order_id)
				.collect::<Vec<_>>();
			match occurrences.as_slice() {
				[resting] => {
					if resting.quantity != entry.quantity {
						return Err(format!(
							"order {order_id} quantity out of sync: book {} vs index {}",
							resting.quantity, entry.quantity
						));
					}
				}
				found => {
					return Err(format!(
						"order {order_id} occurs {} times at level {}",
						found.len(),
						entry.price
					));
				}
			}
		}

		let mut resting_count = 0usize;
		for book in [&self.bids, &self.asks] {
			for level in book.levels() {
				if level.is_empty() {
					return Err(format!("empty level {} left in book", level.price()));
				}
				let mut level_total = 0u64;
				for order in level.orders() {
					if order.quantity == 0 {
						return Err(format!(
							"order {} resting with zero quantity",
							order.order_id
						));
					}
					if order.price != level.price() || order.side != book.side() {
						return Err(format!(
							"order {} resting on the wrong level",
							order.order_id
						));
					}
					if !self.index.contains_key(&order.order_id) {
						return Err(format!("order {} not indexed", order.order_id));
					}
					level_total += order.quantity;
					resting_count += 1;
				}
				if level_total != level.total_quantity() {
					return Err(format!(
						"level {} total quantity out of sync",
						level.price()
					));
				}
			}
		}
		if resting_count != self.index.len() {
			return Err(format!(
				"{} resting orders vs {} index entries",
				resting_count,
				self.index.len()
			));
		}

		if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask())
			&& bid >= ask
		{
			return Err(format!("crossed book: bid {bid} >= ask {ask}"));
		}

		Ok(())
	}
}

impl Default for OrderBook {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn order(order_id: u64, side: Side, price: &str, quantity: u64) -> Order {
		Order {
			order_id,
			quantity,
			price: price.parse().unwrap(),
			side,
		}
	}

	#[test]
	fn test_insert_and_cancel() {
		let mut book = OrderBook::new();

		book.insert(order(1, Side::Buy, "100.00", 10));
		assert!(book.contains(1));
		assert_eq!(book.best_bid(), Some("100.00".parse().unwrap()));
		book.verify_integrity().unwrap();

		let removed = book.cancel(1).unwrap();
		assert_eq!(removed.order_id, 1);
		assert!(!book.contains(1));
		assert!(book.is_empty());
		book.verify_integrity().unwrap();
	}

	#[test]
	fn test_cancel_unknown_is_none() {
		let mut book = OrderBook::new();
		assert!(book.cancel(99).is_none());
	}

	#[test]
	fn test_best_price_per_side() {
		let mut book = OrderBook::new();

		book.insert(order(1, Side::Buy, "99.00", 1));
		book.insert(order(2, Side::Buy, "100.00", 1));
		book.insert(order(3, Side::Sell, "101.00", 1));
		book.insert(order(4, Side::Sell, "102.00", 1));

		// Best bid is the highest buy, best ask the lowest sell.
		assert_eq!(book.best_bid(), Some("100.00".parse().unwrap()));
		assert_eq!(book.best_ask(), Some("101.00".parse().unwrap()));
		book.verify_integrity().unwrap();
	}

	#[test]
	fn test_time_priority_within_level() {
		let mut side = BookSide::new(Side::Sell);

		side.add_order(order(1, Side::Sell, "100.00", 1));
		side.add_order(order(2, Side::Sell, "100.00", 1));
		side.add_order(order(3, Side::Sell, "100.00", 1));

		let level = side.best_level_mut().unwrap();
		assert_eq!(level.front().unwrap().order_id, 1);
		level.fill_front(1);
		assert_eq!(level.front().unwrap().order_id, 2);
	}

	#[test]
	fn test_fill_front_maintains_totals() {
		let mut level = PriceLevel::new("100.00".parse().unwrap());
		level.add_order(order(1, Side::Buy, "100.00", 4));
		level.add_order(order(2, Side::Buy, "100.00", 6));
		assert_eq!(level.total_quantity(), 10);

		assert_eq!(level.fill_front(3), Some(1));
		assert_eq!(level.total_quantity(), 7);
		assert_eq!(level.fill_front(1), Some(0));
		assert_eq!(level.order_count(), 1);
		assert_eq!(level.front().unwrap().order_id, 2);
	}

	#[test]
	fn test_empty_level_removed_on_cancel() {
		let mut book = OrderBook::new();
		book.insert(order(1, Side::Sell, "100.00", 5));
		book.insert(order(2, Side::Sell, "101.00", 5));

		book.cancel(1).unwrap();
		assert_eq!(book.asks().levels().count(), 1);
		assert_eq!(book.best_ask(), Some("101.00".parse().unwrap()));
		book.verify_integrity().unwrap();
	}

	#[test]
	fn test_integrity_catches_desync() {
		let mut book = OrderBook::new();
		book.insert(order(1, Side::Buy, "100.00", 5));

		// Tamper with the index behind the book's back.
		book.index.get_mut(&1).unwrap().quantity = 4;
		assert!(book.verify_integrity().is_err());
	}
}
