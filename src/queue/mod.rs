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

use std::cell::{Cell, UnsafeCell};
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::utils::{Backoff, CachePadded};

/// Sleep step for timed waits once spinning has run its course. Bounds
/// the busy loop on spurious wakes while keeping wake latency low.
const IDLE_BACKOFF: Duration = Duration::from_micros(100);

/// Bounded lock-free single-producer/single-consumer ring buffer
///
/// The queue is the hand-off primitive between pipeline stages. Exactly
/// one thread may hold the `Producer` end and exactly one the `Consumer`
/// end; uniqueness is enforced by the split ends (`&mut self` on every
/// mutating operation, no `Clone`).
///
/// Properties:
/// - Fixed capacity chosen at construction; one slot stays unused, so a
///   queue of capacity N holds at most N - 1 items
/// - FIFO with release/acquire publication: an item observed by the
///   consumer carries every write the producer made before pushing it
/// - Non-blocking operations plus timed waits bounded by the caller's
///   deadline
///
/// Not safe for multiple producers or multiple consumers on one instance.
pub struct SpscQueue<T> {
	inner: Arc<Inner<T>>,
}

struct Inner<T> {
	buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
	capacity: usize,
	/// Next slot the producer writes; written by the producer only
	head: CachePadded<AtomicUsize>,
	/// Next slot the consumer reads; written by the consumer only
	tail: CachePadded<AtomicUsize>,
}

// The raw buffer is shared between exactly two threads, and each slot is
// touched by at most one of them at a time: the consumer owns the
// occupied slots in [tail, head) and the producer the vacant remainder,
// with ownership transferred by the release/acquire index stores.
unsafe impl<T: Send> Send for Inner<T> {}
unsafe impl<T: Send> Sync for Inner<T> {}

impl<T> SpscQueue<T> {
	/// Create a queue with the given slot count
	///
	/// Capacity should be tuned to the expected burstiness of the
	/// producer; the queue never grows.
	pub fn new(capacity: usize) -> Self {
		assert!(capacity >= 2, "SPSC queue needs at least two slots");
		let buffer = (0..capacity)
			.map(|_| UnsafeCell::new(MaybeUninit::uninit()))
			.collect::<Vec<_>>()
			.into_boxed_slice();
		Self {
			inner: Arc::new(Inner {
				buffer,
				capacity,
				head: CachePadded::new(AtomicUsize::new(0)),
				tail: CachePadded::new(AtomicUsize::new(0)),
			}),
		}
	}

	/// Split the queue into its producer and consumer ends
	pub fn split(self) -> (Producer<T>, Consumer<T>) {
		(
			Producer {
				inner: self.inner.clone(),
				_not_sync: PhantomData,
			},
			Consumer {
				inner: self.inner,
				_not_sync: PhantomData,
			},
		)
	}
}

impl<T> Inner<T> {
	fn len(&self) -> usize {
		let head = self.head.load(Ordering::Acquire);
		let tail = self.tail.load(Ordering::Acquire);
		if head >= tail {
			head - tail
		} else {
			self.capacity - tail + head
		}
	}

	fn is_full(&self) -> bool {
		let head = self.head.load(Ordering::Acquire);
		(head + 1) % self.capacity == self.tail.load(Ordering::Acquire)
	}
}

impl<T> Drop for Inner<T> {
	fn drop(&mut self) {
		let head = *self.head.get_mut();
		let mut tail = *self.tail.get_mut();
		while tail != head {
			unsafe { (*self.buffer[tail].get()).assume_init_drop() };
			tail = (tail + 1) % self.capacity;
		}
	}
}

/// Producer end of an [`SpscQueue`] (exactly one per queue)
pub struct Producer<T> {
	inner: Arc<Inner<T>>,
	_not_sync: PhantomData<Cell<()>>,
}

impl<T> Producer<T> {
	/// Attempt to enqueue without blocking
	///
	/// Returns the value back when the queue is full so the caller can
	/// retry or drop it.
	pub fn try_push(&mut self, value: T) -> Result<(), T> {
		let inner = &*self.inner;
		let head = inner.head.load(Ordering::Relaxed);
		let next = (head + 1) % inner.capacity;
		if next == inner.tail.load(Ordering::Acquire) {
			return Err(value);
		}
		unsafe { (*inner.buffer[head].get()).write(value) };
		inner.head.store(next, Ordering::Release);
		Ok(())
	}

	/// Enqueue, waiting up to `timeout` for a slot
	///
	/// The wait spins briefly, then sleeps in bounded steps, rechecking
	/// the queue and the deadline after every wake.
	pub fn push_timeout(&mut self, value: T, timeout: Duration) -> Result<(), T> {
		let deadline = Instant::now() + timeout;
		let backoff = Backoff::new();
		let mut value = value;
		loop {
			match self.try_push(value) {
				Ok(()) => return Ok(()),
				Err(returned) => value = returned,
			}
			if Instant::now() >= deadline {
				return Err(value);
			}
			if backoff.is_completed() {
				thread::sleep(IDLE_BACKOFF);
			} else {
				backoff.snooze();
			}
		}
	}

	/// Number of queued items; advisory with respect to the consumer
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn is_full(&self) -> bool {
		self.inner.is_full()
	}
}

/// Consumer end of an [`SpscQueue`] (exactly one per queue)
pub struct Consumer<T> {
	inner: Arc<Inner<T>>,
	_not_sync: PhantomData<Cell<()>>,
}

impl<T> Consumer<T> {
	/// Attempt to dequeue without blocking
	pub fn try_pop(&mut self) -> Option<T> {
		let inner = &*self.inner;
		let tail = inner.tail.load(Ordering::Relaxed);
		if tail == inner.head.load(Ordering::Acquire) {
			return None;
		}
		let value = unsafe { (*inner.buffer[tail].get()).assume_init_read() };
		inner.tail.store((tail + 1) % inner.capacity, Ordering::Release);
		Some(value)
	}

	/// Dequeue, waiting up to `timeout` for an item
	pub fn pop_timeout(&mut self, timeout: Duration) -> Option<T> {
		let deadline = Instant::now() + timeout;
		let backoff = Backoff::new();
		loop {
			if let Some(value) = self.try_pop() {
				return Some(value);
			}
			if Instant::now() >= deadline {
				return None;
			}
			if backoff.is_completed() {
				thread::sleep(IDLE_BACKOFF);
			} else {
				backoff.snooze();
			}
		}
	}

	/// Number of queued items; advisory with respect to the producer
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn is_full(&self) -> bool {
		self.inner.is_full()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_push_and_pop_fifo() {
		let (mut tx, mut rx) = SpscQueue::new(8).split();

		for i in 0..5 {
			tx.try_push(i).unwrap();
		}
		for i in 0..5 {
			assert_eq!(rx.try_pop(), Some(i));
		}
		assert_eq!(rx.try_pop(), None);
	}

	#[test]
	fn test_full_queue_returns_value() {
		let (mut tx, mut rx) = SpscQueue::new(3).split();

		tx.try_push("a").unwrap();
		tx.try_push("b").unwrap();
		// capacity 3 leaves two usable slots
		assert_eq!(tx.try_push("c"), Err("c"));
		assert!(tx.is_full());
		assert!(rx.is_full());

		assert_eq!(rx.try_pop(), Some("a"));
		tx.try_push("c").unwrap();
		assert_eq!(rx.try_pop(), Some("b"));
		assert_eq!(rx.try_pop(), Some("c"));
	}

	#[test]
	fn test_timed_waits_expire() {
		let (mut tx, mut rx) = SpscQueue::<u32>::new(2).split();

		let start = Instant::now();
		assert_eq!(rx.pop_timeout(Duration::from_millis(20)), None);
		assert!(start.elapsed() >= Duration::from_millis(20));

		tx.try_push(1).unwrap();
		let start = Instant::now();
		assert_eq!(tx.push_timeout(2, Duration::from_millis(20)), Err(2));
		assert!(start.elapsed() >= Duration::from_millis(20));
	}

	#[test]
	fn test_timed_pop_wakes_on_push() {
		let (mut tx, mut rx) = SpscQueue::new(4).split();

		let consumer = thread::spawn(move || rx.pop_timeout(Duration::from_secs(5)));
		thread::sleep(Duration::from_millis(10));
		tx.try_push(42u64).unwrap();

		assert_eq!(consumer.join().unwrap(), Some(42));
	}

	#[test]
	fn test_cross_thread_transfer_preserves_order() {
		let (mut tx, mut rx) = SpscQueue::new(16).split();
		const COUNT: u64 = 10_000;

		let producer = thread::spawn(move || {
			for i in 0..COUNT {
				let mut value = i;
				loop {
					match tx.push_timeout(value, Duration::from_millis(100)) {
						Ok(()) => break,
						Err(returned) => value = returned,
					}
				}
			}
		});

		for expected in 0..COUNT {
			let got = rx
				.pop_timeout(Duration::from_secs(5))
				.expect("producer stalled");
			assert_eq!(got, expected);
		}

		producer.join().unwrap();
	}

	#[test]
	fn test_drop_releases_undelivered_items() {
		let value = Arc::new(());
		{
			let (mut tx, _rx) = SpscQueue::new(8).split();
			for _ in 0..4 {
				tx.try_push(value.clone()).unwrap();
			}
			assert_eq!(Arc::strong_count(&value), 5);
		}
		assert_eq!(Arc::strong_count(&value), 1);
	}

	#[test]
	fn test_len_is_consistent_across_wraparound() {
		let (mut tx, mut rx) = SpscQueue::new(4).split();

		for round in 0..10u32 {
			tx.try_push(round).unwrap();
			tx.try_push(round).unwrap();
			assert_eq!(tx.len(), 2);
			rx.try_pop().unwrap();
			rx.try_pop().unwrap();
			assert!(rx.is_empty());
		}
	}
}
