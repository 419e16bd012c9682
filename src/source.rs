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

use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, unbounded};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::Price;

/// Which message source the binary feeds into the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
	/// Read raw messages line by line from stdin
	Console,
	/// Deterministic synthetic message stream for load testing
	Synthetic,
}

/// Upstream producer of raw message strings
///
/// The pipeline pulls messages one at a time on the input stage thread.
/// `None` means the stream has ended and the pipeline should drain.
/// Implementations must return promptly (bounded internal waits) so the
/// stage keeps observing the shutdown flag.
pub trait MessageSource: Send {
	fn next_message(&mut self) -> Option<String>;
}

/// Console source: lines from stdin
///
/// A dedicated reader thread pulls lines off stdin; `next_message`
/// polls its channel with a bounded timeout and gives up cleanly when
/// the shutdown flag is set or stdin reaches end of file. Empty lines
/// are skipped.
pub struct StdinSource {
	lines: Receiver<String>,
	shutdown: Arc<AtomicBool>,
	poll_timeout: Duration,
}

impl StdinSource {
	pub fn new(shutdown: Arc<AtomicBool>, poll_timeout: Duration) -> Self {
		let (sender, lines) = unbounded();
		thread::Builder::new()
			.name("stdin-reader".to_string())
			.spawn(move || {
				let stdin = io::stdin();
				for line in stdin.lock().lines() {
					let Ok(line) = line else { break };
					if sender.send(line).is_err() {
						break;
					}
				}
				debug!(target: "source", "stdin reader reached end of input");
			})
			.expect("Failed to spawn stdin reader thread");
		Self {
			lines,
			shutdown,
			poll_timeout,
		}
	}
}

impl MessageSource for StdinSource {
	fn next_message(&mut self) -> Option<String> {
		loop {
			if self.shutdown.load(Ordering::Relaxed) {
				return None;
			}
			match self.lines.recv_timeout(self.poll_timeout) {
				Ok(line) if line.is_empty() => continue,
				Ok(line) => return Some(line),
				Err(RecvTimeoutError::Timeout) => continue,
				Err(RecvTimeoutError::Disconnected) => return None,
			}
		}
	}
}

/// Deterministic synthetic message stream
///
/// Produces roughly 90% adds, 9% cancels of still-live orders and 1%
/// malformed messages, with prices spread around 100.00. The stream is
/// a pure function of the counter so a given budget always yields the
/// same messages.
pub struct SyntheticSource {
	counter: u64,
	remaining: u64,
	live_ids: VecDeque<u64>,
}

impl SyntheticSource {
	pub fn new(budget: u64) -> Self {
		Self {
			counter: 0,
			remaining: budget,
			live_ids: VecDeque::new(),
		}
	}

	fn add_message(&mut self) -> String {
		let c = self.counter;
		let order_id = 1_000_000 + c;
		let side = c % 2;
		let quantity = 1 + c % 500;
		// 97.00 .. 103.00 around the 100.00 mid
		let price = Price::from_ticks(9_700 + (c * 37) % 601);
		self.live_ids.push_back(order_id);
		format!("0,{order_id},{side},{quantity},{price}")
	}
}

impl MessageSource for SyntheticSource {
	fn next_message(&mut self) -> Option<String> {
		if self.remaining == 0 {
			return None;
		}
		self.remaining -= 1;
		self.counter += 1;

		let slot = self.counter % 100;
		if slot == 99 {
			return Some("BADMESSAGE".to_string());
		}
		if slot >= 90
			&& let Some(order_id) = self.live_ids.pop_front()
		{
			return Some(format!("1,{order_id}"));
		}
		Some(self.add_message())
	}
}

/// Plays back a fixed list of messages, then ends the stream (tests)
pub struct ScriptedSource {
	lines: std::vec::IntoIter<String>,
}

impl ScriptedSource {
	pub fn new<I, S>(lines: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			lines: lines
				.into_iter()
				.map(Into::into)
				.collect::<Vec<_>>()
				.into_iter(),
		}
	}
}

impl MessageSource for ScriptedSource {
	fn next_message(&mut self) -> Option<String> {
		self.lines.next()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tokenizer::tokenize;
	use crate::validator::validate;

	#[test]
	fn test_scripted_source_plays_in_order() {
		let mut source = ScriptedSource::new(["a", "b"]);
		assert_eq!(source.next_message().as_deref(), Some("a"));
		assert_eq!(source.next_message().as_deref(), Some("b"));
		assert_eq!(source.next_message(), None);
	}

	#[test]
	fn test_synthetic_source_is_deterministic() {
		assert_eq!(SyntheticSource::new(0).next_message(), None);

		let mut a = SyntheticSource::new(500);
		let mut b = SyntheticSource::new(500);
		for _ in 0..500 {
			assert_eq!(a.next_message(), b.next_message());
		}
		assert_eq!(a.next_message(), None);
	}

	#[test]
	fn test_synthetic_source_respects_budget() {
		let mut source = SyntheticSource::new(10);
		for _ in 0..10 {
			assert!(source.next_message().is_some());
		}
		assert_eq!(source.next_message(), None);
	}

	#[test]
	fn test_synthetic_messages_mostly_validate() {
		let mut source = SyntheticSource::new(1_000);
		let mut accepted = 0;
		let mut rejected = 0;
		while let Some(message) = source.next_message() {
			match validate(&tokenize(&message)) {
				Ok(_) => accepted += 1,
				Err(_) => rejected += 1,
			}
		}
		// The stream keeps the reject path warm but is dominated by
		// well-formed traffic.
		assert!(accepted > 900);
		assert!(rejected > 0);
	}
}
