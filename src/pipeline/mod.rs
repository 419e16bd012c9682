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

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::engine::MatchingEngine;
use crate::logger::LoggerHandle;
use crate::queue::{Consumer, Producer, SpscQueue};
use crate::source::MessageSource;
use crate::tokenizer::{Tokens, tokenize};
use crate::types::OrderCommand;
use crate::validator::validate;

/// Payload wrapper on every pipeline queue
///
/// `Shutdown` is the poison pill: each stage pushes it downstream when
/// it exits, and exits itself when it pops one, so in-flight messages
/// drain ahead of the sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<T> {
	Item(T),
	Shutdown,
}

/// Staged matching pipeline
///
/// Wires source -> tokenizer -> validator -> engine over three bounded
/// SPSC queues, one OS thread per stage. The queues are the only state
/// shared between stages; the engine owns the book exclusively on its
/// own thread.
///
/// Lifecycle: a stage runs while the shutdown flag is clear or its
/// inbound queue still holds messages, so a shutdown request drains
/// rather than truncates. Back-pressure from a full downstream queue
/// stalls the producer with bounded timed waits; if shutdown fires
/// while a push is being retried, the message is dropped cleanly.
pub struct Pipeline {
	threads: Vec<JoinHandle<()>>,
	shutdown: Arc<AtomicBool>,
}

impl Pipeline {
	/// Spawn all stage threads
	///
	/// `shutdown` is the externally owned drain signal, typically
	/// flipped from a signal handler.
	pub fn start(
		source: Box<dyn MessageSource>,
		logger: LoggerHandle,
		config: &PipelineConfig,
		shutdown: Arc<AtomicBool>,
	) -> Self {
		let wait_timeout = Duration::from_millis(config.wait_timeout_ms);
		let throttle_sleep = Duration::from_millis(config.throttle_sleep_ms);
		let high_water = config.message_queue_capacity / 2;

		let (message_tx, message_rx) =
			SpscQueue::<Message<String>>::new(config.message_queue_capacity).split();
		let (token_tx, token_rx) =
			SpscQueue::<Message<Tokens>>::new(config.token_queue_capacity).split();
		let (order_tx, order_rx) =
			SpscQueue::<Message<OrderCommand>>::new(config.order_queue_capacity).split();

		let mut threads = Vec::with_capacity(4);

		let stage_shutdown = shutdown.clone();
		threads.push(
			thread::Builder::new()
				.name("input-source".to_string())
				.spawn(move || {
					input_stage(
						source,
						message_tx,
						&stage_shutdown,
						high_water,
						throttle_sleep,
						wait_timeout,
					)
				})
				.expect("Failed to spawn input source thread"),
		);

		let stage_shutdown = shutdown.clone();
		let stage_logger = logger.clone();
		threads.push(
			thread::Builder::new()
				.name("tokenizer".to_string())
				.spawn(move || {
					tokenizer_stage(
						message_rx,
						token_tx,
						stage_logger,
						&stage_shutdown,
						wait_timeout,
					)
				})
				.expect("Failed to spawn tokenizer thread"),
		);

		let stage_shutdown = shutdown.clone();
		let stage_logger = logger.clone();
		threads.push(
			thread::Builder::new()
				.name("validator".to_string())
				.spawn(move || {
					validator_stage(
						token_rx,
						order_tx,
						stage_logger,
						&stage_shutdown,
						wait_timeout,
					)
				})
				.expect("Failed to spawn validator thread"),
		);

		let stage_shutdown = shutdown.clone();
		let engine = MatchingEngine::new(logger);
		threads.push(
			thread::Builder::new()
				.name("engine".to_string())
				.spawn(move || engine_stage(order_rx, engine, &stage_shutdown, wait_timeout))
				.expect("Failed to spawn engine thread"),
		);

		Self { threads, shutdown }
	}

	/// Request a graceful drain
	pub fn request_shutdown(&self) {
		self.shutdown.store(true, Ordering::Relaxed);
	}

	/// Wait for every stage to finish
	pub fn join(self) {
		for handle in self.threads {
			if let Err(e) = handle.join() {
				warn!(target: "pipeline", error = ?e, "stage thread panicked");
			}
		}
	}
}

/// Push a message downstream, retrying bounded waits until it is
/// accepted. Returns false when shutdown fired mid-retry and the
/// message was dropped.
fn forward<T>(
	tx: &mut Producer<Message<T>>,
	mut message: Message<T>,
	shutdown: &AtomicBool,
	timeout: Duration,
) -> bool {
	loop {
		match tx.push_timeout(message, timeout) {
			Ok(()) => return true,
			Err(returned) => {
				if shutdown.load(Ordering::Relaxed) {
					debug!(target: "pipeline", "message dropped during shutdown");
					return false;
				}
				message = returned;
			}
		}
	}
}

/// Push the poison pill downstream
///
/// Without a shutdown request the consumer drains until it sees the
/// pill, so the retry loop terminates. Once shutdown is requested the
/// consumer's own loop condition already ends it, so a pill that finds
/// no room is abandoned rather than retried against a possibly gone
/// consumer.
fn send_poison<T>(tx: &mut Producer<Message<T>>, shutdown: &AtomicBool, timeout: Duration) {
	let mut pill = Message::Shutdown;
	loop {
		match tx.push_timeout(pill, timeout) {
			Ok(()) => return,
			Err(returned) => {
				if shutdown.load(Ordering::Relaxed) {
					return;
				}
				pill = returned;
			}
		}
	}
}

fn input_stage(
	mut source: Box<dyn MessageSource>,
	mut tx: Producer<Message<String>>,
	shutdown: &AtomicBool,
	high_water: usize,
	throttle_sleep: Duration,
	wait_timeout: Duration,
) {
	info!(target: "pipeline", "input stage started");
	while !shutdown.load(Ordering::Relaxed) {
		// Throttle at the edge: above the high-water mark the source
		// sleeps instead of producing, on top of the queue's own
		// back-pressure.
		if tx.len() > high_water {
			thread::sleep(throttle_sleep);
			continue;
		}
		let Some(line) = source.next_message() else {
			break;
		};
		if !forward(&mut tx, Message::Item(line), shutdown, wait_timeout) {
			break;
		}
	}
	send_poison(&mut tx, shutdown, wait_timeout);
	info!(target: "pipeline", "input stage stopped");
}

fn tokenizer_stage(
	mut rx: Consumer<Message<String>>,
	mut tx: Producer<Message<Tokens>>,
	logger: LoggerHandle,
	shutdown: &AtomicBool,
	wait_timeout: Duration,
) {
	info!(target: "pipeline", "tokenizer stage started");
	while !shutdown.load(Ordering::Relaxed) || !rx.is_empty() {
		let Some(message) = rx.pop_timeout(wait_timeout) else {
			continue;
		};
		let raw = match message {
			Message::Shutdown => break,
			Message::Item(raw) => raw,
		};
		let tokens = tokenize(&raw);
		if tokens.is_empty() {
			logger.log_err(format!("unknown message: {raw:?}"));
			continue;
		}
		if !forward(&mut tx, Message::Item(tokens), shutdown, wait_timeout) {
			break;
		}
	}
	send_poison(&mut tx, shutdown, wait_timeout);
	info!(target: "pipeline", "tokenizer stage stopped");
}

fn validator_stage(
	mut rx: Consumer<Message<Tokens>>,
	mut tx: Producer<Message<OrderCommand>>,
	logger: LoggerHandle,
	shutdown: &AtomicBool,
	wait_timeout: Duration,
) {
	info!(target: "pipeline", "validator stage started");
	while !shutdown.load(Ordering::Relaxed) || !rx.is_empty() {
		let Some(message) = rx.pop_timeout(wait_timeout) else {
			continue;
		};
		let tokens = match message {
			Message::Shutdown => break,
			Message::Item(tokens) => tokens,
		};
		match validate(&tokens) {
			Ok(command) => {
				if !forward(&mut tx, Message::Item(command), shutdown, wait_timeout) {
					break;
				}
			}
			Err(error) => logger.log_err(error.to_string()),
		}
	}
	send_poison(&mut tx, shutdown, wait_timeout);
	info!(target: "pipeline", "validator stage stopped");
}

fn engine_stage(
	mut rx: Consumer<Message<OrderCommand>>,
	mut engine: MatchingEngine,
	shutdown: &AtomicBool,
	wait_timeout: Duration,
) {
	info!(target: "pipeline", "engine stage started");
	while !shutdown.load(Ordering::Relaxed) || !rx.is_empty() {
		let Some(message) = rx.pop_timeout(wait_timeout) else {
			continue;
		};
		match message {
			Message::Shutdown => break,
			Message::Item(command) => engine.apply(command),
		}
	}
	info!(target: "pipeline", "engine stage stopped");
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::queue::SpscQueue;

	#[test]
	fn test_forward_delivers() {
		let (mut tx, mut rx) = SpscQueue::new(4).split();
		let shutdown = AtomicBool::new(false);

		assert!(forward(
			&mut tx,
			Message::Item(1u32),
			&shutdown,
			Duration::from_millis(10)
		));
		assert_eq!(rx.try_pop(), Some(Message::Item(1)));
	}

	#[test]
	fn test_forward_drops_on_shutdown_when_full() {
		let (mut tx, _rx) = SpscQueue::new(2).split();
		let shutdown = AtomicBool::new(true);

		tx.try_push(Message::Item(1u32)).unwrap();
		// Queue full and shutdown set: the message is dropped, not
		// retried forever.
		assert!(!forward(
			&mut tx,
			Message::Item(2),
			&shutdown,
			Duration::from_millis(5)
		));
	}

	#[test]
	fn test_poison_pill_terminates_stage() {
		let (mut tx, rx) = SpscQueue::<Message<Tokens>>::new(8).split();
		let (out_tx, mut out_rx) = SpscQueue::<Message<OrderCommand>>::new(8).split();
		let shutdown = Arc::new(AtomicBool::new(false));

		let logger = crate::logger::Logger::start(crate::logger::LoggerConfig::default());
		logger.set_enabled(false);
		logger.set_sinks(
			Box::new(std::io::sink()),
			Box::new(std::io::sink()),
		);
		let handle = logger.handle();

		let stage_shutdown = shutdown.clone();
		let stage = thread::spawn(move || {
			validator_stage(
				rx,
				out_tx,
				handle,
				&stage_shutdown,
				Duration::from_millis(10),
			)
		});

		tx.try_push(Message::Item(tokenize("1,7"))).unwrap();
		tx.try_push(Message::Shutdown).unwrap();
		stage.join().unwrap();

		assert_eq!(
			out_rx.try_pop(),
			Some(Message::Item(OrderCommand::Cancel { order_id: 7 }))
		);
		// The stage forwards its own pill before exiting.
		assert_eq!(out_rx.try_pop(), Some(Message::Shutdown));
	}
}
