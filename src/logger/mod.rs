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

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, SendError, Sender, bounded};
use tracing::{debug, warn};

/// Configuration for the event/diagnostic logger
#[derive(Debug, Clone)]
pub struct LoggerConfig {
	/// Capacity of the internal record queue
	pub queue_capacity: usize,
	/// How long the worker waits for a record before rechecking shutdown
	pub poll_interval_ms: u64,
}

impl Default for LoggerConfig {
	fn default() -> Self {
		Self {
			queue_capacity: 1_000,
			poll_interval_ms: 50,
		}
	}
}

/// Logical output channel of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
	/// Matching events in wire form
	Out,
	/// Rejection diagnostics
	Err,
}

struct LogRecord {
	channel: Channel,
	message: String,
}

struct SinkPair {
	out: Box<dyn Write + Send>,
	err: Box<dyn Write + Send>,
}

struct LoggerShared {
	sender: Sender<LogRecord>,
	enabled: AtomicBool,
	shutdown: AtomicBool,
	sinks: Mutex<SinkPair>,
}

impl LoggerShared {
	fn write_record(&self, record: &LogRecord) {
		let mut sinks = self.sinks.lock().unwrap();
		let stream = match record.channel {
			Channel::Out => &mut sinks.out,
			Channel::Err => &mut sinks.err,
		};
		let _ = writeln!(stream, "{}", record.message);
		let _ = stream.flush();
	}

	fn log(&self, channel: Channel, message: String) {
		let record = LogRecord { channel, message };
		if !self.enabled.load(Ordering::Acquire) {
			// Synchronous mode: write on the caller's thread so tests
			// observe output deterministically.
			self.write_record(&record);
			return;
		}
		// Bounded queue; a full queue stalls the producer until the
		// worker drains. Once the worker is gone the record falls back
		// to a synchronous write rather than vanishing.
		if let Err(SendError(record)) = self.sender.send(record) {
			self.write_record(&record);
		}
	}
}

/// Asynchronous two-channel logger for matching events and diagnostics
///
/// The logger owns a dedicated worker thread that drains an internal
/// bounded queue and writes each record to the sink configured for its
/// channel (`out` for events, `err` for diagnostics). Producers hold a
/// cloneable [`LoggerHandle`]; the logger itself is an explicit
/// dependency handed to components, not a process-global.
///
/// Guarantees:
/// - Per-producer record order is preserved; cross-producer order is
///   queue arrival order
/// - The worker exits only once shutdown has been requested and the
///   queue is empty, so every record enqueued before shutdown is written
/// - With `set_enabled(false)` records bypass the queue and are written
///   synchronously on the caller's thread
pub struct Logger {
	shared: Arc<LoggerShared>,
	worker: Option<JoinHandle<()>>,
}

impl Logger {
	/// Start the logger worker
	pub fn start(config: LoggerConfig) -> Self {
		let (sender, receiver) = bounded(config.queue_capacity);
		let shared = Arc::new(LoggerShared {
			sender,
			enabled: AtomicBool::new(true),
			shutdown: AtomicBool::new(false),
			sinks: Mutex::new(SinkPair {
				out: Box::new(io::stdout()),
				err: Box::new(io::stderr()),
			}),
		});

		let worker_shared = shared.clone();
		let poll_interval = Duration::from_millis(config.poll_interval_ms);
		let worker = thread::Builder::new()
			.name("logger".to_string())
			.spawn(move || {
				debug!(target: "logger", "logger worker started");
				Self::run_worker_loop(&worker_shared, &receiver, poll_interval);
				debug!(target: "logger", "logger worker stopped");
			})
			.expect("Failed to spawn logger thread");

		Self {
			shared,
			worker: Some(worker),
		}
	}

	fn run_worker_loop(
		shared: &LoggerShared,
		receiver: &Receiver<LogRecord>,
		poll_interval: Duration,
	) {
		loop {
			match receiver.recv_timeout(poll_interval) {
				Ok(record) => shared.write_record(&record),
				Err(RecvTimeoutError::Timeout) => {
					// Drain before exit: only stop once shutdown has
					// been requested and nothing is left queued.
					if shared.shutdown.load(Ordering::Acquire) && receiver.is_empty() {
						break;
					}
				}
				Err(RecvTimeoutError::Disconnected) => break,
			}
		}
	}

	/// Handle for producers; cheap to clone and send to stage threads
	pub fn handle(&self) -> LoggerHandle {
		LoggerHandle {
			shared: self.shared.clone(),
		}
	}

	/// Replace both sinks
	pub fn set_sinks(&self, out: Box<dyn Write + Send>, err: Box<dyn Write + Send>) {
		let mut sinks = self.shared.sinks.lock().unwrap();
		sinks.out = out;
		sinks.err = err;
	}

	/// Toggle asynchronous delivery; disabled means synchronous writes
	pub fn set_enabled(&self, enabled: bool) {
		self.shared.enabled.store(enabled, Ordering::Release);
	}

	/// Shut down the worker after draining all queued records
	pub fn shutdown(mut self) {
		self.finish();
	}

	fn finish(&mut self) {
		self.shared.shutdown.store(true, Ordering::Release);
		if let Some(handle) = self.worker.take()
			&& let Err(e) = handle.join()
		{
			warn!(target: "logger", error = ?e, "logger worker panicked");
		}
	}
}

impl Drop for Logger {
	fn drop(&mut self) {
		self.finish();
	}
}

/// Producer-side handle to a [`Logger`]
#[derive(Clone)]
pub struct LoggerHandle {
	shared: Arc<LoggerShared>,
}

impl LoggerHandle {
	/// Record a matching event on the `out` channel
	pub fn log_out(&self, message: impl Into<String>) {
		self.shared.log(Channel::Out, message.into());
	}

	/// Record a diagnostic on the `err` channel
	pub fn log_err(&self, message: impl Into<String>) {
		self.shared.log(Channel::Err, message.into());
	}
}

/// Shared in-memory sink for capturing logger output in tests
#[derive(Clone, Default)]
pub struct MemorySink {
	buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn contents(&self) -> String {
		String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
	}

	pub fn lines(&self) -> Vec<String> {
		self.contents().lines().map(str::to_string).collect()
	}
}

impl Write for MemorySink {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.buffer.lock().unwrap().extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}
