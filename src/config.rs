// Copyright 2025 chenjjiaa
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

use serde::{Deserialize, Serialize};

use crate::logger::LoggerConfig;
use crate::source::SourceKind;

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Pipeline configuration
///
/// Every field can be overridden through `FORGE_`-prefixed environment
/// variables (e.g. `FORGE_MESSAGE_QUEUE_CAPACITY=20000`) or a config
/// file; unset fields keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
	/// Capacity of the raw message queue (source -> tokenizer)
	pub message_queue_capacity: usize,
	/// Capacity of the token queue (tokenizer -> validator)
	pub token_queue_capacity: usize,
	/// Capacity of the order queue (validator -> engine)
	pub order_queue_capacity: usize,
	/// Capacity of the logger's internal record queue
	pub log_queue_capacity: usize,
	/// Bound for every blocking queue wait, in milliseconds
	pub wait_timeout_ms: u64,
	/// How long the console source polls for a line before rechecking
	/// shutdown, in milliseconds
	pub source_poll_timeout_ms: u64,
	/// How long the input stage sleeps when throttled, in milliseconds
	pub throttle_sleep_ms: u64,
	/// Which message source feeds the pipeline
	pub source: SourceKind,
	/// Messages the synthetic source produces before ending the stream
	pub synthetic_message_budget: u64,
}

impl Default for PipelineConfig {
	fn default() -> Self {
		Self {
			message_queue_capacity: 10_000,
			token_queue_capacity: 10_000,
			order_queue_capacity: 10_000,
			log_queue_capacity: 1_000,
			wait_timeout_ms: 100,
			source_poll_timeout_ms: 500,
			throttle_sleep_ms: 10,
			source: SourceKind::Console,
			synthetic_message_budget: 1_000_000,
		}
	}
}

impl PipelineConfig {
	/// Load configuration from environment variables
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::Environment::with_prefix("FORGE"))
			.build()?;

		cfg.try_deserialize()
	}

	/// Load configuration from file, with environment overrides
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(config::Environment::with_prefix("FORGE"))
			.build()?;

		cfg.try_deserialize()
	}

	/// Logger configuration derived from the pipeline settings
	pub fn logger_config(&self) -> LoggerConfig {
		LoggerConfig {
			queue_capacity: self.log_queue_capacity,
			..LoggerConfig::default()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults_match_documented_capacities() {
		let config = PipelineConfig::default();
		assert_eq!(config.message_queue_capacity, 10_000);
		assert_eq!(config.token_queue_capacity, 10_000);
		assert_eq!(config.order_queue_capacity, 10_000);
		assert_eq!(config.log_queue_capacity, 1_000);
		assert_eq!(config.wait_timeout_ms, 100);
		assert_eq!(config.source, SourceKind::Console);
	}

	#[test]
	fn test_logger_config_inherits_queue_capacity() {
		let mut config = PipelineConfig::default();
		config.log_queue_capacity = 64;
		assert_eq!(config.logger_config().queue_capacity, 64);
	}
}
