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

//! Matching engine entry point
//!
//! Wires the configured message source into the pipeline, emits events
//! on stdout and diagnostics on stderr, and drains gracefully on
//! interrupt.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use forge_matching::config::DEFAULT_LOG_LEVEL;
use forge_matching::{
	Logger, MessageSource, Pipeline, PipelineConfig, SourceKind, StdinSource, SyntheticSource,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
		)
		.with_writer(std::io::stderr)
		.init();

	let config = PipelineConfig::from_env().context("Failed to load configuration")?;
	let logger = Logger::start(config.logger_config());
	let shutdown = Arc::new(AtomicBool::new(false));

	let source: Box<dyn MessageSource> = match config.source {
		SourceKind::Console => Box::new(StdinSource::new(
			shutdown.clone(),
			Duration::from_millis(config.source_poll_timeout_ms),
		)),
		SourceKind::Synthetic => {
			Box::new(SyntheticSource::new(config.synthetic_message_budget))
		}
	};

	let pipeline = Pipeline::start(source, logger.handle(), &config, shutdown.clone());
	info!(target: "server", source = ?config.source, "matching pipeline started");

	signal::ctrl_c()
		.await
		.context("Failed to listen for interrupt signal")?;
	info!(target: "server", "interrupt received, draining pipeline");
	shutdown.store(true, Ordering::Relaxed);

	tokio::task::spawn_blocking(move || {
		pipeline.join();
		logger.shutdown();
	})
	.await
	.context("Shutdown task panicked")?;

	info!(target: "server", "pipeline drained, exiting");
	Ok(())
}
