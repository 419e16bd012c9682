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

use std::io;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use criterion::{Criterion, criterion_group, criterion_main};

use forge_matching::{
	Logger, MatchingEngine, Order, Pipeline, PipelineConfig, Price, Side, SyntheticSource,
};

const PIPELINE_MESSAGES: u64 = 100_000;

fn silent_logger(config: &PipelineConfig) -> Logger {
	let logger = Logger::start(config.logger_config());
	logger.set_enabled(false);
	logger.set_sinks(Box::new(io::sink()), Box::new(io::sink()));
	logger
}

/// Full pipeline: synthetic source through tokenizer, validator and
/// engine, timed from start to drained.
fn bench_pipeline(c: &mut Criterion) {
	let mut group = c.benchmark_group("pipeline");
	group.sample_size(10);
	group.throughput(criterion::Throughput::Elements(PIPELINE_MESSAGES));

	group.bench_function("synthetic_stream", |b| {
		b.iter_custom(|iters| {
			let mut total = Duration::ZERO;
			for _ in 0..iters {
				let config = PipelineConfig::default();
				let logger = silent_logger(&config);
				let shutdown = Arc::new(AtomicBool::new(false));
				let source = Box::new(SyntheticSource::new(PIPELINE_MESSAGES));

				let start = Instant::now();
				let pipeline =
					Pipeline::start(source, logger.handle(), &config, shutdown);
				pipeline.join();
				total += start.elapsed();

				logger.shutdown();
			}
			total
		});
	});

	group.finish();
}

/// Matching core alone: resting depth on both sides, then takers
/// sweeping the top of the book.
fn bench_engine(c: &mut Criterion) {
	let mut group = c.benchmark_group("engine");
	group.sample_size(20);

	group.bench_function("cross_heavy", |b| {
		b.iter_custom(|iters| {
			let config = PipelineConfig::default();
			let logger = silent_logger(&config);
			let mut total = Duration::ZERO;

			for _ in 0..iters {
				let mut engine = MatchingEngine::new(logger.handle());
				let start = Instant::now();
				for i in 0..10_000u64 {
					let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
					engine.add_order(Order {
						order_id: i + 1,
						quantity: 10,
						price: Price::from_ticks(10_000),
						side,
					});
				}
				total += start.elapsed();
			}

			logger.shutdown();
			total
		});
	});

	group.finish();
}

criterion_group!(benches, bench_pipeline, bench_engine);
criterion_main!(benches);
