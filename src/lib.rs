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

//! Forge Matching Engine
//!
//! This crate provides a single-instrument, price-time-priority limit
//! order matching engine fed by a staged concurrent pipeline. Raw
//! textual order messages are tokenized, validated and applied to the
//! book, which emits trade and fill events in a line-based wire format.
//!
//! Architecture:
//! - Single-threaded matching core for deterministic behavior
//! - One OS thread per pipeline stage, connected by bounded lock-free
//!   SPSC queues with back-pressure
//! - Poison-pill propagation for graceful drain on shutdown
//! - Asynchronous two-channel logger for events and diagnostics

pub mod config;
pub mod engine;
pub mod event;
pub mod logger;
pub mod orderbook;
pub mod pipeline;
pub mod queue;
pub mod source;
pub mod tokenizer;
pub mod types;
pub mod validator;

pub use config::PipelineConfig;
pub use engine::MatchingEngine;
pub use event::EngineEvent;
pub use logger::{Logger, LoggerConfig, LoggerHandle, MemorySink};
pub use orderbook::{BookSide, OrderBook, OrderIndex, PriceLevel};
pub use pipeline::{Message, Pipeline};
pub use queue::{Consumer, Producer, SpscQueue};
pub use source::{MessageSource, ScriptedSource, SourceKind, StdinSource, SyntheticSource};
pub use tokenizer::{Tokens, tokenize};
pub use types::{Order, OrderCommand, ParsePriceError, Price, Side};
pub use validator::{ValidateError, validate};
