//! Clip selection worker.
//!
//! This crate provides:
//! - Process configuration loaded once from the environment
//! - A one-shot runner: token, topic lookup, selection, hand-off
//! - Consumers for the selected clip (log line, JSON file)
//! - Run-scoped structured logging

pub mod config;
pub mod consumer;
pub mod error;
pub mod logging;
pub mod runner;

pub use config::{Topic, WorkerConfig};
pub use consumer::{JsonFileConsumer, LogConsumer, SelectionConsumer};
pub use error::{WorkerError, WorkerResult};
pub use logging::RunLogger;
pub use runner::SelectionRunner;
