//! Worker error types.

use tclip_engine::{EngineError, PipelineStage};
use tclip_twitch::TwitchError;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Selection failed: {0}")]
    Engine(#[from] EngineError),

    #[error("Twitch error: {0}")]
    Twitch(#[from] TwitchError),

    #[error("Output failed: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn output(msg: impl Into<String>) -> Self {
        Self::Output(msg.into())
    }

    /// Pipeline stage of an engine failure.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            WorkerError::Engine(e) => Some(e.stage()),
            _ => None,
        }
    }
}
