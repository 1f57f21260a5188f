//! Worker configuration.

use std::fmt;
use std::path::PathBuf;

use tclip_engine::SelectionConfig;
use tclip_twitch::HelixConfig;

use crate::error::{WorkerError, WorkerResult};

/// Game looked up when neither `GAME_ID` nor `GAME_NAME` is set.
pub const DEFAULT_GAME_NAME: &str = "Among Us";

/// Topic to select a clip for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    /// Already-resolved Twitch game id
    Id(String),
    /// Game name, resolved through `/games` at run time
    Name(String),
}

impl Topic {
    /// `GAME_ID` takes precedence over `GAME_NAME`.
    pub fn from_env() -> Self {
        if let Some(id) = non_empty_env("GAME_ID") {
            return Topic::Id(id);
        }
        Topic::Name(non_empty_env("GAME_NAME").unwrap_or_else(|| DEFAULT_GAME_NAME.to_string()))
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Id(id) => write!(f, "game_id:{}", id),
            Topic::Name(name) => write!(f, "game:{}", name),
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Twitch credentials and endpoints
    pub helix: HelixConfig,
    /// Selection tuning
    pub selection: SelectionConfig,
    /// Game to select for
    pub topic: Topic,
    /// Where to write the selected clip as JSON
    pub output_path: Option<PathBuf>,
}

impl WorkerConfig {
    /// Create config from environment variables. Everything is validated here.
    pub fn from_env() -> WorkerResult<Self> {
        let helix = HelixConfig::from_env().map_err(|e| WorkerError::config(e.to_string()))?;
        let selection =
            SelectionConfig::from_env().map_err(|e| WorkerError::config(e.to_string()))?;

        Ok(Self {
            helix,
            selection,
            topic: Topic::from_env(),
            output_path: non_empty_env("SELECTION_OUTPUT_PATH").map(PathBuf::from),
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
