//! Selection engine error types.

use std::fmt;

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Stage of a selection run, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Config,
    Token,
    Fetch,
    Resolve,
    Filter,
    Aggregate,
    Select,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Config => "config",
            PipelineStage::Token => "token",
            PipelineStage::Fetch => "fetch",
            PipelineStage::Resolve => "resolve",
            PipelineStage::Filter => "filter",
            PipelineStage::Aggregate => "aggregate",
            PipelineStage::Select => "select",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Candidate counts observed at each stage of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageCounts {
    /// Clips in the fetched batch
    pub fetched: usize,
    /// Clips surviving the inclusion predicates
    pub after_filter: usize,
    /// Creators meeting the minimum clip count
    pub qualifying_creators: usize,
}

impl fmt::Display for StageCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetched={} after_filter={} qualifying_creators={}",
            self.fetched, self.after_filter, self.qualifying_creators
        )
    }
}

/// Failure reported by an external collaborator (clip source, metadata
/// source, token supplier).
///
/// The engine never retries these; retry policy belongs to the transport.
#[derive(Debug, Error)]
#[error("{collaborator}: {source}")]
pub struct TransportError {
    /// Name of the collaborator that failed
    pub collaborator: &'static str,
    /// Whether the transport considers the failure transient
    pub retryable: bool,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl TransportError {
    pub fn new(
        collaborator: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            collaborator,
            retryable: false,
            source: source.into(),
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

/// Errors that can end a selection run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid selection config: {0}")]
    InvalidConfig(String),

    #[error("Token supplier failed: {0}")]
    Token(TransportError),

    #[error("Clip fetch failed: {0}")]
    ClipFetch(TransportError),

    #[error("Creator metadata fetch failed: {0}")]
    MetadataFetch(TransportError),

    #[error("Candidate pool is empty")]
    EmptyCandidatePool,

    #[error("Filter {filter} exhausted the candidate pool ({counts})")]
    FilterExhaustedPool {
        filter: &'static str,
        counts: StageCounts,
    },

    #[error("No creator has {min_clips_per_creator}+ clips among {candidates} candidates")]
    NoQualifyingCreator {
        candidates: usize,
        min_clips_per_creator: usize,
    },
}

impl EngineError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Stage the error is attributed to.
    pub fn stage(&self) -> PipelineStage {
        match self {
            EngineError::InvalidConfig(_) => PipelineStage::Config,
            EngineError::Token(_) => PipelineStage::Token,
            EngineError::ClipFetch(_) | EngineError::EmptyCandidatePool => PipelineStage::Fetch,
            EngineError::MetadataFetch(_) => PipelineStage::Resolve,
            EngineError::FilterExhaustedPool { .. } => PipelineStage::Filter,
            EngineError::NoQualifyingCreator { .. } => PipelineStage::Aggregate,
        }
    }

    /// True if the failure came from an external collaborator.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            EngineError::Token(_) | EngineError::ClipFetch(_) | EngineError::MetadataFetch(_)
        )
    }

    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            EngineError::Token(e) | EngineError::ClipFetch(e) | EngineError::MetadataFetch(e) => {
                Some(e)
            }
            _ => None,
        }
    }
}
