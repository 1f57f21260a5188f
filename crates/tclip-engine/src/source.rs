//! Collaborator contracts the engine calls through.
//!
//! Implementations own transport concerns (HTTP, credentials, timeouts,
//! retries). The engine only sees fully collected results or a
//! [`TransportError`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tclip_models::{Clip, Creator, CreatorId};

use crate::error::TransportError;
use crate::util;

/// Upper bound on one candidate batch (the upstream page cap).
pub const MAX_BATCH_SIZE: u32 = 100;

/// Parameters for one candidate batch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipQuery {
    /// Topic the clips must belong to
    pub topic_id: String,
    /// Earliest creation time
    pub started_at: DateTime<Utc>,
    /// Latest creation time (the run's "now")
    pub ended_at: DateTime<Utc>,
    /// Maximum clips to return (<= MAX_BATCH_SIZE)
    pub max_count: u32,
}

/// Supplies the opaque bearer credential passed to fetch calls.
#[async_trait]
pub trait TokenSupplier: Send + Sync {
    async fn get_token(&self) -> Result<String, TransportError>;
}

/// Source of candidate clips for a topic.
#[async_trait]
pub trait ClipSource: Send + Sync {
    /// Fetch a single batch; no pagination beyond `query.max_count`.
    async fn fetch_clips(&self, query: &ClipQuery, token: &str)
        -> Result<Vec<Clip>, TransportError>;

    /// Returns a stable name for logging.
    fn name(&self) -> &'static str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}

/// Bulk source of creator profile metadata.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Largest id list accepted by one `fetch_creators` call.
    fn max_ids_per_request(&self) -> usize {
        MAX_BATCH_SIZE as usize
    }

    /// Look up creator profiles. Unknown ids are simply absent from the result.
    async fn fetch_creators(
        &self,
        ids: &[CreatorId],
        token: &str,
    ) -> Result<Vec<Creator>, TransportError>;

    /// Returns a stable name for logging.
    fn name(&self) -> &'static str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}
