//! Candidate clip model.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CreatorId;

/// Opaque clip identifier, unique within one candidate batch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ClipId(pub String);

impl ClipId {
    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClipId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ClipId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A candidate clip as returned by the clip source.
///
/// Clips are built once per run from the source response and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Clip {
    /// Clip ID
    pub id: ClipId,

    /// Playable location
    pub url: String,

    /// Title as published (may be empty or padded)
    #[serde(default)]
    pub title: String,

    /// Number of views
    pub view_count: u64,

    /// Creator that published the clip
    pub creator_id: CreatorId,

    /// Creator name as shown to viewers
    #[serde(default)]
    pub creator_display_name: String,

    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Language tag reported for the clip itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Clip length in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

impl Clip {
    /// Create a clip with the required attributes; optional ones start empty.
    pub fn new(
        id: impl Into<ClipId>,
        url: impl Into<String>,
        view_count: u64,
        creator_id: impl Into<CreatorId>,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            title: String::new(),
            view_count,
            creator_id: creator_id.into(),
            creator_display_name: String::new(),
            created_at: None,
            language: None,
            duration_secs: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_creator_display_name(mut self, name: impl Into<String>) -> Self {
        self.creator_display_name = name.into();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// True when the clip satisfies the model invariants (non-empty creator).
    pub fn is_well_formed(&self) -> bool {
        !self.creator_id.as_str().trim().is_empty()
    }
}
