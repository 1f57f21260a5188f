//! Selection output contract.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Clip, ClipId, CreatorId};

/// Which ranking track produced the winning clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionBasis {
    /// Winner came from the top-scoring trending creator.
    CreatorTrend { score: f64, clip_count: usize },
    /// No creator qualified; winner is the most viewed clip overall.
    RawPopularity,
}

impl SelectionBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionBasis::CreatorTrend { .. } => "creator_trend",
            SelectionBasis::RawPopularity => "raw_popularity",
        }
    }
}

impl fmt::Display for SelectionBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single clip chosen by a selection run.
///
/// Produced once per successful run and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SelectionResult {
    /// Clip ID
    pub id: ClipId,
    /// Playable location
    pub url: String,
    /// Title with surrounding whitespace removed
    pub title: String,
    /// Number of views at fetch time
    pub view_count: u64,
    /// Creator name as shown to viewers
    pub creator_display_name: String,
    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Creator ID
    pub creator_id: CreatorId,
    /// Ranking track that produced this result
    pub basis: SelectionBasis,
}

impl SelectionResult {
    /// Build the output record for a winning clip.
    pub fn from_clip(clip: &Clip, basis: SelectionBasis) -> Self {
        Self {
            id: clip.id.clone(),
            url: clip.url.clone(),
            title: clip.title.trim().to_string(),
            view_count: clip.view_count,
            creator_display_name: clip.creator_display_name.clone(),
            created_at: clip.created_at,
            creator_id: clip.creator_id.clone(),
            basis,
        }
    }
}
