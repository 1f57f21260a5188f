//! Creator metadata and aggregate models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the account that published a clip.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CreatorId(pub String);

impl CreatorId {
    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CreatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CreatorId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CreatorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Creator profile attributes needed for candidate filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Creator {
    /// Creator ID (matches `Clip::creator_id`)
    pub id: CreatorId,

    /// Whether the creator is a verified partner account
    #[serde(default)]
    pub is_verified_partner: bool,

    /// Primary broadcast language code (e.g. "en")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_language: Option<String>,

    /// Account login name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Creator {
    pub fn new(id: impl Into<CreatorId>) -> Self {
        Self {
            id: id.into(),
            is_verified_partner: false,
            primary_language: None,
            login: None,
            display_name: None,
        }
    }

    pub fn verified(mut self, is_verified_partner: bool) -> Self {
        self.is_verified_partner = is_verified_partner;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.primary_language = Some(language.into());
        self
    }

    /// Case-insensitive match against the creator's primary language.
    ///
    /// A creator without a known language never matches.
    pub fn speaks(&self, language: &str) -> bool {
        self.primary_language
            .as_deref()
            .map(|l| l.eq_ignore_ascii_case(language))
            .unwrap_or(false)
    }
}

/// Trendiness aggregate for one creator over the surviving candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CreatorScore {
    /// Creator ID
    pub creator_id: CreatorId,
    /// Number of surviving clips from this creator (always > 0)
    pub clip_count: usize,
    /// Sum of `view_count` across those clips
    pub total_views: u64,
    /// Trendiness score used to rank creators
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creator_speaks_case_insensitive() {
        let creator = Creator::new("b1").with_language("EN");
        assert!(creator.speaks("en"));
        assert!(!creator.speaks("de"));
    }

    #[test]
    fn test_creator_without_language_never_matches() {
        assert!(!Creator::new("b1").speaks("en"));
    }

    #[test]
    fn test_creator_id_serializes_transparently() {
        let id = CreatorId::from("12345");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"12345\"");
    }
}
