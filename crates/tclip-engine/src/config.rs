//! Selection configuration.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{EngineError, EngineResult};
use crate::source::MAX_BATCH_SIZE;

/// Language required by `from_env` when `REQUIRE_LANGUAGE` is unset.
pub const DEFAULT_REQUIRE_LANGUAGE: &str = "en";

/// What to do when the inclusion predicates remove every candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExhaustedPoolPolicy {
    /// Abort the run with `EngineError::FilterExhaustedPool`.
    #[default]
    Fail,
    /// Log a warning and rank the unfiltered batch instead.
    FallBackToUnfiltered,
}

/// Tuning parameters for one selection run.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    /// How far back from now candidate clips may have been created
    pub lookback_window: Duration,
    /// Batch size requested from the clip source (1..=100)
    pub max_candidates: u32,
    /// Keep only clips from verified partner creators
    pub require_verified_partner: bool,
    /// Keep only clips from creators broadcasting in this language
    pub require_language: Option<String>,
    /// Minimum surviving clips for a creator to enter the trend ranking
    pub min_clips_per_creator: usize,
    /// Score bonus per additional clip beyond the first
    pub creator_bonus_factor: f64,
    /// Behaviour when filtering empties the pool
    pub exhausted_pool_policy: ExhaustedPoolPolicy,
    /// Rank by raw views when no creator qualifies
    pub fallback_to_popularity: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            lookback_window: Duration::from_secs(24 * 3600),
            max_candidates: MAX_BATCH_SIZE,
            require_verified_partner: true,
            require_language: None,
            min_clips_per_creator: 2,
            creator_bonus_factor: 0.35,
            exhausted_pool_policy: ExhaustedPoolPolicy::Fail,
            fallback_to_popularity: true,
        }
    }
}

impl SelectionConfig {
    /// Create config from environment variables and validate it.
    pub fn from_env() -> EngineResult<Self> {
        let defaults = Self::default();

        let lookback_hours: u64 =
            env_parse("LOOKBACK_HOURS", defaults.lookback_window.as_secs() / 3600)?;

        // Unset means the default language; empty or "any" disables the filter.
        let require_language = match std::env::var("REQUIRE_LANGUAGE") {
            Err(_) => Some(DEFAULT_REQUIRE_LANGUAGE.to_string()),
            Ok(raw) => Some(raw.trim().to_string())
                .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("any")),
        };

        let exhausted_pool_policy = if env_flag("FILTER_FALLBACK", false) {
            ExhaustedPoolPolicy::FallBackToUnfiltered
        } else {
            ExhaustedPoolPolicy::Fail
        };

        let config = Self {
            lookback_window: Duration::from_secs(lookback_hours.saturating_mul(3600)),
            max_candidates: env_parse("FETCH_FIRST", defaults.max_candidates)?,
            require_verified_partner: env_flag("PARTNER_ONLY", defaults.require_verified_partner),
            require_language,
            min_clips_per_creator: env_parse(
                "MIN_CLIPS_PER_CREATOR",
                defaults.min_clips_per_creator,
            )?,
            creator_bonus_factor: env_parse("CREATOR_CLIP_BONUS", defaults.creator_bonus_factor)?,
            exhausted_pool_policy,
            fallback_to_popularity: env_flag(
                "POPULARITY_FALLBACK",
                defaults.fallback_to_popularity,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check every constraint on the option set.
    pub fn validate(&self) -> EngineResult<()> {
        if self.lookback_window.is_zero() {
            return Err(EngineError::invalid_config("lookback_window must be positive"));
        }
        if chrono::Duration::from_std(self.lookback_window).is_err() {
            return Err(EngineError::invalid_config("lookback_window is out of range"));
        }
        if self.max_candidates == 0 || self.max_candidates > MAX_BATCH_SIZE {
            return Err(EngineError::invalid_config(format!(
                "max_candidates must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.max_candidates
            )));
        }
        if self.min_clips_per_creator == 0 {
            return Err(EngineError::invalid_config(
                "min_clips_per_creator must be at least 1",
            ));
        }
        if !self.creator_bonus_factor.is_finite() || self.creator_bonus_factor < 0.0 {
            return Err(EngineError::invalid_config(format!(
                "creator_bonus_factor must be a finite value >= 0, got {}",
                self.creator_bonus_factor
            )));
        }
        if let Some(language) = &self.require_language {
            if language.trim().is_empty() {
                return Err(EngineError::invalid_config("require_language cannot be empty"));
            }
        }
        Ok(())
    }

    /// True if any configured predicate depends on creator metadata.
    pub fn requires_metadata(&self) -> bool {
        self.require_verified_partner || self.require_language.is_some()
    }

    /// Earliest creation time for eligible clips, relative to `now`.
    pub fn window_start(&self, now: DateTime<Utc>) -> EngineResult<DateTime<Utc>> {
        let lookback = chrono::Duration::from_std(self.lookback_window)
            .map_err(|_| EngineError::invalid_config("lookback_window is out of range"))?;
        now.checked_sub_signed(lookback).ok_or_else(|| {
            EngineError::invalid_config("lookback_window reaches before the epoch range")
        })
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> EngineResult<T> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| EngineError::invalid_config(format!("{} has invalid value: {}", key, raw))),
        _ => Ok(default),
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y"))
        .unwrap_or(default)
}
