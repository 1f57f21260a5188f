//! Candidate inclusion predicates.

use tclip_models::Clip;
use tracing::debug;

use crate::config::SelectionConfig;
use crate::metrics::record_filtered;
use crate::resolver::CreatorIndex;
use crate::util;

/// A pure inclusion test over a single clip.
///
/// Predicates that consult creator metadata must answer `false` for a
/// creator missing from the index.
pub trait ClipPredicate: Send + Sync {
    fn keep(&self, clip: &Clip) -> bool;

    /// Returns a stable name for logging/metrics.
    fn name(&self) -> &'static str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}

/// Keeps clips whose creator is a verified partner.
pub struct VerifiedPartner<'a> {
    creators: &'a CreatorIndex,
}

impl<'a> VerifiedPartner<'a> {
    pub fn new(creators: &'a CreatorIndex) -> Self {
        Self { creators }
    }
}

impl ClipPredicate for VerifiedPartner<'_> {
    fn keep(&self, clip: &Clip) -> bool {
        self.creators
            .get(&clip.creator_id)
            .map(|c| c.is_verified_partner)
            .unwrap_or(false)
    }
}

/// Keeps clips whose creator broadcasts in the given language.
pub struct PrimaryLanguage<'a> {
    creators: &'a CreatorIndex,
    language: String,
}

impl<'a> PrimaryLanguage<'a> {
    pub fn new(creators: &'a CreatorIndex, language: impl Into<String>) -> Self {
        Self {
            creators,
            language: language.into(),
        }
    }
}

impl ClipPredicate for PrimaryLanguage<'_> {
    fn keep(&self, clip: &Clip) -> bool {
        self.creators
            .get(&clip.creator_id)
            .map(|c| c.speaks(&self.language))
            .unwrap_or(false)
    }
}

/// Build the ordered predicate list a config asks for.
pub fn predicates_for<'a>(
    config: &SelectionConfig,
    creators: &'a CreatorIndex,
) -> Vec<Box<dyn ClipPredicate + 'a>> {
    let mut predicates: Vec<Box<dyn ClipPredicate + 'a>> = Vec::new();
    if config.require_verified_partner {
        predicates.push(Box::new(VerifiedPartner::new(creators)));
    }
    if let Some(language) = &config.require_language {
        predicates.push(Box::new(PrimaryLanguage::new(creators, language.trim())));
    }
    predicates
}

/// Result of running the predicate list.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Surviving clips, in input order
    pub kept: Vec<Clip>,
    /// Clips removed by each predicate that ran
    pub removed: Vec<(&'static str, usize)>,
    /// Predicate that removed the last remaining candidate, if any
    pub exhausted_by: Option<&'static str>,
}

impl FilterOutcome {
    pub fn removed_total(&self) -> usize {
        self.removed.iter().map(|(_, n)| n).sum()
    }
}

/// Apply predicates in order (logical AND).
///
/// The kept set is always a subsequence of `clips`. An empty predicate list
/// returns the input unchanged.
pub fn filter_clips(clips: &[Clip], predicates: &[Box<dyn ClipPredicate + '_>]) -> FilterOutcome {
    let mut outcome = FilterOutcome {
        kept: clips.to_vec(),
        ..Default::default()
    };

    for predicate in predicates {
        if outcome.kept.is_empty() {
            break;
        }

        let before = outcome.kept.len();
        outcome.kept.retain(|clip| predicate.keep(clip));
        let removed = before - outcome.kept.len();

        debug!(
            filter = predicate.name(),
            kept = outcome.kept.len(),
            removed,
            "Applied candidate filter"
        );
        record_filtered(predicate.name(), removed);
        outcome.removed.push((predicate.name(), removed));

        if outcome.kept.is_empty() {
            outcome.exhausted_by = Some(predicate.name());
        }
    }

    outcome
}
