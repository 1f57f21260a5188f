//! Winner selection.
//!
//! Ties are broken deterministically so identical inputs always produce
//! the same result: creators by id ascending, clips by id ascending.

use std::cmp::Ordering;

use tclip_models::{Clip, CreatorScore, SelectionBasis, SelectionResult};
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};

fn by_score_desc(a: &CreatorScore, b: &CreatorScore) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.creator_id.cmp(&b.creator_id))
}

fn by_views_desc(a: &Clip, b: &Clip) -> Ordering {
    b.view_count
        .cmp(&a.view_count)
        .then_with(|| a.id.cmp(&b.id))
}

/// Creator scores ranked best first.
pub fn rank_creators(scores: &[CreatorScore]) -> Vec<&CreatorScore> {
    let mut ranked: Vec<&CreatorScore> = scores.iter().collect();
    ranked.sort_by(|a, b| by_score_desc(a, b));
    ranked
}

fn most_viewed<'a>(clips: impl Iterator<Item = &'a Clip>) -> Option<&'a Clip> {
    clips.min_by(|a, b| by_views_desc(a, b))
}

/// Pick the winning clip.
///
/// With scores present, the top creator wins and their most viewed clip is
/// chosen. Without scores, the most viewed clip overall wins. Performs no
/// I/O.
pub fn select(clips: &[Clip], scores: &[CreatorScore]) -> EngineResult<SelectionResult> {
    if clips.is_empty() {
        return Err(EngineError::EmptyCandidatePool);
    }

    if let Some(top) = rank_creators(scores).first() {
        let winner = most_viewed(clips.iter().filter(|c| c.creator_id == top.creator_id));
        match winner {
            Some(clip) => {
                debug!(
                    creator_id = %top.creator_id,
                    score = top.score,
                    clip_id = %clip.id,
                    "Selected clip from top trending creator"
                );
                return Ok(SelectionResult::from_clip(
                    clip,
                    SelectionBasis::CreatorTrend {
                        score: top.score,
                        clip_count: top.clip_count,
                    },
                ));
            }
            None => warn!(
                creator_id = %top.creator_id,
                "Top creator has no candidate clips, ranking by raw views"
            ),
        }
    }

    // Non-empty checked above.
    let clip = most_viewed(clips.iter()).ok_or(EngineError::EmptyCandidatePool)?;
    debug!(clip_id = %clip.id, views = clip.view_count, "Selected most viewed clip");
    Ok(SelectionResult::from_clip(clip, SelectionBasis::RawPopularity))
}
