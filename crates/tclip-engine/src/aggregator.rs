//! Per-creator trendiness aggregation.

use std::collections::BTreeMap;

use tclip_models::{Clip, CreatorId, CreatorScore};
use tracing::debug;

/// Trendiness of a creator with `clip_count` surviving clips.
///
/// `total_views * (1 + bonus_factor * (clip_count - 1))`: a lone clip earns
/// no bonus, each extra clip adds `bonus_factor` of the view total.
pub fn trend_score(total_views: u64, clip_count: usize, bonus_factor: f64) -> f64 {
    let extra_clips = clip_count.saturating_sub(1) as f64;
    total_views as f64 * (1.0 + bonus_factor * extra_clips)
}

/// Group clips by creator and score every creator with at least
/// `min_clips_per_creator` clips.
///
/// Returns an empty list (not an error) when no creator qualifies. Output is
/// ordered by creator id; callers rank it themselves.
pub fn aggregate(
    clips: &[Clip],
    min_clips_per_creator: usize,
    bonus_factor: f64,
) -> Vec<CreatorScore> {
    let mut groups: BTreeMap<&CreatorId, (usize, u64)> = BTreeMap::new();
    for clip in clips {
        let entry = groups.entry(&clip.creator_id).or_insert((0, 0));
        entry.0 += 1;
        entry.1 = entry.1.saturating_add(clip.view_count);
    }

    let creators = groups.len();
    let scores: Vec<CreatorScore> = groups
        .into_iter()
        .filter(|(_, (count, _))| *count >= min_clips_per_creator)
        .map(|(creator_id, (clip_count, total_views))| CreatorScore {
            creator_id: creator_id.clone(),
            clip_count,
            total_views,
            score: trend_score(total_views, clip_count, bonus_factor),
        })
        .collect();

    debug!(
        creators,
        qualifying = scores.len(),
        min_clips_per_creator,
        "Aggregated creator scores"
    );

    scores
}
