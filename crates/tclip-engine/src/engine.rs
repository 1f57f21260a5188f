//! Selection run orchestration.
//!
//! One run: fetch batch -> resolve metadata -> filter -> aggregate -> select.
//! Each stage consumes the complete output of the previous one; nothing is
//! shared between runs.

use std::sync::Arc;

use chrono::Utc;
use tclip_models::{Clip, CreatorScore, SelectionResult};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::aggregator::aggregate;
use crate::config::{ExhaustedPoolPolicy, SelectionConfig};
use crate::error::{EngineError, EngineResult, StageCounts};
use crate::filter::{filter_clips, predicates_for};
use crate::metrics::{record_failure, record_selection};
use crate::resolver::MetadataResolver;
use crate::selector::{rank_creators, select};
use crate::source::{ClipQuery, ClipSource, MetadataSource, TokenSupplier};

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionReport {
    /// The chosen clip
    pub result: SelectionResult,
    /// Candidate counts per stage
    pub counts: StageCounts,
    /// Winning creator aggregate, when the trend track produced the result
    pub winning_creator: Option<CreatorScore>,
    /// True when filtering emptied the pool and the unfiltered batch was ranked
    pub filter_fallback_used: bool,
}

/// Drives selection runs against a clip source and a metadata source.
pub struct SelectionEngine {
    clip_source: Arc<dyn ClipSource>,
    resolver: MetadataResolver,
    config: SelectionConfig,
}

impl SelectionEngine {
    /// Create an engine. The config is validated here.
    pub fn new(
        clip_source: Arc<dyn ClipSource>,
        metadata_source: Arc<dyn MetadataSource>,
        config: SelectionConfig,
    ) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            clip_source,
            resolver: MetadataResolver::new(metadata_source),
            config,
        })
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Obtain a token from `tokens` and run a selection for `topic_id`.
    pub async fn run_with(
        &self,
        topic_id: &str,
        tokens: &dyn TokenSupplier,
    ) -> EngineResult<SelectionReport> {
        let token = match tokens.get_token().await {
            Ok(token) => token,
            Err(e) => return Err(fail(EngineError::Token(e))),
        };
        self.run(topic_id, &token).await
    }

    /// Fetch one candidate batch for `topic_id` and select the best clip.
    pub async fn run(&self, topic_id: &str, token: &str) -> EngineResult<SelectionReport> {
        let span = info_span!("selection", run_id = %Uuid::new_v4(), topic_id = %topic_id);

        async {
            let now = Utc::now();
            let query = ClipQuery {
                topic_id: topic_id.to_string(),
                started_at: self.config.window_start(now).map_err(fail)?,
                ended_at: now,
                max_count: self.config.max_candidates,
            };

            let clips = self
                .clip_source
                .fetch_clips(&query, token)
                .await
                .map_err(|e| fail(EngineError::ClipFetch(e)))?;

            info!(
                source = self.clip_source.name(),
                fetched = clips.len(),
                started_at = %query.started_at,
                ended_at = %query.ended_at,
                "Fetched candidate batch"
            );

            self.rank_batch(clips, token).await.map_err(fail)
        }
        .instrument(span)
        .await
    }

    /// Run every stage after the fetch on a batch the caller already holds.
    pub async fn select_from_batch(
        &self,
        topic_id: &str,
        clips: Vec<Clip>,
        token: &str,
    ) -> EngineResult<SelectionReport> {
        let span = info_span!("selection", run_id = %Uuid::new_v4(), topic_id = %topic_id);
        self.rank_batch(clips, token)
            .instrument(span)
            .await
            .map_err(fail)
    }

    async fn rank_batch(&self, mut clips: Vec<Clip>, token: &str) -> EngineResult<SelectionReport> {
        let before = clips.len();
        clips.retain(Clip::is_well_formed);
        if clips.len() < before {
            warn!(dropped = before - clips.len(), "Dropped clips without a creator id");
        }

        let cap = self.config.max_candidates as usize;
        if clips.len() > cap {
            warn!(fetched = clips.len(), cap, "Batch exceeds max_candidates, truncating");
            clips.truncate(cap);
        }

        if clips.is_empty() {
            return Err(EngineError::EmptyCandidatePool);
        }

        let mut counts = StageCounts {
            fetched: clips.len(),
            ..Default::default()
        };

        let (candidates, filter_fallback_used) = self.apply_filters(clips, token, counts).await?;
        counts.after_filter = candidates.len();

        let scores = aggregate(
            &candidates,
            self.config.min_clips_per_creator,
            self.config.creator_bonus_factor,
        );
        counts.qualifying_creators = scores.len();

        if scores.is_empty() {
            if !self.config.fallback_to_popularity {
                return Err(EngineError::NoQualifyingCreator {
                    candidates: candidates.len(),
                    min_clips_per_creator: self.config.min_clips_per_creator,
                });
            }
            info!(
                candidates = candidates.len(),
                min_clips_per_creator = self.config.min_clips_per_creator,
                "No creator qualified, ranking by raw views"
            );
        }

        let result = select(&candidates, &scores)?;
        let winning_creator = rank_creators(&scores)
            .first()
            .filter(|s| s.creator_id == result.creator_id)
            .map(|s| (*s).clone());

        record_selection(result.basis.as_str());
        info!(
            clip_id = %result.id,
            creator_id = %result.creator_id,
            views = result.view_count,
            basis = %result.basis,
            fetched = counts.fetched,
            after_filter = counts.after_filter,
            qualifying_creators = counts.qualifying_creators,
            "Selected clip"
        );

        Ok(SelectionReport {
            result,
            counts,
            winning_creator,
            filter_fallback_used,
        })
    }

    async fn apply_filters(
        &self,
        clips: Vec<Clip>,
        token: &str,
        counts: StageCounts,
    ) -> EngineResult<(Vec<Clip>, bool)> {
        if !self.config.requires_metadata() {
            return Ok((clips, false));
        }

        let creators = self
            .resolver
            .resolve(clips.iter().map(|c| &c.creator_id), token)
            .await?;

        let predicates = predicates_for(&self.config, &creators);
        let outcome = filter_clips(&clips, &predicates);

        info!(
            kept = outcome.kept.len(),
            removed = outcome.removed_total(),
            "Filtered candidates"
        );

        match outcome.exhausted_by {
            None => Ok((outcome.kept, false)),
            Some(filter) => match self.config.exhausted_pool_policy {
                ExhaustedPoolPolicy::Fail => Err(EngineError::FilterExhaustedPool {
                    filter,
                    counts: StageCounts {
                        after_filter: 0,
                        ..counts
                    },
                }),
                ExhaustedPoolPolicy::FallBackToUnfiltered => {
                    warn!(
                        filter,
                        fetched = clips.len(),
                        "Filters removed every candidate, ranking unfiltered batch"
                    );
                    Ok((clips, true))
                }
            },
        }
    }
}

fn fail(err: EngineError) -> EngineError {
    record_failure(err.stage());
    warn!(stage = %err.stage(), error = %err, "Selection run failed");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PipelineStage, TransportError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tclip_models::{Creator, CreatorId, SelectionBasis};

    struct FakeClips {
        clips: Vec<Clip>,
        queries: Mutex<Vec<ClipQuery>>,
        fail: bool,
    }

    impl FakeClips {
        fn new(clips: Vec<Clip>) -> Arc<Self> {
            Arc::new(Self {
                clips,
                queries: Mutex::new(Vec::new()),
                fail: false,
            })
        }
    }

    #[async_trait]
    impl ClipSource for FakeClips {
        async fn fetch_clips(
            &self,
            query: &ClipQuery,
            _token: &str,
        ) -> Result<Vec<Clip>, TransportError> {
            self.queries.lock().unwrap().push(query.clone());
            if self.fail {
                return Err(TransportError::new("FakeClips", "timed out").with_retryable(true));
            }
            Ok(self.clips.clone())
        }
    }

    struct FakeCreators {
        creators: Vec<Creator>,
        calls: AtomicUsize,
    }

    impl FakeCreators {
        fn new(creators: Vec<Creator>) -> Arc<Self> {
            Arc::new(Self {
                creators,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MetadataSource for FakeCreators {
        async fn fetch_creators(
            &self,
            ids: &[CreatorId],
            _token: &str,
        ) -> Result<Vec<Creator>, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .creators
                .iter()
                .filter(|c| ids.contains(&c.id))
                .cloned()
                .collect())
        }
    }

    struct StaticToken(Option<&'static str>);

    #[async_trait]
    impl TokenSupplier for StaticToken {
        async fn get_token(&self) -> Result<String, TransportError> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| TransportError::new("StaticToken", "invalid client secret"))
        }
    }

    fn clip(id: &str, creator: &str, views: u64) -> Clip {
        Clip::new(id, format!("https://clips.example/{}", id), views, creator)
            .with_title(format!("  clip {}  ", id))
            .with_creator_display_name(creator.to_uppercase())
    }

    fn unfiltered() -> SelectionConfig {
        SelectionConfig {
            require_verified_partner: false,
            require_language: None,
            ..Default::default()
        }
    }

    fn engine(
        clips: Arc<FakeClips>,
        creators: Arc<FakeCreators>,
        config: SelectionConfig,
    ) -> SelectionEngine {
        SelectionEngine::new(clips, creators, config).unwrap()
    }

    #[tokio::test]
    async fn test_trend_bonus_scenario() {
        let clips = FakeClips::new(vec![
            clip("a1", "A", 100),
            clip("a2", "A", 50),
            clip("b1", "B", 200),
        ]);
        let config = SelectionConfig {
            min_clips_per_creator: 2,
            creator_bonus_factor: 0.35,
            ..unfiltered()
        };
        let report = engine(clips, FakeCreators::new(vec![]), config)
            .run("game", "t")
            .await
            .unwrap();

        assert_eq!(report.result.id.as_str(), "a1");
        assert_eq!(report.result.title, "clip a1");
        assert_eq!(report.result.creator_display_name, "A");
        let winner = report.winning_creator.unwrap();
        assert_eq!(winner.creator_id.as_str(), "A");
        assert!((winner.score - 202.5).abs() < 1e-9);
        assert_eq!(
            report.counts,
            StageCounts {
                fetched: 3,
                after_filter: 3,
                qualifying_creators: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_no_qualifying_creator_picks_max_views() {
        let clips = FakeClips::new(vec![
            clip("1", "a", 10),
            clip("2", "b", 99),
            clip("3", "c", 42),
        ]);
        let config = SelectionConfig {
            min_clips_per_creator: 2,
            ..unfiltered()
        };
        let report = engine(clips, FakeCreators::new(vec![]), config)
            .run("game", "t")
            .await
            .unwrap();

        assert_eq!(report.result.id.as_str(), "2");
        assert_eq!(report.result.basis, SelectionBasis::RawPopularity);
        assert!(report.winning_creator.is_none());
    }

    #[tokio::test]
    async fn test_no_qualifying_creator_without_fallback() {
        let clips = FakeClips::new(vec![clip("1", "a", 10), clip("2", "b", 99)]);
        let config = SelectionConfig {
            min_clips_per_creator: 2,
            fallback_to_popularity: false,
            ..unfiltered()
        };
        let err = engine(clips, FakeCreators::new(vec![]), config)
            .run("game", "t")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::NoQualifyingCreator {
                candidates: 2,
                min_clips_per_creator: 2,
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_stops_pipeline() {
        let creators = FakeCreators::new(vec![Creator::new("a").verified(true)]);
        let err = engine(FakeClips::new(vec![]), creators.clone(), SelectionConfig::default())
            .run("game", "t")
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::EmptyCandidatePool));
        assert_eq!(creators.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_partner_filter_exhausted_is_fatal_by_default() {
        let clips = FakeClips::new(vec![clip("1", "a", 10), clip("2", "b", 20)]);
        let creators = FakeCreators::new(vec![
            Creator::new("a").verified(false),
            Creator::new("b").verified(false),
        ]);
        let err = engine(clips, creators, SelectionConfig::default())
            .run("game", "t")
            .await
            .unwrap_err();

        match err {
            EngineError::FilterExhaustedPool { filter, counts } => {
                assert_eq!(filter, "VerifiedPartner");
                assert_eq!(counts.fetched, 2);
                assert_eq!(counts.after_filter, 0);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_filter_exhausted_falls_back_when_enabled() {
        let clips = FakeClips::new(vec![clip("1", "a", 10), clip("2", "b", 20)]);
        let creators = FakeCreators::new(vec![]);
        let config = SelectionConfig {
            exhausted_pool_policy: ExhaustedPoolPolicy::FallBackToUnfiltered,
            ..Default::default()
        };
        let report = engine(clips, creators, config).run("game", "t").await.unwrap();

        assert!(report.filter_fallback_used);
        assert_eq!(report.result.id.as_str(), "2");
        assert_eq!(report.counts.after_filter, 2);
    }

    #[tokio::test]
    async fn test_filters_narrow_before_scoring() {
        let clips = FakeClips::new(vec![
            clip("1", "en_partner", 30),
            clip("2", "en_partner", 20),
            clip("3", "de_partner", 500),
            clip("4", "de_partner", 400),
            clip("5", "en_regular", 900),
        ]);
        let creators = FakeCreators::new(vec![
            Creator::new("en_partner").verified(true).with_language("en"),
            Creator::new("de_partner").verified(true).with_language("de"),
            Creator::new("en_regular").verified(false).with_language("en"),
        ]);
        let config = SelectionConfig {
            require_language: Some("en".to_string()),
            ..Default::default()
        };
        let report = engine(clips, creators.clone(), config)
            .run("game", "t")
            .await
            .unwrap();

        assert_eq!(report.result.id.as_str(), "1");
        assert_eq!(report.counts.after_filter, 2);
        assert_eq!(creators.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_metadata_skipped_without_predicates() {
        let clips = FakeClips::new(vec![clip("1", "a", 1)]);
        let creators = FakeCreators::new(vec![]);
        engine(clips, creators.clone(), unfiltered())
            .run("game", "t")
            .await
            .unwrap();
        assert_eq!(creators.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_query_uses_config() {
        let clips = FakeClips::new(vec![clip("1", "a", 1)]);
        let config = SelectionConfig {
            lookback_window: Duration::from_secs(3600),
            max_candidates: 25,
            ..unfiltered()
        };
        let before = Utc::now();
        engine(clips.clone(), FakeCreators::new(vec![]), config)
            .run("509658", "t")
            .await
            .unwrap();

        let queries = clips.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].topic_id, "509658");
        assert_eq!(queries[0].max_count, 25);
        let lookback = queries[0].ended_at - queries[0].started_at;
        assert_eq!(lookback, chrono::Duration::hours(1));
        assert!(queries[0].ended_at >= before);
        assert!(queries[0].ended_at <= Utc::now());
    }

    #[tokio::test]
    async fn test_clip_fetch_error_propagates() {
        let clips = Arc::new(FakeClips {
            clips: vec![],
            queries: Mutex::new(Vec::new()),
            fail: true,
        });
        let err = engine(clips, FakeCreators::new(vec![]), unfiltered())
            .run("game", "t")
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::ClipFetch(_)));
        assert_eq!(err.stage(), PipelineStage::Fetch);
        assert!(err.transport().unwrap().retryable);
    }

    #[tokio::test]
    async fn test_token_failure_propagates() {
        let clips = FakeClips::new(vec![clip("1", "a", 1)]);
        let err = engine(clips.clone(), FakeCreators::new(vec![]), unfiltered())
            .run_with("game", &StaticToken(None))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Token(_)));
        assert!(clips.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_with_token_supplier() {
        let clips = FakeClips::new(vec![clip("1", "a", 1)]);
        let report = engine(clips, FakeCreators::new(vec![]), unfiltered())
            .run_with("game", &StaticToken(Some("t")))
            .await
            .unwrap();
        assert_eq!(report.result.id.as_str(), "1");
    }

    #[tokio::test]
    async fn test_identical_inputs_identical_result() {
        let batch = vec![
            clip("x", "A", 10),
            clip("y", "B", 10),
            clip("z", "A", 10),
            clip("w", "B", 10),
        ];
        let config = SelectionConfig {
            min_clips_per_creator: 1,
            ..unfiltered()
        };
        let engine = engine(FakeClips::new(vec![]), FakeCreators::new(vec![]), config);

        let first = engine.select_from_batch("game", batch.clone(), "t").await.unwrap();
        let second = engine.select_from_batch("game", batch, "t").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.result.creator_id.as_str(), "A");
        assert_eq!(first.result.id.as_str(), "x");
    }

    #[tokio::test]
    async fn test_malformed_clips_dropped() {
        let engine = engine(FakeClips::new(vec![]), FakeCreators::new(vec![]), unfiltered());
        let err = engine
            .select_from_batch("game", vec![clip("1", "", 5)], "t")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyCandidatePool));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = SelectionConfig {
            max_candidates: 0,
            ..Default::default()
        };
        let result = SelectionEngine::new(
            FakeClips::new(vec![]),
            FakeCreators::new(vec![]),
            config,
        );
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }
}
