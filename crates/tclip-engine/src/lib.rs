//! Trend-aware clip selection engine.
//!
//! Turns one bounded batch of candidate clips plus creator metadata into a
//! single ranked choice:
//! - Metadata resolution for the creators in the batch
//! - Ordered inclusion predicates (verified partner, language)
//! - Per-creator trendiness aggregation
//! - Winner selection with raw-popularity fallback
//!
//! Fetching, credentials and everything done with the chosen clip live
//! behind the collaborator traits in [`source`].

pub mod aggregator;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod resolver;
pub mod selector;
pub mod source;
mod util;

pub use aggregator::{aggregate, trend_score};
pub use config::{ExhaustedPoolPolicy, SelectionConfig, DEFAULT_REQUIRE_LANGUAGE};
pub use engine::{SelectionEngine, SelectionReport};
pub use error::{EngineError, EngineResult, PipelineStage, StageCounts, TransportError};
pub use filter::{
    filter_clips, predicates_for, ClipPredicate, FilterOutcome, PrimaryLanguage, VerifiedPartner,
};
pub use resolver::{CreatorIndex, MetadataResolver};
pub use selector::{rank_creators, select};
pub use source::{ClipQuery, ClipSource, MetadataSource, TokenSupplier, MAX_BATCH_SIZE};
