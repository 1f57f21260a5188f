//! Shared data models for TrendClip clip selection.
//!
//! This crate provides Serde-serializable types for:
//! - Candidate clips fetched from a clip source
//! - Creator profile metadata used for filtering
//! - Per-creator trendiness aggregates
//! - The final selection record handed to downstream consumers

pub mod clip;
pub mod creator;
pub mod selection;

// Re-export common types
pub use clip::{Clip, ClipId};
pub use creator::{Creator, CreatorId, CreatorScore};
pub use selection::{SelectionBasis, SelectionResult};
