//! Selection metrics.
//!
//! Counters for monitoring selection runs:
//! - Successful selections by ranking track
//! - Failures by pipeline stage
//! - Candidates removed per filter

use metrics::counter;

use crate::error::PipelineStage;

/// Metric name constants for consistency.
pub mod names {
    /// Successful selections by basis.
    pub const SELECTIONS_TOTAL: &str = "tclip_selections_total";

    /// Failed selection runs by stage.
    pub const FAILURES_TOTAL: &str = "tclip_selection_failures_total";

    /// Candidates removed by each filter.
    pub const FILTERED_TOTAL: &str = "tclip_candidates_filtered_total";
}

/// Record a successful selection.
pub fn record_selection(basis: &str) {
    counter!(names::SELECTIONS_TOTAL, "basis" => basis.to_string()).increment(1);
}

/// Record a failed run.
pub fn record_failure(stage: PipelineStage) {
    counter!(names::FAILURES_TOTAL, "stage" => stage.as_str()).increment(1);
}

/// Record candidates removed by a filter.
pub fn record_filtered(filter: &'static str, removed: usize) {
    counter!(names::FILTERED_TOTAL, "filter" => filter).increment(removed as u64);
}
