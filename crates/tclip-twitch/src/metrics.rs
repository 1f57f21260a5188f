//! Helix request metrics.
//!
//! Helix reports its token bucket on every response (`Ratelimit-Limit`,
//! `Ratelimit-Remaining`). Both are exported as gauges so a draining bucket
//! is visible before requests start coming back 429.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

pub mod names {
    /// Requests by `operation` and `status` class.
    pub const REQUESTS_TOTAL: &str = "twitch_requests_total";
    /// Request latency by `operation`, retries included.
    pub const LATENCY_SECONDS: &str = "twitch_latency_seconds";
    /// Retry attempts by `operation`.
    pub const RETRIES_TOTAL: &str = "twitch_retries_total";
    /// 429 responses by `operation`.
    pub const RATE_LIMITED_TOTAL: &str = "twitch_rate_limited_total";
    /// Wait until the bucket refills, as announced on a 429.
    pub const RATE_LIMIT_WAIT_SECONDS: &str = "twitch_rate_limit_wait_seconds";
    /// Bucket size from `Ratelimit-Limit`.
    pub const RATE_LIMIT_LIMIT: &str = "twitch_ratelimit_limit";
    /// Points left from `Ratelimit-Remaining`.
    pub const RATE_LIMIT_REMAINING: &str = "twitch_ratelimit_remaining";
}

/// Helix token bucket state read from response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitBucket {
    pub limit: Option<u64>,
    pub remaining: u64,
}

/// Status label: the exact code for 401/404/429, otherwise the class.
/// `None` (no HTTP status: transport or decode failure) is `"error"`.
pub fn status_label(status: Option<u16>) -> &'static str {
    match status {
        None => "error",
        Some(401) => "401",
        Some(404) => "404",
        Some(429) => "429",
        Some(200..=299) => "2xx",
        Some(400..=499) => "4xx",
        Some(500..=599) => "5xx",
        Some(_) => "other",
    }
}

pub fn record_request(operation: &'static str, status: Option<u16>, elapsed: Duration) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation,
        "status" => status_label(status)
    )
    .increment(1);
    histogram!(names::LATENCY_SECONDS, "operation" => operation).record(elapsed.as_secs_f64());
}

pub fn record_retry(operation: &str) {
    counter!(names::RETRIES_TOTAL, "operation" => operation.to_string()).increment(1);
}

pub fn record_rate_limited(operation: &'static str, wait_ms: u64) {
    counter!(names::RATE_LIMITED_TOTAL, "operation" => operation).increment(1);
    histogram!(names::RATE_LIMIT_WAIT_SECONDS, "operation" => operation)
        .record(wait_ms as f64 / 1000.0);
}

pub fn record_bucket(bucket: RateLimitBucket) {
    if let Some(limit) = bucket.limit {
        gauge!(names::RATE_LIMIT_LIMIT).set(limit as f64);
    }
    gauge!(names::RATE_LIMIT_REMAINING).set(bucket.remaining as f64);
}
