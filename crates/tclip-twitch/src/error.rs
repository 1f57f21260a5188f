//! Twitch client error types.

use tclip_engine::TransportError;
use thiserror::Error;

/// Result type for Twitch operations.
pub type TwitchResult<T> = Result<T, TwitchError>;

/// Errors that can occur talking to Twitch.
#[derive(Debug, Error)]
pub enum TwitchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fallback wait when a 429 carries no usable reset hint.
const DEFAULT_RATE_LIMIT_WAIT_MS: u64 = 1000;

impl TwitchError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_http_status(status: u16, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        match status {
            401 => Self::Unauthorized(msg),
            403 => Self::AuthError(msg),
            404 => Self::NotFound(msg),
            429 => Self::RateLimited(DEFAULT_RATE_LIMIT_WAIT_MS),
            500..=599 => Self::ServerError(status, msg),
            _ => Self::RequestFailed(msg),
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            TwitchError::RateLimited(_) | TwitchError::ServerError(..) => true,
            TwitchError::Network(e) => !e.is_decode(),
            _ => false,
        }
    }

    /// Wait requested by the server before retrying, if any.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            TwitchError::RateLimited(ms) => Some(*ms),
            _ => None,
        }
    }

    /// HTTP status the error corresponds to, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            TwitchError::Unauthorized(_) => Some(401),
            TwitchError::AuthError(_) => Some(403),
            TwitchError::NotFound(_) => Some(404),
            TwitchError::RateLimited(_) => Some(429),
            TwitchError::ServerError(status, _) => Some(*status),
            TwitchError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<TwitchError> for TransportError {
    fn from(err: TwitchError) -> Self {
        let retryable = err.is_retryable();
        TransportError::new("twitch-helix", err).with_retryable(retryable)
    }
}
