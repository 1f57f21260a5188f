//! App access token caching.
//!
//! Provides a thread-safe, async-aware token cache with:
//! - Refresh margin to avoid token expiry during requests
//! - Single-flight pattern to prevent thundering herd on refresh
//! - Graceful fallback to existing valid token on refresh failure

use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{TwitchError, TwitchResult};
use crate::retry::{with_retry, RetryConfig};
use crate::types::AppTokenResponse;

// =============================================================================
// Constants
// =============================================================================

/// Refresh margin: refresh token 60 seconds before expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Conservative token TTL when the endpoint omits `expires_in`.
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

// =============================================================================
// Token Cache
// =============================================================================

/// Cached token with expiration tracking.
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    /// Check if token is still valid with refresh margin.
    fn is_valid(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }

    /// Check if token is technically still usable (even if refresh is needed).
    fn is_usable(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Client-credentials token source with single-flight refresh.
pub struct TokenCache {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    retry: RetryConfig,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    /// Create a new token cache for the given app credentials.
    pub fn new(
        http: Client,
        auth_base_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}/token", auth_base_url.trim_end_matches('/')),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            retry,
            cache: RwLock::new(None),
        }
    }

    /// Invalidate the cached token.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }

    /// Get a valid access token, refreshing if necessary.
    ///
    /// - Fast path: return cached token if still valid
    /// - Slow path: acquire write lock and refresh (double-check first)
    /// - Fallback: on refresh failure, use existing token if still usable
    pub async fn get_token(&self) -> TwitchResult<String> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;

        // Another task may have refreshed while we waited
        if let Some(cached) = cache.as_ref() {
            if cached.is_valid() {
                return Ok(cached.access_token.clone());
            }
        }

        self.refresh_token(&mut cache).await
    }

    async fn refresh_token(&self, cache: &mut Option<CachedToken>) -> TwitchResult<String> {
        match self.request_token().await {
            Ok(token) => {
                let ttl = token
                    .expires_in
                    .map(Duration::from_secs)
                    .unwrap_or(TOKEN_DEFAULT_TTL);

                *cache = Some(CachedToken {
                    access_token: token.access_token.clone(),
                    expires_at: Instant::now() + ttl,
                });

                debug!(ttl_secs = ttl.as_secs(), "Refreshed Twitch app token");
                Ok(token.access_token)
            }
            Err(e) => {
                if let Some(cached) = cache.as_ref() {
                    if cached.is_usable() {
                        warn!("Token refresh failed, using existing token: {}", e);
                        return Ok(cached.access_token.clone());
                    }
                }

                Err(TwitchError::auth_error(format!(
                    "Failed to obtain app token: {}",
                    e
                )))
            }
        }
    }

    /// Exchange the app credentials for a new token.
    async fn request_token(&self) -> TwitchResult<AppTokenResponse> {
        with_retry(&self.retry, "app_token", || async move {
            let response = self
                .http
                .post(&self.token_url)
                .query(&[
                    ("client_id", self.client_id.as_str()),
                    ("client_secret", self.client_secret.as_str()),
                    ("grant_type", "client_credentials"),
                ])
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(TwitchError::from_http_status(
                    status.as_u16(),
                    format!("token request failed: {}", body),
                ));
            }

            let token: AppTokenResponse = serde_json::from_str(&body)?;
            if token.access_token.is_empty() {
                return Err(TwitchError::invalid_response("empty access_token"));
            }
            Ok(token)
        })
        .await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_retries: 1,
            base_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    fn cache_for(server: &MockServer) -> TokenCache {
        TokenCache::new(Client::new(), &server.uri(), "cid", "secret", fast_retry())
    }

    #[test]
    fn test_token_refresh_margin() {
        assert_eq!(TOKEN_REFRESH_MARGIN, Duration::from_secs(60));
        assert_eq!(TOKEN_DEFAULT_TTL, Duration::from_secs(50 * 60));
    }

    #[tokio::test]
    async fn test_token_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(query_param("client_id", "cid"))
            .and(query_param("client_secret", "secret"))
            .and(query_param("grant_type", "client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "abc123",
                "expires_in": 5_000_000,
                "token_type": "bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cache = cache_for(&server);
        assert_eq!(cache.get_token().await.unwrap(), "abc123");
        assert_eq!(cache.get_token().await.unwrap(), "abc123");
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "abc123",
                "expires_in": 3600
            })))
            .expect(2)
            .mount(&server)
            .await;

        let cache = cache_for(&server);
        cache.get_token().await.unwrap();
        cache.invalidate().await;
        cache.get_token().await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_failure_falls_back_to_usable_token() {
        let server = MockServer::start().await;

        // Valid for 30s: inside the refresh margin, so every call refreshes.
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "short-lived",
                "expires_in": 30
            })))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(500).set_body_string("id service down"))
            .with_priority(2)
            .mount(&server)
            .await;

        let cache = cache_for(&server);
        assert_eq!(cache.get_token().await.unwrap(), "short-lived");
        assert_eq!(cache.get_token().await.unwrap(), "short-lived");

        let requests = server.received_requests().await.unwrap();
        // initial grant, then the failed refresh with its retry
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn test_refresh_failure_without_cached_token_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = cache_for(&server).get_token().await.unwrap_err();
        assert!(matches!(err, TwitchError::AuthError(_)));
    }

    #[tokio::test]
    async fn test_bad_credentials_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(serde_json::json!({"status": 403, "message": "invalid client secret"})),
            )
            .mount(&server)
            .await;

        let err = cache_for(&server).get_token().await.unwrap_err();
        assert!(matches!(err, TwitchError::AuthError(_)));
        assert!(err.to_string().contains("invalid client secret"));
    }
}
