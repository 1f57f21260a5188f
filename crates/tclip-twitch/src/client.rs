//! Twitch Helix REST client.
//!
//! - App token caching with refresh margin
//! - HTTP client tuning (pooling, timeouts)
//! - Exponential backoff with jitter
//! - Observability (tracing spans, metrics)

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::try_join_all;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tclip_models::{Clip, Creator, CreatorId};
use tracing::{debug, info_span, warn, Instrument};

use crate::auth::TokenCache;
use crate::error::{TwitchError, TwitchResult};
use crate::metrics::{record_bucket, record_rate_limited, record_request, RateLimitBucket};
use crate::retry::{with_retry, RetryConfig};
use crate::types::{creator_from_parts, ChannelData, ClipData, GameData, HelixPage, UserData};

/// Helix page cap for `first` and for repeated id parameters.
pub const HELIX_MAX_PAGE: usize = 100;

// =============================================================================
// Configuration
// =============================================================================

/// Helix client configuration.
#[derive(Clone)]
pub struct HelixConfig {
    /// Application client id
    pub client_id: String,
    /// Application client secret
    pub client_secret: String,
    /// Helix API base URL
    pub api_base_url: String,
    /// OAuth base URL
    pub auth_base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl fmt::Debug for HelixConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelixConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("auth_base_url", &self.auth_base_url)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl HelixConfig {
    /// Config with default endpoints and timeouts for the given credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            api_base_url: "https://api.twitch.tv/helix".to_string(),
            auth_base_url: "https://id.twitch.tv/oauth2".to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> TwitchResult<Self> {
        let client_id = required_env("TWITCH_CLIENT_ID")?;
        let client_secret = required_env("TWITCH_CLIENT_SECRET")?;

        let mut config = Self::new(client_id, client_secret);
        if let Ok(url) = std::env::var("TWITCH_API_URL") {
            config.api_base_url = url;
        }
        if let Ok(url) = std::env::var("TWITCH_AUTH_URL") {
            config.auth_base_url = url;
        }
        config.timeout = Duration::from_secs(
            std::env::var("TWITCH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        );
        config.retry = RetryConfig::from_env();
        Ok(config)
    }
}

fn required_env(key: &str) -> TwitchResult<String> {
    let value = std::env::var(key)
        .map(|v| v.trim().to_string())
        .map_err(|_| TwitchError::config(format!("{} must be set", key)))?;
    if value.is_empty() {
        return Err(TwitchError::config(format!("{} cannot be empty", key)));
    }
    Ok(value)
}

// =============================================================================
// Client
// =============================================================================

/// Twitch Helix REST client.
#[derive(Clone)]
pub struct HelixClient {
    http: Client,
    config: HelixConfig,
    token_cache: Arc<TokenCache>,
}

impl HelixClient {
    /// Create a new Helix client.
    pub fn new(config: HelixConfig) -> TwitchResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("tclip-twitch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TwitchError::Network)?;

        let token_cache = Arc::new(TokenCache::new(
            http.clone(),
            &config.auth_base_url,
            config.client_id.clone(),
            config.client_secret.clone(),
            config.retry.clone(),
        ));

        Ok(Self {
            http,
            config,
            token_cache,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> TwitchResult<Self> {
        Self::new(HelixConfig::from_env()?)
    }

    pub fn config(&self) -> &HelixConfig {
        &self.config
    }

    /// Get a cached app access token.
    pub async fn app_token(&self) -> TwitchResult<String> {
        self.token_cache.get_token().await
    }

    // =========================================================================
    // Endpoints
    // =========================================================================

    /// Resolve a game name to its id.
    pub async fn get_game_id(&self, name: &str, token: &str) -> TwitchResult<String> {
        let page: HelixPage<GameData> = self
            .get_json("get_games", "games", &[("name", name.to_string())], token)
            .await?;

        page.data
            .into_iter()
            .next()
            .map(|g| g.id)
            .ok_or_else(|| TwitchError::not_found(format!("game not found on Twitch: {}", name)))
    }

    /// Fetch one batch of clips for a game created within
    /// `[started_at, ended_at]`.
    ///
    /// `ended_at` is always sent: without it Helix closes the range one week
    /// after `started_at`, which would drop the newest clips of longer windows.
    pub async fn get_clips(
        &self,
        game_id: &str,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        first: u32,
        token: &str,
    ) -> TwitchResult<Vec<Clip>> {
        let first = (first as usize).clamp(1, HELIX_MAX_PAGE);
        let params = [
            ("game_id", game_id.to_string()),
            ("first", first.to_string()),
            (
                "started_at",
                started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("ended_at", ended_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ];

        let page: HelixPage<ClipData> = self.get_json("get_clips", "clips", &params, token).await?;

        let mut clips = Vec::with_capacity(page.data.len());
        for data in page.data {
            if data.broadcaster_id.trim().is_empty() {
                warn!(clip_id = %data.id, "Skipping clip without broadcaster id");
                continue;
            }
            clips.push(Clip::from(data));
        }

        debug!(game_id = %game_id, count = clips.len(), "Fetched clips");
        Ok(clips)
    }

    /// Fetch user records, up to 100 ids per request.
    pub async fn get_users(&self, ids: &[CreatorId], token: &str) -> TwitchResult<Vec<UserData>> {
        self.get_by_ids("get_users", "users", "id", ids, token).await
    }

    /// Fetch channel records, up to 100 ids per request.
    pub async fn get_channels(
        &self,
        ids: &[CreatorId],
        token: &str,
    ) -> TwitchResult<Vec<ChannelData>> {
        self.get_by_ids("get_channels", "channels", "broadcaster_id", ids, token)
            .await
    }

    /// Fetch creator profiles: partner status from `/users`, broadcast
    /// language from `/channels`. Both lookups run concurrently.
    pub async fn get_creators(&self, ids: &[CreatorId], token: &str) -> TwitchResult<Vec<Creator>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let (users, channels) =
            tokio::try_join!(self.get_users(ids, token), self.get_channels(ids, token))?;

        let channels: HashMap<&str, &ChannelData> = channels
            .iter()
            .map(|c| (c.broadcaster_id.as_str(), c))
            .collect();

        Ok(users
            .into_iter()
            .map(|user| {
                let channel = channels.get(user.id.as_str()).copied();
                creator_from_parts(user, channel)
            })
            .collect())
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    async fn get_by_ids<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        key: &'static str,
        ids: &[CreatorId],
        token: &str,
    ) -> TwitchResult<Vec<T>> {
        let requests = ids.chunks(HELIX_MAX_PAGE).map(|chunk| {
            let params: Vec<(&str, String)> =
                chunk.iter().map(|id| (key, id.as_str().to_string())).collect();
            async move {
                let page: HelixPage<T> = self.get_json(operation, path, &params, token).await?;
                Ok::<_, TwitchError>(page.data)
            }
        });

        Ok(try_join_all(requests).await?.into_iter().flatten().collect())
    }

    /// GET a Helix path, refreshing the app token once on 401.
    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        params: &[(&str, String)],
        token: &str,
    ) -> TwitchResult<T> {
        self.execute_request(operation, async {
            match self.send_get(operation, path, params, token).await {
                Err(TwitchError::Unauthorized(body)) => {
                    debug!(operation, "Token rejected, refreshing: {}", body);
                    self.token_cache.invalidate().await;
                    let fresh = self.token_cache.get_token().await?;
                    self.send_get(operation, path, params, &fresh).await
                }
                other => other,
            }
        })
        .await
    }

    async fn send_get<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        params: &[(&str, String)],
        token: &str,
    ) -> TwitchResult<T> {
        let url = format!("{}/{}", self.config.api_base_url.trim_end_matches('/'), path);
        let url = url.as_str();

        with_retry(&self.config.retry, operation, || async move {
            let response = self
                .http
                .get(url)
                .header("Client-Id", &self.config.client_id)
                .bearer_auth(token)
                .query(params)
                .send()
                .await?;

            if let Some(bucket) = rate_limit_bucket(response.headers()) {
                record_bucket(bucket);
                if bucket.remaining == 0 {
                    debug!(operation, "Helix rate limit bucket drained");
                }
            }

            let status = response.status();
            if !status.is_success() {
                return Err(Self::handle_error_response(operation, url, response).await);
            }

            let body = response.text().await?;
            Ok(serde_json::from_str::<T>(&body)?)
        })
        .await
    }

    async fn execute_request<T, F>(&self, operation: &'static str, fut: F) -> TwitchResult<T>
    where
        F: std::future::Future<Output = TwitchResult<T>>,
    {
        let span = info_span!("twitch_request", operation = %operation);

        let start = Instant::now();
        let result = fut.instrument(span).await;

        let status = match &result {
            Ok(_) => Some(200),
            Err(e) => e.http_status(),
        };
        record_request(operation, status, start.elapsed());

        result
    }

    async fn handle_error_response(
        operation: &'static str,
        url: &str,
        response: reqwest::Response,
    ) -> TwitchError {
        let status = response.status().as_u16();
        let wait_ms = rate_limit_wait_ms(response.headers(), Utc::now());
        let body = response.text().await.unwrap_or_default();

        let err = match (status, wait_ms) {
            (429, Some(ms)) => TwitchError::RateLimited(ms),
            _ => TwitchError::from_http_status(status, format!("{} failed: {}", url, body)),
        };
        if let Some(ms) = err.retry_after_ms() {
            record_rate_limited(operation, ms);
        }
        err
    }
}

/// Token bucket state, present on every Helix response.
fn rate_limit_bucket(headers: &HeaderMap) -> Option<RateLimitBucket> {
    let number = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    };

    Some(RateLimitBucket {
        limit: number("ratelimit-limit"),
        remaining: number("ratelimit-remaining")?,
    })
}

/// Milliseconds to wait before the rate limit bucket refills.
///
/// Helix sends `Ratelimit-Reset` as a unix timestamp; `Retry-After` (seconds)
/// is honoured as well.
fn rate_limit_wait_ms(headers: &HeaderMap, now: DateTime<Utc>) -> Option<u64> {
    let reset = headers
        .get("ratelimit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok());

    if let Some(reset) = reset {
        let wait = (reset - now.timestamp()).max(0) as u64;
        return Some(wait.saturating_mul(1000));
    }

    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs.saturating_mul(1000))
}
