//! Twitch Helix client.
//!
//! This crate provides:
//! - App access tokens via the client-credentials grant, cached with a refresh margin
//! - Game lookup by name
//! - Clip batches for a game within a time window
//! - Bulk creator metadata (partner status, broadcast language)
//! - Retry with exponential backoff and jitter on 429/5xx
//!
//! [`HelixClient`] implements the selection engine's collaborator traits.

pub mod auth;
pub mod client;
pub mod error;
pub mod metrics;
pub mod retry;
mod source;
pub mod types;


pub use auth::TokenCache;
pub use client::{HelixClient, HelixConfig};
pub use error::{TwitchError, TwitchResult};
pub use retry::RetryConfig;
