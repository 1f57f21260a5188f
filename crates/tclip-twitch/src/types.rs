//! Helix request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tclip_models::{Clip, ClipId, Creator, CreatorId};

/// Helix list envelope: `{ "data": [...] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelixPage<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Response from the client-credentials token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppTokenResponse {
    pub access_token: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Game record from `/games`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameData {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Clip record from `/clips`.
///
/// `broadcaster_*` is the channel the clip was taken from; the wire also
/// carries `creator_*` for the viewer who cut it, which is not used here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipData {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub broadcaster_id: String,
    #[serde(default)]
    pub broadcaster_name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl From<ClipData> for Clip {
    fn from(data: ClipData) -> Self {
        Clip {
            id: ClipId(data.id),
            url: data.url,
            title: data.title.unwrap_or_default(),
            view_count: data.view_count,
            creator_id: CreatorId(data.broadcaster_id),
            creator_display_name: data.broadcaster_name,
            created_at: data.created_at,
            language: data.language.filter(|l| !l.is_empty()),
            duration_secs: data.duration,
        }
    }
}

/// User record from `/users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserData {
    pub id: String,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub display_name: String,
    /// "partner", "affiliate" or ""
    #[serde(default)]
    pub broadcaster_type: String,
}

impl UserData {
    pub fn is_partner(&self) -> bool {
        self.broadcaster_type == "partner"
    }
}

/// Channel record from `/channels`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelData {
    pub broadcaster_id: String,
    #[serde(default)]
    pub broadcaster_language: String,
}

/// Merge a user record with its channel record, if any.
pub fn creator_from_parts(user: UserData, channel: Option<&ChannelData>) -> Creator {
    let primary_language = channel
        .map(|c| c.broadcaster_language.trim())
        .filter(|l| !l.is_empty())
        .map(str::to_string);
    let is_verified_partner = user.is_partner();

    Creator {
        id: CreatorId(user.id),
        is_verified_partner,
        primary_language,
        login: Some(user.login).filter(|s| !s.is_empty()),
        display_name: Some(user.display_name).filter(|s| !s.is_empty()),
    }
}
