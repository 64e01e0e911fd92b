use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest accepted share channel name.
pub const MAX_CHANNEL_CHARS: usize = 32;

/// Share link attached to an album.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    pub share_id: String,
    pub expires_at: DateTime<Utc>,
    /// Argon2 hash of the optional access password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

impl ShareLink {
    /// Mint a link with a fresh random id.
    pub fn generate(expires_at: DateTime<Utc>, password_hash: Option<String>) -> Self {
        Self {
            share_id: Uuid::new_v4().simple().to_string(),
            expires_at,
            password_hash,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_protected(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Record of an owner sharing an album on some channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareEvent {
    pub channel: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
    pub at: DateTime<Utc>,
}

/// Public description of a share link, shown before access is granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareInfo {
    pub title: String,
    pub expired: bool,
    pub protected: bool,
    pub cover_url: Option<String>,
}

/// Result of ensuring an album has a live share link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsuredShare {
    pub share_id: String,
    pub share_link: String,
    pub expires_at: DateTime<Utc>,
    /// False when an existing live link was reused
    pub created: bool,
}

/// Check a tracking channel name such as `whatsapp` or `copy`.
pub fn validate_channel(channel: &str) -> Result<String, String> {
    let channel = channel.trim();
    if channel.is_empty() {
        return Err("channel is required".to_string());
    }
    if channel.chars().count() > MAX_CHANNEL_CHARS {
        return Err(format!("channel longer than {} characters", MAX_CHANNEL_CHARS));
    }
    if !channel
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err("channel contains invalid characters".to_string());
    }
    Ok(channel.to_lowercase())
}
