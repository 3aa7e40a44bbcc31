use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::token::{clamp_expiry, DEFAULT_EXPIRY_MINUTES};

/// Lifecycle status of a media item.
///
/// Transitions only move forward: `Processing -> Ready -> Deleted`, with
/// `Failed` as the terminal state for uploads the transcoder rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaStatus {
    Processing,
    Ready,
    Failed,
    Deleted,
}

/// Metadata for one uploaded media item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Externally visible identifier, used in all API paths.
    pub public_id: String,
    /// Private storage key naming the on-disk segment directory. Never
    /// exposed in responses.
    pub internal_id: String,
    /// Per-media signing secret. Rotating it invalidates every previously
    /// issued token for this item.
    pub access_key: String,
    /// Capability credential for mutating/inspection operations. Returned
    /// once at upload, compared (never displayed) afterwards.
    pub admin_key: String,
    pub status: MediaStatus,
    /// Current validity window, always within `[1, MAX_EXPIRY_MINUTES]`.
    pub expiry_minutes: u32,
    pub upload_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_token_refresh: Option<DateTime<Utc>>,
}

impl MediaRecord {
    /// Create a fresh record in `Processing` state with newly generated
    /// identifiers and keys.
    pub fn new(expiry_minutes: u32) -> Self {
        let now = Utc::now();
        Self {
            public_id: generate_id(),
            internal_id: generate_id(),
            access_key: generate_id(),
            admin_key: generate_id(),
            status: MediaStatus::Processing,
            expiry_minutes: clamp_expiry(expiry_minutes),
            upload_time: now,
            created_at: now,
            updated_at: now,
            last_token_refresh: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == MediaStatus::Ready
    }
}

impl Default for MediaRecord {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY_MINUTES)
    }
}

/// Generate a random 32-char hex identifier.
fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}
