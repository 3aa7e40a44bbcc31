//! Media-scoped access tokens.
//!
//! A token is `base64url(claims JSON) "." base64url(hmac)`, signed with
//! HMAC-SHA256 under a key derived from the process secret and the owning
//! record's access key. Rotating a record's access key changes the derived
//! signing key, so every previously issued token for that record stops
//! verifying — per-media revocation without a blocklist.
//!
//! Issuance and verification are pure: no locking, no I/O.

use crate::error::{Error, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Maximum token/record validity window, in minutes (7 days).
pub const MAX_EXPIRY_MINUTES: u32 = 10_080;

/// Default validity window when the caller does not specify one.
pub const DEFAULT_EXPIRY_MINUTES: u32 = 60;

/// Claims carried by an access token. Ephemeral, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub media_id: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl Claims {
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.issued_at, 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires_at, 0)
    }
}

/// Clamp a requested ttl into the allowed `[1, MAX_EXPIRY_MINUTES]` window.
pub fn clamp_expiry(ttl_minutes: u32) -> u32 {
    ttl_minutes.clamp(1, MAX_EXPIRY_MINUTES)
}

/// Derive the signing key for one media item.
///
/// The per-record access key is folded into the process-wide secret, binding
/// every token to the record's current key generation.
fn signing_key(secret: &str, access_key: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b":");
    hasher.update(access_key.as_bytes());
    hasher.finalize().into()
}

/// Issue a signed token for `media_id`, valid for `ttl_minutes` from now.
pub fn issue(secret: &str, media_id: &str, access_key: &str, ttl_minutes: u32) -> Result<String> {
    issue_at(secret, media_id, access_key, ttl_minutes, Utc::now())
}

fn issue_at(
    secret: &str,
    media_id: &str,
    access_key: &str,
    ttl_minutes: u32,
    now: DateTime<Utc>,
) -> Result<String> {
    let ttl = clamp_expiry(ttl_minutes);
    let claims = Claims {
        media_id: media_id.to_string(),
        issued_at: now.timestamp(),
        expires_at: (now + Duration::minutes(ttl as i64)).timestamp(),
    };

    let payload = serde_json::to_vec(&claims)
        .map_err(|e| Error::internal(format!("failed to encode claims: {e}")))?;
    let encoded = URL_SAFE_NO_PAD.encode(&payload);

    let mut mac = HmacSha256::new_from_slice(&signing_key(secret, access_key))
        .map_err(|e| Error::internal(format!("bad signing key: {e}")))?;
    mac.update(encoded.as_bytes());
    let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{encoded}.{sig}"))
}

/// Verify a token against the record's *current* access key.
///
/// The signature is checked before any claim is trusted. A token signed
/// under a since-rotated key fails here even if not yet expired.
pub fn verify(secret: &str, token: &str, media_id: &str, access_key: &str) -> Result<Claims> {
    verify_at(secret, token, media_id, access_key, Utc::now())
}

fn verify_at(
    secret: &str,
    token: &str,
    media_id: &str,
    access_key: &str,
    now: DateTime<Utc>,
) -> Result<Claims> {
    let (encoded, sig) = token.split_once('.').ok_or(Error::TokenInvalidSignature)?;

    let sig_bytes = URL_SAFE_NO_PAD
        .decode(sig)
        .map_err(|_| Error::TokenInvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(&signing_key(secret, access_key))
        .map_err(|_| Error::TokenInvalidSignature)?;
    mac.update(encoded.as_bytes());
    mac.verify_slice(&sig_bytes)
        .map_err(|_| Error::TokenInvalidSignature)?;

    let payload = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| Error::TokenInvalidSignature)?;
    let claims: Claims =
        serde_json::from_slice(&payload).map_err(|_| Error::TokenInvalidSignature)?;

    if claims.media_id != media_id {
        return Err(Error::TokenMediaMismatch);
    }

    if now.timestamp() > claims.expires_at {
        return Err(Error::TokenExpired);
    }

    Ok(claims)
}
