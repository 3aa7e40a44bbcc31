//! Access control for playback and admin operations.
//!
//! This is composition, not a separate protocol: every request is checked
//! against store state before any file is read or any record is changed.
//! Admin-key comparison happens inside the store's critical section for
//! mutations, so a concurrent key rotation can never race the check.

use crate::error::{Error, Result};
use crate::store::{MediaRecord, MediaStatus, MediaStore};
use crate::token::{self, clamp_expiry, Claims, MAX_EXPIRY_MINUTES};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compare the supplied admin key against the stored one in constant time.
///
/// Both keys are MACed under the process secret and compared via the MAC's
/// timing-safe verify, so the running time does not depend on where the
/// first mismatching byte occurs.
fn admin_key_matches(secret: &str, stored: &str, supplied: &str) -> bool {
    let Ok(mut expected) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    expected.update(stored.as_bytes());
    let expected = expected.finalize().into_bytes();

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(supplied.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

fn check_admin(secret: &str, record: &MediaRecord, admin_key: &str) -> Result<()> {
    if admin_key_matches(secret, &record.admin_key, admin_key) {
        Ok(())
    } else {
        Err(Error::AdminKeyMismatch)
    }
}

/// Authorize a playback request (playlist or segment fetch).
///
/// Deleted records are unreachable (`NotFound`), items still transcoding or
/// failed report `MediaNotReady`, and the token must verify under the
/// record's current access key.
pub fn authorize_playback(
    store: &MediaStore,
    secret: &str,
    media_id: &str,
    access_token: &str,
) -> Result<(MediaRecord, Claims)> {
    let record = store.get(media_id)?;

    match record.status {
        MediaStatus::Ready => {}
        MediaStatus::Deleted => return Err(Error::not_found(media_id)),
        MediaStatus::Processing | MediaStatus::Failed => {
            return Err(Error::not_ready(media_id));
        }
    }

    let claims = token::verify(secret, access_token, media_id, &record.access_key)?;
    Ok((record, claims))
}

/// Authorize an inspection request and return a record snapshot.
pub fn admin_info(
    store: &MediaStore,
    secret: &str,
    media_id: &str,
    admin_key: &str,
) -> Result<MediaRecord> {
    let record = store.get(media_id)?;
    check_admin(secret, &record, admin_key)?;
    Ok(record)
}

/// Outcome of an extend-expiry operation.
#[derive(Debug, Clone, Copy)]
pub struct ExtendOutcome {
    pub previous_expiry_minutes: u32,
    pub new_expiry_minutes: u32,
}

impl ExtendOutcome {
    /// Minutes actually applied after clamping.
    pub fn extended_by(&self) -> u32 {
        self.new_expiry_minutes - self.previous_expiry_minutes
    }
}

/// Extend a record's expiry window, clamped to the configured maximum.
///
/// Requests are clamped rather than rejected; `ExpiryLimitExceeded` only
/// when the record is already at the cap and no minutes can be applied.
pub fn extend_expiry(
    store: &MediaStore,
    secret: &str,
    media_id: &str,
    admin_key: &str,
    additional_minutes: u32,
) -> Result<ExtendOutcome> {
    store.mutate(media_id, |record| {
        check_admin(secret, record, admin_key)?;

        let previous = record.expiry_minutes;
        if previous >= MAX_EXPIRY_MINUTES {
            return Err(Error::ExpiryLimitExceeded);
        }

        let new = previous
            .saturating_add(additional_minutes)
            .min(MAX_EXPIRY_MINUTES);
        record.expiry_minutes = new;

        Ok(ExtendOutcome {
            previous_expiry_minutes: previous,
            new_expiry_minutes: new,
        })
    })
}

/// Mint a fresh access token under the record's existing access key.
///
/// Soft refresh: outstanding tokens stay valid until their own expiry.
/// Hard revocation is [`revoke_tokens`].
pub fn refresh_token(
    store: &MediaStore,
    secret: &str,
    media_id: &str,
    admin_key: &str,
    expiry_minutes: u32,
) -> Result<(MediaRecord, String)> {
    store.mutate(media_id, |record| {
        check_admin(secret, record, admin_key)?;

        record.expiry_minutes = clamp_expiry(expiry_minutes);
        record.last_token_refresh = Some(Utc::now());

        let token = token::issue(secret, media_id, &record.access_key, record.expiry_minutes)?;
        Ok((record.clone(), token))
    })
}

/// Rotate the record's access key, invalidating every previously issued
/// token for this media item. Tokens for other records are unaffected.
/// Returns the updated record and a fresh token minted under the new key.
pub fn revoke_tokens(
    store: &MediaStore,
    secret: &str,
    media_id: &str,
    admin_key: &str,
) -> Result<(MediaRecord, String)> {
    store.mutate(media_id, |record| {
        check_admin(secret, record, admin_key)?;

        record.access_key = uuid::Uuid::new_v4().simple().to_string();
        record.last_token_refresh = Some(Utc::now());

        let token = token::issue(secret, media_id, &record.access_key, record.expiry_minutes)?;
        Ok((record.clone(), token))
    })
}

/// Delete a record. Metadata goes first (inside the store lock, after the
/// admin check); the caller removes the storage subtree with the returned
/// record's `internal_id`. A repeated delete yields `NotFound`.
pub fn delete_media(
    store: &MediaStore,
    secret: &str,
    media_id: &str,
    admin_key: &str,
) -> Result<MediaRecord> {
    store.delete(media_id, |record| check_admin(secret, record, admin_key))
}
