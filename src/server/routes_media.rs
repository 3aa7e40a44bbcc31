//! Upload and admin routes.
//!
//! Upload creates the metadata record, hands the file to the external
//! transcoder, and only reports success once the segments exist on disk.
//! Admin operations require the per-media admin key returned exactly once
//! in the upload response.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::AppContext;
use crate::error::Error;
use crate::store::{MediaRecord, MediaStatus};
use crate::transcode::{self, PLAYLIST_NAME};
use crate::{gate, token};

pub fn media_routes() -> Router<AppContext> {
    Router::new()
        .route("/upload", post(upload_media))
        .route("/refresh-token/:media_id", post(refresh_token))
        .route("/media/:media_id/extend-expiry", post(extend_expiry))
        .route("/media/:media_id/revoke", post(revoke_tokens))
        .route("/media/:media_id/info", get(media_info))
        .route("/media/:media_id", delete(delete_media))
}

fn playlist_url(media_id: &str, access_token: &str) -> String {
    format!("/stream/{media_id}/playlist.m3u8?token={access_token}")
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub expiry_minutes: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub media_id: String,
    pub access_token: String,
    /// Shown once; afterwards it is only ever compared, never returned.
    pub admin_key: String,
    pub playlist_url: String,
    pub expires_in_minutes: u32,
}

#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    pub admin_key: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshQuery {
    pub admin_key: String,
    pub expiry_minutes: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub media_id: String,
    pub access_token: String,
    pub playlist_url: String,
    pub expires_in_minutes: u32,
}

#[derive(Debug, Deserialize)]
pub struct ExtendQuery {
    pub admin_key: String,
    pub additional_minutes: u32,
}

#[derive(Debug, Serialize)]
pub struct ExtendResponse {
    pub media_id: String,
    pub previous_expiry_minutes: u32,
    pub new_expiry_minutes: u32,
    pub extended_by_minutes: u32,
}

#[derive(Debug, Serialize)]
pub struct MediaInfoResponse {
    pub media_id: String,
    pub status: MediaStatus,
    pub expiry_minutes: u32,
    pub upload_time: String,
    pub created_at: String,
    pub updated_at: String,
    pub last_token_refresh: Option<String>,
}

impl From<MediaRecord> for MediaInfoResponse {
    fn from(record: MediaRecord) -> Self {
        Self {
            media_id: record.public_id,
            status: record.status,
            expiry_minutes: record.expiry_minutes,
            upload_time: record.upload_time.to_rfc3339(),
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
            last_token_refresh: record.last_token_refresh.map(|t| t.to_rfc3339()),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Accept an upload, run the external transcoder, and return the access
/// credentials once the media is ready.
async fn upload_media(
    State(ctx): State<AppContext>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Response, Error> {
    let expiry = token::clamp_expiry(
        query
            .expiry_minutes
            .unwrap_or(ctx.config.tokens.default_expiry_minutes),
    )
    .min(ctx.config.tokens.max_expiry_minutes);

    // Pull the `media` field out of the multipart body.
    let mut data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::internal(format!("multipart read failed: {e}")))?
    {
        if field.name() == Some("media") {
            data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| Error::internal(format!("upload read failed: {e}")))?,
            );
            break;
        }
    }
    let Some(data) = data else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "missing 'media' field"})),
        )
            .into_response());
    };

    let record = MediaRecord::new(expiry);
    let media_id = record.public_id.clone();
    let internal_id = record.internal_id.clone();
    let access_key = record.access_key.clone();
    let admin_key = record.admin_key.clone();

    // Scratch file holds the raw upload only until the transcoder is done.
    tokio::fs::create_dir_all(&ctx.scratch_dir).await?;
    let scratch_path = ctx.scratch_dir.join(format!("{internal_id}.upload"));
    tokio::fs::write(&scratch_path, &data).await?;
    drop(data);

    ctx.store.create(record)?;
    info!(media_id, "upload accepted, transcoding");

    let hls_dir = ctx.hls_root.join(&internal_id);
    let transcode_result = {
        let input = scratch_path.clone();
        let output = hls_dir.clone();
        tokio::task::spawn_blocking(move || transcode::generate_hls(&input, &output))
            .await
            .map_err(|e| Error::internal(format!("transcode task panicked: {e}")))?
    };

    let _ = tokio::fs::remove_file(&scratch_path).await;

    match transcode_result {
        Ok(_) => {
            ctx.store.mutate(&media_id, |r| {
                r.status = MediaStatus::Ready;
                Ok(())
            })?;
        }
        Err(e) => {
            error!(media_id, "transcoding failed: {e:#}");
            let _ = tokio::fs::remove_dir_all(&hls_dir).await;
            ctx.store.mutate(&media_id, |r| {
                r.status = MediaStatus::Failed;
                Ok(())
            })?;
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "encoding failed"})),
            )
                .into_response());
        }
    }

    let access_token = token::issue(&ctx.secret, &media_id, &access_key, expiry)?;
    info!(media_id, "media ready");

    Ok(Json(UploadResponse {
        playlist_url: playlist_url(&media_id, &access_token),
        media_id,
        access_token,
        admin_key,
        expires_in_minutes: expiry,
    })
    .into_response())
}

/// Mint a new access token under the existing key (soft refresh).
async fn refresh_token(
    State(ctx): State<AppContext>,
    Path(media_id): Path<String>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<TokenResponse>, Error> {
    let expiry = query
        .expiry_minutes
        .unwrap_or(ctx.config.tokens.default_expiry_minutes);

    // Admin check before anything is revealed about on-disk state; the
    // playlist must still exist, or the media is reported missing.
    let record = gate::admin_info(&ctx.store, &ctx.secret, &media_id, &query.admin_key)?;
    let playlist = ctx
        .hls_root
        .join(&record.internal_id)
        .join(PLAYLIST_NAME);
    if !playlist.exists() {
        return Err(Error::not_found(&media_id));
    }

    let (updated, access_token) =
        gate::refresh_token(&ctx.store, &ctx.secret, &media_id, &query.admin_key, expiry)?;

    Ok(Json(TokenResponse {
        playlist_url: playlist_url(&media_id, &access_token),
        media_id,
        access_token,
        expires_in_minutes: updated.expiry_minutes,
    }))
}

/// Extend the expiry window, clamped to the configured maximum.
async fn extend_expiry(
    State(ctx): State<AppContext>,
    Path(media_id): Path<String>,
    Query(query): Query<ExtendQuery>,
) -> Result<Json<ExtendResponse>, Error> {
    let outcome = gate::extend_expiry(
        &ctx.store,
        &ctx.secret,
        &media_id,
        &query.admin_key,
        query.additional_minutes,
    )?;

    Ok(Json(ExtendResponse {
        media_id,
        previous_expiry_minutes: outcome.previous_expiry_minutes,
        new_expiry_minutes: outcome.new_expiry_minutes,
        extended_by_minutes: outcome.extended_by(),
    }))
}

/// Rotate the access key: every outstanding token for this media dies.
async fn revoke_tokens(
    State(ctx): State<AppContext>,
    Path(media_id): Path<String>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<TokenResponse>, Error> {
    let (updated, access_token) =
        gate::revoke_tokens(&ctx.store, &ctx.secret, &media_id, &query.admin_key)?;
    info!(media_id, "access key rotated");

    Ok(Json(TokenResponse {
        playlist_url: playlist_url(&media_id, &access_token),
        media_id,
        access_token,
        expires_in_minutes: updated.expiry_minutes,
    }))
}

/// Detailed record information.
async fn media_info(
    State(ctx): State<AppContext>,
    Path(media_id): Path<String>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<MediaInfoResponse>, Error> {
    let record = gate::admin_info(&ctx.store, &ctx.secret, &media_id, &query.admin_key)?;
    Ok(Json(record.into()))
}

/// Delete the record, then its storage subtree.
async fn delete_media(
    State(ctx): State<AppContext>,
    Path(media_id): Path<String>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<serde_json::Value>, Error> {
    let record = gate::delete_media(&ctx.store, &ctx.secret, &media_id, &query.admin_key)?;

    let hls_dir = ctx.hls_root.join(&record.internal_id);
    if let Err(e) = tokio::fs::remove_dir_all(&hls_dir).await {
        // Metadata is already gone; the media is unreachable either way.
        error!(media_id, "failed to remove media files: {e}");
    }
    info!(media_id, "media deleted");

    Ok(Json(serde_json::json!({"message": "media deleted"})))
}
