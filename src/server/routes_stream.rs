//! Playback routes: gated playlist and segment delivery.
//!
//! Both handlers run the full access-control chain (record lookup, status
//! check, token verification) before touching the filesystem, and every
//! file path goes through the path safety gate.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use super::AppContext;
use crate::error::Error;
use crate::transcode::PLAYLIST_NAME;
use crate::{gate, paths, playlist};

pub fn stream_routes() -> Router<AppContext> {
    Router::new()
        .route("/stream/:media_id/playlist.m3u8", get(get_playlist))
        .route("/stream/:media_id/:segment_name", get(get_segment))
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

/// Serve the playlist, rewritten so every segment line carries a fresh
/// token. Never cached: each rewrite embeds the request's own issuance
/// time.
async fn get_playlist(
    State(ctx): State<AppContext>,
    Path(media_id): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Result<Response, Error> {
    let (record, claims) =
        gate::authorize_playback(&ctx.store, &ctx.secret, &media_id, &query.token)?;

    let playlist_path =
        paths::resolve_media_file(&ctx.hls_root, &record.internal_id, PLAYLIST_NAME)?;
    let text = tokio::fs::read_to_string(&playlist_path).await?;

    // Segment tokens must not outlive the playlist token that produced
    // them, so their ttl is the playlist token's remaining validity.
    let remaining_secs = claims.expires_at - chrono::Utc::now().timestamp();
    let ttl_minutes = ((remaining_secs / 60).max(1) as u32).min(record.expiry_minutes);

    let rewritten =
        playlist::rewrite(&text, &media_id, &record.access_key, &ctx.secret, ttl_minutes)?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(rewritten))
        .map_err(|e| Error::internal(e.to_string()))?)
}

/// Serve one media segment as a byte stream.
async fn get_segment(
    State(ctx): State<AppContext>,
    Path((media_id, segment_name)): Path<(String, String)>,
    Query(query): Query<TokenQuery>,
) -> Result<Response, Error> {
    let (record, _claims) =
        gate::authorize_playback(&ctx.store, &ctx.secret, &media_id, &query.token)?;

    if !segment_name.ends_with(".ts") {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "invalid segment name"})),
        )
            .into_response());
    }

    let segment_path =
        paths::resolve_media_file(&ctx.hls_root, &record.internal_id, &segment_name)?;

    let file = tokio::fs::File::open(&segment_path).await?;
    let len = file.metadata().await?.len();
    let body = Body::from_stream(ReaderStream::new(file));

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/MP2T")
        .header(header::CONTENT_LENGTH, len.to_string())
        .header(header::CACHE_CONTROL, "no-store")
        .body(body)
        .map_err(|e| Error::internal(e.to_string()))?)
}
