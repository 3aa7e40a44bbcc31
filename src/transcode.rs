//! External HLS segmentation.
//!
//! Transcoding is a black box: `ffmpeg` is invoked once per upload and is
//! expected to leave `playlist.m3u8` plus `segment%d.ts` files under the
//! media item's private directory. hlsgate only cares about the completion
//! signal and the produced playlist path.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Name of the playlist file the transcoder produces.
pub const PLAYLIST_NAME: &str = "playlist.m3u8";

/// Locate the ffmpeg binary on PATH.
pub fn find_ffmpeg() -> Result<PathBuf> {
    which::which("ffmpeg").context("ffmpeg not found on PATH")
}

/// Segment `input` into HLS under `output_dir`, blocking until done.
///
/// Returns the playlist path on success. Callers on the async runtime
/// should wrap this in `spawn_blocking`.
pub fn generate_hls(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output dir: {:?}", output_dir))?;

    let ffmpeg = find_ffmpeg()?;
    let playlist_path = output_dir.join(PLAYLIST_NAME);
    let segment_pattern = output_dir.join("segment%d.ts");

    let args = [
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-hls_time".to_string(),
        "10".to_string(),
        "-hls_playlist_type".to_string(),
        "vod".to_string(),
        "-hls_segment_filename".to_string(),
        segment_pattern.to_string_lossy().to_string(),
        "-f".to_string(),
        "hls".to_string(),
        "-y".to_string(),
        playlist_path.to_string_lossy().to_string(),
    ];

    debug!("FFmpeg args: {:?}", args);

    let output = Command::new(ffmpeg)
        .args(&args)
        .output()
        .context("Failed to execute ffmpeg")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "FFmpeg exited with status {}: {}",
            output.status,
            stderr.trim()
        );
    }

    if !playlist_path.exists() {
        anyhow::bail!("FFmpeg succeeded but produced no playlist");
    }

    Ok(playlist_path)
}
