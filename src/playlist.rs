//! Per-request playlist rewriting.
//!
//! An on-disk HLS playlist names bare segment files. Before serving it,
//! every segment line is replaced with a URL for the segment endpoint
//! carrying a freshly minted token, so each reference is individually
//! time-bounded. Metadata directives (`#`-prefixed) and blank lines pass
//! through untouched, in order. The transform is pure and runs once per
//! playlist request; rewritten output is never cached, because the
//! embedded tokens must reflect the request's own issuance time.

use crate::error::Result;
use crate::token;

/// Rewrite `playlist_text`, minting a token with `ttl_minutes` for every
/// segment line. The ttl matches the parent playlist request, so no
/// segment token outlives the playlist's own token.
pub fn rewrite(
    playlist_text: &str,
    media_id: &str,
    access_key: &str,
    secret: &str,
    ttl_minutes: u32,
) -> Result<String> {
    let mut out = String::with_capacity(playlist_text.len() * 2);

    for line in playlist_text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            out.push_str(line);
        } else {
            // Segment reference. Keep only the file name in case the
            // transcoder wrote a path.
            let segment_name = trimmed.rsplit('/').next().unwrap_or(trimmed);
            let tok = token::issue(secret, media_id, access_key, ttl_minutes)?;
            out.push_str(&format!("/stream/{media_id}/{segment_name}?token={tok}"));
        }
        out.push('\n');
    }

    Ok(out)
}
