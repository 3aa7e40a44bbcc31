//! Path safety gate for media file requests.
//!
//! Every playlist/segment read goes through [`resolve_media_file`], which
//! pins the requested name inside the media item's private directory.
//! Escape attempts are rejected outright, never sanitized and retried.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Resolve `requested_name` against the private directory of one media item.
///
/// Returns the canonical on-disk path, or `PathTraversal` for any name that
/// could reach outside the directory: absolute paths, path separators, `..`
/// components, null bytes, or symlinks pointing elsewhere. A well-formed
/// name that simply does not exist maps to `NotFound`.
pub fn resolve_media_file(
    hls_root: &Path,
    internal_id: &str,
    requested_name: &str,
) -> Result<PathBuf> {
    if requested_name.is_empty() || requested_name.contains('\0') {
        return Err(Error::PathTraversal(requested_name.to_string()));
    }

    let name = Path::new(requested_name);
    if name.is_absolute() || requested_name.contains('/') || requested_name.contains('\\') {
        return Err(Error::PathTraversal(requested_name.to_string()));
    }
    if name
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(Error::PathTraversal(requested_name.to_string()));
    }

    let media_root = hls_root.join(internal_id);
    let media_root = media_root
        .canonicalize()
        .map_err(|_| Error::not_found(internal_id))?;

    let candidate = media_root.join(name);
    // Canonicalize resolves symlinks, so a link escaping the directory is
    // caught by the descendant check below.
    let resolved = candidate
        .canonicalize()
        .map_err(|_| Error::not_found(requested_name))?;

    if !resolved.starts_with(&media_root) {
        return Err(Error::PathTraversal(requested_name.to_string()));
    }

    Ok(resolved)
}
