//! Error types used throughout hlsgate.
//!
//! Authorization failures are kept distinct here so logs and tests can tell
//! them apart; the HTTP layer collapses all of them into one uniform
//! "unauthorized" response so callers cannot probe which check failed.

/// Crate-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested media item was not found (or has been deleted).
    #[error("Media not found: {0}")]
    NotFound(String),

    /// The media item exists but is not ready for playback.
    #[error("Media not ready: {0}")]
    MediaNotReady(String),

    /// The access token has passed its expiry time.
    #[error("Token expired")]
    TokenExpired,

    /// The access token signature does not verify under the current key.
    #[error("Token signature invalid")]
    TokenInvalidSignature,

    /// The token was issued for a different media item.
    #[error("Token media mismatch")]
    TokenMediaMismatch,

    /// The supplied admin key does not match the stored one.
    #[error("Admin key mismatch")]
    AdminKeyMismatch,

    /// A requested file name attempted to escape the media directory.
    #[error("Path traversal rejected: {0}")]
    PathTraversal(String),

    /// The expiry window is already at the configured maximum.
    #[error("Expiry limit exceeded")]
    ExpiryLimitExceeded,

    /// A record with the same public or internal id already exists.
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    /// A storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new MediaNotReady error.
    pub fn not_ready<S: Into<String>>(msg: S) -> Self {
        Self::MediaNotReady(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// True for every failure that must be reported as a uniform
    /// "unauthorized" outcome.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::TokenExpired
                | Self::TokenInvalidSignature
                | Self::TokenMediaMismatch
                | Self::AdminKeyMismatch
        )
    }
}

/// Result type alias using the crate Error.
pub type Result<T> = std::result::Result<T, Error>;
