//! HTTP rendering of crate errors.
//!
//! Every authorization failure collapses to the same 403 body; which check
//! failed (expiry, signature, media scope, admin key) is logged but never
//! surfaced, so a caller probing credentials learns nothing from the
//! response shape.

use crate::error::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if self.is_unauthorized() {
            tracing::debug!("authorization failure: {}", self);
            return (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({"error": "unauthorized"})),
            )
                .into_response();
        }

        let (status, message) = match &self {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "media not found"),
            Error::MediaNotReady(_) => (StatusCode::CONFLICT, "media not ready"),
            Error::PathTraversal(name) => {
                tracing::warn!("path traversal attempt rejected: {:?}", name);
                (StatusCode::BAD_REQUEST, "invalid file name")
            }
            Error::ExpiryLimitExceeded => (StatusCode::BAD_REQUEST, "expiry limit exceeded"),
            Error::DuplicateId(_) | Error::Storage(_) | Error::Internal(_) => {
                tracing::error!("request failed: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
            // is_unauthorized() covered these above.
            Error::TokenExpired
            | Error::TokenInvalidSignature
            | Error::TokenMediaMismatch
            | Error::AdminKeyMismatch => {
                (StatusCode::FORBIDDEN, "unauthorized")
            }
        };

        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}
