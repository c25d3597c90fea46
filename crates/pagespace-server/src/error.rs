//! Maps every component's error type onto the HTTP taxonomy (spec.md §7).
//! No crate upstream of this one knows about status codes or response
//! bodies; this is the single place that translation happens.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pagespace_auth::{AuthError, CsrfError, ScopeError};
use pagespace_stream::StreamError;
use pagespace_upload::UploadError;
use serde_json::json;

/// The gateway's single error type, spanning every component.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Authentication failed. Always renders as a bare 401.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Origin/CSRF guard rejected the request.
    #[error(transparent)]
    Csrf(#[from] CsrfError),
    /// MCP scope enforcement rejected the request.
    #[error(transparent)]
    Scope(#[from] ScopeError),
    /// Attachment or query-parameter validation failed.
    #[error("{0}")]
    Validation(String),
    /// The requested resource does not exist, or the caller may not see it.
    #[error("not found")]
    NotFound,
    /// Upload admission pipeline failure.
    #[error(transparent)]
    Upload(#[from] UploadError),
    /// Attachment validation failed while starting a chat turn.
    #[error(transparent)]
    Stream(#[from] StreamError),
    /// The caller is misconfigured (e.g. no provider credential).
    #[error("{0}")]
    ProviderMisconfigured(String),
    /// An unexpected internal failure.
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Auth(_) => {
                (StatusCode::UNAUTHORIZED, Json(json!({"error": "Authentication required"}))).into_response()
            }
            Self::Csrf(e) => {
                (StatusCode::FORBIDDEN, Json(json!({"error": e.to_string(), "code": e.code()}))).into_response()
            }
            Self::Scope(e) => (StatusCode::FORBIDDEN, Json(json!({"error": e.to_string()}))).into_response(),
            Self::Validation(message) => (StatusCode::BAD_REQUEST, Json(json!({"error": message}))).into_response(),
            Self::NotFound => (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response(),
            Self::Upload(e) => upload_error_response(e),
            Self::Stream(StreamError::InvalidAttachment(e)) => {
                (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()}))).into_response()
            }
            Self::Stream(StreamError::Provider(message)) => {
                (StatusCode::BAD_GATEWAY, Json(json!({"error": message}))).into_response()
            }
            Self::Stream(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "internal error"}))).into_response()
            }
            Self::ProviderMisconfigured(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({"error": message}))).into_response()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "unhandled internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "internal error"}))).into_response()
            }
        }
    }
}

fn upload_error_response(error: UploadError) -> Response {
    match error {
        UploadError::MemoryRejected(reason) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": reason}))).into_response()
        }
        UploadError::QuotaExceeded { used_bytes, quota_bytes } => (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(json!({
                "error": "storage quota exceeded",
                "storageInfo": {"usedBytes": used_bytes, "quotaBytes": quota_bytes},
            })),
        )
            .into_response(),
        UploadError::NoSlotAvailable => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": "too many concurrent uploads"})),
        )
            .into_response(),
        UploadError::ProcessorFailed(reason) => {
            tracing::error!(reason, "processor dispatch failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "processor failure"}))).into_response()
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "internal error"}))).into_response(),
    }
}
