//! `POST /api/ai/abort` — C10's client-facing entry point. Always 200;
//! never reveals whether `streamId` exists to a non-owner (spec.md §4.8).

use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use pagespace_auth::Principal;
use pagespace_core::StreamId;
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

/// Request body for `POST /api/ai/abort`.
#[derive(Debug, Deserialize)]
pub struct AbortRequestBody {
    #[serde(rename = "streamId")]
    stream_id: StreamId,
}

/// Abort an in-flight stream, if the caller owns it.
pub async fn abort(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<AbortRequestBody>,
) -> impl IntoResponse {
    let outcome = state.abort_registry.abort(&body.stream_id, principal.user_id());
    Json(json!({"aborted": outcome.aborted, "reason": outcome.reason}))
}
