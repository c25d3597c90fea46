//! `POST /api/upload` — C12's multipart admission entry point.

use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use pagespace_auth::Principal;
use pagespace_core::{DriveId, PageId};
use pagespace_upload::{admit_upload, InsertPosition, UploadRequest, UserTier};
use serde_json::json;

use crate::error::ApiError;
use crate::state::AppState;

fn parse_tier(role: pagespace_auth::Role) -> UserTier {
    match role {
        pagespace_auth::Role::Admin => UserTier::Team,
        pagespace_auth::Role::User => UserTier::Free,
    }
}

/// Accept a multipart upload, run it through the admission pipeline, and
/// report the resulting page id and processing status.
pub async fn upload(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut drive_id: Option<DriveId> = None;
    let mut parent_id: Option<PageId> = None;
    let mut title: Option<String> = None;
    let mut position = InsertPosition::Tail;
    let mut after_node_id: Option<PageId> = None;
    let mut filename = String::new();
    let mut media_type = String::from("application/octet-stream");
    let mut bytes: Vec<u8> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::Validation(e.to_string()))? {
        match field.name().unwrap_or_default() {
            "driveId" => drive_id = field.text().await.ok().and_then(|t| t.parse().ok()),
            "parentId" => parent_id = field.text().await.ok().and_then(|t| t.parse().ok()),
            "title" => title = field.text().await.ok(),
            "position" => {
                position = match field.text().await.unwrap_or_default().as_str() {
                    "before" => InsertPosition::Before,
                    "after" => InsertPosition::After,
                    _ => InsertPosition::Tail,
                }
            }
            "afterNodeId" => after_node_id = field.text().await.ok().and_then(|t| t.parse().ok()),
            "file" => {
                filename = field.file_name().unwrap_or("upload").to_string();
                media_type = field.content_type().unwrap_or("application/octet-stream").to_string();
                bytes = field.bytes().await.map_err(|e| ApiError::Validation(e.to_string()))?.to_vec();
            }
            _ => {}
        }
    }

    let drive_id = drive_id.ok_or_else(|| ApiError::Validation("driveId is required".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::Validation("file is required".to_string()));
    }

    let request = UploadRequest {
        user_id: principal.user_id(),
        tier: parse_tier(principal.role()),
        drive_id,
        parent_id,
        title,
        position,
        after_node_id,
        filename,
        media_type,
        bytes,
    };

    let page_id = admit_upload(
        request,
        state.memory_monitor.as_ref(),
        state.quota_service.as_ref(),
        state.upload_semaphores.as_ref(),
        state.active_uploads.as_ref(),
        state.processor.as_ref(),
        state.page_writer.as_ref(),
    )
    .await?;

    state.tree_cache.invalidate(drive_id);

    Ok(Json(json!({"pageId": page_id})))
}
