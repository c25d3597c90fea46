//! `GET /api/activities` — paginated activity feed, scoped by query
//! parameter to a user, drive, or page.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use pagespace_auth::Principal;
use pagespace_core::{DriveId, PageId};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::repo::ActivityContext;
use crate::state::AppState;

/// Query parameters accepted by `GET /api/activities`.
#[derive(Debug, Deserialize)]
pub struct ActivitiesQuery {
    context: ActivitiesScope,
    #[serde(rename = "driveId")]
    drive_id: Option<DriveId>,
    #[serde(rename = "pageId")]
    page_id: Option<PageId>,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ActivitiesScope {
    User,
    Drive,
    Page,
}

fn default_limit() -> i64 {
    50
}

/// List activity log entries for the requested scope.
pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ActivitiesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let context = match query.context {
        ActivitiesScope::User => ActivityContext::User(principal.user_id()),
        ActivitiesScope::Drive => {
            let drive_id = query.drive_id.ok_or_else(|| ApiError::Validation("driveId is required".to_string()))?;
            ActivityContext::Drive(drive_id)
        }
        ActivitiesScope::Page => {
            let page_id = query.page_id.ok_or_else(|| ApiError::Validation("pageId is required".to_string()))?;
            ActivityContext::Page(page_id)
        }
    };

    let limit = query.limit.clamp(1, 200);
    let offset = query.offset.max(0);

    let (activities, total) = state
        .activity_repository
        .list(context, limit, offset)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;

    Ok(Json(json!({
        "activities": activities,
        "pagination": {
            "total": total,
            "limit": limit,
            "offset": offset,
            "hasMore": offset + (activities.len() as i64) < total,
        },
    })))
}
