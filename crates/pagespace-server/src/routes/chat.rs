//! `POST /api/ai/chat` — C11's streaming entry point. Exempted from the
//! outer request timeout (spec.md §6).

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use futures::stream::StreamExt;
use pagespace_ai::prompt::{Mention, PromptContext, TreeNode as PromptTreeNode, TreeScope, VisibleAgent};
use pagespace_ai::provider_factory::{resolve_provider, RequestedSelection, UserProviderDefaults};
use pagespace_ai::FilePart;
use pagespace_auth::Principal;
use pagespace_cache::TreeNode as CacheTreeNode;
use pagespace_catalog::CatalogFilters;
use pagespace_core::{DriveId, PageId};
use pagespace_stream::{run_chat_turn, ChatTurnRequest, OrchestratorEvent};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::repo::PgMessageSink;
use crate::state::AppState;

/// The request body a client posts to start a chat turn.
#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    message: String,
    #[serde(default)]
    attachments: Vec<AttachmentBody>,
    #[serde(default)]
    mentions: Vec<MentionBody>,
    #[serde(rename = "driveId")]
    drive_id: Option<DriveId>,
    #[serde(rename = "pageId")]
    page_id: Option<PageId>,
    #[serde(rename = "timezoneId", default = "default_timezone")]
    timezone_id: String,
    #[serde(rename = "isReadOnly", default)]
    is_read_only: bool,
    #[serde(rename = "webSearchEnabled", default)]
    web_search_enabled: bool,
    #[serde(rename = "selectedProvider")]
    selected_provider: Option<String>,
    #[serde(rename = "selectedModel")]
    selected_model: Option<String>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Deserialize)]
struct AttachmentBody {
    #[serde(rename = "dataUrl")]
    data_url: String,
    filename: String,
}

#[derive(Debug, Deserialize)]
struct MentionBody {
    label: String,
    id: String,
    #[serde(rename = "entityType")]
    entity_type: String,
}

fn convert_tree_node(node: CacheTreeNode) -> PromptTreeNode {
    PromptTreeNode {
        id: node.row.id.to_string(),
        title: node.row.title,
        page_type: format!("{:?}", node.row.page_type),
        children: node.children.into_iter().map(convert_tree_node).collect(),
    }
}

/// Start a chat turn and relay the provider's response as newline-
/// delimited JSON events, one per [`OrchestratorEvent`].
pub async fn chat(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<ChatRequestBody>,
) -> Result<Response, ApiError> {
    let file_parts: Vec<FilePart> = body
        .attachments
        .into_iter()
        .map(|a| FilePart { data_url: a.data_url, filename: a.filename })
        .collect();
    let mentions: Vec<Mention> = body
        .mentions
        .into_iter()
        .map(|m| Mention { label: m.label, id: m.id, entity_type: m.entity_type })
        .collect();

    let (context, tree_roots, tree_scope, drive_id) = match (body.drive_id, body.page_id) {
        (Some(drive_id), Some(page_id)) => {
            let rows = state.tree_cache.get(drive_id).unwrap_or_default();
            let subtree = pagespace_cache::TreeCache::filter_to_subtree(&rows, page_id);
            let roots = pagespace_cache::TreeCache::build_tree(&subtree);
            (
                PromptContext::Page { breadcrumbs: Vec::new(), page_type: "page".to_string(), task_linked: false },
                roots.into_iter().map(convert_tree_node).collect(),
                TreeScope::Children,
                Some(drive_id),
            )
        }
        (Some(drive_id), None) => {
            let rows = state.tree_cache.get(drive_id).unwrap_or_default();
            let roots = pagespace_cache::TreeCache::build_tree(&rows);
            (PromptContext::Drive { name: String::new(), slug: String::new(), id: drive_id }, roots.into_iter().map(convert_tree_node).collect(), TreeScope::WholeDrive, Some(drive_id))
        }
        _ => (PromptContext::Dashboard, Vec::new(), TreeScope::WholeDrive, None),
    };

    let visible_agents: Vec<VisibleAgent> = drive_id
        .and_then(|id| state.agent_cache.get(id))
        .map(|agents| agents.into_iter().map(|a| VisibleAgent { id: a.id.to_string(), title: a.title, definition: a.definition }).collect())
        .unwrap_or_default();

    let selection = RequestedSelection {
        selected_provider: body.selected_provider,
        selected_model: body.selected_model,
        supplied_api_key: None,
    };
    let resolved_provider = resolve_provider(
        &selection,
        &UserProviderDefaults::default(),
        state.provider_settings.as_ref(),
        &state.platform_defaults,
        principal.user_id(),
    )
    .await
    .map_err(|e| ApiError::ProviderMisconfigured(e.to_string()))?;

    let request = ChatTurnRequest {
        user_id: principal.user_id(),
        message_text: body.message,
        file_parts,
        mentions,
        context,
        timezone_id: body.timezone_id,
        visible_agents,
        tree_roots,
        tree_scope,
        catalog_filters: CatalogFilters { is_read_only: body.is_read_only, web_search_enabled: body.web_search_enabled },
        mcp_tools: Vec::new(),
        resolved_provider,
    };

    let sink: Arc<PgMessageSink> = Arc::new(PgMessageSink::new(
        state.db_pool.clone(),
        body.page_id.unwrap_or_default(),
        drive_id.unwrap_or_default(),
    ));

    let handle = run_chat_turn(request, state.abort_registry.clone(), state.chat_driver.clone(), sink, chrono::Utc::now())
        .await?;

    let body_stream = handle.events.map(|event| {
        let line = match event {
            OrchestratorEvent::Text(text) => json!({"type": "text", "text": text}),
            OrchestratorEvent::ToolCall { tool_call_id, tool_name, arguments } => {
                json!({"type": "tool_call", "toolCallId": tool_call_id, "toolName": tool_name, "arguments": arguments})
            }
            OrchestratorEvent::ToolResult { tool_call_id, result } => {
                json!({"type": "tool_result", "toolCallId": tool_call_id, "result": result})
            }
            OrchestratorEvent::Error(message) => json!({"type": "error", "message": message}),
            OrchestratorEvent::Aborted => json!({"type": "aborted"}),
            OrchestratorEvent::Finished => json!({"type": "finished"}),
        };
        Ok::<_, std::io::Error>(format!("{line}\n").into_bytes())
    });

    let response = Response::builder()
        .header("content-type", "application/x-ndjson")
        .header("x-stream-id", handle.stream_id.to_string())
        .body(Body::from_stream(body_stream))
        .map_err(|e| ApiError::Internal(e.into()))?;

    Ok(response.into_response())
}
