//! Streaming Orchestrator (C11, spec.md §4.9).
//!
//! Drives one chat turn end to end: validates attachments, persists the
//! user message, assembles the prompt, merges the effective tool map,
//! allocates an abort-registry entry, invokes the provider driver, and
//! relays chunks to the caller while recording `partsOrder`. Disconnect
//! does not stop the turn; only an explicit [`crate::abort_registry::AbortRegistry::abort`]
//! does (spec.md §4.9 steps 9-10).

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use pagespace_ai::driver::{ChatDriver, DriverChunk, DriverMessage, DriverRequest};
use pagespace_ai::prompt::{assemble_prompt, PromptContext, PromptInputs};
use pagespace_ai::provider_factory::ResolvedProvider;
use pagespace_ai::{attachments, FilePart as AiFilePart};
use pagespace_catalog::{CatalogFilters, ToolCatalog, ToolDef};
use pagespace_core::{StreamId, UserId};

use crate::abort_registry::AbortRegistry;
use crate::error::{StreamError, StreamResult};
use crate::message::{self, Envelope, FilePart as EnvelopeFilePart, MessagePart};

/// Where a completed or in-progress chat turn's messages are persisted.
/// The caller (server crate) provides a `sqlx`-backed implementation.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Persist the user's message envelope before the provider is called.
    async fn persist_user_message(&self, user_id: UserId, envelope: &Envelope);
    /// Persist the assistant's message envelope once the turn ends, by
    /// completion, abort, or mid-stream error.
    async fn persist_assistant_message(&self, user_id: UserId, envelope: &Envelope);
}

/// An event relayed to the client as the provider streams its response.
/// Mirrors [`DriverChunk`] at the orchestrator boundary, plus a terminal
/// `Aborted` variant the driver itself never emits.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    /// A span of assistant text.
    Text(String),
    /// The model invoked a tool.
    ToolCall {
        /// Correlation id.
        tool_call_id: String,
        /// Tool name, already namespaced if it came from an MCP server.
        tool_name: String,
        /// Raw JSON arguments.
        arguments: serde_json::Value,
    },
    /// The result of a previously emitted tool call.
    ToolResult {
        /// Matches a prior `ToolCall`'s `tool_call_id`.
        tool_call_id: String,
        /// Serialized result payload.
        result: serde_json::Value,
    },
    /// A recoverable mid-stream fault (spec.md §7).
    Error(String),
    /// The turn was cancelled via an explicit abort.
    Aborted,
    /// The stream has no more events.
    Finished,
}

/// Everything needed to assemble the prompt and drive one chat turn.
#[derive(Debug, Clone)]
pub struct ChatTurnRequest {
    /// The requesting user.
    pub user_id: UserId,
    /// The user's raw message text.
    pub message_text: String,
    /// Inline file attachments on the user's message, pre-validation.
    pub file_parts: Vec<AiFilePart>,
    /// `@[label](id:type)` mentions attached to the message.
    pub mentions: Vec<pagespace_ai::prompt::Mention>,
    /// Request context (dashboard/drive/page), for the prompt's context
    /// and inline-instruction sections.
    pub context: PromptContext,
    /// IANA timezone id for the timestamp section.
    pub timezone_id: String,
    /// Agents visible to the user, for the agent-awareness section.
    pub visible_agents: Vec<pagespace_ai::prompt::VisibleAgent>,
    /// Page tree roots for the page-tree section.
    pub tree_roots: Vec<pagespace_ai::prompt::TreeNode>,
    /// Page-tree scope.
    pub tree_scope: pagespace_ai::prompt::TreeScope,
    /// `isReadOnly`/`webSearchEnabled` filters for the internal catalog.
    pub catalog_filters: CatalogFilters,
    /// MCP tools already converted and namespaced (C7), to merge with the
    /// internal catalog (C6).
    pub mcp_tools: Vec<ToolDef>,
    /// The resolved provider/model/credential for this turn (C4).
    pub resolved_provider: ResolvedProvider,
}

/// A chat turn's client-visible handle: the allocated stream id (to be
/// echoed as `X-Stream-Id`) and the event stream to relay.
pub struct ChatTurnHandle {
    /// The allocated stream id.
    pub stream_id: StreamId,
    /// Events in emission order, terminated by `Finished` or `Aborted`.
    pub events: BoxStream<'static, OrchestratorEvent>,
}

/// Merge the internal tool catalog (filtered per `filters`) with already-
/// namespaced MCP tools into one effective tool map, internal tools
/// winning any name collision (spec.md §4.9 step 4).
#[must_use]
pub fn build_effective_tool_map(filters: CatalogFilters, mcp_tools: &[ToolDef]) -> Vec<ToolDef> {
    let catalog = ToolCatalog::filtered(filters);
    let mut merged: BTreeMap<String, ToolDef> = BTreeMap::new();
    for tool in mcp_tools {
        merged.insert(tool.name.clone(), tool.clone());
    }
    for tool in catalog.iter() {
        merged.insert(tool.name.clone(), tool.clone());
    }
    merged.into_values().collect()
}

fn user_message_parts(request: &ChatTurnRequest) -> Vec<MessagePart> {
    let mut parts = Vec::with_capacity(1 + request.file_parts.len());
    if !request.message_text.is_empty() {
        parts.push(MessagePart::Text(request.message_text.clone()));
    }
    for file in &request.file_parts {
        parts.push(MessagePart::File(EnvelopeFilePart {
            url: file.data_url.clone(),
            media_type: extract_mime(&file.data_url),
            filename: file.filename.clone(),
        }));
    }
    parts
}

fn extract_mime(data_url: &str) -> String {
    data_url
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Drive one chat turn end to end (spec.md §4.9).
///
/// # Errors
/// [`StreamError::InvalidAttachment`] if any of `request.file_parts` fails
/// validation (C9); in that case nothing is persisted and no stream entry
/// is allocated.
pub async fn run_chat_turn(
    request: ChatTurnRequest,
    registry: Arc<AbortRegistry>,
    driver: Arc<dyn ChatDriver>,
    sink: Arc<dyn MessageSink>,
    now: chrono::DateTime<chrono::Utc>,
) -> StreamResult<ChatTurnHandle> {
    attachments::validate_attachments(&request.file_parts).map_err(StreamError::InvalidAttachment)?;

    let user_parts = user_message_parts(&request);
    let user_envelope = message::encode(&user_parts, request.message_text.clone());
    sink.persist_user_message(request.user_id, &user_envelope).await;

    let prompt_inputs = PromptInputs {
        is_read_only: request.catalog_filters.is_read_only,
        context: request.context,
        mentions: request.mentions,
        timezone_id: request.timezone_id,
        visible_agents: request.visible_agents,
        tree_roots: request.tree_roots,
        tree_scope: request.tree_scope,
    };
    let assembled = assemble_prompt(&prompt_inputs, now);

    let tools = build_effective_tool_map(request.catalog_filters, &request.mcp_tools);

    let (stream_id, cancel) = registry.create(request.user_id, None);

    let messages = vec![
        DriverMessage {
            role: "system",
            content: assembled.text,
        },
        DriverMessage {
            role: "user",
            content: request.message_text,
        },
    ];
    let driver_request = DriverRequest {
        provider: request.resolved_provider,
        messages,
        tools,
    };

    let (tx, rx) = mpsc::channel(32);
    let events = ReceiverStream::new(rx).boxed();

    let user_id = request.user_id;
    tokio::spawn(relay_turn(
        driver,
        driver_request,
        cancel,
        tx,
        sink,
        user_id,
        stream_id.clone(),
        registry,
    ));

    Ok(ChatTurnHandle { stream_id, events })
}

async fn relay_turn(
    driver: Arc<dyn ChatDriver>,
    request: DriverRequest,
    cancel: CancellationToken,
    tx: mpsc::Sender<OrchestratorEvent>,
    sink: Arc<dyn MessageSink>,
    user_id: UserId,
    stream_id: StreamId,
    registry: Arc<AbortRegistry>,
) {
    let mut parts: Vec<MessagePart> = Vec::new();
    let mut driver_stream = driver.stream(request).await;
    let mut ended = OrchestratorEvent::Finished;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                ended = OrchestratorEvent::Aborted;
                break;
            }
            chunk = driver_stream.next() => {
                let Some(chunk) = chunk else {
                    break;
                };
                match chunk {
                    DriverChunk::Text(text) => {
                        parts.push(MessagePart::Text(text.clone()));
                        if tx.send(OrchestratorEvent::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    DriverChunk::ToolCall { tool_call_id, tool_name, arguments } => {
                        parts.push(MessagePart::ToolCall {
                            tool_name: tool_name.clone(),
                            tool_call_id: tool_call_id.clone(),
                            arguments: arguments.clone(),
                        });
                        if tx
                            .send(OrchestratorEvent::ToolCall { tool_call_id, tool_name, arguments })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    DriverChunk::ToolResult { tool_call_id, result } => {
                        parts.push(MessagePart::ToolResult {
                            tool_call_id: tool_call_id.clone(),
                            result: result.clone(),
                        });
                        if tx
                            .send(OrchestratorEvent::ToolResult { tool_call_id, result })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    DriverChunk::Error(message) => {
                        if tx.send(OrchestratorEvent::Error(message)).await.is_err() {
                            break;
                        }
                    }
                    DriverChunk::Finished => {
                        break;
                    }
                }
            }
        }
    }

    let original_content = parts
        .iter()
        .filter_map(|p| match p {
            MessagePart::Text(t) => Some(t.clone()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("");
    let envelope = message::encode(&parts, original_content);
    sink.persist_assistant_message(user_id, &envelope).await;

    registry.remove(&stream_id);
    let _ = tx.send(ended).await;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::stream;
    use pagespace_ai::provider_factory::{Provider, ProviderCredential};

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        user: Mutex<Vec<Envelope>>,
        assistant: Mutex<Vec<Envelope>>,
    }

    #[async_trait]
    impl MessageSink for RecordingSink {
        async fn persist_user_message(&self, _user_id: UserId, envelope: &Envelope) {
            self.user.lock().unwrap().push(envelope.clone());
        }

        async fn persist_assistant_message(&self, _user_id: UserId, envelope: &Envelope) {
            self.assistant.lock().unwrap().push(envelope.clone());
        }
    }

    struct ScriptedDriver {
        chunks: Vec<DriverChunk>,
    }

    #[async_trait]
    impl ChatDriver for ScriptedDriver {
        async fn stream(&self, _request: DriverRequest) -> BoxStream<'static, DriverChunk> {
            stream::iter(self.chunks.clone()).boxed()
        }
    }

    fn resolved_provider() -> ResolvedProvider {
        ResolvedProvider {
            provider: Provider::Pagespace,
            model: "glm-4.6".into(),
            credential: ProviderCredential::ApiKey(secrecy::SecretString::new("k".into())),
        }
    }

    fn base_request() -> ChatTurnRequest {
        ChatTurnRequest {
            user_id: UserId::new(),
            message_text: "list pages".into(),
            file_parts: vec![],
            mentions: vec![],
            context: PromptContext::Dashboard,
            timezone_id: "UTC".into(),
            visible_agents: vec![],
            tree_roots: vec![],
            tree_scope: pagespace_ai::prompt::TreeScope::WholeDrive,
            catalog_filters: CatalogFilters {
                is_read_only: false,
                web_search_enabled: true,
            },
            mcp_tools: vec![],
            resolved_provider: resolved_provider(),
        }
    }

    #[tokio::test]
    async fn happy_path_relays_tool_call_result_and_text_then_persists() {
        let driver: Arc<dyn ChatDriver> = Arc::new(ScriptedDriver {
            chunks: vec![
                DriverChunk::ToolCall {
                    tool_call_id: "call_1".into(),
                    tool_name: "list_pages".into(),
                    arguments: serde_json::json!({}),
                },
                DriverChunk::ToolResult {
                    tool_call_id: "call_1".into(),
                    result: serde_json::json!({"pages": []}),
                },
                DriverChunk::Text("Here are your pages.".into()),
                DriverChunk::Finished,
            ],
        });
        let sink = Arc::new(RecordingSink::default());
        let registry = Arc::new(AbortRegistry::new());
        let now = chrono::Utc::now();

        let handle = run_chat_turn(base_request(), registry, driver, sink.clone(), now)
            .await
            .unwrap();

        let events: Vec<OrchestratorEvent> = handle.events.collect().await;
        assert!(events.iter().any(|e| matches!(e, OrchestratorEvent::ToolCall { .. })));
        assert!(events.iter().any(|e| matches!(e, OrchestratorEvent::ToolResult { .. })));
        assert!(events.iter().any(|e| matches!(e, OrchestratorEvent::Text(t) if t.contains("pages"))));
        assert!(matches!(events.last(), Some(OrchestratorEvent::Finished)));

        // allow the spawned persistence write to land
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(sink.user.lock().unwrap().len(), 1);
        assert_eq!(sink.assistant.lock().unwrap().len(), 1);
        assert_eq!(sink.assistant.lock().unwrap()[0].parts_order.len(), 3);
    }

    #[tokio::test]
    async fn rejects_invalid_attachment_before_persisting_or_allocating() {
        let driver: Arc<dyn ChatDriver> = Arc::new(ScriptedDriver { chunks: vec![] });
        let sink = Arc::new(RecordingSink::default());
        let registry = Arc::new(AbortRegistry::new());
        let mut request = base_request();
        request.file_parts.push(AiFilePart {
            data_url: "not-a-data-url".into(),
            filename: "x.png".into(),
        });

        let err = run_chat_turn(request, registry.clone(), driver, sink.clone(), chrono::Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::InvalidAttachment(_)));
        assert_eq!(sink.user.lock().unwrap().len(), 0);
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn build_effective_tool_map_merges_internal_and_mcp_tools() {
        let mcp_tool = ToolDef {
            name: "mcp:github:search".into(),
            description: "Search github".into(),
            parameters: pagespace_catalog::ParamSchema::Object { properties: Default::default() },
            is_write: false,
        };
        let tools = build_effective_tool_map(
            CatalogFilters { is_read_only: true, web_search_enabled: true },
            &[mcp_tool],
        );
        assert!(tools.iter().any(|t| t.name == "mcp:github:search"));
        assert!(tools.iter().any(|t| t.name == "list_pages"));
        assert!(!tools.iter().any(|t| t.name == "create_page"));
    }
}
