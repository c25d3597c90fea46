//! The provider-driver contract consumed by the streaming orchestrator
//! (spec.md §9 design note: "express as an explicit task that owns a send
//! channel, a cancellation token, and a provider-driver interface with a
//! `stream(ctx, req) -> Iterator<Chunk>` contract").
//!
//! This crate resolves *which* provider/model/credential to use (C4, C5);
//! it does not itself speak to any upstream API. A concrete driver for
//! each [`crate::provider_factory::Provider`] lives in the server crate,
//! where the HTTP client stack and per-provider wire formats belong.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::provider_factory::ResolvedProvider;
use pagespace_catalog::ToolDef;

/// One role-tagged message in the conversation sent to the provider.
#[derive(Debug, Clone)]
pub struct DriverMessage {
    /// `"system"`, `"user"`, or `"assistant"`.
    pub role: &'static str,
    /// Rendered text content.
    pub content: String,
}

/// A single streaming request to a resolved provider.
#[derive(Debug, Clone)]
pub struct DriverRequest {
    /// Resolved provider/model/credential.
    pub provider: ResolvedProvider,
    /// The assembled system prompt plus conversation history.
    pub messages: Vec<DriverMessage>,
    /// The effective tool map for this request (internal tools merged
    /// with any converted MCP tools).
    pub tools: Vec<ToolDef>,
}

/// One chunk of a streaming response, in emission order.
#[derive(Debug, Clone)]
pub enum DriverChunk {
    /// A span of assistant text.
    Text(String),
    /// The model invoked a tool.
    ToolCall {
        /// Correlates this call to its eventual [`DriverChunk::ToolResult`].
        tool_call_id: String,
        /// Tool name as the provider saw it (already de-namespaced if
        /// this was an MCP tool).
        tool_name: String,
        /// Raw JSON arguments the model supplied.
        arguments: serde_json::Value,
    },
    /// The result of a previously emitted tool call.
    ToolResult {
        /// Matches a prior [`DriverChunk::ToolCall`]'s `tool_call_id`.
        tool_call_id: String,
        /// Serialized result payload.
        result: serde_json::Value,
    },
    /// A recoverable fault mid-stream; surfaced as a `tool error`/`error`
    /// part rather than aborting non-streaming (spec.md §7).
    Error(String),
    /// The stream has no more chunks.
    Finished,
}

/// A live LLM provider connection, abstracting over every concrete
/// `(provider, model)` pairing behind one streaming contract.
#[async_trait]
pub trait ChatDriver: Send + Sync {
    /// Begin streaming a response for `request`. The returned stream ends
    /// with [`DriverChunk::Finished`] on success, or may end early if the
    /// orchestrator drops it (e.g. on abort).
    async fn stream(&self, request: DriverRequest) -> BoxStream<'static, DriverChunk>;
}
