//! Error types for tool-catalog aggregation and MCP tool conversion.

/// Failures from the MCP tool converter (C7, spec.md §4.5).
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum ConverterError {
    /// A server or tool name component failed validation (empty, over 64
    /// characters, or outside `[A-Za-z0-9_-]`).
    #[error("invalid MCP tool name component: {0:?}")]
    InvalidName(String),
    /// A namespaced tool name began with neither `mcp:` nor `mcp__`.
    #[error("not a recognized MCP tool namespace: {0:?}")]
    InvalidNamespace(String),
}
