//! Persisted structured message content (spec.md §6).
//!
//! A `ChatMessage.content` is either plain text (legacy rows) or this
//! envelope. `parts_order` is the single source of truth for
//! reconstruction; tool parts refer into `tool_calls`/`tool_results` by
//! `tool_call_id`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One inline file part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePart {
    /// The `data:` URL.
    pub url: String,
    /// Declared MIME type.
    pub media_type: String,
    /// Caller-declared filename.
    pub filename: String,
}

/// A single entry in `partsOrder`: which kind of part occupies this
/// position, and (for tool parts) which call/result it refers to.
///
/// Tagging is hand-rolled rather than `#[serde(tag = "type")]` because the
/// tool variant's wire tag is not a fixed literal: spec.md §6 embeds the
/// tool name directly into the tag as `"tool-<toolName>"`, e.g.
/// `{"index":2,"type":"tool-list_pages","toolCallId":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartRef {
    /// A text part; `index` indexes into `text_parts`.
    Text {
        /// Position in `text_parts`.
        index: usize,
    },
    /// A file part; `index` indexes into `file_parts`.
    File {
        /// Position in `file_parts`.
        index: usize,
    },
    /// A tool call or result part. `type` on the wire is
    /// `"tool-<toolName>"`; `tool_name` carries `<toolName>` alone.
    Tool {
        /// The tool name, without the `tool-` wire prefix.
        tool_name: String,
        /// Correlates to an entry in `tool_calls`/`tool_results`.
        tool_call_id: String,
    },
}

impl Serialize for PartRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;

        match self {
            Self::Text { index } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "text")?;
                map.serialize_entry("index", index)?;
                map.end()
            }
            Self::File { index } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "file")?;
                map.serialize_entry("index", index)?;
                map.end()
            }
            Self::Tool { tool_name, tool_call_id } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", &format!("tool-{tool_name}"))?;
                map.serialize_entry("toolCallId", tool_call_id)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for PartRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(rename = "type")]
            kind: String,
            index: Option<usize>,
            #[serde(rename = "toolCallId")]
            tool_call_id: Option<String>,
        }

        let raw = Raw::deserialize(deserializer)?;
        match raw.kind.as_str() {
            "text" => Ok(Self::Text {
                index: raw.index.ok_or_else(|| D::Error::missing_field("index"))?,
            }),
            "file" => Ok(Self::File {
                index: raw.index.ok_or_else(|| D::Error::missing_field("index"))?,
            }),
            other => {
                let tool_name = other
                    .strip_prefix("tool-")
                    .ok_or_else(|| D::Error::custom(format!("unrecognized partsOrder type: {other}")))?
                    .to_string();
                Ok(Self::Tool {
                    tool_name,
                    tool_call_id: raw
                        .tool_call_id
                        .ok_or_else(|| D::Error::missing_field("toolCallId"))?,
                })
            }
        }
    }
}

/// One parsed part of a message, in display order — the form callers
/// build from and reconstruct into an [`Envelope`].
#[derive(Debug, Clone, PartialEq)]
pub enum MessagePart {
    /// Plain text.
    Text(String),
    /// An inline file.
    File(FilePart),
    /// A tool call, pending its result.
    ToolCall {
        /// Tool name, unnamespaced.
        tool_name: String,
        /// Correlation id.
        tool_call_id: String,
        /// Raw JSON arguments.
        arguments: serde_json::Value,
    },
    /// A tool result.
    ToolResult {
        /// Matches a prior [`MessagePart::ToolCall`]'s `tool_call_id`.
        tool_call_id: String,
        /// Serialized result payload.
        result: serde_json::Value,
    },
}

/// A tool call record as persisted alongside the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRecord {
    /// Correlation id.
    pub tool_call_id: String,
    /// Tool name.
    pub tool_name: String,
    /// Raw JSON arguments.
    pub arguments: serde_json::Value,
}

/// A tool result record as persisted alongside the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultRecord {
    /// Correlation id, matching a [`ToolCallRecord`].
    pub tool_call_id: String,
    /// Serialized result payload.
    pub result: serde_json::Value,
}

/// The persisted structured content envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Text parts, in the order first referenced by `parts_order`.
    pub text_parts: Vec<String>,
    /// File parts, in the order first referenced by `parts_order`.
    #[serde(default)]
    pub file_parts: Vec<FilePart>,
    /// The single source of truth for reconstructing part order.
    pub parts_order: Vec<PartRef>,
    /// Tool calls made while producing this message.
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
    /// Tool results folded back into this message.
    #[serde(default)]
    pub tool_results: Vec<ToolResultRecord>,
    /// Original unprocessed content, kept for audit/debugging.
    pub original_content: String,
}

/// Encode an ordered sequence of parts into an [`Envelope`].
#[must_use]
pub fn encode(parts: &[MessagePart], original_content: String) -> Envelope {
    let mut text_parts = Vec::new();
    let mut file_parts = Vec::new();
    let mut tool_calls = Vec::new();
    let mut tool_results = Vec::new();
    let mut parts_order = Vec::with_capacity(parts.len());

    for part in parts {
        match part {
            MessagePart::Text(text) => {
                let index = text_parts.len();
                text_parts.push(text.clone());
                parts_order.push(PartRef::Text { index });
            }
            MessagePart::File(file) => {
                let index = file_parts.len();
                file_parts.push(file.clone());
                parts_order.push(PartRef::File { index });
            }
            MessagePart::ToolCall {
                tool_name,
                tool_call_id,
                arguments,
            } => {
                tool_calls.push(ToolCallRecord {
                    tool_call_id: tool_call_id.clone(),
                    tool_name: tool_name.clone(),
                    arguments: arguments.clone(),
                });
                parts_order.push(PartRef::Tool {
                    tool_name: tool_name.clone(),
                    tool_call_id: tool_call_id.clone(),
                });
            }
            MessagePart::ToolResult { tool_call_id, result } => {
                tool_results.push(ToolResultRecord {
                    tool_call_id: tool_call_id.clone(),
                    result: result.clone(),
                });
            }
        }
    }

    Envelope {
        text_parts,
        file_parts,
        parts_order,
        tool_calls,
        tool_results,
        original_content,
    }
}

/// Decode an [`Envelope`] back into its ordered sequence of parts, per
/// `parts_order`. Tool-call parts are paired with their result when one
/// exists in `tool_results`; a call with no matching result yet (still
/// streaming) is surfaced as the call alone.
#[must_use]
pub fn decode(envelope: &Envelope) -> Vec<MessagePart> {
    let mut out = Vec::with_capacity(envelope.parts_order.len());

    for part_ref in &envelope.parts_order {
        match part_ref {
            PartRef::Text { index } => {
                if let Some(text) = envelope.text_parts.get(*index) {
                    out.push(MessagePart::Text(text.clone()));
                }
            }
            PartRef::File { index } => {
                if let Some(file) = envelope.file_parts.get(*index) {
                    out.push(MessagePart::File(file.clone()));
                }
            }
            PartRef::Tool {
                tool_name,
                tool_call_id,
            } => {
                if let Some(call) = envelope.tool_calls.iter().find(|c| &c.tool_call_id == tool_call_id) {
                    out.push(MessagePart::ToolCall {
                        tool_name: tool_name.clone(),
                        tool_call_id: call.tool_call_id.clone(),
                        arguments: call.arguments.clone(),
                    });
                }
                if let Some(result) = envelope.tool_results.iter().find(|r| &r.tool_call_id == tool_call_id) {
                    out.push(MessagePart::ToolResult {
                        tool_call_id: result.tool_call_id.clone(),
                        result: result.result.clone(),
                    });
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_text_and_file_interleaving() {
        let parts = vec![
            MessagePart::Text("hello".into()),
            MessagePart::File(FilePart {
                url: "data:image/png;base64,AAAA".into(),
                media_type: "image/png".into(),
                filename: "a.png".into(),
            }),
            MessagePart::Text("world".into()),
        ];
        let envelope = encode(&parts, "hello world".into());
        let decoded = decode(&envelope);
        assert_eq!(decoded, parts);
    }

    #[test]
    fn round_trips_tool_call_and_result() {
        let parts = vec![
            MessagePart::Text("checking...".into()),
            MessagePart::ToolCall {
                tool_name: "list_pages".into(),
                tool_call_id: "call_1".into(),
                arguments: serde_json::json!({}),
            },
            MessagePart::ToolResult {
                tool_call_id: "call_1".into(),
                result: serde_json::json!({"pages": []}),
            },
            MessagePart::Text("done".into()),
        ];
        let envelope = encode(&parts, "checking... done".into());
        assert_eq!(envelope.parts_order.len(), 3);
        let decoded = decode(&envelope);
        assert_eq!(decoded, parts);
    }

    #[test]
    fn missing_file_parts_is_a_valid_legacy_shape() {
        let json = serde_json::json!({
            "textParts": ["hi"],
            "partsOrder": [{"type": "text", "index": 0}],
            "originalContent": "hi"
        });
        let envelope: Envelope = serde_json::from_value(json).unwrap();
        assert!(envelope.file_parts.is_empty());
        let decoded = decode(&envelope);
        assert_eq!(decoded, vec![MessagePart::Text("hi".into())]);
    }

    #[test]
    fn pending_tool_call_without_result_surfaces_call_alone() {
        let parts = vec![MessagePart::ToolCall {
            tool_name: "web_search".into(),
            tool_call_id: "call_1".into(),
            arguments: serde_json::json!({"query": "rust"}),
        }];
        let envelope = encode(&parts, String::new());
        let decoded = decode(&envelope);
        assert_eq!(decoded.len(), 1);
        assert!(matches!(decoded[0], MessagePart::ToolCall { .. }));
    }
}
