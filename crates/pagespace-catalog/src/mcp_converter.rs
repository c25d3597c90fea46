//! MCP Tool Converter (C7, spec.md §4.5).
//!
//! Validates and namespaces tool identifiers declared by remote MCP
//! servers, and translates their JSON Schema parameter declarations into
//! the internal [`ParamSchema`] AST.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::ConverterError;
use crate::schema::{ParamSchema, Property, ToolDef};

const MAX_NAME_LEN: usize = 64;

/// Property names rejected during object translation, a defense-in-depth
/// holdover against prototype-pollution-style attacks from a malicious
/// remote tool declaration (spec.md §9 design note).
const FORBIDDEN_PROPERTY_NAMES: [&str; 3] = ["__proto__", "constructor", "prototype"];

fn is_valid_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_NAME_LEN
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Validate a server or tool name component per spec.md §4.5 step 1.
///
/// # Errors
/// [`ConverterError::InvalidName`] if empty, over 64 characters, or
/// containing anything outside `[A-Za-z0-9_-]`.
pub fn validate_name_component(name: &str) -> Result<(), ConverterError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(ConverterError::InvalidName(name.to_string()))
    }
}

/// Namespace a validated `(server, tool)` pair as `mcp:<server>:<tool>`.
#[must_use]
pub fn namespace_colon(server: &str, tool: &str) -> String {
    format!("mcp:{server}:{tool}")
}

/// Namespace for providers that forbid colons in tool names (Gemini,
/// Azure, OpenAI): every `:` becomes `__`.
#[must_use]
pub fn namespace_underscore(server: &str, tool: &str) -> String {
    namespace_colon(server, tool).replace(':', "__")
}

/// Parsed namespaced name: which server the tool belongs to, and the
/// (possibly separator-containing) tool name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedToolName {
    /// The server segment (first segment after the `mcp` prefix).
    pub server: String,
    /// Everything after the server segment — may itself contain further
    /// `:` or `__`, per spec.md §4.5 step 2.
    pub tool: String,
}

/// Parse a namespaced MCP tool name, accepting both the colon form
/// (`mcp:server:tool`) and the legacy underscore form (`mcp__server__tool`).
///
/// # Errors
/// [`ConverterError::InvalidNamespace`] if the string begins with neither
/// `mcp:` nor `mcp__`.
pub fn parse_namespaced_name(name: &str) -> Result<ParsedToolName, ConverterError> {
    if let Some(rest) = name.strip_prefix("mcp:") {
        let mut parts = rest.splitn(2, ':');
        let server = parts.next().unwrap_or_default().to_string();
        let tool = parts.next().unwrap_or_default().to_string();
        return Ok(ParsedToolName { server, tool });
    }
    if let Some(rest) = name.strip_prefix("mcp__") {
        let mut parts = rest.splitn(2, "__");
        let server = parts.next().unwrap_or_default().to_string();
        let tool = parts.next().unwrap_or_default().to_string();
        return Ok(ParsedToolName { server, tool });
    }
    Err(ConverterError::InvalidNamespace(name.to_string()))
}

/// Translate a JSON Schema document (as produced by a remote MCP server's
/// tool declaration) into the internal [`ParamSchema`] AST.
///
/// Unknown `type` values degrade to [`ParamSchema::Unknown`] with a
/// logged warning rather than failing the whole conversion, so one
/// unrecognized tool parameter does not take down an entire server's
/// catalog.
#[must_use]
pub fn translate_schema(schema: &Value) -> ParamSchema {
    if let Some(variants) = schema.get("oneOf").or_else(|| schema.get("anyOf")) {
        return translate_union(variants);
    }

    if let Some(values) = schema.get("enum").and_then(Value::as_array) {
        return ParamSchema::Enum {
            values: values.clone(),
        };
    }

    match schema.get("type").and_then(Value::as_str) {
        Some("string") => ParamSchema::String,
        Some("number" | "integer") => ParamSchema::Number,
        Some("boolean") => ParamSchema::Boolean,
        Some("object") => translate_object(schema),
        Some("array") => translate_array(schema),
        other => {
            tracing::warn!(declared_type = ?other, "unrecognized MCP tool schema type; degrading to unknown");
            ParamSchema::Unknown {
                declared_type: other.map(str::to_string),
            }
        }
    }
}

fn translate_union(variants: &Value) -> ParamSchema {
    let arms: Vec<ParamSchema> = variants
        .as_array()
        .map(|vs| vs.iter().map(translate_schema).collect())
        .unwrap_or_default();

    let all_literal = !arms.is_empty() && arms.iter().all(|a| matches!(a, ParamSchema::Enum { values } if values.len() == 1));
    if all_literal {
        let values = arms
            .into_iter()
            .filter_map(|a| match a {
                ParamSchema::Enum { values } => values.into_iter().next(),
                _ => None,
            })
            .collect();
        return ParamSchema::Enum { values };
    }

    ParamSchema::Union { arms }
}

fn translate_array(schema: &Value) -> ParamSchema {
    let items = schema
        .get("items")
        .map(translate_schema)
        .unwrap_or(ParamSchema::Unknown { declared_type: None });
    ParamSchema::Array {
        items: Box::new(items),
    }
}

fn translate_object(schema: &Value) -> ParamSchema {
    let required: HashSet<String> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    let mut properties = std::collections::BTreeMap::new();
    if let Some(props) = schema.get("properties").and_then(Value::as_object) {
        for (name, prop_schema) in props {
            if FORBIDDEN_PROPERTY_NAMES.contains(&name.as_str()) {
                tracing::warn!(property = %name, "rejected forbidden property name in MCP tool schema");
                continue;
            }
            let description = prop_schema
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string);
            properties.insert(
                name.clone(),
                Property {
                    schema: translate_schema(prop_schema),
                    required: required.contains(name),
                    description,
                },
            );
        }
    }

    ParamSchema::Object { properties }
}

/// Validate and convert a full remote tool declaration into a namespaced
/// internal [`ToolDef`], per spec.md §4.5 steps 1-3.
///
/// `use_colon` selects the namespacing form; pass `false` for providers
/// that forbid colons in tool names (Gemini, Azure, OpenAI).
///
/// # Errors
/// [`ConverterError::InvalidName`] if `server_name` or `tool_name` fails
/// validation.
pub fn convert_mcp_tool(
    server_name: &str,
    tool_name: &str,
    description: &str,
    input_schema: &Value,
    use_colon: bool,
) -> Result<ToolDef, ConverterError> {
    validate_name_component(server_name)?;
    validate_name_component(tool_name)?;

    let name = if use_colon {
        namespace_colon(server_name, tool_name)
    } else {
        namespace_underscore(server_name, tool_name)
    };

    Ok(ToolDef {
        name,
        description: description.to_string(),
        parameters: translate_schema(input_schema),
        // MCP tools are remote-defined and carry no internal write/read
        // classification; they are never subject to the isReadOnly filter
        // (spec.md §4.5 scopes that filter to the internal write-ops set).
        is_write: false,
    })
}
