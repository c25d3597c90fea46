//! The internal parameter-schema AST used by both internally-declared
//! tools and tools translated from remote MCP JSON Schema (C7).
//!
//! This is a plain data type, not a reflective schema library: internal
//! tools declare it directly as a literal, and the MCP converter builds
//! one from an arbitrary JSON Schema document. There is no shared
//! introspection machinery between the two — intentionally, per the
//! "reflective schema introspection" redesign note.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single parameter type in the internal AST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ParamSchema {
    /// `"type": "string"`.
    String,
    /// `"type": "number"` or `"integer"`.
    Number,
    /// `"type": "boolean"`.
    Boolean,
    /// `"type": "object"` with named properties.
    Object {
        /// Property name to schema, in declaration order.
        properties: BTreeMap<String, Property>,
    },
    /// `"type": "array"` with an `items` schema.
    Array {
        /// Element schema.
        items: Box<ParamSchema>,
    },
    /// A closed set of literal values (from a JSON Schema `enum`, or a
    /// `union` every arm of which was itself a literal).
    Enum {
        /// The allowed literal values, as JSON values so mixed string/
        /// number enums both round-trip.
        values: Vec<serde_json::Value>,
    },
    /// A union whose arms are not all literals, so it cannot collapse to
    /// `Enum`.
    Union {
        /// Each arm's schema.
        arms: Vec<ParamSchema>,
    },
    /// A JSON Schema type this converter does not recognize. Carries the
    /// raw declared type string, if any, for diagnostics.
    Unknown {
        /// The `type` value as declared, if present.
        declared_type: Option<String>,
    },
}

/// A named property within an [`ParamSchema::Object`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// The property's schema.
    pub schema: ParamSchema,
    /// `false` unless the owning object's JSON Schema `required` array
    /// lists this property's name.
    pub required: bool,
    /// Human-readable description, if the schema declared one.
    pub description: Option<String>,
}

/// A single tool definition as the catalog exposes it to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    /// The internal, unnamespaced name for an internal tool, or the
    /// namespaced `mcp:<server>:<tool>` name for an MCP tool.
    pub name: String,
    /// One-line description shown to the model.
    pub description: String,
    /// Parameter schema, always an `Object` at the top level.
    pub parameters: ParamSchema,
    /// `true` if invoking this tool can mutate state.
    pub is_write: bool,
}
