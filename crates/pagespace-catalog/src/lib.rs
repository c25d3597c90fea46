//! # pagespace-catalog
//!
//! Tool catalog aggregation (C6) and MCP tool schema conversion (C7) for
//! the PageSpace AI gateway core.
//!
//! `catalog` owns the eight fixed internal tool groups and the
//! `isReadOnly`/`webSearchEnabled` filters applied per request.
//! `mcp_converter` validates and namespaces externally-declared tool
//! identifiers and translates their JSON Schema into the internal
//! [`schema::ParamSchema`] AST that both internal and MCP tools share.

#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod catalog;
pub mod error;
pub mod mcp_converter;
pub mod schema;

#[doc(inline)]
pub use catalog::{CatalogFilters, CatalogSummary, ToolCatalog, WEB_SEARCH_TOOL_NAME};
#[doc(inline)]
pub use error::ConverterError;
#[doc(inline)]
pub use schema::{ParamSchema, Property, ToolDef};
