//! Tool Catalog (C6, spec.md §4.5).
//!
//! Aggregates eight fixed internal tool groups into a flat `name → tool`
//! map, then applies the two boolean filters every request carries:
//! `isReadOnly` strips every write-capable tool, and `webSearchEnabled ==
//! false` strips `web_search`.

use std::collections::BTreeMap;

use crate::schema::{ParamSchema, Property, ToolDef};

fn string_param(description: &str) -> Property {
    Property {
        schema: ParamSchema::String,
        required: true,
        description: Some(description.to_string()),
    }
}

fn optional_string_param(description: &str) -> Property {
    Property {
        schema: ParamSchema::String,
        required: false,
        description: Some(description.to_string()),
    }
}

fn object(properties: &[(&str, Property)]) -> ParamSchema {
    ParamSchema::Object {
        properties: properties
            .iter()
            .map(|(name, prop)| ((*name).to_string(), prop.clone()))
            .collect(),
    }
}

fn tool(name: &str, description: &str, parameters: ParamSchema, is_write: bool) -> ToolDef {
    ToolDef {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
        is_write,
    }
}

/// Page read/navigation tools.
fn page_read_tools() -> Vec<ToolDef> {
    vec![
        tool(
            "list_pages",
            "List pages in the current drive or subtree",
            object(&[("driveId", optional_string_param("Drive to list")), (
                "parentId",
                optional_string_param("Restrict to children of this page"),
            )]),
            false,
        ),
        tool(
            "read_page",
            "Read a page's content",
            object(&[("pageId", string_param("Page to read"))]),
            false,
        ),
    ]
}

/// Page write tools.
fn page_write_tools() -> Vec<ToolDef> {
    vec![
        tool(
            "create_page",
            "Create a new page",
            object(&[
                ("driveId", string_param("Drive to create the page in")),
                ("parentId", optional_string_param("Parent page")),
                ("title", string_param("Page title")),
            ]),
            true,
        ),
        tool(
            "update_page",
            "Update a page's content or title",
            object(&[("pageId", string_param("Page to update"))]),
            true,
        ),
        tool(
            "move_page",
            "Move a page to a new parent or position",
            object(&[
                ("pageId", string_param("Page to move")),
                ("newParentId", optional_string_param("New parent page")),
            ]),
            true,
        ),
        tool(
            "trash_page",
            "Move a page to trash",
            object(&[("pageId", string_param("Page to trash"))]),
            true,
        ),
        tool(
            "restore_page",
            "Restore a page from trash",
            object(&[("pageId", string_param("Page to restore"))]),
            true,
        ),
    ]
}

/// Drive-level tools.
fn drive_tools() -> Vec<ToolDef> {
    vec![tool(
        "list_drives",
        "List drives the caller can access",
        object(&[]),
        false,
    )]
}

/// Search tools.
fn search_tools() -> Vec<ToolDef> {
    vec![tool(
        "search_pages",
        "Full-text search over accessible pages",
        object(&[("query", string_param("Search text"))]),
        false,
    )]
}

/// Task-list tools.
fn task_tools() -> Vec<ToolDef> {
    vec![
        tool(
            "list_tasks",
            "List tasks on a TASK_LIST page",
            object(&[("pageId", string_param("Task list page"))]),
            false,
        ),
        tool(
            "create_task",
            "Create a task on a TASK_LIST page",
            object(&[
                ("pageId", string_param("Task list page")),
                ("title", string_param("Task title")),
            ]),
            true,
        ),
        tool(
            "complete_task",
            "Mark a task complete",
            object(&[("taskId", string_param("Task to complete"))]),
            true,
        ),
    ]
}

/// Channel (chat) tools.
fn channel_tools() -> Vec<ToolDef> {
    vec![tool(
        "post_channel_message",
        "Post a message to a CHANNEL page",
        object(&[
            ("pageId", string_param("Channel page")),
            ("text", string_param("Message text")),
        ]),
        true,
    )]
}

/// File tools (read-only: file pages are content-addressed and immutable).
fn file_tools() -> Vec<ToolDef> {
    vec![tool(
        "read_file_metadata",
        "Read a FILE page's size, mime type, and processing status",
        object(&[("pageId", string_param("File page"))]),
        false,
    )]
}

/// Web search.
fn web_tools() -> Vec<ToolDef> {
    vec![tool(
        "web_search",
        "Search the public web",
        object(&[("query", string_param("Search text"))]),
        false,
    )]
}

/// Name of the one tool `webSearchEnabled == false` removes.
pub const WEB_SEARCH_TOOL_NAME: &str = "web_search";

/// Filtering flags a chat request carries into catalog construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogFilters {
    /// When `true`, strip every write-capable tool.
    pub is_read_only: bool,
    /// When `false`, strip [`WEB_SEARCH_TOOL_NAME`].
    pub web_search_enabled: bool,
}

/// The aggregated, filtered internal tool catalog.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: BTreeMap<String, ToolDef>,
}

impl ToolCatalog {
    /// Build the full, unfiltered catalog from the eight fixed internal
    /// groups.
    #[must_use]
    pub fn full() -> Self {
        let mut tools = BTreeMap::new();
        for group in [
            page_read_tools(),
            page_write_tools(),
            drive_tools(),
            search_tools(),
            task_tools(),
            channel_tools(),
            file_tools(),
            web_tools(),
        ] {
            for t in group {
                tools.insert(t.name.clone(), t);
            }
        }
        Self { tools }
    }

    /// Build the catalog already filtered for a request.
    #[must_use]
    pub fn filtered(filters: CatalogFilters) -> Self {
        let mut catalog = Self::full();
        if filters.is_read_only {
            catalog.tools.retain(|_, t| !t.is_write);
        }
        if !filters.web_search_enabled {
            catalog.tools.remove(WEB_SEARCH_TOOL_NAME);
        }
        catalog
    }

    /// Look up a tool by its internal (unnamespaced) name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDef> {
        self.tools.get(name)
    }

    /// All tools currently in the catalog, for merging with MCP tools
    /// before constructing the effective provider-facing tool map.
    pub fn iter(&self) -> impl Iterator<Item = &ToolDef> {
        self.tools.values()
    }

    /// Number of tools currently in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// `true` if the catalog has no tools (e.g. read-only with web search
    /// disabled, on a deployment with only writes and web search defined —
    /// not reachable with the fixed groups above, but kept honest).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Flat allowed/denied summary for the admin "global prompt" viewer.
    #[must_use]
    pub fn summary(&self) -> CatalogSummary {
        let full = Self::full();
        let allowed: Vec<String> = self.tools.keys().cloned().collect();
        let denied: Vec<String> = full
            .tools
            .keys()
            .filter(|name| !self.tools.contains_key(*name))
            .cloned()
            .collect();
        CatalogSummary { allowed, denied }
    }
}

/// Allowed/denied tool-name summary, per spec.md §4.5.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSummary {
    /// Tool names present after filtering.
    pub allowed: Vec<String>,
    /// Tool names the fixed groups declare but filtering removed.
    pub denied: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_catalog_has_all_eight_groups_worth_of_tools() {
        let catalog = ToolCatalog::full();
        assert!(catalog.get("list_pages").is_some());
        assert!(catalog.get("create_page").is_some());
        assert!(catalog.get("list_drives").is_some());
        assert!(catalog.get("search_pages").is_some());
        assert!(catalog.get("list_tasks").is_some());
        assert!(catalog.get("post_channel_message").is_some());
        assert!(catalog.get("read_file_metadata").is_some());
        assert!(catalog.get("web_search").is_some());
    }

    #[test]
    fn read_only_strips_write_tools() {
        let catalog = ToolCatalog::filtered(CatalogFilters {
            is_read_only: true,
            web_search_enabled: true,
        });
        assert!(catalog.get("create_page").is_none());
        assert!(catalog.get("trash_page").is_none());
        assert!(catalog.get("move_page").is_none());
        assert!(catalog.get("list_pages").is_some());
        assert!(catalog.get("web_search").is_some());
    }

    #[test]
    fn web_search_disabled_strips_only_web_search() {
        let catalog = ToolCatalog::filtered(CatalogFilters {
            is_read_only: false,
            web_search_enabled: false,
        });
        assert!(catalog.get(WEB_SEARCH_TOOL_NAME).is_none());
        assert!(catalog.get("create_page").is_some());
    }

    #[test]
    fn summary_partitions_allowed_and_denied() {
        let catalog = ToolCatalog::filtered(CatalogFilters {
            is_read_only: true,
            web_search_enabled: true,
        });
        let summary = catalog.summary();
        assert!(summary.allowed.contains(&"list_pages".to_string()));
        assert!(summary.denied.contains(&"create_page".to_string()));
        assert!(!summary.denied.contains(&"list_pages".to_string()));
    }
}
