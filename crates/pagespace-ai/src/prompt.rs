//! Prompt Assembler (C8, spec.md §4.6).
//!
//! Builds the system prompt for a chat request by concatenating nine
//! sections in a fixed order, and reports a per-section token estimate
//! (`⌈length / 4⌉`) for admin views.

use pagespace_core::time::{timestamp_context, TimeOfDay};
use pagespace_core::DriveId;

/// A user-supplied `@[label](id:type)` reference the assistant must read
/// before responding.
#[derive(Debug, Clone)]
pub struct Mention {
    /// Display label from the `@[label]` portion.
    pub label: String,
    /// Referenced entity id.
    pub id: String,
    /// Referenced entity type (e.g. `"page"`, `"drive"`).
    pub entity_type: String,
}

/// Where in the product the request originated, which determines the
/// context and inline-instruction sections.
#[derive(Debug, Clone)]
pub enum PromptContext {
    /// Cross-workspace dashboard.
    Dashboard,
    /// A specific drive.
    Drive {
        /// Drive display name.
        name: String,
        /// Drive slug.
        slug: String,
        /// Drive id.
        id: DriveId,
    },
    /// A specific page.
    Page {
        /// Breadcrumb path from drive root to this page.
        breadcrumbs: Vec<String>,
        /// Page type, e.g. `"DOCUMENT"`.
        page_type: String,
        /// `true` if this page is linked from a task.
        task_linked: bool,
    },
}

/// An agent (`AI_CHAT` page) visible to the current user, for the agent
/// awareness section.
#[derive(Debug, Clone)]
pub struct VisibleAgent {
    /// Page id of the agent.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Agent definition/system-prompt summary.
    pub definition: String,
}

/// A node in the page-tree section, already filtered to what the current
/// user and scope may see.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Page id.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Page type.
    pub page_type: String,
    /// Direct children, in display order.
    pub children: Vec<TreeNode>,
}

/// Caps the page-tree section at this many rendered nodes, per spec.md
/// §4.6 ("capped at maxNodes = 200 with depth-based truncation").
pub const MAX_TREE_NODES: usize = 200;

/// Whether the page-tree section should be scoped to the current page's
/// subtree ("children" scope) or the whole drive tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeScope {
    /// The whole drive's tree.
    WholeDrive,
    /// Only the subtree rooted at the current page.
    Children,
}

/// Everything the assembler needs to build one request's system prompt.
#[derive(Debug, Clone)]
pub struct PromptInputs {
    /// `true` when the caller's tool catalog was built with `isReadOnly`.
    pub is_read_only: bool,
    /// Request context (dashboard/drive/page).
    pub context: PromptContext,
    /// Mentions the user attached to their message.
    pub mentions: Vec<Mention>,
    /// IANA timezone id for the timestamp section; falls back to UTC if
    /// unresolvable.
    pub timezone_id: String,
    /// Agents visible to the user, already filtered by
    /// `canUserViewPage` (empty for a page-scoped request).
    pub visible_agents: Vec<VisibleAgent>,
    /// Page tree root(s) for the drive/page scope, already filtered to the
    /// current page's subtree when `tree_scope` is `Children`.
    pub tree_roots: Vec<TreeNode>,
    /// Tree scope.
    pub tree_scope: TreeScope,
}

/// One section of the assembled prompt, with its estimated token cost.
#[derive(Debug, Clone)]
pub struct PromptSection {
    /// Section name, for the admin viewer.
    pub name: &'static str,
    /// Rendered text.
    pub text: String,
    /// `⌈length / 4⌉`.
    pub estimated_tokens: usize,
}

/// The fully assembled prompt: the concatenated text and the per-section
/// breakdown.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    /// All sections concatenated with blank-line separators, in order.
    pub text: String,
    /// Per-section breakdown, in assembly order.
    pub sections: Vec<PromptSection>,
}

fn estimate_tokens(s: &str) -> usize {
    s.len().div_ceil(4)
}

fn section(name: &'static str, text: String) -> PromptSection {
    let estimated_tokens = estimate_tokens(&text);
    PromptSection {
        name,
        text,
        estimated_tokens,
    }
}

fn core_prompt_section(is_read_only: bool) -> PromptSection {
    let restriction = if is_read_only {
        "You may read and discuss content in this workspace, but you may not create, update, move, trash, or restore anything."
    } else {
        "You may read and modify content in this workspace as needed to help the user."
    };
    section(
        "core_prompt",
        format!("You are the PageSpace assistant, embedded in the user's workspace. {restriction}"),
    )
}

fn context_section(context: &PromptContext) -> PromptSection {
    let text = match context {
        PromptContext::Dashboard => "Context: cross-workspace dashboard. No single drive is selected.".to_string(),
        PromptContext::Drive { name, slug, id } => {
            format!("Context: drive \"{name}\" (slug: {slug}, id: {id}).")
        }
        PromptContext::Page {
            breadcrumbs,
            page_type,
            task_linked,
        } => {
            let path = breadcrumbs.join(" > ");
            let task_note = if *task_linked { " This page is linked from a task." } else { "" };
            format!("Context: page \"{path}\" (type: {page_type}).{task_note}")
        }
    };
    section("context", text)
}

fn mention_section(mentions: &[Mention]) -> Option<PromptSection> {
    if mentions.is_empty() {
        return None;
    }
    let mut text = String::from("The user referenced the following items; read them before responding:\n");
    for m in mentions {
        text.push_str(&format!("- {} ({}: {})\n", m.label, m.entity_type, m.id));
    }
    Some(section("mentions", text))
}

fn timestamp_section(timezone_id: &str, now: chrono::DateTime<chrono::Utc>) -> PromptSection {
    let ctx = timestamp_context(timezone_id, now);
    let bucket = match ctx.time_of_day {
        TimeOfDay::Morning => "morning",
        TimeOfDay::Afternoon => "afternoon",
        TimeOfDay::Evening => "evening",
    };
    section(
        "timestamp",
        format!(
            "Current time: {} ({}), timezone: {}.",
            ctx.local_iso, bucket, ctx.timezone_id
        ),
    )
}

fn behavior_section() -> PromptSection {
    section(
        "behavior",
        "Respond directly and concisely. Prefer taking an available tool action over asking the user to do it themselves.".to_string(),
    )
}

fn read_only_constraint_section(is_read_only: bool) -> Option<PromptSection> {
    if !is_read_only {
        return None;
    }
    Some(section(
        "read_only_constraint",
        "Read-only mode is active for this conversation: do not call any tool that creates, updates, moves, trashes, or restores content.".to_string(),
    ))
}

fn inline_instructions_section(context: &PromptContext) -> PromptSection {
    let scope_note = match context {
        PromptContext::Page { .. } => "You are working within a single page and its descendants.",
        _ => "You are working across the whole drive (or workspace).",
    };
    section(
        "inline_instructions",
        format!(
            "{scope_note} The eight page types are FOLDER, DOCUMENT, SHEET, CANVAS, TASK_LIST, AI_CHAT, CHANNEL, and FILE. \
             Always read a page before writing to it. FILE pages are read-only."
        ),
    )
}

fn agent_awareness_section(agents: &[VisibleAgent]) -> Option<PromptSection> {
    if agents.is_empty() {
        return None;
    }
    let mut text = String::from("The following AI agents are available in this workspace:\n");
    for agent in agents {
        text.push_str(&format!("- {} ({}): {}\n", agent.title, agent.id, agent.definition));
    }
    Some(section("agent_awareness", text))
}

fn render_tree(nodes: &[TreeNode], depth: usize, budget: &mut usize, out: &mut String) {
    for node in nodes {
        if *budget == 0 {
            return;
        }
        *budget -= 1;
        let indent = "  ".repeat(depth);
        out.push_str(&format!("{indent}- {} ({}) [{}]\n", node.title, node.page_type, node.id));
        render_tree(&node.children, depth + 1, budget, out);
    }
}

fn page_tree_section(roots: &[TreeNode], scope: TreeScope) -> PromptSection {
    let mut text = match scope {
        TreeScope::WholeDrive => String::from("Page tree:\n"),
        TreeScope::Children => String::from("Page tree (current page and descendants):\n"),
    };
    let mut budget = MAX_TREE_NODES;
    render_tree(roots, 0, &mut budget, &mut text);
    if budget == 0 {
        text.push_str("... (truncated)\n");
    }
    section("page_tree", text)
}

/// Assemble the full system prompt for one request, in the fixed section
/// order from spec.md §4.6.
#[must_use]
pub fn assemble_prompt(inputs: &PromptInputs, now: chrono::DateTime<chrono::Utc>) -> AssembledPrompt {
    let mut sections = Vec::with_capacity(9);

    sections.push(core_prompt_section(inputs.is_read_only));
    sections.push(context_section(&inputs.context));
    if let Some(s) = mention_section(&inputs.mentions) {
        sections.push(s);
    }
    sections.push(timestamp_section(&inputs.timezone_id, now));
    sections.push(behavior_section());
    if let Some(s) = read_only_constraint_section(inputs.is_read_only) {
        sections.push(s);
    }
    sections.push(inline_instructions_section(&inputs.context));
    if matches!(inputs.context, PromptContext::Drive { .. } | PromptContext::Dashboard) {
        if let Some(s) = agent_awareness_section(&inputs.visible_agents) {
            sections.push(s);
        }
    }
    if matches!(inputs.context, PromptContext::Drive { .. } | PromptContext::Page { .. }) {
        sections.push(page_tree_section(&inputs.tree_roots, inputs.tree_scope));
    }

    let text = sections
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    AssembledPrompt { text, sections }
}
