//! Agent awareness cache (spec.md §4.11): `driveId → list of {id, title,
//! definition}` filtered to `type = AI_CHAT`, `isTrashed = false`,
//! `visibleToGlobalAssistant != false`.

use dashmap::DashMap;
use pagespace_core::{DriveId, PageId};

/// An `AI_CHAT` page eligible to be surfaced to the global assistant as a
/// visible agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleAgentEntry {
    /// Page id of the `AI_CHAT` page.
    pub id: PageId,
    /// Display title.
    pub title: String,
    /// The agent's configured system prompt / behavior definition.
    pub definition: String,
}

/// An `AI_CHAT` candidate row before visibility filtering, as read from
/// storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiChatCandidate {
    /// Page id.
    pub id: PageId,
    /// Display title.
    pub title: String,
    /// Agent definition text.
    pub definition: String,
    /// Structural trash flag.
    pub is_trashed: bool,
    /// `None`/`Some(true)` means visible; `Some(false)` opts the agent out
    /// of global-assistant awareness.
    pub visible_to_global_assistant: Option<bool>,
}

/// Process-local, `driveId`-keyed cache of each drive's globally visible
/// agents.
#[derive(Default)]
pub struct AgentCache {
    entries: DashMap<DriveId, Vec<VisibleAgentEntry>>,
}

impl AgentCache {
    /// Construct an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the cached visible-agent list for a drive, if present.
    #[must_use]
    pub fn get(&self, drive_id: DriveId) -> Option<Vec<VisibleAgentEntry>> {
        self.entries.get(&drive_id).map(|entries| entries.clone())
    }

    /// Populate (or replace) the cached list for a drive, filtering
    /// `candidates` to the visible subset first.
    pub fn set(&self, drive_id: DriveId, candidates: &[AiChatCandidate]) {
        self.entries.insert(drive_id, filter_visible(candidates));
    }

    /// Evict a drive's cached agent list. Called on any agent config
    /// change.
    pub fn invalidate(&self, drive_id: DriveId) {
        self.entries.remove(&drive_id);
    }
}

fn filter_visible(candidates: &[AiChatCandidate]) -> Vec<VisibleAgentEntry> {
    candidates
        .iter()
        .filter(|c| !c.is_trashed && c.visible_to_global_assistant != Some(false))
        .map(|c| VisibleAgentEntry { id: c.id, title: c.title.clone(), definition: c.definition.clone() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: PageId, is_trashed: bool, visible: Option<bool>) -> AiChatCandidate {
        AiChatCandidate { id, title: "agent".to_string(), definition: "be helpful".to_string(), is_trashed, visible_to_global_assistant: visible }
    }

    #[test]
    fn excludes_trashed_agents() {
        let cache = AgentCache::new();
        let drive = DriveId::new();
        cache.set(drive, &[candidate(PageId::new(), true, None)]);
        assert_eq!(cache.get(drive), Some(Vec::new()));
    }

    #[test]
    fn excludes_explicitly_hidden_agents() {
        let cache = AgentCache::new();
        let drive = DriveId::new();
        cache.set(drive, &[candidate(PageId::new(), false, Some(false))]);
        assert_eq!(cache.get(drive), Some(Vec::new()));
    }

    #[test]
    fn includes_default_and_explicitly_visible_agents() {
        let cache = AgentCache::new();
        let drive = DriveId::new();
        let default_visible = PageId::new();
        let explicitly_visible = PageId::new();
        cache.set(drive, &[candidate(default_visible, false, None), candidate(explicitly_visible, false, Some(true))]);
        let entries = cache.get(drive).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn invalidate_evicts() {
        let cache = AgentCache::new();
        let drive = DriveId::new();
        cache.set(drive, &[candidate(PageId::new(), false, None)]);
        cache.invalidate(drive);
        assert!(cache.get(drive).is_none());
    }
}
