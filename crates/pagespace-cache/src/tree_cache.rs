//! Page tree cache (spec.md §4.11): `driveId → ordered list of {id, title,
//! type, parentId, position}`, rebuilt on read via [`TreeCache::build_tree`]
//! and explicitly invalidated on any structural page mutation.
//!
//! The cache holds drive-scope structural facts only. A trashed node's
//! subtree is still returned by [`TreeCache::filter_to_subtree`] — the
//! per-user permission filter a caller applies afterward is the sole place
//! `isTrashed` is enforced for display, keeping this cache's invalidation
//! contract purely structural.

use dashmap::DashMap;
use pagespace_core::{DriveId, PageId};

use crate::page_type::PageType;

/// One row of the flat, ordered tree listing.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNodeRow {
    /// Page id.
    pub id: PageId,
    /// Display title.
    pub title: String,
    /// Page type.
    pub page_type: PageType,
    /// Parent page, or `None` at the drive root.
    pub parent_id: Option<PageId>,
    /// Fractional sibling position.
    pub position: f64,
    /// Structural trash flag. Permission/visibility filtering happens at
    /// the caller, not here.
    pub is_trashed: bool,
}

/// A tree node with its children attached, as returned by
/// [`TreeCache::build_tree`].
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// The node's own row data.
    pub row: TreeNodeRow,
    /// Children, ordered by `position` ascending.
    pub children: Vec<TreeNode>,
}

/// Process-local, `driveId`-keyed cache of each drive's flat page listing.
#[derive(Default)]
pub struct TreeCache {
    entries: DashMap<DriveId, Vec<TreeNodeRow>>,
}

impl TreeCache {
    /// Construct an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the cached flat listing for a drive, if present.
    #[must_use]
    pub fn get(&self, drive_id: DriveId) -> Option<Vec<TreeNodeRow>> {
        self.entries.get(&drive_id).map(|rows| rows.clone())
    }

    /// Populate (or replace) the cached listing for a drive.
    pub fn set(&self, drive_id: DriveId, rows: Vec<TreeNodeRow>) {
        self.entries.insert(drive_id, rows);
    }

    /// Evict a drive's cached listing. Called on create/rename/trash/
    /// restore/move of any page in that drive.
    pub fn invalidate(&self, drive_id: DriveId) {
        self.entries.remove(&drive_id);
    }

    /// Reassemble a flat, ordered listing into a rooted forest, ordered by
    /// `position` ascending at every level.
    #[must_use]
    pub fn build_tree(rows: &[TreeNodeRow]) -> Vec<TreeNode> {
        fn children_of(rows: &[TreeNodeRow], parent: Option<PageId>) -> Vec<TreeNode> {
            let mut matched: Vec<&TreeNodeRow> = rows.iter().filter(|r| r.parent_id == parent).collect();
            matched.sort_by(|a, b| a.position.partial_cmp(&b.position).unwrap_or(std::cmp::Ordering::Equal));
            matched
                .into_iter()
                .map(|row| TreeNode { row: row.clone(), children: children_of(rows, Some(row.id)) })
                .collect()
        }
        children_of(rows, None)
    }

    /// Return the subtree rooted at `root_id`, including `root_id` itself,
    /// regardless of any node's `isTrashed` flag.
    #[must_use]
    pub fn filter_to_subtree(rows: &[TreeNodeRow], root_id: PageId) -> Vec<TreeNodeRow> {
        let mut out = Vec::new();
        let mut stack = vec![root_id];
        while let Some(current) = stack.pop() {
            if let Some(row) = rows.iter().find(|r| r.id == current) {
                out.push(row.clone());
            }
            stack.extend(rows.iter().filter(|r| r.parent_id == Some(current)).map(|r| r.id));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: PageId, parent: Option<PageId>, position: f64, is_trashed: bool) -> TreeNodeRow {
        TreeNodeRow {
            id,
            title: format!("page-{id}"),
            page_type: PageType::Document,
            parent_id: parent,
            position,
            is_trashed,
        }
    }

    #[test]
    fn get_returns_none_before_set() {
        let cache = TreeCache::new();
        assert!(cache.get(DriveId::new()).is_none());
    }

    #[test]
    fn set_then_get_round_trips() {
        let cache = TreeCache::new();
        let drive = DriveId::new();
        let rows = vec![row(PageId::new(), None, 0.0, false)];
        cache.set(drive, rows.clone());
        assert_eq!(cache.get(drive), Some(rows));
    }

    #[test]
    fn invalidate_evicts() {
        let cache = TreeCache::new();
        let drive = DriveId::new();
        cache.set(drive, vec![row(PageId::new(), None, 0.0, false)]);
        cache.invalidate(drive);
        assert!(cache.get(drive).is_none());
    }

    #[test]
    fn build_tree_orders_children_by_position() {
        let root = PageId::new();
        let child_a = PageId::new();
        let child_b = PageId::new();
        let rows = vec![
            row(root, None, 0.0, false),
            row(child_b, Some(root), 2.0, false),
            row(child_a, Some(root), 1.0, false),
        ];
        let tree = TreeCache::build_tree(&rows);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].row.id, root);
        assert_eq!(tree[0].children[0].row.id, child_a);
        assert_eq!(tree[0].children[1].row.id, child_b);
    }

    #[test]
    fn build_tree_supports_multiple_roots() {
        let root_a = PageId::new();
        let root_b = PageId::new();
        let rows = vec![row(root_a, None, 0.0, false), row(root_b, None, 1.0, false)];
        let tree = TreeCache::build_tree(&rows);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn filter_to_subtree_includes_trashed_nodes_structurally() {
        let root = PageId::new();
        let child = PageId::new();
        let grandchild = PageId::new();
        let rows = vec![
            row(root, None, 0.0, true),
            row(child, Some(root), 0.0, true),
            row(grandchild, Some(child), 0.0, false),
        ];
        let subtree = TreeCache::filter_to_subtree(&rows, root);
        let ids: Vec<_> = subtree.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&root));
        assert!(ids.contains(&child));
        assert!(ids.contains(&grandchild));
    }

    #[test]
    fn filter_to_subtree_excludes_siblings_outside_the_root() {
        let root = PageId::new();
        let sibling = PageId::new();
        let rows = vec![row(root, None, 0.0, false), row(sibling, None, 1.0, false)];
        let subtree = TreeCache::filter_to_subtree(&rows, root);
        assert_eq!(subtree.len(), 1);
        assert_eq!(subtree[0].id, root);
    }
}
