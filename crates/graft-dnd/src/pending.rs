//! Deferred drops awaiting confirmation, and drag statistics.
//!
//! With [`DropPolicy::Confirm`](crate::coordinator::DropPolicy) a
//! validated drop is queued here instead of committed. Queued moves carry
//! data only, never callbacks: the host polls the queue, shows whatever
//! confirmation UI it wants, and submits a [`Decision`]; acceptance
//! re-validates against fresh snapshots at resolve time.

use graft_tree::ops::SitePosition;
use graft_tree::{DropPosition, NodeKey, TreeId, TreeNode};
use serde::{Deserialize, Serialize};

/// Where a node sits in a tree at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveSite {
    /// Tree containing the site.
    pub tree: TreeId,
    /// Parent key, `None` at top level.
    pub parent: Option<NodeKey>,
    /// Parent label, for display.
    pub parent_label: Option<String>,
    /// Index among siblings.
    pub index: usize,
    /// Zero-based depth.
    pub level: usize,
    /// Labels from the root down to the node.
    pub path: Vec<String>,
}

impl MoveSite {
    /// Build from a located position within the given tree.
    #[must_use]
    pub fn from_position(tree: TreeId, position: SitePosition) -> Self {
        Self {
            tree,
            parent: position.parent,
            parent_label: position.parent_label,
            index: position.index,
            level: position.level,
            path: position.path,
        }
    }
}

/// A validated drop waiting for an accept/reject decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMove {
    /// Queue id; assigned on push, starting at 1.
    pub id: u64,
    /// Human-readable summary, e.g. for a confirmation dialog.
    pub description: String,
    /// Epoch milliseconds when the drop was queued.
    pub queued_at_ms: u64,
    /// The node to move, keyed as it was in the source tree.
    pub drag_node: TreeNode,
    /// The target row, absent for root drops.
    pub drop_node: Option<TreeNode>,
    /// Where the subtree would land relative to the target row.
    pub position: DropPosition,
    pub source_tree: TreeId,
    /// Group tag of the source tree at drag time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_group: Option<String>,
    pub target_tree: TreeId,
    /// Site of the drag node when the drop was queued.
    pub from: Option<MoveSite>,
    /// Projected site after the move.
    pub to: Option<MoveSite>,
}

/// Host verdict on a pending move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Re-validate and commit against fresh snapshots.
    Accept,
    /// Discard without touching either tree.
    Reject,
}

/// FIFO of pending moves with id lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingQueue {
    items: Vec<PendingMove>,
    next_id: u64,
}

impl PendingQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a move, assigning and returning its id.
    pub fn push(&mut self, mut item: PendingMove) -> u64 {
        self.next_id += 1;
        item.id = self.next_id;
        self.items.push(item);
        self.next_id
    }

    /// Remove and return the move with the given id.
    pub fn take(&mut self, id: u64) -> Option<PendingMove> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<&PendingMove> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Every queued move, oldest first.
    #[must_use]
    pub fn all(&self) -> &[PendingMove] {
        &self.items
    }

    /// Queued moves touching `tree` as source or target.
    pub fn for_tree<'a>(&'a self, tree: &'a TreeId) -> impl Iterator<Item = &'a PendingMove> {
        self.items
            .iter()
            .filter(move |item| item.source_tree == *tree || item.target_tree == *tree)
    }

    /// Discard every queued move; returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        dropped
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Running counters over coordinator activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DragStats {
    /// Drags started.
    pub total_drags: u64,
    /// Drops committed.
    pub completed_drops: u64,
    /// Drops declined at release, commit failures, and cancellations.
    pub failed_drops: u64,
    /// Moves currently awaiting confirmation.
    pub pending: u64,
    /// Running average commit time in milliseconds.
    pub avg_drop_ms: f64,
}

impl DragStats {
    pub(crate) fn record_start(&mut self) {
        self.total_drags += 1;
    }

    pub(crate) fn record_completed(&mut self, elapsed_ms: f64) {
        self.completed_drops += 1;
        let n = self.completed_drops as f64;
        self.avg_drop_ms = (self.avg_drop_ms * (n - 1.0) + elapsed_ms) / n;
    }

    pub(crate) fn record_failed(&mut self) {
        self.failed_drops += 1;
    }
}
