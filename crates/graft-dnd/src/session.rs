//! Mutable record of one drag gesture.
//!
//! A [`DragSession`] tracks at most one gesture at a time: the dragged
//! node with its origin, and (once a hover validates) the prospective
//! landing site. Starting a new drag replaces any gesture still live, so
//! a stale session can never block future drags.

use crate::channel::DragIntent;
use graft_tree::{DropPosition, NodeKey, TreeId, TreeNode};
use std::time::Duration;
use web_time::{Instant, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, `0` when the clock is unavailable.
pub(crate) fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

/// Prospective landing site recorded while hovering.
#[derive(Debug, Clone, PartialEq)]
pub struct DragTarget {
    /// Tree under the pointer.
    pub tree: TreeId,
    /// Candidate row, absent when hovering the root zone.
    pub node: Option<TreeNode>,
    /// Geometric relation of the pointer to the candidate row.
    pub position: DropPosition,
}

#[derive(Debug, Clone)]
struct ActiveDrag {
    node: TreeNode,
    source_tree: TreeId,
    source_group: Option<String>,
    started_at: Instant,
    started_at_ms: u64,
    target: Option<DragTarget>,
}

/// The coordinator's record of the currently active drag.
#[derive(Debug, Clone, Default)]
pub struct DragSession {
    active: Option<ActiveDrag>,
}

impl DragSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a drag, replacing any gesture already in progress.
    pub fn start(&mut self, node: TreeNode, source_tree: TreeId, source_group: Option<String>) {
        self.active = Some(ActiveDrag {
            node,
            source_tree,
            source_group,
            started_at: Instant::now(),
            started_at_ms: epoch_ms(),
            target: None,
        });
    }

    /// Adopt a drag recovered from the side channel, keeping its original
    /// start time.
    pub fn resume(
        &mut self,
        node: TreeNode,
        source_tree: TreeId,
        source_group: Option<String>,
        started_at_ms: u64,
    ) {
        self.active = Some(ActiveDrag {
            node,
            source_tree,
            source_group,
            started_at: Instant::now(),
            started_at_ms,
            target: None,
        });
    }

    /// Record the prospective landing site. No-op when idle.
    pub fn update_target(&mut self, target: DragTarget) -> bool {
        match &mut self.active {
            Some(drag) => {
                drag.target = Some(target);
                true
            }
            None => false,
        }
    }

    /// Clear the landing site, keeping the drag alive.
    pub fn clear_target(&mut self) -> bool {
        match &mut self.active {
            Some(drag) => drag.target.take().is_some(),
            None => false,
        }
    }

    /// Clear the landing site only if it points into `tree`.
    pub fn clear_target_in(&mut self, tree: &TreeId) -> bool {
        match &mut self.active {
            Some(drag) if drag.target.as_ref().is_some_and(|t| t.tree == *tree) => {
                drag.target = None;
                true
            }
            _ => false,
        }
    }

    /// Reset to idle; reports the gesture duration when one was live.
    pub fn end(&mut self) -> Option<Duration> {
        self.active.take().map(|drag| drag.started_at.elapsed())
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub fn drag_node(&self) -> Option<&TreeNode> {
        self.active.as_ref().map(|d| &d.node)
    }

    #[must_use]
    pub fn drag_key(&self) -> Option<&NodeKey> {
        self.active.as_ref().map(|d| &d.node.key)
    }

    #[must_use]
    pub fn source_tree(&self) -> Option<&TreeId> {
        self.active.as_ref().map(|d| &d.source_tree)
    }

    #[must_use]
    pub fn source_group(&self) -> Option<&str> {
        self.active.as_ref().and_then(|d| d.source_group.as_deref())
    }

    #[must_use]
    pub fn target(&self) -> Option<&DragTarget> {
        self.active.as_ref().and_then(|d| d.target.as_ref())
    }

    /// Epoch milliseconds at drag start.
    #[must_use]
    pub fn started_at_ms(&self) -> Option<u64> {
        self.active.as_ref().map(|d| d.started_at_ms)
    }

    /// Time since the drag started in this process.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        self.active.as_ref().map(|d| d.started_at.elapsed())
    }

    /// Snapshot for the side channel.
    #[must_use]
    pub fn intent(&self) -> Option<DragIntent> {
        self.active.as_ref().map(|d| DragIntent {
            drag_node: d.node.clone(),
            source_tree: d.source_tree.clone(),
            source_group: d.source_group.clone(),
            started_at_ms: d.started_at_ms,
        })
    }
}
