//! Typed notifications delivered to registered trees.
//!
//! The coordinator never touches a UI surface; every observable transition
//! is reported as a [`TreeEvent`] pushed through the emitter capability of
//! the affected tree(s). Events are plain data so hosts can buffer them,
//! replay them, and assert on them in tests.

use graft_tree::{DropPosition, NodeKey, TreeId, TreeNode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a drag ended without a committed drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The user pressed escape.
    Escape,
    /// The gesture ended over an illegal target.
    InvalidDrop,
    /// The host cancelled programmatically.
    UserCancel,
    /// An internal failure forced the drag to abort.
    Error,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Escape => "escape",
            Self::InvalidDrop => "invalid drop",
            Self::UserCancel => "user cancel",
            Self::Error => "error",
        };
        f.write_str(text)
    }
}

/// Row-level indicator state for the tree under the pointer.
///
/// Informational only: hosts typically render an insertion line or a
/// nest highlight from it. `HoverChange(None)` clears the indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoverFeedback {
    /// Tree the pointer is over.
    pub tree: TreeId,
    /// Key of the candidate target row, absent for root-zone hovers.
    pub target: Option<NodeKey>,
    /// Label of the candidate target row.
    pub target_label: Option<String>,
    /// Geometric relation of the pointer to the candidate row.
    pub position: DropPosition,
    /// Whether the drag originates from a different tree.
    pub cross_tree: bool,
}

/// Payload of a committed move, delivered to both affected trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossTreeMove {
    /// The moved subtree as it existed in the source tree.
    pub drag_node: TreeNode,
    /// Key of the subtree root after the move (remapped for cross-tree).
    pub moved_key: NodeKey,
    /// The target row of the drop, absent for root drops.
    pub drop_node: Option<TreeNode>,
    /// Where the subtree landed relative to the target row.
    pub position: DropPosition,
    pub source_tree: TreeId,
    pub target_tree: TreeId,
    /// Source node array before and after the removal.
    pub source_before: Vec<TreeNode>,
    pub source_after: Vec<TreeNode>,
    /// Target node array before and after the insertion. Equal to the
    /// source pair for same-tree moves.
    pub target_before: Vec<TreeNode>,
    pub target_after: Vec<TreeNode>,
}

impl CrossTreeMove {
    /// Whether source and target are distinct trees.
    #[must_use]
    pub fn is_cross_tree(&self) -> bool {
        self.source_tree != self.target_tree
    }
}

/// Notification delivered to a registered tree's emitter.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent {
    /// A drag started from this tree.
    DragStart {
        /// The node being dragged.
        node: TreeNode,
    },

    /// The hover target changed; `None` clears any drop indicator.
    HoverChange(Option<HoverFeedback>),

    /// A drop was validated and queued for confirmation.
    DropPending {
        /// Queue id to pass to `resolve_pending`.
        id: u64,
    },

    /// A move committed; sent to the source and the target tree.
    Moved(Box<CrossTreeMove>),

    /// The drag ended before a drop committed.
    DragCancel {
        /// Why the drag was abandoned.
        reason: CancelReason,
    },

    /// The drag gesture concluded.
    DragEnd {
        /// Whether a drop committed during this gesture.
        completed: bool,
    },
}
