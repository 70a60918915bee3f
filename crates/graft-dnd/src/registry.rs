//! Directory of mounted trees and their capabilities.
//!
//! Each tree widget registers a [`TreeHost`] handle on mount and removes
//! it on unmount. The registry only holds the handles for lookup; the
//! widget keeps owning its data, and the coordinator reads fresh node
//! arrays through the accessor on every operation rather than caching.

use crate::event::TreeEvent;
use graft_tree::{ExpandedKeys, TreeId, TreeNode};
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;

/// Capabilities a mounted tree exposes to the coordinator.
///
/// `nodes`/`set_nodes` are the read and write channels for the tree's
/// current node array; `emit` receives [`TreeEvent`] notifications. The
/// group and expansion accessors are optional: the defaults report no
/// group and no expansion tracking.
///
/// All methods take `&self`; hosts with mutable state use interior
/// mutability, keeping the single-threaded engine free of lock plumbing.
pub trait TreeHost {
    /// Snapshot of the current node array.
    fn nodes(&self) -> Vec<TreeNode>;

    /// Replace the node array.
    fn set_nodes(&self, nodes: Vec<TreeNode>);

    /// Deliver a notification to the host widget.
    fn emit(&self, event: &TreeEvent);

    /// Compatibility tag gating cross-tree drops.
    fn group(&self) -> Option<String> {
        None
    }

    /// Current expansion set, when the host tracks one.
    fn expanded(&self) -> Option<ExpandedKeys> {
        None
    }

    /// Replace the expansion set; ignored when untracked.
    fn set_expanded(&self, _expanded: ExpandedKeys) {}
}

/// Registry of mounted trees, keyed by tree id.
#[derive(Default)]
pub struct TreeRegistry {
    entries: FxHashMap<TreeId, Rc<dyn TreeHost>>,
}

impl TreeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tree, silently replacing any prior entry with the same
    /// id (last registration wins).
    pub fn register(&mut self, tree: TreeId, host: Rc<dyn TreeHost>) {
        #[cfg(feature = "tracing")]
        tracing::debug!(message = "registry.register", tree = %tree);
        self.entries.insert(tree, host);
    }

    /// Remove a tree; unknown ids are a no-op.
    pub fn unregister(&mut self, tree: &TreeId) -> bool {
        let removed = self.entries.remove(tree).is_some();
        #[cfg(feature = "tracing")]
        tracing::debug!(message = "registry.unregister", tree = %tree, removed);
        removed
    }

    /// Look up a tree by exact id.
    #[must_use]
    pub fn get(&self, tree: &TreeId) -> Option<&Rc<dyn TreeHost>> {
        self.entries.get(tree)
    }

    #[must_use]
    pub fn contains(&self, tree: &TreeId) -> bool {
        self.entries.contains_key(tree)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids of every registered tree, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = &TreeId> {
        self.entries.keys()
    }
}

impl fmt::Debug for TreeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&TreeId> = self.entries.keys().collect();
        ids.sort();
        f.debug_struct("TreeRegistry").field("trees", &ids).finish()
    }
}
