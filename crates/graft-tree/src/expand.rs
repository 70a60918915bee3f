//! Expansion-state tracking.
//!
//! `ExpandedKeys` is the set of node keys currently shown open in one tree
//! instance. It lives outside the node type so a tree snapshot can be
//! replaced wholesale without losing which rows the user had open, and so
//! the open/closed state of a subtree can travel with it across trees:
//! collect the subtree's entries, retarget them, merge into the receiving
//! set, remove the originals.
//!
//! Serialization is a sorted key list, so persisted output is stable across
//! runs regardless of hash order.

use rustc_hash::FxHashSet;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

use crate::key::{NodeKey, TreeId};
use crate::node::TreeNode;

/// The set of node keys currently shown open in one tree instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedKeys {
    open: FxHashSet<NodeKey>,
}

impl ExpandedKeys {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a key open. Returns `false` when it already was.
    pub fn expand(&mut self, key: NodeKey) -> bool {
        self.open.insert(key)
    }

    /// Marks a key closed. Returns `false` when it was not open.
    pub fn collapse(&mut self, key: &NodeKey) -> bool {
        self.open.remove(key)
    }

    /// Flips one key; returns whether it is open afterwards.
    pub fn toggle(&mut self, key: NodeKey) -> bool {
        if self.open.remove(&key) {
            false
        } else {
            self.open.insert(key);
            true
        }
    }

    #[must_use]
    pub fn is_expanded(&self, key: &NodeKey) -> bool {
        self.open.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.open.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Opens every node in the snapshot that has children.
    pub fn expand_all(&mut self, nodes: &[TreeNode]) {
        for node in nodes {
            if !node.children.is_empty() {
                self.open.insert(node.key.clone());
                self.expand_all(&node.children);
            }
        }
    }

    pub fn collapse_all(&mut self) {
        self.open.clear();
    }

    /// The open entries within one subtree; the state that travels with a
    /// moved subtree.
    #[must_use]
    pub fn collect_subtree(&self, node: &TreeNode) -> ExpandedKeys {
        let mut out = ExpandedKeys::new();
        self.collect_into(node, &mut out);
        out
    }

    fn collect_into(&self, node: &TreeNode, out: &mut ExpandedKeys) {
        if self.open.contains(&node.key) {
            out.open.insert(node.key.clone());
        }
        for child in &node.children {
            self.collect_into(child, out);
        }
    }

    /// Drops every entry belonging to one subtree.
    pub fn remove_subtree(&mut self, node: &TreeNode) {
        self.open.remove(&node.key);
        for child in &node.children {
            self.remove_subtree(child);
        }
    }

    /// A copy with every key rewritten onto `target`, local ids preserved.
    #[must_use]
    pub fn retargeted(&self, target: &TreeId) -> ExpandedKeys {
        Self {
            open: self.open.iter().map(|key| key.with_tree(target)).collect(),
        }
    }

    pub fn merge(&mut self, other: &ExpandedKeys) {
        self.open.extend(other.open.iter().cloned());
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeKey> {
        self.open.iter()
    }

    /// Sorted copy of the open keys; the canonical persisted form.
    #[must_use]
    pub fn to_sorted_keys(&self) -> Vec<NodeKey> {
        let mut keys: Vec<NodeKey> = self.open.iter().cloned().collect();
        keys.sort();
        keys
    }
}

impl FromIterator<NodeKey> for ExpandedKeys {
    fn from_iter<I: IntoIterator<Item = NodeKey>>(iter: I) -> Self {
        Self {
            open: iter.into_iter().collect(),
        }
    }
}

impl Extend<NodeKey> for ExpandedKeys {
    fn extend<I: IntoIterator<Item = NodeKey>>(&mut self, iter: I) {
        self.open.extend(iter);
    }
}

impl Serialize for ExpandedKeys {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_sorted_keys().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ExpandedKeys {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let keys = Vec::<NodeKey>::deserialize(deserializer)?;
        Ok(keys.into_iter().collect())
    }
}
