//! The tree node value type.
//!
//! `TreeNode` is plain data: a key, a label, ordered children, three
//! explicit capability flags, and an open `data` map for consumer payloads
//! that every operation carries through untouched. Capability flags default
//! to permissive, matching the convention that absence means allowed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::key::NodeKey;

/// A node in a rooted tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub key: NodeKey,
    pub label: String,
    /// Ordered children; empty for a leaf. Ordering is significant and
    /// preserved by every operation except explicit moves.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
    #[serde(default = "permissive", skip_serializing_if = "is_permissive")]
    pub draggable: bool,
    #[serde(default = "permissive", skip_serializing_if = "is_permissive")]
    pub droppable: bool,
    #[serde(default = "permissive", skip_serializing_if = "is_permissive")]
    pub selectable: bool,
    /// Consumer-defined payload; never interpreted by the engine.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, Value>,
}

fn permissive() -> bool {
    true
}

fn is_permissive(flag: &bool) -> bool {
    *flag
}

impl TreeNode {
    #[must_use]
    pub fn new(key: NodeKey, label: impl Into<String>) -> Self {
        Self {
            key,
            label: label.into(),
            children: Vec::new(),
            draggable: true,
            droppable: true,
            selectable: true,
            data: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_child(mut self, child: TreeNode) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<TreeNode>) -> Self {
        self.children = children;
        self
    }

    #[must_use]
    pub fn with_draggable(mut self, draggable: bool) -> Self {
        self.draggable = draggable;
        self
    }

    #[must_use]
    pub fn with_droppable(mut self, droppable: bool) -> Self {
        self.droppable = droppable;
        self
    }

    #[must_use]
    pub fn with_selectable(mut self, selectable: bool) -> Self {
        self.selectable = selectable;
        self
    }

    #[must_use]
    pub fn with_data(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(field.into(), value.into());
        self
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Number of nodes in this subtree, including the node itself.
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(TreeNode::subtree_len)
            .sum::<usize>()
    }

    /// Whether `key` names this node or any descendant.
    ///
    /// This is the containment check behind drop validation. It runs once
    /// per hover candidate and costs O(subtree size); fine for UI-scale
    /// trees, worth knowing about for very large ones.
    #[must_use]
    pub fn contains_key(&self, key: &NodeKey) -> bool {
        self.key == *key || self.children.iter().any(|child| child.contains_key(key))
    }

    /// Pre-order keys of the whole subtree.
    #[must_use]
    pub fn keys(&self) -> Vec<NodeKey> {
        let mut out = Vec::with_capacity(self.subtree_len());
        self.collect_keys(&mut out);
        out
    }

    fn collect_keys(&self, out: &mut Vec<NodeKey>) {
        out.push(self.key.clone());
        for child in &self.children {
            child.collect_keys(out);
        }
    }
}
