//! Node and tree identity.
//!
//! Tree membership is an explicit field of [`NodeKey`], not a naming
//! convention baked into one string. The `"<tree>-<local>"` display form and
//! [`NodeKey::parse`] exist for hosts that exchange prefix-style keys, and
//! `parse` is documented as lossy: it splits on the first `-`, so a tree id
//! containing a hyphen does not round-trip.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one tree widget instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeId(String);

impl TreeId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TreeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TreeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&TreeId> for TreeId {
    fn from(id: &TreeId) -> Self {
        id.clone()
    }
}

/// Identity of one node: the owning tree plus a tree-local identifier.
///
/// Moving a subtree between trees rewrites only the `tree` field; the local
/// identifier is preserved verbatim (see [`NodeKey::with_tree`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    tree: TreeId,
    local: String,
}

impl NodeKey {
    #[must_use]
    pub fn new(tree: impl Into<TreeId>, local: impl Into<String>) -> Self {
        Self {
            tree: tree.into(),
            local: local.into(),
        }
    }

    #[must_use]
    pub fn tree(&self) -> &TreeId {
        &self.tree
    }

    #[must_use]
    pub fn local(&self) -> &str {
        &self.local
    }

    /// Same local identifier under a different owning tree.
    #[must_use]
    pub fn with_tree(&self, tree: &TreeId) -> Self {
        Self {
            tree: tree.clone(),
            local: self.local.clone(),
        }
    }

    #[must_use]
    pub fn in_tree(&self, tree: &TreeId) -> bool {
        self.tree == *tree
    }

    /// Splits a prefix-style key (`"<tree>-<local>"`) on the first `-`.
    ///
    /// Lossy interop helper: a tree id that itself contains a hyphen cannot
    /// be recovered. Returns `None` when there is no separator or either
    /// side is empty.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        let (tree, local) = key.split_once('-')?;
        if tree.is_empty() || local.is_empty() {
            return None;
        }
        Some(Self::new(tree, local))
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.tree, self.local)
    }
}
