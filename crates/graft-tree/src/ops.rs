//! Pure operations over tree snapshots.
//!
//! Every function takes a borrowed slice of root nodes and returns owned
//! results; input trees are never mutated. Mutating variants clone the
//! snapshot first and then edit the copy in place through private helpers,
//! so callers can hold the old and new snapshots side by side (the drop
//! pipeline relies on this for its before/after notifications).
//!
//! # Invariants
//!
//! 1. Child ordering is preserved by every operation except the explicit
//!    insert/move positions.
//! 2. An unmatched target key leaves the returned snapshot structurally
//!    equal to the input; absence is reported through the return value, not
//!    an error.
//! 3. `remove` reports the direct parent of the excised node, never a
//!    further ancestor.
//! 4. No function panics on any input tree.

use serde::{Deserialize, Serialize};

use crate::key::{NodeKey, TreeId};
use crate::node::TreeNode;
use crate::position::DropPosition;

/// A located node and its parent (`None` for top-level matches).
#[derive(Debug, Clone, Copy)]
pub struct Found<'a> {
    pub node: &'a TreeNode,
    pub parent: Option<&'a TreeNode>,
}

/// Where a node sits within a snapshot: parent, sibling index, depth, and
/// the label path from the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitePosition {
    pub parent: Option<NodeKey>,
    pub parent_label: Option<String>,
    /// Index among siblings (top-level index for root-level nodes).
    pub index: usize,
    /// Zero-based depth; top-level nodes are level 0.
    pub level: usize,
    /// Labels from the root down to the node itself.
    pub path: Vec<String>,
}

/// Result of [`remove`].
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    /// The snapshot without the removed node.
    pub nodes: Vec<TreeNode>,
    /// The excised subtree, or `None` if the key was absent.
    pub removed: Option<TreeNode>,
    /// Direct parent of the removed node; `None` for top-level removals.
    pub parent: Option<NodeKey>,
}

/// Filter behavior for [`filter_by_label`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Keep nodes that match or have a matching descendant; ancestors of a
    /// match survive as pruned copies.
    Lenient,
    /// Keep only nodes that match themselves, each with its full subtree;
    /// a match below a non-matching parent is dropped with the parent.
    Strict,
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Depth-first pre-order lookup.
#[must_use]
pub fn find<'a>(nodes: &'a [TreeNode], key: &NodeKey) -> Option<&'a TreeNode> {
    for node in nodes {
        if node.key == *key {
            return Some(node);
        }
        if let Some(hit) = find(&node.children, key) {
            return Some(hit);
        }
    }
    None
}

/// Pre-order lookup that also reports the parent.
#[must_use]
pub fn find_with_parent<'a>(nodes: &'a [TreeNode], key: &NodeKey) -> Option<Found<'a>> {
    fn walk<'a>(
        nodes: &'a [TreeNode],
        parent: Option<&'a TreeNode>,
        key: &NodeKey,
    ) -> Option<Found<'a>> {
        for node in nodes {
            if node.key == *key {
                return Some(Found { node, parent });
            }
            if let Some(found) = walk(&node.children, Some(node), key) {
                return Some(found);
            }
        }
        None
    }
    walk(nodes, None, key)
}

/// Root-to-match chain of nodes; empty when the key is absent.
#[must_use]
pub fn path_to<'a>(nodes: &'a [TreeNode], key: &NodeKey) -> Vec<&'a TreeNode> {
    fn descend<'a>(nodes: &'a [TreeNode], key: &NodeKey, trail: &mut Vec<&'a TreeNode>) -> bool {
        for node in nodes {
            trail.push(node);
            if node.key == *key || descend(&node.children, key, trail) {
                return true;
            }
            trail.pop();
        }
        false
    }

    let mut trail = Vec::new();
    if descend(nodes, key, &mut trail) {
        trail
    } else {
        Vec::new()
    }
}

/// Parent, sibling index, depth and label path for one key.
#[must_use]
pub fn locate(nodes: &[TreeNode], key: &NodeKey) -> Option<SitePosition> {
    let trail = path_to(nodes, key);
    let node = *trail.last()?;
    let parent = trail.len().checked_sub(2).map(|i| trail[i]);
    let siblings: &[TreeNode] = parent.map_or(nodes, |p| &p.children);
    let index = siblings.iter().position(|s| s.key == node.key)?;
    Some(SitePosition {
        parent: parent.map(|p| p.key.clone()),
        parent_label: parent.map(|p| p.label.clone()),
        index,
        level: trail.len() - 1,
        path: trail.iter().map(|n| n.label.clone()).collect(),
    })
}

/// Pre-order traversal; the visitor sees `(node, parent, depth)`.
pub fn walk<F>(nodes: &[TreeNode], mut visit: F)
where
    F: FnMut(&TreeNode, Option<&TreeNode>, usize),
{
    fn inner<F>(nodes: &[TreeNode], parent: Option<&TreeNode>, depth: usize, visit: &mut F)
    where
        F: FnMut(&TreeNode, Option<&TreeNode>, usize),
    {
        for node in nodes {
            visit(node, parent, depth);
            inner(&node.children, Some(node), depth + 1, visit);
        }
    }
    inner(nodes, None, 0, &mut visit);
}

// ---------------------------------------------------------------------------
// Transformation
// ---------------------------------------------------------------------------

/// Structure-preserving transform; `f` runs on every node, children first,
/// so a node sees its already-transformed children.
#[must_use]
pub fn map<F>(nodes: &[TreeNode], f: F) -> Vec<TreeNode>
where
    F: Fn(TreeNode) -> TreeNode,
{
    fn inner<F>(nodes: &[TreeNode], f: &F) -> Vec<TreeNode>
    where
        F: Fn(TreeNode) -> TreeNode,
    {
        nodes
            .iter()
            .map(|node| {
                let mut clone = node.clone();
                clone.children = inner(&node.children, f);
                f(clone)
            })
            .collect()
    }
    inner(nodes, &f)
}

/// Keeps nodes matching `pred` or having a matching descendant.
///
/// A surviving node keeps the matching subset of its children, or its full
/// original children when the node itself matched and nothing below did.
#[must_use]
pub fn filter<F>(nodes: &[TreeNode], pred: F) -> Vec<TreeNode>
where
    F: Fn(&TreeNode) -> bool,
{
    fn inner<F>(nodes: &[TreeNode], pred: &F) -> Vec<TreeNode>
    where
        F: Fn(&TreeNode) -> bool,
    {
        let mut kept = Vec::new();
        for node in nodes {
            let surviving = inner(&node.children, pred);
            if pred(node) || !surviving.is_empty() {
                let mut clone = node.clone();
                if !surviving.is_empty() {
                    clone.children = surviving;
                }
                kept.push(clone);
            }
        }
        kept
    }
    inner(nodes, &pred)
}

/// Case-insensitive label search over a snapshot.
///
/// A blank query returns the snapshot unchanged. `Lenient` keeps matching
/// branches with their ancestors; `Strict` keeps only self-matching nodes.
#[must_use]
pub fn filter_by_label(nodes: &[TreeNode], query: &str, mode: FilterMode) -> Vec<TreeNode> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return nodes.to_vec();
    }
    match mode {
        FilterMode::Lenient => filter(nodes, |node| node.label.to_lowercase().contains(&needle)),
        FilterMode::Strict => {
            let mut kept = Vec::new();
            for node in nodes {
                if node.label.to_lowercase().contains(&needle) {
                    kept.push(node.clone());
                }
            }
            kept
        }
    }
}

/// Clone of the snapshot with `with` applied to the node matching `key`.
/// An absent key returns the clone untouched.
#[must_use]
pub fn update<F>(nodes: &[TreeNode], key: &NodeKey, with: F) -> Vec<TreeNode>
where
    F: FnOnce(&mut TreeNode),
{
    let mut out = nodes.to_vec();
    if let Some(node) = find_mut(&mut out, key) {
        with(node);
    }
    out
}

fn find_mut<'a>(nodes: &'a mut [TreeNode], key: &NodeKey) -> Option<&'a mut TreeNode> {
    for node in nodes {
        if node.key == *key {
            return Some(node);
        }
        if let Some(hit) = find_mut(&mut node.children, key) {
            return Some(hit);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Structural edits
// ---------------------------------------------------------------------------

/// Splices `node` into the snapshot relative to `target`.
///
/// `Above`/`Below` insert as siblings of the target at the corresponding
/// offset; `Inside` appends to the target's children; `Root` appends at the
/// top level and ignores `target` entirely. A missing non-root target
/// returns a structurally unchanged copy; callers that need certainty
/// check for the inserted key afterwards.
#[must_use]
pub fn insert(
    nodes: &[TreeNode],
    target: &NodeKey,
    node: TreeNode,
    position: DropPosition,
) -> Vec<TreeNode> {
    let mut out = nodes.to_vec();
    if matches!(position, DropPosition::Root) {
        out.push(node);
        return out;
    }
    insert_in_place(&mut out, target, node, position);
    out
}

/// Returns the node back when no target was found in this subtree.
fn insert_in_place(
    nodes: &mut Vec<TreeNode>,
    target: &NodeKey,
    node: TreeNode,
    position: DropPosition,
) -> Option<TreeNode> {
    if let Some(i) = nodes.iter().position(|n| n.key == *target) {
        match position {
            DropPosition::Above => nodes.insert(i, node),
            DropPosition::Below => nodes.insert(i + 1, node),
            DropPosition::Inside | DropPosition::Root => nodes[i].children.push(node),
        }
        return None;
    }
    let mut pending = node;
    for candidate in nodes {
        match insert_in_place(&mut candidate.children, target, pending, position) {
            None => return None,
            Some(back) => pending = back,
        }
    }
    Some(pending)
}

/// Excises the first node matching `key` at any depth.
#[must_use]
pub fn remove(nodes: &[TreeNode], key: &NodeKey) -> Removal {
    let mut out = nodes.to_vec();
    match remove_in_place(&mut out, key) {
        Some((removed, parent)) => Removal {
            nodes: out,
            removed: Some(removed),
            parent,
        },
        None => Removal {
            nodes: out,
            removed: None,
            parent: None,
        },
    }
}

fn remove_in_place(
    nodes: &mut Vec<TreeNode>,
    key: &NodeKey,
) -> Option<(TreeNode, Option<NodeKey>)> {
    if let Some(i) = nodes.iter().position(|n| n.key == *key) {
        return Some((nodes.remove(i), None));
    }
    for node in nodes {
        if let Some((removed, parent)) = remove_in_place(&mut node.children, key) {
            // The deepest frame reporting no parent is the direct parent.
            let parent = parent.or_else(|| Some(node.key.clone()));
            return Some((removed, parent));
        }
    }
    None
}

/// Remove-then-insert within one snapshot.
///
/// Returns an unchanged copy when the drag key is absent, or when the drop
/// target is absent (including targets inside the dragged subtree), so a
/// node can never silently vanish from the snapshot.
#[must_use]
pub fn move_node(
    nodes: &[TreeNode],
    drag_key: &NodeKey,
    drop_key: &NodeKey,
    position: DropPosition,
) -> Vec<TreeNode> {
    let Removal {
        nodes: without,
        removed,
        ..
    } = remove(nodes, drag_key);
    let Some(dragged) = removed else {
        return without;
    };
    if !matches!(position, DropPosition::Root) && find(&without, drop_key).is_none() {
        return nodes.to_vec();
    }
    insert(&without, drop_key, dragged, position)
}

// ---------------------------------------------------------------------------
// Drop legality and cross-tree remapping
// ---------------------------------------------------------------------------

/// The rule that failed in [`check_drop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropRejection {
    /// Drag and target are the same node.
    SelfTarget,
    /// The target lies inside the dragged subtree.
    DescendantTarget,
    /// The dragged node is marked not draggable.
    NotDraggable,
    /// The target does not accept nested children.
    NotDroppable,
}

/// Structural drop legality, independent of tree registration or grouping.
///
/// Rejects self-drops, drops into the dragged subtree, non-draggable drag
/// nodes, and `Inside` drops onto non-droppable targets. `Root` has no
/// target context and gates only on draggability. The descendant check is
/// the per-hover hot path; see [`TreeNode::contains_key`].
pub fn check_drop(
    drag: &TreeNode,
    drop: &TreeNode,
    position: DropPosition,
) -> Result<(), DropRejection> {
    if !drag.draggable {
        return Err(DropRejection::NotDraggable);
    }
    if matches!(position, DropPosition::Root) {
        return Ok(());
    }
    if drag.key == drop.key {
        return Err(DropRejection::SelfTarget);
    }
    if drag.contains_key(&drop.key) {
        return Err(DropRejection::DescendantTarget);
    }
    if matches!(position, DropPosition::Inside) && !drop.droppable {
        return Err(DropRejection::NotDroppable);
    }
    Ok(())
}

/// `true` when [`check_drop`] passes.
#[must_use]
pub fn can_drop(drag: &TreeNode, drop: &TreeNode, position: DropPosition) -> bool {
    check_drop(drag, drop, position).is_ok()
}

/// Rewrites every key in the subtree onto `target`, preserving local ids.
/// Retargeting onto the subtree's own tree changes nothing.
#[must_use]
pub fn retarget_subtree(node: &TreeNode, target: &TreeId) -> TreeNode {
    let mut out = node.clone();
    retarget_in_place(&mut out, target);
    out
}

fn retarget_in_place(node: &mut TreeNode, target: &TreeId) {
    node.key = node.key.with_tree(target);
    for child in &mut node.children {
        retarget_in_place(child, target);
    }
}
