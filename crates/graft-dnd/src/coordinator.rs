//! Cross-tree drag state machine.
//!
//! One [`DragCoordinator`] serves every tree widget in a window. Widgets
//! register [`TreeHost`] handles on mount; the host's binding layer feeds
//! pointer transitions in (`start`, `hover`, `leave`, `drop_on`, `end`)
//! and widgets re-render from the [`TreeEvent`]s pushed back out.
//!
//! # Design
//!
//! 1. Validate, then commit: a drop runs every fallible lookup on owned
//!    snapshots first, and the mutator writes happen only after the last
//!    fallible step, so a failed drop never leaves a half-moved tree.
//! 2. Rejections are data, not errors: an illegal hover or drop returns a
//!    [`DropDeclined`] value and changes nothing. [`DropError`] is
//!    reserved for broken coordination (unregistered trees, stale keys,
//!    channel corruption).
//! 3. At most one drag session is live; `start` replaces any prior
//!    session, and the host's unconditional `end` call at gesture
//!    conclusion clears whatever is left.
//! 4. Under [`DropPolicy::Confirm`] a validated drop is queued instead of
//!    committed; acceptance re-validates against fresh snapshots.

use crate::channel::{ChannelError, DragIntent, SideChannel};
use crate::event::{CancelReason, CrossTreeMove, HoverFeedback, TreeEvent};
use crate::pending::{Decision, DragStats, MoveSite, PendingMove, PendingQueue};
use crate::registry::{TreeHost, TreeRegistry};
use crate::session::{DragSession, DragTarget, epoch_ms};
use graft_tree::ops::{self, DropRejection};
use graft_tree::{DropBands, DropPosition, ExpandedKeys, InvalidBands, NodeKey, TreeId, TreeNode};
use std::fmt;
use std::rc::Rc;
use web_time::Instant;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// When a validated drop actually commits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DropPolicy {
    /// Commit inside `drop_on`/`drop_root`.
    #[default]
    Immediate,
    /// Queue the move and wait for `resolve_pending`.
    Confirm,
}

/// Coordinator tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoordinatorConfig {
    /// Row-fraction bands mapping pointer height to a drop position.
    pub bands: DropBands,
    /// Commit mode for validated drops.
    pub drop_policy: DropPolicy,
}

impl CoordinatorConfig {
    /// Build a config with custom bands, validating the fractions.
    pub fn new(above: f32, below: f32, drop_policy: DropPolicy) -> Result<Self, InvalidBands> {
        Ok(Self {
            bands: DropBands::new(above, below)?,
            drop_policy,
        })
    }
}

// ---------------------------------------------------------------------------
// Outcomes and errors
// ---------------------------------------------------------------------------

/// Why a hover or drop was declined.
///
/// Declines are expected outcomes of ordinary dragging: the state machine
/// stays where it was and the host typically shows a "no drop" indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropDeclined {
    /// No drag is active in this session or the side channel.
    NoActiveDrag,
    /// The dragged node has `draggable == false`.
    NotDraggable,
    /// Source and candidate groups are both set and differ.
    GroupMismatch,
    /// The target is the dragged node itself.
    SelfTarget,
    /// The target sits inside the dragged subtree.
    DescendantTarget,
    /// The target row refuses nested drops.
    NotDroppable,
    /// No hover recorded a drop position before release.
    NoDropPosition,
}

impl fmt::Display for DropDeclined {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoActiveDrag => "no active drag",
            Self::NotDraggable => "node is not draggable",
            Self::GroupMismatch => "source and target groups differ",
            Self::SelfTarget => "cannot drop a node onto itself",
            Self::DescendantTarget => "cannot drop a node into its own subtree",
            Self::NotDroppable => "target does not accept nested drops",
            Self::NoDropPosition => "no drop position was recorded",
        };
        f.write_str(text)
    }
}

impl From<DropRejection> for DropDeclined {
    fn from(rejection: DropRejection) -> Self {
        match rejection {
            DropRejection::SelfTarget => Self::SelfTarget,
            DropRejection::DescendantTarget => Self::DescendantTarget,
            DropRejection::NotDraggable => Self::NotDraggable,
            DropRejection::NotDroppable => Self::NotDroppable,
        }
    }
}

/// Coordination failure while committing a drop.
///
/// Unlike [`DropDeclined`] these indicate a broken precondition between
/// the coordinator and its registered trees, typically a widget unmounted
/// mid-drag or a stale key. The drop aborts with both node arrays
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropError {
    /// No registry entry for the tree.
    TreeNotRegistered(TreeId),
    /// Drag node key missing from the source snapshot.
    DragNodeMissing(NodeKey),
    /// Target key missing from the target snapshot.
    TargetMissing(NodeKey),
    /// The side channel failed or held a corrupt payload.
    Channel(ChannelError),
    /// No pending move with the given id.
    UnknownPending(u64),
}

impl fmt::Display for DropError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TreeNotRegistered(tree) => write!(f, "tree '{tree}' is not registered"),
            Self::DragNodeMissing(key) => {
                write!(f, "drag node '{key}' is missing from the source tree")
            }
            Self::TargetMissing(key) => {
                write!(f, "drop target '{key}' is missing from the target tree")
            }
            Self::Channel(err) => write!(f, "side channel failure: {err}"),
            Self::UnknownPending(id) => write!(f, "no pending move with id {id}"),
        }
    }
}

impl std::error::Error for DropError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Channel(err) => Some(err),
            _ => None,
        }
    }
}

/// Result of [`DragCoordinator::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Session is live; `DragStart` went to the source tree.
    Started,
    /// The node refused the drag; nothing changed.
    Declined(DropDeclined),
}

/// Result of [`DragCoordinator::hover`] and
/// [`DragCoordinator::hover_root`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverOutcome {
    /// Target recorded; feedback went to the candidate tree.
    Accepted(DropPosition),
    /// Hover rejected; the session target is unchanged.
    Declined(DropDeclined),
}

/// Result of [`DragCoordinator::drop_on`] and
/// [`DragCoordinator::drop_root`].
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// The move committed; `Moved` went to both trees.
    Committed(Box<CrossTreeMove>),
    /// Queued for confirmation under [`DropPolicy::Confirm`].
    Pending(u64),
    /// Validation declined the drop; no state touched.
    Declined(DropDeclined),
    /// Coordination failure; neither mutator ran.
    Failed(DropError),
}

/// Result of [`DragCoordinator::resolve_pending`].
#[derive(Debug, Clone, PartialEq)]
pub enum PendingOutcome {
    /// Accepted and committed.
    Committed(Box<CrossTreeMove>),
    /// Rejected and discarded.
    Discarded,
    /// Accepted but re-validation declined; the move is dropped.
    Declined(DropDeclined),
    /// Accepted but the commit failed.
    Failed(DropError),
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Everything needed to validate and commit one drop, captured as owned
/// values so the pipeline never re-reads mid-operation.
#[derive(Debug, Clone)]
struct DropRequest {
    drag: TreeNode,
    source_tree: TreeId,
    source_group: Option<String>,
    target_tree: TreeId,
    drop_node: Option<TreeNode>,
    position: DropPosition,
}

/// Output of the fallible half of a drop: both final arrays computed on
/// snapshots, with the mutator writes still to come.
struct PreparedMove {
    source_host: Rc<dyn TreeHost>,
    target_host: Rc<dyn TreeHost>,
    same_tree: bool,
    source_before: Vec<TreeNode>,
    source_after: Vec<TreeNode>,
    target_before: Vec<TreeNode>,
    target_after: Vec<TreeNode>,
    removed: TreeNode,
    moved_key: NodeKey,
    moved_expansion: Option<ExpandedKeys>,
}

/// Shared drag coordinator for a set of tree widgets.
///
/// The host's composition root constructs one coordinator and routes
/// every tree's gestures through it; the single-active-drag constraint is
/// an invariant of this object rather than of any global state.
pub struct DragCoordinator {
    config: CoordinatorConfig,
    registry: TreeRegistry,
    session: DragSession,
    pending: PendingQueue,
    stats: DragStats,
    channel: Option<Rc<dyn SideChannel>>,
}

impl DragCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CoordinatorConfig::default())
    }

    #[must_use]
    pub fn with_config(config: CoordinatorConfig) -> Self {
        Self {
            config,
            registry: TreeRegistry::new(),
            session: DragSession::new(),
            pending: PendingQueue::new(),
            stats: DragStats::default(),
            channel: None,
        }
    }

    /// Attach a side channel for cross-context drag recovery.
    #[must_use]
    pub fn with_channel(mut self, channel: Rc<dyn SideChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    // --- registry ---

    /// Register a tree on mount, replacing any prior entry with its id.
    pub fn register(&mut self, tree: TreeId, host: Rc<dyn TreeHost>) {
        self.registry.register(tree, host);
    }

    /// Remove a tree on unmount; unknown ids are a no-op.
    pub fn unregister(&mut self, tree: &TreeId) -> bool {
        self.registry.unregister(tree)
    }

    #[must_use]
    pub fn is_registered(&self, tree: &TreeId) -> bool {
        self.registry.contains(tree)
    }

    #[must_use]
    pub fn registry(&self) -> &TreeRegistry {
        &self.registry
    }

    // --- observers ---

    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.session.is_active()
    }

    #[must_use]
    pub fn session(&self) -> &DragSession {
        &self.session
    }

    /// Counters including the current pending-queue depth.
    #[must_use]
    pub fn stats(&self) -> DragStats {
        let mut stats = self.stats;
        stats.pending = self.pending.len() as u64;
        stats
    }

    /// Every queued move, oldest first.
    #[must_use]
    pub fn pending(&self) -> &[PendingMove] {
        self.pending.all()
    }

    /// Queued moves touching `tree` as source or target.
    pub fn pending_for_tree<'a>(
        &'a self,
        tree: &'a TreeId,
    ) -> impl Iterator<Item = &'a PendingMove> {
        self.pending.for_tree(tree)
    }

    /// Discard every queued move; returns how many were dropped.
    pub fn clear_pending(&mut self) -> usize {
        self.pending.clear()
    }

    // --- transitions ---

    /// Begin a drag from `source_tree`, replacing any live session.
    pub fn start(
        &mut self,
        node: TreeNode,
        source_tree: TreeId,
        source_group: Option<String>,
    ) -> StartOutcome {
        if !node.draggable {
            return StartOutcome::Declined(DropDeclined::NotDraggable);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(message = "dnd.start", tree = %source_tree, node = %node.key, group = ?source_group);
        self.stats.record_start();
        self.session
            .start(node.clone(), source_tree.clone(), source_group);
        self.publish_intent();
        if let Some(host) = self.registry.get(&source_tree) {
            host.emit(&TreeEvent::DragStart { node });
        }
        StartOutcome::Started
    }

    /// Validate a hover over `node`, with the pointer at `fraction` of the
    /// row height (`0.0` top edge, `1.0` bottom edge).
    pub fn hover(&mut self, tree: &TreeId, node: &TreeNode, fraction: f32) -> HoverOutcome {
        let position = self.config.bands.classify(fraction);
        self.hover_at(tree, Some(node), position)
    }

    /// Validate a hover over the tree's root drop zone.
    pub fn hover_root(&mut self, tree: &TreeId) -> HoverOutcome {
        self.hover_at(tree, None, DropPosition::Root)
    }

    fn hover_at(
        &mut self,
        tree: &TreeId,
        node: Option<&TreeNode>,
        position: DropPosition,
    ) -> HoverOutcome {
        if !self.session.is_active() {
            match self.try_recover() {
                Ok(true) => {}
                Ok(false) => return HoverOutcome::Declined(DropDeclined::NoActiveDrag),
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(message = "dnd.channel_recover_failed", error = %err);
                    #[cfg(not(feature = "tracing"))]
                    let _ = err;
                    return HoverOutcome::Declined(DropDeclined::NoActiveDrag);
                }
            }
        }
        let Some(drag) = self.session.drag_node() else {
            return HoverOutcome::Declined(DropDeclined::NoActiveDrag);
        };
        let cross_tree = self.session.source_tree().is_some_and(|source| source != tree);

        // Group compatibility is the only additional cross-tree gate.
        if cross_tree {
            let target_group = self.registry.get(tree).and_then(|host| host.group());
            if let (Some(source), Some(target)) =
                (self.session.source_group(), target_group.as_deref())
                && source != target
            {
                return HoverOutcome::Declined(DropDeclined::GroupMismatch);
            }
        }
        match node {
            Some(candidate) => {
                if let Err(rejection) = ops::check_drop(drag, candidate, position) {
                    return HoverOutcome::Declined(DropDeclined::from(rejection));
                }
            }
            None => {
                if !drag.draggable {
                    return HoverOutcome::Declined(DropDeclined::NotDraggable);
                }
            }
        }

        let feedback = HoverFeedback {
            tree: tree.clone(),
            target: node.map(|n| n.key.clone()),
            target_label: node.map(|n| n.label.clone()),
            position,
            cross_tree,
        };
        self.session.update_target(DragTarget {
            tree: tree.clone(),
            node: node.cloned(),
            position,
        });
        if let Some(host) = self.registry.get(tree) {
            host.emit(&TreeEvent::HoverChange(Some(feedback)));
        }
        HoverOutcome::Accepted(position)
    }

    /// Clear the landing site when the pointer leaves `tree`.
    ///
    /// The bounding-box containment check that filters spurious leave
    /// events from child-element bubbling belongs to the caller.
    pub fn leave(&mut self, tree: &TreeId) -> bool {
        let cleared = self.session.clear_target_in(tree);
        if cleared && let Some(host) = self.registry.get(tree) {
            host.emit(&TreeEvent::HoverChange(None));
        }
        cleared
    }

    /// Commit (or queue) a drop on `node`, using the position recorded by
    /// the preceding hover.
    pub fn drop_on(&mut self, tree: &TreeId, node: &TreeNode) -> DropOutcome {
        self.execute_drop(tree, Some(node))
    }

    /// Commit (or queue) a drop on the tree's root zone.
    pub fn drop_root(&mut self, tree: &TreeId) -> DropOutcome {
        self.execute_drop(tree, None)
    }

    fn execute_drop(&mut self, tree: &TreeId, drop_node: Option<&TreeNode>) -> DropOutcome {
        if !self.session.is_active() {
            match self.try_recover() {
                Ok(true) => {}
                Ok(false) => return DropOutcome::Declined(DropDeclined::NoActiveDrag),
                Err(err) => return self.fail_drop(DropError::Channel(err)),
            }
        }
        let (Some(drag), Some(source_tree)) = (
            self.session.drag_node().cloned(),
            self.session.source_tree().cloned(),
        ) else {
            return DropOutcome::Declined(DropDeclined::NoActiveDrag);
        };
        let source_group = self.session.source_group().map(str::to_owned);

        // The drop position comes from the recorded hover; releasing
        // without one (or over a different tree) declines.
        let position = match self.session.target() {
            Some(target) if target.tree == *tree => target.position,
            _ => {
                self.stats.record_failed();
                return DropOutcome::Declined(DropDeclined::NoDropPosition);
            }
        };
        if drop_node.is_none() && position != DropPosition::Root {
            self.stats.record_failed();
            return DropOutcome::Declined(DropDeclined::NoDropPosition);
        }

        let request = DropRequest {
            drag,
            source_tree,
            source_group,
            target_tree: tree.clone(),
            drop_node: drop_node.cloned(),
            position,
        };
        if let Err(reason) = self.validate_request(&request) {
            self.stats.record_failed();
            return DropOutcome::Declined(reason);
        }

        match self.config.drop_policy {
            DropPolicy::Confirm => self.queue_pending(request),
            DropPolicy::Immediate => {
                let commit_start = Instant::now();
                match self.prepare(&request) {
                    Ok(prepared) => {
                        let payload = self.apply(&request, prepared);
                        self.stats.record_completed(elapsed_ms(commit_start));
                        self.conclude_completed(&request.source_tree);
                        DropOutcome::Committed(payload)
                    }
                    Err(err) => self.fail_drop(err),
                }
            }
        }
    }

    /// Cancel the live drag with a reason; no-op when idle.
    pub fn cancel(&mut self, reason: CancelReason) -> bool {
        if !self.session.is_active() {
            return false;
        }
        let source = self.session.source_tree().cloned();
        let target = self.session.target().map(|t| t.tree.clone());
        self.session.end();
        self.clear_channel();
        self.stats.record_failed();
        #[cfg(feature = "tracing")]
        tracing::debug!(message = "dnd.cancel", reason = %reason);
        if let Some(tree) = &source
            && let Some(host) = self.registry.get(tree)
        {
            host.emit(&TreeEvent::DragCancel { reason });
        }
        if target != source
            && let Some(tree) = &target
            && let Some(host) = self.registry.get(tree)
        {
            host.emit(&TreeEvent::DragCancel { reason });
        }
        true
    }

    /// Unconditional cleanup when the pointer gesture concludes.
    ///
    /// Idempotent; reports whether a live session was torn down. A
    /// session already concluded by a committed drop or a cancel makes
    /// this a no-op, so every gesture sees exactly one terminal event.
    pub fn end(&mut self) -> bool {
        let source = self.session.source_tree().cloned();
        let ended = self.session.end().is_some();
        self.clear_channel();
        if ended
            && let Some(tree) = &source
            && let Some(host) = self.registry.get(tree)
        {
            host.emit(&TreeEvent::DragEnd { completed: false });
        }
        ended
    }

    /// Decide a queued move: accept re-validates and commits against
    /// fresh snapshots, reject discards it.
    pub fn resolve_pending(&mut self, id: u64, decision: Decision) -> PendingOutcome {
        let Some(pending) = self.pending.take(id) else {
            return PendingOutcome::Failed(DropError::UnknownPending(id));
        };
        match decision {
            Decision::Reject => {
                self.stats.record_failed();
                PendingOutcome::Discarded
            }
            Decision::Accept => {
                let request = DropRequest {
                    drag: pending.drag_node,
                    source_tree: pending.source_tree,
                    source_group: pending.source_group,
                    target_tree: pending.target_tree,
                    drop_node: pending.drop_node,
                    position: pending.position,
                };
                if let Err(reason) = self.validate_request(&request) {
                    self.stats.record_failed();
                    return PendingOutcome::Declined(reason);
                }
                let commit_start = Instant::now();
                match self.prepare(&request) {
                    Ok(prepared) => {
                        let payload = self.apply(&request, prepared);
                        self.stats.record_completed(elapsed_ms(commit_start));
                        PendingOutcome::Committed(payload)
                    }
                    Err(err) => {
                        self.stats.record_failed();
                        #[cfg(feature = "tracing")]
                        tracing::warn!(message = "dnd.pending_failed", id, error = %err);
                        PendingOutcome::Failed(err)
                    }
                }
            }
        }
    }

    // --- drop pipeline ---

    /// Group and structural legality on the captured request.
    fn validate_request(&self, request: &DropRequest) -> Result<(), DropDeclined> {
        if request.source_tree != request.target_tree {
            let target_group = self
                .registry
                .get(&request.target_tree)
                .and_then(|host| host.group());
            if let (Some(source), Some(target)) = (&request.source_group, &target_group)
                && source != target
            {
                return Err(DropDeclined::GroupMismatch);
            }
        }
        match &request.drop_node {
            Some(target) => ops::check_drop(&request.drag, target, request.position)
                .map_err(DropDeclined::from),
            None if request.drag.draggable => Ok(()),
            None => Err(DropDeclined::NotDraggable),
        }
    }

    /// The fallible half of a drop: fresh snapshots, removal, remap and
    /// insertion all computed on owned values. Nothing is written yet.
    fn prepare(&self, request: &DropRequest) -> Result<PreparedMove, DropError> {
        let Some(source_host) = self.registry.get(&request.source_tree).cloned() else {
            return Err(DropError::TreeNotRegistered(request.source_tree.clone()));
        };
        let Some(target_host) = self.registry.get(&request.target_tree).cloned() else {
            return Err(DropError::TreeNotRegistered(request.target_tree.clone()));
        };
        let same_tree = request.source_tree == request.target_tree;

        let source_before = source_host.nodes();
        let target_before = if same_tree {
            source_before.clone()
        } else {
            target_host.nodes()
        };

        let drag_key = request.drag.key.clone();
        let Some(found) = ops::find(&source_before, &drag_key) else {
            return Err(DropError::DragNodeMissing(drag_key));
        };
        let moved_expansion = source_host
            .expanded()
            .map(|set| set.collect_subtree(found));

        let removal = ops::remove(&source_before, &drag_key);
        let Some(removed) = removal.removed else {
            return Err(DropError::DragNodeMissing(drag_key));
        };
        let source_after = removal.nodes;

        let moved = if same_tree {
            removed.clone()
        } else {
            ops::retarget_subtree(&removed, &request.target_tree)
        };
        let moved_key = moved.key.clone();

        let insert_base = if same_tree { &source_after } else { &target_before };
        let target_after = match &request.drop_node {
            Some(target) if request.position != DropPosition::Root => {
                if ops::find(insert_base, &target.key).is_none() {
                    return Err(DropError::TargetMissing(target.key.clone()));
                }
                ops::insert(insert_base, &target.key, moved, request.position)
            }
            _ => ops::insert(insert_base, &moved_key, moved, DropPosition::Root),
        };

        Ok(PreparedMove {
            source_host,
            target_host,
            same_tree,
            source_before,
            source_after,
            target_before,
            target_after,
            removed,
            moved_key,
            moved_expansion,
        })
    }

    /// The infallible half: write both arrays, transfer expansion state,
    /// and notify both trees.
    fn apply(&self, request: &DropRequest, prepared: PreparedMove) -> Box<CrossTreeMove> {
        let PreparedMove {
            source_host,
            target_host,
            same_tree,
            source_before,
            source_after,
            target_before,
            target_after,
            removed,
            moved_key,
            moved_expansion,
        } = prepared;

        if same_tree {
            source_host.set_nodes(target_after.clone());
        } else {
            source_host.set_nodes(source_after.clone());
            target_host.set_nodes(target_after.clone());
        }

        if !same_tree
            && let Some(moved_keys) = &moved_expansion
            && !moved_keys.is_empty()
        {
            if let Some(mut source_set) = source_host.expanded() {
                for key in moved_keys.iter() {
                    source_set.collapse(key);
                }
                source_host.set_expanded(source_set);
            }
            if let Some(mut target_set) = target_host.expanded() {
                target_set.merge(&moved_keys.retargeted(&request.target_tree));
                target_host.set_expanded(target_set);
            }
        }

        let final_source = if same_tree {
            target_after.clone()
        } else {
            source_after
        };
        let payload = Box::new(CrossTreeMove {
            drag_node: removed,
            moved_key,
            drop_node: request.drop_node.clone(),
            position: request.position,
            source_tree: request.source_tree.clone(),
            target_tree: request.target_tree.clone(),
            source_before,
            source_after: final_source,
            target_before,
            target_after,
        });
        #[cfg(feature = "tracing")]
        tracing::debug!(
            message = "dnd.moved",
            source = %payload.source_tree,
            target = %payload.target_tree,
            key = %payload.moved_key,
            position = %payload.position,
        );
        source_host.emit(&TreeEvent::Moved(payload.clone()));
        if !same_tree {
            target_host.emit(&TreeEvent::Moved(payload.clone()));
        }
        payload
    }

    /// Validate via a dry run, queue the move, and conclude the gesture.
    fn queue_pending(&mut self, request: DropRequest) -> DropOutcome {
        let prepared = match self.prepare(&request) {
            Ok(prepared) => prepared,
            Err(err) => return self.fail_drop(err),
        };
        let from = ops::locate(&prepared.source_before, &request.drag.key)
            .map(|site| MoveSite::from_position(request.source_tree.clone(), site));
        let to = ops::locate(&prepared.target_after, &prepared.moved_key)
            .map(|site| MoveSite::from_position(request.target_tree.clone(), site));

        let target_tree = request.target_tree.clone();
        let id = self.pending.push(PendingMove {
            id: 0,
            description: describe(&request),
            queued_at_ms: epoch_ms(),
            drag_node: request.drag,
            drop_node: request.drop_node,
            position: request.position,
            source_tree: request.source_tree,
            source_group: request.source_group,
            target_tree: request.target_tree,
            from,
            to,
        });
        self.session.end();
        self.clear_channel();
        #[cfg(feature = "tracing")]
        tracing::debug!(message = "dnd.pending", id, target = %target_tree);
        if let Some(host) = self.registry.get(&target_tree) {
            host.emit(&TreeEvent::DropPending { id });
        }
        DropOutcome::Pending(id)
    }

    fn fail_drop(&mut self, err: DropError) -> DropOutcome {
        self.stats.record_failed();
        #[cfg(feature = "tracing")]
        tracing::warn!(message = "dnd.drop_failed", error = %err);
        DropOutcome::Failed(err)
    }

    /// Commit-side conclusion: clear the session and channel and tell the
    /// source tree the gesture finished with a completed drop.
    fn conclude_completed(&mut self, source_tree: &TreeId) {
        self.session.end();
        self.clear_channel();
        if let Some(host) = self.registry.get(source_tree) {
            host.emit(&TreeEvent::DragEnd { completed: true });
        }
    }

    // --- side channel ---

    /// Re-seed an idle session from the side channel. `Ok(false)` means
    /// no channel or nothing stored; a present-but-corrupt payload is an
    /// error.
    fn try_recover(&mut self) -> Result<bool, ChannelError> {
        let Some(channel) = self.channel.clone() else {
            return Ok(false);
        };
        let Some(payload) = channel.load()? else {
            return Ok(false);
        };
        let intent = DragIntent::from_json(&payload)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(message = "dnd.recovered", tree = %intent.source_tree, node = %intent.drag_node.key);
        self.session.resume(
            intent.drag_node,
            intent.source_tree,
            intent.source_group,
            intent.started_at_ms,
        );
        Ok(true)
    }

    /// Best-effort intent publication; channel failures are logged, not
    /// surfaced, since the in-memory session stays authoritative.
    fn publish_intent(&self) {
        let Some(channel) = &self.channel else {
            return;
        };
        let Some(intent) = self.session.intent() else {
            return;
        };
        let stored = intent.to_json().and_then(|payload| channel.store(&payload));
        if let Err(err) = stored {
            #[cfg(feature = "tracing")]
            tracing::warn!(message = "dnd.channel_store_failed", error = %err);
            #[cfg(not(feature = "tracing"))]
            let _ = err;
        }
    }

    fn clear_channel(&self) {
        if let Some(channel) = &self.channel
            && let Err(err) = channel.clear()
        {
            #[cfg(feature = "tracing")]
            tracing::warn!(message = "dnd.channel_clear_failed", error = %err);
            #[cfg(not(feature = "tracing"))]
            let _ = err;
        }
    }
}

impl Default for DragCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DragCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragCoordinator")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("session", &self.session)
            .field("pending", &self.pending.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Confirmation-dialog summary of a proposed move.
fn describe(request: &DropRequest) -> String {
    let label = &request.drag.label;
    match (&request.drop_node, request.position) {
        (Some(target), DropPosition::Inside) => {
            format!("Move '{label}' into '{}'", target.label)
        }
        (Some(target), DropPosition::Above) => {
            format!("Move '{label}' before '{}'", target.label)
        }
        (Some(target), DropPosition::Below) => {
            format!("Move '{label}' after '{}'", target.label)
        }
        _ => format!("Move '{label}' to the top level of '{}'", request.target_tree),
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
