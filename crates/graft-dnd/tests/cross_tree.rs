//! End-to-end drop scenarios across registered tree widgets.

use graft_dnd::{
    CoordinatorConfig, CrossTreeMove, Decision, DragCoordinator, DropDeclined, DropError,
    DropOutcome, DropPolicy, HoverOutcome, MemoryChannel, PendingOutcome, SideChannel, TreeEvent,
    TreeHost,
};
use graft_tree::{DropPosition, ExpandedKeys, NodeKey, TreeId, TreeNode};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Host double backed by plain cells, recording every mutator call and
/// emitted event.
struct RecordingHost {
    nodes: RefCell<Vec<TreeNode>>,
    expanded: RefCell<Option<ExpandedKeys>>,
    group: Option<String>,
    events: RefCell<Vec<TreeEvent>>,
    writes: Cell<usize>,
}

impl RecordingHost {
    fn new(nodes: Vec<TreeNode>) -> Rc<Self> {
        Rc::new(Self::build(nodes, None, None))
    }

    fn with_group(nodes: Vec<TreeNode>, group: &str) -> Rc<Self> {
        Rc::new(Self::build(nodes, Some(group.to_string()), None))
    }

    fn with_expansion(nodes: Vec<TreeNode>, expanded: ExpandedKeys) -> Rc<Self> {
        Rc::new(Self::build(nodes, None, Some(expanded)))
    }

    fn build(nodes: Vec<TreeNode>, group: Option<String>, expanded: Option<ExpandedKeys>) -> Self {
        Self {
            nodes: RefCell::new(nodes),
            expanded: RefCell::new(expanded),
            group,
            events: RefCell::new(Vec::new()),
            writes: Cell::new(0),
        }
    }

    fn snapshot(&self) -> Vec<TreeNode> {
        self.nodes.borrow().clone()
    }

    fn events(&self) -> Vec<TreeEvent> {
        self.events.borrow().clone()
    }

    fn moves(&self) -> Vec<CrossTreeMove> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                TreeEvent::Moved(payload) => Some((**payload).clone()),
                _ => None,
            })
            .collect()
    }

    fn writes(&self) -> usize {
        self.writes.get()
    }

    fn expansion(&self) -> ExpandedKeys {
        self.expanded.borrow().clone().unwrap_or_default()
    }
}

impl TreeHost for RecordingHost {
    fn nodes(&self) -> Vec<TreeNode> {
        self.nodes.borrow().clone()
    }

    fn set_nodes(&self, nodes: Vec<TreeNode>) {
        self.writes.set(self.writes.get() + 1);
        *self.nodes.borrow_mut() = nodes;
    }

    fn emit(&self, event: &TreeEvent) {
        self.events.borrow_mut().push(event.clone());
    }

    fn group(&self) -> Option<String> {
        self.group.clone()
    }

    fn expanded(&self) -> Option<ExpandedKeys> {
        self.expanded.borrow().clone()
    }

    fn set_expanded(&self, expanded: ExpandedKeys) {
        *self.expanded.borrow_mut() = Some(expanded);
    }
}

fn node(tree: &str, local: &str, label: &str) -> TreeNode {
    TreeNode::new(NodeKey::new(tree, local), label)
}

fn event_kind(event: &TreeEvent) -> &'static str {
    match event {
        TreeEvent::DragStart { .. } => "drag_start",
        TreeEvent::HoverChange(Some(_)) => "hover",
        TreeEvent::HoverChange(None) => "hover_clear",
        TreeEvent::DropPending { .. } => "pending",
        TreeEvent::Moved(_) => "moved",
        TreeEvent::DragCancel { .. } => "cancel",
        TreeEvent::DragEnd { .. } => "end",
    }
}

fn labels(nodes: &[TreeNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.label.as_str()).collect()
}

#[test]
fn file_moves_between_trees_with_rekeyed_subtree() {
    let source = RecordingHost::new(vec![
        node("t1", "0", "Folder").with_child(node("t1", "0-0", "File")),
    ]);
    let target = RecordingHost::new(vec![node("t2", "0", "Root")]);
    let mut coordinator = DragCoordinator::new();
    coordinator.register(TreeId::new("t1"), source.clone());
    coordinator.register(TreeId::new("t2"), target.clone());

    let drag = node("t1", "0-0", "File");
    coordinator.start(drag, TreeId::new("t1"), None);
    assert_eq!(
        coordinator.hover(&TreeId::new("t2"), &node("t2", "0", "Root"), 0.5),
        HoverOutcome::Accepted(DropPosition::Inside)
    );

    let outcome = coordinator.drop_on(&TreeId::new("t2"), &node("t2", "0", "Root"));
    let DropOutcome::Committed(payload) = outcome else {
        panic!("expected a committed move, got {outcome:?}");
    };

    // The subtree left the source intact and arrived re-keyed.
    let source_nodes = source.snapshot();
    assert_eq!(source_nodes.len(), 1);
    assert!(source_nodes[0].children.is_empty());
    let target_nodes = target.snapshot();
    assert_eq!(target_nodes[0].children.len(), 1);
    let moved = &target_nodes[0].children[0];
    assert_eq!(moved.key, NodeKey::new("t2", "0-0"), "local id survives");
    assert_eq!(moved.label, "File");

    assert!(payload.is_cross_tree());
    assert_eq!(payload.moved_key, NodeKey::new("t2", "0-0"));
    assert_eq!(payload.drag_node.key, NodeKey::new("t1", "0-0"));
    assert_eq!(payload.source_after, source_nodes);
    assert_eq!(payload.target_after, target_nodes);

    // One move notification per side, identical payloads.
    assert_eq!(source.moves(), vec![(*payload).clone()]);
    assert_eq!(target.moves(), vec![(*payload).clone()]);
    assert_eq!(source.writes(), 1);
    assert_eq!(target.writes(), 1);

    let source_kinds: Vec<_> = source.events().iter().map(event_kind).collect();
    assert_eq!(source_kinds, vec!["drag_start", "moved", "end"]);
    let target_kinds: Vec<_> = target.events().iter().map(event_kind).collect();
    assert_eq!(target_kinds, vec!["hover", "moved"]);

    // The commit already tore the gesture down; the host's unconditional
    // drag-end cleanup adds nothing.
    assert!(!coordinator.end());
    assert_eq!(source.events().iter().map(event_kind).count(), 3);
}

#[test]
fn hover_feedback_carries_the_cross_tree_flag() {
    let source = RecordingHost::new(vec![node("t1", "0", "A")]);
    let target = RecordingHost::new(vec![node("t2", "0", "B")]);
    let mut coordinator = DragCoordinator::new();
    coordinator.register(TreeId::new("t1"), source);
    coordinator.register(TreeId::new("t2"), target.clone());

    coordinator.start(node("t1", "0", "A"), TreeId::new("t1"), None);
    coordinator.hover(&TreeId::new("t2"), &node("t2", "0", "B"), 0.5);

    let events = target.events();
    let TreeEvent::HoverChange(Some(feedback)) = &events[0] else {
        panic!("expected hover feedback, got {events:?}");
    };
    assert!(feedback.cross_tree);
    assert_eq!(feedback.target, Some(NodeKey::new("t2", "0")));
    assert_eq!(feedback.target_label.as_deref(), Some("B"));
    assert_eq!(feedback.position, DropPosition::Inside);

    // Leaving the row clears the affordance.
    assert!(coordinator.leave(&TreeId::new("t2")));
    assert_eq!(
        target.events().last(),
        Some(&TreeEvent::HoverChange(None))
    );
}

#[test]
fn sibling_drops_place_above_and_below() {
    let host = RecordingHost::new(vec![
        node("t1", "a", "A"),
        node("t1", "b", "B"),
        node("t1", "c", "C"),
    ]);
    let mut coordinator = DragCoordinator::new();
    let t1 = TreeId::new("t1");
    coordinator.register(t1.clone(), host.clone());

    coordinator.start(node("t1", "c", "C"), t1.clone(), None);
    assert_eq!(
        coordinator.hover(&t1, &node("t1", "a", "A"), 0.1),
        HoverOutcome::Accepted(DropPosition::Above)
    );
    assert!(matches!(
        coordinator.drop_on(&t1, &node("t1", "a", "A")),
        DropOutcome::Committed(_)
    ));
    assert_eq!(labels(&host.snapshot()), vec!["C", "A", "B"]);

    coordinator.start(node("t1", "a", "A"), t1.clone(), None);
    assert_eq!(
        coordinator.hover(&t1, &node("t1", "b", "B"), 0.9),
        HoverOutcome::Accepted(DropPosition::Below)
    );
    assert!(matches!(
        coordinator.drop_on(&t1, &node("t1", "b", "B")),
        DropOutcome::Committed(_)
    ));
    assert_eq!(labels(&host.snapshot()), vec!["C", "B", "A"]);
}

#[test]
fn root_drop_appends_at_the_target_top_level() {
    let source = RecordingHost::new(vec![
        node("t1", "0", "Keep"),
        node("t1", "1", "Move").with_child(node("t1", "1-0", "Leaf")),
    ]);
    let target = RecordingHost::new(vec![node("t2", "0", "Existing")]);
    let mut coordinator = DragCoordinator::new();
    coordinator.register(TreeId::new("t1"), source.clone());
    coordinator.register(TreeId::new("t2"), target.clone());

    coordinator.start(
        node("t1", "1", "Move").with_child(node("t1", "1-0", "Leaf")),
        TreeId::new("t1"),
        None,
    );
    assert_eq!(
        coordinator.hover_root(&TreeId::new("t2")),
        HoverOutcome::Accepted(DropPosition::Root)
    );
    let events = target.events();
    let TreeEvent::HoverChange(Some(feedback)) = &events[0] else {
        panic!("expected root-zone feedback, got {events:?}");
    };
    assert_eq!(feedback.target, None);
    assert_eq!(feedback.position, DropPosition::Root);

    assert!(matches!(
        coordinator.drop_root(&TreeId::new("t2")),
        DropOutcome::Committed(_)
    ));
    assert_eq!(labels(&source.snapshot()), vec!["Keep"]);
    let target_nodes = target.snapshot();
    assert_eq!(labels(&target_nodes), vec!["Existing", "Move"]);
    assert_eq!(target_nodes[1].key, NodeKey::new("t2", "1"));
    assert_eq!(target_nodes[1].children[0].key, NodeKey::new("t2", "1-0"));
}

#[test]
fn group_tags_gate_only_incompatible_pairs() {
    let docs = RecordingHost::with_group(vec![node("t1", "0", "Doc")], "docs");
    let images = RecordingHost::with_group(vec![node("t2", "0", "Image")], "images");
    let plain = RecordingHost::new(vec![node("t3", "0", "Plain")]);
    let mut coordinator = DragCoordinator::new();
    coordinator.register(TreeId::new("t1"), docs);
    coordinator.register(TreeId::new("t2"), images.clone());
    coordinator.register(TreeId::new("t3"), plain);

    // Both tagged and different: declined, target never hears about it.
    coordinator.start(node("t1", "0", "Doc"), TreeId::new("t1"), Some("docs".into()));
    assert_eq!(
        coordinator.hover(&TreeId::new("t2"), &node("t2", "0", "Image"), 0.5),
        HoverOutcome::Declined(DropDeclined::GroupMismatch)
    );
    assert!(images.events().is_empty());
    assert!(coordinator.session().target().is_none());

    // Untagged target: allowed.
    assert_eq!(
        coordinator.hover(&TreeId::new("t3"), &node("t3", "0", "Plain"), 0.5),
        HoverOutcome::Accepted(DropPosition::Inside)
    );
    coordinator.end();

    // Untagged source against a tagged target: allowed.
    coordinator.start(node("t3", "0", "Plain"), TreeId::new("t3"), None);
    assert_eq!(
        coordinator.hover(&TreeId::new("t2"), &node("t2", "0", "Image"), 0.5),
        HoverOutcome::Accepted(DropPosition::Inside)
    );
}

#[test]
fn expansion_state_travels_with_the_subtree() {
    let mut source_open = ExpandedKeys::new();
    source_open.expand(NodeKey::new("t1", "a"));
    source_open.expand(NodeKey::new("t1", "a-1"));
    let source = RecordingHost::with_expansion(
        vec![
            node("t1", "a", "Branch")
                .with_child(node("t1", "a-1", "Open").with_child(node("t1", "a-1-1", "Deep")))
                .with_child(node("t1", "a-2", "Closed")),
        ],
        source_open,
    );
    let target = RecordingHost::with_expansion(vec![node("t2", "0", "Root")], ExpandedKeys::new());
    let mut coordinator = DragCoordinator::new();
    coordinator.register(TreeId::new("t1"), source.clone());
    coordinator.register(TreeId::new("t2"), target.clone());

    coordinator.start(source.snapshot()[0].clone(), TreeId::new("t1"), None);
    coordinator.hover(&TreeId::new("t2"), &node("t2", "0", "Root"), 0.5);
    assert!(matches!(
        coordinator.drop_on(&TreeId::new("t2"), &node("t2", "0", "Root")),
        DropOutcome::Committed(_)
    ));

    let source_open = source.expansion();
    assert!(source_open.is_empty(), "moved keys left the source map");

    let target_open = target.expansion();
    assert!(target_open.is_expanded(&NodeKey::new("t2", "a")));
    assert!(target_open.is_expanded(&NodeKey::new("t2", "a-1")));
    assert!(
        !target_open.is_expanded(&NodeKey::new("t2", "a-2")),
        "collapsed children stay collapsed"
    );
}

#[test]
fn vanished_target_aborts_without_touching_either_mutator() {
    let source = RecordingHost::new(vec![node("t1", "0", "Drag")]);
    let target = RecordingHost::new(vec![node("t2", "0", "Landing")]);
    let mut coordinator = DragCoordinator::new();
    coordinator.register(TreeId::new("t1"), source.clone());
    coordinator.register(TreeId::new("t2"), target.clone());

    coordinator.start(node("t1", "0", "Drag"), TreeId::new("t1"), None);
    coordinator.hover(&TreeId::new("t2"), &node("t2", "0", "Landing"), 0.5);

    // The landing row disappears before release.
    target.set_nodes(vec![node("t2", "1", "Other")]);
    let writes_after_churn = target.writes();

    assert_eq!(
        coordinator.drop_on(&TreeId::new("t2"), &node("t2", "0", "Landing")),
        DropOutcome::Failed(DropError::TargetMissing(NodeKey::new("t2", "0")))
    );
    assert_eq!(source.writes(), 0);
    assert_eq!(target.writes(), writes_after_churn);
    assert_eq!(labels(&source.snapshot()), vec!["Drag"]);
    assert_eq!(coordinator.stats().failed_drops, 1);
}

#[test]
fn unmounted_target_fails_the_drop_cleanly() {
    let source = RecordingHost::new(vec![node("t1", "0", "Drag")]);
    let target = RecordingHost::new(vec![node("t2", "0", "Landing")]);
    let mut coordinator = DragCoordinator::new();
    coordinator.register(TreeId::new("t1"), source.clone());
    coordinator.register(TreeId::new("t2"), target.clone());

    coordinator.start(node("t1", "0", "Drag"), TreeId::new("t1"), None);
    coordinator.hover(&TreeId::new("t2"), &node("t2", "0", "Landing"), 0.5);
    coordinator.unregister(&TreeId::new("t2"));

    assert_eq!(
        coordinator.drop_on(&TreeId::new("t2"), &node("t2", "0", "Landing")),
        DropOutcome::Failed(DropError::TreeNotRegistered(TreeId::new("t2")))
    );
    assert_eq!(source.writes(), 0);
    assert_eq!(target.writes(), 0);
    // The gesture still ends through the usual cleanup.
    assert!(coordinator.end());
}

#[test]
fn recovered_session_commits_when_both_trees_are_registered() {
    let channel = Rc::new(MemoryChannel::new());
    let source = RecordingHost::new(vec![
        node("t1", "0", "Folder").with_child(node("t1", "0-0", "File")),
    ]);
    let target = RecordingHost::new(vec![node("t2", "0", "Root")]);

    // The first coordinator starts the gesture, then its context is lost.
    let mut origin = DragCoordinator::new().with_channel(channel.clone());
    origin.register(TreeId::new("t1"), source.clone());
    origin.start(node("t1", "0-0", "File"), TreeId::new("t1"), None);

    // A replacement coordinator sees only the serialized intent.
    let mut replacement = DragCoordinator::new().with_channel(channel.clone());
    replacement.register(TreeId::new("t1"), source.clone());
    replacement.register(TreeId::new("t2"), target.clone());
    assert!(!replacement.is_dragging());

    assert_eq!(
        replacement.hover(&TreeId::new("t2"), &node("t2", "0", "Root"), 0.5),
        HoverOutcome::Accepted(DropPosition::Inside)
    );
    assert!(replacement.is_dragging());
    assert!(matches!(
        replacement.drop_on(&TreeId::new("t2"), &node("t2", "0", "Root")),
        DropOutcome::Committed(_)
    ));
    assert_eq!(target.snapshot()[0].children[0].key, NodeKey::new("t2", "0-0"));
    assert_eq!(channel.load().unwrap(), None, "commit clears the channel");
}

#[test]
fn recovered_drop_without_the_source_tree_aborts() {
    let channel = Rc::new(MemoryChannel::new());
    let source = RecordingHost::new(vec![node("t1", "0", "Drag")]);
    let target = RecordingHost::new(vec![node("t2", "0", "Root")]);

    let mut origin = DragCoordinator::new().with_channel(channel.clone());
    origin.register(TreeId::new("t1"), source);
    origin.start(node("t1", "0", "Drag"), TreeId::new("t1"), None);

    // Another window knows only its own tree.
    let mut other = DragCoordinator::new().with_channel(channel);
    other.register(TreeId::new("t2"), target.clone());
    other.hover(&TreeId::new("t2"), &node("t2", "0", "Root"), 0.5);

    assert_eq!(
        other.drop_on(&TreeId::new("t2"), &node("t2", "0", "Root")),
        DropOutcome::Failed(DropError::TreeNotRegistered(TreeId::new("t1")))
    );
    assert_eq!(target.writes(), 0);
    assert_eq!(labels(&target.snapshot()), vec!["Root"]);
}

#[test]
fn confirmed_cross_tree_move_commits_on_acceptance() {
    let source = RecordingHost::new(vec![
        node("t1", "0", "Folder").with_child(node("t1", "0-0", "File")),
    ]);
    let target = RecordingHost::new(vec![node("t2", "0", "Root")]);
    let config = CoordinatorConfig {
        drop_policy: DropPolicy::Confirm,
        ..CoordinatorConfig::default()
    };
    let mut coordinator = DragCoordinator::with_config(config);
    coordinator.register(TreeId::new("t1"), source.clone());
    coordinator.register(TreeId::new("t2"), target.clone());

    coordinator.start(node("t1", "0-0", "File"), TreeId::new("t1"), None);
    coordinator.hover(&TreeId::new("t2"), &node("t2", "0", "Root"), 0.5);
    let outcome = coordinator.drop_on(&TreeId::new("t2"), &node("t2", "0", "Root"));
    assert_eq!(outcome, DropOutcome::Pending(1));

    // Nothing moves until the host decides.
    assert_eq!(source.writes(), 0);
    assert_eq!(target.writes(), 0);
    assert_eq!(
        target.events().last(),
        Some(&TreeEvent::DropPending { id: 1 })
    );
    let queued = &coordinator.pending()[0];
    assert_eq!(queued.description, "Move 'File' into 'Root'");
    let from = queued.from.as_ref().unwrap();
    assert_eq!(from.tree, TreeId::new("t1"));
    assert_eq!(from.path, vec!["Folder", "File"]);
    let to = queued.to.as_ref().unwrap();
    assert_eq!(to.tree, TreeId::new("t2"));
    assert_eq!(to.path, vec!["Root", "File"]);

    let resolved = coordinator.resolve_pending(1, Decision::Accept);
    assert!(matches!(resolved, PendingOutcome::Committed(_)));
    assert!(source.snapshot()[0].children.is_empty());
    assert_eq!(target.snapshot()[0].children[0].key, NodeKey::new("t2", "0-0"));
    assert_eq!(coordinator.stats().completed_drops, 1);
    assert_eq!(coordinator.stats().pending, 0);
}

#[test]
fn stats_track_the_drop_lifecycle() {
    let source = RecordingHost::new(vec![node("t1", "0", "A"), node("t1", "1", "B")]);
    let mut coordinator = DragCoordinator::new();
    let t1 = TreeId::new("t1");
    coordinator.register(t1.clone(), source);

    // One committed drop.
    coordinator.start(node("t1", "0", "A"), t1.clone(), None);
    coordinator.hover(&t1, &node("t1", "1", "B"), 0.5);
    assert!(matches!(
        coordinator.drop_on(&t1, &node("t1", "1", "B")),
        DropOutcome::Committed(_)
    ));

    // One released without a recorded hover.
    coordinator.start(node("t1", "1", "B"), t1.clone(), None);
    assert!(matches!(
        coordinator.drop_on(&t1, &node("t1", "0", "A")),
        DropOutcome::Declined(_)
    ));
    coordinator.end();

    let stats = coordinator.stats();
    assert_eq!(stats.total_drags, 2);
    assert_eq!(stats.completed_drops, 1);
    assert_eq!(stats.failed_drops, 1);
    assert_eq!(stats.pending, 0);
    assert!(stats.avg_drop_ms >= 0.0);
}
