#![forbid(unsafe_code)]

//! Cross-tree drag-and-drop coordination.
//!
//! A [`DragCoordinator`] owns the drag session, a registry of
//! participating trees, and the validate-then-commit drop pipeline.
//! Tree widgets plug in through the [`TreeHost`] trait; node arrays and
//! the pure operations on them live in the `graft-tree` crate.
//!
//! The state machine is deliberately small: idle, dragging, or dragging
//! with a validated hover target. A drop either commits through both
//! trees' mutators, queues for confirmation, declines with a
//! [`DropDeclined`] value, or aborts with a [`DropError`] leaving both
//! trees untouched.

pub mod channel;
pub mod coordinator;
pub mod event;
pub mod pending;
pub mod registry;
pub mod session;

pub use channel::{ChannelError, DragIntent, MemoryChannel, SideChannel};
pub use coordinator::{
    CoordinatorConfig, DragCoordinator, DropDeclined, DropError, DropOutcome, DropPolicy,
    HoverOutcome, PendingOutcome, StartOutcome,
};
pub use event::{CancelReason, CrossTreeMove, HoverFeedback, TreeEvent};
pub use pending::{Decision, DragStats, MoveSite, PendingMove, PendingQueue};
pub use registry::{TreeHost, TreeRegistry};
pub use session::{DragSession, DragTarget};
