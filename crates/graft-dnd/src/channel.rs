//! Serialized side channel for cross-context drag recovery.
//!
//! A drag may end in an execution context that never saw it start (a
//! second window, a detached frame). The coordinator publishes a
//! [`DragIntent`] record at drag start and deletes it at drag end; any
//! context with access to the shared transport can re-seed its own
//! session from the payload. The transport itself is a [`SideChannel`]
//! trait so hosts can back it with whatever storage they share.

use graft_tree::{TreeId, TreeNode};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;

/// Drag metadata visible to execution contexts without the in-memory
/// session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragIntent {
    /// The node being dragged, with its source-tree keys.
    pub drag_node: TreeNode,
    /// Tree the drag started in.
    pub source_tree: TreeId,
    /// Group tag of the source tree at drag start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_group: Option<String>,
    /// Epoch milliseconds at drag start.
    pub started_at_ms: u64,
}

impl DragIntent {
    /// Serialize for the side channel.
    pub fn to_json(&self) -> Result<String, ChannelError> {
        serde_json::to_string(self).map_err(|e| ChannelError::Malformed(e.to_string()))
    }

    /// Decode a side-channel payload.
    pub fn from_json(payload: &str) -> Result<Self, ChannelError> {
        serde_json::from_str(payload).map_err(|e| ChannelError::Malformed(e.to_string()))
    }
}

/// Failure in the side-channel transport or payload encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The transport rejected the operation.
    Transport(String),
    /// The stored payload did not decode as a drag intent.
    Malformed(String),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(detail) => write!(f, "side channel transport failed: {detail}"),
            Self::Malformed(detail) => write!(f, "malformed drag intent payload: {detail}"),
        }
    }
}

impl std::error::Error for ChannelError {}

/// Transport for the serialized drag intent.
///
/// Implementations take `&self`; shared-state transports use interior
/// mutability, matching how the coordinator holds them.
pub trait SideChannel {
    /// Persist the serialized intent, replacing any prior payload.
    fn store(&self, payload: &str) -> Result<(), ChannelError>;
    /// Read the current payload, `None` when the channel is empty.
    fn load(&self) -> Result<Option<String>, ChannelError>;
    /// Delete any stored payload.
    fn clear(&self) -> Result<(), ChannelError>;
}

/// In-memory channel for tests and single-process hosts.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    slot: RefCell<Option<String>>,
}

impl MemoryChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SideChannel for MemoryChannel {
    fn store(&self, payload: &str) -> Result<(), ChannelError> {
        *self.slot.borrow_mut() = Some(payload.to_string());
        Ok(())
    }

    fn load(&self) -> Result<Option<String>, ChannelError> {
        Ok(self.slot.borrow().clone())
    }

    fn clear(&self) -> Result<(), ChannelError> {
        *self.slot.borrow_mut() = None;
        Ok(())
    }
}
