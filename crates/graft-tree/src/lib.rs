#![forbid(unsafe_code)]

//! Tree data model and pure snapshot operations.
//!
//! Everything here is value-oriented: trees are plain `Vec<TreeNode>`
//! snapshots, and every operation in [`ops`] returns a fresh snapshot
//! instead of mutating its input. The drag-and-drop coordination layer
//! builds on these primitives; this crate knows nothing about sessions,
//! registries, or the widgets that render the trees.

pub mod expand;
pub mod key;
pub mod node;
pub mod ops;
pub mod position;

pub use expand::ExpandedKeys;
pub use key::{NodeKey, TreeId};
pub use node::TreeNode;
pub use position::{DropBands, DropPosition, InvalidBands};
