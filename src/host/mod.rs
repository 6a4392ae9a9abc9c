//! Host Adapter - The boundary between the engine and the host tree.
//!
//! The engine never touches a host tree directly. Everything goes through
//! [`HostAdapter`], which owns the actual nodes and hands out cheap handles.
//!
//! ```text
//! work phase:   create_node / create_text_node / set_property / add_listener   (detached nodes only)
//! commit phase: append_child / insert_before / remove_child + configuration diffs
//! ```
//!
//! Two adapters ship with the crate:
//! - [`MemoryHost`] - in-memory tree with an operation log (tests, headless use)
//! - [`TerminalHost`] - MemoryHost plus a crossterm painter

pub mod memory;
pub mod props;
pub mod terminal;

use std::fmt::Debug;

use crate::error::HostError;
use crate::types::{Listener, Value};

pub use memory::{HostOp, HostSnapshot, MemoryHost, NodeId};
pub use props::{event_name, is_listener_key, update_host_props};
pub use terminal::{Attr, TerminalHost};

/// Operations the engine needs from a host tree.
///
/// Handles are owned by the adapter; the engine clones them into fibers and
/// compares them for equality when looking up root containers.
pub trait HostAdapter {
    /// Handle to one host node.
    type Node: Clone + PartialEq + Debug;

    /// Create a detached element node.
    fn create_node(&mut self, tag: &str) -> Result<Self::Node, HostError>;

    /// Create a detached text node.
    fn create_text_node(&mut self, value: &str) -> Result<Self::Node, HostError>;

    /// Set a property on a node.
    fn set_property(&mut self, node: &Self::Node, key: &str, value: &Value) -> Result<(), HostError>;

    /// Clear a property previously set on a node.
    fn clear_property(&mut self, node: &Self::Node, key: &str) -> Result<(), HostError>;

    /// Attach a listener for `event`.
    fn add_listener(
        &mut self,
        node: &Self::Node,
        event: &str,
        listener: &Listener,
    ) -> Result<(), HostError>;

    /// Detach a listener previously attached for `event`, matched by identity.
    fn remove_listener(
        &mut self,
        node: &Self::Node,
        event: &str,
        listener: &Listener,
    ) -> Result<(), HostError>;

    /// Attach `child` as the last child of `parent`.
    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;

    /// Attach `child` under `parent` right before `before`.
    fn insert_before(
        &mut self,
        parent: &Self::Node,
        child: &Self::Node,
        before: &Self::Node,
    ) -> Result<(), HostError>;

    /// Detach `child` from `parent`.
    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;

    /// Put `new` where `old` was under `parent`.
    fn replace_child(
        &mut self,
        parent: &Self::Node,
        old: &Self::Node,
        new: &Self::Node,
    ) -> Result<(), HostError> {
        self.insert_before(parent, new, old)?;
        self.remove_child(parent, old)
    }

    /// The engine will never use `node` again.
    ///
    /// Called once per node of a deleted subtree after it was detached, and
    /// for nodes created by a pass that was thrown away. Adapters that own
    /// their nodes can free them here.
    fn release_node(&mut self, _node: &Self::Node) -> Result<(), HostError> {
        Ok(())
    }
}
