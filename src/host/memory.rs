//! MemoryHost - In-memory host tree with an operation log.
//!
//! Behaves like a minimal DOM: element and text nodes, properties, listeners,
//! ordered children. Every mutation is appended to an op log so tests can
//! assert exactly what a commit did to the host.
//!
//! A detached node stays alive until the renderer releases it through
//! [`HostAdapter::release_node`]. Released slots are recycled by later
//! creations, so a long-running host holds only the nodes of its current
//! trees plus the ones created by an in-flight pass.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::HostError;
use crate::types::{Event, Listener, TEXT_VALUE_KEY, Value};

use super::HostAdapter;

// =============================================================================
// Handles and Ops
// =============================================================================

/// Handle to a node in a [`MemoryHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One recorded host operation.
#[derive(Debug, Clone, PartialEq)]
pub enum HostOp {
    Create { node: NodeId, tag: String },
    CreateText { node: NodeId, value: String },
    SetProperty { node: NodeId, key: String, value: Value },
    ClearProperty { node: NodeId, key: String },
    AddListener { node: NodeId, event: String },
    RemoveListener { node: NodeId, event: String },
    Append { parent: NodeId, child: NodeId },
    InsertBefore { parent: NodeId, child: NodeId, before: NodeId },
    Remove { parent: NodeId, child: NodeId },
}

impl HostOp {
    /// Node creation (not visible until attached).
    pub fn is_create(&self) -> bool {
        matches!(self, HostOp::Create { .. } | HostOp::CreateText { .. })
    }

    /// Attach or detach.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            HostOp::Append { .. } | HostOp::InsertBefore { .. } | HostOp::Remove { .. }
        )
    }

    /// Property or listener change.
    pub fn is_configuration(&self) -> bool {
        !self.is_create() && !self.is_structural()
    }
}

// =============================================================================
// Nodes
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum NodeKind {
    Element(String),
    Text,
}

struct HostNode {
    kind: NodeKind,
    properties: BTreeMap<String, Value>,
    listeners: Vec<(String, Listener)>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl HostNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            properties: BTreeMap::new(),
            listeners: Vec::new(),
            children: Vec::new(),
            parent: None,
        }
    }
}

/// Structural copy of a host subtree, comparable with `==`.
#[derive(Debug, Clone, PartialEq)]
pub enum HostSnapshot {
    Element {
        tag: String,
        properties: BTreeMap<String, Value>,
        /// Event names with at least one listener, sorted.
        listeners: Vec<String>,
        children: Vec<HostSnapshot>,
    },
    Text(String),
}

impl fmt::Display for HostSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostSnapshot::Text(text) => f.write_str(text),
            HostSnapshot::Element {
                tag,
                properties,
                listeners,
                children,
            } => {
                write!(f, "<{tag}")?;
                for (key, value) in properties {
                    write!(f, " {key}={value}")?;
                }
                for event in listeners {
                    write!(f, " @{event}")?;
                }
                f.write_str(">")?;
                for child in children {
                    write!(f, "{child}")?;
                }
                write!(f, "</{tag}>")
            }
        }
    }
}

// =============================================================================
// MemoryHost
// =============================================================================

/// In-memory host tree.
#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<Option<HostNode>>,
    free: Vec<NodeId>,
    ops: Vec<HostOp>,
}

impl MemoryHost {
    /// Empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a container node to render into. Not recorded in the op log.
    pub fn create_container(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(tag.to_string()))
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id.0 as usize] = Some(HostNode::new(kind));
            return id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(HostNode::new(kind)));
        id
    }

    fn slot(&self, id: NodeId) -> Option<&HostNode> {
        self.nodes.get(id.0 as usize)?.as_ref()
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut HostNode> {
        self.nodes.get_mut(id.0 as usize)?.as_mut()
    }

    fn node(&self, id: NodeId) -> Result<&HostNode, HostError> {
        self.slot(id)
            .ok_or_else(|| HostError::MissingNode(id.to_string()))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut HostNode, HostError> {
        self.slot_mut(id)
            .ok_or_else(|| HostError::MissingNode(id.to_string()))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut HostNode, HostError> {
        let node = self.node_mut(id)?;
        if node.kind == NodeKind::Text {
            return Err(HostError::Unsupported {
                node: id.to_string(),
                reason: "text nodes cannot have children".into(),
            });
        }
        Ok(node)
    }

    fn detach(&mut self, child: NodeId) -> Result<(), HostError> {
        if let Some(parent) = self.node(child)?.parent {
            self.node_mut(parent)?.children.retain(|c| *c != child);
            self.node_mut(child)?.parent = None;
        }
        Ok(())
    }

    // =========================================================================
    // Op log
    // =========================================================================

    /// Operations recorded since the last clear.
    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    /// Forget recorded operations.
    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Take recorded operations, leaving the log empty.
    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Live nodes (containers included).
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Slots ever allocated, live or waiting for reuse.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Tag of an element node, None for text or unknown nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.slot(id)?.kind {
            NodeKind::Element(tag) => Some(tag),
            NodeKind::Text => None,
        }
    }

    /// True for text nodes.
    pub fn is_text(&self, id: NodeId) -> bool {
        self.slot(id).is_some_and(|n| n.kind == NodeKind::Text)
    }

    /// Children of a node, in order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slot(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id)?.parent
    }

    /// Property value of a node.
    pub fn property(&self, id: NodeId, key: &str) -> Option<&Value> {
        self.slot(id)?.properties.get(key)
    }

    /// Number of listeners attached for `event`.
    pub fn listener_count(&self, id: NodeId, event: &str) -> usize {
        self.slot(id).map_or(0, |n| {
            n.listeners.iter().filter(|(name, _)| name == event).count()
        })
    }

    /// Concatenated value of every text node under `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if self.is_text(id) {
            if let Some(Value::String(s)) = self.property(id, TEXT_VALUE_KEY) {
                out.push_str(s);
            }
            return;
        }
        for child in self.children(id) {
            self.collect_text(*child, out);
        }
    }

    /// Every element with `tag` under `root` (root excluded), in document order.
    pub fn find_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if self.tag(id) == Some(tag) {
                found.push(id);
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        found
    }

    /// Structural snapshot of a subtree.
    pub fn snapshot(&self, id: NodeId) -> HostSnapshot {
        let Some(node) = self.slot(id) else {
            return HostSnapshot::Text(String::new());
        };
        match &node.kind {
            NodeKind::Text => HostSnapshot::Text(
                node.properties
                    .get(TEXT_VALUE_KEY)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            ),
            NodeKind::Element(tag) => {
                let mut listeners: Vec<String> =
                    node.listeners.iter().map(|(name, _)| name.clone()).collect();
                listeners.sort();
                listeners.dedup();
                HostSnapshot::Element {
                    tag: tag.clone(),
                    properties: node.properties.clone(),
                    listeners,
                    children: node.children.iter().map(|c| self.snapshot(*c)).collect(),
                }
            }
        }
    }

    /// Snapshots of the children of `id`.
    pub fn snapshot_children(&self, id: NodeId) -> Vec<HostSnapshot> {
        self.children(id).iter().map(|c| self.snapshot(*c)).collect()
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Invoke every listener registered on `id` for `event.name`.
    ///
    /// No bubbling. Returns how many listeners ran.
    pub fn dispatch(&self, id: NodeId, event: &Event) -> usize {
        let listeners: Vec<Listener> = match self.slot(id) {
            Some(node) => node
                .listeners
                .iter()
                .filter(|(name, _)| *name == event.name)
                .map(|(_, l)| l.clone())
                .collect(),
            None => return 0,
        };
        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }
}

impl HostAdapter for MemoryHost {
    type Node = NodeId;

    fn create_node(&mut self, tag: &str) -> Result<NodeId, HostError> {
        let node = self.alloc(NodeKind::Element(tag.to_string()));
        self.ops.push(HostOp::Create {
            node,
            tag: tag.to_string(),
        });
        Ok(node)
    }

    fn create_text_node(&mut self, value: &str) -> Result<NodeId, HostError> {
        let node = self.alloc(NodeKind::Text);
        self.node_mut(node)?
            .properties
            .insert(TEXT_VALUE_KEY.to_string(), Value::from(value));
        self.ops.push(HostOp::CreateText {
            node,
            value: value.to_string(),
        });
        Ok(node)
    }

    fn set_property(&mut self, node: &NodeId, key: &str, value: &Value) -> Result<(), HostError> {
        self.node_mut(*node)?
            .properties
            .insert(key.to_string(), value.clone());
        self.ops.push(HostOp::SetProperty {
            node: *node,
            key: key.to_string(),
            value: value.clone(),
        });
        Ok(())
    }

    fn clear_property(&mut self, node: &NodeId, key: &str) -> Result<(), HostError> {
        self.node_mut(*node)?.properties.remove(key);
        self.ops.push(HostOp::ClearProperty {
            node: *node,
            key: key.to_string(),
        });
        Ok(())
    }

    fn add_listener(&mut self, node: &NodeId, event: &str, listener: &Listener) -> Result<(), HostError> {
        self.node_mut(*node)?
            .listeners
            .push((event.to_string(), listener.clone()));
        self.ops.push(HostOp::AddListener {
            node: *node,
            event: event.to_string(),
        });
        Ok(())
    }

    fn remove_listener(
        &mut self,
        node: &NodeId,
        event: &str,
        listener: &Listener,
    ) -> Result<(), HostError> {
        let host_node = self.node_mut(*node)?;
        if let Some(pos) = host_node
            .listeners
            .iter()
            .position(|(name, l)| name == event && std::rc::Rc::ptr_eq(l, listener))
        {
            host_node.listeners.remove(pos);
        }
        self.ops.push(HostOp::RemoveListener {
            node: *node,
            event: event.to_string(),
        });
        Ok(())
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
        self.element_mut(*parent)?;
        self.detach(*child)?;
        self.element_mut(*parent)?.children.push(*child);
        self.node_mut(*child)?.parent = Some(*parent);
        self.ops.push(HostOp::Append {
            parent: *parent,
            child: *child,
        });
        Ok(())
    }

    fn insert_before(&mut self, parent: &NodeId, child: &NodeId, before: &NodeId) -> Result<(), HostError> {
        self.element_mut(*parent)?;
        self.detach(*child)?;
        let siblings = &mut self.element_mut(*parent)?.children;
        let pos = siblings
            .iter()
            .position(|c| c == before)
            .ok_or_else(|| HostError::NotAChild {
                parent: parent.to_string(),
                child: before.to_string(),
            })?;
        siblings.insert(pos, *child);
        self.node_mut(*child)?.parent = Some(*parent);
        self.ops.push(HostOp::InsertBefore {
            parent: *parent,
            child: *child,
            before: *before,
        });
        Ok(())
    }

    fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
        let siblings = &mut self.element_mut(*parent)?.children;
        let pos = siblings
            .iter()
            .position(|c| c == child)
            .ok_or_else(|| HostError::NotAChild {
                parent: parent.to_string(),
                child: child.to_string(),
            })?;
        siblings.remove(pos);
        self.node_mut(*child)?.parent = None;
        self.ops.push(HostOp::Remove {
            parent: *parent,
            child: *child,
        });
        Ok(())
    }

    /// Free the slot of `node`. Releasing a free slot is a no-op.
    fn release_node(&mut self, node: &NodeId) -> Result<(), HostError> {
        if self.slot(*node).is_none() {
            return Ok(());
        }
        if let Some(parent) = self.slot(*node).and_then(|n| n.parent) {
            if let Some(parent) = self.slot_mut(parent) {
                parent.children.retain(|c| c != node);
            }
        }
        let children = self
            .slot(*node)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        for child in children {
            if let Some(child) = self.slot_mut(child) {
                child.parent = None;
            }
        }
        self.nodes[node.0 as usize] = None;
        self.free.push(*node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_build_and_snapshot() {
        let mut host = MemoryHost::new();
        let root = host.create_container("root");
        let div = host.create_node("div").unwrap();
        let text = host.create_text_node("hi").unwrap();
        host.set_property(&div, "id", &Value::from("a")).unwrap();
        host.append_child(&div, &text).unwrap();
        host.append_child(&root, &div).unwrap();

        assert_eq!(host.children(root), &[div]);
        assert_eq!(host.parent(text), Some(div));
        assert_eq!(host.text_content(root), "hi");
        assert_eq!(host.snapshot(div).to_string(), "<div id=\"a\">hi</div>");
    }

    #[test]
    fn test_insert_before_and_replace() {
        let mut host = MemoryHost::new();
        let root = host.create_container("root");
        let a = host.create_node("a").unwrap();
        let b = host.create_node("b").unwrap();
        let c = host.create_node("c").unwrap();
        host.append_child(&root, &a).unwrap();
        host.append_child(&root, &c).unwrap();
        host.insert_before(&root, &b, &c).unwrap();
        assert_eq!(host.children(root), &[a, b, c]);

        let d = host.create_node("d").unwrap();
        host.replace_child(&root, &b, &d).unwrap();
        assert_eq!(host.children(root), &[a, d, c]);
        assert_eq!(host.parent(b), None);
    }

    #[test]
    fn test_errors() {
        let mut host = MemoryHost::new();
        let root = host.create_container("root");
        let a = host.create_node("a").unwrap();
        let text = host.create_text_node("t").unwrap();

        assert!(matches!(
            host.remove_child(&root, &a),
            Err(HostError::NotAChild { .. })
        ));
        assert!(matches!(
            host.append_child(&NodeId(99), &a),
            Err(HostError::MissingNode(_))
        ));
        assert!(matches!(
            host.append_child(&text, &a),
            Err(HostError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_dispatch_and_remove_listener() {
        let mut host = MemoryHost::new();
        let button = host.create_node("button").unwrap();
        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();
        let listener: Listener = Rc::new(move |_| hits_clone.set(hits_clone.get() + 1));

        host.add_listener(&button, "click", &listener).unwrap();
        assert_eq!(host.dispatch(button, &Event::new("click")), 1);
        assert_eq!(host.dispatch(button, &Event::new("input")), 0);
        assert_eq!(hits.get(), 1);

        host.remove_listener(&button, "click", &listener).unwrap();
        assert_eq!(host.dispatch(button, &Event::new("click")), 0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_find_by_tag_document_order() {
        let mut host = MemoryHost::new();
        let root = host.create_container("root");
        let ul = host.create_node("ul").unwrap();
        let li1 = host.create_node("li").unwrap();
        let li2 = host.create_node("li").unwrap();
        host.append_child(&ul, &li1).unwrap();
        host.append_child(&ul, &li2).unwrap();
        host.append_child(&root, &ul).unwrap();

        assert_eq!(host.find_by_tag(root, "li"), vec![li1, li2]);
    }

    #[test]
    fn test_release_recycles_slots() {
        let mut host = MemoryHost::new();
        let root = host.create_container("root");
        let ul = host.create_node("ul").unwrap();
        let li = host.create_node("li").unwrap();
        host.append_child(&ul, &li).unwrap();
        host.append_child(&root, &ul).unwrap();
        assert_eq!(host.node_count(), 3);

        host.remove_child(&root, &ul).unwrap();
        host.release_node(&ul).unwrap();
        host.release_node(&li).unwrap();
        host.release_node(&li).unwrap();
        assert_eq!(host.node_count(), 1);
        assert_eq!(host.tag(ul), None);
        assert!(host.children(ul).is_empty());

        let p = host.create_node("p").unwrap();
        let span = host.create_node("span").unwrap();
        assert!(p == li || p == ul);
        assert!(span == li || span == ul);
        assert_eq!(host.capacity(), 3);
        assert_eq!(host.tag(p), Some("p"));
        assert_eq!(host.parent(p), None);
        assert!(host.children(span).is_empty());
    }
}
