//! Fiber Tree - Arena of unit-of-work records.
//!
//! Fibers reference each other by [`FiberId`] instead of pointers:
//!
//! ```text
//! parent ──child──▶ first ──sibling──▶ second ──sibling──▶ third
//!   ▲                 │                  │                  │
//!   └─────parent──────┴──────────────────┴──────────────────┘
//! ```
//!
//! Each fiber in the work-in-progress tree points at its previous version
//! through `alternate`. Removing a tree walks child and sibling links only, so
//! back references never keep anything alive.

use std::ops::{Index, IndexMut};
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};

use crate::element::ElementType;
use crate::types::{Props, State};

use super::component::InstanceId;

new_key_type! {
    /// Handle to a fiber in a [`FiberTree`].
    pub struct FiberId;
}

// =============================================================================
// Tags
// =============================================================================

/// What kind of node a fiber stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiberTag {
    /// Top of a tree; its host node is the container.
    Root,
    /// Host element or text node.
    Host,
    /// Stateful component.
    Component,
    /// Function component.
    Function,
}

impl FiberTag {
    /// Tag for a fiber created from a description of type `ty`.
    pub fn for_type(ty: &ElementType) -> Self {
        match ty {
            ElementType::Host(_) | ElementType::Text => FiberTag::Host,
            ElementType::Component(_) => FiberTag::Component,
            ElementType::Function(_) => FiberTag::Function,
        }
    }

    /// True for fibers that own a host node.
    pub fn has_host_node(self) -> bool {
        matches!(self, FiberTag::Root | FiberTag::Host)
    }
}

/// Host mutation recorded on a fiber during a work pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectTag {
    Insert,
    Update,
    Delete,
}

/// What a fiber materializes to.
#[derive(Debug, Clone, PartialEq)]
pub enum StateNode<N> {
    /// Nothing yet (fresh host fiber) or nothing ever (function component).
    None,
    /// A host node handle.
    Host(N),
    /// A component instance.
    Instance(InstanceId),
}

// =============================================================================
// Fiber
// =============================================================================

/// One unit of work.
#[derive(Debug, Clone)]
pub struct Fiber<N> {
    pub tag: FiberTag,
    /// Description type, None for roots.
    pub ty: Option<ElementType>,
    pub props: Rc<Props>,
    /// State merges waiting to be applied to this fiber's instance.
    pub partial_state: Option<State>,
    pub state_node: StateNode<N>,

    pub parent: Option<FiberId>,
    pub child: Option<FiberId>,
    pub sibling: Option<FiberId>,
    /// The same node in the previously committed tree.
    pub alternate: Option<FiberId>,

    pub effect: Option<EffectTag>,
    /// Effects of this subtree, in commit order.
    pub effects: Vec<FiberId>,
}

impl<N> Fiber<N> {
    /// Fresh fiber with no links and no effect.
    pub fn new(tag: FiberTag, ty: Option<ElementType>, props: Rc<Props>) -> Self {
        Self {
            tag,
            ty,
            props,
            partial_state: None,
            state_node: StateNode::None,
            parent: None,
            child: None,
            sibling: None,
            alternate: None,
            effect: None,
            effects: Vec::new(),
        }
    }

    /// Display name: tag, `#text`, component name, or `#root`.
    pub fn name(&self) -> &str {
        self.ty.as_ref().map_or("#root", ElementType::name)
    }

    /// Host node handle, if this fiber owns one.
    pub fn host_node(&self) -> Option<&N> {
        match &self.state_node {
            StateNode::Host(node) => Some(node),
            _ => None,
        }
    }

    /// Component instance, if any.
    pub fn instance(&self) -> Option<InstanceId> {
        match self.state_node {
            StateNode::Instance(id) => Some(id),
            _ => None,
        }
    }

    /// Tag this fiber with an effect. A fiber is tagged at most once per pass.
    pub fn set_effect(&mut self, effect: EffectTag) {
        debug_assert!(
            self.effect.is_none(),
            "fiber {} tagged {:?} after {:?}",
            self.name(),
            effect,
            self.effect
        );
        self.effect = Some(effect);
    }
}

// =============================================================================
// FiberTree
// =============================================================================

/// Arena holding every fiber of every tree of one renderer.
#[derive(Debug)]
pub struct FiberTree<N> {
    fibers: SlotMap<FiberId, Fiber<N>>,
}

impl<N> Default for FiberTree<N> {
    fn default() -> Self {
        Self {
            fibers: SlotMap::with_key(),
        }
    }
}

impl<N> FiberTree<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fiber: Fiber<N>) -> FiberId {
        self.fibers.insert(fiber)
    }

    pub fn get(&self, id: FiberId) -> Option<&Fiber<N>> {
        self.fibers.get(id)
    }

    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber<N>> {
        self.fibers.get_mut(id)
    }

    pub fn contains(&self, id: FiberId) -> bool {
        self.fibers.contains_key(id)
    }

    /// Number of live fibers across all trees.
    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fibers.is_empty()
    }

    /// Children of `id`, in order.
    pub fn children(&self, id: FiberId) -> Vec<FiberId> {
        let mut out = Vec::new();
        let mut next = self.get(id).and_then(|f| f.child);
        while let Some(child) = next {
            out.push(child);
            next = self.get(child).and_then(|f| f.sibling);
        }
        out
    }

    /// `root` and all its descendants, pre-order. Follows child links only.
    pub fn walk(&self, root: FiberId) -> Vec<FiberId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !self.contains(id) {
                continue;
            }
            out.push(id);
            let mut children = self.children(id);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// First ancestor of `id` (excluding `id`) that owns a host node.
    pub fn host_parent(&self, id: FiberId) -> Option<FiberId> {
        let mut next = self.get(id)?.parent;
        while let Some(parent) = next {
            let fiber = self.get(parent)?;
            if fiber.tag.has_host_node() {
                return Some(parent);
            }
            next = fiber.parent;
        }
        None
    }

    /// Remove `root` and all its descendants. Returns how many fibers were freed.
    pub fn remove_subtree(&mut self, root: FiberId) -> usize {
        let ids = self.walk(root);
        for id in &ids {
            self.fibers.remove(*id);
        }
        ids.len()
    }
}

impl<N> Index<FiberId> for FiberTree<N> {
    type Output = Fiber<N>;

    fn index(&self, id: FiberId) -> &Fiber<N> {
        &self.fibers[id]
    }
}

impl<N> IndexMut<FiberId> for FiberTree<N> {
    fn index_mut(&mut self, id: FiberId) -> &mut Fiber<N> {
        &mut self.fibers[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(tree: &mut FiberTree<u32>, tag: &str, parent: Option<FiberId>) -> FiberId {
        let mut fiber = Fiber::new(
            FiberTag::Host,
            Some(ElementType::Host(tag.into())),
            Rc::new(Props::new()),
        );
        fiber.parent = parent;
        let id = tree.insert(fiber);
        if let Some(parent) = parent {
            match tree.children(parent).last() {
                Some(last) => tree[*last].sibling = Some(id),
                None => tree[parent].child = Some(id),
            }
        }
        id
    }

    #[test]
    fn test_walk_is_pre_order() {
        let mut tree = FiberTree::new();
        let root = tree.insert(Fiber::new(FiberTag::Root, None, Rc::new(Props::new())));
        let a = host(&mut tree, "a", Some(root));
        let a1 = host(&mut tree, "a1", Some(a));
        let b = host(&mut tree, "b", Some(root));

        assert_eq!(tree.children(root), vec![a, b]);
        assert_eq!(tree.walk(root), vec![root, a, a1, b]);
        assert_eq!(tree[root].name(), "#root");
        assert_eq!(tree[a1].name(), "a1");
    }

    #[test]
    fn test_host_parent_skips_components() {
        let mut tree = FiberTree::new();
        let root = tree.insert(Fiber::new(FiberTag::Root, None, Rc::new(Props::new())));
        let mut comp = Fiber::new(FiberTag::Function, None, Rc::new(Props::new()));
        comp.parent = Some(root);
        let comp = tree.insert(comp);
        tree[root].child = Some(comp);
        let leaf = host(&mut tree, "span", Some(comp));

        assert_eq!(tree.host_parent(leaf), Some(root));
        assert_eq!(tree.host_parent(root), None);
    }

    #[test]
    fn test_remove_subtree_frees_everything_below() {
        let mut tree = FiberTree::new();
        let root = tree.insert(Fiber::new(FiberTag::Root, None, Rc::new(Props::new())));
        let a = host(&mut tree, "a", Some(root));
        host(&mut tree, "a1", Some(a));
        let other = tree.insert(Fiber::new(FiberTag::Root, None, Rc::new(Props::new())));

        assert_eq!(tree.remove_subtree(root), 3);
        assert_eq!(tree.len(), 1);
        assert!(tree.contains(other));
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn test_effect_set_twice_panics_in_debug() {
        let mut fiber: Fiber<u32> = Fiber::new(FiberTag::Host, None, Rc::new(Props::new()));
        fiber.set_effect(EffectTag::Update);
        fiber.set_effect(EffectTag::Delete);
    }
}
