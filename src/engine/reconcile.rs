//! Child Reconciler - Positional diff of a fiber's children.
//!
//! Old children (from the alternate) and new descriptions are walked in
//! lockstep. Position `i` of one list is only ever compared with position `i`
//! of the other:
//!
//! ```text
//! old:  A    B    C
//! new:  A'   D
//!       │    │    │
//!   Update  Delete B   Delete C
//!           Insert D
//! ```
//!
//! Deletions go onto the parent's effect list right away, so within one
//! parent every delete precedes the effects of the new children.
//! Shifting items causes churn from the shift point on; there is no keyed
//! matching.

use crate::element::Element;
use crate::host::HostAdapter;

use super::fiber::{EffectTag, Fiber, FiberId, FiberTag};
use super::renderer::Renderer;

impl<H: HostAdapter> Renderer<H> {
    pub(super) fn reconcile_children(&mut self, parent: FiberId, elements: Vec<Element>) {
        let mut old = self.fibers[parent]
            .alternate
            .and_then(|alternate| self.fibers.get(alternate))
            .and_then(|alternate| alternate.child);
        let mut previous: Option<FiberId> = None;
        let mut elements = elements.into_iter();

        loop {
            let element = elements.next();
            if element.is_none() && old.is_none() {
                break;
            }

            let same_type = match (old, &element) {
                (Some(old), Some(element)) => self.fibers[old].ty.as_ref() == Some(element.ty()),
                _ => false,
            };

            let fiber = match (&element, old) {
                (Some(element), Some(old)) if same_type => Some(self.update_fiber(parent, old, element)),
                (Some(element), _) => Some(self.insert_fiber(parent, element)),
                (None, _) => None,
            };

            if let Some(old_id) = old {
                if !same_type {
                    log::trace!("delete {}", self.fibers[old_id].name());
                    self.fibers[old_id].set_effect(EffectTag::Delete);
                    self.fibers[parent].effects.push(old_id);
                }
                old = self.fibers[old_id].sibling;
            }

            if let Some(fiber) = fiber {
                self.link_child(parent, previous, fiber);
                previous = Some(fiber);
            }
        }
    }

    /// New version of `old` described by `element`: same handle, new props.
    fn update_fiber(&mut self, parent: FiberId, old: FiberId, element: &Element) -> FiberId {
        let previous = &self.fibers[old];
        let mut fiber = Fiber::new(previous.tag, previous.ty.clone(), element.shared_props().clone());
        fiber.state_node = previous.state_node.clone();
        fiber.partial_state = previous.partial_state.clone();
        fiber.alternate = Some(old);
        fiber.parent = Some(parent);
        fiber.effect = Some(EffectTag::Update);
        log::trace!("update {}", fiber.name());
        self.fibers.insert(fiber)
    }

    /// Fresh fiber for `element`, to be inserted.
    fn insert_fiber(&mut self, parent: FiberId, element: &Element) -> FiberId {
        let mut fiber = Fiber::new(
            FiberTag::for_type(element.ty()),
            Some(element.ty().clone()),
            element.shared_props().clone(),
        );
        fiber.parent = Some(parent);
        fiber.effect = Some(EffectTag::Insert);
        log::trace!("insert {}", fiber.name());
        self.fibers.insert(fiber)
    }

    /// Copy the previous children of `parent` unchanged: same handles, same
    /// props, no effect.
    pub(super) fn clone_child_fibers(&mut self, parent: FiberId) {
        let Some(alternate) = self.fibers[parent].alternate else {
            return;
        };

        let mut previous = None;
        for old in self.fibers.children(alternate) {
            let source = &self.fibers[old];
            let mut fiber = Fiber::new(source.tag, source.ty.clone(), source.props.clone());
            fiber.state_node = source.state_node.clone();
            fiber.partial_state = source.partial_state.clone();
            fiber.alternate = Some(old);
            fiber.parent = Some(parent);

            let id = self.fibers.insert(fiber);
            self.link_child(parent, previous, id);
            previous = Some(id);
        }
    }

    fn link_child(&mut self, parent: FiberId, previous: Option<FiberId>, child: FiberId) {
        match previous {
            Some(previous) => self.fibers[previous].sibling = Some(child),
            None => self.fibers[parent].child = Some(child),
        }
    }
}
