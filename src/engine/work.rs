//! Work Phase - Builds the work-in-progress tree one fiber at a time.
//!
//! Traversal is depth-first, child first. After a fiber has no child left to
//! visit, "complete work" runs for it and for every ancestor that has no
//! unvisited sibling, folding effect lists upward:
//!
//! ```text
//! parent.effects += child.effects ++ [child if tagged]
//! ```
//!
//! The only host calls made here create detached nodes. Nothing is attached
//! before commit, so a pass can yield between any two fibers.

use std::rc::Rc;

use crate::element::ElementType;
use crate::error::{Error, Result};
use crate::host::{HostAdapter, update_host_props};
use crate::types::{Props, TEXT_VALUE_KEY, merge_state};

use super::commit::CommitReport;
use super::component::{Instance, InstanceId, MountPhase, Updater};
use super::fiber::{EffectTag, Fiber, FiberId, FiberTag, StateNode};
use super::queue::{RootId, Update};
use super::renderer::{Pass, Phase, Renderer};
use super::scheduler::Deadline;

impl<H: HostAdapter> Renderer<H> {
    // =========================================================================
    // Work loop
    // =========================================================================

    pub(super) fn work_loop(&mut self, deadline: &dyn Deadline) -> Result<Option<CommitReport>> {
        if self.pass.is_none() && !self.reset_next_unit_of_work() {
            self.phase = Phase::Idle;
            return Ok(None);
        }
        self.phase = Phase::Working;
        if let Some(pass) = self.pass.as_mut() {
            pass.slices += 1;
        }

        let floor = self.config.min_time_remaining;
        while let Some(unit) = self.pass.and_then(|pass| pass.next_unit) {
            if deadline.time_remaining() <= floor {
                log::trace!("slice exhausted, yielding before {}", self.fibers[unit].name());
                break;
            }
            let next = self.perform_unit_of_work(unit)?;
            if let Some(pass) = self.pass.as_mut() {
                pass.next_unit = next;
                pass.units += 1;
            }
        }

        match self.pass {
            Some(pass) if pass.completed => self.commit_all_work(pass).map(Some),
            _ => Ok(None),
        }
    }

    /// Start a new pass from the oldest queued update.
    ///
    /// Returns false when the queue held nothing usable.
    fn reset_next_unit_of_work(&mut self) -> bool {
        while let Some(update) = self.queue.pop() {
            let Some((root, props)) = self.resolve_update(update) else {
                continue;
            };
            let Some(entry) = self.roots.get(root.0) else {
                log::warn!("update for unknown {root} dropped");
                continue;
            };

            let mut wip = Fiber::new(FiberTag::Root, None, props);
            wip.state_node = StateNode::Host(entry.container.clone());
            wip.alternate = entry.current;
            let wip_root = self.fibers.insert(wip);

            log::debug!("pass started on {root}");
            self.pass = Some(Pass {
                root,
                wip_root,
                next_unit: Some(wip_root),
                completed: false,
                units: 0,
                slices: 0,
            });
            return true;
        }
        false
    }

    /// Root and root props for an update. State merges are written onto the
    /// target fiber's pending partial state here.
    fn resolve_update(&mut self, update: Update) -> Option<(RootId, Rc<Props>)> {
        match update {
            Update::Root { root, children } => Some((root, Rc::new(Props::with_children(children)))),
            Update::State { instance, partial } => {
                let Some(fiber_id) = self.instances.get(instance).and_then(|inst| inst.fiber) else {
                    log::debug!("state merge for unmounted instance {instance:?} dropped");
                    return None;
                };
                let Some(fiber) = self.fibers.get_mut(fiber_id) else {
                    log::debug!("state merge for instance {instance:?} without a fiber dropped");
                    return None;
                };
                match fiber.partial_state.as_mut() {
                    Some(pending) => merge_state(pending, &partial),
                    None => fiber.partial_state = Some(partial),
                }

                let top = self.top_of(fiber_id);
                let root = self
                    .roots
                    .iter()
                    .position(|entry| entry.current == Some(top))
                    .map(RootId);
                let Some(root) = root else {
                    log::warn!("state merge for detached instance {instance:?} dropped");
                    if let Some(fiber) = self.fibers.get_mut(fiber_id) {
                        fiber.partial_state = None;
                    }
                    return None;
                };
                Some((root, self.fibers[top].props.clone()))
            }
        }
    }

    fn top_of(&self, mut id: FiberId) -> FiberId {
        while let Some(parent) = self.fibers.get(id).and_then(|f| f.parent) {
            id = parent;
        }
        id
    }

    fn perform_unit_of_work(&mut self, id: FiberId) -> Result<Option<FiberId>> {
        self.begin_work(id)?;
        if let Some(child) = self.fibers[id].child {
            return Ok(Some(child));
        }

        let mut unit = Some(id);
        while let Some(current) = unit {
            self.complete_work(current);
            if let Some(sibling) = self.fibers[current].sibling {
                return Ok(Some(sibling));
            }
            unit = self.fibers[current].parent;
        }
        Ok(None)
    }

    // =========================================================================
    // Begin work
    // =========================================================================

    fn begin_work(&mut self, id: FiberId) -> Result<()> {
        let fiber = &self.fibers[id];
        log::trace!("begin {:?} {}", fiber.tag, fiber.name());
        match fiber.tag {
            FiberTag::Root => {
                let children = fiber.props.children().to_vec();
                self.reconcile_children(id, children);
                Ok(())
            }
            FiberTag::Host => self.update_host_component(id),
            FiberTag::Component => self.update_class_component(id),
            FiberTag::Function => self.update_function_component(id),
        }
    }

    fn update_host_component(&mut self, id: FiberId) -> Result<()> {
        if self.fibers[id].host_node().is_none() {
            let node = self.create_host_node(id)?;
            self.fibers[id].state_node = StateNode::Host(node);
        }
        let children = self.fibers[id].props.children().to_vec();
        self.reconcile_children(id, children);
        Ok(())
    }

    /// Create a detached host node with its initial configuration applied.
    fn create_host_node(&mut self, id: FiberId) -> Result<H::Node> {
        let fiber = &self.fibers[id];
        match &fiber.ty {
            Some(ElementType::Text) => {
                let Some(value) = fiber.props.str(TEXT_VALUE_KEY) else {
                    return Err(Error::MalformedElement(format!(
                        "text element without a string `{TEXT_VALUE_KEY}`"
                    )));
                };
                Ok(self.host.create_text_node(value)?)
            }
            Some(ElementType::Host(tag)) if tag.is_empty() => Err(Error::MalformedElement(
                "host element with an empty tag".to_string(),
            )),
            Some(ElementType::Host(tag)) => {
                let node = self.host.create_node(tag)?;
                update_host_props(&mut self.host, &node, &Props::new(), &fiber.props)?;
                Ok(node)
            }
            _ => Err(Error::MalformedElement(format!(
                "{} is not a host element",
                fiber.name()
            ))),
        }
    }

    fn update_class_component(&mut self, id: FiberId) -> Result<()> {
        let fiber = &self.fibers[id];
        let existing = fiber
            .instance()
            .filter(|instance| self.instances.contains_key(*instance));

        let instance = match existing {
            Some(instance) => {
                let unchanged = Rc::ptr_eq(&fiber.props, &self.instances[instance].props)
                    && fiber.partial_state.is_none();
                if unchanged {
                    log::trace!("{} unchanged, reusing children", fiber.name());
                    self.clone_child_fibers(id);
                    return Ok(());
                }
                instance
            }
            None => self.create_instance(id)?,
        };

        let fiber = &mut self.fibers[id];
        let partial = fiber.partial_state.take();
        let props = fiber.props.clone();

        let record = &mut self.instances[instance];
        record.snapshot();
        record.props = props;
        if let Some(partial) = partial {
            merge_state(&mut record.state, &partial);
        }

        let name = record.name;
        let children = record
            .call(|component, cx| component.render(cx))
            .map_err(|source| Error::Render {
                component: name.to_string(),
                source,
            })?;
        self.reconcile_children(id, children);
        Ok(())
    }

    fn create_instance(&mut self, id: FiberId) -> Result<InstanceId> {
        let fiber = &self.fibers[id];
        let Some(ElementType::Component(ty)) = &fiber.ty else {
            return Err(Error::MalformedElement(format!(
                "{} is not a component",
                fiber.name()
            )));
        };
        let ty = *ty;
        let props = fiber.props.clone();
        let component = ty.construct(&props);
        let state = component.initial_state();
        let queue = self.queue.clone();

        let instance = self.instances.insert_with_key(|key| Instance {
            component,
            name: ty.name(),
            props,
            state,
            updater: Updater::new(queue, key),
            fiber: None,
            mount: MountPhase::Pending,
            rollback: None,
        });
        log::trace!("constructed {} as {instance:?}", ty.name());
        self.fibers[id].state_node = StateNode::Instance(instance);
        self.pass_instances.push(instance);
        Ok(instance)
    }

    fn update_function_component(&mut self, id: FiberId) -> Result<()> {
        let fiber = &self.fibers[id];
        let Some(ElementType::Function(function)) = &fiber.ty else {
            return Err(Error::MalformedElement(format!(
                "{} is not a function component",
                fiber.name()
            )));
        };
        let function = *function;

        let unchanged = fiber
            .alternate
            .and_then(|alternate| self.fibers.get(alternate))
            .is_some_and(|previous| Rc::ptr_eq(&previous.props, &fiber.props));
        if unchanged {
            log::trace!("{} unchanged, reusing children", function.name());
            self.clone_child_fibers(id);
            return Ok(());
        }

        let props = fiber.props.clone();
        let children = function.call(&props).map_err(|source| Error::Render {
            component: function.name().to_string(),
            source,
        })?;
        self.reconcile_children(id, children);
        Ok(())
    }

    // =========================================================================
    // Complete work
    // =========================================================================

    fn complete_work(&mut self, id: FiberId) {
        let fiber = &mut self.fibers[id];
        let Some(parent) = fiber.parent else {
            if let Some(pass) = self.pass.as_mut() {
                pass.completed = true;
            }
            return;
        };

        let mut effects = std::mem::take(&mut fiber.effects);
        if fiber.effect.is_some() {
            effects.push(id);
        }
        self.fibers[parent].effects.extend(effects);
    }

    // =========================================================================
    // Discard
    // =========================================================================

    /// Throw away the in-flight pass and undo everything it did to engine state.
    pub(super) fn discard_work_in_progress(&mut self) {
        let failed_commit = self.phase == Phase::Committing;
        self.phase = Phase::Idle;
        let Some(pass) = self.pass.take() else {
            return;
        };
        if failed_commit {
            self.reset_root(pass);
        } else {
            let created: Vec<FiberId> = self
                .fibers
                .walk(pass.wip_root)
                .into_iter()
                .filter(|id| self.fibers[*id].effect == Some(EffectTag::Insert))
                .collect();
            for node in self.subtree_host_nodes(&created) {
                if let Err(err) = self.host.release_node(&node) {
                    log::debug!("could not release {node:?}: {err}");
                }
            }
        }

        for instance in self.pass_instances.drain(..) {
            self.instances.remove(instance);
        }
        let freed = self.fibers.remove_subtree(pass.wip_root);
        log::debug!("discarded pass on {} ({freed} fibers)", pass.root);

        if let Some(current) = self.roots.get(pass.root.0).and_then(|entry| entry.current) {
            for id in self.fibers.walk(current) {
                let fiber = &mut self.fibers[id];
                fiber.effect = None;
                fiber.effects.clear();
                fiber.partial_state = None;
            }
        }
        for (_, instance) in self.instances.iter_mut() {
            instance.restore();
        }
    }
}
