//! Commit Executor - Applies a finished pass to the host, without yielding.
//!
//! Effects run in list order:
//!
//! ```text
//! Insert  host       will_mount on inserted ancestors, attach before the next placed host sibling
//! Insert  component  will_mount (if not yet), did_mount
//! Update  host       configuration diff
//! Delete  any        will_unmount, detach top-level host nodes, release every host node, drop instances
//! ```
//!
//! Children precede parents in the effect list, so `did_mount` fires
//! child-first. A host error aborts the remaining effects. The root is then
//! cleared, detaching what either tree placed, so the next render converges no
//! matter how far the commit got.

use crate::error::{Error, HostError, Result};
use crate::host::{HostAdapter, update_host_props};

use super::component::{InstanceId, MountPhase};
use super::fiber::{EffectTag, FiberId, FiberTag};
use super::queue::RootId;
use super::renderer::{Pass, Phase, Renderer};

// =============================================================================
// Commit Report
// =============================================================================

/// One applied effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectRecord {
    pub effect: EffectTag,
    pub tag: FiberTag,
    /// Tag, `#text`, or component name.
    pub name: String,
}

/// What a commit did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub root: RootId,
    /// Effects in the order they were applied.
    pub effects: Vec<EffectRecord>,
    /// Fibers visited by the pass.
    pub units_of_work: usize,
    /// Scheduling slices the pass took.
    pub slices: usize,
}

impl CommitReport {
    /// Number of effects of a kind.
    pub fn count(&self, effect: EffectTag) -> usize {
        self.effects.iter().filter(|record| record.effect == effect).count()
    }

    /// Names of the fibers that had `effect`, in order.
    pub fn names(&self, effect: EffectTag) -> Vec<&str> {
        self.effects
            .iter()
            .filter(|record| record.effect == effect)
            .map(|record| record.name.as_str())
            .collect()
    }
}

impl<H: HostAdapter> Renderer<H> {
    pub(super) fn commit_all_work(&mut self, pass: Pass) -> Result<CommitReport> {
        self.phase = Phase::Committing;
        let effects = std::mem::take(&mut self.fibers[pass.wip_root].effects);
        log::debug!("committing {} effects on {}", effects.len(), pass.root);

        let mut records = Vec::with_capacity(effects.len());
        for id in effects {
            let fiber = &self.fibers[id];
            let Some(effect) = fiber.effect else {
                continue;
            };
            records.push(EffectRecord {
                effect,
                tag: fiber.tag,
                name: fiber.name().to_string(),
            });
            self.commit_work(id, effect)?;
        }

        self.finish_commit(pass);
        let report = CommitReport {
            root: pass.root,
            effects: records,
            units_of_work: pass.units,
            slices: pass.slices,
        };
        self.last_commit = Some(report.clone());
        self.phase = Phase::Idle;
        Ok(report)
    }

    fn commit_work(&mut self, id: FiberId, effect: EffectTag) -> Result<()> {
        match (effect, self.fibers[id].tag) {
            (EffectTag::Insert, FiberTag::Host) => self.commit_insertion(id),
            (EffectTag::Insert, FiberTag::Component) => {
                if let Some(instance) = self.fibers[id].instance() {
                    self.will_mount(instance);
                    self.did_mount(instance);
                }
                Ok(())
            }
            (EffectTag::Update, FiberTag::Host) => self.commit_update(id),
            (EffectTag::Delete, _) => self.commit_deletion(id),
            _ => Ok(()),
        }
    }

    fn commit_insertion(&mut self, id: FiberId) -> Result<()> {
        self.will_mount_ancestors(id);

        let parent = self.host_parent_node(id)?;
        let Some(node) = self.fibers[id].host_node().cloned() else {
            return Err(HostError::MissingNode(format!("{} was never created", self.fibers[id].name())).into());
        };
        match self.host_sibling(id) {
            Some(before) => self.host.insert_before(&parent, &node, &before)?,
            None => self.host.append_child(&parent, &node)?,
        }
        Ok(())
    }

    fn commit_update(&mut self, id: FiberId) -> Result<()> {
        let fiber = &self.fibers[id];
        let (Some(node), Some(alternate)) = (fiber.host_node(), fiber.alternate) else {
            return Ok(());
        };
        let previous = &self.fibers[alternate].props;
        update_host_props(&mut self.host, node, previous, &fiber.props)?;
        Ok(())
    }

    fn commit_deletion(&mut self, id: FiberId) -> Result<()> {
        let subtree = self.fibers.walk(id);
        let instances: Vec<InstanceId> = subtree
            .iter()
            .filter(|fiber| self.fibers[**fiber].tag == FiberTag::Component)
            .filter_map(|fiber| self.fibers[*fiber].instance())
            .collect();

        for instance in &instances {
            if let Some(record) = self.instances.get_mut(*instance) {
                record.call(|component, cx| component.will_unmount(cx));
            }
        }

        let parent = self.host_parent_node(id)?;
        for node in self.top_host_nodes(id) {
            self.host.remove_child(&parent, &node)?;
        }
        for node in self.subtree_host_nodes(&subtree) {
            self.host.release_node(&node)?;
        }

        for instance in instances {
            self.instances.remove(instance);
        }
        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    fn will_mount(&mut self, instance: InstanceId) {
        let Some(record) = self.instances.get_mut(instance) else {
            return;
        };
        if record.mount == MountPhase::Pending {
            record.call(|component, cx| component.will_mount(cx));
            record.mount = MountPhase::WillMountFired;
        }
    }

    fn did_mount(&mut self, instance: InstanceId) {
        let Some(record) = self.instances.get_mut(instance) else {
            return;
        };
        if record.mount != MountPhase::Mounted {
            record.call(|component, cx| component.did_mount(cx));
            record.mount = MountPhase::Mounted;
        }
    }

    /// Fire `will_mount` for inserted components between `id` and its host
    /// parent, outermost first.
    fn will_mount_ancestors(&mut self, id: FiberId) {
        let mut pending = Vec::new();
        let mut next = self.fibers[id].parent;
        while let Some(parent) = next {
            let fiber = &self.fibers[parent];
            if fiber.tag.has_host_node() {
                break;
            }
            if fiber.tag == FiberTag::Component && fiber.effect == Some(EffectTag::Insert) {
                pending.extend(fiber.instance());
            }
            next = fiber.parent;
        }
        for instance in pending.into_iter().rev() {
            self.will_mount(instance);
        }
    }

    // =========================================================================
    // Host lookups
    // =========================================================================

    fn host_parent_node(&self, id: FiberId) -> Result<H::Node> {
        self.fibers
            .host_parent(id)
            .and_then(|parent| self.fibers[parent].host_node().cloned())
            .ok_or_else(|| {
                Error::Host(HostError::MissingNode(format!(
                    "host parent of {}",
                    self.fibers[id].name()
                )))
            })
    }

    /// Host nodes directly under a subtree root, looking through components.
    fn top_host_nodes(&self, id: FiberId) -> Vec<H::Node> {
        let mut nodes = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let fiber = &self.fibers[current];
            if fiber.tag == FiberTag::Host {
                nodes.extend(fiber.host_node().cloned());
                continue;
            }
            let mut children = self.fibers.children(current);
            children.reverse();
            stack.extend(children);
        }
        nodes
    }

    /// Every host node owned by the fibers in `subtree`.
    pub(super) fn subtree_host_nodes(&self, subtree: &[FiberId]) -> Vec<H::Node> {
        subtree
            .iter()
            .map(|id| &self.fibers[*id])
            .filter(|fiber| fiber.tag == FiberTag::Host)
            .filter_map(|fiber| fiber.host_node().cloned())
            .collect()
    }

    /// The already-placed host node that should follow `id` under its host
    /// parent, or None to append.
    fn host_sibling(&self, id: FiberId) -> Option<H::Node> {
        let mut node = id;
        'siblings: loop {
            loop {
                if let Some(sibling) = self.fibers[node].sibling {
                    node = sibling;
                    break;
                }
                let parent = self.fibers[node].parent?;
                if self.fibers[parent].tag.has_host_node() {
                    return None;
                }
                node = parent;
            }

            loop {
                let fiber = &self.fibers[node];
                if fiber.effect == Some(EffectTag::Insert) {
                    continue 'siblings;
                }
                if fiber.tag == FiberTag::Host {
                    return fiber.host_node().cloned();
                }
                match fiber.child {
                    Some(child) => node = child,
                    None => continue 'siblings,
                }
            }
        }
    }

    // =========================================================================
    // Failed commit
    // =========================================================================

    /// Clear a root whose commit failed partway.
    ///
    /// The host holds a mix of the old and new trees at this point, so
    /// neither fiber tree describes it. Every component of both trees is
    /// unmounted, every top-level host node either tree placed is detached
    /// from the container, and the committed tree is freed. The next render
    /// into the container starts from an empty tree.
    pub(super) fn reset_root(&mut self, pass: Pass) {
        let Some(entry) = self.roots.get_mut(pass.root.0) else {
            return;
        };
        let container = entry.container.clone();
        let current = entry.current.take();

        let mut instances: Vec<InstanceId> = Vec::new();
        let mut nodes: Vec<H::Node> = Vec::new();
        let mut owned: Vec<H::Node> = Vec::new();
        for tree in current.into_iter().chain([pass.wip_root]) {
            let subtree = self.fibers.walk(tree);
            for id in &subtree {
                if let Some(instance) = self.fibers[*id].instance() {
                    if !instances.contains(&instance) {
                        instances.push(instance);
                    }
                }
            }
            for node in self.top_host_nodes(tree) {
                if !nodes.contains(&node) {
                    nodes.push(node);
                }
            }
            for node in self.subtree_host_nodes(&subtree) {
                if !owned.contains(&node) {
                    owned.push(node);
                }
            }
        }

        for instance in &instances {
            if let Some(record) = self.instances.get_mut(*instance) {
                if record.mount != MountPhase::Pending {
                    record.call(|component, cx| component.will_unmount(cx));
                }
            }
        }
        for node in &nodes {
            if let Err(err) = self.host.remove_child(&container, node) {
                log::debug!("{node:?} not attached to the container: {err}");
            }
        }
        for node in &owned {
            if let Err(err) = self.host.release_node(node) {
                log::debug!("could not release {node:?}: {err}");
            }
        }
        for instance in instances {
            self.instances.remove(instance);
        }
        if let Some(current) = current {
            self.fibers.remove_subtree(current);
        }
        log::warn!("commit on {} failed, root cleared", pass.root);
    }

    // =========================================================================
    // Tree swap
    // =========================================================================

    fn finish_commit(&mut self, pass: Pass) {
        let Some(entry) = self.roots.get_mut(pass.root.0) else {
            return;
        };
        let old_root = entry.current.replace(pass.wip_root);

        for id in self.fibers.walk(pass.wip_root) {
            let fiber = &mut self.fibers[id];
            fiber.alternate = None;
            fiber.effect = None;
            fiber.effects.clear();
            if fiber.tag == FiberTag::Component {
                if let Some(record) = fiber.instance().and_then(|i| self.instances.get_mut(i)) {
                    record.fiber = Some(id);
                }
            }
        }
        for (_, record) in self.instances.iter_mut() {
            record.rollback = None;
        }

        if let Some(old_root) = old_root {
            let freed = self.fibers.remove_subtree(old_root);
            log::trace!("freed {freed} fibers of the previous tree");
        }
        self.pass = None;
        self.pass_instances.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::element::{Element, component, h};
    use crate::engine::component::{Component, Context};
    use crate::engine::scheduler::ManualScheduler;
    use crate::host::{HostOp, MemoryHost, NodeId};
    use crate::types::Props;

    thread_local! {
        static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    fn log(entry: String) {
        LOG.with(|log| log.borrow_mut().push(entry));
    }

    fn take_log() -> Vec<String> {
        LOG.with(|log| std::mem::take(&mut *log.borrow_mut()))
    }

    struct Outer;
    struct Inner;

    impl Component for Outer {
        fn create(_props: &Props) -> Self {
            Outer
        }

        fn render(&mut self, _cx: &Context<'_>) -> anyhow::Result<Vec<Element>> {
            Ok(vec![h("section").child(component::<Inner>()).build()])
        }

        fn will_mount(&mut self, _cx: &Context<'_>) {
            log("outer will_mount".into());
        }

        fn did_mount(&mut self, _cx: &Context<'_>) {
            log("outer did_mount".into());
        }

        fn will_unmount(&mut self, _cx: &Context<'_>) {
            log("outer will_unmount".into());
        }
    }

    impl Component for Inner {
        fn create(_props: &Props) -> Self {
            Inner
        }

        fn render(&mut self, _cx: &Context<'_>) -> anyhow::Result<Vec<Element>> {
            Ok(vec![h("p").child("inner").build()])
        }

        fn will_mount(&mut self, _cx: &Context<'_>) {
            log("inner will_mount".into());
        }

        fn did_mount(&mut self, _cx: &Context<'_>) {
            log("inner did_mount".into());
        }

        fn will_unmount(&mut self, _cx: &Context<'_>) {
            log("inner will_unmount".into());
        }
    }

    fn renderer() -> (Renderer<MemoryHost>, NodeId) {
        let mut host = MemoryHost::new();
        let container = host.create_container("root");
        (Renderer::new(host, Rc::new(ManualScheduler::new())), container)
    }

    #[test]
    fn test_lifecycle_order() {
        take_log();
        let (mut renderer, container) = renderer();
        renderer.render(component::<Outer>(), &container);
        renderer.run_until_idle().unwrap();

        assert_eq!(
            take_log(),
            vec!["inner will_mount", "inner did_mount", "outer will_mount", "outer did_mount"]
        );
        assert_eq!(renderer.host().text_content(container), "inner");
        assert_eq!(renderer.instance_count(), 2);

        renderer.unmount(&container);
        renderer.run_until_idle().unwrap();
        assert_eq!(take_log(), vec!["outer will_unmount", "inner will_unmount"]);
        assert!(renderer.host().children(container).is_empty());
        assert_eq!(renderer.instance_count(), 0);
    }

    #[test]
    fn test_insert_lands_at_position() {
        let (mut renderer, container) = renderer();
        let row = |tags: &[&str]| h("div").children(tags.iter().map(|tag| h(tag))).build();

        renderer.render(row(&["a", "b", "c"]), &container);
        renderer.run_until_idle().unwrap();
        renderer.render(row(&["a", "d", "c"]), &container);
        renderer.run_until_idle().unwrap();

        let host = renderer.host();
        let div = host.children(container)[0];
        let tags: Vec<&str> = host.children(div).iter().filter_map(|n| host.tag(*n)).collect();
        assert_eq!(tags, vec!["a", "d", "c"]);
        assert!(host.ops().iter().any(|op| matches!(op, HostOp::InsertBefore { .. })));
    }

    #[test]
    fn test_old_tree_is_freed() {
        let (mut renderer, container) = renderer();
        renderer.render(h("div").child("x"), &container);
        renderer.run_until_idle().unwrap();
        let after_first = renderer.fiber_count();

        renderer.render(h("div").child("y"), &container);
        renderer.run_until_idle().unwrap();
        assert_eq!(renderer.fiber_count(), after_first);
    }

    #[test]
    fn test_report() {
        let (mut renderer, container) = renderer();
        renderer.render(h("div").child("hi"), &container);
        let report = renderer.run_until_idle().unwrap().remove(0);

        assert_eq!(report.names(EffectTag::Insert), vec!["#text", "div"]);
        assert_eq!(report.units_of_work, 3);
        assert_eq!(report.slices, 1);
        assert_eq!(renderer.last_commit(), Some(&report));
    }
}
