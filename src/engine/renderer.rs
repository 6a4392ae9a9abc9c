//! Renderer - The engine object an application embeds.
//!
//! Owns everything the engine mutates: the host adapter, the fiber arena,
//! component instances, the update queue and the work-loop cursor.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use spark_fiber::prelude::*;
//!
//! let scheduler = Rc::new(ManualScheduler::new());
//! let mut host = MemoryHost::new();
//! let container = host.create_container("app");
//! let mut renderer = Renderer::new(host, scheduler.clone());
//!
//! renderer.render(h("div").child("hi"), &container);
//! while scheduler.take_request() {
//!     renderer.perform_work(&IdleDeadline::new(Duration::from_millis(16)))?;
//! }
//! ```
//!
//! # Phases
//!
//! ```text
//! Idle ──update queued──▶ Working ──pass reached root──▶ Committing ──▶ Idle
//!                           │  ▲
//!                           └──┘ deadline hit: yield, resume from cursor
//! ```

use std::rc::Rc;

use slotmap::SlotMap;

use crate::config::RendererConfig;
use crate::element::Element;
use crate::error::Result;
use crate::host::HostAdapter;

use super::commit::CommitReport;
use super::component::{Instance, InstanceId};
use super::fiber::{FiberId, FiberTree};
use super::queue::{RootId, Update, UpdateQueue};
use super::scheduler::{Deadline, IdleScheduler, Unbounded};

/// Where the renderer is in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Working,
    Committing,
}

/// A container the renderer draws into, and its committed tree.
pub(super) struct RootEntry<N> {
    pub container: N,
    pub current: Option<FiberId>,
}

/// Cursor state of the in-flight work pass.
#[derive(Debug, Clone, Copy)]
pub(super) struct Pass {
    pub root: RootId,
    pub wip_root: FiberId,
    pub next_unit: Option<FiberId>,
    /// The traversal reached the root; the effect list is final.
    pub completed: bool,
    pub units: usize,
    pub slices: usize,
}

/// Incremental renderer over a host adapter.
pub struct Renderer<H: HostAdapter> {
    pub(super) host: H,
    pub(super) config: RendererConfig,
    pub(super) queue: UpdateQueue,
    pub(super) fibers: FiberTree<H::Node>,
    pub(super) instances: SlotMap<InstanceId, Instance>,
    /// One entry per container ever rendered into.
    pub(super) roots: Vec<RootEntry<H::Node>>,
    pub(super) phase: Phase,
    pub(super) pass: Option<Pass>,
    /// Instances constructed by the in-flight pass.
    pub(super) pass_instances: Vec<InstanceId>,
    pub(super) last_commit: Option<CommitReport>,
}

impl<H: HostAdapter> Renderer<H> {
    /// Renderer with the default configuration.
    pub fn new(host: H, scheduler: Rc<dyn IdleScheduler>) -> Self {
        Self::with_config(host, scheduler, RendererConfig::default())
    }

    pub fn with_config(host: H, scheduler: Rc<dyn IdleScheduler>, config: RendererConfig) -> Self {
        Self {
            host,
            config,
            queue: UpdateQueue::new(scheduler),
            fibers: FiberTree::new(),
            instances: SlotMap::with_key(),
            roots: Vec::new(),
            phase: Phase::Idle,
            pass: None,
            pass_instances: Vec::new(),
            last_commit: None,
        }
    }

    // =========================================================================
    // Enqueueing
    // =========================================================================

    /// Schedule rendering `element` as the only child of `container`.
    pub fn render(&mut self, element: impl Into<Element>, container: &H::Node) -> RootId {
        self.render_children(vec![element.into()], container)
    }

    /// Schedule rendering `children` into `container`.
    ///
    /// Nothing happens until the next [`perform_work`](Self::perform_work).
    pub fn render_children(&mut self, children: Vec<Element>, container: &H::Node) -> RootId {
        let root = self.root_for(container);
        self.queue.enqueue(Update::Root { root, children });
        root
    }

    /// Schedule removing everything rendered into `container`.
    ///
    /// Returns None when nothing was ever rendered there.
    pub fn unmount(&mut self, container: &H::Node) -> Option<RootId> {
        let root = self.find_root(container)?;
        self.queue.enqueue(Update::Root {
            root,
            children: Vec::new(),
        });
        Some(root)
    }

    fn find_root(&self, container: &H::Node) -> Option<RootId> {
        self.roots
            .iter()
            .position(|entry| &entry.container == container)
            .map(RootId)
    }

    fn root_for(&mut self, container: &H::Node) -> RootId {
        if let Some(root) = self.find_root(container) {
            return root;
        }
        self.roots.push(RootEntry {
            container: container.clone(),
            current: None,
        });
        let root = RootId(self.roots.len() - 1);
        log::debug!("registered {root} for container {container:?}");
        root
    }

    // =========================================================================
    // Scheduling callback
    // =========================================================================

    /// Run one scheduling slice.
    ///
    /// Advances the current pass while `deadline` leaves more than the
    /// configured floor, commits when the pass completes, and asks for
    /// another callback if anything is left to do.
    ///
    /// On error the in-flight pass is abandoned. A failure while working
    /// leaves the previously committed tree current. A failure while
    /// committing clears the root, since the host was partly mutated; render
    /// into the container again to rebuild it.
    pub fn perform_work(&mut self, deadline: &dyn Deadline) -> Result<Option<CommitReport>> {
        let result = self.work_loop(deadline);
        if let Err(err) = &result {
            log::warn!("work pass abandoned: {err}");
            self.discard_work_in_progress();
        }
        if self.pass.is_some() || !self.queue.is_empty() {
            self.queue.request_callback();
        }
        result
    }

    /// Run slices with no deadline until nothing is queued or in flight.
    pub fn run_until_idle(&mut self) -> Result<Vec<CommitReport>> {
        let mut reports = Vec::new();
        while !self.is_idle() {
            if let Some(report) = self.perform_work(&Unbounded)? {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// No pass in flight and nothing queued.
    pub fn is_idle(&self) -> bool {
        self.pass.is_none() && self.queue.is_empty()
    }

    /// A pass has started and not yet committed.
    pub fn has_pass_in_flight(&self) -> bool {
        self.pass.is_some()
    }

    pub fn pending_updates(&self) -> usize {
        self.queue.len()
    }

    /// Report of the most recent successful commit.
    pub fn last_commit(&self) -> Option<&CommitReport> {
        self.last_commit.as_ref()
    }

    /// Container registered under `root`.
    pub fn container(&self, root: RootId) -> Option<&H::Node> {
        self.roots.get(root.0).map(|entry| &entry.container)
    }

    /// Live fibers across all trees, work in progress included.
    pub fn fiber_count(&self) -> usize {
        self.fibers.len()
    }

    /// Live component instances.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::h;
    use crate::engine::scheduler::{ManualScheduler, StepDeadline};
    use crate::host::MemoryHost;

    fn setup() -> (Renderer<MemoryHost>, Rc<ManualScheduler>, crate::host::NodeId) {
        let scheduler = Rc::new(ManualScheduler::new());
        let mut host = MemoryHost::new();
        let container = host.create_container("root");
        (Renderer::new(host, scheduler.clone()), scheduler, container)
    }

    #[test]
    fn test_render_only_enqueues() {
        let (mut renderer, scheduler, container) = setup();
        renderer.render(h("div"), &container);

        assert_eq!(renderer.pending_updates(), 1);
        assert_eq!(scheduler.pending(), 1);
        assert!(renderer.host().ops().is_empty());
        assert_eq!(renderer.phase(), Phase::Idle);
    }

    #[test]
    fn test_same_container_same_root() {
        let (mut renderer, _, container) = setup();
        let a = renderer.render(h("div"), &container);
        let b = renderer.render(h("span"), &container);
        assert_eq!(a, b);
        assert_eq!(renderer.container(a), Some(&container));
    }

    #[test]
    fn test_empty_queue_is_idle_without_request() {
        let (mut renderer, scheduler, _) = setup();
        let report = renderer.perform_work(&Unbounded).unwrap();
        assert!(report.is_none());
        assert_eq!(scheduler.pending(), 0);
        assert!(renderer.is_idle());
    }

    #[test]
    fn test_yield_requests_another_callback() {
        let (mut renderer, scheduler, container) = setup();
        renderer.render(h("div").child(h("span")), &container);
        scheduler.take_all();

        assert!(renderer.perform_work(&StepDeadline::new(1)).unwrap().is_none());
        assert_eq!(renderer.phase(), Phase::Working);
        assert!(renderer.has_pass_in_flight());
        assert_eq!(scheduler.pending(), 1);

        let report = renderer.perform_work(&Unbounded).unwrap().unwrap();
        assert_eq!(report.slices, 2);
        assert_eq!(renderer.phase(), Phase::Idle);
        assert_eq!(scheduler.pending(), 1);
        assert!(renderer.is_idle());
    }

    #[test]
    fn test_unmount_unknown_container() {
        let (mut renderer, scheduler, _) = setup();
        let stray = renderer.host_mut().create_container("stray");
        assert!(renderer.unmount(&stray).is_none());
        assert_eq!(scheduler.pending(), 0);
    }
}
