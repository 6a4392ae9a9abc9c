//! Update Queue - FIFO of pending renders and state merges.
//!
//! Shared between the renderer and every [`Updater`](super::component::Updater)
//! it hands out. Enqueueing never performs work; it only asks the idle
//! scheduler for a callback. No dedup, no coalescing, no priorities.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::element::Element;
use crate::types::State;

use super::component::InstanceId;
use super::scheduler::IdleScheduler;

/// Handle to a root container registered with a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootId(pub(crate) usize);

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root{}", self.0)
    }
}

/// One queued request.
#[derive(Debug, Clone)]
pub enum Update {
    /// Replace the children of a root container.
    Root { root: RootId, children: Vec<Element> },
    /// Merge `partial` into the state of a mounted component.
    State { instance: InstanceId, partial: State },
}

/// Shared FIFO of updates plus the scheduler to notify.
#[derive(Clone)]
pub struct UpdateQueue {
    updates: Rc<RefCell<VecDeque<Update>>>,
    scheduler: Rc<dyn IdleScheduler>,
}

impl UpdateQueue {
    pub fn new(scheduler: Rc<dyn IdleScheduler>) -> Self {
        Self {
            updates: Rc::new(RefCell::new(VecDeque::new())),
            scheduler,
        }
    }

    /// Append an update and request a callback.
    pub fn enqueue(&self, update: Update) {
        log::trace!("enqueue {update:?}");
        self.updates.borrow_mut().push_back(update);
        self.scheduler.request_callback();
    }

    /// Take the oldest update.
    pub fn pop(&self) -> Option<Update> {
        self.updates.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.updates.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.borrow().is_empty()
    }

    /// Ask for another callback without enqueueing.
    pub fn request_callback(&self) {
        self.scheduler.request_callback();
    }
}

impl fmt::Debug for UpdateQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateQueue").field("len", &self.len()).finish()
    }
}
