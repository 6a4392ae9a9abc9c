//! Components - Stateful nodes with a render step and lifecycle hooks.
//!
//! # Example
//!
//! ```ignore
//! use spark_fiber::prelude::*;
//!
//! struct Counter;
//!
//! impl Component for Counter {
//!     fn create(_props: &Props) -> Self {
//!         Counter
//!     }
//!
//!     fn initial_state(&self) -> State {
//!         state(json!({ "count": 0 }))
//!     }
//!
//!     fn render(&mut self, cx: &Context<'_>) -> anyhow::Result<Vec<Element>> {
//!         let count = cx.state()["count"].as_i64().unwrap_or(0);
//!         let updater = cx.updater().clone();
//!         Ok(vec![h("button")
//!             .on("click", move |_| updater.set_state(json!({ "count": count + 1 })))
//!             .child(count)
//!             .build()])
//!     }
//! }
//! ```

use std::rc::Rc;

use slotmap::new_key_type;

use crate::element::Element;
use crate::types::{Props, State, Value};

use super::fiber::FiberId;
use super::queue::{Update, UpdateQueue};

new_key_type! {
    /// Handle to a mounted component instance.
    pub struct InstanceId;
}

// =============================================================================
// Component Trait
// =============================================================================

/// A stateful component.
///
/// One instance is constructed when the component is first inserted and
/// lives until it is deleted. `render` runs during the work phase, so it must
/// not touch the host; lifecycle hooks run during commit.
pub trait Component: 'static {
    /// Construct an instance from its initial props.
    fn create(props: &Props) -> Self
    where
        Self: Sized;

    /// State the instance starts with.
    fn initial_state(&self) -> State {
        State::new()
    }

    /// Produce child descriptions from the current props and state.
    fn render(&mut self, cx: &Context<'_>) -> anyhow::Result<Vec<Element>>;

    /// Before the component's first host node is attached.
    fn will_mount(&mut self, _cx: &Context<'_>) {}

    /// After the component and all its children are attached.
    fn did_mount(&mut self, _cx: &Context<'_>) {}

    /// Before the component's host nodes are detached.
    fn will_unmount(&mut self, _cx: &Context<'_>) {}
}

/// What a component sees while rendering or handling a lifecycle hook.
pub struct Context<'a> {
    props: &'a Props,
    state: &'a State,
    updater: &'a Updater,
}

impl<'a> Context<'a> {
    pub fn props(&self) -> &'a Props {
        self.props
    }

    pub fn state(&self) -> &'a State {
        self.state
    }

    /// Handle for scheduling state merges later (e.g. from a listener).
    pub fn updater(&self) -> &'a Updater {
        self.updater
    }

    /// Shorthand for `self.updater().set_state(partial)`.
    pub fn set_state(&self, partial: Value) {
        self.updater.set_state(partial);
    }
}

// =============================================================================
// Updater
// =============================================================================

/// Enqueues state merges for one component instance.
///
/// Cheap to clone; safe to keep after the instance is gone (stale merges are
/// dropped when their pass starts).
#[derive(Clone)]
pub struct Updater {
    queue: UpdateQueue,
    instance: InstanceId,
}

impl Updater {
    pub(crate) fn new(queue: UpdateQueue, instance: InstanceId) -> Self {
        Self { queue, instance }
    }

    /// The instance this updater targets.
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Enqueue a shallow merge of `partial` (a JSON object) into the state.
    pub fn set_state(&self, partial: Value) {
        match partial {
            Value::Object(partial) => self.queue.enqueue(Update::State {
                instance: self.instance,
                partial,
            }),
            other => log::warn!("set_state expects an object, got {other}; ignored"),
        }
    }
}

impl std::fmt::Debug for Updater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater").field("instance", &self.instance).finish()
    }
}

/// Build a [`State`] from a JSON object literal. Non-objects give empty state.
pub fn state(value: Value) -> State {
    match value {
        Value::Object(map) => map,
        _ => State::new(),
    }
}

// =============================================================================
// Instance
// =============================================================================

/// Where an instance is in its mount lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MountPhase {
    Pending,
    WillMountFired,
    Mounted,
}

/// Engine-side record of a component instance.
pub(crate) struct Instance {
    pub component: Box<dyn Component>,
    pub name: &'static str,
    pub props: Rc<Props>,
    pub state: State,
    pub updater: Updater,
    /// Fiber in the last committed tree.
    pub fiber: Option<FiberId>,
    pub mount: MountPhase,
    /// Props and state before the in-flight pass first touched them.
    pub rollback: Option<(Rc<Props>, State)>,
}

impl Instance {
    /// Run `f` with the component and a context borrowed from this record.
    pub fn call<R>(&mut self, f: impl FnOnce(&mut dyn Component, &Context<'_>) -> R) -> R {
        let cx = Context {
            props: &self.props,
            state: &self.state,
            updater: &self.updater,
        };
        f(self.component.as_mut(), &cx)
    }

    /// Remember props and state so an abandoned pass can restore them.
    pub fn snapshot(&mut self) {
        if self.rollback.is_none() {
            self.rollback = Some((self.props.clone(), self.state.clone()));
        }
    }

    /// Restore the snapshot taken by [`Instance::snapshot`], if any.
    pub fn restore(&mut self) {
        if let Some((props, state)) = self.rollback.take() {
            self.props = props;
            self.state = state;
        }
    }
}
