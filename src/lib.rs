//! # spark-fiber
//!
//! Incremental fiber reconciler for retained-mode UI trees.
//!
//! Application code describes what the UI should look like as a tree of
//! immutable [`Element`]s. The renderer computes the host mutations needed to
//! make a persistent host tree match, spread over cooperative time slices.
//!
//! ## Architecture
//!
//! ```text
//! Element tree → Update queue → work pass (fiber tree) → effect list → commit → HostAdapter
//! ```
//!
//! - The work pass is interruptible between any two fibers and never touches
//!   the visible host tree.
//! - The commit runs to completion and is the only place host nodes get
//!   attached, updated or detached.
//!
//! ## Modules
//!
//! - [`types`] - Props, listeners, state maps
//! - [`element`] - Node descriptions and the builder
//! - [`engine`] - Fiber tree, scheduler, reconciler, commit, components
//! - [`host`] - Host adapter trait, configuration diff, memory and terminal hosts
//! - [`config`] - Renderer tunables
//! - [`error`] - Error types

pub mod config;
pub mod element;
pub mod engine;
pub mod error;
pub mod host;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::RendererConfig;

pub use element::{
    Child, ComponentType, Element, ElementBuilder, ElementType, FunctionComponent, RenderFn,
    component, function, h, text,
};

pub use engine::{
    CommitReport, Component, Context, Deadline, EffectRecord, EffectTag, FiberTag, IdleDeadline,
    IdleScheduler, InstanceId, ManualScheduler, Phase, Renderer, RootId, StepDeadline, Unbounded,
    Updater, state,
};

pub use error::{Error, HostError, Result};

pub use host::{
    Attr, HostAdapter, HostOp, HostSnapshot, MemoryHost, NodeId, TerminalHost, update_host_props,
};

/// Everything an application usually needs.
pub mod prelude {
    pub use std::time::Duration;

    pub use crate::types::{Event, Listener, Props, State, Value, json};
    pub use crate::{
        CommitReport, Component, Context, EffectTag, Element, HostAdapter, IdleDeadline,
        ManualScheduler, MemoryHost, Renderer, RendererConfig, TerminalHost, Updater, component,
        function, h, state, text,
    };
}
