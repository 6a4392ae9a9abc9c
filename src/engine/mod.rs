//! Fiber Engine - Incremental reconciliation with cooperative scheduling.
//!
//! The engine manages the core data structures:
//! - FiberTree: arena of unit-of-work records, current and work-in-progress
//! - UpdateQueue: FIFO of root renders and state merges
//! - Instances: component objects that persist across passes
//! - Renderer: the object tying them to a host adapter
//!
//! # Architecture
//!
//! Every update runs as one pass from the root of its tree:
//!
//! ```text
//! Update ─▶ work phase (interruptible)                ─▶ commit phase (atomic)
//!           begin work per fiber, reconcile children      apply effects to host
//!           complete work folds effect lists upward       swap trees, fire hooks
//! ```
//!
//! The work phase builds a second tree next to the committed one. Fibers of
//! the new tree point at their previous version through `alternate`, reuse
//! its host nodes and instances, and carry the effect to apply. Commit makes
//! the new tree current and frees the old one.

pub mod commit;
pub mod component;
pub mod fiber;
pub mod queue;
mod reconcile;
pub mod renderer;
pub mod scheduler;
mod work;

pub use commit::{CommitReport, EffectRecord};
pub use component::{Component, Context, InstanceId, Updater, state};
pub use fiber::{EffectTag, FiberId, FiberTag};
pub use queue::{RootId, Update};
pub use renderer::{Phase, Renderer};
pub use scheduler::{Deadline, IdleDeadline, IdleScheduler, ManualScheduler, StepDeadline, Unbounded};
