//! Scheduling primitives: deadlines and idle callbacks.
//!
//! The renderer never decides when to run. The embedder owns an
//! [`IdleScheduler`]; the renderer asks it for a callback whenever work is
//! queued, and the embedder answers by calling
//! [`Renderer::perform_work`](crate::Renderer::perform_work) with a
//! [`Deadline`] describing how much time the slice may take.
//!
//! ```text
//! enqueue ──request_callback──▶ embedder
//! embedder ──perform_work(deadline)──▶ renderer ──(work remains)──▶ request_callback
//! ```

use std::cell::Cell;
use std::time::{Duration, Instant};

use crate::config::RendererConfig;

// =============================================================================
// Deadlines
// =============================================================================

/// Time budget of one scheduling slice.
pub trait Deadline {
    /// Time left before the slice must yield.
    fn time_remaining(&self) -> Duration;
}

/// Wall-clock deadline, the equivalent of a browser idle deadline.
#[derive(Debug, Clone, Copy)]
pub struct IdleDeadline {
    start: Instant,
    budget: Duration,
}

impl IdleDeadline {
    /// Deadline expiring `budget` from now.
    pub fn new(budget: Duration) -> Self {
        Self {
            start: Instant::now(),
            budget,
        }
    }

    /// Deadline of one frame as configured.
    pub fn for_frame(config: &RendererConfig) -> Self {
        Self::new(config.frame_budget)
    }
}

impl Deadline for IdleDeadline {
    fn time_remaining(&self) -> Duration {
        self.budget.saturating_sub(self.start.elapsed())
    }
}

/// Deadline that never expires.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl Deadline for Unbounded {
    fn time_remaining(&self) -> Duration {
        Duration::MAX
    }
}

/// Deterministic deadline that allows a fixed number of units of work.
///
/// Every query consumes one step; the work loop queries once per unit.
#[derive(Debug)]
pub struct StepDeadline {
    remaining: Cell<usize>,
}

impl StepDeadline {
    pub fn new(units: usize) -> Self {
        Self {
            remaining: Cell::new(units),
        }
    }

    /// Steps not yet consumed.
    pub fn remaining(&self) -> usize {
        self.remaining.get()
    }
}

impl Deadline for StepDeadline {
    fn time_remaining(&self) -> Duration {
        match self.remaining.get() {
            0 => Duration::ZERO,
            n => {
                self.remaining.set(n - 1);
                Duration::MAX
            }
        }
    }
}

// =============================================================================
// Idle Schedulers
// =============================================================================

/// Host environment hook: "call `perform_work` when you get a chance".
///
/// Must eventually honor every request and must accept requests made from
/// inside a callback.
pub trait IdleScheduler {
    fn request_callback(&self);
}

impl<F: Fn()> IdleScheduler for F {
    fn request_callback(&self) {
        self()
    }
}

/// Scheduler that only counts requests; the embedder polls it.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    requests: Cell<usize>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests not yet taken.
    pub fn pending(&self) -> usize {
        self.requests.get()
    }

    /// Consume one request. Returns false when there was none.
    pub fn take_request(&self) -> bool {
        match self.requests.get() {
            0 => false,
            n => {
                self.requests.set(n - 1);
                true
            }
        }
    }

    /// Consume every request. Returns true when there was at least one.
    pub fn take_all(&self) -> bool {
        self.requests.replace(0) > 0
    }
}

impl IdleScheduler for ManualScheduler {
    fn request_callback(&self) {
        self.requests.set(self.requests.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_step_deadline_counts_down() {
        let deadline = StepDeadline::new(2);
        assert_eq!(deadline.time_remaining(), Duration::MAX);
        assert_eq!(deadline.time_remaining(), Duration::MAX);
        assert_eq!(deadline.time_remaining(), Duration::ZERO);
        assert_eq!(deadline.remaining(), 0);
    }

    #[test]
    fn test_idle_deadline_expires() {
        let deadline = IdleDeadline::new(Duration::ZERO);
        assert_eq!(deadline.time_remaining(), Duration::ZERO);

        let frame = IdleDeadline::for_frame(&RendererConfig::default());
        assert!(frame.time_remaining() <= Duration::from_millis(16));
    }

    #[test]
    fn test_manual_scheduler() {
        let scheduler = ManualScheduler::new();
        scheduler.request_callback();
        scheduler.request_callback();
        assert_eq!(scheduler.pending(), 2);
        assert!(scheduler.take_request());
        assert!(scheduler.take_all());
        assert!(!scheduler.take_request());
    }

    #[test]
    fn test_closure_scheduler() {
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let scheduler = move || counter.set(counter.get() + 1);
        scheduler.request_callback();
        assert_eq!(hits.get(), 1);
    }
}
