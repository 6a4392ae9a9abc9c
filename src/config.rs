//! Renderer configuration.
//!
//! A plain value handed to [`Renderer::with_config`](crate::Renderer::with_config).
//! Defaults match what a browser-style idle callback host expects.

use std::time::Duration;

/// Tunables for one renderer instance.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// The work loop stops advancing once a slice has this much time or less left.
    pub min_time_remaining: Duration,
    /// Budget of one frame, used by [`IdleDeadline::for_frame`](crate::IdleDeadline::for_frame).
    pub frame_budget: Duration,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            min_time_remaining: Duration::from_millis(1),
            frame_budget: Duration::from_millis(16),
        }
    }
}

impl RendererConfig {
    /// Set the work-loop floor.
    pub fn with_min_time_remaining(mut self, floor: Duration) -> Self {
        self.min_time_remaining = floor;
        self
    }

    /// Set the frame budget.
    pub fn with_frame_budget(mut self, budget: Duration) -> Self {
        self.frame_budget = budget;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.min_time_remaining, Duration::from_millis(1));
        assert_eq!(config.frame_budget, Duration::from_millis(16));
    }

    #[test]
    fn test_builders() {
        let config = RendererConfig::default()
            .with_min_time_remaining(Duration::ZERO)
            .with_frame_budget(Duration::from_millis(8));
        assert_eq!(config.min_time_remaining, Duration::ZERO);
        assert_eq!(config.frame_budget, Duration::from_millis(8));
    }
}
