//! Error types.
//!
//! Three failure classes reach the embedder:
//! - malformed descriptions (caller contract violation)
//! - host adapter failures (propagated out of the work or commit phase)
//! - component render failures
//!
//! None of them is retried. The pass that hit the error is abandoned and the
//! previously committed tree stays current.

use thiserror::Error;

/// Failure reported by a [`HostAdapter`](crate::HostAdapter).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The handle does not refer to a live host node.
    #[error("host node {0} does not exist")]
    MissingNode(String),
    /// `child` is not attached under `parent`.
    #[error("host node {child} is not a child of {parent}")]
    NotAChild { parent: String, child: String },
    /// The operation does not apply to this node (e.g. children on a text node).
    #[error("unsupported operation on host node {node}: {reason}")]
    Unsupported { node: String, reason: String },
}

/// Errors returned by the renderer.
#[derive(Debug, Error)]
pub enum Error {
    /// A description that cannot be materialized.
    #[error("malformed element: {0}")]
    MalformedElement(String),

    /// A component or function component failed to render.
    #[error("component `{component}` failed to render")]
    Render {
        component: String,
        #[source]
        source: anyhow::Error,
    },

    /// The host adapter rejected an operation.
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Result alias for renderer operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
