//! Configuration Diff - Applies prop changes to a host node.
//!
//! Keys fall into two classes:
//! - **listener** keys start with the listener prefix (`onClick` → event `click`)
//! - **attribute** keys are everything else
//!
//! Children are not part of the map; they are reconciled as fibers.
//!
//! # Policy
//!
//! When both configurations hold the same values the diff is a no-op. Otherwise
//! every previous listener is removed, every previous attribute cleared, and the
//! full next configuration is applied. No per-key minimal diff.

use crate::error::HostError;
use crate::types::{LISTENER_PREFIX, Prop, Props};

use super::HostAdapter;

/// True when `key` names an event listener.
pub fn is_listener_key(key: &str) -> bool {
    key.len() > LISTENER_PREFIX.len() && key.starts_with(LISTENER_PREFIX)
}

/// Event name for a listener key: the remainder after the prefix, lower-cased.
pub fn event_name(key: &str) -> String {
    key.strip_prefix(LISTENER_PREFIX).unwrap_or(key).to_lowercase()
}

/// True when applying `next` over `prev` would change nothing.
fn unchanged(prev: &Props, next: &Props) -> bool {
    if std::ptr::eq(prev, next) {
        return true;
    }
    prev.len() == next.len()
        && prev.iter().all(|(key, value)| next.get(key) == Some(value))
        && prev.same_children(next)
}

/// Bring `node` from configuration `prev` to configuration `next`.
///
/// Returns false when the short-circuit fired and nothing was touched.
pub fn update_host_props<H: HostAdapter + ?Sized>(
    host: &mut H,
    node: &H::Node,
    prev: &Props,
    next: &Props,
) -> Result<bool, HostError> {
    if unchanged(prev, next) {
        return Ok(false);
    }

    for (key, prop) in prev.iter().filter(|(k, _)| is_listener_key(k)) {
        if let Prop::Listener(listener) = prop {
            host.remove_listener(node, &event_name(key), listener)?;
        }
    }

    for (key, _) in prev.iter().filter(|(k, _)| !is_listener_key(k)) {
        host.clear_property(node, key)?;
    }

    for (key, prop) in next.iter().filter(|(k, _)| is_listener_key(k)) {
        match prop {
            Prop::Listener(listener) => host.add_listener(node, &event_name(key), listener)?,
            Prop::Value(value) => {
                log::warn!("listener key `{key}` holds a plain value ({value}); ignored");
            }
        }
    }

    for (key, prop) in next.iter().filter(|(k, _)| !is_listener_key(k)) {
        match prop {
            Prop::Value(value) => host.set_property(node, key, value)?,
            Prop::Listener(_) => {
                log::warn!("attribute key `{key}` holds a listener; ignored");
            }
        }
    }

    Ok(true)
}
