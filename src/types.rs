//! Core types for spark-fiber.
//!
//! These types define the configuration half of a node description: property
//! values, event listeners and the props map that carries children.
//! They flow from application code into the engine and out to the host adapter.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

pub use serde_json::{Map, Value, json};

use crate::element::Element;

/// Reserved configuration key holding the literal value of a text node.
pub const TEXT_VALUE_KEY: &str = "nodeValue";

/// Configuration keys starting with this prefix are event listeners.
///
/// Shared by [`ElementBuilder::on`](crate::ElementBuilder::on) and the
/// configuration diff, so builder-made keys always classify as listeners.
pub const LISTENER_PREFIX: &str = "on";

// =============================================================================
// State
// =============================================================================

/// Component state: a flat map merged shallowly by state updates.
pub type State = Map<String, Value>;

/// Shallow-merge `partial` into `state`. Keys in `partial` override.
pub fn merge_state(state: &mut State, partial: &State) {
    for (key, value) in partial {
        state.insert(key.clone(), value.clone());
    }
}

// =============================================================================
// Events and Listeners
// =============================================================================

/// Event delivered to a listener by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event name as registered with the host (e.g. "click", "input").
    pub name: String,
    /// Optional payload (e.g. the new value of an input).
    pub value: Option<Value>,
}

impl Event {
    /// Create an event with no payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Create an event carrying a payload.
    pub fn with_value(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// Payload as a string slice, if it is one.
    pub fn value_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(Value::as_str)
    }
}

/// Event listener callback.
///
/// Rc so the same handler can be attached and later detached by identity.
pub type Listener = Rc<dyn Fn(&Event)>;

// =============================================================================
// Prop - One configuration value
// =============================================================================

/// A single configuration value: plain data or an event listener.
#[derive(Clone)]
pub enum Prop {
    /// Attribute value.
    Value(Value),
    /// Event handler. Compared by pointer identity.
    Listener(Listener),
}

impl Prop {
    /// The attribute value, if this is not a listener.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Prop::Value(v) => Some(v),
            Prop::Listener(_) => None,
        }
    }

    /// The listener, if this is one.
    pub fn as_listener(&self) -> Option<&Listener> {
        match self {
            Prop::Listener(l) => Some(l),
            Prop::Value(_) => None,
        }
    }
}

impl PartialEq for Prop {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Prop::Value(a), Prop::Value(b)) => a == b,
            (Prop::Listener(a), Prop::Listener(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prop::Value(v) => write!(f, "{v}"),
            Prop::Listener(l) => write!(f, "<listener {:p}>", Rc::as_ptr(l)),
        }
    }
}

macro_rules! prop_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Prop {
                fn from(value: $ty) -> Self {
                    Prop::Value(Value::from(value))
                }
            }
        )*
    };
}

prop_from_value!(&str, String, bool, i32, i64, u32, u64, usize, f64);

impl From<Value> for Prop {
    fn from(value: Value) -> Self {
        Prop::Value(value)
    }
}

impl From<Listener> for Prop {
    fn from(listener: Listener) -> Self {
        Prop::Listener(listener)
    }
}

// =============================================================================
// Props - Configuration of one element
// =============================================================================

/// Configuration map of an element plus its ordered children.
///
/// Entries are kept sorted by key so host mutations are deterministic.
#[derive(Clone, Default)]
pub struct Props {
    entries: BTreeMap<String, Prop>,
    children: Vec<Element>,
}

impl Props {
    /// Empty props.
    pub fn new() -> Self {
        Self::default()
    }

    /// Props holding only children (used for root renders).
    pub fn with_children(children: Vec<Element>) -> Self {
        Self {
            entries: BTreeMap::new(),
            children,
        }
    }

    /// Insert or replace a configuration entry.
    pub fn insert(&mut self, key: impl Into<String>, prop: impl Into<Prop>) {
        self.entries.insert(key.into(), prop.into());
    }

    /// Insert a listener under `key`.
    pub fn insert_listener(&mut self, key: impl Into<String>, listener: Listener) {
        self.entries.insert(key.into(), Prop::Listener(listener));
    }

    /// Append a child description.
    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Look up an entry.
    pub fn get(&self, key: &str) -> Option<&Prop> {
        self.entries.get(key)
    }

    /// Look up an attribute value.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).and_then(Prop::as_value)
    }

    /// Look up a string attribute.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(Value::as_str)
    }

    /// Look up a listener.
    pub fn listener(&self, key: &str) -> Option<&Listener> {
        self.entries.get(key).and_then(Prop::as_listener)
    }

    /// Iterate entries in key order (children excluded).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Prop)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of configuration entries (children excluded).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no configuration entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Child descriptions.
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// True when both child lists hold the same descriptions by reference.
    pub fn same_children(&self, other: &Props) -> bool {
        self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.same_as(b))
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("entries", &self.entries)
            .field("children", &self.children.len())
            .finish()
    }
}
