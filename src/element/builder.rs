//! Element builder - Turns nested calls into normalized descriptions.
//!
//! # Example
//!
//! ```ignore
//! use spark_fiber::element::{h, component};
//!
//! let tree = h("div")
//!     .attr("id", "main")
//!     .on("click", |_| println!("clicked"))
//!     .child(h("span").child("hello"))
//!     .child(component::<Counter>().attr("start", 3))
//!     .build();
//! ```
//!
//! Children are normalized on the way in: `None` entries are dropped, strings
//! and numbers become text elements, iterators are flattened.

use std::rc::Rc;

use crate::engine::component::Component;
use crate::types::{Event, LISTENER_PREFIX, Listener, Prop, Props};

use super::{ComponentType, Element, ElementType, FunctionComponent, RenderFn};

// =============================================================================
// Child - Normalization input
// =============================================================================

/// Anything that can appear in a child list before normalization.
pub enum Child {
    /// An element.
    Element(Element),
    /// Bare text, becomes a text element.
    Text(String),
    /// Nothing (dropped).
    Empty,
}

impl From<Element> for Child {
    fn from(element: Element) -> Self {
        Child::Element(element)
    }
}

impl From<ElementBuilder> for Child {
    fn from(builder: ElementBuilder) -> Self {
        Child::Element(builder.build())
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl From<&String> for Child {
    fn from(text: &String) -> Self {
        Child::Text(text.clone())
    }
}

impl From<i64> for Child {
    fn from(n: i64) -> Self {
        Child::Text(n.to_string())
    }
}

impl From<usize> for Child {
    fn from(n: usize) -> Self {
        Child::Text(n.to_string())
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(child: Option<T>) -> Self {
        child.map_or(Child::Empty, Into::into)
    }
}

impl Child {
    fn into_element(self) -> Option<Element> {
        match self {
            Child::Element(element) => Some(element),
            Child::Text(text) => Some(Element::text(text)),
            Child::Empty => None,
        }
    }
}

// =============================================================================
// Element Builder
// =============================================================================

/// Fluent builder for an [`Element`].
pub struct ElementBuilder {
    ty: ElementType,
    props: Props,
}

impl ElementBuilder {
    /// Start building an element of the given type.
    pub fn new(ty: ElementType) -> Self {
        Self {
            ty,
            props: Props::new(),
        }
    }

    /// Set an attribute.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<Prop>) -> Self {
        self.props.insert(key, value);
        self
    }

    /// Attach a listener for `event` (stored under `on` + capitalized event name).
    pub fn on(mut self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        self.props.insert_listener(listener_key(event), Rc::new(handler));
        self
    }

    /// Attach an existing listener under an explicit key.
    pub fn listener(mut self, key: impl Into<String>, listener: Listener) -> Self {
        self.props.insert_listener(key, listener);
        self
    }

    /// Append one child.
    pub fn child(mut self, child: impl Into<Child>) -> Self {
        if let Some(element) = child.into().into_element() {
            self.props.push_child(element);
        }
        self
    }

    /// Append every child from an iterator.
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Child>,
    {
        for child in children {
            if let Some(element) = child.into().into_element() {
                self.props.push_child(element);
            }
        }
        self
    }

    /// Finish the element.
    pub fn build(self) -> Element {
        Element::new(self.ty, self.props)
    }
}

impl From<ElementBuilder> for Element {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}

fn listener_key(event: &str) -> String {
    let mut chars = event.chars();
    match chars.next() {
        Some(first) => format!("{LISTENER_PREFIX}{}{}", first.to_uppercase(), chars.as_str()),
        None => LISTENER_PREFIX.to_string(),
    }
}

// =============================================================================
// Entry Points
// =============================================================================

/// Host element with the given tag.
pub fn h(tag: &str) -> ElementBuilder {
    ElementBuilder::new(ElementType::Host(Rc::from(tag)))
}

/// Text element.
pub fn text(value: impl Into<String>) -> Element {
    Element::text(value)
}

/// Stateful component element.
pub fn component<C: Component>() -> ElementBuilder {
    ElementBuilder::new(ElementType::Component(ComponentType::of::<C>()))
}

/// Function component element.
pub fn function(name: &'static str, render: RenderFn) -> ElementBuilder {
    ElementBuilder::new(ElementType::Function(FunctionComponent::new(name, render)))
}
