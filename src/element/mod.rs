//! Node Descriptions - Immutable data describing what should exist.
//!
//! An [`Element`] pairs an [`ElementType`] with shared, immutable [`Props`].
//! Descriptions carry no identity beyond their position in a child list; the
//! engine matches them against fibers of the previous pass by type only.
//!
//! # Kinds
//!
//! ```text
//! Host("div")          → host node created through the HostAdapter
//! Text                 → host text node, value under `nodeValue`
//! Component(Counter)   → stateful component, instance persists across passes
//! Function(badge)      → stateless render function
//! ```
//!
//! Building descriptions is done with the helpers in [`builder`]; children are
//! normalized there (empty entries dropped, strings turned into text elements)
//! so the engine never has to.

pub mod builder;

use std::any::TypeId;
use std::fmt;
use std::rc::Rc;

use crate::engine::component::Component;
use crate::types::{Props, TEXT_VALUE_KEY};

pub use builder::{Child, ElementBuilder, component, function, h, text};

// =============================================================================
// Component Types
// =============================================================================

/// Render function of a function component.
pub type RenderFn = fn(&Props) -> anyhow::Result<Vec<Element>>;

/// Constructor reference for a stateful component.
///
/// Two component types are the same when they construct the same Rust type.
#[derive(Clone, Copy)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
    construct: fn(&Props) -> Box<dyn Component>,
}

fn construct_boxed<C: Component>(props: &Props) -> Box<dyn Component> {
    Box::new(C::create(props))
}

impl ComponentType {
    /// The component type for `C`.
    pub fn of<C: Component>() -> Self {
        let full = std::any::type_name::<C>();
        let name = full.rsplit("::").next().unwrap_or(full);
        Self {
            id: TypeId::of::<C>(),
            name,
            construct: construct_boxed::<C>,
        }
    }

    /// Short type name, used in logs and reports.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn construct(&self, props: &Props) -> Box<dyn Component> {
        (self.construct)(props)
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.name)
    }
}

/// A stateless component: a named render function.
#[derive(Clone, Copy)]
pub struct FunctionComponent {
    name: &'static str,
    render: RenderFn,
}

impl FunctionComponent {
    /// Wrap a render function.
    pub const fn new(name: &'static str, render: RenderFn) -> Self {
        Self { name, render }
    }

    /// Name used in logs and reports.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn call(&self, props: &Props) -> anyhow::Result<Vec<Element>> {
        (self.render)(props)
    }
}

impl PartialEq for FunctionComponent {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::fn_addr_eq(self.render, other.render)
    }
}

impl fmt::Debug for FunctionComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name)
    }
}

// =============================================================================
// Element Type
// =============================================================================

/// What kind of node a description stands for. Used for identity matching.
#[derive(Clone, PartialEq)]
pub enum ElementType {
    /// Host node with a tag (e.g. "div").
    Host(Rc<str>),
    /// Host text node.
    Text,
    /// Stateful component.
    Component(ComponentType),
    /// Function component.
    Function(FunctionComponent),
}

impl ElementType {
    /// Display name: the tag, `#text`, or the component name.
    pub fn name(&self) -> &str {
        match self {
            ElementType::Host(tag) => tag,
            ElementType::Text => "#text",
            ElementType::Component(ty) => ty.name(),
            ElementType::Function(f) => f.name(),
        }
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Host(tag) => write!(f, "Host({tag})"),
            ElementType::Text => f.write_str("Text"),
            ElementType::Component(ty) => ty.fmt(f),
            ElementType::Function(func) => func.fmt(f),
        }
    }
}

// =============================================================================
// Element
// =============================================================================

/// An immutable node description.
///
/// Cheap to clone: props are shared. Two clones of the same element are
/// "unchanged" to the engine, which is what enables render bail-outs.
#[derive(Clone)]
pub struct Element {
    ty: ElementType,
    props: Rc<Props>,
}

impl Element {
    /// Create an element from a type and props.
    pub fn new(ty: ElementType, props: Props) -> Self {
        Self {
            ty,
            props: Rc::new(props),
        }
    }

    /// Create a text element.
    pub fn text(value: impl Into<String>) -> Self {
        let mut props = Props::new();
        props.insert(TEXT_VALUE_KEY, value.into());
        Self::new(ElementType::Text, props)
    }

    /// The element type.
    pub fn ty(&self) -> &ElementType {
        &self.ty
    }

    /// The element props.
    pub fn props(&self) -> &Props {
        &self.props
    }

    pub(crate) fn shared_props(&self) -> &Rc<Props> {
        &self.props
    }

    /// True when `other` is the same description (same type, same props allocation).
    pub fn same_as(&self, other: &Element) -> bool {
        self.ty == other.ty && Rc::ptr_eq(&self.props, &other.props)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("ty", &self.ty)
            .field("props", &self.props)
            .finish()
    }
}
