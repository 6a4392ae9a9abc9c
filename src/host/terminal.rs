//! TerminalHost - Paints the host tree to a terminal.
//!
//! The tree itself lives in a [`MemoryHost`]; this adapter adds a tiny flow
//! layout and a crossterm painter on top.
//!
//! # Layout
//!
//! ```text
//! block tags (div, p, ul, li, h1, ...)  → start and end a line
//! everything else                       → inline, flows into the current line
//! li                                    → "• " bullet
//! button                                → "[label]"
//! input                                 → "[value]" underlined
//! ```
//!
//! Boolean properties `bold`, `dim`, `italic`, `underline`, `blink`,
//! `inverse`, `hidden`, `strikethrough` set text attributes; `color` names a
//! foreground color ("red", "dark_grey", ...). Both inherit down the tree.

use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};

use crate::error::HostError;
use crate::types::{Event, Listener, Value};

use super::HostAdapter;
use super::memory::{MemoryHost, NodeId};

// =============================================================================
// Attr - Text attributes
// =============================================================================

bitflags::bitflags! {
    /// Text attributes as a bitfield.
    ///
    /// Combine with bitwise OR: `Attr::BOLD | Attr::ITALIC`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Attr: u8 {
        const NONE = 0;
        const BOLD = 1 << 0;
        const DIM = 1 << 1;
        const ITALIC = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK = 1 << 4;
        const INVERSE = 1 << 5;
        const HIDDEN = 1 << 6;
        const STRIKETHROUGH = 1 << 7;
    }
}

/// Property name → attribute flag.
const ATTR_PROPERTIES: [(&str, Attr, Attribute); 8] = [
    ("bold", Attr::BOLD, Attribute::Bold),
    ("dim", Attr::DIM, Attribute::Dim),
    ("italic", Attr::ITALIC, Attribute::Italic),
    ("underline", Attr::UNDERLINE, Attribute::Underlined),
    ("blink", Attr::BLINK, Attribute::SlowBlink),
    ("inverse", Attr::INVERSE, Attribute::Reverse),
    ("hidden", Attr::HIDDEN, Attribute::Hidden),
    ("strikethrough", Attr::STRIKETHROUGH, Attribute::CrossedOut),
];

const BLOCK_TAGS: &[&str] = &[
    "div", "p", "ul", "ol", "li", "section", "header", "footer", "form", "h1", "h2", "h3",
];

fn is_block(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

// =============================================================================
// Layout
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Style {
    attr: Attr,
    color: Option<Color>,
}

#[derive(Debug, Clone, PartialEq)]
struct Span {
    text: String,
    style: Style,
}

/// Lines of styled spans.
#[derive(Default)]
struct Layout {
    lines: Vec<Vec<Span>>,
}

impl Layout {
    fn current(&mut self) -> &mut Vec<Span> {
        if self.lines.is_empty() {
            self.lines.push(Vec::new());
        }
        let last = self.lines.len() - 1;
        &mut self.lines[last]
    }

    fn break_line(&mut self) {
        if self.lines.last().is_some_and(|line| !line.is_empty()) {
            self.lines.push(Vec::new());
        }
    }

    fn push(&mut self, text: impl Into<String>, style: Style) {
        let text = text.into();
        if !text.is_empty() {
            self.current().push(Span { text, style });
        }
    }

    fn finish(mut self) -> Vec<Vec<Span>> {
        while self.lines.last().is_some_and(Vec::is_empty) {
            self.lines.pop();
        }
        self.lines
    }
}

// =============================================================================
// TerminalHost
// =============================================================================

/// Host adapter that keeps an in-memory tree and paints it with crossterm.
#[derive(Default)]
pub struct TerminalHost {
    tree: MemoryHost,
}

impl TerminalHost {
    /// Empty terminal host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the container to render into.
    pub fn create_container(&mut self) -> NodeId {
        self.tree.create_container("screen")
    }

    /// The underlying tree.
    pub fn tree(&self) -> &MemoryHost {
        &self.tree
    }

    /// The underlying tree, mutably.
    pub fn tree_mut(&mut self) -> &mut MemoryHost {
        &mut self.tree
    }

    /// Deliver an event to the listeners of `node`.
    pub fn dispatch(&self, node: NodeId, event: &Event) -> usize {
        self.tree.dispatch(node, event)
    }

    fn style_of(&self, node: NodeId, inherited: Style) -> Style {
        let mut style = inherited;
        for (key, flag, _) in ATTR_PROPERTIES {
            if self.tree.property(node, key) == Some(&Value::Bool(true)) {
                style.attr |= flag;
            }
        }
        if let Some(name) = self.tree.property(node, "color").and_then(Value::as_str) {
            match Color::try_from(name) {
                Ok(color) => style.color = Some(color),
                Err(()) => log::warn!("unknown color `{name}` on {node}"),
            }
        }
        style
    }

    fn layout_node(&self, node: NodeId, inherited: Style, layout: &mut Layout) {
        if self.tree.is_text(node) {
            let text = self
                .tree
                .property(node, crate::types::TEXT_VALUE_KEY)
                .and_then(Value::as_str)
                .unwrap_or_default();
            layout.push(text, inherited);
            return;
        }

        let tag = self.tree.tag(node).unwrap_or_default();
        let style = self.style_of(node, inherited);
        let block = is_block(tag);
        if block {
            layout.break_line();
        }

        match tag {
            "li" => layout.push("• ", style),
            "button" => layout.push("[", style),
            "input" => {
                let value = match self.tree.property(node, "value") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                };
                let mut field = style;
                field.attr |= Attr::UNDERLINE;
                layout.push("[", style);
                layout.push(if value.is_empty() { " ".to_string() } else { value }, field);
                layout.push("]", style);
            }
            _ => {}
        }

        for child in self.tree.children(node) {
            self.layout_node(*child, style, layout);
        }

        if tag == "button" {
            layout.push("]", style);
        }
        if block {
            layout.break_line();
        }
    }

    fn layout(&self, root: NodeId) -> Vec<Vec<Span>> {
        let mut layout = Layout::default();
        for child in self.tree.children(root) {
            self.layout_node(*child, Style::default(), &mut layout);
        }
        layout.finish()
    }

    /// Lay out the tree under `root` as plain text, one string per line.
    pub fn to_lines(&self, root: NodeId) -> Vec<String> {
        self.layout(root)
            .iter()
            .map(|line| line.iter().map(|span| span.text.as_str()).collect())
            .collect()
    }

    /// Lay out the tree under `root` as plain text joined by newlines.
    pub fn to_plain_string(&self, root: NodeId) -> String {
        self.to_lines(root).join("\n")
    }

    /// Paint the tree under `root` to `out`, with attributes and colors.
    pub fn paint(&self, root: NodeId, out: &mut impl Write) -> io::Result<()> {
        for line in self.layout(root) {
            for span in line {
                for (_, flag, attribute) in ATTR_PROPERTIES {
                    if span.style.attr.contains(flag) {
                        queue!(out, SetAttribute(attribute))?;
                    }
                }
                if let Some(color) = span.style.color {
                    queue!(out, SetForegroundColor(color))?;
                }
                queue!(out, Print(span.text))?;
                if span.style != Style::default() {
                    queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
                }
            }
            queue!(out, Print("\r\n"))?;
        }
        out.flush()
    }
}

impl HostAdapter for TerminalHost {
    type Node = NodeId;

    fn create_node(&mut self, tag: &str) -> Result<NodeId, HostError> {
        self.tree.create_node(tag)
    }

    fn create_text_node(&mut self, value: &str) -> Result<NodeId, HostError> {
        self.tree.create_text_node(value)
    }

    fn set_property(&mut self, node: &NodeId, key: &str, value: &Value) -> Result<(), HostError> {
        self.tree.set_property(node, key, value)
    }

    fn clear_property(&mut self, node: &NodeId, key: &str) -> Result<(), HostError> {
        self.tree.clear_property(node, key)
    }

    fn add_listener(&mut self, node: &NodeId, event: &str, listener: &Listener) -> Result<(), HostError> {
        self.tree.add_listener(node, event, listener)
    }

    fn remove_listener(
        &mut self,
        node: &NodeId,
        event: &str,
        listener: &Listener,
    ) -> Result<(), HostError> {
        self.tree.remove_listener(node, event, listener)
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
        self.tree.append_child(parent, child)
    }

    fn insert_before(&mut self, parent: &NodeId, child: &NodeId, before: &NodeId) -> Result<(), HostError> {
        self.tree.insert_before(parent, child, before)
    }

    fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
        self.tree.remove_child(parent, child)
    }

    fn release_node(&mut self, node: &NodeId) -> Result<(), HostError> {
        self.tree.release_node(node)
    }
}
