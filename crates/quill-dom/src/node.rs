//! DOM nodes and the per-parse node arena.
//!
//! Nodes never own each other. A node knows its parent by [`NodeId`] and
//! knows where it sits in the parser's event queue by [`EventId`]; the
//! children of an element are whatever lies between its two events. All
//! nodes of a parse live in one [`NodeArena`] and are dropped together.

use strum_macros::{Display, IntoStaticStr};

use crate::keywords;
use crate::name::{HtmlName, Keyword};

/// A type-safe index into a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A type-safe index into the parser's event slab.
///
/// Stored on nodes so the parser can find a node's events in O(1). The slab
/// itself lives in `quill-html`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub usize);

/// How an element's end was (or will be) expressed in markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum CloseStyle {
    /// Closed by the lexer because a later tag implies the end (`<li>a<li>`).
    AutoClose,
    /// A void element that takes no close tag (`<br>`).
    ImplicitClose,
    /// Closed by a matching `</tag>`.
    ExplicitClose,
    /// Closed in the start tag (`<tag/>`).
    BriefClose,
    /// Never closed before the document ended or an ancestor closed.
    Unclosed,
    /// Tags are suppressed on output; children still render.
    Invisible,
}

/// Quote character used around an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum QuoteStyle {
    /// `name=value`, or a bare `name`.
    #[strum(serialize = "")]
    NoQuote,
    /// `name='value'`
    #[strum(serialize = "'")]
    SingleQuote,
    /// `name="value"`
    #[strum(serialize = "\"")]
    DoubleQuote,
}

impl QuoteStyle {
    /// The quote character as text, empty for [`QuoteStyle::NoQuote`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoQuote => "",
            Self::SingleQuote => "'",
            Self::DoubleQuote => "\"",
        }
    }
}

/// An attribute of an element.
///
/// The value is kept exactly as written (`escaped`) so unmodified attributes
/// round-trip byte for byte. The decoded form is computed once on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: HtmlName,
    escaped_value: Option<String>,
    decoded_value: Option<String>,
    decoding_error: bool,
    quote: QuoteStyle,
}

impl Attribute {
    /// An attribute with a value as it appeared in markup (still escaped).
    #[must_use]
    pub fn new(name: HtmlName, escaped_value: Option<&str>, quote: QuoteStyle) -> Self {
        let mut attribute = Self {
            name,
            escaped_value: None,
            decoded_value: None,
            decoding_error: false,
            quote,
        };
        attribute.set_escaped_value(escaped_value);
        attribute
    }

    /// The attribute name.
    #[must_use]
    pub const fn name(&self) -> &HtmlName {
        &self.name
    }

    /// Shorthand for `self.name().keyword()`.
    #[must_use]
    pub const fn keyword(&self) -> Keyword {
        self.name.keyword()
    }

    /// The value as written, or `None` for a valueless attribute.
    #[must_use]
    pub fn escaped_value(&self) -> Option<&str> {
        self.escaped_value.as_deref()
    }

    /// The value with character references decoded.
    ///
    /// `None` for a valueless attribute and for a value that could not be
    /// decoded; [`Attribute::decoding_error`] tells the two apart.
    #[must_use]
    pub fn decoded_value(&self) -> Option<&str> {
        self.decoded_value.as_deref()
    }

    /// Whether the value held references that cannot be decoded losslessly.
    #[must_use]
    pub const fn decoding_error(&self) -> bool {
        self.decoding_error
    }

    /// Quote character used when writing the value.
    #[must_use]
    pub const fn quote_style(&self) -> QuoteStyle {
        self.quote
    }

    /// Change the quote character.
    pub const fn set_quote_style(&mut self, quote: QuoteStyle) {
        self.quote = quote;
    }

    /// Replace the value with already-escaped text.
    pub fn set_escaped_value(&mut self, escaped_value: Option<&str>) {
        match escaped_value {
            Some(escaped) => {
                let decoded = keywords::unescape(escaped);
                self.decoding_error = decoded.is_none();
                self.decoded_value = decoded;
                self.escaped_value = Some(escaped.to_string());
            }
            None => {
                self.decoding_error = false;
                self.decoded_value = None;
                self.escaped_value = None;
            }
        }
    }

    /// Replace the value with plain text, escaping it for output.
    ///
    /// A valueless attribute that gains a value is double-quoted.
    pub fn set_value(&mut self, value: &str) {
        self.escaped_value = Some(keywords::escape(value));
        self.decoded_value = Some(value.to_string());
        self.decoding_error = false;
        if self.quote == QuoteStyle::NoQuote {
            self.quote = QuoteStyle::DoubleQuote;
        }
    }
}

/// An element: name, attributes in source order, and close style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlElement {
    name: HtmlName,
    attributes: Vec<Attribute>,
    close_style: CloseStyle,
    begin_line: u32,
    end_line: u32,
}

impl HtmlElement {
    /// An element with no attributes.
    ///
    /// Void tags start out implicitly closed and everything else explicitly
    /// closed, so elements built by filters write balanced markup.
    #[must_use]
    pub fn new(name: HtmlName) -> Self {
        let close_style = if keywords::is_implicitly_closed(name.keyword()) {
            CloseStyle::ImplicitClose
        } else {
            CloseStyle::ExplicitClose
        };
        Self {
            name,
            attributes: Vec::new(),
            close_style,
            begin_line: 0,
            end_line: 0,
        }
    }

    /// The tag name.
    #[must_use]
    pub const fn name(&self) -> &HtmlName {
        &self.name
    }

    /// Shorthand for `self.name().keyword()`.
    #[must_use]
    pub const fn keyword(&self) -> Keyword {
        self.name.keyword()
    }

    /// Rename the element, keeping its attributes.
    pub fn set_name(&mut self, name: HtmlName) {
        self.name = name;
    }

    /// Attributes in source order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Mutable access to the attributes.
    pub fn attributes_mut(&mut self) -> &mut Vec<Attribute> {
        &mut self.attributes
    }

    /// Append an attribute. Duplicates are kept, as in the source markup.
    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Append an attribute with a plain-text value, escaping it.
    pub fn add_attribute_value(&mut self, name: HtmlName, value: Option<&str>) {
        let mut attribute = Attribute::new(name, None, QuoteStyle::DoubleQuote);
        match value {
            Some(value) => attribute.set_value(value),
            None => attribute.set_quote_style(QuoteStyle::NoQuote),
        }
        self.attributes.push(attribute);
    }

    /// The first attribute matching `keyword`.
    #[must_use]
    pub fn find_attribute(&self, keyword: Keyword) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name().is(keyword))
    }

    /// The first attribute whose canonical name is `name` (any case).
    #[must_use]
    pub fn find_attribute_named(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name().canonical().eq_ignore_ascii_case(name))
    }

    /// Mutable access to the first attribute matching `keyword`.
    pub fn find_attribute_mut(&mut self, keyword: Keyword) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| a.name().is(keyword))
    }

    /// Decoded value of the first attribute matching `keyword`.
    #[must_use]
    pub fn attribute_value(&self, keyword: Keyword) -> Option<&str> {
        self.find_attribute(keyword).and_then(Attribute::decoded_value)
    }

    /// Escaped value of the first attribute matching `keyword`.
    #[must_use]
    pub fn escaped_attribute_value(&self, keyword: Keyword) -> Option<&str> {
        self.find_attribute(keyword).and_then(Attribute::escaped_value)
    }

    /// Whether any attribute matches `keyword`.
    #[must_use]
    pub fn has_attribute(&self, keyword: Keyword) -> bool {
        self.find_attribute(keyword).is_some()
    }

    /// Remove every attribute matching `keyword`. Returns whether any was removed.
    pub fn delete_attribute(&mut self, keyword: Keyword) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|a| !a.name().is(keyword));
        self.attributes.len() != before
    }

    /// How the element is closed.
    #[must_use]
    pub const fn close_style(&self) -> CloseStyle {
        self.close_style
    }

    /// Change how the element is closed.
    pub const fn set_close_style(&mut self, close_style: CloseStyle) {
        self.close_style = close_style;
    }

    /// Source line of the start tag, 0 for synthesized elements.
    #[must_use]
    pub const fn begin_line(&self) -> u32 {
        self.begin_line
    }

    /// Source line of the end tag, 0 when not seen in the source.
    #[must_use]
    pub const fn end_line(&self) -> u32 {
        self.end_line
    }

    /// Record the start-tag line.
    pub const fn set_begin_line(&mut self, line: u32) {
        self.begin_line = line;
    }

    /// Record the end-tag line.
    pub const fn set_end_line(&mut self, line: u32) {
        self.end_line = line;
    }
}

/// The variant payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// An element with start and end events.
    Element(HtmlElement),
    /// Text, verbatim from the source (still escaped).
    Characters(String),
    /// `<!--text-->`
    Comment(String),
    /// `<![CDATA[text]]>`
    Cdata(String),
    /// `<!text>`, including the doctype.
    Directive(String),
    /// `<!--[if IE]>...` conditional comment.
    IeDirective(String),
}

impl NodeKind {
    /// The text of a leaf, or `None` for an element.
    #[must_use]
    pub fn contents(&self) -> Option<&str> {
        match self {
            Self::Element(_) => None,
            Self::Characters(text)
            | Self::Comment(text)
            | Self::Cdata(text)
            | Self::Directive(text)
            | Self::IeDirective(text) => Some(text),
        }
    }

    /// Mutable text of a leaf.
    pub const fn contents_mut(&mut self) -> Option<&mut String> {
        match self {
            Self::Element(_) => None,
            Self::Characters(text)
            | Self::Comment(text)
            | Self::Cdata(text)
            | Self::Directive(text)
            | Self::IeDirective(text) => Some(text),
        }
    }
}

/// A node: payload plus its links to the tree and the event queue.
#[derive(Debug, Clone)]
pub struct HtmlNode {
    /// Enclosing element, `None` at top level or once deleted.
    pub parent: Option<NodeId>,
    /// False once deleted or once its last event has been flushed.
    pub live: bool,
    /// Set when the node is first given events and cleared on deletion.
    /// A node open across flush windows stays in the document with no
    /// `begin` event.
    pub in_document: bool,
    /// Start event (or the only event of a leaf).
    pub begin: Option<EventId>,
    /// End event (equal to `begin` for a leaf).
    pub end: Option<EventId>,
    /// Variant payload.
    pub kind: NodeKind,
}

impl HtmlNode {
    /// The element payload, if this is an element.
    #[must_use]
    pub const fn as_element(&self) -> Option<&HtmlElement> {
        match &self.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Mutable element payload.
    pub const fn as_element_mut(&mut self) -> Option<&mut HtmlElement> {
        match &mut self.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Whether this is an element.
    #[must_use]
    pub const fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element(_))
    }

    /// Whether this is a Characters node.
    #[must_use]
    pub const fn is_characters(&self) -> bool {
        matches!(self.kind, NodeKind::Characters(_))
    }
}

/// Pooled storage for every node of one parse.
///
/// Ids are never reused within a parse; [`NodeArena::clear`] frees all nodes
/// at once at the start of the next document.
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<HtmlNode>,
}

impl NodeArena {
    /// An empty arena.
    #[must_use]
    pub const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Store a live node that is not yet in the event queue.
    pub fn alloc(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(HtmlNode {
            parent,
            live: true,
            in_document: false,
            begin: None,
            end: None,
            kind,
        });
        id
    }

    /// Look up a node.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&HtmlNode> {
        self.nodes.get(id.0)
    }

    /// Mutable lookup.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut HtmlNode> {
        self.nodes.get_mut(id.0)
    }

    /// The element payload of `id`, if it is an element.
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&HtmlElement> {
        self.get(id).and_then(HtmlNode::as_element)
    }

    /// Mutable element payload of `id`.
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut HtmlElement> {
        self.get_mut(id).and_then(HtmlNode::as_element_mut)
    }

    /// Parent of `id`.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent)
    }

    /// Whether `id` is live.
    #[must_use]
    pub fn is_live(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|node| node.live)
    }

    /// Whether `id` is live and has never been placed in the document.
    #[must_use]
    pub fn is_detached(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|node| node.live && !node.in_document)
    }

    /// Mark `id` deleted.
    pub fn release(&mut self, id: NodeId) {
        if let Some(node) = self.get_mut(id) {
            node.live = false;
            node.in_document = false;
            node.begin = None;
            node.end = None;
        }
    }

    /// Ancestors of `id`, nearest first.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            arena: self,
            current: self.parent(id),
        }
    }

    /// Whether `ancestor` encloses `descendant`. A node is not its own descendant.
    #[must_use]
    pub fn is_descendant_of(&self, descendant: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(descendant).any(|id| id == ancestor)
    }

    /// Number of nodes allocated since the last clear.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether nothing has been allocated since the last clear.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

/// Iterator over a node's ancestors, from [`NodeArena::ancestors`].
pub struct Ancestors<'a> {
    arena: &'a NodeArena,
    current: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = self.arena.parent(id);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol_table::SymbolTable;

    fn element(tag: &str) -> NodeKind {
        let mut folded = SymbolTable::case_folded();
        let mut preserved = SymbolTable::case_preserving();
        NodeKind::Element(HtmlElement::new(HtmlName::new(
            tag,
            &mut folded,
            &mut preserved,
        )))
    }

    #[test]
    fn test_ancestors() {
        let mut arena = NodeArena::new();
        let html = arena.alloc(element("html"), None);
        let body = arena.alloc(element("body"), Some(html));
        let text = arena.alloc(NodeKind::Characters("hi".to_string()), Some(body));
        assert_eq!(arena.ancestors(text).collect::<Vec<_>>(), vec![body, html]);
        assert!(arena.is_descendant_of(text, html));
        assert!(!arena.is_descendant_of(html, html));
        assert!(arena.is_live(text));
        assert!(arena.is_detached(text));
        arena.release(text);
        assert!(!arena.is_live(text));
        assert!(!arena.is_detached(text));
        assert_eq!(arena.get(text).and_then(|n| n.kind.contents()), Some("hi"));
    }

    #[test]
    fn test_default_close_style() {
        let mut arena = NodeArena::new();
        let br = arena.alloc(element("br"), None);
        let div = arena.alloc(element("DIV"), None);
        assert_eq!(
            arena.element(br).map(HtmlElement::close_style),
            Some(CloseStyle::ImplicitClose)
        );
        assert_eq!(
            arena.element(div).map(HtmlElement::close_style),
            Some(CloseStyle::ExplicitClose)
        );
    }
}
