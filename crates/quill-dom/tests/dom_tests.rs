//! Tests for attribute values, names and the element model.

use pretty_assertions::assert_eq;
use quill_dom::{
    Attribute, CloseStyle, HtmlElement, HtmlName, Keyword, NodeArena, NodeKind, QuoteStyle,
    SymbolTable,
};

struct Names {
    folded: SymbolTable,
    preserved: SymbolTable,
}

impl Names {
    fn new() -> Self {
        Self {
            folded: SymbolTable::case_folded(),
            preserved: SymbolTable::case_preserving(),
        }
    }

    fn make(&mut self, text: &str) -> HtmlName {
        HtmlName::new(text, &mut self.folded, &mut self.preserved)
    }
}

#[test]
fn test_escaped_single_quote_decodes() {
    let mut names = Names::new();
    let src = Attribute::new(
        names.make("src"),
        Some("my&#39;single_quoted_image.jpg"),
        QuoteStyle::SingleQuote,
    );
    assert_eq!(src.decoded_value(), Some("my'single_quoted_image.jpg"));
    assert_eq!(src.escaped_value(), Some("my&#39;single_quoted_image.jpg"));
    assert!(!src.decoding_error());
}

#[test]
fn test_undecodable_value_keeps_escaped_text() {
    let mut names = Names::new();
    let alt = Attribute::new(names.make("alt"), Some("a&hellip;"), QuoteStyle::DoubleQuote);
    assert!(alt.decoding_error());
    assert_eq!(alt.decoded_value(), None);
    assert_eq!(alt.escaped_value(), Some("a&hellip;"));
}

#[test]
fn test_set_value_escapes() {
    let mut names = Names::new();
    let mut href = Attribute::new(names.make("href"), None, QuoteStyle::NoQuote);
    href.set_value("/a?b=1&c=\"2\"");
    assert_eq!(href.escaped_value(), Some("/a?b=1&amp;c=&quot;2&quot;"));
    assert_eq!(href.decoded_value(), Some("/a?b=1&c=\"2\""));
    assert_eq!(href.quote_style(), QuoteStyle::DoubleQuote);
}

#[test]
fn test_element_attribute_api() {
    let mut names = Names::new();
    let mut link = HtmlElement::new(names.make("LINK"));
    assert_eq!(link.close_style(), CloseStyle::ImplicitClose);
    link.add_attribute_value(names.make("rel"), Some("stylesheet"));
    link.add_attribute_value(names.make("Media"), Some("screen"));
    link.add_attribute_value(names.make("data-x"), None);

    assert_eq!(link.attribute_value(Keyword::Rel), Some("stylesheet"));
    assert_eq!(link.attribute_value(Keyword::Media), Some("screen"));
    assert!(link.find_attribute_named("DATA-X").is_some());
    assert!(link.delete_attribute(Keyword::Media));
    assert!(!link.delete_attribute(Keyword::Media));
    let names: Vec<&str> = link.attributes().iter().map(|a| a.name().as_str()).collect();
    assert_eq!(names, vec!["rel", "data-x"]);
}

#[test]
fn test_arena_marks_nodes() {
    let mut names = Names::new();
    let mut arena = NodeArena::new();
    let style = arena.alloc(NodeKind::Element(HtmlElement::new(names.make("style"))), None);
    let css = arena.alloc(NodeKind::Characters("p{}".to_string()), Some(style));
    assert_eq!(arena.len(), 2);
    assert_eq!(arena.element(style).map(HtmlElement::keyword), Some(Keyword::Style));
    assert!(arena.element(css).is_none());

    if let Some(node) = arena.get_mut(css) {
        node.live = false;
        node.parent = None;
    }
    assert!(!arena.is_live(css));
    assert!(!arena.is_descendant_of(css, style));

    arena.clear();
    assert!(arena.is_empty());
    assert!(arena.get(style).is_none());
}
