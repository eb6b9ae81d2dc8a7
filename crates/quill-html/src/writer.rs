//! Serializing the event stream back to HTML.

use std::cell::RefCell;
use std::rc::Rc;

use quill_dom::{CloseStyle, HtmlElement, NodeId, QuoteStyle};

use crate::filter::HtmlFilter;
use crate::parser::HtmlParse;

/// A shared, growable output buffer.
///
/// Clones share the same buffer, so a caller can keep one handle while the
/// writer filter owned by the parse holds another.
#[derive(Debug, Clone, Default)]
pub struct StringWriter(Rc<RefCell<String>>);

impl StringWriter {
    /// Append `text`.
    pub fn write(&self, text: &str) {
        self.0.borrow_mut().push_str(text);
    }

    /// Everything written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        self.0.borrow().clone()
    }

    /// Take everything written so far, leaving the buffer empty.
    #[must_use]
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    /// Discard the buffer.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Writes every event it sees to a [`StringWriter`].
///
/// Names and attribute quoting echo what was parsed, so an unmodified
/// document is written back as it arrived, apart from the whitespace
/// between attributes.
#[derive(Debug)]
pub struct HtmlWriterFilter {
    writer: StringWriter,
    case_fold: bool,
}

impl HtmlWriterFilter {
    /// A writer appending to `writer`.
    #[must_use]
    pub const fn new(writer: StringWriter) -> Self {
        Self {
            writer,
            case_fold: false,
        }
    }

    /// Lowercase tag and attribute names on output.
    pub const fn set_case_fold(&mut self, case_fold: bool) {
        self.case_fold = case_fold;
    }

    fn lowercase(&self, parse: &HtmlParse) -> bool {
        self.case_fold || parse.doctype().is_xhtml()
    }

    fn write_name(&self, name: &str, lowercase: bool) {
        if lowercase {
            self.writer.write(&name.to_ascii_lowercase());
        } else {
            self.writer.write(name);
        }
    }

    fn write_start_tag(&self, element: &HtmlElement, lowercase: bool, xhtml: bool) {
        self.writer.write("<");
        self.write_name(element.name().as_str(), lowercase);
        for attribute in element.attributes() {
            self.writer.write(" ");
            self.write_name(attribute.name().as_str(), lowercase);
            match attribute.escaped_value() {
                Some(value) => {
                    let quote = attribute.quote_style().as_str();
                    self.writer.write("=");
                    self.writer.write(quote);
                    self.writer.write(value);
                    self.writer.write(quote);
                }
                None if xhtml => self.writer.write("=\"\""),
                None => {}
            }
        }
        let last = element.attributes().last();
        if element.close_style() == CloseStyle::BriefClose {
            // A bare or unquoted last attribute would absorb the slash.
            let bare_last = last.is_some_and(|a| {
                a.escaped_value().is_none() || a.quote_style() == QuoteStyle::NoQuote
            });
            self.writer.write(if bare_last { " />" } else { "/>" });
        } else if last.is_some_and(|a| {
            a.quote_style() == QuoteStyle::NoQuote
                && a.escaped_value().is_some_and(|v| v.ends_with('/'))
        }) {
            // `<a href=/>` would read back as a brief close.
            self.writer.write(" >");
        } else {
            self.writer.write(">");
        }
    }

    fn write_leaf(&self, parse: &HtmlParse, node: NodeId, open: &str, close: &str) {
        if let Some(text) = parse.contents(node) {
            self.writer.write(open);
            self.writer.write(text);
            self.writer.write(close);
        }
    }
}

impl HtmlFilter for HtmlWriterFilter {
    fn start_element(&mut self, parse: &mut HtmlParse, element: NodeId) {
        let lowercase = self.lowercase(parse);
        let xhtml = parse.doctype().is_xhtml();
        if let Some(element) = parse.element(element)
            && element.close_style() != CloseStyle::Invisible
        {
            self.write_start_tag(element, lowercase, xhtml);
        }
    }

    fn end_element(&mut self, parse: &mut HtmlParse, element: NodeId) {
        let lowercase = self.lowercase(parse);
        if let Some(element) = parse.element(element)
            && element.close_style() == CloseStyle::ExplicitClose
        {
            self.writer.write("</");
            self.write_name(element.name().as_str(), lowercase);
            self.writer.write(">");
        }
    }

    fn characters(&mut self, parse: &mut HtmlParse, node: NodeId) {
        self.write_leaf(parse, node, "", "");
    }

    fn comment(&mut self, parse: &mut HtmlParse, node: NodeId) {
        self.write_leaf(parse, node, "<!--", "-->");
    }

    fn cdata(&mut self, parse: &mut HtmlParse, node: NodeId) {
        self.write_leaf(parse, node, "<![CDATA[", "]]>");
    }

    fn directive(&mut self, parse: &mut HtmlParse, node: NodeId) {
        self.write_leaf(parse, node, "<!", ">");
    }

    fn ie_directive(&mut self, parse: &mut HtmlParse, node: NodeId) {
        self.write_leaf(parse, node, "<!--", "-->");
    }

    fn name(&self) -> &'static str {
        "HtmlWriter"
    }

    fn id(&self) -> &'static str {
        "hw"
    }
}
