use std::fmt;

use quill_dom::{
    keywords, Attribute, CloseStyle, HtmlElement, HtmlName, Keyword, NodeId, NodeKind, QuoteStyle,
};

use super::core::{HtmlLexer, LexerState};
use crate::parser::HtmlParse;

// ===== Character classes =====

pub(super) const fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r')
}

/// Non-ASCII characters are accepted anywhere a name character is.
const fn is_i18n(c: char) -> bool {
    !c.is_ascii()
}

pub(super) const fn is_legal_tag_first_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '?'
}

pub(super) const fn is_legal_tag_char(c: char) -> bool {
    is_i18n(c) || c.is_ascii_alphanumeric() || matches!(c, '<' | '-' | '#' | '_' | ':')
}

pub(super) const fn is_legal_attr_name_char(c: char) -> bool {
    is_i18n(c) || (!matches!(c, '=' | '>' | '/') && !is_space(c))
}

pub(super) const fn is_legal_attr_val_char(c: char) -> bool {
    is_i18n(c) || (!matches!(c, '=' | '>' | '/' | '"' | '\'') && !is_space(c))
}

fn keyword_of(parse: &HtmlParse, element: NodeId) -> Keyword {
    parse.element(element).map_or(Keyword::NotAKeyword, HtmlElement::keyword)
}

fn name_of(parse: &HtmlParse, element: NodeId) -> String {
    parse
        .element(element)
        .map(|e| e.name().as_str().to_string())
        .unwrap_or_default()
}

impl HtmlLexer {
    // ===== Diagnostics =====

    pub(super) fn syntax_error(&self, parse: &HtmlParse, message: impl fmt::Display) {
        tracing::debug!(url = parse.id(), line = self.line, "{message}");
    }

    // ===== Element stack =====

    /// The innermost open element.
    pub(super) fn parent(&self) -> Option<NodeId> {
        self.element_stack.last().copied()
    }

    /// Allocate the element for the tag being lexed, once it shows an
    /// attribute list.
    pub(super) fn make_element(&mut self, parse: &mut HtmlParse) {
        if self.element.is_some() {
            return;
        }
        if self.token.is_empty() {
            self.syntax_error(parse, "Making element with empty tag name");
        }
        let name = parse.make_name(&self.token);
        self.token.clear();
        self.element = Some(self.new_element(parse, name));
    }

    fn new_element(&self, parse: &mut HtmlParse, name: HtmlName) -> NodeId {
        parse.new_lexed_element(self.parent(), name, self.tag_start_line)
    }

    pub(super) fn make_attribute(&mut self, parse: &mut HtmlParse, has_value: bool) {
        if let Some(element) = self.element {
            let name = parse.make_name(&self.attr_name);
            let value = has_value.then_some(self.attr_value.as_str());
            let attribute = Attribute::new(name, value, self.attr_quote);
            if let Some(element) = parse.element_mut(element) {
                element.add_attribute(attribute);
            }
        }
        self.attr_name.clear();
        if has_value {
            self.has_attr_value = false;
        }
        self.attr_value.clear();
        self.attr_quote = QuoteStyle::NoQuote;
        self.state = LexerState::TagAttribute;
    }

    /// Search the open elements for the one a close tag (in `token`) ends.
    ///
    /// Elements skipped on the way are closed as unclosed. The search stops
    /// at an element that confines the close tag, such as a `</td>` that
    /// would otherwise escape its `<table>`.
    fn pop_element_matching_tag(&mut self, parse: &mut HtmlParse) -> Option<NodeId> {
        let closing = Keyword::lookup(&self.token);
        let mut found = None;
        for (index, &element) in self.element_stack.iter().enumerate().rev() {
            if keywords::is_contained(closing, keyword_of(parse, element)) {
                return None;
            }
            let matches = parse
                .element(element)
                .is_some_and(|e| e.name().as_str().eq_ignore_ascii_case(&self.token));
            if matches {
                found = Some(index);
                break;
            }
        }
        let index = found?;
        let skipped: Vec<NodeId> = self.element_stack.drain(index + 1..).rev().collect();
        for element in skipped {
            if !keywords::is_optionally_closed(keyword_of(parse, element)) {
                let name = name_of(parse, element);
                self.syntax_error(
                    parse,
                    format_args!("Unclosed element `{name}' closed by `</{}>'", self.token),
                );
                *self.missing_close_tags.entry(name).or_insert(0) += 1;
            }
            parse.close_element(element, CloseStyle::Unclosed, self.line);
        }
        self.element_stack.pop()
    }

    // ===== Emitters =====

    /// Emit accumulated raw text as Characters.
    pub(super) fn emit_literal(&mut self, parse: &mut HtmlParse) {
        if !self.literal.is_empty() {
            let text = std::mem::take(&mut self.literal);
            let _ = parse.add_leaf(NodeKind::Characters(text), self.parent(), self.tag_start_line);
        }
        self.state = LexerState::Start;
    }

    pub(super) fn emit_comment(&mut self, parse: &mut HtmlParse) {
        self.literal.clear();
        let body = std::mem::take(&mut self.token);
        let kind = if body.contains("[if") || body.contains("[endif]") {
            NodeKind::IeDirective(body)
        } else {
            NodeKind::Comment(body)
        };
        let _ = parse.add_leaf(kind, self.parent(), self.tag_start_line);
        self.state = LexerState::Start;
    }

    pub(super) fn emit_cdata(&mut self, parse: &mut HtmlParse) {
        self.literal.clear();
        let body = std::mem::take(&mut self.token);
        let _ = parse.add_leaf(NodeKind::Cdata(body), self.parent(), self.tag_start_line);
        self.state = LexerState::Start;
    }

    pub(super) fn emit_directive(&mut self, parse: &mut HtmlParse) {
        self.literal.clear();
        let body = std::mem::take(&mut self.token);
        parse.observe_directive(&body);
        let _ = parse.add_leaf(NodeKind::Directive(body), self.parent(), self.tag_start_line);
        self.state = LexerState::Start;
    }

    /// Emit the start tag being lexed.
    ///
    /// `allow_implicit_close` is false when a brief close follows, so void
    /// tags written as `<br/>` keep their brief close style.
    pub(super) fn emit_tag_open(&mut self, parse: &mut HtmlParse, allow_implicit_close: bool) {
        if self.token.is_empty() && self.element.is_none() {
            self.syntax_error(parse, "Making element with empty tag name");
        }
        let keyword = match self.element {
            Some(element) => keyword_of(parse, element),
            None => Keyword::lookup(&self.token),
        };

        let auto_closed = self
            .parent()
            .filter(|&open| keywords::is_auto_close(keyword_of(parse, open), keyword));
        if let Some(open) = auto_closed {
            let _ = self.element_stack.pop();
            parse.close_element(open, CloseStyle::AutoClose, self.line);
        }

        self.literal.clear();
        let element = match self.element.take() {
            Some(element) => {
                // The parent was fixed when the element was made, before any
                // auto-close above.
                parse.set_parent(element, self.parent());
                element
            }
            None => {
                let name = parse.make_name(&self.token);
                self.token.clear();
                self.new_element(parse, name)
            }
        };
        parse.add_element(element, self.tag_start_line);
        self.element_stack.push(element);

        if keywords::is_literal_tag(keyword) {
            self.state = LexerState::LiteralTag;
            self.literal_close = format!("</{}>", name_of(parse, element));
        } else {
            self.state = LexerState::Start;
        }

        if allow_implicit_close && keywords::is_implicitly_closed(keyword) {
            let _ = self.element_stack.pop();
            parse.close_element(element, CloseStyle::ImplicitClose, self.line);
        }
    }

    pub(super) fn emit_tag_brief_close(&mut self, parse: &mut HtmlParse) {
        if let Some(element) = self.element_stack.pop() {
            if !keywords::allows_brief_termination(keyword_of(parse, element)) {
                let name = name_of(parse, element);
                self.syntax_error(parse, format_args!("Tag `{name}' does not allow brief termination"));
            }
            parse.close_element(element, CloseStyle::BriefClose, self.line);
        }
        self.state = LexerState::Start;
    }

    /// Emit a close tag for the name in `token`.
    ///
    /// A close tag with no matching open element, or one whose element was
    /// already closed by an earlier mismatch, is kept as text.
    pub(super) fn emit_tag_close(&mut self, parse: &mut HtmlParse, close_style: CloseStyle) {
        let in_bag = match self.missing_close_tags.get_mut(&self.token) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        };
        let element = if in_bag {
            None
        } else {
            self.pop_element_matching_tag(parse)
        };

        match element {
            Some(element) => parse.close_element(element, close_style, self.line),
            None => {
                if !in_bag {
                    self.syntax_error(
                        parse,
                        format_args!("Unexpected close-tag `</{}>', no tags are open", self.token),
                    );
                }
                self.emit_literal(parse);
            }
        }
        self.literal.clear();
        self.token.clear();
        self.state = LexerState::Start;
    }

    // ===== Document boundaries =====

    /// Emit whatever was consumed since the last event, but only between
    /// tags; partial markup waits for the next chunk.
    pub(crate) fn flush(&mut self, parse: &mut HtmlParse) {
        if self.state == LexerState::Start && !self.literal.is_empty() {
            self.emit_literal(parse);
        }
    }

    /// End of input: emit the leftovers and close every open element.
    pub(crate) fn finish(&mut self, parse: &mut HtmlParse) {
        if !self.token.is_empty() {
            self.syntax_error(parse, format_args!("End-of-file in mid-token: {}", self.token));
            self.token.clear();
        }
        if !self.attr_name.is_empty() {
            self.syntax_error(
                parse,
                format_args!("End-of-file in mid-attribute-name: {}", self.attr_name),
            );
            self.attr_name.clear();
        }
        if !self.attr_value.is_empty() {
            self.syntax_error(
                parse,
                format_args!("End-of-file in mid-attribute-value: {}", self.attr_value),
            );
            self.attr_value.clear();
        }
        if !self.literal.is_empty() {
            self.emit_literal(parse);
        }
        while let Some(element) = self.element_stack.pop() {
            if !keywords::is_optionally_closed(keyword_of(parse, element)) {
                let name = name_of(parse, element);
                self.syntax_error(parse, format_args!("End-of-file with open tag: {name}"));
            }
            parse.close_element(element, CloseStyle::Unclosed, self.line);
        }
        self.element = None;
        self.state = LexerState::Start;
    }
}
