use std::collections::HashMap;

use quill_dom::{NodeId, QuoteStyle};
use strum_macros::Display;

use super::helpers::{
    is_legal_attr_name_char, is_legal_attr_val_char, is_legal_tag_char, is_legal_tag_first_char,
    is_space,
};
use crate::parser::HtmlParse;

/// Remainder of `<![CDATA[` after the `<![` that enters the CDATA states.
const CDATA_OPEN: &[u8] = b"CDATA[";

/// Lexer states. The doc on each variant says what was just consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub(crate) enum LexerState {
    /// Plain text.
    #[default]
    Start,
    /// `<`
    Tag,
    /// `<x`, accumulating the tag name.
    TagOpen,
    /// `</`, accumulating the tag name.
    TagClose,
    /// `</x `, where only whitespace or `>` may follow.
    TagCloseTerminate,
    /// `<x/`
    TagBriefClose,
    /// A `/` after the tag name or an attribute was complete.
    TagBriefCloseAttr,
    /// `<!`
    CommentStart1,
    /// `<!-`
    CommentStart2,
    /// `<!--`
    CommentBody,
    /// A `-` inside a comment.
    CommentEnd1,
    /// `--` inside a comment.
    CommentEnd2,
    /// `<![` plus the first `n` bytes of `CDATA[`.
    CdataStart(usize),
    /// `<![CDATA[`
    CdataBody,
    /// A `]` inside CDATA.
    CdataEnd1,
    /// `]]` inside CDATA.
    CdataEnd2,
    /// Whitespace inside a tag, between attributes.
    TagAttribute,
    /// `<x y`
    TagAttrName,
    /// `<x y `, which may be followed by `=` or a new attribute.
    TagAttrNameSpace,
    /// `<x y=`
    TagAttrEq,
    /// `<x y=z`
    TagAttrVal,
    /// `<x y="`
    TagAttrValDq,
    /// `<x y='`
    TagAttrValSq,
    /// Inside the raw body of a literal element such as `<script>`.
    LiteralTag,
    /// `<!x`, accumulating a directive such as the doctype.
    Directive,
}

/// Lenient, byte-faithful HTML lexer.
///
/// Every consumed character is kept in `literal` until it has been
/// successfully lexed as markup, so anything the lexer cannot make sense of
/// is passed through as Characters exactly as it appeared. The lexer never
/// rejects input.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug)]
pub(crate) struct HtmlLexer {
    pub(super) state: LexerState,
    /// Tag name, comment body or directive being accumulated.
    pub(super) token: String,
    /// Raw text consumed since the last emitted event.
    pub(super) literal: String,
    /// `</name>` that ends the current literal element.
    pub(super) literal_close: String,
    pub(super) attr_name: String,
    pub(super) attr_value: String,
    pub(super) attr_quote: QuoteStyle,
    pub(super) has_attr_value: bool,
    /// Element whose start tag is being lexed, once it has attributes.
    pub(super) element: Option<NodeId>,
    /// Open elements, innermost last.
    pub(super) element_stack: Vec<NodeId>,
    /// Close tags that were implied early and whose explicit close will
    /// show up later, keyed by tag spelling.
    pub(super) missing_close_tags: HashMap<String, usize>,
    pub(super) line: u32,
    pub(super) tag_start_line: u32,
    size_limit: Option<usize>,
    bytes_seen: usize,
    size_limit_exceeded: bool,
}

impl Default for HtmlLexer {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlLexer {
    pub(crate) fn new() -> Self {
        Self {
            state: LexerState::Start,
            token: String::new(),
            literal: String::new(),
            literal_close: String::new(),
            attr_name: String::new(),
            attr_value: String::new(),
            attr_quote: QuoteStyle::NoQuote,
            has_attr_value: false,
            element: None,
            element_stack: Vec::new(),
            missing_close_tags: HashMap::new(),
            line: 1,
            tag_start_line: 1,
            size_limit: None,
            bytes_seen: 0,
            size_limit_exceeded: false,
        }
    }

    /// Reset for a new document.
    pub(crate) fn start_parse(&mut self, size_limit: Option<usize>) {
        *self = Self {
            size_limit,
            ..Self::new()
        };
    }

    pub(crate) const fn size_limit_exceeded(&self) -> bool {
        self.size_limit_exceeded
    }

    pub(crate) const fn line(&self) -> u32 {
        self.line
    }

    /// The literal element (`<script>`, `<style>`, ...) whose body is being
    /// consumed, if any.
    pub(crate) fn open_literal_element(&self) -> Option<NodeId> {
        if self.state == LexerState::LiteralTag {
            self.element_stack.last().copied()
        } else {
            None
        }
    }

    /// Lex a chunk of input, emitting events into `parse`.
    pub(crate) fn parse(&mut self, parse: &mut HtmlParse, text: &str) {
        let text = self.apply_size_limit(text);
        for c in text.chars() {
            if c == '\n' {
                self.line += 1;
            }
            // Keep every character until it is known to be markup; whatever
            // is not consumed as markup is emitted verbatim.
            self.literal.push(c);
            match self.state {
                LexerState::Start => self.handle_start_state(parse, c),
                LexerState::Tag => self.handle_tag_state(parse, c),
                LexerState::TagOpen => self.handle_tag_open_state(parse, c),
                LexerState::TagClose | LexerState::TagCloseTerminate => {
                    self.handle_tag_close_state(parse, c);
                }
                LexerState::TagBriefClose => self.handle_tag_brief_close_state(parse, c),
                LexerState::TagBriefCloseAttr => self.handle_tag_brief_close_attr_state(parse, c),
                LexerState::CommentStart1 => self.handle_comment_start1_state(parse, c),
                LexerState::CommentStart2 => self.handle_comment_start2_state(parse, c),
                LexerState::CommentBody => self.handle_comment_body_state(c),
                LexerState::CommentEnd1 => self.handle_comment_end1_state(c),
                LexerState::CommentEnd2 => self.handle_comment_end2_state(parse, c),
                LexerState::CdataStart(matched) => self.handle_cdata_start_state(parse, matched, c),
                LexerState::CdataBody => self.handle_cdata_body_state(c),
                LexerState::CdataEnd1 => self.handle_cdata_end1_state(c),
                LexerState::CdataEnd2 => self.handle_cdata_end2_state(parse, c),
                LexerState::TagAttribute => self.handle_attribute_state(parse, c),
                LexerState::TagAttrName | LexerState::TagAttrNameSpace => {
                    self.handle_attr_name_state(parse, c);
                }
                LexerState::TagAttrEq => self.handle_attr_eq_state(parse, c),
                LexerState::TagAttrVal => self.handle_attr_val_state(parse, c),
                LexerState::TagAttrValDq => self.handle_attr_val_quoted_state(parse, c, '"'),
                LexerState::TagAttrValSq => self.handle_attr_val_quoted_state(parse, c, '\''),
                LexerState::LiteralTag => self.handle_literal_tag_state(parse, c),
                LexerState::Directive => self.handle_directive_state(parse, c),
            }
        }
    }

    /// Truncate `text` to what the size limit still allows.
    fn apply_size_limit<'a>(&mut self, text: &'a str) -> &'a str {
        if self.size_limit_exceeded {
            return "";
        }
        let Some(limit) = self.size_limit else {
            self.bytes_seen += text.len();
            return text;
        };
        let remaining = limit.saturating_sub(self.bytes_seen);
        if text.len() <= remaining {
            self.bytes_seen += text.len();
            return text;
        }
        let mut end = remaining;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        self.bytes_seen += end;
        self.size_limit_exceeded = true;
        &text[..end]
    }

    fn handle_start_state(&mut self, parse: &mut HtmlParse, c: char) {
        if c == '<' {
            let _ = self.literal.pop();
            self.emit_literal(parse);
            self.literal.push(c);
            self.state = LexerState::Tag;
            self.tag_start_line = self.line;
        } else {
            self.state = LexerState::Start;
        }
    }

    fn handle_tag_state(&mut self, parse: &mut HtmlParse, c: char) {
        if c == '/' {
            self.state = LexerState::TagClose;
        } else if is_legal_tag_first_char(c) {
            self.state = LexerState::TagOpen;
            self.token.push(c);
        } else if c == '!' {
            self.state = LexerState::CommentStart1;
        } else {
            self.syntax_error(parse, format_args!("Invalid tag syntax: unexpected sequence `<{c}'"));
            self.handle_start_state(parse, c);
        }
    }

    fn handle_tag_open_state(&mut self, parse: &mut HtmlParse, c: char) {
        if is_legal_tag_char(c) {
            self.token.push(c);
        } else if c == '>' {
            self.emit_tag_open(parse, true);
        } else if c == '/' {
            self.state = LexerState::TagBriefClose;
        } else if is_space(c) {
            self.state = LexerState::TagAttribute;
        } else {
            self.syntax_error(
                parse,
                format_args!("Invalid character `{c}' while parsing tag `{}'", self.token),
            );
            self.token.clear();
            self.state = LexerState::Start;
        }
    }

    /// `/` then something other than `>` after a complete attribute: the
    /// slash belongs to the attribute, as in `<a href=/search>`.
    fn handle_tag_brief_close_attr_state(&mut self, parse: &mut HtmlParse, c: char) {
        if c == '>' {
            self.finish_attribute(parse, c, self.has_attr_value, true);
        } else if is_space(c) {
            if !self.attr_name.is_empty() {
                if self.has_attr_value {
                    self.attr_value.push('/');
                }
                self.make_attribute(parse, self.has_attr_value);
            }
        } else if self.has_attr_value {
            self.attr_value.push('/');
            self.state = LexerState::TagAttrVal;
            self.handle_attr_val_state(parse, c);
        } else {
            self.attr_name.push('/');
            self.state = LexerState::TagAttrName;
            self.handle_attr_name_state(parse, c);
        }
    }

    fn handle_tag_brief_close_state(&mut self, parse: &mut HtmlParse, c: char) {
        if c == '>' {
            self.emit_tag_open(parse, false);
            self.emit_tag_brief_close(parse);
        } else {
            self.syntax_error(
                parse,
                format_args!("Invalid close tag syntax: expected `{}/>'", self.token),
            );
            if self.element.is_some() {
                self.token.push('/');
                self.state = LexerState::TagOpen;
                self.handle_tag_open_state(parse, c);
            } else {
                self.state = LexerState::Start;
                self.token.clear();
            }
        }
    }

    fn handle_tag_close_state(&mut self, parse: &mut HtmlParse, c: char) {
        if self.state != LexerState::TagCloseTerminate && is_legal_tag_char(c) {
            self.token.push(c);
        } else if is_space(c) {
            // `</ a>` waits for the name; `</a ` may only be followed by `>`.
            if !self.token.is_empty() {
                self.state = LexerState::TagCloseTerminate;
            }
        } else if c == '>' {
            self.emit_tag_close(parse, quill_dom::CloseStyle::ExplicitClose);
        } else {
            self.syntax_error(
                parse,
                format_args!("Invalid tag syntax: expected `>' after `</{}' got `{c}'", self.token),
            );
            self.token.clear();
            self.handle_start_state(parse, c);
        }
    }

    fn handle_directive_state(&mut self, parse: &mut HtmlParse, c: char) {
        if c == '>' {
            self.emit_directive(parse);
        } else {
            self.token.push(c);
        }
    }

    /// Give up on a partially matched sequence and re-examine `c` as text.
    fn restart(&mut self, parse: &mut HtmlParse, c: char) {
        let _ = self.literal.pop();
        self.emit_literal(parse);
        self.literal.push(c);
        self.handle_start_state(parse, c);
    }

    fn handle_comment_start1_state(&mut self, parse: &mut HtmlParse, c: char) {
        if c == '-' {
            self.state = LexerState::CommentStart2;
        } else if c == '[' {
            self.state = LexerState::CdataStart(0);
        } else if is_legal_tag_char(c) && c != '<' {
            self.state = LexerState::Directive;
            self.handle_directive_state(parse, c);
        } else {
            self.syntax_error(parse, "Invalid comment syntax");
            self.restart(parse, c);
        }
    }

    fn handle_comment_start2_state(&mut self, parse: &mut HtmlParse, c: char) {
        if c == '-' {
            self.state = LexerState::CommentBody;
        } else {
            self.syntax_error(parse, "Invalid comment syntax");
            self.restart(parse, c);
        }
    }

    fn handle_comment_body_state(&mut self, c: char) {
        if c == '-' {
            self.state = LexerState::CommentEnd1;
        } else {
            self.token.push(c);
        }
    }

    fn handle_comment_end1_state(&mut self, c: char) {
        if c == '-' {
            self.state = LexerState::CommentEnd2;
        } else {
            self.token.push('-');
            self.token.push(c);
            self.state = LexerState::CommentBody;
        }
    }

    fn handle_comment_end2_state(&mut self, parse: &mut HtmlParse, c: char) {
        match c {
            '>' => self.emit_comment(parse),
            // Any run of dashes may precede the `>`.
            '-' => self.token.push('-'),
            _ => {
                self.token.push_str("--");
                self.token.push(c);
                self.state = LexerState::CommentBody;
            }
        }
    }

    fn handle_cdata_start_state(&mut self, parse: &mut HtmlParse, matched: usize, c: char) {
        if CDATA_OPEN.get(matched).is_some_and(|&expected| c == char::from(expected)) {
            self.state = if matched + 1 == CDATA_OPEN.len() {
                LexerState::CdataBody
            } else {
                LexerState::CdataStart(matched + 1)
            };
        } else {
            self.syntax_error(parse, "Invalid CDATA syntax");
            self.restart(parse, c);
        }
    }

    fn handle_cdata_body_state(&mut self, c: char) {
        if c == ']' {
            self.state = LexerState::CdataEnd1;
        } else {
            self.token.push(c);
        }
    }

    fn handle_cdata_end1_state(&mut self, c: char) {
        if c == ']' {
            self.state = LexerState::CdataEnd2;
        } else {
            self.token.push(']');
            self.token.push(c);
            self.state = LexerState::CdataBody;
        }
    }

    fn handle_cdata_end2_state(&mut self, parse: &mut HtmlParse, c: char) {
        match c {
            '>' => self.emit_cdata(parse),
            ']' => self.token.push(']'),
            _ => {
                self.token.push_str("]]");
                self.token.push(c);
                self.state = LexerState::CdataBody;
            }
        }
    }

    /// Inside `<script>` and friends nothing is markup until the matching
    /// close tag, compared ASCII case-insensitively.
    fn handle_literal_tag_state(&mut self, parse: &mut HtmlParse, c: char) {
        if c != '>' {
            return;
        }
        let Some(start) = self.literal.len().checked_sub(self.literal_close.len()) else {
            return;
        };
        let closes = self
            .literal
            .get(start..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(&self.literal_close));
        if closes {
            self.literal.truncate(start);
            self.emit_literal(parse);
            let end = self.literal_close.len().saturating_sub(1);
            self.token = self.literal_close.get(2..end).unwrap_or_default().to_string();
            self.emit_tag_close(parse, quill_dom::CloseStyle::ExplicitClose);
        }
    }

    fn handle_attribute_state(&mut self, parse: &mut HtmlParse, c: char) {
        self.make_element(parse);
        self.attr_name.clear();
        self.attr_value.clear();
        if c == '>' {
            self.emit_tag_open(parse, true);
        } else if c == '/' {
            self.state = LexerState::TagBriefCloseAttr;
        } else if is_legal_attr_name_char(c) {
            self.attr_name.push(c);
            self.state = LexerState::TagAttrName;
        } else if !is_space(c) {
            self.syntax_error(parse, format_args!("Unexpected char `{c}' in attribute list"));
        }
    }

    fn handle_attr_name_state(&mut self, parse: &mut HtmlParse, c: char) {
        if c == '=' {
            self.state = LexerState::TagAttrEq;
            self.has_attr_value = true;
        } else if is_legal_attr_name_char(c) && self.state != LexerState::TagAttrNameSpace {
            self.attr_name.push(c);
        } else if is_space(c) {
            self.state = LexerState::TagAttrNameSpace;
        } else if c == '>' {
            self.make_attribute(parse, false);
            self.emit_tag_open(parse, true);
        } else if self.state == LexerState::TagAttrNameSpace {
            // `<x y z`: `y` is complete and `z` starts the next attribute.
            self.make_attribute(parse, false);
            self.state = LexerState::TagAttrName;
            self.attr_name.push(c);
        } else {
            self.finish_attribute(parse, c, false, false);
        }
    }

    fn handle_attr_eq_state(&mut self, parse: &mut HtmlParse, c: char) {
        if is_legal_attr_val_char(c) {
            self.state = LexerState::TagAttrVal;
            self.attr_quote = QuoteStyle::NoQuote;
            self.handle_attr_val_state(parse, c);
        } else if c == '"' {
            self.attr_quote = QuoteStyle::DoubleQuote;
            self.state = LexerState::TagAttrValDq;
        } else if c == '\'' {
            self.attr_quote = QuoteStyle::SingleQuote;
            self.state = LexerState::TagAttrValSq;
        } else if !is_space(c) {
            self.finish_attribute(parse, c, true, false);
        }
    }

    fn handle_attr_val_state(&mut self, parse: &mut HtmlParse, c: char) {
        if is_space(c) || c == '>' {
            self.finish_attribute(parse, c, true, false);
        } else {
            self.attr_value.push(c);
        }
    }

    fn handle_attr_val_quoted_state(&mut self, parse: &mut HtmlParse, c: char, quote: char) {
        if c == quote {
            self.make_attribute(parse, true);
        } else {
            self.attr_value.push(c);
        }
    }

    fn finish_attribute(&mut self, parse: &mut HtmlParse, c: char, has_value: bool, brief_close: bool) {
        if is_space(c) {
            self.make_attribute(parse, has_value);
            self.state = LexerState::TagAttribute;
        } else if c == '/' {
            // Could be `<x y=z/>` or an attribute containing a slash; the
            // next character decides.
            self.state = LexerState::TagBriefCloseAttr;
        } else if c == '>' {
            let mut brief_close = brief_close;
            if !self.attr_name.is_empty() {
                if !brief_close && self.attr_name == "/" && !has_value {
                    brief_close = true;
                    self.attr_name.clear();
                    self.attr_value.clear();
                } else {
                    self.make_attribute(parse, has_value);
                }
            }
            self.emit_tag_open(parse, !brief_close);
            if brief_close {
                self.emit_tag_brief_close(parse);
            }
            self.has_attr_value = false;
        } else {
            self.syntax_error(parse, format_args!("Unexpected character in attribute: {c}"));
            self.make_attribute(parse, has_value);
            self.has_attr_value = false;
        }
    }
}
