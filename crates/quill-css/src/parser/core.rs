use tracing::debug;

use super::compact::{compact_text, selector_text};
use crate::ast::{Declaration, Import, Ruleset, RulesetContent, StyleRule, Stylesheet};
use crate::error::CssParseError;
use crate::media::{MediaQuery, vectorize_media_attribute};
use crate::selector::parse_selector_list;
use crate::tokenizer::{CssToken, Span, Token, tokenize};

static EOF: Token = Token {
    kind: CssToken::Eof,
    span: Span { start: 0, end: 0 },
};

/// How a prelude ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    /// `;`, consumed.
    Semicolon,
    /// `{`, not consumed.
    Block,
    /// A `}` closing an enclosing block, not consumed.
    CloseBrace,
    Eof,
}

/// [§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing)
///
/// A stylesheet parser in preservation mode: constructs it does not model
/// are kept as source text rather than dropped.
pub struct CssParser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    position: usize,
    errors: Vec<CssParseError>,
    strict: bool,
}

impl<'a> CssParser<'a> {
    /// Tokenize `source` for parsing.
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            tokens: tokenize(source),
            position: 0,
            errors: Vec::new(),
            strict: false,
        }
    }

    /// In strict mode an `@import` after the first ruleset is an error
    /// instead of an unparsed region.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Errors seen so far, in source order.
    #[must_use]
    pub fn errors(&self) -> &[CssParseError] {
        &self.errors
    }

    /// [§ 5.3.3 Parse a stylesheet](https://www.w3.org/TR/css-syntax-3/#parse-stylesheet)
    ///
    /// Always produces a stylesheet; check [`Self::errors`] for problems.
    pub fn parse_stylesheet(&mut self) -> Stylesheet {
        let mut sheet = Stylesheet::default();

        // [§ 5.4.1 Consume a list of rules](https://www.w3.org/TR/css-syntax-3/#consume-list-of-rules)
        loop {
            match self.peek() {
                CssToken::Eof => break,
                // "<whitespace-token>: Do nothing."
                // "<CDO-token> <CDC-token>: If the top-level flag is set, do nothing."
                CssToken::Whitespace | CssToken::Cdo | CssToken::Cdc => self.advance(),
                CssToken::RightBrace => {
                    let offset = self.offset();
                    self.error(CssParseError::UnexpectedCloseBrace { offset });
                    self.advance();
                }
                CssToken::AtKeyword(name) => {
                    let name = name.to_ascii_lowercase();
                    self.consume_top_level_at_rule(&name, &mut sheet);
                }
                // "anything else: Reconsume the current input token. Consume a
                // qualified rule."
                _ => {
                    if let Some(ruleset) = self.consume_qualified_rule(&[]) {
                        sheet.rulesets.push(ruleset);
                    }
                }
            }
        }
        sheet
    }

    fn consume_top_level_at_rule(&mut self, name: &str, sheet: &mut Stylesheet) {
        let start = self.offset();
        match name {
            "charset" if sheet.charset.is_none() && sheet.is_empty() => {
                self.advance();
                let (from, to, terminator) = self.consume_prelude(true);
                if terminator == Terminator::Semicolon
                    && let [CssToken::String(charset)] = self.significant(from, to).as_slice()
                {
                    sheet.charset = Some(charset.clone());
                    return;
                }
                sheet.rulesets.push(self.finish_unparsed(start, terminator, &[]));
            }
            "import" => {
                self.advance();
                let (from, to, terminator) = self.consume_prelude(true);
                if !sheet.rulesets.is_empty() {
                    if self.strict {
                        self.error(CssParseError::ImportAfterRules { offset: start });
                    }
                    sheet.rulesets.push(self.finish_unparsed(start, terminator, &[]));
                    return;
                }
                if !matches!(terminator, Terminator::Semicolon | Terminator::Eof) {
                    sheet.rulesets.push(self.finish_unparsed(start, terminator, &[]));
                    return;
                }
                if let Some(import) = self.import_from_prelude(from, to) {
                    sheet.imports.push(import);
                } else {
                    sheet.rulesets.push(self.finish_unparsed(start, terminator, &[]));
                }
            }
            "media" => {
                self.advance();
                let (from, to, terminator) = self.consume_prelude(true);
                if terminator != Terminator::Block {
                    sheet.rulesets.push(self.finish_unparsed(start, terminator, &[]));
                    return;
                }
                let media = self.media_list(from, to);
                self.consume_media_block(&media, &mut sheet.rulesets);
            }
            _ => {
                let ruleset = self.consume_unparsed_at_rule(&[]);
                sheet.rulesets.push(ruleset);
            }
        }
    }

    /// `@import url(...) media;`, `@import "..." media;` or
    /// `@import url("...") media;`.
    fn import_from_prelude(&self, from: usize, to: usize) -> Option<Import> {
        let mut index = self.skip_whitespace(from, to);
        let url = match &self.token_at(index).kind {
            CssToken::Url(url) | CssToken::String(url) => url.clone(),
            CssToken::Function(name) if name.eq_ignore_ascii_case("url") => {
                index = self.skip_whitespace(index + 1, to);
                let CssToken::String(url) = &self.token_at(index).kind else {
                    return None;
                };
                index = self.skip_whitespace(index + 1, to);
                if !matches!(self.token_at(index).kind, CssToken::RightParen) {
                    return None;
                }
                url.clone()
            }
            _ => return None,
        };
        if index >= to {
            return None;
        }
        Some(Import {
            url,
            media: self.media_list(index + 1, to),
        })
    }

    /// The body of a top-level `@media`, with the current token at its `{`.
    fn consume_media_block(&mut self, media: &[MediaQuery], rulesets: &mut Vec<Ruleset>) {
        let open_at = self.offset();
        self.advance();
        loop {
            match self.peek() {
                CssToken::Whitespace | CssToken::Cdo | CssToken::Cdc => self.advance(),
                CssToken::RightBrace => {
                    self.advance();
                    return;
                }
                CssToken::Eof => {
                    self.error(CssParseError::UnclosedBlock { offset: open_at });
                    return;
                }
                // Nested at-rules are kept verbatim under the outer media.
                CssToken::AtKeyword(_) => {
                    let ruleset = self.consume_unparsed_at_rule(media);
                    rulesets.push(ruleset);
                }
                _ => {
                    if let Some(ruleset) = self.consume_qualified_rule(media) {
                        rulesets.push(ruleset);
                    }
                }
            }
        }
    }

    /// [§ 5.4.2 Consume an at-rule](https://www.w3.org/TR/css-syntax-3/#consume-at-rule)
    /// keeping only its text.
    fn consume_unparsed_at_rule(&mut self, media: &[MediaQuery]) -> Ruleset {
        let start = self.offset();
        self.advance();
        let (_, _, terminator) = self.consume_prelude(true);
        self.finish_unparsed(start, terminator, media)
    }

    /// Skip the rest of an at-rule whose prelude ended with `terminator`
    /// and return its source text as an unparsed region.
    fn finish_unparsed(
        &mut self,
        start: usize,
        terminator: Terminator,
        media: &[MediaQuery],
    ) -> Ruleset {
        if terminator == Terminator::Block {
            self.skip_block();
        }
        let text = self
            .source
            .get(start..self.consumed_end())
            .unwrap_or_default()
            .trim_end();
        debug!(text, "keeping unparsed CSS region");
        Ruleset {
            media_queries: media.to_vec(),
            content: RulesetContent::Unparsed(text.to_string()),
        }
    }

    /// [§ 5.4.3 Consume a qualified rule](https://www.w3.org/TR/css-syntax-3/#consume-qualified-rule)
    fn consume_qualified_rule(&mut self, media: &[MediaQuery]) -> Option<Ruleset> {
        let start = self.offset();
        let (from, to, terminator) = self.consume_prelude(false);

        if terminator != Terminator::Block {
            // "<EOF-token>: This is a parse error. Return nothing." The text
            // is kept anyway.
            let text = self
                .source
                .get(start..self.consumed_end())
                .unwrap_or_default()
                .trim_end();
            return (!text.is_empty()).then(|| Ruleset {
                media_queries: media.to_vec(),
                content: RulesetContent::Unparsed(text.to_string()),
            });
        }

        let open_at = self.offset();
        let raw_prelude = self.source.get(start..open_at).unwrap_or_default();
        self.advance();
        let declarations = self.consume_declarations(open_at);

        let prelude = self.tokens.get(from..to).unwrap_or_default();
        let rule = match parse_selector_list(&selector_text(self.source, prelude)) {
            Some(selectors) => StyleRule {
                selectors,
                unparsed_selectors: None,
                declarations,
            },
            None => {
                debug!(selectors = raw_prelude, "keeping unparsable selector list");
                StyleRule {
                    selectors: Vec::new(),
                    unparsed_selectors: Some(raw_prelude.to_string()),
                    declarations,
                }
            }
        };
        Some(Ruleset {
            media_queries: media.to_vec(),
            content: RulesetContent::Style(rule),
        })
    }

    /// [§ 5.4.5 Consume a list of declarations](https://www.w3.org/TR/css-syntax-3/#consume-list-of-declarations)
    ///
    /// Runs through the `}` closing the block opened at `open_at`.
    fn consume_declarations(&mut self, open_at: usize) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        let mut from = self.position;
        let mut depth = 0_usize;
        loop {
            match self.peek() {
                CssToken::Eof => {
                    self.error(CssParseError::UnclosedBlock { offset: open_at });
                    declarations.extend(self.declaration(from, self.position));
                    return declarations;
                }
                CssToken::RightBrace if depth == 0 => {
                    declarations.extend(self.declaration(from, self.position));
                    self.advance();
                    return declarations;
                }
                CssToken::Semicolon if depth == 0 => {
                    declarations.extend(self.declaration(from, self.position));
                    self.advance();
                    from = self.position;
                }
                CssToken::LeftBrace
                | CssToken::LeftParen
                | CssToken::LeftBracket
                | CssToken::Function(_) => {
                    depth += 1;
                    self.advance();
                }
                CssToken::RightBrace | CssToken::RightParen | CssToken::RightBracket => {
                    depth = depth.saturating_sub(1);
                    self.advance();
                }
                _ => self.advance(),
            }
        }
    }

    /// [§ 5.4.6 Consume a declaration](https://www.w3.org/TR/css-syntax-3/#consume-declaration)
    /// from the tokens in `[from, to)`.
    fn declaration(&self, from: usize, to: usize) -> Option<Declaration> {
        let tokens = self.trimmed(from, to);
        let (first, last) = (tokens.first()?, tokens.last()?);
        let verbatim = || {
            Declaration::Verbatim(
                self.source
                    .get(first.span.start..last.span.end)
                    .unwrap_or_default()
                    .to_string(),
            )
        };

        // "Consume the next input token... if the next input token is
        // anything other than a <colon-token>, this is a parse error."
        let CssToken::Ident(name) = &first.kind else {
            return Some(verbatim());
        };
        let mut rest = tokens[1..].iter().skip_while(|t| t.kind.is_whitespace());
        if !matches!(rest.next().map(|t| &t.kind), Some(CssToken::Colon)) {
            return Some(verbatim());
        }
        let mut value: Vec<&Token> = rest.collect();

        // "If the last two non-<whitespace-token>s in the declaration's value
        // are a <delim-token> with the value "!" followed by an
        // <ident-token> with a value that is an ASCII case-insensitive match
        // for "important", remove them from the declaration's value and set
        // the declaration's important flag to true."
        let mut important = false;
        let significant: Vec<usize> = value
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.kind.is_whitespace())
            .map(|(i, _)| i)
            .collect();
        if let [.., bang, word] = significant.as_slice()
            && matches!(value[*bang].kind, CssToken::Delim('!'))
            && matches!(&value[*word].kind, CssToken::Ident(w) if w.eq_ignore_ascii_case("important"))
        {
            important = true;
            value.truncate(*bang);
        }

        let value_tokens: Vec<Token> = value.into_iter().cloned().collect();
        let value = compact_text(self.source, &value_tokens);
        if value.is_empty() {
            return Some(verbatim());
        }
        Some(Declaration::Property {
            name: name.to_ascii_lowercase(),
            value,
            important,
        })
    }

    /// Consume component values up to the end of a prelude. Returns the
    /// token range of the prelude and what ended it.
    ///
    /// At-rule preludes end at `;`; qualified rule preludes do not.
    fn consume_prelude(&mut self, semicolon_ends: bool) -> (usize, usize, Terminator) {
        let from = self.position;
        let mut depth = 0_usize;
        loop {
            let to = self.position;
            match self.peek() {
                CssToken::Eof => return (from, to, Terminator::Eof),
                CssToken::RightBrace => return (from, to, Terminator::CloseBrace),
                CssToken::LeftBrace if depth == 0 => return (from, to, Terminator::Block),
                CssToken::Semicolon if depth == 0 && semicolon_ends => {
                    self.advance();
                    return (from, to, Terminator::Semicolon);
                }
                CssToken::LeftParen | CssToken::LeftBracket | CssToken::Function(_) => {
                    depth += 1;
                }
                CssToken::RightParen | CssToken::RightBracket => {
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// [§ 5.4.8 Consume a simple block](https://www.w3.org/TR/css-syntax-3/#consume-simple-block)
    /// starting at its `{`, discarding the contents.
    fn skip_block(&mut self) {
        let open_at = self.offset();
        let mut depth = 0_usize;
        loop {
            match self.peek() {
                CssToken::Eof => {
                    self.error(CssParseError::UnclosedBlock { offset: open_at });
                    return;
                }
                CssToken::LeftBrace => depth += 1,
                CssToken::RightBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    fn media_list(&self, from: usize, to: usize) -> Vec<MediaQuery> {
        vectorize_media_attribute(&compact_text(self.source, self.trimmed(from, to)))
    }

    /// The tokens in `[from, to)` without leading or trailing whitespace.
    fn trimmed(&self, from: usize, to: usize) -> &[Token] {
        let tokens = self.tokens.get(from..to).unwrap_or_default();
        let start = tokens
            .iter()
            .position(|t| !t.kind.is_whitespace())
            .unwrap_or(tokens.len());
        let end = tokens
            .iter()
            .rposition(|t| !t.kind.is_whitespace())
            .map_or(start, |i| i + 1);
        &tokens[start..end]
    }

    /// The non-whitespace token kinds in `[from, to)`.
    fn significant(&self, from: usize, to: usize) -> Vec<CssToken> {
        self.trimmed(from, to)
            .iter()
            .filter(|t| !t.kind.is_whitespace())
            .map(|t| t.kind.clone())
            .collect()
    }

    fn skip_whitespace(&self, mut index: usize, to: usize) -> usize {
        while index < to && self.token_at(index).kind.is_whitespace() {
            index += 1;
        }
        index
    }

    fn token_at(&self, index: usize) -> &Token {
        self.tokens.get(index).unwrap_or(&EOF)
    }

    fn peek(&self) -> &CssToken {
        &self.token_at(self.position).kind
    }

    fn advance(&mut self) {
        if !self.peek().is_eof() {
            self.position += 1;
        }
    }

    /// Byte offset of the current token.
    fn offset(&self) -> usize {
        match self.peek() {
            CssToken::Eof => self.source.len(),
            _ => self.token_at(self.position).span.start,
        }
    }

    /// Byte offset just past the last consumed token.
    fn consumed_end(&self) -> usize {
        self.position
            .checked_sub(1)
            .map_or(0, |last| self.token_at(last).span.end)
    }

    fn error(&mut self, error: CssParseError) {
        debug!(%error, "CSS parse error");
        self.errors.push(error);
    }
}

/// Parse `text` as a stylesheet.
///
/// # Errors
///
/// Returns the first [`CssParseError`] seen. Recoverable constructs, such as
/// unknown at-rules or bad selectors, are not errors.
pub fn parse_stylesheet(text: &str) -> Result<Stylesheet, CssParseError> {
    let mut parser = CssParser::new(text);
    let sheet = parser.parse_stylesheet();
    match parser.errors.into_iter().next() {
        Some(error) => Err(error),
        None => Ok(sheet),
    }
}

/// Parse fetched stylesheet bytes, dropping a UTF-8 byte order mark.
///
/// # Errors
///
/// Returns [`CssParseError::InvalidUtf8`] for bytes that are not UTF-8, and
/// otherwise whatever [`parse_stylesheet`] returns.
pub fn parse_stylesheet_bytes(bytes: &[u8]) -> Result<Stylesheet, CssParseError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let text = core::str::from_utf8(bytes).map_err(|error| CssParseError::InvalidUtf8 {
        offset: error.valid_up_to(),
    })?;
    parse_stylesheet(text)
}

/// The leading `@charset "..."` name of a stylesheet, if any.
#[must_use]
pub fn leading_charset(text: &str) -> Option<String> {
    let rest = text.strip_prefix('\u{feff}').unwrap_or(text);
    let rest = rest.strip_prefix("@charset \"")?;
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}
