//! The lenient `url(` / `@import` scanner.

use tracing::warn;

use super::{TransformError, TransformResult, Transformer};
use crate::escape::escape_url;

/// Whether a chunk handed to the scanner is the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPortion {
    /// More input may follow; constructs cut off at the end are retained.
    DoesNotIncludeEnd,
    /// This is the final chunk.
    IncludesEnd,
}

/// Outcome of recognizing one construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lex {
    No,
    Yes,
    /// The input ran out before the construct could be accepted or rejected.
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UrlKind {
    Import,
    Url,
}

/// How a URL use was written, so it can be written back the same way.
#[derive(Debug, Default)]
struct UrlUse {
    url: String,
    quote: Option<char>,
    have_term_quote: bool,
    have_term_paren: bool,
}

impl UrlUse {
    fn write(&self, kind: UrlKind, url: &str, out: &mut String) {
        out.push_str(match kind {
            UrlKind::Import => "@import ",
            UrlKind::Url => "url(",
        });
        if let Some(quote) = self.quote {
            out.push(quote);
        }
        out.push_str(&escape_url(url));
        if self.have_term_quote
            && let Some(quote) = self.quote
        {
            out.push(quote);
        }
        if self.have_term_paren {
            out.push(')');
        }
    }
}

/// `IsHtmlSpace`, which is also what CSS considers whitespace.
const fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

fn pop_first(input: &mut &str) -> Option<char> {
    let c = input.chars().next()?;
    *input = &input[c.len_utf8()..];
    Some(c)
}

fn trim_leading_space(input: &mut &str) {
    *input = input.trim_start_matches(is_space);
}

/// Consume `expected` if `input` starts with it.
fn eat_literal(portion: InputPortion, expected: &str, input: &mut &str) -> Lex {
    if let Some(rest) = input.strip_prefix(expected) {
        *input = rest;
        return Lex::Yes;
    }
    if portion == InputPortion::IncludesEnd || input.len() >= expected.len() {
        return Lex::No;
    }
    // The rest may still arrive.
    Lex::Interrupted
}

/// Extract string- or identifier-like content up to `term`, which is
/// consumed but not included. Simple escapes are decoded; in strings an
/// escaped line terminator disappears.
///
/// Any other escape rejects the construct: it cannot be re-encoded
/// faithfully.
fn extract_until(
    is_string: bool,
    portion: InputPortion,
    term: char,
    input: &mut &str,
    out: &mut String,
    found_term: &mut bool,
) -> Lex {
    *found_term = false;
    out.clear();
    let original = *input;

    loop {
        let before = *input;
        let Some(c) = pop_first(input) else {
            break;
        };
        if c == term {
            *found_term = true;
            return Lex::Yes;
        }
        if c == '\\' {
            match pop_first(input) {
                Some(escaped @ (',' | '"' | '\'' | '\\' | '(' | ')')) => out.push(escaped),
                Some(newline @ ('\n' | '\r' | '\x0C')) if is_string => {
                    if newline == '\r' {
                        let _ = eat_literal(portion, "\n", input);
                    }
                }
                Some(_) => return Lex::No,
                None if portion == InputPortion::IncludesEnd => return Lex::No,
                None => {
                    *input = original;
                    return Lex::Interrupted;
                }
            }
        } else if !is_string && is_space(c) {
            // Whitespace may only come before the terminator.
            let ahead = input.trim_start_matches(is_space);
            match ahead.chars().next() {
                Some(next) if next == term => {
                    out.push(c);
                    out.push_str(&input[..input.len() - ahead.len()]);
                    *input = ahead;
                }
                Some(_) => {
                    *input = before;
                    return Lex::Yes;
                }
                None => {}
            }
        } else if matches!(c, '\n' | '\r' | '\x0C') {
            // An unescaped line break ends a string without closing it.
            *input = before;
            break;
        } else {
            out.push(c);
        }
    }

    if portion == InputPortion::DoesNotIncludeEnd {
        *input = original;
        return Lex::Interrupted;
    }
    // Unterminated: serialization keeps it that way.
    Lex::Yes
}

/// Extract a single- or double-quoted string.
fn extract_string(portion: InputPortion, input: &mut &str, found: &mut UrlUse) -> Lex {
    for quote in ['\'', '"'] {
        if let Some(rest) = input.strip_prefix(quote) {
            *input = rest;
            found.quote = Some(quote);
            return extract_until(
                true,
                portion,
                quote,
                input,
                &mut found.url,
                &mut found.have_term_quote,
            );
        }
    }
    if input.is_empty() && portion == InputPortion::DoesNotIncludeEnd {
        return Lex::Interrupted;
    }
    Lex::No
}

/// Recognize what follows a `u`: `rl(` and a quoted or bare URL.
fn lex_url(portion: InputPortion, remaining: &mut &str, found: &mut UrlUse) -> Lex {
    match eat_literal(portion, "rl(", remaining) {
        Lex::Yes => {}
        other => return other,
    }
    trim_leading_space(remaining);
    match extract_string(portion, remaining, found) {
        Lex::Yes => {
            trim_leading_space(remaining);
            let lex = eat_literal(portion, ")", remaining);
            found.have_term_paren = lex == Lex::Yes;
            lex
        }
        Lex::Interrupted => Lex::Interrupted,
        Lex::No => {
            found.quote = None;
            let mut wrapped = String::new();
            let lex = extract_until(
                false,
                portion,
                ')',
                remaining,
                &mut wrapped,
                &mut found.have_term_paren,
            );
            if lex == Lex::Yes {
                found.url = wrapped.trim_matches(is_space).to_string();
            }
            lex
        }
    }
}

/// Recognize what follows an `@`: `import` and a quoted string.
fn lex_import(portion: InputPortion, remaining: &mut &str, found: &mut UrlUse) -> Lex {
    match eat_literal(portion, "import", remaining) {
        Lex::Yes => {}
        other => return other,
    }
    trim_leading_space(remaining);
    // `@import url(...)` is left to the `url(` branch.
    extract_string(portion, remaining, found)
}

/// A CSS URL scanner that can be fed input in chunks.
///
/// Text that might be the start of a URL use is held back until the next
/// chunk completes it, so the output for any split of the input is the same
/// as for the whole.
pub struct CssTagScanner<'t> {
    transformer: &'t mut dyn Transformer,
    reparse: String,
}

impl<'t> CssTagScanner<'t> {
    /// A scanner rewriting URLs with `transformer`.
    pub fn new(transformer: &'t mut dyn Transformer) -> Self {
        Self {
            transformer,
            reparse: String::new(),
        }
    }

    /// Input held back from previous chunks.
    #[must_use]
    pub fn retained(&self) -> &str {
        &self.reparse
    }

    /// Scan `chunk`, appending everything that can be decided to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::Failed`] when the transformer fails on a URL.
    /// Output already appended for earlier text stays in `out`.
    pub fn transform_urls_streaming(
        &mut self,
        chunk: &str,
        portion: InputPortion,
        out: &mut String,
    ) -> Result<(), TransformError> {
        let contents = if self.reparse.is_empty() {
            chunk.to_string()
        } else {
            let mut joined = std::mem::take(&mut self.reparse);
            joined.push_str(chunk);
            joined
        };
        let offset = |rest: &str| contents.len() - rest.len();

        // Input in [out_begin, out_end) is echoed at the next write.
        let mut out_begin = 0;
        let mut out_end = 0;
        let mut remaining: &str = &contents;

        while let Some(c) = pop_first(&mut remaining) {
            let mut found = UrlUse::default();
            let (kind, lex) = match c {
                '@' => (UrlKind::Import, lex_import(portion, &mut remaining, &mut found)),
                'u' => (UrlKind::Url, lex_url(portion, &mut remaining, &mut found)),
                _ => (UrlKind::Url, Lex::No),
            };

            match lex {
                Lex::Interrupted => {
                    self.reparse = contents[out_end..].to_string();
                    out.push_str(&contents[out_begin..out_end]);
                    return Ok(());
                }
                Lex::Yes => match self.transformer.transform(&found.url) {
                    TransformResult::Success(new_url) => {
                        out.push_str(&contents[out_begin..out_end]);
                        found.write(kind, &new_url, out);
                        out_begin = offset(remaining);
                    }
                    TransformResult::Failure => {
                        warn!(url = %found.url, "Transform failed for url");
                        return Err(TransformError::Failed { url: found.url });
                    }
                    TransformResult::NoChange => {}
                },
                Lex::No => {}
            }

            out_end = offset(remaining);
        }

        if out_end > out_begin {
            out.push_str(&contents[out_begin..out_end]);
        }
        Ok(())
    }
}

/// Rewrite every URL use in `contents` in one pass.
///
/// # Errors
///
/// Returns [`TransformError::Failed`] when the transformer fails on a URL.
pub fn transform_urls(
    contents: &str,
    transformer: &mut dyn Transformer,
) -> Result<String, TransformError> {
    let mut out = String::with_capacity(contents.len());
    CssTagScanner::new(transformer).transform_urls_streaming(
        contents,
        InputPortion::IncludesEnd,
        &mut out,
    )?;
    Ok(out)
}
