//! Token runs back to minimal source text.

use crate::escape::escape_url;
use crate::tokenizer::{CssToken, Token};

/// Length units for which zero is the same as a bare `0`.
const LENGTH_UNITS: &[&str] = &[
    "px", "em", "rem", "ex", "ch", "vw", "vh", "vmin", "vmax", "cm", "mm", "in", "pt", "pc", "q",
];

/// `0.5` becomes `.5` and `-0.5` becomes `-.5`.
fn shorten_number(number: &str) -> String {
    if let Some(rest) = number.strip_prefix("0.")
        && !rest.is_empty()
    {
        return format!(".{rest}");
    }
    if let Some(rest) = number.strip_prefix("-0.")
        && !rest.is_empty()
    {
        return format!("-.{rest}");
    }
    number.to_string()
}

fn is_zero(number: &str) -> bool {
    number.contains('0') && number.chars().all(|c| matches!(c, '0' | '.' | '+' | '-'))
}

/// Numeric token text with the number shortened, and zero lengths without
/// their unit.
fn numeric_text(raw: &str, unit: &str) -> String {
    let split = raw.len().saturating_sub(unit.len());
    let (Some(number), Some(written_unit)) = (raw.get(..split), raw.get(split..)) else {
        return raw.to_string();
    };
    if is_zero(number) && LENGTH_UNITS.iter().any(|u| u.eq_ignore_ascii_case(unit)) {
        return "0".to_string();
    }
    let mut text = shorten_number(number);
    text.push_str(written_unit);
    text
}

/// The text to write for one non-whitespace token.
pub(super) fn token_text(source: &str, token: &Token) -> String {
    let raw = token.span.text(source);
    match &token.kind {
        CssToken::Number(_) => numeric_text(raw, ""),
        CssToken::Percentage(_) => numeric_text(raw, "%"),
        CssToken::Dimension { unit, .. } => numeric_text(raw, unit),
        CssToken::Url(url) => format!("url({})", escape_url(url)),
        _ => raw.to_string(),
    }
}

/// Whether something other than whitespace tokens, which can only be a
/// comment, separates two tokens that would otherwise run together.
fn needs_separator(previous: Option<&Token>, token: &Token) -> bool {
    previous.is_some_and(|previous| {
        previous.span.end < token.span.start
            && previous.kind.is_word_like()
            && token.kind.is_word_like()
    })
}

/// Serialize a run of tokens with whitespace collapsed to single spaces and
/// dropped where no separator is needed.
pub(super) fn compact_text(source: &str, tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut pending_space = false;
    let mut previous: Option<&Token> = None;

    for token in tokens {
        match token.kind {
            CssToken::Whitespace => {
                pending_space = !out.is_empty();
                continue;
            }
            CssToken::Eof => break,
            _ => {}
        }
        if pending_space || needs_separator(previous, token) {
            let after_opener = out.ends_with([',', '(', ':']);
            let before_closer = matches!(
                token.kind,
                CssToken::Comma | CssToken::Colon | CssToken::RightParen
            );
            if !after_opener && !before_closer {
                out.push(' ');
            }
        }
        pending_space = false;
        out.push_str(&token_text(source, token));
        previous = Some(token);
    }
    out
}

/// Serialize a selector prelude, keeping one space wherever there was
/// whitespace. Comments are dropped.
pub(super) fn selector_text(source: &str, tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut previous: Option<&Token> = None;
    for token in tokens {
        match token.kind {
            CssToken::Whitespace => {
                if !out.ends_with(' ') {
                    out.push(' ');
                }
                continue;
            }
            CssToken::Eof => break,
            _ => {}
        }
        if needs_separator(previous, token) && !out.ends_with(' ') {
            out.push(' ');
        }
        out.push_str(token.span.text(source));
        previous = Some(token);
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn compact(source: &str) -> String {
        compact_text(source, &tokenize(source))
    }

    #[test]
    fn test_compact_whitespace() {
        assert_eq!(compact("  1px   solid  red "), "1px solid red");
        assert_eq!(compact("rgb( 1 , 2 , 3 )"), "rgb(1,2,3)");
        assert_eq!(compact("a, b"), "a,b");
        assert_eq!(compact("screen and (min-width: 100px)"), "screen and (min-width:100px)");
    }

    #[test]
    fn test_compact_comment_separates_words() {
        assert_eq!(compact("1px/**/solid"), "1px solid");
        assert_eq!(compact("a/**/,b"), "a,b");
    }

    #[test]
    fn test_compact_numbers() {
        assert_eq!(compact("0px"), "0");
        assert_eq!(compact("0.0EM"), "0");
        assert_eq!(compact("0%"), "0%");
        assert_eq!(compact("0.5em -0.25"), ".5em -.25");
        assert_eq!(compact("10.5px 0s"), "10.5px 0s");
    }

    #[test]
    fn test_compact_urls() {
        assert_eq!(compact("url( a b.png )"), "url( a b.png )");
        assert_eq!(compact("url(a.png) no-repeat"), "url(a.png) no-repeat");
        assert_eq!(compact("url('a b.png')"), "url('a b.png')");
    }

    #[test]
    fn test_selector_text() {
        let source = "div  >\n p/* x */.a";
        assert_eq!(selector_text(source, &tokenize(source)), "div > p.a");
    }
}
