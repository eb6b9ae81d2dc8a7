//! Escaping text for output inside CSS.
//!
//! [CSS 2.1 § 4.1.3 Characters and case](https://www.w3.org/TR/CSS21/syndata.html#characters)

/// Characters allowed unescaped in an unquoted `url(...)`: printable ASCII
/// except space, quotes, backslash and brackets of any kind, plus everything
/// outside ASCII.
const fn is_url_safe(c: char) -> bool {
    if !c.is_ascii() {
        return true;
    }
    matches!(c, '!'..='~')
        && !matches!(
            c,
            '"' | '\'' | '\\' | '(' | ')' | '{' | '}' | '[' | ']'
        )
}

/// Strings additionally allow a plain space.
const fn is_string_safe(c: char) -> bool {
    c == ' ' || is_url_safe(c)
}

/// Append `c` as a CSS escape.
///
/// Line terminators and tab cannot be written as `\` plus the character and
/// use hex escapes, which must end in a space.
fn push_escaped(c: char, out: &mut String) {
    match c {
        '\n' => out.push_str("\\A "),
        '\r' => out.push_str("\\D "),
        '\x0C' => out.push_str("\\C "),
        '\t' => out.push_str("\\9 "),
        _ => {
            out.push('\\');
            out.push(c);
        }
    }
}

fn escape_with(text: &str, is_safe: fn(char) -> bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if is_safe(c) {
            out.push(c);
        } else {
            push_escaped(c, &mut out);
        }
    }
    out
}

/// Escape `url` for use in `url(...)` or between quotes.
#[must_use]
pub fn escape_url(url: &str) -> String {
    escape_with(url, is_url_safe)
}

/// Escape `text` for use between quotes.
#[must_use]
pub fn escape_string(text: &str) -> String {
    escape_with(text, is_string_safe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_url() {
        assert_eq!(escape_url("http://a.com/b.png"), "http://a.com/b.png");
        assert_eq!(escape_url("a b(c)'d\""), "a\\ b\\(c\\)\\'d\\\"");
        assert_eq!(escape_url("a\nb\tc"), "a\\A b\\9 c");
        assert_eq!(escape_url("caf\u{e9}"), "caf\u{e9}");
    }

    #[test]
    fn test_escape_string_keeps_spaces() {
        assert_eq!(escape_string("a b"), "a b");
        assert_eq!(escape_string("it's"), "it\\'s");
    }
}
