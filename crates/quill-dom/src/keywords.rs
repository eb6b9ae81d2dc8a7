//! Tag tables and attribute-value escaping.
//!
//! The lexer consults these tables to decide how to tolerate real-world
//! markup: which tags never take a close tag, which may be closed by a
//! following sibling, which contain raw text, and which close tags may not
//! reach past an enclosing table.

use crate::entities;
use crate::name::Keyword;

/// Tags whose contents are raw text up to the matching close tag.
///
/// [§ 13.1.2 Elements](https://html.spec.whatwg.org/multipage/syntax.html#elements-2)
#[must_use]
pub const fn is_literal_tag(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::Iframe
            | Keyword::Script
            | Keyword::Style
            | Keyword::Textarea
            | Keyword::Title
            | Keyword::Xmp
    )
}

/// Tags that never take a close tag (void elements, plus `<?xml>`).
#[must_use]
pub const fn is_implicitly_closed(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::Xml
            | Keyword::Area
            | Keyword::Base
            | Keyword::Br
            | Keyword::Col
            | Keyword::Hr
            | Keyword::Img
            | Keyword::Input
            | Keyword::Link
            | Keyword::Meta
            | Keyword::Param
            | Keyword::Wbr
    )
}

/// Whether `<tag/>` may be treated as a complete element.
///
/// Browsers ignore the slash on these tags and keep the element open, so a
/// brief close on them must be written back as an open tag.
#[must_use]
pub const fn allows_brief_termination(keyword: Keyword) -> bool {
    !matches!(
        keyword,
        Keyword::A
            | Keyword::Div
            | Keyword::Iframe
            | Keyword::Script
            | Keyword::Span
            | Keyword::Style
            | Keyword::Textarea
            | Keyword::Xmp
    )
}

/// Tags whose close tag may be omitted.
///
/// [§ 13.1.2.4 Optional tags](https://html.spec.whatwg.org/multipage/syntax.html#optional-tags)
#[must_use]
pub const fn is_optionally_closed(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::Body
            | Keyword::Colgroup
            | Keyword::Dd
            | Keyword::Dt
            | Keyword::Html
            | Keyword::Li
            | Keyword::Optgroup
            | Keyword::Option
            | Keyword::P
            | Keyword::Rp
            | Keyword::Rt
            | Keyword::Tbody
            | Keyword::Td
            | Keyword::Tfoot
            | Keyword::Th
            | Keyword::Thead
            | Keyword::Tr
    )
}

/// Whether an open `open` element is closed by the start of `next`.
///
/// `<li>a<li>b` closes the first item; `<p>x<div>` closes the paragraph.
#[must_use]
pub const fn is_auto_close(open: Keyword, next: Keyword) -> bool {
    match open {
        Keyword::Dd | Keyword::Dt => matches!(next, Keyword::Dd | Keyword::Dt),
        Keyword::Li => matches!(next, Keyword::Li),
        Keyword::Optgroup => matches!(next, Keyword::Optgroup),
        Keyword::Option => matches!(next, Keyword::Option),
        Keyword::P => matches!(
            next,
            Keyword::Address
                | Keyword::Article
                | Keyword::Aside
                | Keyword::Blockquote
                | Keyword::Dir
                | Keyword::Div
                | Keyword::Dl
                | Keyword::Fieldset
                | Keyword::Footer
                | Keyword::Form
                | Keyword::H1
                | Keyword::H2
                | Keyword::H3
                | Keyword::H4
                | Keyword::H5
                | Keyword::H6
                | Keyword::Header
                | Keyword::Hgroup
                | Keyword::Hr
                | Keyword::Menu
                | Keyword::Nav
                | Keyword::Ol
                | Keyword::P
                | Keyword::Pre
                | Keyword::Section
                | Keyword::Table
                | Keyword::Ul
        ),
        Keyword::Rp | Keyword::Rt => matches!(next, Keyword::Rp | Keyword::Rt),
        Keyword::Tbody | Keyword::Thead => matches!(next, Keyword::Tbody | Keyword::Tfoot),
        Keyword::Tfoot => matches!(next, Keyword::Tbody),
        Keyword::Td | Keyword::Th => matches!(next, Keyword::Td | Keyword::Th),
        Keyword::Tr => matches!(next, Keyword::Tr),
        _ => false,
    }
}

/// Whether a close tag for `inner` is confined to an enclosing `outer`.
///
/// A stray `</b>` inside `<td>` must not close a `<b>` opened outside the
/// table cell, so the search for a matching open element stops at `outer`.
#[must_use]
pub const fn is_contained(inner: Keyword, outer: Keyword) -> bool {
    match inner {
        Keyword::B | Keyword::Em | Keyword::Font | Keyword::I => {
            matches!(outer, Keyword::Table | Keyword::Td | Keyword::Tr)
        }
        Keyword::Tbody | Keyword::Tfoot | Keyword::Th | Keyword::Thead => {
            matches!(outer, Keyword::Table)
        }
        Keyword::Td => matches!(
            outer,
            Keyword::Table | Keyword::Tbody | Keyword::Tfoot | Keyword::Thead | Keyword::Tr
        ),
        Keyword::Tr => matches!(
            outer,
            Keyword::Table | Keyword::Tbody | Keyword::Tfoot | Keyword::Thead
        ),
        _ => false,
    }
}

/// Decode HTML character references in an attribute value.
///
/// Only Latin-1 results are produced. Returns `None` when the value cannot be
/// decoded losslessly: it contains non-ASCII text, a numeric reference above
/// `0xff`, or a named reference outside Latin-1 such as `&hellip;`.
/// Unknown names pass through untouched, so `a&b` decodes to `a&b`.
#[must_use]
pub fn unescape(escaped: &str) -> Option<String> {
    if !escaped.contains('&') {
        return escaped.is_ascii().then(|| escaped.to_string());
    }
    let chars: Vec<char> = escaped.chars().collect();
    let mut out = String::with_capacity(escaped.len());
    let mut escape = String::new();
    let mut numeric_value: u32 = 0;
    let mut numeric = false;
    let mut hex = false;
    let mut in_escape = false;
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if !ch.is_ascii() {
            return None;
        }
        if !in_escape {
            if ch == '&' {
                in_escape = true;
                escape.clear();
                numeric_value = 0;
                numeric = false;
                hex = false;
            } else {
                out.push(ch);
            }
        } else if escape.is_empty() && ch == '#' {
            escape.push(ch);
            numeric = true;
            if chars.get(i + 1).is_some_and(|c| c.eq_ignore_ascii_case(&'x')) {
                hex = true;
                i += 1;
            }
        } else if ch == ';' {
            try_unescape(numeric, numeric_value, &escape, true, &mut out)?;
            in_escape = false;
        } else {
            let digit = if numeric {
                ch.to_digit(if hex { 16 } else { 10 })
            } else {
                None
            };
            let improperly_terminated = if numeric {
                digit.is_none()
            } else {
                !ch.is_ascii_alphanumeric()
            };
            if improperly_terminated {
                try_unescape(numeric, numeric_value, &escape, false, &mut out)?;
                in_escape = false;
                // Look at this character again outside the escape.
                continue;
            }
            if let Some(digit) = digit {
                numeric_value = numeric_value
                    .saturating_mul(if hex { 16 } else { 10 })
                    .saturating_add(digit);
            }
            escape.push(ch);
        }
        i += 1;
    }
    if in_escape {
        if escape.is_empty() {
            out.push('&');
        } else {
            try_unescape(numeric, numeric_value, &escape, false, &mut out)?;
        }
    }
    Some(out)
}

fn try_unescape(
    numeric: bool,
    numeric_value: u32,
    escape: &str,
    terminated: bool,
    out: &mut String,
) -> Option<()> {
    if numeric && escape.len() > 1 {
        let byte = u8::try_from(numeric_value).ok()?;
        out.push(char::from(byte));
        return Some(());
    }
    if let Some(ch) = entities::latin1_exact(escape) {
        out.push(ch);
    } else if entities::is_multi_byte_entity(escape) {
        return None;
    } else if let Some(ch) = entities::latin1_ignore_case(escape) {
        out.push(ch);
    } else if escape.eq_ignore_ascii_case("apos") {
        out.push('\'');
    } else {
        out.push('&');
        out.push_str(escape);
        if terminated {
            out.push(';');
        }
    }
    Some(())
}

/// Escape a decoded attribute value so it is safe inside either quote style.
///
/// Quotes, `&`, `<`, `>`, control characters and anything above ASCII are
/// written as references. Named Latin-1 references are preferred, so `&`
/// becomes `&amp;` while `'` becomes `&#39;`.
#[must_use]
pub fn escape(unescaped: &str) -> String {
    let mut out = String::with_capacity(unescaped.len());
    for ch in unescaped.chars() {
        let code = u32::from(ch);
        if code > 127 || code < 32 || matches!(ch, '"' | '\'' | '&' | '<' | '>') {
            match entities::name_for_char(ch) {
                Some(name) => {
                    out.push('&');
                    out.push_str(name);
                    out.push(';');
                }
                None => out.push_str(&format!("&#{code:02};")),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_numeric() {
        assert_eq!(unescape("my&#39;image.jpg").as_deref(), Some("my'image.jpg"));
        assert_eq!(unescape("&#x41;&#X42;").as_deref(), Some("AB"));
        assert_eq!(unescape("&#256;"), None);
        assert_eq!(unescape("&#xe9;").as_deref(), Some("\u{e9}"));
    }

    #[test]
    fn test_unescape_named() {
        assert_eq!(unescape("a&amp;b").as_deref(), Some("a&b"));
        assert_eq!(unescape("&QUOT;x&quot;").as_deref(), Some("\"x\""));
        assert_eq!(unescape("&apos;").as_deref(), Some("'"));
        assert_eq!(unescape("&hellip;"), None);
        assert_eq!(unescape("&Aelig;").as_deref(), Some("&Aelig;"));
    }

    #[test]
    fn test_unescape_lenient_forms() {
        assert_eq!(unescape("a&b").as_deref(), Some("a&b"));
        assert_eq!(unescape("a&bogus;").as_deref(), Some("a&bogus;"));
        assert_eq!(unescape("&nbsp").as_deref(), Some("\u{a0}"));
        assert_eq!(unescape("&amp x").as_deref(), Some("& x"));
        assert_eq!(unescape("trailing&").as_deref(), Some("trailing&"));
        assert_eq!(unescape("caf\u{e9}"), None);
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a&b"), "a&amp;b");
        assert_eq!(escape("it's \"x\""), "it&#39;s &quot;x&quot;");
        assert_eq!(escape("\t<\u{a0}>"), "&#09;&lt;&nbsp;&gt;");
    }

    #[test]
    fn test_tables() {
        assert!(is_auto_close(Keyword::P, Keyword::H2));
        assert!(!is_auto_close(Keyword::P, Keyword::Tr));
        assert!(is_auto_close(Keyword::Thead, Keyword::Tfoot));
        assert!(!is_auto_close(Keyword::Tfoot, Keyword::Tfoot));
        assert!(is_contained(Keyword::Td, Keyword::Tr));
        assert!(!allows_brief_termination(Keyword::Script));
        assert!(is_implicitly_closed(Keyword::Br));
        assert!(is_literal_tag(Keyword::Title));
    }
}
