//! Document type detection.
//!
//! [§ 13.1.1 The DOCTYPE](https://html.spec.whatwg.org/multipage/syntax.html#the-doctype)
//!
//! Only the distinctions the rewriter acts on are kept: whether the page is
//! XHTML (which changes how names and valueless attributes are written) and
//! which HTML generation it claims to be.

use strum_macros::{Display, EnumIter};

/// MIME type that marks a document as XHTML regardless of its doctype.
pub const XHTML_CONTENT_TYPE: &str = "application/xhtml+xml";

/// The kind of document declared by `<!doctype ...>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter)]
pub enum DocType {
    /// No recognized doctype.
    #[default]
    Unknown,
    /// `<!doctype html>`
    Html5,
    /// HTML 4.01 strict.
    Html4Strict,
    /// HTML 4.01 transitional.
    Html4Transitional,
    /// XHTML 1.0 strict.
    XhtmlStrict,
    /// XHTML 1.0 transitional.
    XhtmlTransitional,
    /// XHTML 1.1.
    Xhtml11,
    /// `<!doctype html>` served as `application/xhtml+xml`.
    Xhtml5,
    /// Any other W3C XHTML doctype.
    OtherXhtml,
}

impl DocType {
    /// Whether the document must be written as well-formed XML.
    #[must_use]
    pub const fn is_xhtml(self) -> bool {
        matches!(
            self,
            Self::XhtmlStrict
                | Self::XhtmlTransitional
                | Self::Xhtml11
                | Self::Xhtml5
                | Self::OtherXhtml
        )
    }

    /// The doctype implied by a content type before any directive is seen.
    #[must_use]
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        if content_type.is_some_and(is_xhtml_content_type) {
            Self::OtherXhtml
        } else {
            Self::Unknown
        }
    }

    /// Parse the body of a `<!...>` directive.
    ///
    /// Returns `None` when the directive is not a doctype.
    #[must_use]
    pub fn parse(directive: &str, content_type: Option<&str>) -> Option<Self> {
        let rest = strip_prefix_ignore_case(directive.trim_start(), "doctype")?;
        if !rest.starts_with(|c: char| c.is_ascii_whitespace()) {
            return None;
        }
        let rest = rest.trim();
        let Some(after_html) = strip_prefix_ignore_case(rest, "html") else {
            return Some(Self::Unknown);
        };
        let after_html = after_html.trim();
        if after_html.is_empty() {
            return Some(if content_type.is_some_and(is_xhtml_content_type) {
                Self::Xhtml5
            } else {
                Self::Html5
            });
        }
        let Some(public) = strip_prefix_ignore_case(after_html, "public") else {
            return Some(Self::Unknown);
        };
        let public_id = quoted_prefix(public.trim_start()).unwrap_or_default();
        Some(Self::from_public_id(public_id))
    }

    fn from_public_id(public_id: &str) -> Self {
        match public_id {
            "-//W3C//DTD XHTML 1.0 Strict//EN" => Self::XhtmlStrict,
            "-//W3C//DTD XHTML 1.0 Transitional//EN" => Self::XhtmlTransitional,
            "-//W3C//DTD XHTML 1.1//EN" => Self::Xhtml11,
            "-//W3C//DTD HTML 4.01//EN" => Self::Html4Strict,
            "-//W3C//DTD HTML 4.01 Transitional//EN" => Self::Html4Transitional,
            id if id.starts_with("-//W3C//DTD XHTML") => Self::OtherXhtml,
            _ => Self::Unknown,
        }
    }
}

/// Whether `content_type` names the XHTML MIME type, ignoring parameters.
#[must_use]
pub fn is_xhtml_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(XHTML_CONTENT_TYPE))
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

fn quoted_prefix(text: &str) -> Option<&str> {
    let quote = text.chars().next().filter(|c| matches!(c, '"' | '\''))?;
    let body = &text[1..];
    body.find(quote).map(|end| &body[..end])
}
