//! HTML names.
//!
//! Every tag and attribute name seen by the parser is an [`HtmlName`]: a
//! [`Keyword`] for fast comparisons plus the interned spelling. Names the
//! rewriter cares about are enumerated; everything else is
//! [`Keyword::NotAKeyword`] and compared by its canonical text.

use std::fmt;

use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::symbol_table::{Symbol, SymbolTable};

/// The closed set of recognized tag and attribute names.
///
/// Lookup is ASCII case-insensitive: `"BODY".parse()` yields [`Keyword::Body`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Keyword {
    /// Any name not listed below.
    #[strum(serialize = "")]
    NotAKeyword,
    /// `<a>`
    A,
    /// `<abbr>`
    Abbr,
    /// The `accept-charset` attribute.
    #[strum(serialize = "accept-charset")]
    AcceptCharset,
    /// `<address>`
    Address,
    /// The `alt` attribute.
    Alt,
    /// `<area>`
    Area,
    /// `<article>`
    Article,
    /// `<aside>`
    Aside,
    /// The `async` attribute.
    Async,
    /// `<b>`
    B,
    /// `<base>`
    Base,
    /// `<bdi>`
    Bdi,
    /// `<bdo>`
    Bdo,
    /// `<blockquote>`
    Blockquote,
    /// `<body>`
    Body,
    /// `<br>`
    Br,
    /// `<button>`
    Button,
    /// `<caption>`
    Caption,
    /// The `charset` attribute.
    Charset,
    /// The `checked` attribute.
    Checked,
    /// `<cite>`
    Cite,
    /// The `class` attribute.
    Class,
    /// `<code>`
    Code,
    /// `<col>`
    Col,
    /// `<colgroup>`
    Colgroup,
    /// The `content` attribute.
    Content,
    /// The `data-pagespeed-no-defer` attribute.
    #[strum(serialize = "data-pagespeed-no-defer")]
    DataPagespeedNoDefer,
    /// `<dd>`
    Dd,
    /// The `defer` attribute.
    Defer,
    /// `<del>`
    Del,
    /// `<dfn>`
    Dfn,
    /// `<dir>`
    Dir,
    /// The `disabled` attribute.
    Disabled,
    /// `<div>`
    Div,
    /// `<dl>`
    Dl,
    /// `<dt>`
    Dt,
    /// `<em>`
    Em,
    /// `<embed>`
    Embed,
    /// `<fieldset>`
    Fieldset,
    /// `<font>`
    Font,
    /// `<footer>`
    Footer,
    /// `<form>`
    Form,
    /// `<frame>`
    Frame,
    /// `<frameset>`
    Frameset,
    /// `<h1>`
    H1,
    /// `<h2>`
    H2,
    /// `<h3>`
    H3,
    /// `<h4>`
    H4,
    /// `<h5>`
    H5,
    /// `<h6>`
    H6,
    /// `<head>`
    Head,
    /// `<header>`
    Header,
    /// The `height` attribute.
    Height,
    /// `<hgroup>`
    Hgroup,
    /// `<hr>`
    Hr,
    /// The `href` attribute.
    Href,
    /// `<html>`
    Html,
    /// The `http-equiv` attribute.
    #[strum(serialize = "http-equiv")]
    HttpEquiv,
    /// `<i>`
    I,
    /// The `id` attribute.
    Id,
    /// `<iframe>`
    Iframe,
    /// `<img>`
    Img,
    /// `<input>`
    Input,
    /// `<ins>`
    Ins,
    /// `<kbd>`
    Kbd,
    /// `<label>`
    Label,
    /// The `language` attribute.
    Language,
    /// `<legend>`
    Legend,
    /// `<li>`
    Li,
    /// `<link>`
    Link,
    /// `<map>`
    Map,
    /// `<mark>`
    Mark,
    /// The `media` attribute.
    Media,
    /// `<menu>`
    Menu,
    /// `<meta>`
    Meta,
    /// The `name` attribute.
    Name,
    /// `<nav>`
    Nav,
    /// `<noscript>`
    Noscript,
    /// `<object>`
    Object,
    /// `<ol>`
    Ol,
    /// The `onclick` attribute.
    Onclick,
    /// The `onload` attribute.
    Onload,
    /// `<optgroup>`
    Optgroup,
    /// `<option>`
    Option,
    /// `<p>`
    P,
    /// `<param>`
    Param,
    /// `<pre>`
    Pre,
    /// `<q>`
    Q,
    /// The `rel` attribute.
    Rel,
    /// `<rp>`
    Rp,
    /// `<rt>`
    Rt,
    /// `<ruby>`
    Ruby,
    /// `<s>`
    S,
    /// `<samp>`
    Samp,
    /// `<script>`
    Script,
    /// `<section>`
    Section,
    /// `<select>`
    Select,
    /// The `selected` attribute.
    Selected,
    /// `<small>`
    Small,
    /// `<span>`
    Span,
    /// The `src` attribute.
    Src,
    /// `<strong>`
    Strong,
    /// `<style>`
    Style,
    /// `<sub>`
    Sub,
    /// `<sup>`
    Sup,
    /// `<table>`
    Table,
    /// `<tbody>`
    Tbody,
    /// `<td>`
    Td,
    /// `<textarea>`
    Textarea,
    /// `<tfoot>`
    Tfoot,
    /// `<th>`
    Th,
    /// `<thead>`
    Thead,
    /// `<time>`
    Time,
    /// `<title>`
    Title,
    /// `<tr>`
    Tr,
    /// The `type` attribute.
    Type,
    /// `<u>`
    U,
    /// `<ul>`
    Ul,
    /// The `value` attribute.
    Value,
    /// `<var>`
    Var,
    /// `<wbr>`
    Wbr,
    /// The `width` attribute.
    Width,
    /// The `<?xml ...?>` processing instruction, lexed as a tag.
    #[strum(serialize = "?xml")]
    Xml,
    /// `<xmp>`
    Xmp,
}

impl Keyword {
    /// The keyword for `name`, or [`Keyword::NotAKeyword`].
    #[must_use]
    pub fn lookup(name: &str) -> Self {
        name.parse().unwrap_or(Self::NotAKeyword)
    }

    /// Canonical lowercase spelling. Empty for [`Keyword::NotAKeyword`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A tag or attribute name.
///
/// Equality compares the canonical (case-folded) symbol, so `<DIV>` and
/// `<div>` have equal names while each keeps its own spelling for output.
#[derive(Clone)]
pub struct HtmlName {
    keyword: Keyword,
    canonical: Symbol,
    original: Symbol,
}

impl HtmlName {
    /// Build a name from its spelling, interning into both tables.
    pub fn new(text: &str, folded: &mut SymbolTable, preserved: &mut SymbolTable) -> Self {
        let canonical = folded.intern(text);
        let original = if canonical.as_str() == text {
            canonical.clone()
        } else {
            preserved.intern(text)
        };
        Self {
            keyword: Keyword::lookup(text),
            canonical,
            original,
        }
    }

    /// Build the canonical name of a keyword.
    pub fn from_keyword(keyword: Keyword, folded: &mut SymbolTable) -> Self {
        let canonical = folded.intern(keyword.as_str());
        Self {
            keyword,
            original: canonical.clone(),
            canonical,
        }
    }

    /// The recognized keyword, or [`Keyword::NotAKeyword`].
    #[must_use]
    pub const fn keyword(&self) -> Keyword {
        self.keyword
    }

    /// The name as it was spelled in the source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.original.as_str()
    }

    /// The ASCII-lowercased name.
    #[must_use]
    pub fn canonical(&self) -> &str {
        self.canonical.as_str()
    }

    /// Whether this name matches `keyword`.
    #[must_use]
    pub fn is(&self, keyword: Keyword) -> bool {
        self.keyword == keyword && keyword != Keyword::NotAKeyword
    }
}

impl PartialEq for HtmlName {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
            || (self.keyword != Keyword::NotAKeyword && self.keyword == other.keyword)
    }
}

impl Eq for HtmlName {}

impl fmt::Debug for HtmlName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HtmlName({:?}, {:?})", self.keyword, self.original)
    }
}

impl fmt::Display for HtmlName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(Keyword::lookup("BODY"), Keyword::Body);
        assert_eq!(Keyword::lookup("Http-Equiv"), Keyword::HttpEquiv);
        assert_eq!(Keyword::lookup("?xml"), Keyword::Xml);
        assert_eq!(Keyword::lookup("hiybbprqag"), Keyword::NotAKeyword);
        assert_eq!(Keyword::lookup(""), Keyword::NotAKeyword);
    }

    #[test]
    fn test_every_keyword_round_trips() {
        for keyword in Keyword::iter() {
            assert_eq!(Keyword::lookup(keyword.as_str()), keyword);
        }
    }

    #[test]
    fn test_name_equality_ignores_case() {
        let mut folded = SymbolTable::case_folded();
        let mut preserved = SymbolTable::case_preserving();
        let upper = HtmlName::new("DiV", &mut folded, &mut preserved);
        let lower = HtmlName::new("div", &mut folded, &mut preserved);
        assert_eq!(upper, lower);
        assert_eq!(upper.as_str(), "DiV");
        assert_eq!(lower.as_str(), "div");
        assert!(upper.is(Keyword::Div));

        let other = HtmlName::new("Other", &mut folded, &mut preserved);
        let other_upper = HtmlName::new("OTHER", &mut folded, &mut preserved);
        assert_eq!(other.keyword(), Keyword::NotAKeyword);
        assert_eq!(other, other_upper);
        assert_ne!(other, upper);
    }

    #[test]
    fn test_canonical_spelling_is_not_duplicated() {
        let mut folded = SymbolTable::case_folded();
        let mut preserved = SymbolTable::case_preserving();
        let _ = HtmlName::from_keyword(Keyword::Body, &mut folded);
        let _ = HtmlName::new("body", &mut folded, &mut preserved);
        assert!(preserved.is_empty());
        let _ = HtmlName::new("Body", &mut folded, &mut preserved);
        assert_eq!(preserved.bytes_allocated(), 4);
    }
}
