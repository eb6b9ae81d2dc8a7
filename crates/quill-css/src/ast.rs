//! The stylesheet model produced by the parser.
//!
//! `@media` blocks are flattened: every ruleset carries the media list it
//! sits under. Anything the parser does not model is kept as source text so
//! that serializing a stylesheet never loses a rule.

use strum_macros::Display;

use crate::media::MediaQuery;
use crate::selector::Selector;

/// [§ 5.4.4 Consume a declaration](https://www.w3.org/TR/css-syntax-3/#consume-declaration)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// `name: value`, with the value already compacted.
    Property {
        /// The property name, ASCII-lowercased.
        name: String,
        /// The value without `!important`.
        value: String,
        /// Whether `!important` was given.
        important: bool,
    },
    /// A declaration that did not parse, as written.
    Verbatim(String),
}

/// A style rule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyleRule {
    /// The parsed selector list. Empty when the prelude did not parse.
    pub selectors: Vec<Selector>,
    /// The prelude as written, kept only when `selectors` could not be
    /// parsed from it.
    pub unparsed_selectors: Option<String>,
    /// The declarations in source order.
    pub declarations: Vec<Declaration>,
}

/// What a ruleset holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesetContent {
    /// A style rule.
    Style(StyleRule),
    /// Source text the parser kept without understanding it, such as an
    /// unknown at-rule.
    Unparsed(String),
}

/// Discriminant of [`RulesetContent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum RulesetKind {
    /// A style rule.
    Normal,
    /// Verbatim text.
    UnparsedRegion,
}

/// One rule with the media it applies under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ruleset {
    /// The enclosing `@media` list. Empty means all media.
    pub media_queries: Vec<MediaQuery>,
    /// The rule.
    pub content: RulesetContent,
}

impl Ruleset {
    /// Whether this is a style rule or an unparsed region.
    #[must_use]
    pub const fn kind(&self) -> RulesetKind {
        match self.content {
            RulesetContent::Style(_) => RulesetKind::Normal,
            RulesetContent::Unparsed(_) => RulesetKind::UnparsedRegion,
        }
    }

    /// The selectors of a style rule, or an empty slice.
    #[must_use]
    pub fn selectors(&self) -> &[Selector] {
        match &self.content {
            RulesetContent::Style(rule) => &rule.selectors,
            RulesetContent::Unparsed(_) => &[],
        }
    }

    /// Mutable access to the selectors of a style rule.
    pub const fn selectors_mut(&mut self) -> Option<&mut Vec<Selector>> {
        match &mut self.content {
            RulesetContent::Style(rule) => Some(&mut rule.selectors),
            RulesetContent::Unparsed(_) => None,
        }
    }

    /// A style rule whose prelude could not be parsed.
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        matches!(
            &self.content,
            RulesetContent::Style(StyleRule {
                unparsed_selectors: Some(_),
                ..
            })
        )
    }
}

/// A leading `@import`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// The URL as written, unescaped.
    pub url: String,
    /// The media list after the URL. Empty means all media.
    pub media: Vec<MediaQuery>,
}

/// [§ 5.3.3 Parse a stylesheet](https://www.w3.org/TR/css-syntax-3/#parse-stylesheet)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stylesheet {
    /// The encoding named by a leading `@charset`.
    pub charset: Option<String>,
    /// `@import` rules that precede every ruleset.
    pub imports: Vec<Import>,
    /// Everything else, in source order.
    pub rulesets: Vec<Ruleset>,
}

impl Stylesheet {
    /// Whether serializing this sheet would produce no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.rulesets.is_empty()
    }
}
