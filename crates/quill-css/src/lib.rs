//! CSS support for the Quill rewriter.
//!
//! # Scope
//!
//! - **Tokenizer** - [CSS Syntax Level 3](https://www.w3.org/TR/css-syntax-3/)
//!   tokens with source spans
//! - **Parser** - a preservation-mode parser producing the flattened
//!   [`ast::Stylesheet`]
//! - **Selectors** - structural selector parsing and
//!   [`selector::Selector::js_detectable`]
//! - **Media** - media list helpers used by `media` attributes, `@media` and
//!   `@import`
//! - **Minifier** - [`minify::minify_stylesheet`]
//! - **Tag scanner** - [`tag_scanner::transform_urls`], which rewrites URLs in
//!   raw CSS text without parsing it

pub mod ast;
pub mod error;
pub mod escape;
pub mod media;
pub mod minify;
pub mod parser;
pub mod selector;
pub mod tag_scanner;
pub mod tokenizer;

pub use ast::{Declaration, Import, Ruleset, RulesetContent, RulesetKind, StyleRule, Stylesheet};
pub use error::CssParseError;
pub use media::MediaQuery;
pub use minify::minify_stylesheet;
pub use parser::{CssParser, parse_stylesheet, parse_stylesheet_bytes};
pub use selector::{Selector, parse_selector, parse_selector_list};
