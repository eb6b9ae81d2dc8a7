//! CSS parser per [§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing).
//!
//! "The input to the parsing stage is a stream of tokens from the
//! tokenization stage." The output here is the flattened
//! [`Stylesheet`](crate::ast::Stylesheet) model rather than the generic rule
//! tree of the specification.

mod compact;
mod core;

pub use self::core::{CssParser, leading_charset, parse_stylesheet, parse_stylesheet_bytes};
