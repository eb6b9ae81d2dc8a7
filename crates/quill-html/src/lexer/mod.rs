//! HTML lexer.
//!
//! A character-at-a-time state machine that turns input chunks into parser
//! events. It is deliberately lenient: malformed markup is reported at debug
//! level and passed through as text, never rejected, so unmodified documents
//! are written back byte for byte.

mod core;
pub mod doctype;
mod helpers;

pub(crate) use self::core::HtmlLexer;
pub use doctype::DocType;
