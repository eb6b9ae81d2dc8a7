//! Streaming HTML parsing and rewriting for Quill.
//!
//! # Scope
//!
//! This crate implements:
//! - **Lexer** - a lenient, byte-faithful state machine that never rejects
//!   input, with literal-tag, auto-close and containment handling
//! - **Doctype** detection from directives and content types
//! - **Parse driver** ([`HtmlParse`]) - the event queue, flush windows,
//!   node deferral and the DOM mutation API
//! - **Filters** ([`HtmlFilter`]) and listeners ([`HtmlEventListener`])
//! - **Writer** ([`HtmlWriterFilter`]) - serialization back to HTML
//!
//! # Not Implemented
//!
//! - Tree construction in the WHATWG sense: the parser never moves nodes to
//!   make a document valid, it only records what the markup says.

pub mod filter;
pub mod lexer;
pub mod parser;
pub mod writer;

pub use filter::{FilterState, HtmlEventListener, HtmlFilter};
pub use lexer::DocType;
pub use parser::{HtmlEvent, HtmlParse, ParseError};
pub use writer::{HtmlWriterFilter, StringWriter};
