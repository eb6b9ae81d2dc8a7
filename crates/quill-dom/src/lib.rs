//! Node model for the quill HTML rewriter.
//!
//! This crate holds everything the parser hands to filters:
//! - **Symbols** - per-parse string interning, case-folded or case-preserving
//! - **Names** - the [`name::Keyword`] registry and interned [`name::HtmlName`]s
//! - **Keywords** - tag tables used by the lexer, plus attribute escaping
//! - **Nodes** - elements, leaves and the [`node::NodeArena`] that owns them
//!
//! # Design
//!
//! Nodes live in an arena and refer to each other and to parser events by
//! index. Nothing here knows about the event queue itself; `quill-html`
//! owns that and keeps the indices stored on nodes up to date.

pub mod entities;
pub mod keywords;
pub mod name;
pub mod node;
pub mod symbol_table;

pub use name::{HtmlName, Keyword};
pub use node::{
    Attribute, CloseStyle, EventId, HtmlElement, HtmlNode, NodeArena, NodeId, NodeKind,
    QuoteStyle,
};
pub use symbol_table::{Symbol, SymbolTable};
