//! The parse driver: event queue, flush windows, filter dispatch and the
//! DOM mutation API.
//!
//! Lexed events are appended to a queue. Each flush runs the enabled
//! filters over the queue in registration order; a filter may insert,
//! delete, move or defer nodes while it walks. Once every filter has run,
//! the events are released and their nodes can no longer be rewritten.

mod core;
mod edit;
pub mod event;

pub use self::core::{HtmlParse, ParseError};
pub use event::{EventList, HtmlEvent, ListId};
