//! Common utilities for the Quill rewriter.
//!
//! This crate provides shared infrastructure used by all rewriter components:
//! - **Warning System** - deduplicated diagnostics routed through `tracing`
//! - **Logging** - subscriber installation for binaries and tests
//! - **Options** - the flat [`options::RewriteOptions`] knob set
//! - **URLs** - resolution and base comparison helpers
//! - **Fetching** - the [`net::UrlFetcher`] collaborator and its implementations
//! - **Statistics** - relaxed atomic counters shared across parses

pub mod logging;
pub mod net;
pub mod options;
pub mod stats;
pub mod url;
pub mod warning;
