//! Critical CSS rewriting for Quill.
//!
//! # Scope
//!
//! This crate implements:
//! - **Summary base** ([`CssSummarizerFilter`]) - finds every stylesheet of a
//!   document, flattens its `@import` rules and caches a per-stylesheet
//!   summary computed by a [`CssSummarizer`]
//! - **Critical selectors** ([`CriticalSelectorFilter`]) - prunes each
//!   stylesheet to the page's critical selectors and moves the full CSS to
//!   the end of the body behind a loader script
//! - **Collaborators** ([`ServerContext`]) - the fetcher, the property and
//!   summary caches, bundled assets, statistics and options
//! - **Driver** ([`RewriteDriver`]) - the filter chain for one document
//!
//! # Not Implemented
//!
//! - Computing critical selectors. They are read from the property cache,
//!   where some other process is expected to have stored them.

pub mod assets;
pub mod context;
pub mod critical_selector;
pub mod driver;
pub mod property_cache;
pub mod summarizer;
pub mod summary_cache;

pub use assets::{StaticAsset, StaticAssets};
pub use context::ServerContext;
pub use critical_selector::{CriticalSelectorFilter, CriticalSelectors};
pub use driver::{RewriteDriver, rewrite_html};
pub use property_cache::{
    CRITICAL_SELECTORS_PROPERTY, InMemoryPropertyCache, PropertyCache, read_critical_selectors,
    write_critical_selectors,
};
pub use summarizer::{CssSummarizer, CssSummarizerFilter, InjectionPoint, SummaryInfo, SummaryState};
pub use summary_cache::{CachedSummary, InMemorySummaryCache, SummaryCache, fingerprint};
