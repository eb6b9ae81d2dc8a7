//! Process-wide collaborators shared by every rewrite.

use std::sync::Arc;

use quill_common::net::UrlFetcher;
use quill_common::options::RewriteOptions;
use quill_common::stats::Statistics;

use crate::assets::StaticAssets;
use crate::property_cache::{InMemoryPropertyCache, PropertyCache};
use crate::summary_cache::{InMemorySummaryCache, SummaryCache};

/// Everything a [`crate::RewriteDriver`] needs beyond the document itself.
///
/// Cloning is cheap; clones share the fetcher, caches and counters.
#[derive(Clone)]
pub struct ServerContext {
    /// Fetches external stylesheets.
    pub fetcher: Arc<dyn UrlFetcher>,
    /// Per-page properties such as the critical selectors.
    pub property_cache: Arc<dyn PropertyCache>,
    /// Computed CSS summaries.
    pub summary_cache: Arc<dyn SummaryCache>,
    /// Bundled JavaScript.
    pub assets: Arc<StaticAssets>,
    /// Counters.
    pub stats: Arc<Statistics>,
    /// Option knobs for every document.
    pub options: Arc<RewriteOptions>,
}

impl ServerContext {
    /// A context over `fetcher` with in-memory caches, bundled assets and
    /// default options.
    #[must_use]
    pub fn new(fetcher: Arc<dyn UrlFetcher>) -> Self {
        Self {
            fetcher,
            property_cache: Arc::new(InMemoryPropertyCache::new()),
            summary_cache: Arc::new(InMemorySummaryCache::new()),
            assets: Arc::new(StaticAssets::new()),
            stats: Arc::new(Statistics::new()),
            options: Arc::new(RewriteOptions::default()),
        }
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: RewriteOptions) -> Self {
        self.options = Arc::new(options);
        self
    }
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
