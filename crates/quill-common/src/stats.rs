//! Rewriter statistics.
//!
//! Counters are shared by every parse in a process and updated with relaxed
//! atomics. Readers get an eventually consistent snapshot, nothing more.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Names of the counters maintained by the rewriter.
pub mod names {
    /// A CSS summary was computed from a fetched or inline stylesheet.
    pub const CSS_SUMMARIES_COMPUTED: &str = "css_summaries_computed";
    /// A CSS summary was served from the summary cache.
    pub const CSS_SUMMARY_CACHE_HITS: &str = "css_summary_cache_hits";
    /// A CSS summary could not be produced (fetch, parse or charset failure).
    pub const CSS_SUMMARY_FAILURES: &str = "css_summary_failures";
    /// A `<style>` or `<link>` was replaced by its critical subset.
    pub const CRITICAL_CSS_RENDERED: &str = "critical_css_rendered";
    /// A document exceeded the HTML size limit.
    pub const HTML_SIZE_LIMIT_EXCEEDED: &str = "html_size_limit_exceeded";

    /// Every counter, in registration order.
    pub const ALL: [&str; 5] = [
        CSS_SUMMARIES_COMPUTED,
        CSS_SUMMARY_CACHE_HITS,
        CSS_SUMMARY_FAILURES,
        CRITICAL_CSS_RENDERED,
        HTML_SIZE_LIMIT_EXCEEDED,
    ];
}

/// A fixed registry of named counters.
#[derive(Debug)]
pub struct Statistics {
    counters: BTreeMap<&'static str, AtomicU64>,
}

impl Statistics {
    /// A registry holding every counter in [`names::ALL`], all zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counters: names::ALL
                .iter()
                .map(|&name| (name, AtomicU64::new(0)))
                .collect(),
        }
    }

    /// Add one to `name`. Unknown names are ignored.
    pub fn increment(&self, name: &str) {
        self.add(name, 1);
    }

    /// Add `delta` to `name`. Unknown names are ignored.
    pub fn add(&self, name: &str, delta: u64) {
        if let Some(counter) = self.counters.get(name) {
            let _ = counter.fetch_add(delta, Ordering::Relaxed);
        }
    }

    /// Current value of `name`, or 0 for an unknown name.
    #[must_use]
    pub fn get(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map_or(0, |counter| counter.load(Ordering::Relaxed))
    }

    /// Every counter and its current value, sorted by name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        self.counters
            .iter()
            .map(|(&name, counter)| (name, counter.load(Ordering::Relaxed)))
            .collect()
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}
