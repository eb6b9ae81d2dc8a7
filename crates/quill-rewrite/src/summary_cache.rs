//! Cache of computed CSS summaries.
//!
//! Keys combine the summarizing filter's id, the stylesheet's identity and
//! a filter-supplied suffix, so one stylesheet summarized under two
//! different critical selector sets is stored twice.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::summarizer::SummaryState;

/// What is remembered about one summarized stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSummary {
    /// How the computation ended.
    pub state: SummaryState,
    /// The summary text. Empty unless `state` is [`SummaryState::Ok`].
    pub data: String,
}

/// Stores summaries across documents.
pub trait SummaryCache: Send + Sync {
    /// The summary stored under `key`.
    fn get(&self, key: &str) -> Option<CachedSummary>;

    /// Store `summary` under `key`.
    fn put(&self, key: &str, summary: CachedSummary);
}

/// A [`SummaryCache`] held in a map.
#[derive(Debug, Default)]
pub struct InMemorySummaryCache {
    entries: Mutex<HashMap<String, CachedSummary>>,
}

impl InMemorySummaryCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored summaries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SummaryCache for InMemorySummaryCache {
    fn get(&self, key: &str) -> Option<CachedSummary> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put(&self, key: &str, summary: CachedSummary) {
        let _ = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), summary);
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A hex fingerprint of `text` that is the same in every process and
/// every build, for use in cache keys.
///
/// This is 64-bit FNV-1a. It is not collision resistant against an
/// adversary.
#[must_use]
pub fn fingerprint(text: &str) -> String {
    let hash = text.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    });
    format!("{hash:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(fingerprint(""), "cbf29ce484222325");
        assert_eq!(fingerprint("a"), "af63dc4c8601ec8c");
        assert_ne!(fingerprint("*,div"), fingerprint("div,*"));
    }

    #[test]
    fn test_put_then_get() {
        let cache = InMemorySummaryCache::new();
        assert!(cache.is_empty());
        let summary = CachedSummary {
            state: SummaryState::Ok,
            data: "p{color:red}".to_string(),
        };
        cache.put("k", summary.clone());
        assert_eq!(cache.get("k"), Some(summary));
        assert_eq!(cache.get("other"), None);
        assert_eq!(cache.len(), 1);
    }
}
