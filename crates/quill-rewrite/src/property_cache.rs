//! Per-page properties remembered between requests.
//!
//! The critical-selector filter does not discover selectors itself. Some
//! other process (a beacon, an offline crawl, the CLI) stores them under
//! the page URL, and the filter reads them back at the start of each
//! document.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

/// Property holding the page's critical selectors, as a JSON array.
pub const CRITICAL_SELECTORS_PROPERTY: &str = "critical_selectors";

/// A store of opaque values keyed by page and property name.
///
/// Shared by every parse in the process, so implementations bring their
/// own locking.
pub trait PropertyCache: Send + Sync {
    /// The value of `property` for the page `key`.
    fn get(&self, key: &str, property: &str) -> Option<Vec<u8>>;

    /// Store `value` as `property` of the page `key`.
    fn put(&self, key: &str, property: &str, value: Vec<u8>);

    /// Forget `property` of the page `key`.
    fn delete(&self, key: &str, property: &str);
}

/// A [`PropertyCache`] held in a map.
#[derive(Debug, Default)]
pub struct InMemoryPropertyCache {
    values: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryPropertyCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PropertyCache for InMemoryPropertyCache {
    fn get(&self, key: &str, property: &str) -> Option<Vec<u8>> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(key.to_string(), property.to_string()))
            .cloned()
    }

    fn put(&self, key: &str, property: &str, value: Vec<u8>) {
        let _ = self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((key.to_string(), property.to_string()), value);
    }

    fn delete(&self, key: &str, property: &str) {
        let _ = self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(key.to_string(), property.to_string()));
    }
}

/// The critical selectors stored for `page_url`.
///
/// A missing property and a value that is not a JSON array of strings both
/// read as `None`; the latter is logged.
#[must_use]
pub fn read_critical_selectors(cache: &dyn PropertyCache, page_url: &str) -> Option<BTreeSet<String>> {
    let raw = cache.get(page_url, CRITICAL_SELECTORS_PROPERTY)?;
    match serde_json::from_slice::<Vec<String>>(&raw) {
        Ok(selectors) => Some(selectors.into_iter().collect()),
        Err(error) => {
            tracing::warn!(page_url, %error, "ignoring malformed critical selectors");
            None
        }
    }
}

/// Store `selectors` as the critical selectors of `page_url`.
///
/// The set is written sorted and without duplicates.
///
/// # Errors
///
/// Returns the `serde_json` error if the set cannot be encoded.
pub fn write_critical_selectors<I, S>(
    cache: &dyn PropertyCache,
    page_url: &str,
    selectors: I,
) -> Result<(), serde_json::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let set: BTreeSet<String> = selectors.into_iter().map(Into::into).collect();
    let encoded = serde_json::to_vec(&set)?;
    cache.put(page_url, CRITICAL_SELECTORS_PROPERTY, encoded);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "http://www.example.com/";

    #[test]
    fn test_selectors_round_trip_sorted() {
        let cache = InMemoryPropertyCache::new();
        write_critical_selectors(&cache, PAGE, ["div", "*", "div"]).unwrap();
        assert_eq!(
            cache.get(PAGE, CRITICAL_SELECTORS_PROPERTY).unwrap(),
            br#"["*","div"]"#.to_vec()
        );
        let read = read_critical_selectors(&cache, PAGE).unwrap();
        assert_eq!(read.into_iter().collect::<Vec<_>>(), vec!["*", "div"]);
    }

    #[test]
    fn test_missing_and_malformed() {
        let cache = InMemoryPropertyCache::new();
        assert_eq!(read_critical_selectors(&cache, PAGE), None);
        cache.put(PAGE, CRITICAL_SELECTORS_PROPERTY, b"{\"div\": 1}".to_vec());
        assert_eq!(read_critical_selectors(&cache, PAGE), None);
        cache.delete(PAGE, CRITICAL_SELECTORS_PROPERTY);
        assert_eq!(cache.get(PAGE, CRITICAL_SELECTORS_PROPERTY), None);
    }
}
