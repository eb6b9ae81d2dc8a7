//! Deduplicated rewriter warnings.
//!
//! A page with a hundred stylesheets hitting the same unsupported construct
//! should produce one diagnostic, not a hundred. Warnings are forwarded to
//! `tracing` at `warn` level the first time a unique message is seen.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Global set of warnings we've already emitted (to deduplicate)
static WARNED: Mutex<Option<HashSet<String>>> = Mutex::new(None);

/// Warn about an unsupported or suspicious construct (emitted once per unique message)
///
/// Returns `true` when the message was emitted, `false` when it was a repeat.
///
/// # Example
/// ```ignore
/// let _ = warn_once("CSS", "unsupported at-rule @layer kept verbatim");
/// ```
pub fn warn_once(component: &str, message: &str) -> bool {
    let key = format!("[{component}] {message}");
    let should_emit = WARNED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_insert_with(HashSet::new)
        .insert(key);

    if should_emit {
        tracing::warn!(component, "{message}");
    }
    should_emit
}

/// Clear all recorded warnings (call between documents in long-running hosts)
pub fn clear_warnings() {
    let mut guard = WARNED.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(set) = guard.as_mut() {
        set.clear();
    }
}
