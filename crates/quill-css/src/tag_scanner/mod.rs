//! Finding and rewriting URL references in CSS text without parsing it.
//!
//! The scanner looks for `url(...)` and `@import "..."` in raw bytes, hands
//! each URL to a [`Transformer`], and splices the result back while leaving
//! every other byte alone. It is lenient the way browsers are: unterminated
//! strings and unbalanced parentheses are written back as they came.

mod scan;

use ::url::Url;
use thiserror::Error;

pub use scan::{CssTagScanner, InputPortion, transform_urls};

/// What a [`Transformer`] decided about one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformResult {
    /// Replace the URL with this one.
    Success(String),
    /// Leave the original bytes in place.
    NoChange,
    /// Give up on the whole stylesheet.
    Failure,
}

/// Rewrites URLs found by the scanner.
pub trait Transformer {
    /// Decide what to do with `url`, already unescaped.
    fn transform(&mut self, url: &str) -> TransformResult;
}

impl<F> Transformer for F
where
    F: FnMut(&str) -> TransformResult,
{
    fn transform(&mut self, url: &str) -> TransformResult {
        self(url)
    }
}

/// The transformer refused a URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// [`TransformResult::Failure`] was returned for `url`.
    #[error("transform failed for url {url}")]
    Failed {
        /// The URL as extracted from the CSS.
        url: String,
    },
}

/// Resolves every reference against a fixed base.
///
/// References that are already absolute come back unchanged, as do
/// references the base cannot resolve.
#[derive(Debug, Clone)]
pub struct RebaseTransformer {
    base: Url,
}

impl RebaseTransformer {
    /// Resolve against `base`.
    #[must_use]
    pub const fn new(base: Url) -> Self {
        Self { base }
    }
}

impl Transformer for RebaseTransformer {
    fn transform(&mut self, url: &str) -> TransformResult {
        if url.is_empty() || url.starts_with('#') {
            return TransformResult::NoChange;
        }
        match quill_common::url::resolve_url(url, &self.base) {
            Some(resolved) if resolved.as_str() != url => {
                TransformResult::Success(resolved.to_string())
            }
            _ => TransformResult::NoChange,
        }
    }
}

/// Whether `contents` contains `@import`, in any case.
#[must_use]
pub fn has_import(contents: &str) -> bool {
    contents.match_indices('@').any(|(at, _)| {
        contents
            .get(at + 1..at + 7)
            .is_some_and(|word| word.eq_ignore_ascii_case("import"))
    })
}

/// Whether `contents` contains `url(`.
#[must_use]
pub fn has_url(contents: &str) -> bool {
    contents.contains("url(")
}

fn rel_tokens(rel: &str) -> impl Iterator<Item = &str> {
    rel.split_ascii_whitespace()
}

/// Whether a `rel` value names a stylesheet, alternate or not.
#[must_use]
pub fn is_stylesheet_or_alternate(rel: &str) -> bool {
    rel_tokens(rel).any(|token| token.eq_ignore_ascii_case("stylesheet"))
}

/// Whether a `rel` value names an alternate stylesheet.
#[must_use]
pub fn is_alternate_stylesheet(rel: &str) -> bool {
    is_stylesheet_or_alternate(rel)
        && rel_tokens(rel).any(|token| token.eq_ignore_ascii_case("alternate"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_import() {
        assert!(has_import("a @IMPORT 'b'"));
        assert!(has_import("@import url(x)"));
        assert!(!has_import("@impo"));
        assert!(!has_import("@media screen {}"));
    }

    #[test]
    fn test_rel_values() {
        assert!(is_stylesheet_or_alternate("stylesheet"));
        assert!(is_stylesheet_or_alternate(" Alternate  StyleSheet "));
        assert!(!is_stylesheet_or_alternate("icon"));
        assert!(is_alternate_stylesheet("alternate stylesheet"));
        assert!(!is_alternate_stylesheet("stylesheet"));
        assert!(!is_alternate_stylesheet("alternate"));
    }

    #[test]
    fn test_rebase_transformer() {
        let mut rebase = RebaseTransformer::new(Url::parse("http://a.com/css/").unwrap());
        assert_eq!(
            rebase.transform("i.png"),
            TransformResult::Success("http://a.com/css/i.png".to_string())
        );
        assert_eq!(rebase.transform("http://b.com/i.png"), TransformResult::NoChange);
        assert_eq!(rebase.transform(""), TransformResult::NoChange);
    }
}
