//! Rewrite options.
//!
//! A flat set of knobs consumed by the parse engine and the CSS filters.
//! Options are plain data: they are loaded once (from JSON or CLI flags) and
//! shared read-only by every parse that uses them.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default cap on the total size of a stylesheet after `@import` flattening.
pub const DEFAULT_CSS_FLATTEN_MAX_BYTES: i64 = 100 * 1024;

/// Default cap on `@import` nesting followed during flattening.
pub const DEFAULT_CSS_FLATTEN_MAX_DEPTH: u32 = 5;

/// Errors raised while loading options.
#[derive(Debug, Error)]
pub enum OptionsError {
    /// The options file could not be read.
    #[error("failed to read options file {path}: {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The options document is not valid JSON for [`RewriteOptions`].
    #[error("invalid options: {0}")]
    Json(#[from] serde_json::Error),
}

/// The option set recognized by the rewriter core.
///
/// Field names serialize in kebab-case, so a JSON options file reads
/// `{"max-html-bytes": 1048576, "debug": true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct RewriteOptions {
    /// Maximum number of HTML bytes parsed per document. Negative means no limit.
    pub max_html_bytes: i64,

    /// Maximum size of a stylesheet after `@import` flattening.
    pub css_flatten_max_bytes: i64,

    /// Maximum `@import` nesting depth followed during flattening.
    pub css_flatten_max_depth: u32,

    /// Test-only: emit the critical CSS loader but never call it, so the
    /// original CSS is not applied. Lets tests observe the critical subset alone.
    pub test_only_prioritize_critical_css_dont_apply_original_css: bool,

    /// Log wall-clock timing of parse, flush and finish calls.
    pub log_rewrite_timing: bool,

    /// Insert HTML comments with diagnostic information.
    pub debug: bool,

    /// Treat every stylesheet host as authorized.
    pub inline_unauthorized_resources: bool,

    /// Hosts, besides the document's own, whose stylesheets may be fetched.
    pub authorized_domains: Vec<String>,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            max_html_bytes: -1,
            css_flatten_max_bytes: DEFAULT_CSS_FLATTEN_MAX_BYTES,
            css_flatten_max_depth: DEFAULT_CSS_FLATTEN_MAX_DEPTH,
            test_only_prioritize_critical_css_dont_apply_original_css: false,
            log_rewrite_timing: false,
            debug: false,
            inline_unauthorized_resources: false,
            authorized_domains: Vec::new(),
        }
    }
}

impl RewriteOptions {
    /// Parse options from a JSON document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError::Json`] when the document is malformed or names
    /// an unknown option.
    pub fn from_json_str(json: &str) -> Result<Self, OptionsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse an options file.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError::Io`] when the file cannot be read, or
    /// [`OptionsError::Json`] when its contents are not valid options.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| OptionsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// The HTML size limit in bytes, or `None` when unlimited.
    #[must_use]
    pub fn html_size_limit(&self) -> Option<usize> {
        usize::try_from(self.max_html_bytes).ok()
    }

    /// Whether a stylesheet served from `host` may be fetched and inlined into
    /// a document served from `document_host`.
    #[must_use]
    pub fn is_authorized_host(&self, host: &str, document_host: &str) -> bool {
        self.inline_unauthorized_resources
            || host.eq_ignore_ascii_case(document_host)
            || self
                .authorized_domains
                .iter()
                .any(|domain| domain.eq_ignore_ascii_case(host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_unlimited() {
        let options = RewriteOptions::default();
        assert_eq!(options.html_size_limit(), None);
        assert_eq!(options.css_flatten_max_bytes, DEFAULT_CSS_FLATTEN_MAX_BYTES);
        assert!(!options.debug);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options =
            RewriteOptions::from_json_str(r#"{"max-html-bytes": 2048, "debug": true}"#).unwrap();
        assert_eq!(options.html_size_limit(), Some(2048));
        assert!(options.debug);
        assert_eq!(options.css_flatten_max_depth, DEFAULT_CSS_FLATTEN_MAX_DEPTH);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = RewriteOptions::from_json_str(r#"{"max-html-byte": 1}"#);
        assert!(matches!(result, Err(OptionsError::Json(_))));
    }

    #[test]
    fn test_authorized_hosts() {
        let mut options = RewriteOptions::default();
        assert!(options.is_authorized_host("Example.com", "example.com"));
        assert!(!options.is_authorized_host("cdn.example.com", "example.com"));

        options.authorized_domains.push("cdn.example.com".to_string());
        assert!(options.is_authorized_host("cdn.example.com", "example.com"));

        options.inline_unauthorized_resources = true;
        assert!(options.is_authorized_host("evil.test", "example.com"));
    }
}
