//! CSS parse errors.

use thiserror::Error;

/// Problems the preservation-mode parser cannot recover from silently.
///
/// Offsets are byte offsets into the parsed text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CssParseError {
    /// A `{` block was still open at end of input.
    #[error("unclosed block opened at byte {offset}")]
    UnclosedBlock {
        /// Where the block was opened.
        offset: usize,
    },
    /// A `}` with no block to close.
    #[error("unexpected '}}' at byte {offset}")]
    UnexpectedCloseBrace {
        /// Where the brace was found.
        offset: usize,
    },
    /// `@import` after the first ruleset, in strict mode.
    #[error("@import after rules at byte {offset}")]
    ImportAfterRules {
        /// Where the at-rule starts.
        offset: usize,
    },
    /// The stylesheet bytes are not UTF-8.
    #[error("invalid UTF-8 at byte {offset}")]
    InvalidUtf8 {
        /// Length of the valid prefix.
        offset: usize,
    },
}
