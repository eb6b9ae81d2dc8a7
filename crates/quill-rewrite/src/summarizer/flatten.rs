//! Replacing leading `@import` rules with the rules they import.
//!
//! Flattening is all or nothing: if any import in the tree cannot be
//! inlined, the top-level sheet keeps its `@import` rules as written. Only
//! imports that can affect a screen are fetched; the rest contribute
//! nothing to a render-critical summary and are dropped.

use ::url::Url;
use quill_common::net::{FetchError, UrlFetcher};
use quill_common::options::RewriteOptions;
use quill_common::url::{content_type_charset, resolve_url};
use quill_css::media::{intersect_media, screen_affecting};
use quill_css::tag_scanner::{RebaseTransformer, has_import, has_url, transform_urls};
use quill_css::{CssParseError, Import, Ruleset, Stylesheet, parse_stylesheet, parse_stylesheet_bytes};
use thiserror::Error;

/// Why an import tree could not be inlined.
#[derive(Debug, Error)]
pub(crate) enum FlattenError {
    #[error("cannot resolve import {0}")]
    BadUrl(String),
    #[error("import cycle through {0}")]
    Cycle(Url),
    #[error("imports nest deeper than {0}")]
    TooDeep(u32),
    #[error("flattened CSS exceeds {0} bytes")]
    TooLarge(usize),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("charset of {url} does not match its importer")]
    CharsetMismatch { url: Url },
    #[error("cannot parse {url}: {source}")]
    Parse {
        url: Url,
        #[source]
        source: CssParseError,
    },
}

pub(crate) struct Flattener<'a> {
    fetcher: &'a dyn UrlFetcher,
    max_bytes: Option<usize>,
    max_depth: u32,
    total_bytes: usize,
}

impl<'a> Flattener<'a> {
    pub(crate) fn new(fetcher: &'a dyn UrlFetcher, options: &RewriteOptions) -> Self {
        Self {
            fetcher,
            max_bytes: usize::try_from(options.css_flatten_max_bytes).ok(),
            max_depth: options.css_flatten_max_depth,
            total_bytes: 0,
        }
    }

    /// Inline the imports of `sheet`, whose text was `source_len` bytes
    /// long and whose references resolve against `base`.
    ///
    /// `charset` is the encoding the sheet was served in, if known.
    pub(crate) fn flatten(
        &mut self,
        mut sheet: Stylesheet,
        base: &Url,
        source_len: usize,
        charset: Option<&str>,
    ) -> Stylesheet {
        if sheet.imports.is_empty() {
            return sheet;
        }
        self.total_bytes = source_len;
        let charset = charset.or(sheet.charset.as_deref()).map(str::to_string);
        let mut stack = vec![base.clone()];
        match self.flatten_imports(&sheet.imports, base, charset.as_deref(), &mut stack) {
            Ok(mut rulesets) => {
                rulesets.append(&mut sheet.rulesets);
                sheet.rulesets = rulesets;
                sheet.imports.clear();
            }
            Err(error) => {
                tracing::debug!(base = %base, %error, "keeping @import rules unflattened");
            }
        }
        sheet
    }

    fn flatten_imports(
        &mut self,
        imports: &[Import],
        base: &Url,
        charset: Option<&str>,
        stack: &mut Vec<Url>,
    ) -> Result<Vec<Ruleset>, FlattenError> {
        let mut out = Vec::new();
        for import in imports {
            if !import.media.is_empty() && screen_affecting(&import.media).is_empty() {
                continue;
            }
            let url = resolve_url(&import.url, base)
                .ok_or_else(|| FlattenError::BadUrl(import.url.clone()))?;
            if stack.contains(&url) {
                return Err(FlattenError::Cycle(url));
            }
            if stack.len() > self.max_depth as usize {
                return Err(FlattenError::TooDeep(self.max_depth));
            }
            let child = self.load(&url, charset)?;

            stack.push(url.clone());
            let nested = self.flatten_imports(&child.imports, &url, charset, stack);
            let _ = stack.pop();
            let mut rulesets = nested?;
            rulesets.extend(child.rulesets);

            for mut ruleset in rulesets {
                if let Some(media) = intersect_media(&import.media, &ruleset.media_queries) {
                    ruleset.media_queries = media;
                    out.push(ruleset);
                }
            }
        }
        Ok(out)
    }

    /// Fetch and parse one imported sheet, with its references made
    /// absolute.
    fn load(&mut self, url: &Url, charset: Option<&str>) -> Result<Stylesheet, FlattenError> {
        let fetched = self.fetcher.fetch(url)?;
        self.total_bytes += fetched.body.len();
        if let Some(limit) = self.max_bytes
            && self.total_bytes > limit
        {
            return Err(FlattenError::TooLarge(limit));
        }

        let parse_error = |source| FlattenError::Parse {
            url: url.clone(),
            source,
        };
        // Parse once for the charset and the error check, then again over
        // the rebased text.
        let sheet = parse_stylesheet_bytes(&fetched.body).map_err(parse_error)?;
        let served_charset = fetched
            .content_type
            .as_deref()
            .and_then(content_type_charset);
        let child_charset = sheet.charset.as_deref().or(served_charset);
        if let (Some(parent), Some(child)) = (charset, child_charset)
            && !parent.eq_ignore_ascii_case(child)
        {
            return Err(FlattenError::CharsetMismatch { url: url.clone() });
        }

        let text = String::from_utf8_lossy(&fetched.body);
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
        if has_url(text) || has_import(text) {
            let mut rebase = RebaseTransformer::new(url.clone());
            if let Ok(rebased) = transform_urls(text, &mut rebase) {
                return parse_stylesheet(&rebased).map_err(parse_error);
            }
        }
        Ok(sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_common::net::MockFetcher;
    use quill_css::minify_stylesheet;

    const BASE: &str = "http://test.com/dir/page.html";

    fn flatten_with(fetcher: &MockFetcher, options: &RewriteOptions, css: &str) -> String {
        let sheet = parse_stylesheet(css).unwrap();
        let base = Url::parse(BASE).unwrap();
        let flattened = Flattener::new(fetcher, options).flatten(sheet, &base, css.len(), None);
        minify_stylesheet(&flattened)
    }

    fn flatten(fetcher: &MockFetcher, css: &str) -> String {
        flatten_with(fetcher, &RewriteOptions::default(), css)
    }

    #[test]
    fn test_imports_inlined_in_order() {
        let fetcher = MockFetcher::new();
        fetcher.insert_css("http://test.com/dir/a.css", "a{x:y} b{background:url(i.png)}");
        fetcher.insert_css("http://test.com/b.css", "@import 'c.css'; c{x:y}");
        fetcher.insert_css("http://test.com/c.css", "d{x:y}");
        assert_eq!(
            flatten(&fetcher, "@import 'a.css'; @import '/b.css'; e{x:y}"),
            "a{x:y}b{background:url(http://test.com/dir/i.png)}d{x:y}c{x:y}e{x:y}"
        );
    }

    #[test]
    fn test_import_media_intersects() {
        let fetcher = MockFetcher::new();
        fetcher.insert_css(
            "http://test.com/dir/a.css",
            "a{x:y} @media print{b{x:y}} @media screen{c{x:y}}",
        );
        fetcher.insert_css("http://test.com/dir/p.css", "p{x:y}");
        assert_eq!(
            flatten(&fetcher, "@import 'a.css' screen; @import 'p.css' print;"),
            "@media screen{a{x:y}c{x:y}}"
        );
        assert_eq!(fetcher.request_count("http://test.com/dir/p.css"), 0);
    }

    #[test]
    fn test_failures_keep_imports() {
        let fetcher = MockFetcher::new();
        fetcher.insert_css("http://test.com/dir/a.css", "a{x:y}");
        fetcher.insert_css("http://test.com/dir/loop.css", "@import 'loop.css'; l{x:y}");
        assert_eq!(
            flatten(&fetcher, "@import 'a.css'; @import 'missing.css'; e{x:y}"),
            "@import url(a.css);@import url(missing.css);e{x:y}"
        );
        assert_eq!(
            flatten(&fetcher, "@import 'loop.css';"),
            "@import url(loop.css);"
        );
    }

    #[test]
    fn test_limits() {
        let fetcher = MockFetcher::new();
        fetcher.insert_css("http://test.com/dir/a.css", "@import 'b.css'; a{x:y}");
        fetcher.insert_css("http://test.com/dir/b.css", "b{x:y}");
        let css = "@import 'a.css';";

        let shallow = RewriteOptions {
            css_flatten_max_depth: 1,
            ..RewriteOptions::default()
        };
        assert_eq!(flatten_with(&fetcher, &shallow, css), "@import url(a.css);");

        let small = RewriteOptions {
            css_flatten_max_bytes: 20,
            ..RewriteOptions::default()
        };
        assert_eq!(flatten_with(&fetcher, &small, css), "@import url(a.css);");

        assert_eq!(flatten(&fetcher, css), "b{x:y}a{x:y}");
    }

    #[test]
    fn test_charset_mismatch_keeps_import() {
        let fetcher = MockFetcher::new();
        fetcher.insert(
            "http://test.com/dir/a.css",
            "a{x:y}",
            Some("text/css; charset=iso-8859-1"),
        );
        assert_eq!(
            flatten(&fetcher, "@charset \"utf-8\"; @import 'a.css';"),
            "@charset \"utf-8\";@import url(a.css);"
        );
    }
}
