//! Critical CSS.
//!
//! Every stylesheet of the page is cut down to the rules whose selectors
//! are in the page's critical selector set, and the cut-down CSS replaces
//! the original in place. The full CSS is not lost: copies of the original
//! `<style>` and `<link>` elements are appended at the end of the body
//! inside `<noscript>` blocks, and a loader script moves the ones that were
//! visible to scripting clients back into the page after first paint.

use std::collections::BTreeSet;
use std::sync::Arc;

use quill_common::options::RewriteOptions;
use quill_common::stats::{Statistics, names};
use quill_css::media::{screen_affecting, stringify_media_vector, vectorize_media_attribute};
use quill_css::tag_scanner::{RebaseTransformer, has_url, is_alternate_stylesheet, transform_urls};
use quill_css::{Ruleset, Stylesheet, minify_stylesheet};
use quill_dom::{Keyword, NodeId};
use quill_html::{FilterState, HtmlParse};

use crate::assets::{StaticAsset, StaticAssets};
use crate::context::ServerContext;
use crate::property_cache::{PropertyCache, read_critical_selectors};
use crate::summarizer::{CssSummarizer, CssSummarizerFilter, InjectionPoint, SummaryInfo};
use crate::summary_cache::fingerprint;

/// Class of the `<noscript>` blocks the loader lifts into the page.
pub const NOSCRIPT_STYLES_CLASS: &str = "psa_add_styles";

/// Call appended to the loader script.
const LOADER_INVOCATION: &str = "pagespeed.CriticalCssLoader.Run();";

/// The document filter: a [`CssSummarizerFilter`] running
/// [`CriticalSelectors`].
pub type CriticalSelectorFilter = CssSummarizerFilter<CriticalSelectors>;

impl CriticalSelectorFilter {
    /// A critical CSS filter over the collaborators in `context`.
    #[must_use]
    pub fn from_context(context: &ServerContext) -> Self {
        Self::new(CriticalSelectors::new(context), context.clone())
    }
}

/// A copy of a stylesheet element as it was before rewriting.
#[derive(Debug)]
struct CssElement {
    element: NodeId,
    /// The body of a `<style>`.
    text: Option<String>,
    inside_noscript: bool,
}

/// Prunes stylesheets to a critical selector set.
pub struct CriticalSelectors {
    property_cache: Arc<dyn PropertyCache>,
    assets: Arc<StaticAssets>,
    stats: Arc<Statistics>,
    options: Arc<RewriteOptions>,
    selectors: BTreeSet<String>,
    cache_key_suffix: String,
    css_elements: Vec<Option<CssElement>>,
    any_rendered: bool,
}

impl CriticalSelectors {
    /// A summarizer that reads each page's selectors from the property
    /// cache of `context`.
    #[must_use]
    pub fn new(context: &ServerContext) -> Self {
        Self {
            property_cache: Arc::clone(&context.property_cache),
            assets: Arc::clone(&context.assets),
            stats: Arc::clone(&context.stats),
            options: Arc::clone(&context.options),
            selectors: BTreeSet::new(),
            cache_key_suffix: String::new(),
            css_elements: Vec::new(),
            any_rendered: false,
        }
    }

    /// The selector set of the current document.
    #[must_use]
    pub const fn selectors(&self) -> &BTreeSet<String> {
        &self.selectors
    }

    /// Use `selectors` for the current document.
    fn set_selectors(&mut self, selectors: BTreeSet<String>) {
        let joined = selectors.iter().map(String::as_str).collect::<Vec<_>>().join(",");
        self.cache_key_suffix = fingerprint(&joined);
        self.selectors = selectors;
    }

    /// Whether `ruleset` survives, with its irrelevant selectors and media
    /// removed.
    fn prune(&self, ruleset: &mut Ruleset) -> bool {
        if !ruleset.media_queries.is_empty() {
            ruleset.media_queries.retain(|media| media.can_affect_screen());
            if ruleset.media_queries.is_empty() {
                return false;
            }
        }
        let Some(selectors) = ruleset.selectors_mut() else {
            // Unparsed regions are kept as written.
            return true;
        };
        if selectors.is_empty() {
            return true;
        }
        selectors.retain(|selector| {
            let detectable = selector.js_detectable();
            detectable.is_empty() || self.selectors.contains(&detectable)
        });
        !selectors.is_empty()
    }

    /// Snapshot the element at `pos` as it stands now.
    fn remember_full_css(
        &mut self,
        parse: &mut HtmlParse,
        pos: usize,
        summary: &SummaryInfo,
        element: NodeId,
        characters: Option<NodeId>,
    ) {
        let Some(copy) = parse.clone_element(element) else {
            return;
        };
        let text = characters.and_then(|node| parse.contents(node)).map(str::to_string);
        if self.css_elements.len() <= pos {
            self.css_elements.resize_with(pos + 1, || None);
        }
        if let Some(slot) = self.css_elements.get_mut(pos) {
            *slot = Some(CssElement {
                element: copy,
                text,
                inside_noscript: summary.is_inside_noscript,
            });
        }
    }

    /// The summary with its references made absolute, for CSS that moves
    /// from a stylesheet URL into the document.
    fn css_to_use(summary: &SummaryInfo) -> String {
        if !summary.is_external || !has_url(&summary.data) {
            return summary.data.clone();
        }
        let mut rebase = RebaseTransformer::new(summary.base.clone());
        transform_urls(&summary.data, &mut rebase).unwrap_or_else(|error| {
            tracing::debug!(url = %summary.base, %error, "keeping summary references as written");
            summary.data.clone()
        })
    }

    /// Put the full CSS at the end of the body, grouped into `<noscript>`
    /// blocks by where it originally sat. Returns the number of blocks
    /// placed.
    fn add_full_css(&mut self, parse: &mut HtmlParse, injection: &InjectionPoint) -> usize {
        let mut placed = 0;
        let mut group: Option<(NodeId, bool)> = None;
        for css in std::mem::take(&mut self.css_elements).into_iter().flatten() {
            let noscript = match group {
                Some((noscript, inside)) if inside == css.inside_noscript => noscript,
                _ => {
                    let noscript = parse.new_keyword_element(None, Keyword::Noscript);
                    if !css.inside_noscript {
                        let _ = parse.add_attribute(noscript, Keyword::Class, Some(NOSCRIPT_STYLES_CLASS));
                    }
                    if !injection.insert(parse, noscript) {
                        tracing::warn!(url = %parse.id(), "could not place the full CSS at the end of the page");
                        return placed;
                    }
                    placed += 1;
                    group = Some((noscript, css.inside_noscript));
                    noscript
                }
            };
            if !parse.append_child(noscript, css.element) {
                continue;
            }
            if let Some(text) = css.text {
                let body = parse.new_characters_node(Some(css.element), &text);
                let _ = parse.append_child(css.element, body);
            }
        }
        placed
    }

    fn add_loader(&self, parse: &mut HtmlParse, injection: &InjectionPoint) {
        let script = parse.new_keyword_element(None, Keyword::Script);
        let _ = parse.add_attribute(script, Keyword::DataPagespeedNoDefer, None);
        let _ = parse.add_attribute(script, Keyword::Type, Some("text/javascript"));
        if !injection.insert(parse, script) {
            return;
        }
        let mut js = self.assets.get_asset(StaticAsset::CriticalCssLoader).to_string();
        if !self.options.test_only_prioritize_critical_css_dont_apply_original_css {
            js.push_str(LOADER_INVOCATION);
        }
        let body = parse.new_characters_node(Some(script), &js);
        let _ = parse.append_child(script, body);
    }
}

impl CssSummarizer for CriticalSelectors {
    fn name(&self) -> &'static str {
        "CriticalSelectorFilter"
    }

    fn id(&self) -> &'static str {
        "pr"
    }

    fn determine_enabled(&mut self, parse: &HtmlParse) -> FilterState {
        let selectors = parse
            .url()
            .and_then(|url| read_critical_selectors(self.property_cache.as_ref(), url.as_str()));
        match selectors {
            None => FilterState::Disabled {
                reason: "No critical selector info in cache".to_string(),
            },
            Some(selectors) if selectors.is_empty() => FilterState::Disabled {
                reason: "Empty critical selector set".to_string(),
            },
            Some(selectors) => {
                self.set_selectors(selectors);
                FilterState::Enabled
            }
        }
    }

    fn start_document(&mut self, _parse: &HtmlParse) {
        self.css_elements.clear();
        self.any_rendered = false;
    }

    fn cache_key_suffix(&self) -> &str {
        &self.cache_key_suffix
    }

    fn summarize(&self, mut stylesheet: Stylesheet) -> String {
        stylesheet
            .imports
            .retain(|import| import.media.is_empty() || !screen_affecting(&import.media).is_empty());
        stylesheet.rulesets.retain_mut(|ruleset| self.prune(ruleset));
        minify_stylesheet(&stylesheet)
    }

    fn render_summary(
        &mut self,
        parse: &mut HtmlParse,
        pos: usize,
        summary: &SummaryInfo,
        element: NodeId,
        characters: Option<NodeId>,
    ) {
        self.remember_full_css(parse, pos, summary, element, characters);
        let css = Self::css_to_use(summary);

        let target = if let Some(characters) = characters {
            if let Some(contents) = parse.contents_mut(characters) {
                contents.clone_from(&css);
            }
            element
        } else {
            let style = parse.new_keyword_element(None, Keyword::Style);
            if !parse.insert_before_node(element, style) {
                return;
            }
            let body = parse.new_characters_node(Some(style), &css);
            let _ = parse.append_child(style, body);
            let _ = parse.delete_node(element);
            style
        };

        let all_media = vectorize_media_attribute(&summary.media_from_html);
        if let Some(html) = parse.element_mut(target) {
            let _ = html.delete_attribute(Keyword::Media);
        }
        let relevant = screen_affecting(&all_media);
        let drop_element = css.is_empty()
            || summary.is_inside_noscript
            || (summary.is_external && is_alternate_stylesheet(&summary.rel))
            || (!all_media.is_empty() && relevant.is_empty());
        if drop_element {
            let _ = parse.delete_node(target);
        } else if !relevant.is_empty() {
            let _ = parse.add_attribute(target, Keyword::Media, Some(&stringify_media_vector(&relevant)));
        }

        self.any_rendered = true;
        self.stats.increment(names::CRITICAL_CSS_RENDERED);
    }

    fn will_not_render_summary(
        &mut self,
        parse: &mut HtmlParse,
        pos: usize,
        summary: &SummaryInfo,
        element: NodeId,
        characters: Option<NodeId>,
    ) {
        self.remember_full_css(parse, pos, summary, element, characters);
    }

    fn render_done(&mut self, parse: &mut HtmlParse, injection: &InjectionPoint, end_of_document: bool) {
        if !end_of_document || !self.any_rendered || self.css_elements.iter().all(Option::is_none) {
            return;
        }
        if self.add_full_css(parse, injection) > 0 {
            self.add_loader(parse, injection);
        }
        self.any_rendered = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_common::net::MockFetcher;
    use quill_css::parse_stylesheet;

    fn summarizer(selectors: &[&str]) -> CriticalSelectors {
        let context = ServerContext::new(Arc::new(MockFetcher::new()));
        let mut summarizer = CriticalSelectors::new(&context);
        summarizer.set_selectors(selectors.iter().map(ToString::to_string).collect());
        summarizer
    }

    fn summarize(selectors: &[&str], css: &str) -> String {
        summarizer(selectors).summarize(parse_stylesheet(css).unwrap())
    }

    #[test]
    fn test_keeps_critical_selectors_only() {
        assert_eq!(
            summarize(&["div", "*"], "div,span,*::first-letter { display: block; }p { display: inline; }"),
            "div,*::first-letter{display:block}"
        );
    }

    #[test]
    fn test_media_reduced_to_screen() {
        assert_eq!(
            summarize(&["div", "*"], "@media screen,print { * { margin: 0px; } }"),
            "@media screen{*{margin:0}}"
        );
        assert_eq!(summarize(&["*"], "@media print { * { margin: 0 } }"), "");
    }

    #[test]
    fn test_pseudo_only_selectors_are_critical() {
        assert_eq!(
            summarize(&["div"], ":hover{border:2px solid red}"),
            ":hover{border:2px solid red}"
        );
    }

    #[test]
    fn test_unparsed_content_is_kept() {
        assert_eq!(
            summarize(&["div"], "!huh! {background: white; } @huh { display: block; }"),
            "!huh! {background:white}@huh { display: block; }"
        );
    }

    #[test]
    fn test_non_screen_imports_dropped() {
        assert_eq!(
            summarize(&["p"], "@import 'a.css' print; @import 'b.css'; p{color:red} q{color:blue}"),
            "@import url(b.css);p{color:red}"
        );
    }

    #[test]
    fn test_cache_key_suffix_depends_on_selectors() {
        let a = summarizer(&["div", "*"]);
        let b = summarizer(&["*", "div"]);
        let c = summarizer(&["div"]);
        assert_eq!(a.cache_key_suffix(), b.cache_key_suffix());
        assert_ne!(a.cache_key_suffix(), c.cache_key_suffix());
        assert_eq!(a.cache_key_suffix(), fingerprint("*,div"));
    }
}
