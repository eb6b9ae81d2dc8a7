//! The CSS summary base.
//!
//! [`CssSummarizerFilter`] walks a document, numbers every stylesheet it
//! finds (`<style>` bodies and `<link rel=stylesheet>` resources), and
//! hands each parsed sheet to a [`CssSummarizer`] that reduces it to a
//! summary string. Summaries are cached under a key built from the
//! summarizer's id, the sheet's identity and a summarizer-chosen suffix.
//!
//! Fetching is synchronous, so a summary is ready as soon as the close of
//! its element is seen. Rendering happens in the same flush, from the
//! filter's flush callback, in document order: each sheet goes to
//! [`CssSummarizer::render_summary`] when its summary is usable and to
//! [`CssSummarizer::will_not_render_summary`] otherwise.

mod flatten;
mod injection;

use ::url::Url;
use quill_common::net::FetchError;
use quill_common::stats::names;
use quill_common::url::{all_except_leaf, content_type_charset, resolve_url};
use quill_css::tag_scanner::is_stylesheet_or_alternate;
use quill_css::{Stylesheet, parse_stylesheet_bytes};
use quill_dom::{HtmlElement, Keyword, NodeId};
use quill_html::{FilterState, HtmlFilter, HtmlParse};
use strum_macros::Display;

use crate::context::ServerContext;
use crate::summary_cache::{CachedSummary, fingerprint};

use self::flatten::Flattener;
pub use self::injection::InjectionPoint;

/// Where the summary of one stylesheet stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SummaryState {
    /// The summary was computed.
    Ok,
    /// The summary is not known yet.
    StillPending,
    /// The stylesheet could not be fetched.
    FetchFailed,
    /// The stylesheet has an unrecoverable CSS error.
    ParseFailed,
    /// The stylesheet's `@charset` disagrees with the charset it was
    /// served with.
    CharsetMismatch,
    /// The `href` is malformed or names a host that is not authorized.
    ResourceCreationFailed,
}

impl SummaryState {
    /// The wording used in debug comments.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Ok => "Computed OK",
            Self::StillPending => "Computation still pending",
            Self::FetchFailed => "Fetch failed or resource not publicly cacheable",
            Self::ParseFailed => "Unrecoverable CSS parse error",
            Self::CharsetMismatch => "Charset does not match the content type",
            Self::ResourceCreationFailed => {
                "Cannot create resource; is it authorized and is URL well-formed?"
            }
        }
    }

    /// Whether the outcome depends only on the stylesheet's contents.
    const fn is_cacheable(self) -> bool {
        matches!(self, Self::Ok | Self::ParseFailed | Self::CharsetMismatch)
    }
}

/// Everything known about one stylesheet of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryInfo {
    /// How summarizing went.
    pub state: SummaryState,
    /// The summary. Empty unless `state` is [`SummaryState::Ok`].
    pub data: String,
    /// The stylesheet URL, or `document:line` for inline CSS.
    pub location: String,
    /// What references in the CSS resolve against.
    pub base: Url,
    /// The element's `media` attribute, as written.
    pub media_from_html: String,
    /// The element's `rel` attribute. Empty for `<style>`.
    pub rel: String,
    /// Whether the CSS came from a `<link>`.
    pub is_external: bool,
    /// Whether the element sits inside `<noscript>`.
    pub is_inside_noscript: bool,
}

/// The part of a summarizing filter that knows what to compute and what to
/// do with the result.
#[allow(unused_variables)]
pub trait CssSummarizer {
    /// Name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Short id used in cache keys.
    fn id(&self) -> &'static str;

    /// Decide once per document whether to run.
    fn determine_enabled(&mut self, parse: &HtmlParse) -> FilterState {
        FilterState::Enabled
    }

    /// A document starts.
    fn start_document(&mut self, parse: &HtmlParse) {}

    /// Appended to cache keys, for summaries that depend on more than the
    /// stylesheet.
    fn cache_key_suffix(&self) -> &str {
        ""
    }

    /// Reduce a parsed stylesheet to its summary.
    fn summarize(&self, stylesheet: Stylesheet) -> String;

    /// Use the summary at `pos`. `element` is the `<style>` or `<link>`,
    /// `characters` the body of a `<style>`. Both are rewritable.
    fn render_summary(
        &mut self,
        parse: &mut HtmlParse,
        pos: usize,
        summary: &SummaryInfo,
        element: NodeId,
        characters: Option<NodeId>,
    );

    /// The summary at `pos` is missing or unusable.
    fn will_not_render_summary(
        &mut self,
        parse: &mut HtmlParse,
        pos: usize,
        summary: &SummaryInfo,
        element: NodeId,
        characters: Option<NodeId>,
    ) {
    }

    /// Every summary of this flush window has been rendered.
    /// `end_of_document` is set on the last window.
    fn render_done(&mut self, parse: &mut HtmlParse, injection: &InjectionPoint, end_of_document: bool) {}
}

#[derive(Debug, Clone, Copy)]
struct PendingRender {
    pos: usize,
    element: NodeId,
    characters: Option<NodeId>,
}

/// Drives a [`CssSummarizer`] over a document.
pub struct CssSummarizerFilter<S> {
    summarizer: S,
    context: ServerContext,
    summaries: Vec<SummaryInfo>,
    pending: Vec<PendingRender>,
    style_element: Option<NodeId>,
    style_characters: Option<NodeId>,
    noscript: Option<NodeId>,
    injection: InjectionPoint,
    saw_end_document: bool,
}

impl<S: CssSummarizer> CssSummarizerFilter<S> {
    /// A filter running `summarizer` with the collaborators in `context`.
    #[must_use]
    pub fn new(summarizer: S, context: ServerContext) -> Self {
        Self {
            summarizer,
            context,
            summaries: Vec::new(),
            pending: Vec::new(),
            style_element: None,
            style_characters: None,
            noscript: None,
            injection: InjectionPoint::default(),
            saw_end_document: false,
        }
    }

    /// The summarizer.
    #[must_use]
    pub const fn summarizer(&self) -> &S {
        &self.summarizer
    }

    /// Summaries of the current document, in document order.
    #[must_use]
    pub fn summaries(&self) -> &[SummaryInfo] {
        &self.summaries
    }

    fn clear(&mut self) {
        self.summaries.clear();
        self.pending.clear();
        self.style_element = None;
        self.style_characters = None;
        self.noscript = None;
        self.injection.clear();
        self.saw_end_document = false;
    }

    fn new_info(&self, location: String, base: Url, element: &HtmlElement, is_external: bool) -> SummaryInfo {
        SummaryInfo {
            state: SummaryState::StillPending,
            data: String::new(),
            location,
            base,
            media_from_html: element
                .attribute_value(Keyword::Media)
                .unwrap_or_default()
                .to_string(),
            rel: element
                .attribute_value(Keyword::Rel)
                .unwrap_or_default()
                .to_string(),
            is_external,
            is_inside_noscript: self.noscript.is_some(),
        }
    }

    fn cache_key(&self, identity: &str) -> String {
        format!(
            "{}_{}_{}",
            self.summarizer.id(),
            identity,
            self.summarizer.cache_key_suffix()
        )
    }

    /// Serve `key` from the summary cache, or compute and store it.
    fn lookup_or_compute(&self, key: &str, compute: impl FnOnce(&Self) -> CachedSummary) -> CachedSummary {
        let stats = &self.context.stats;
        if let Some(hit) = self.context.summary_cache.get(key) {
            stats.increment(names::CSS_SUMMARY_CACHE_HITS);
            return hit;
        }
        let summary = compute(self);
        if summary.state == SummaryState::Ok {
            stats.increment(names::CSS_SUMMARIES_COMPUTED);
        } else {
            stats.increment(names::CSS_SUMMARY_FAILURES);
        }
        if summary.state.is_cacheable() {
            self.context.summary_cache.put(key, summary.clone());
        }
        summary
    }

    /// Parse, flatten and summarize stylesheet bytes.
    fn compute(&self, body: &[u8], base: &Url, served_charset: Option<&str>) -> CachedSummary {
        let failed = |state| CachedSummary {
            state,
            data: String::new(),
        };
        let sheet = match parse_stylesheet_bytes(body) {
            Ok(sheet) => sheet,
            Err(error) => {
                tracing::debug!(base = %base, %error, "cannot summarize stylesheet");
                return failed(SummaryState::ParseFailed);
            }
        };
        if let (Some(served), Some(declared)) = (served_charset, sheet.charset.as_deref())
            && !served.eq_ignore_ascii_case(declared)
        {
            tracing::debug!(base = %base, served, declared, "stylesheet charset mismatch");
            return failed(SummaryState::CharsetMismatch);
        }
        let mut flattener = Flattener::new(self.context.fetcher.as_ref(), &self.context.options);
        let sheet = flattener.flatten(sheet, base, body.len(), served_charset);
        CachedSummary {
            state: SummaryState::Ok,
            data: self.summarizer.summarize(sheet),
        }
    }

    fn record(&mut self, mut info: SummaryInfo, summary: CachedSummary, element: NodeId, characters: Option<NodeId>) {
        info.state = summary.state;
        info.data = summary.data;
        let pos = self.summaries.len();
        self.summaries.push(info);
        self.pending.push(PendingRender {
            pos,
            element,
            characters,
        });
    }

    fn start_inline_rewrite(&mut self, parse: &HtmlParse, element: NodeId, characters: NodeId) {
        let (Some(base), Some(html), Some(text)) = (parse.url(), parse.element(element), parse.contents(characters))
        else {
            return;
        };
        let location = format!("{}:{}", parse.id(), html.begin_line());
        let info = self.new_info(location, base.clone(), html, false);
        let identity = format!("inline_{}_@{}", fingerprint(text), fingerprint(all_except_leaf(base)));
        let key = self.cache_key(&identity);
        let summary = self.lookup_or_compute(&key, |this| this.compute(text.as_bytes(), base, None));
        self.record(info, summary, element, Some(characters));
    }

    /// The absolute, authorized URL a `<link>` refers to.
    fn stylesheet_url(&self, document: &Url, href: Option<&str>) -> Result<Url, FetchError> {
        let href = href.unwrap_or_default();
        let url = resolve_url(href, document).ok_or_else(|| FetchError::NotFound(href.to_string()))?;
        if url.scheme() == "data" {
            return Ok(url);
        }
        let authorized = url.host_str().is_some_and(|host| {
            self.context
                .options
                .is_authorized_host(host, document.host_str().unwrap_or_default())
        });
        if authorized {
            Ok(url)
        } else {
            Err(FetchError::Unauthorized(url.to_string()))
        }
    }

    fn start_external_rewrite(&mut self, parse: &mut HtmlParse, element: NodeId) {
        let (Some(document), Some(link)) = (parse.url(), parse.element(element)) else {
            return;
        };
        let href = link.attribute_value(Keyword::Href);
        let url = match self.stylesheet_url(document, href) {
            Ok(url) => url,
            Err(error) => {
                tracing::debug!(url = %parse.id(), %error, "cannot create stylesheet resource");
                let location = href.map_or_else(
                    || format!("{}:{}", parse.id(), link.begin_line()),
                    str::to_string,
                );
                let mut info = self.new_info(location, document.clone(), link, true);
                info.state = SummaryState::ResourceCreationFailed;
                self.summaries.push(info);
                if self.context.options.debug {
                    let comment = format!(
                        "{}: unable to create resource; is it authorized?",
                        self.summarizer.name()
                    );
                    let _ = parse.insert_comment(&comment);
                }
                return;
            }
        };
        let info = self.new_info(url.to_string(), url.clone(), link, true);
        let key = self.cache_key(url.as_str());
        let summary = self.lookup_or_compute(&key, |this| match this.context.fetcher.fetch(&url) {
            Ok(fetched) => {
                let charset = fetched.content_type.as_deref().and_then(content_type_charset);
                this.compute(&fetched.body, &url, charset)
            }
            Err(error) => {
                tracing::debug!(%url, %error, "stylesheet fetch failed");
                CachedSummary {
                    state: SummaryState::FetchFailed,
                    data: String::new(),
                }
            }
        });
        self.record(info, summary, element, None);
    }

    fn render_pending(&mut self, parse: &mut HtmlParse) {
        for pending in std::mem::take(&mut self.pending) {
            let Some(summary) = self.summaries.get(pending.pos) else {
                continue;
            };
            let rewritable = parse.is_rewritable(pending.element)
                && pending
                    .characters
                    .is_none_or(|characters| parse.is_rewritable(characters));
            if summary.state == SummaryState::Ok && rewritable {
                self.summarizer.render_summary(
                    parse,
                    pending.pos,
                    summary,
                    pending.element,
                    pending.characters,
                );
            } else {
                self.summarizer.will_not_render_summary(
                    parse,
                    pending.pos,
                    summary,
                    pending.element,
                    pending.characters,
                );
            }
        }
    }

    /// With `debug` set, list every summary's state in a comment.
    fn report_summaries_done(&self, parse: &mut HtmlParse) {
        if !self.context.options.debug {
            return;
        }
        let mut comment = format!("Summary computation status for {}\n", self.summarizer.name());
        for (index, summary) in self.summaries.iter().enumerate() {
            comment.push_str(&format!(
                "Resource {index} {}: {}\n",
                summary.location,
                summary.state.description()
            ));
        }
        let node = parse.new_comment_node(None, &comment);
        let _ = self.injection.insert(parse, node);
    }
}

fn is_whitespace(text: &str) -> bool {
    text.chars().all(|c| c.is_ascii_whitespace())
}

impl<S: CssSummarizer> HtmlFilter for CssSummarizerFilter<S> {
    fn start_document(&mut self, parse: &mut HtmlParse) {
        self.clear();
        self.summarizer.start_document(parse);
    }

    fn end_document(&mut self, _parse: &mut HtmlParse) {
        self.saw_end_document = true;
    }

    fn start_element(&mut self, parse: &mut HtmlParse, element: NodeId) {
        match parse.element(element).map(HtmlElement::keyword) {
            Some(Keyword::Style) => {
                self.style_element = Some(element);
                self.style_characters = None;
            }
            Some(Keyword::Noscript) if self.noscript.is_none() => self.noscript = Some(element),
            _ => {}
        }
    }

    fn characters(&mut self, parse: &mut HtmlParse, node: NodeId) {
        if self.style_element.is_some() {
            self.style_characters = Some(node);
            self.injection.clear();
        } else if !parse.contents(node).is_some_and(is_whitespace) {
            self.injection.clear();
        }
    }

    fn end_element(&mut self, parse: &mut HtmlParse, element: NodeId) {
        if self.style_element == Some(element) {
            self.style_element = None;
            if let Some(characters) = self.style_characters.take() {
                self.start_inline_rewrite(parse, element, characters);
            }
            return;
        }
        let Some(html) = parse.element(element) else {
            return;
        };
        match html.keyword() {
            Keyword::Link => {
                self.injection.clear();
                let is_stylesheet = html
                    .attribute_value(Keyword::Rel)
                    .is_some_and(is_stylesheet_or_alternate);
                if is_stylesheet && html.has_attribute(Keyword::Href) {
                    self.start_external_rewrite(parse, element);
                }
            }
            Keyword::Body => self.injection.set_body(element),
            Keyword::Html => self.injection.set_html(parse, element),
            keyword => {
                if keyword == Keyword::Noscript && self.noscript == Some(element) {
                    self.noscript = None;
                }
                self.injection.clear();
            }
        }
    }

    fn flush(&mut self, parse: &mut HtmlParse) {
        self.render_pending(parse);
        if self.saw_end_document {
            self.report_summaries_done(parse);
        }
        self.summarizer
            .render_done(parse, &self.injection, self.saw_end_document);
    }

    fn determine_enabled(&mut self, parse: &HtmlParse) -> FilterState {
        self.summarizer.determine_enabled(parse)
    }

    fn name(&self) -> &'static str {
        self.summarizer.name()
    }

    fn id(&self) -> &'static str {
        self.summarizer.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_content_dependent_states_are_cached() {
        let cached: Vec<_> = [
            SummaryState::Ok,
            SummaryState::StillPending,
            SummaryState::FetchFailed,
            SummaryState::ParseFailed,
            SummaryState::CharsetMismatch,
            SummaryState::ResourceCreationFailed,
        ]
        .into_iter()
        .filter(|state| state.is_cacheable())
        .collect();
        assert_eq!(
            cached,
            vec![SummaryState::Ok, SummaryState::ParseFailed, SummaryState::CharsetMismatch]
        );
    }

    #[test]
    fn test_whitespace() {
        assert!(is_whitespace(" \n\t"));
        assert!(is_whitespace(""));
        assert!(!is_whitespace(" x "));
    }
}
