use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use quill_common::stats::{Statistics, names};
use quill_dom::{
    CloseStyle, EventId, HtmlElement, HtmlName, HtmlNode, Keyword, NodeArena, NodeId, NodeKind,
    SymbolTable,
};
use thiserror::Error;
use url::Url;

use super::event::{EventList, HtmlEvent, ListId};
use crate::filter::{FilterState, HtmlEventListener, HtmlFilter};
use crate::lexer::{DocType, HtmlLexer};

/// Why a document is not being parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The document URL could not be parsed.
    #[error("invalid document URL: {url}")]
    InvalidUrl {
        /// The URL as given.
        url: String,
    },

    /// The document exceeded the size limit; the rest was discarded.
    #[error("HTML size limit of {limit} bytes exceeded")]
    SizeLimitExceeded {
        /// The configured limit.
        limit: usize,
    },
}

/// A node parked by a filter until it calls
/// [`HtmlParse::restore_deferred_node`].
#[derive(Debug, Clone, Copy)]
pub(super) struct Deferral {
    /// Index of the filter that deferred the node.
    pub(super) filter: Option<usize>,
    /// True while the node's end has not been seen, so newly lexed
    /// descendants must be routed to the deferred list.
    pub(super) open: bool,
}

#[derive(Debug, Clone, Copy)]
enum LeafKind {
    Characters,
    Comment,
    Cdata,
    Directive,
    IeDirective,
}

impl LeafKind {
    const fn of(kind: &NodeKind) -> Option<Self> {
        match kind {
            NodeKind::Element(_) => None,
            NodeKind::Characters(_) => Some(Self::Characters),
            NodeKind::Comment(_) => Some(Self::Comment),
            NodeKind::Cdata(_) => Some(Self::Cdata),
            NodeKind::Directive(_) => Some(Self::Directive),
            NodeKind::IeDirective(_) => Some(Self::IeDirective),
        }
    }
}

/// The streaming parse driver.
///
/// Owns the lexer, the event queue, every node of the document and the
/// filter chain. Input arrives through [`HtmlParse::parse_text`]; each
/// [`HtmlParse::flush`] runs the filters over the events lexed since the
/// previous flush and then releases them.
///
/// ```
/// use quill_html::{HtmlParse, HtmlWriterFilter, StringWriter};
///
/// let writer = StringWriter::default();
/// let mut parse = HtmlParse::new();
/// parse.add_filter(Box::new(HtmlWriterFilter::new(writer.clone())));
/// parse.start_parse("http://example.com/").unwrap();
/// parse.parse_text("<p class=intro>Hello</p>");
/// parse.finish_parse();
/// assert_eq!(writer.contents(), "<p class=intro>Hello</p>");
/// ```
#[allow(clippy::struct_excessive_bools)]
pub struct HtmlParse {
    lexer: HtmlLexer,
    pub(super) nodes: NodeArena,
    pub(super) events: EventList,
    names: SymbolTable,
    spellings: SymbolTable,
    filters: Vec<Box<dyn HtmlFilter>>,
    enabled: Option<Vec<bool>>,
    listeners: Vec<Box<dyn HtmlEventListener>>,
    /// Event under the cursor of the running filter.
    pub(super) current: Option<EventId>,
    /// Set when a mutation already moved `current` past the node it was on.
    pub(super) skip_increment: bool,
    /// Last event inserted after `current`, so successive insertions keep
    /// their order.
    pub(super) insert_after_cursor: Option<EventId>,
    running_filters: bool,
    pub(super) active_filter: Option<usize>,
    pub(super) need_sanity_check: bool,
    coalesce_characters: bool,
    pub(super) need_coalesce: bool,
    pub(super) deferred: HashMap<NodeId, Deferral>,
    active: bool,
    error: Option<ParseError>,
    url: Option<Url>,
    id: String,
    content_type: Option<String>,
    doctype: DocType,
    saw_doctype: bool,
    /// EndDocument is in the queue; set by the size limit or by
    /// [`HtmlParse::finish_parse`].
    end_document_queued: bool,
    /// EndDocument has been through the filters; later flushes do nothing.
    end_document_flushed: bool,
    size_limit: Option<usize>,
    log_rewrite_timing: bool,
    stats: Option<Arc<Statistics>>,
}

impl Default for HtmlParse {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HtmlParse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlParse")
            .field("id", &self.id)
            .field("doctype", &self.doctype)
            .field("filters", &self.filters.len())
            .field("nodes", &self.nodes.len())
            .field("queued", &self.events.len(ListId::Queue))
            .finish_non_exhaustive()
    }
}

impl HtmlParse {
    /// A driver with no filters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lexer: HtmlLexer::new(),
            nodes: NodeArena::new(),
            events: EventList::new(),
            names: SymbolTable::case_folded(),
            spellings: SymbolTable::case_preserving(),
            filters: Vec::new(),
            enabled: None,
            listeners: Vec::new(),
            current: None,
            skip_increment: false,
            insert_after_cursor: None,
            running_filters: false,
            active_filter: None,
            need_sanity_check: false,
            coalesce_characters: true,
            need_coalesce: false,
            deferred: HashMap::new(),
            active: false,
            error: None,
            url: None,
            id: String::new(),
            content_type: None,
            doctype: DocType::Unknown,
            saw_doctype: false,
            end_document_queued: false,
            end_document_flushed: false,
            size_limit: None,
            log_rewrite_timing: false,
            stats: None,
        }
    }

    // ===== Configuration =====

    /// Append a filter to the chain. Filters run in the order added.
    pub fn add_filter(&mut self, filter: Box<dyn HtmlFilter>) {
        self.filters.push(filter);
    }

    /// Register a listener. Must happen before the first byte is parsed.
    pub fn add_event_listener(&mut self, listener: Box<dyn HtmlEventListener>) {
        self.listeners.push(listener);
    }

    /// Whether adjacent Characters nodes are merged before each filter runs.
    pub const fn set_coalesce_characters(&mut self, coalesce: bool) {
        self.coalesce_characters = coalesce;
    }

    /// Maximum number of input bytes per document, `None` for unlimited.
    pub const fn set_size_limit(&mut self, limit: Option<usize>) {
        self.size_limit = limit;
    }

    /// Log the time spent in each entry point at info level.
    pub const fn set_log_rewrite_timing(&mut self, log: bool) {
        self.log_rewrite_timing = log;
    }

    /// Counters bumped by the parser.
    pub fn set_statistics(&mut self, stats: Arc<Statistics>) {
        self.stats = Some(stats);
    }

    // ===== Document state =====

    /// URL of the document being parsed.
    #[must_use]
    pub const fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Identifier used in diagnostics, normally the URL.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Content type given to [`HtmlParse::start_parse_with_id`].
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The document type, from the content type and the doctype directive.
    #[must_use]
    pub const fn doctype(&self) -> DocType {
        self.doctype
    }

    /// The line the lexer has reached.
    #[must_use]
    pub const fn line_number(&self) -> u32 {
        self.lexer.line()
    }

    /// Whether a document is being parsed.
    #[must_use]
    pub const fn is_parsing(&self) -> bool {
        self.active
    }

    /// Why the current document is not being parsed in full.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidUrl`] if the last
    /// [`HtmlParse::start_parse`] failed and [`ParseError::SizeLimitExceeded`]
    /// once input has been discarded.
    pub fn status(&self) -> Result<(), ParseError> {
        self.error.clone().map_or(Ok(()), Err)
    }

    /// Statistics attached with [`HtmlParse::set_statistics`].
    #[must_use]
    pub fn statistics(&self) -> Option<&Arc<Statistics>> {
        self.stats.as_ref()
    }

    // ===== Entry points =====

    /// Start a document whose id is its URL and whose type is HTML.
    ///
    /// # Errors
    ///
    /// See [`HtmlParse::start_parse_with_id`].
    pub fn start_parse(&mut self, url: &str) -> Result<(), ParseError> {
        self.start_parse_with_id(url, url, None)
    }

    /// Reset all per-document state and start a new document.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidUrl`] when `url` is not an absolute URL
    /// with a host. Every other call is then a no-op until the next start.
    pub fn start_parse_with_id(
        &mut self,
        url: &str,
        id: &str,
        content_type: Option<&str>,
    ) -> Result<(), ParseError> {
        self.reset();
        self.id = id.to_string();
        let Some(parsed) = quill_common::url::parse_document_url(url) else {
            tracing::warn!(url, "rejecting document with invalid URL");
            let error = ParseError::InvalidUrl {
                url: url.to_string(),
            };
            self.error = Some(error.clone());
            return Err(error);
        };
        self.url = Some(parsed);
        self.content_type = content_type.map(str::to_string);
        self.doctype = DocType::from_content_type(content_type);
        self.lexer.start_parse(self.size_limit);
        self.active = true;
        let _ = self.add_event(HtmlEvent::StartDocument, 0);
        self.notify_listeners(HtmlEvent::StartDocument);
        Ok(())
    }

    /// Lex a chunk of input. Events accumulate until the next flush.
    pub fn parse_text(&mut self, text: &str) {
        if !self.active {
            return;
        }
        let started = self.log_rewrite_timing.then(Instant::now);
        let mut lexer = std::mem::take(&mut self.lexer);
        lexer.parse(self, text);
        let exceeded = lexer.size_limit_exceeded();
        self.lexer = lexer;
        if exceeded && self.error.is_none() {
            let limit = self.size_limit.unwrap_or_default();
            tracing::info!(url = %self.id, limit, "HTML size limit exceeded, discarding rest of document");
            self.error = Some(ParseError::SizeLimitExceeded { limit });
            if let Some(stats) = &self.stats {
                stats.increment(names::HTML_SIZE_LIMIT_EXCEEDED);
            }
        }
        self.log_timing("parse_text", started);
    }

    /// Run every enabled filter over the events lexed so far.
    ///
    /// Once the size limit has been exceeded, the first flush afterwards
    /// closes the open elements and ends the document.
    pub fn flush(&mut self) {
        if self.running_filters || !self.active || self.end_document_flushed {
            return;
        }
        let started = self.log_rewrite_timing.then(Instant::now);
        for listener in &mut self.listeners {
            listener.flush();
        }
        if self.lexer.size_limit_exceeded() {
            self.queue_end_document();
        } else {
            let mut lexer = std::mem::take(&mut self.lexer);
            lexer.flush(self);
            self.lexer = lexer;
        }

        // A literal element whose body has not arrived is held back until
        // its text is complete.
        self.events
            .splice_all_to_front(ListId::DelayedLiteral, ListId::Queue);
        if let Some(literal) = self.lexer.open_literal_element()
            && let Some(begin) = self.nodes.get(literal).and_then(|node| node.begin)
            && self.events.is_in(begin, ListId::Queue)
            && let Some(tail) = self.events.tail(ListId::Queue)
        {
            let _ = self.events.splice(begin, tail, ListId::DelayedLiteral, None);
        }

        self.determine_enabled_filters();
        let enabled = self.enabled.clone().unwrap_or_default();
        let mut filters = std::mem::take(&mut self.filters);
        self.running_filters = true;
        for (index, filter) in filters.iter_mut().enumerate() {
            if !enabled.get(index).copied().unwrap_or(false) {
                continue;
            }
            self.route_deferred_descendants(index);
            self.active_filter = Some(index);
            self.apply_filter(filter.as_mut());
        }
        self.running_filters = false;
        self.active_filter = None;
        filters.append(&mut self.filters);
        self.filters = filters;

        self.clear_events();
        self.end_document_flushed = self.end_document_queued;
        self.log_timing("flush", started);
    }

    /// Close what the lexer still holds and queue EndDocument, once.
    fn queue_end_document(&mut self) {
        if self.end_document_queued {
            return;
        }
        let mut lexer = std::mem::take(&mut self.lexer);
        lexer.finish(self);
        let line = lexer.line();
        self.lexer = lexer;
        let _ = self.add_event(HtmlEvent::EndDocument, line);
        self.notify_listeners(HtmlEvent::EndDocument);
        self.end_document_queued = true;
    }

    /// End the document: emit what the lexer still holds, send EndDocument
    /// through a final flush and release every node.
    pub fn finish_parse(&mut self) {
        if !self.active {
            return;
        }
        let started = self.log_rewrite_timing.then(Instant::now);
        self.queue_end_document();
        self.flush();
        self.release_leaked_deferrals();
        self.nodes.clear();
        self.events.clear();
        self.names.clear();
        self.spellings.clear();
        self.active = false;
        self.log_timing("finish_parse", started);
    }

    fn reset(&mut self) {
        self.nodes.clear();
        self.events.clear();
        self.names.clear();
        self.spellings.clear();
        self.enabled = None;
        self.current = None;
        self.skip_increment = false;
        self.insert_after_cursor = None;
        self.active_filter = None;
        self.need_sanity_check = false;
        self.need_coalesce = false;
        self.deferred.clear();
        self.active = false;
        self.error = None;
        self.url = None;
        self.content_type = None;
        self.doctype = DocType::Unknown;
        self.saw_doctype = false;
        self.end_document_queued = false;
        self.end_document_flushed = false;
        self.lexer = HtmlLexer::new();
    }

    fn log_timing(&self, operation: &str, started: Option<Instant>) {
        if let Some(started) = started {
            tracing::info!(
                url = %self.id,
                operation,
                elapsed = ?started.elapsed(),
                "rewrite timing"
            );
        }
    }

    // ===== Filter driving =====

    fn determine_enabled_filters(&mut self) {
        if self.enabled.is_some() {
            return;
        }
        let mut filters = std::mem::take(&mut self.filters);
        let enabled = filters
            .iter_mut()
            .map(|filter| match filter.determine_enabled(self) {
                FilterState::Enabled => true,
                FilterState::Disabled { reason } => {
                    tracing::debug!(url = %self.id, filter = filter.name(), %reason, "filter disabled");
                    false
                }
            })
            .collect();
        self.filters = filters;
        self.enabled = Some(enabled);
    }

    /// Run one filter over the queue.
    pub(crate) fn apply_filter(&mut self, filter: &mut dyn HtmlFilter) {
        if self.coalesce_characters && self.need_coalesce {
            self.coalesce_adjacent_characters();
            self.need_coalesce = false;
        }
        self.current = self.events.head(ListId::Queue);
        while let Some(id) = self.current {
            self.skip_increment = false;
            self.insert_after_cursor = None;
            if let Some(event) = self.events.get(id) {
                self.dispatch(filter, event);
            }
            if self.skip_increment {
                self.skip_increment = false;
            } else {
                self.current = self.current.and_then(|current| self.events.next(current));
            }
        }
        self.insert_after_cursor = None;
        filter.flush(self);
        if self.need_sanity_check {
            self.sanity_check();
            self.need_sanity_check = false;
        }
    }

    fn dispatch(&mut self, filter: &mut dyn HtmlFilter, event: HtmlEvent) {
        match event {
            HtmlEvent::StartDocument => filter.start_document(self),
            HtmlEvent::EndDocument => filter.end_document(self),
            HtmlEvent::StartElement(element) => filter.start_element(self, element),
            HtmlEvent::EndElement(element) => filter.end_element(self, element),
            HtmlEvent::Leaf(node) => {
                match self.nodes.get(node).and_then(|n| LeafKind::of(&n.kind)) {
                    Some(LeafKind::Characters) => filter.characters(self, node),
                    Some(LeafKind::Comment) => filter.comment(self, node),
                    Some(LeafKind::Cdata) => filter.cdata(self, node),
                    Some(LeafKind::Directive) => filter.directive(self, node),
                    Some(LeafKind::IeDirective) => filter.ie_directive(self, node),
                    None => {}
                }
            }
        }
    }

    /// Move newly lexed events belonging to nodes that `filter` deferred
    /// before their end arrived onto the deferred lists.
    fn route_deferred_descendants(&mut self, filter: usize) {
        let open: Vec<NodeId> = self
            .deferred
            .iter()
            .filter(|(_, deferral)| deferral.open && deferral.filter == Some(filter))
            .map(|(&node, _)| node)
            .collect();
        for node in open {
            while let Some(head) = self.events.head(ListId::Queue) {
                let Some(event) = self.events.get(head) else {
                    break;
                };
                let Some(owner) = event.node() else {
                    break;
                };
                if owner != node && !self.nodes.is_descendant_of(owner, node) {
                    break;
                }
                let _ = self
                    .events
                    .splice(head, head, ListId::Deferred(node), None);
                if event == HtmlEvent::EndElement(node) {
                    if let Some(deferral) = self.deferred.get_mut(&node) {
                        deferral.open = false;
                    }
                    break;
                }
            }
        }
    }

    /// Release the events of the finished flush window.
    fn clear_events(&mut self) {
        for event in self.events.take_list(ListId::Queue) {
            match event {
                HtmlEvent::StartDocument | HtmlEvent::EndDocument => {}
                HtmlEvent::StartElement(element) => {
                    if let Some(node) = self.nodes.get_mut(element) {
                        node.begin = None;
                    }
                }
                HtmlEvent::EndElement(element) => {
                    if let Some(node) = self.nodes.get_mut(element) {
                        node.end = None;
                        node.live = false;
                    }
                }
                HtmlEvent::Leaf(leaf) => {
                    if let Some(node) = self.nodes.get_mut(leaf) {
                        node.begin = None;
                        node.end = None;
                        node.live = false;
                    }
                }
            }
        }
        self.current = None;
    }

    fn release_leaked_deferrals(&mut self) {
        let mut leaked: Vec<NodeId> = self.deferred.keys().copied().collect();
        leaked.sort_unstable();
        for node in leaked {
            let filter = self
                .deferred
                .get(&node)
                .and_then(|deferral| deferral.filter)
                .and_then(|index| self.filters.get(index))
                .map_or("unknown", |filter| filter.name());
            tracing::warn!(url = %self.id, filter, node = node.0, "deferred node was never restored");
            for event in self.events.take_list(ListId::Deferred(node)) {
                if let Some(owner) = event.node() {
                    self.nodes.release(owner);
                }
            }
        }
        self.deferred.clear();
    }

    /// Merge runs of adjacent Characters events into the first node.
    fn coalesce_adjacent_characters(&mut self) {
        let mut previous: Option<NodeId> = None;
        let mut cursor = self.events.head(ListId::Queue);
        while let Some(id) = cursor {
            let next = self.events.next(id);
            let text_node = match self.events.get(id) {
                Some(HtmlEvent::Leaf(node)) if self.nodes.get(node).is_some_and(HtmlNode::is_characters) => {
                    Some(node)
                }
                _ => None,
            };
            match (previous, text_node) {
                (Some(first), Some(node)) => {
                    let text = self
                        .nodes
                        .get_mut(node)
                        .and_then(|n| n.kind.contents_mut())
                        .map(std::mem::take)
                        .unwrap_or_default();
                    if let Some(contents) = self.nodes.get_mut(first).and_then(|n| n.kind.contents_mut()) {
                        contents.push_str(&text);
                    }
                    let _ = self.events.remove(id);
                    self.nodes.release(node);
                }
                (_, text_node) => previous = text_node,
            }
            cursor = next;
        }
    }

    /// Check the queue against the node links and log every violation.
    fn sanity_check(&self) {
        let mut open: Vec<NodeId> = Vec::new();
        for id in self.events.ids(ListId::Queue) {
            let Some(event) = self.events.get(id) else {
                continue;
            };
            let Some(node_id) = event.node() else {
                continue;
            };
            let Some(node) = self.nodes.get(node_id) else {
                tracing::error!(url = %self.id, %event, "event refers to an unknown node");
                continue;
            };
            if !node.live {
                tracing::error!(url = %self.id, %event, "event refers to a dead node");
            }
            match event {
                HtmlEvent::StartElement(_) => {
                    if node.begin != Some(id) {
                        tracing::error!(url = %self.id, %event, "element begin does not match its event");
                    }
                    if let Some(&top) = open.last()
                        && node.parent != Some(top)
                    {
                        tracing::error!(url = %self.id, %event, "element parent does not match the open element");
                    }
                    open.push(node_id);
                }
                HtmlEvent::EndElement(_) => {
                    if node.end != Some(id) {
                        tracing::error!(url = %self.id, %event, "element end does not match its event");
                    }
                    match open.last() {
                        Some(&top) if top == node_id => {
                            let _ = open.pop();
                        }
                        Some(_) => {
                            tracing::error!(url = %self.id, %event, "end of element that is not innermost");
                        }
                        None => {}
                    }
                }
                HtmlEvent::Leaf(_) => {
                    if node.begin != Some(id) || node.end != Some(id) {
                        tracing::error!(url = %self.id, %event, "leaf does not point at its event");
                    }
                    if let Some(&top) = open.last()
                        && node.parent != Some(top)
                    {
                        tracing::error!(url = %self.id, %event, "leaf parent does not match the open element");
                    }
                }
                HtmlEvent::StartDocument | HtmlEvent::EndDocument => {}
            }
        }
    }

    // ===== Events =====

    /// Append a lexed event to the queue.
    fn add_event(&mut self, event: HtmlEvent, line: u32) -> EventId {
        let id = self.events.push_back(ListId::Queue, event, line);
        self.need_coalesce = true;
        id
    }

    pub(super) fn notify_listeners(&mut self, event: HtmlEvent) {
        if self.listeners.is_empty() {
            return;
        }
        let mut listeners = std::mem::take(&mut self.listeners);
        for listener in &mut listeners {
            listener.on_event(self, event);
        }
        listeners.append(&mut self.listeners);
        self.listeners = listeners;
    }

    // ===== Lexer interface =====

    /// Intern a tag or attribute name.
    pub fn make_name(&mut self, text: &str) -> HtmlName {
        HtmlName::new(text, &mut self.names, &mut self.spellings)
    }

    /// Intern the canonical name of `keyword`.
    pub fn make_keyword_name(&mut self, keyword: Keyword) -> HtmlName {
        HtmlName::from_keyword(keyword, &mut self.names)
    }

    pub(crate) fn new_lexed_element(
        &mut self,
        parent: Option<NodeId>,
        name: HtmlName,
        line: u32,
    ) -> NodeId {
        let mut element = HtmlElement::new(name);
        element.set_begin_line(line);
        self.nodes.alloc(NodeKind::Element(element), parent)
    }

    pub(crate) fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) {
        if let Some(node) = self.nodes.get_mut(node) {
            node.parent = parent;
        }
    }

    pub(crate) fn add_element(&mut self, element: NodeId, line: u32) {
        let id = self.add_event(HtmlEvent::StartElement(element), line);
        if let Some(node) = self.nodes.get_mut(element) {
            node.begin = Some(id);
            node.in_document = true;
            if let Some(element) = node.as_element_mut() {
                element.set_begin_line(line);
            }
        }
        self.notify_listeners(HtmlEvent::StartElement(element));
    }

    pub(crate) fn close_element(&mut self, element: NodeId, close_style: CloseStyle, line: u32) {
        let id = self.add_event(HtmlEvent::EndElement(element), line);
        if let Some(node) = self.nodes.get_mut(element) {
            node.end = Some(id);
            if let Some(element) = node.as_element_mut() {
                element.set_close_style(close_style);
                element.set_end_line(line);
            }
        }
        self.notify_listeners(HtmlEvent::EndElement(element));
    }

    pub(crate) fn add_leaf(&mut self, kind: NodeKind, parent: Option<NodeId>, line: u32) -> NodeId {
        let node = self.nodes.alloc(kind, parent);
        let id = self.add_event(HtmlEvent::Leaf(node), line);
        if let Some(leaf) = self.nodes.get_mut(node) {
            leaf.begin = Some(id);
            leaf.end = Some(id);
            leaf.in_document = true;
        }
        self.notify_listeners(HtmlEvent::Leaf(node));
        node
    }

    pub(crate) fn observe_directive(&mut self, directive: &str) {
        if self.saw_doctype {
            return;
        }
        if let Some(doctype) = DocType::parse(directive, self.content_type.as_deref()) {
            self.doctype = doctype;
            self.saw_doctype = true;
        }
    }
}
