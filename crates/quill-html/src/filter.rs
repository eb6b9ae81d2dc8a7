//! The filter and listener interfaces.
//!
//! Filters are driven by [`HtmlParse::flush`]: each enabled filter in turn
//! walks the events of the current flush window and may mutate the
//! document through the `&mut HtmlParse` it is handed. Listeners see every
//! event as it is appended, before any filter runs, and cannot mutate.

use quill_dom::NodeId;

use crate::parser::{HtmlEvent, HtmlParse};

/// Whether a filter takes part in the current document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterState {
    /// The filter runs.
    Enabled,
    /// The filter is skipped for this document.
    Disabled {
        /// Human-readable explanation, logged at debug level.
        reason: String,
    },
}

/// A document filter.
///
/// Every callback has an empty default so filters implement only what they
/// need. Node callbacks receive the id of the node under the cursor; the
/// node is rewritable for the duration of the call.
#[allow(unused_variables)]
pub trait HtmlFilter {
    /// The document starts.
    fn start_document(&mut self, parse: &mut HtmlParse) {}

    /// The document ended. Seen once, during the final flush.
    fn end_document(&mut self, parse: &mut HtmlParse) {}

    /// A start tag.
    fn start_element(&mut self, parse: &mut HtmlParse, element: NodeId) {}

    /// The end of an element, whatever its close style.
    fn end_element(&mut self, parse: &mut HtmlParse, element: NodeId) {}

    /// A run of text.
    fn characters(&mut self, parse: &mut HtmlParse, node: NodeId) {}

    /// `<!--...-->`
    fn comment(&mut self, parse: &mut HtmlParse, node: NodeId) {}

    /// `<![CDATA[...]]>`
    fn cdata(&mut self, parse: &mut HtmlParse, node: NodeId) {}

    /// `<!...>`, including the doctype.
    fn directive(&mut self, parse: &mut HtmlParse, node: NodeId) {}

    /// An IE conditional comment.
    fn ie_directive(&mut self, parse: &mut HtmlParse, node: NodeId) {}

    /// The end of the flush window, after the last event.
    fn flush(&mut self, parse: &mut HtmlParse) {}

    /// Decide once per document, at the first flush, whether to run.
    fn determine_enabled(&mut self, parse: &HtmlParse) -> FilterState {
        FilterState::Enabled
    }

    /// Name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Short identifier used in cache keys.
    fn id(&self) -> &'static str {
        self.name()
    }
}

/// An observer notified of every event as it is appended to the queue.
pub trait HtmlEventListener {
    /// `event` was just appended.
    fn on_event(&mut self, parse: &HtmlParse, event: HtmlEvent);

    /// A flush begins.
    fn flush(&mut self) {}
}
