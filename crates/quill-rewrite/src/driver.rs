//! One document through the rewriter.

use std::sync::Arc;

use quill_html::{HtmlParse, HtmlWriterFilter, ParseError, StringWriter};

use crate::context::ServerContext;
use crate::critical_selector::CriticalSelectorFilter;

/// Rewrites HTML documents with the critical CSS filter.
///
/// A driver owns one [`HtmlParse`] and may be reused for any number of
/// documents, one at a time. Output accumulates in the writer and is
/// handed out by [`RewriteDriver::take_output`].
pub struct RewriteDriver {
    context: ServerContext,
    parse: HtmlParse,
    output: StringWriter,
}

impl RewriteDriver {
    /// A driver with the filter chain configured from `context`.
    #[must_use]
    pub fn new(context: ServerContext) -> Self {
        let output = StringWriter::default();
        let mut parse = HtmlParse::new();
        parse.set_size_limit(context.options.html_size_limit());
        parse.set_log_rewrite_timing(context.options.log_rewrite_timing);
        parse.set_statistics(Arc::clone(&context.stats));
        parse.add_filter(Box::new(CriticalSelectorFilter::from_context(&context)));
        parse.add_filter(Box::new(HtmlWriterFilter::new(output.clone())));
        Self {
            context,
            parse,
            output,
        }
    }

    /// The collaborators this driver was built from.
    #[must_use]
    pub const fn context(&self) -> &ServerContext {
        &self.context
    }

    /// Start a document at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidUrl`] when `url` is not absolute.
    pub fn start(&mut self, url: &str) -> Result<(), ParseError> {
        let _ = self.output.take();
        self.parse.start_parse(url)
    }

    /// Feed a chunk of the document.
    pub fn parse_text(&mut self, text: &str) {
        self.parse.parse_text(text);
    }

    /// Rewrite and emit everything fed so far.
    pub fn flush(&mut self) {
        self.parse.flush();
    }

    /// End the document.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::SizeLimitExceeded`] when input was discarded.
    /// The output written up to the limit is still available.
    pub fn finish(&mut self) -> Result<(), ParseError> {
        self.parse.finish_parse();
        self.parse.status()
    }

    /// The HTML written since the last call.
    #[must_use]
    pub fn take_output(&mut self) -> String {
        self.output.take()
    }

    /// Rewrite a whole document, flushing between chunks. The last chunk
    /// is flushed together with the end of the document.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidUrl`] when `url` is not absolute. A
    /// document over the size limit is not an error here; its output ends
    /// where the input was cut.
    pub fn rewrite_html<'a>(
        &mut self,
        url: &str,
        chunks: impl IntoIterator<Item = &'a str>,
    ) -> Result<String, ParseError> {
        self.start(url)?;
        let mut chunks = chunks.into_iter().peekable();
        while let Some(chunk) = chunks.next() {
            self.parse_text(chunk);
            if chunks.peek().is_some() {
                self.flush();
            }
        }
        if let Err(error) = self.finish() {
            tracing::debug!(url, %error, "document rewritten partially");
        }
        Ok(self.take_output())
    }
}

impl std::fmt::Debug for RewriteDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewriteDriver")
            .field("context", &self.context)
            .field("url", &self.parse.url())
            .finish_non_exhaustive()
    }
}

/// Rewrite `html` at `url` in a single pass, splitting it into chunks of
/// `chunk_size` bytes (rounded to character boundaries) with a flush
/// between them. A `chunk_size` of zero feeds the whole document at once.
///
/// # Errors
///
/// See [`RewriteDriver::rewrite_html`].
pub fn rewrite_html(
    context: &ServerContext,
    url: &str,
    html: &str,
    chunk_size: usize,
) -> Result<String, ParseError> {
    let mut driver = RewriteDriver::new(context.clone());
    driver.rewrite_html(url, split_chunks(html, chunk_size))
}

/// Split `text` into pieces of at least `size` bytes that end on character
/// boundaries.
fn split_chunks(text: &str, size: usize) -> Vec<&str> {
    if size == 0 {
        return vec![text];
    }
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let mut end = size.min(rest.len());
        while !rest.is_char_boundary(end) {
            end += 1;
        }
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}
