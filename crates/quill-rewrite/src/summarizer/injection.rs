//! Where end-of-page content goes.

use quill_dom::NodeId;
use quill_html::HtmlParse;

/// Tracks the best place to add nodes at the end of the body.
///
/// The close of `<body>` is preferred, then the close of `<html>`. Content
/// that follows either (anything but whitespace, or another close tag)
/// means appending there would reorder the page, so the point is dropped
/// and nodes go to the end of the document instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct InjectionPoint {
    element: Option<NodeId>,
}

impl InjectionPoint {
    /// Forget the current point.
    pub const fn clear(&mut self) {
        self.element = None;
    }

    /// `</body>` was seen.
    pub const fn set_body(&mut self, body: NodeId) {
        self.element = Some(body);
    }

    /// `</html>` was seen. It replaces the body only when nodes can no
    /// longer be appended to the body.
    pub fn set_html(&mut self, parse: &HtmlParse, html: NodeId) {
        let body_unusable = self
            .element
            .is_none_or(|point| !parse.can_append_child(point));
        if body_unusable && parse.can_append_child(html) {
            self.element = Some(html);
        }
    }

    /// The element nodes would be appended to, if it is still usable.
    #[must_use]
    pub fn element(&self, parse: &HtmlParse) -> Option<NodeId> {
        self.element.filter(|&point| parse.can_append_child(point))
    }

    /// Add `node` as the last child of the injection point, or before the
    /// current event when there is none or it refuses the node.
    pub fn insert(&self, parse: &mut HtmlParse, node: NodeId) -> bool {
        if let Some(point) = self.element(parse)
            && parse.append_child(point, node)
        {
            return true;
        }
        parse.insert_before_current(node)
    }
}
