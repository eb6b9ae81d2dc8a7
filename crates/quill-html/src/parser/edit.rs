//! The DOM mutation surface offered to filters.
//!
//! Mutations only apply inside the current flush window. Every operation
//! that can be refused returns `false` and leaves the document untouched;
//! none of them report errors otherwise.

use quill_dom::{
    keywords, CloseStyle, EventId, HtmlElement, HtmlNode, Keyword, NodeId, NodeKind,
};

use super::core::{Deferral, HtmlParse};
use super::event::{HtmlEvent, ListId};

impl HtmlParse {
    // ===== Node access =====

    /// Look up a node.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&HtmlNode> {
        self.nodes.get(node)
    }

    /// The element payload of `node`.
    #[must_use]
    pub fn element(&self, node: NodeId) -> Option<&HtmlElement> {
        self.nodes.element(node)
    }

    /// Mutable element payload of `node`.
    pub fn element_mut(&mut self, node: NodeId) -> Option<&mut HtmlElement> {
        self.nodes.element_mut(node)
    }

    /// The enclosing element of `node`.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.parent(node)
    }

    /// Text of a leaf node.
    #[must_use]
    pub fn contents(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node).and_then(|n| n.kind.contents())
    }

    /// Mutable text of a leaf node.
    pub fn contents_mut(&mut self, node: NodeId) -> Option<&mut String> {
        self.nodes.get_mut(node).and_then(|n| n.kind.contents_mut())
    }

    /// Whether `node` has been neither deleted nor flushed.
    #[must_use]
    pub fn is_live(&self, node: NodeId) -> bool {
        self.nodes.is_live(node)
    }

    /// The event under the running filter's cursor.
    #[must_use]
    pub fn current_event(&self) -> Option<HtmlEvent> {
        self.current.and_then(|id| self.events.get(id))
    }

    /// Add an attribute with a plain-text value to `element`.
    pub fn add_attribute(&mut self, element: NodeId, keyword: Keyword, value: Option<&str>) -> bool {
        let name = self.make_keyword_name(keyword);
        match self.nodes.element_mut(element) {
            Some(element) => {
                element.add_attribute_value(name, value);
                true
            }
            None => false,
        }
    }

    // ===== Factories =====

    /// A new element, not yet in the document.
    pub fn new_element(&mut self, parent: Option<NodeId>, name: &str) -> NodeId {
        let name = self.make_name(name);
        self.nodes.alloc(NodeKind::Element(HtmlElement::new(name)), parent)
    }

    /// A new element named by `keyword`.
    pub fn new_keyword_element(&mut self, parent: Option<NodeId>, keyword: Keyword) -> NodeId {
        let name = self.make_keyword_name(keyword);
        self.nodes.alloc(NodeKind::Element(HtmlElement::new(name)), parent)
    }

    /// A new Characters node. `text` is written verbatim, so it must
    /// already be escaped.
    pub fn new_characters_node(&mut self, parent: Option<NodeId>, text: &str) -> NodeId {
        self.nodes.alloc(NodeKind::Characters(text.to_string()), parent)
    }

    /// A new comment node.
    pub fn new_comment_node(&mut self, parent: Option<NodeId>, text: &str) -> NodeId {
        self.nodes.alloc(NodeKind::Comment(text.to_string()), parent)
    }

    /// A new CDATA node.
    pub fn new_cdata_node(&mut self, parent: Option<NodeId>, text: &str) -> NodeId {
        self.nodes.alloc(NodeKind::Cdata(text.to_string()), parent)
    }

    /// A new directive node.
    pub fn new_directive_node(&mut self, parent: Option<NodeId>, text: &str) -> NodeId {
        self.nodes.alloc(NodeKind::Directive(text.to_string()), parent)
    }

    /// A new IE conditional-comment node.
    pub fn new_ie_directive_node(&mut self, parent: Option<NodeId>, text: &str) -> NodeId {
        self.nodes.alloc(NodeKind::IeDirective(text.to_string()), parent)
    }

    /// A copy of `element` with the same name, attributes and close style,
    /// but no children and no place in the document.
    pub fn clone_element(&mut self, element: NodeId) -> Option<NodeId> {
        let copy = self.nodes.element(element)?.clone();
        Some(self.nodes.alloc(NodeKind::Element(copy), None))
    }

    // ===== Predicates =====

    fn in_queue(&self, event: Option<EventId>) -> bool {
        event.is_some_and(|id| self.events.is_in(id, ListId::Queue))
    }

    /// Whether both events of `node` are in the flush window.
    #[must_use]
    pub fn is_rewritable(&self, node: NodeId) -> bool {
        self.nodes
            .get(node)
            .is_some_and(|n| n.live && self.in_queue(n.begin) && self.in_queue(n.end))
    }

    /// Whether children can still be appended to `node`: its end is in the
    /// flush window even if its start has been flushed.
    #[must_use]
    pub fn can_append_child(&self, node: NodeId) -> bool {
        self.nodes
            .get(node)
            .is_some_and(|n| n.live && n.is_element() && self.in_queue(n.end))
    }

    /// Whether `element` has a child between its events in this window.
    #[must_use]
    pub fn has_children_in_flush_window(&self, element: NodeId) -> bool {
        if !self.is_rewritable(element) {
            return false;
        }
        let Some(node) = self.nodes.get(element) else {
            return false;
        };
        node.begin.and_then(|begin| self.events.next(begin)) != node.end
    }

    /// Whether `node` is parked on a deferred list.
    #[must_use]
    pub fn is_deferred(&self, node: NodeId) -> bool {
        self.deferred.contains_key(&node)
    }

    /// Whether `node` is live and has never been placed in the document.
    /// An element still open from an earlier window has no `begin` event
    /// but is not detached.
    #[must_use]
    pub fn is_detached(&self, node: NodeId) -> bool {
        self.nodes.is_detached(node)
    }

    // ===== Event plumbing =====

    fn mark_mutated(&mut self) {
        self.need_coalesce = true;
        self.need_sanity_check = true;
    }

    fn set_node_parent(&mut self, node: NodeId, parent: Option<NodeId>) {
        if let Some(node) = self.nodes.get_mut(node) {
            node.parent = parent;
        }
    }

    /// Give a detached node its events, before `before` or at the tail.
    fn insert_node_events(&mut self, node: NodeId, before: Option<EventId>) -> bool {
        let Some(is_element) = self.nodes.get(node).map(HtmlNode::is_element) else {
            return false;
        };
        let line = before.map_or(0, |id| self.events.line(id));
        let (begin, end) = if is_element {
            let begin = self
                .events
                .insert_before(ListId::Queue, before, HtmlEvent::StartElement(node), line);
            let end = self
                .events
                .insert_before(ListId::Queue, before, HtmlEvent::EndElement(node), line);
            (begin, end)
        } else {
            let leaf = self
                .events
                .insert_before(ListId::Queue, before, HtmlEvent::Leaf(node), line);
            (leaf, leaf)
        };
        if let Some(n) = self.nodes.get_mut(node) {
            n.begin = Some(begin);
            n.end = Some(end);
            n.in_document = true;
        }
        if is_element {
            self.notify_listeners(HtmlEvent::StartElement(node));
            self.notify_listeners(HtmlEvent::EndElement(node));
        } else {
            self.notify_listeners(HtmlEvent::Leaf(node));
        }
        self.mark_mutated();
        true
    }

    /// The end of the queue, ahead of a trailing EndDocument.
    fn document_tail(&self) -> Option<EventId> {
        self.events
            .tail(ListId::Queue)
            .filter(|&tail| self.events.get(tail) == Some(HtmlEvent::EndDocument))
    }

    /// Parent for a node placed just before `event`.
    fn parent_before_event(&self, event: EventId) -> Option<NodeId> {
        match self.events.get(event)? {
            HtmlEvent::EndElement(element) => Some(element),
            HtmlEvent::StartElement(node) | HtmlEvent::Leaf(node) => self.nodes.parent(node),
            HtmlEvent::StartDocument | HtmlEvent::EndDocument => None,
        }
    }

    /// Parent for a node placed just after `event`.
    fn parent_after_event(&self, event: EventId) -> Option<NodeId> {
        match self.events.get(event)? {
            HtmlEvent::StartElement(element) => Some(element),
            HtmlEvent::EndElement(node) | HtmlEvent::Leaf(node) => self.nodes.parent(node),
            HtmlEvent::StartDocument | HtmlEvent::EndDocument => None,
        }
    }

    // ===== Insertion =====

    /// Insert `new` as the previous sibling of `existing`.
    pub fn insert_before_node(&mut self, existing: NodeId, new: NodeId) -> bool {
        if !self.is_rewritable(existing) || !self.is_detached(new) {
            return false;
        }
        let begin = self.nodes.get(existing).and_then(|n| n.begin);
        self.set_node_parent(new, self.nodes.parent(existing));
        self.insert_node_events(new, begin)
    }

    /// Insert `new` as the next sibling of `existing`.
    pub fn insert_after_node(&mut self, existing: NodeId, new: NodeId) -> bool {
        if !self.is_rewritable(existing) || !self.is_detached(new) {
            return false;
        }
        let after = self
            .nodes
            .get(existing)
            .and_then(|n| n.end)
            .and_then(|end| self.events.next(end));
        self.set_node_parent(new, self.nodes.parent(existing));
        self.insert_node_events(new, after)
    }

    /// Insert `new` as the first child of `existing`.
    pub fn prepend_child(&mut self, existing: NodeId, new: NodeId) -> bool {
        let is_element = self.nodes.get(existing).is_some_and(HtmlNode::is_element);
        if !is_element || !self.is_rewritable(existing) || !self.is_detached(new) {
            return false;
        }
        let after_begin = self
            .nodes
            .get(existing)
            .and_then(|n| n.begin)
            .and_then(|begin| self.events.next(begin));
        self.set_node_parent(new, Some(existing));
        self.insert_node_events(new, after_begin)
    }

    /// Insert `new` as the last child of `existing`. Only the end of
    /// `existing` needs to be in the flush window.
    pub fn append_child(&mut self, existing: NodeId, new: NodeId) -> bool {
        if !self.can_append_child(existing) || !self.is_detached(new) {
            return false;
        }
        let end = self.nodes.get(existing).and_then(|n| n.end);
        self.set_node_parent(new, Some(existing));
        self.insert_node_events(new, end)
    }

    /// Insert `new` just before the cursor. The running filter has already
    /// passed that point, so only later filters see `new`.
    ///
    /// Outside a filter run `new` goes to the end of the document. A node
    /// without a parent is given the one implied by its position.
    pub fn insert_before_current(&mut self, new: NodeId) -> bool {
        if !self.is_detached(new) {
            return false;
        }
        let Some(current) = self.current.filter(|&id| self.events.is_in(id, ListId::Queue)) else {
            let tail = self.document_tail();
            return self.insert_node_events(new, tail);
        };
        if self.nodes.parent(new).is_none() {
            self.set_node_parent(new, self.parent_before_event(current));
        }
        self.insert_node_events(new, Some(current))
    }

    /// Insert `new` after the cursor, so the running filter visits it next.
    ///
    /// Successive calls from one callback keep their order.
    pub fn insert_after_current(&mut self, new: NodeId) -> bool {
        if !self.is_detached(new) {
            return false;
        }
        let Some(current) = self.current.filter(|&id| self.events.is_in(id, ListId::Queue)) else {
            return self.insert_before_current(new);
        };
        let anchor = self
            .insert_after_cursor
            .filter(|&id| self.events.is_in(id, ListId::Queue))
            .unwrap_or(current);
        if self.nodes.parent(new).is_none() {
            self.set_node_parent(new, self.parent_after_event(current));
        }
        let before = self.events.next(anchor);
        if !self.insert_node_events(new, before) {
            return false;
        }
        self.insert_after_cursor = self.nodes.get(new).and_then(|n| n.end);
        true
    }

    /// Insert an escaped comment at the cursor, or at the end of the
    /// document outside a filter run.
    ///
    /// Comments cannot go inside `<script>` and friends; the comment is
    /// placed before the enclosing literal element instead.
    pub fn insert_comment(&mut self, text: &str) -> bool {
        let escaped = keywords::escape(text);
        let parent = self
            .current
            .filter(|&id| self.events.is_in(id, ListId::Queue))
            .and_then(|id| self.parent_before_event(id));
        let literal = parent.filter(|&p| {
            self.nodes
                .element(p)
                .is_some_and(|e| keywords::is_literal_tag(e.keyword()))
        });
        if let Some(literal) = literal {
            let comment = self.new_comment_node(self.nodes.parent(literal), &escaped);
            return self.insert_before_node(literal, comment);
        }
        let comment = self.new_comment_node(parent, &escaped);
        self.insert_before_current(comment)
    }

    // ===== Removal =====

    /// Remove `node` and everything inside it.
    ///
    /// If the cursor was inside the removed range it moves to the event
    /// after it, and the running filter continues from there.
    pub fn delete_node(&mut self, node: NodeId) -> bool {
        if !self.is_rewritable(node) {
            return false;
        }
        let Some((Some(begin), Some(end))) = self.nodes.get(node).map(|n| (n.begin, n.end)) else {
            return false;
        };
        let after = self.events.next(end);
        let mut removed_current = false;
        let mut cursor = Some(begin);
        while let Some(id) = cursor {
            let next = self.events.next(id);
            removed_current |= self.current == Some(id);
            if let Some(owner) = self.events.get(id).and_then(HtmlEvent::node) {
                self.nodes.release(owner);
            }
            let _ = self.events.remove(id);
            if id == end {
                break;
            }
            cursor = next;
        }
        self.set_node_parent(node, None);
        if removed_current {
            self.current = after;
            self.skip_increment = true;
        }
        self.insert_after_cursor = None;
        self.mark_mutated();
        true
    }

    /// Remove `element` but keep its children, which move up to the
    /// element's parent.
    pub fn delete_saving_children(&mut self, element: NodeId) -> bool {
        if !self.is_rewritable(element) {
            return false;
        }
        let Some((Some(begin), Some(end))) = self.nodes.get(element).map(|n| (n.begin, n.end)) else {
            return false;
        };
        let first = self.events.next(begin).filter(|&id| id != end);
        if let (Some(first), Some(last)) = (first, self.events.prev(end)) {
            let grandparent = self.nodes.parent(element);
            let mut cursor = Some(first);
            while let Some(id) = cursor {
                if let Some(child) = self.events.get(id).and_then(HtmlEvent::node)
                    && self.nodes.parent(child) == Some(element)
                {
                    self.set_node_parent(child, grandparent);
                }
                if id == last {
                    break;
                }
                cursor = self.events.next(id);
            }
            let _ = self.events.splice(first, last, ListId::Queue, Some(begin));
            if self.current == Some(begin) {
                // The filter is on the start tag: let it go on to the
                // promoted children.
                let _ = self.delete_node(element);
                self.current = Some(first);
                self.skip_increment = true;
                return true;
            }
        }
        self.delete_node(element)
    }

    /// Put `new` where `existing` is and delete `existing`.
    pub fn replace_node(&mut self, existing: NodeId, new: NodeId) -> bool {
        if !self.is_rewritable(existing) || !self.is_detached(new) {
            return false;
        }
        self.insert_before_node(existing, new) && self.delete_node(existing)
    }

    /// Suppress the tags of `element` on output; its children still render.
    pub fn make_element_invisible(&mut self, element: NodeId) -> bool {
        if !self.is_rewritable(element) {
            return false;
        }
        match self.nodes.element_mut(element) {
            Some(element) => {
                element.set_close_style(CloseStyle::Invisible);
                true
            }
            None => false,
        }
    }

    // ===== Restructuring =====

    /// Wrap the siblings `first..=last` in the detached element `new_parent`.
    pub fn add_parent_to_sequence(&mut self, first: NodeId, last: NodeId, new_parent: NodeId) -> bool {
        let is_element = self.nodes.get(new_parent).is_some_and(HtmlNode::is_element);
        if !is_element
            || !self.is_detached(new_parent)
            || !self.is_rewritable(first)
            || !self.is_rewritable(last)
        {
            return false;
        }
        let parent = self.nodes.parent(first);
        if parent != self.nodes.parent(last) {
            return false;
        }
        let (Some(begin), Some(end)) = (
            self.nodes.get(first).and_then(|n| n.begin),
            self.nodes.get(last).and_then(|n| n.end),
        ) else {
            return false;
        };
        let mut range = Vec::new();
        let mut cursor = Some(begin);
        while let Some(id) = cursor {
            range.push(id);
            if id == end {
                break;
            }
            cursor = self.events.next(id);
        }
        if range.last() != Some(&end) {
            return false;
        }

        for &id in &range {
            if let Some(child) = self.events.get(id).and_then(HtmlEvent::node)
                && self.nodes.parent(child) == parent
            {
                self.set_node_parent(child, Some(new_parent));
            }
        }
        let line = self.events.line(begin);
        let start = self.events.insert_before(
            ListId::Queue,
            Some(begin),
            HtmlEvent::StartElement(new_parent),
            line,
        );
        let after = self.events.next(end);
        let close = self.events.insert_before(
            ListId::Queue,
            after,
            HtmlEvent::EndElement(new_parent),
            self.events.line(end),
        );
        if let Some(node) = self.nodes.get_mut(new_parent) {
            node.begin = Some(start);
            node.end = Some(close);
            node.in_document = true;
            node.parent = parent;
        }
        self.notify_listeners(HtmlEvent::StartElement(new_parent));
        self.notify_listeners(HtmlEvent::EndElement(new_parent));
        self.mark_mutated();
        true
    }

    /// Move the element whose end is under the cursor to be the last child
    /// of `new_parent`.
    pub fn move_current_into(&mut self, new_parent: NodeId) -> bool {
        if !self.can_append_child(new_parent) {
            return false;
        }
        let Some(end) = self.nodes.get(new_parent).and_then(|n| n.end) else {
            return false;
        };
        self.move_current_before_event(end, Some(new_parent))
    }

    /// Move the element whose end is under the cursor to be the previous
    /// sibling of `existing`.
    pub fn move_current_before(&mut self, existing: NodeId) -> bool {
        let Some(begin) = self
            .nodes
            .get(existing)
            .filter(|n| n.live)
            .and_then(|n| n.begin)
            .filter(|&begin| self.events.is_in(begin, ListId::Queue))
        else {
            return false;
        };
        self.move_current_before_event(begin, self.nodes.parent(existing))
    }

    fn move_current_before_event(&mut self, before: EventId, new_parent: Option<NodeId>) -> bool {
        let Some(current) = self.current else {
            return false;
        };
        let Some(node) = self.events.get(current).and_then(HtmlEvent::node) else {
            return false;
        };
        if !self.is_rewritable(node) {
            return false;
        }
        let Some((Some(begin), Some(end))) = self.nodes.get(node).map(|n| (n.begin, n.end)) else {
            return false;
        };
        if end != current || !self.events.is_in(before, ListId::Queue) {
            return false;
        }
        if let Some(target) = self.events.get(before).and_then(HtmlEvent::node)
            && (target == node || self.nodes.is_descendant_of(target, node))
        {
            return false;
        }
        let after = self.events.next(end);
        if !self.events.splice(begin, end, ListId::Queue, Some(before)) {
            return false;
        }
        self.set_node_parent(node, new_parent);
        self.current = after;
        self.skip_increment = true;
        self.insert_after_cursor = None;
        self.mark_mutated();
        true
    }

    // ===== Deferral =====

    /// Park the node whose start is under the cursor, with everything lexed
    /// inside it so far, until [`HtmlParse::restore_deferred_node`].
    ///
    /// If the node's end has not been lexed yet, its later descendants and
    /// its end are routed to the same list as they arrive.
    pub fn defer_current_node(&mut self) -> bool {
        let Some(current) = self.current.filter(|&id| self.events.is_in(id, ListId::Queue)) else {
            return false;
        };
        let Some(node) = self.events.get(current).and_then(HtmlEvent::node) else {
            return false;
        };
        let Some((begin, end)) = self.nodes.get(node).map(|n| (n.begin, n.end)) else {
            return false;
        };
        if begin != Some(current) || self.is_deferred(node) {
            return false;
        }
        let (last, open) = match end.filter(|&end| self.events.is_in(end, ListId::Queue)) {
            Some(end) => (end, false),
            None => {
                let mut last = current;
                while let Some(next) = self.events.next(last)
                    && self
                        .events
                        .get(next)
                        .and_then(HtmlEvent::node)
                        .is_some_and(|owner| self.nodes.is_descendant_of(owner, node))
                {
                    last = next;
                }
                (last, true)
            }
        };
        let after = self.events.next(last);
        if !self.events.splice(current, last, ListId::Deferred(node), None) {
            return false;
        }
        let _ = self.deferred.insert(
            node,
            Deferral {
                filter: self.active_filter,
                open,
            },
        );
        self.current = after;
        self.skip_increment = true;
        self.insert_after_cursor = None;
        self.mark_mutated();
        true
    }

    /// Put a deferred node back, before the cursor or at the end of the
    /// document outside a filter run.
    pub fn restore_deferred_node(&mut self, node: NodeId) -> bool {
        let Some(deferral) = self.deferred.remove(&node) else {
            return false;
        };
        let list = ListId::Deferred(node);
        let (Some(first), Some(last)) = (self.events.head(list), self.events.tail(list)) else {
            return false;
        };
        let current = self.current.filter(|&id| self.events.is_in(id, ListId::Queue));
        let before = match current {
            Some(current) => {
                self.set_node_parent(node, self.parent_before_event(current));
                Some(current)
            }
            None => self.document_tail(),
        };
        if !self.events.splice(first, last, ListId::Queue, before) {
            let _ = self.deferred.insert(node, deferral);
            return false;
        }
        if deferral.open {
            // The rest of the node is still to be lexed and will land in
            // the queue directly.
            tracing::debug!(url = self.id(), node = node.0, "restored a node whose end is not lexed yet");
        }
        self.mark_mutated();
        true
    }
}
