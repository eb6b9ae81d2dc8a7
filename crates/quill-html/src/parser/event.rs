//! Parser events and the slab that links them into lists.
//!
//! Every event lives in one [`EventList`] slot and belongs to exactly one
//! chain: the main queue, a filter's deferred list, or the delayed-literal
//! list. Moving events between chains relinks slots without copying, so the
//! [`EventId`]s stored on nodes stay valid until the event is released.

use std::collections::HashMap;

use quill_dom::{EventId, NodeId};
use strum_macros::Display;

/// A single parser event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum HtmlEvent {
    /// Beginning of the document.
    StartDocument,
    /// End of the document.
    EndDocument,
    /// The open tag of an element.
    StartElement(NodeId),
    /// The close of an element, whatever its close style.
    EndElement(NodeId),
    /// Characters, a comment, CDATA, a directive or an IE directive.
    Leaf(NodeId),
}

impl HtmlEvent {
    /// The node this event refers to, if any.
    #[must_use]
    pub const fn node(self) -> Option<NodeId> {
        match self {
            Self::StartDocument | Self::EndDocument => None,
            Self::StartElement(node) | Self::EndElement(node) | Self::Leaf(node) => Some(node),
        }
    }
}

/// Which chain an event is linked into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListId {
    /// The current flush window.
    Queue,
    /// Events parked by a filter for the given node.
    Deferred(NodeId),
    /// The open tag of a literal element whose body has not been seen yet.
    DelayedLiteral,
}

#[derive(Debug)]
struct Slot {
    event: HtmlEvent,
    line: u32,
    prev: Option<EventId>,
    next: Option<EventId>,
    list: Option<ListId>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Chain {
    head: Option<EventId>,
    tail: Option<EventId>,
    len: usize,
}

/// Slab of events threaded into doubly-linked chains.
#[derive(Debug, Default)]
pub struct EventList {
    slots: Vec<Slot>,
    free: Vec<usize>,
    chains: HashMap<ListId, Chain>,
}

impl EventList {
    /// An empty slab.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `event` to the end of `list`.
    pub fn push_back(&mut self, list: ListId, event: HtmlEvent, line: u32) -> EventId {
        self.insert_before(list, None, event, line)
    }

    /// Insert `event` into `list` before `before`, or at the tail for `None`.
    ///
    /// `before` must belong to `list`.
    pub fn insert_before(
        &mut self,
        list: ListId,
        before: Option<EventId>,
        event: HtmlEvent,
        line: u32,
    ) -> EventId {
        let slot = Slot {
            event,
            line,
            prev: None,
            next: None,
            list: None,
        };
        let id = if let Some(index) = self.free.pop() {
            self.slots[index] = slot;
            EventId(index)
        } else {
            self.slots.push(slot);
            EventId(self.slots.len() - 1)
        };
        self.link_before(list, before, id);
        id
    }

    /// Unlink and release `id`, returning the event that followed it.
    pub fn remove(&mut self, id: EventId) -> Option<EventId> {
        let next = self.next(id);
        if self.unlink(id) {
            self.free.push(id.0);
        }
        next
    }

    /// Move the run `first..=last` out of its chain into `dest` before
    /// `before` (at the tail for `None`), keeping the run's order.
    ///
    /// Returns false, moving nothing, when `last` does not follow `first`
    /// in the same chain.
    pub fn splice(
        &mut self,
        first: EventId,
        last: EventId,
        dest: ListId,
        before: Option<EventId>,
    ) -> bool {
        let Some(source) = self.list_of(first) else {
            return false;
        };
        let mut run = Vec::new();
        let mut cursor = Some(first);
        while let Some(id) = cursor {
            run.push(id);
            if id == last {
                break;
            }
            cursor = self.next(id);
        }
        if run.last() != Some(&last) || self.list_of(last) != Some(source) {
            return false;
        }
        if before.is_some_and(|b| run.contains(&b)) {
            return false;
        }
        for &id in &run {
            let _ = self.unlink(id);
        }
        for id in run {
            self.link_before(dest, before, id);
        }
        true
    }

    /// Move every event of `source` to the front of `dest`.
    pub fn splice_all_to_front(&mut self, source: ListId, dest: ListId) {
        let (Some(first), Some(last)) = (self.head(source), self.tail(source)) else {
            return;
        };
        let before = self.head(dest);
        let _ = self.splice(first, last, dest, before);
    }

    /// Release every event of `list`, returning them in order.
    pub fn take_list(&mut self, list: ListId) -> Vec<HtmlEvent> {
        let mut events = Vec::with_capacity(self.len(list));
        let mut cursor = self.head(list);
        while let Some(id) = cursor {
            cursor = self.next(id);
            if let Some(slot) = self.slots.get(id.0) {
                events.push(slot.event);
            }
            let _ = self.remove(id);
        }
        let _ = self.chains.remove(&list);
        events
    }

    /// The event stored at `id`, if it has not been released.
    #[must_use]
    pub fn get(&self, id: EventId) -> Option<HtmlEvent> {
        self.slot(id).map(|slot| slot.event)
    }

    /// Source line recorded with `id`.
    #[must_use]
    pub fn line(&self, id: EventId) -> u32 {
        self.slot(id).map_or(0, |slot| slot.line)
    }

    /// The chain `id` is linked into.
    #[must_use]
    pub fn list_of(&self, id: EventId) -> Option<ListId> {
        self.slot(id).and_then(|slot| slot.list)
    }

    /// Whether `id` is a live event of `list`.
    #[must_use]
    pub fn is_in(&self, id: EventId, list: ListId) -> bool {
        self.list_of(id) == Some(list)
    }

    /// First event of `list`.
    #[must_use]
    pub fn head(&self, list: ListId) -> Option<EventId> {
        self.chains.get(&list).and_then(|chain| chain.head)
    }

    /// Last event of `list`.
    #[must_use]
    pub fn tail(&self, list: ListId) -> Option<EventId> {
        self.chains.get(&list).and_then(|chain| chain.tail)
    }

    /// Event after `id` in its chain.
    #[must_use]
    pub fn next(&self, id: EventId) -> Option<EventId> {
        self.slot(id).and_then(|slot| slot.next)
    }

    /// Event before `id` in its chain.
    #[must_use]
    pub fn prev(&self, id: EventId) -> Option<EventId> {
        self.slot(id).and_then(|slot| slot.prev)
    }

    /// Number of events in `list`.
    #[must_use]
    pub fn len(&self, list: ListId) -> usize {
        self.chains.get(&list).map_or(0, |chain| chain.len)
    }

    /// Whether `list` holds no events.
    #[must_use]
    pub fn is_empty(&self, list: ListId) -> bool {
        self.len(list) == 0
    }

    /// Ids of `list` in order.
    #[must_use]
    pub fn ids(&self, list: ListId) -> Vec<EventId> {
        let mut ids = Vec::with_capacity(self.len(list));
        let mut cursor = self.head(list);
        while let Some(id) = cursor {
            ids.push(id);
            cursor = self.next(id);
        }
        ids
    }

    /// Release everything.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.chains.clear();
    }

    fn slot(&self, id: EventId) -> Option<&Slot> {
        self.slots.get(id.0).filter(|slot| slot.list.is_some())
    }

    fn link_before(&mut self, list: ListId, before: Option<EventId>, id: EventId) {
        let before = before.filter(|&b| self.is_in(b, list));
        let prev = match before {
            Some(b) => self.prev(b),
            None => self.tail(list),
        };
        if let Some(slot) = self.slots.get_mut(id.0) {
            slot.prev = prev;
            slot.next = before;
            slot.list = Some(list);
        }
        if let Some(p) = prev {
            self.slots[p.0].next = Some(id);
        }
        if let Some(b) = before {
            self.slots[b.0].prev = Some(id);
        }
        let chain = self.chains.entry(list).or_default();
        if prev.is_none() {
            chain.head = Some(id);
        }
        if before.is_none() {
            chain.tail = Some(id);
        }
        chain.len += 1;
    }

    fn unlink(&mut self, id: EventId) -> bool {
        let Some(slot) = self.slots.get_mut(id.0) else {
            return false;
        };
        let Some(list) = slot.list.take() else {
            return false;
        };
        let (prev, next) = (slot.prev.take(), slot.next.take());
        match prev {
            Some(p) => self.slots[p.0].next = next,
            None => {
                if let Some(chain) = self.chains.get_mut(&list) {
                    chain.head = next;
                }
            }
        }
        match next {
            Some(n) => self.slots[n.0].prev = prev,
            None => {
                if let Some(chain) = self.chains.get_mut(&list) {
                    chain.tail = prev;
                }
            }
        }
        if let Some(chain) = self.chains.get_mut(&list) {
            chain.len -= 1;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(n: usize) -> HtmlEvent {
        HtmlEvent::Leaf(NodeId(n))
    }

    fn contents(list: &EventList, id: ListId) -> Vec<HtmlEvent> {
        list.ids(id).into_iter().filter_map(|e| list.get(e)).collect()
    }

    #[test]
    fn test_insert_and_remove() {
        let mut list = EventList::new();
        let a = list.push_back(ListId::Queue, leaf(1), 1);
        let c = list.push_back(ListId::Queue, leaf(3), 1);
        let b = list.insert_before(ListId::Queue, Some(c), leaf(2), 2);
        assert_eq!(contents(&list, ListId::Queue), vec![leaf(1), leaf(2), leaf(3)]);
        assert_eq!(list.line(b), 2);

        assert_eq!(list.remove(b), Some(c));
        assert_eq!(list.get(b), None);
        assert_eq!(list.next(a), Some(c));
        assert_eq!(list.len(ListId::Queue), 2);
    }

    #[test]
    fn test_slots_are_reused() {
        let mut list = EventList::new();
        let a = list.push_back(ListId::Queue, leaf(1), 1);
        let _ = list.remove(a);
        let b = list.push_back(ListId::Queue, leaf(2), 1);
        assert_eq!(a, b);
        assert_eq!(list.get(b), Some(leaf(2)));
    }

    #[test]
    fn test_splice_between_lists() {
        let mut list = EventList::new();
        let ids: Vec<_> = (0..4)
            .map(|n| list.push_back(ListId::Queue, leaf(n), 1))
            .collect();
        let parked = ListId::Deferred(NodeId(9));
        assert!(list.splice(ids[1], ids[2], parked, None));
        assert_eq!(contents(&list, ListId::Queue), vec![leaf(0), leaf(3)]);
        assert_eq!(contents(&list, parked), vec![leaf(1), leaf(2)]);
        assert_eq!(list.list_of(ids[1]), Some(parked));

        assert!(list.splice(ids[1], ids[2], ListId::Queue, Some(ids[0])));
        assert_eq!(
            contents(&list, ListId::Queue),
            vec![leaf(1), leaf(2), leaf(0), leaf(3)]
        );
        assert!(list.is_empty(parked));
    }

    #[test]
    fn test_splice_rejects_backwards_range() {
        let mut list = EventList::new();
        let a = list.push_back(ListId::Queue, leaf(1), 1);
        let b = list.push_back(ListId::Queue, leaf(2), 1);
        assert!(!list.splice(b, a, ListId::DelayedLiteral, None));
        assert_eq!(list.len(ListId::Queue), 2);
    }

    #[test]
    fn test_take_list_releases_events() {
        let mut list = EventList::new();
        let _ = list.push_back(ListId::Queue, HtmlEvent::StartDocument, 1);
        let _ = list.push_back(ListId::Queue, leaf(0), 1);
        let _ = list.push_back(ListId::DelayedLiteral, leaf(5), 1);
        assert_eq!(
            list.take_list(ListId::Queue),
            vec![HtmlEvent::StartDocument, leaf(0)]
        );
        assert!(list.is_empty(ListId::Queue));
        assert_eq!(list.len(ListId::DelayedLiteral), 1);
    }
}
