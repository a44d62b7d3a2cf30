//! LRU List Module
//!
//! Arena-backed doubly-linked list that keeps cache entries in recency order.

/// Sentinel for a missing link.
const NIL: usize = usize::MAX;

// == Node Handle ==
/// Opaque reference to a node in a [`RecencyList`].
///
/// Handles stay valid until the node is removed; the slot may then be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(usize);

impl NodeHandle {
    /// Arena slot index, for diagnostics.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct Node<T> {
    /// `None` while the slot sits on the free list
    item: Option<T>,
    prev: usize,
    next: usize,
}

// == Recency List ==
/// Orders items by recency of use.
///
/// Layout:
/// - Head = Most recently used
/// - Tail = Least recently used (next eviction candidate)
///
/// Every operation is O(1). Removed slots are recycled through a free list.
#[derive(Debug)]
pub struct RecencyList<T> {
    nodes: Vec<Node<T>>,
    head: usize,
    tail: usize,
    free: usize,
    len: usize,
}

impl<T> Default for RecencyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RecencyList<T> {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            head: NIL,
            tail: NIL,
            free: NIL,
            len: 0,
        }
    }

    // == Append ==
    /// Places an item at the most-recently-used end and returns its handle.
    pub fn append(&mut self, item: T) -> NodeHandle {
        let idx = if self.free != NIL {
            let idx = self.free;
            self.free = self.nodes[idx].next;
            self.nodes[idx] = Node {
                item: Some(item),
                prev: NIL,
                next: NIL,
            };
            idx
        } else {
            self.nodes.push(Node {
                item: Some(item),
                prev: NIL,
                next: NIL,
            });
            self.nodes.len() - 1
        };

        self.link_head(idx);
        self.len += 1;
        NodeHandle(idx)
    }

    // == Remove ==
    /// Unlinks the node behind `handle` and returns its item.
    ///
    /// Returns None if the handle refers to a vacant slot.
    pub fn remove(&mut self, handle: NodeHandle) -> Option<T> {
        let idx = handle.0;
        let item = self.nodes.get_mut(idx)?.item.take()?;

        self.unlink(idx);
        self.nodes[idx].next = self.free;
        self.free = idx;
        self.len -= 1;
        Some(item)
    }

    // == Pop Tail ==
    /// Removes and returns the least recently used item.
    pub fn pop_tail(&mut self) -> Option<T> {
        if self.tail == NIL {
            return None;
        }
        self.remove(NodeHandle(self.tail))
    }

    // == Peek Tail ==
    /// Returns the handle of the least recently used item without removing it.
    pub fn peek_tail(&self) -> Option<NodeHandle> {
        (self.tail != NIL).then_some(NodeHandle(self.tail))
    }

    // == Promote ==
    /// Moves a live node to the most-recently-used end.
    ///
    /// Returns false if the handle refers to a vacant slot.
    pub fn promote(&mut self, handle: NodeHandle) -> bool {
        let idx = handle.0;
        match self.nodes.get(idx) {
            Some(node) if node.item.is_some() => {}
            _ => return false,
        }
        if self.head != idx {
            self.unlink(idx);
            self.link_head(idx);
        }
        true
    }

    // == Get ==
    /// Borrows the item behind `handle`.
    pub fn get(&self, handle: NodeHandle) -> Option<&T> {
        self.nodes.get(handle.0)?.item.as_ref()
    }

    // == Length ==
    /// Returns the number of live items.
    pub fn len(&self) -> usize {
        self.len
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates from most to least recently used.
    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            if cursor == NIL {
                return None;
            }
            let node = &self.nodes[cursor];
            cursor = node.next;
            node.item.as_ref()
        })
    }

    fn unlink(&mut self, idx: usize) {
        let prev = self.nodes[idx].prev;
        let next = self.nodes[idx].next;

        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }

        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }

        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = NIL;
    }

    fn link_head(&mut self, idx: usize) {
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = self.head;

        if self.head != NIL {
            self.nodes[self.head].prev = idx;
        }
        self.head = idx;

        if self.tail == NIL {
            self.tail = idx;
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn tail_item(list: &RecencyList<&'static str>) -> Option<&'static str> {
        list.peek_tail().and_then(|h| list.get(h)).copied()
    }

    #[test]
    fn test_list_new() {
        let list: RecencyList<u32> = RecencyList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert_eq!(list.peek_tail(), None);
    }

    #[test]
    fn test_append_orders_by_recency() {
        let mut list = RecencyList::new();

        list.append("key1");
        list.append("key2");
        list.append("key3");

        assert_eq!(list.len(), 3);
        // key1 is oldest (added first)
        assert_eq!(tail_item(&list), Some("key1"));
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), ["key3", "key2", "key1"]);
    }

    #[test]
    fn test_promote_moves_to_head() {
        let mut list = RecencyList::new();

        let a = list.append("a");
        list.append("b");
        list.append("c");

        assert!(list.promote(a));

        assert_eq!(tail_item(&list), Some("b"));
        assert_eq!(list.pop_tail(), Some("b"));
        assert_eq!(list.pop_tail(), Some("c"));
        assert_eq!(list.pop_tail(), Some("a"));
        assert_eq!(list.pop_tail(), None);
    }

    #[test]
    fn test_promote_head_is_noop() {
        let mut list = RecencyList::new();
        list.append("a");
        let b = list.append("b");

        assert!(list.promote(b));
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), ["b", "a"]);
    }

    #[test]
    fn test_remove_middle() {
        let mut list = RecencyList::new();

        list.append("key1");
        let key2 = list.append("key2");
        list.append("key3");

        assert_eq!(list.remove(key2), Some("key2"));

        assert_eq!(list.len(), 2);
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), ["key3", "key1"]);
    }

    #[test]
    fn test_remove_vacant_handle() {
        let mut list = RecencyList::new();
        let a = list.append("a");

        assert_eq!(list.remove(a), Some("a"));
        assert_eq!(list.remove(a), None);
        assert!(!list.promote(a));
        assert_eq!(list.get(a), None);
        assert_eq!(list.remove(NodeHandle(42)), None);
    }

    #[test]
    fn test_slots_are_recycled() {
        let mut list = RecencyList::new();
        let a = list.append("a");
        list.append("b");
        list.remove(a);

        let c = list.append("c");
        assert_eq!(c.index(), a.index());
        assert_eq!(list.get(c), Some(&"c"));
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), ["c", "b"]);
    }

    #[test]
    fn test_pop_tail_empty() {
        let mut list: RecencyList<u32> = RecencyList::new();
        assert_eq!(list.pop_tail(), None);
    }

    #[test]
    fn test_order_after_multiple_promotions() {
        let mut list = RecencyList::new();

        let a = list.append("a");
        let b = list.append("b");
        let c = list.append("c");

        list.promote(a);
        list.promote(c);
        list.promote(b);

        // front=[b, c, a]=back
        assert_eq!(list.pop_tail(), Some("a"));
        assert_eq!(list.pop_tail(), Some("c"));
        assert_eq!(list.pop_tail(), Some("b"));
        assert!(list.is_empty());
    }
}
