//! Intrusive doubly linked list used for the recency-stack buckets.
//!
//! Nodes are heap allocated once and then moved between lists by relinking,
//! so a `NonNull<Entry<T>>` handed out by [`List::push_front`] stays valid for
//! as long as the node is linked into *some* list or held detached by the
//! caller. The ghost cache stores these handles in its key index.

extern crate alloc;

use alloc::boxed::Box;
use core::fmt;
#[cfg(test)]
use core::marker::PhantomData;
use core::mem;
use core::num::NonZeroUsize;
use core::ptr::{self, NonNull};

/// A node in the doubly linked list.
///
/// Contains a value and pointers to the previous and next entries.
pub(crate) struct Entry<T> {
    /// The value stored in this entry. Uses MaybeUninit to allow for sigil nodes.
    val: mem::MaybeUninit<T>,
    prev: *mut Entry<T>,
    next: *mut Entry<T>,
}

impl<T> Entry<T> {
    fn new(val: T) -> Self {
        Entry {
            val: mem::MaybeUninit::new(val),
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }
    }

    /// Sigil (sentinel) entries mark the head and tail and never hold a value.
    fn new_sigil() -> Self {
        Entry {
            val: mem::MaybeUninit::uninit(),
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }
    }

    /// # Safety
    ///
    /// Must not be called on a sigil node.
    pub(crate) unsafe fn get_value(&self) -> &T {
        // SAFETY: non-sigil nodes are always constructed through `Entry::new`
        unsafe { self.val.assume_init_ref() }
    }

    /// # Safety
    ///
    /// Must not be called on a sigil node.
    pub(crate) unsafe fn get_value_mut(&mut self) -> &mut T {
        // SAFETY: non-sigil nodes are always constructed through `Entry::new`
        unsafe { self.val.assume_init_mut() }
    }
}

/// A doubly linked list with a nominal capacity.
///
/// The capacity is not enforced on insertion: a bucket may briefly hold one
/// entry more than its capacity while an access cascades through the stack.
/// Callers use [`List::is_over_capacity`] to decide when to spill the tail.
pub(crate) struct List<T> {
    cap: NonZeroUsize,
    len: usize,
    head: *mut Entry<T>,
    tail: *mut Entry<T>,
}

impl<T> List<T> {
    /// Creates an empty list with the given nominal capacity.
    pub(crate) fn new(cap: NonZeroUsize) -> List<T> {
        let head = Box::into_raw(Box::new(Entry::new_sigil()));
        let tail = Box::into_raw(Box::new(Entry::new_sigil()));

        // SAFETY: head and tail are freshly allocated and exclusively owned
        unsafe {
            (*head).next = tail;
            (*tail).prev = head;
        }

        List {
            cap,
            len: 0,
            head,
            tail,
        }
    }

    #[cfg(test)]
    #[inline]
    pub(crate) fn cap(&self) -> NonZeroUsize {
        self.cap
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if the list holds more entries than its capacity.
    #[inline]
    pub(crate) fn is_over_capacity(&self) -> bool {
        self.len > self.cap.get()
    }

    /// Allocates a node for `v` and links it at the front.
    pub(crate) fn push_front(&mut self, v: T) -> NonNull<Entry<T>> {
        let node = NonNull::from(Box::leak(Box::new(Entry::new(v))));
        // SAFETY: node is freshly allocated and not linked anywhere
        unsafe { self.link_front(node) };
        node
    }

    /// Links a detached node at the front of this list.
    ///
    /// # Safety
    ///
    /// `node` must be a live, non-sigil node that is not currently linked into
    /// any list (freshly unlinked or popped).
    pub(crate) unsafe fn link_front(&mut self, node: NonNull<Entry<T>>) {
        let node = node.as_ptr();
        // SAFETY: head is valid for the lifetime of the list and the caller
        // guarantees that node is detached
        unsafe {
            (*node).next = (*self.head).next;
            (*node).prev = self.head;
            (*(*self.head).next).prev = node;
            (*self.head).next = node;
        }
        self.len += 1;
    }

    /// Detaches `node` from this list without freeing it.
    ///
    /// The caller takes over ownership of the node until it is linked again
    /// or released with [`List::free`].
    ///
    /// # Safety
    ///
    /// `node` must be a non-sigil node currently linked into this list.
    pub(crate) unsafe fn unlink(&mut self, node: NonNull<Entry<T>>) {
        let node = node.as_ptr();
        // SAFETY: a linked node always has valid neighbours (at worst the sigils)
        unsafe {
            (*(*node).prev).next = (*node).next;
            (*(*node).next).prev = (*node).prev;
            (*node).prev = ptr::null_mut();
            (*node).next = ptr::null_mut();
        }
        self.len -= 1;
    }

    /// Detaches and returns the last (least recently used) node.
    pub(crate) fn pop_back(&mut self) -> Option<NonNull<Entry<T>>> {
        if self.is_empty() {
            return None;
        }
        // SAFETY: the list is not empty, so tail.prev is a real node
        let last = unsafe { NonNull::new_unchecked((*self.tail).prev) };
        // SAFETY: last is linked into this list
        unsafe { self.unlink(last) };
        Some(last)
    }

    /// Reclaims a detached node and returns its value.
    ///
    /// # Safety
    ///
    /// `node` must be a detached, non-sigil node that no other handle refers to.
    pub(crate) unsafe fn free(node: NonNull<Entry<T>>) -> T {
        // SAFETY: the caller transfers unique ownership of a node allocated by push_front
        let entry = unsafe { *Box::from_raw(node.as_ptr()) };
        // SAFETY: non-sigil nodes always carry an initialized value
        unsafe { entry.val.assume_init() }
    }

    /// Iterates from the front (most recent) to the back.
    #[cfg(test)]
    pub(crate) fn iter(&self) -> Iter<'_, T> {
        Iter {
            // SAFETY: head is valid for the lifetime of the list
            next: unsafe { (*self.head).next },
            tail: self.tail,
            _marker: PhantomData,
        }
    }

    /// Frees every linked node.
    pub(crate) fn clear(&mut self) {
        while let Some(node) = self.pop_back() {
            // SAFETY: the node was just detached and nothing else refers to it
            drop(unsafe { Self::free(node) });
        }
    }
}

impl<T> Drop for List<T> {
    fn drop(&mut self) {
        self.clear();

        // SAFETY: the sigils were allocated in `new` and are freed exactly once here
        unsafe {
            drop(Box::from_raw(self.head));
            drop(Box::from_raw(self.tail));
        }
    }
}

impl<T> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
            .field("capacity", &self.cap)
            .field("length", &self.len)
            .finish()
    }
}

/// Front-to-back iterator over a [`List`].
#[cfg(test)]
pub(crate) struct Iter<'a, T> {
    next: *mut Entry<T>,
    tail: *mut Entry<T>,
    _marker: PhantomData<&'a T>,
}

#[cfg(test)]
impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.next == self.tail {
            return None;
        }
        // SAFETY: every node between the sigils is live and initialized while
        // the list is borrowed
        unsafe {
            let node = &*self.next;
            self.next = node.next;
            Some(node.get_value())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec::Vec;

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn contents(list: &List<u32>) -> Vec<u32> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_new_list_is_empty() {
        let list = List::<u32>::new(cap(3));
        assert_eq!(list.cap().get(), 3);
        assert_eq!(list.len(), 0);
        assert!(list.is_empty());
        assert!(list.iter().next().is_none());
    }

    #[test]
    fn test_push_front_orders_most_recent_first() {
        let mut list = List::new(cap(3));
        list.push_front(10);
        list.push_front(20);
        list.push_front(30);
        assert_eq!(contents(&list), [30, 20, 10]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_capacity_is_nominal() {
        let mut list = List::new(cap(2));
        list.push_front(1);
        list.push_front(2);
        assert!(!list.is_over_capacity());
        list.push_front(3);
        assert!(list.is_over_capacity());
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_pop_back_returns_oldest() {
        let mut list = List::new(cap(3));
        assert!(list.pop_back().is_none());

        list.push_front(10);
        list.push_front(20);
        let last = list.pop_back().unwrap();
        assert_eq!(unsafe { List::free(last) }, 10);
        assert_eq!(contents(&list), [20]);
    }

    #[test]
    fn test_unlink_and_relink_keeps_handle_valid() {
        let mut list = List::new(cap(3));
        let a = list.push_front(1);
        list.push_front(2);
        list.push_front(3);

        unsafe {
            list.unlink(a);
            assert_eq!(list.len(), 2);
            list.link_front(a);
            assert_eq!(*(*a.as_ptr()).get_value(), 1);
        }
        assert_eq!(contents(&list), [1, 3, 2]);
    }

    #[test]
    fn test_cross_list_node_transfer() {
        let mut first = List::new(cap(2));
        let mut second = List::new(cap(2));
        let node = first.push_front(7);
        first.push_front(8);

        unsafe {
            first.unlink(node);
            second.link_front(node);
            *(*node.as_ptr()).get_value_mut() = 70;
        }

        assert_eq!(contents(&first), [8]);
        assert_eq!(contents(&second), [70]);
    }

    #[test]
    fn test_clear_and_reuse() {
        let mut list = List::new(cap(2));
        list.push_front(String::from("a"));
        list.push_front(String::from("b"));
        list.clear();
        assert!(list.is_empty());

        list.push_front(String::from("c"));
        assert_eq!(list.iter().collect::<Vec<_>>(), ["c"]);
    }
}
