//! Fixed-capacity FIFO buffer.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

/// A FIFO that holds at most `capacity` items, evicting the oldest on push.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: NonZeroUsize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.get()),
            capacity,
        }
    }

    /// Append `item`, returning the evicted oldest item if the buffer was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity.get()
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_push_until_full() {
        let mut ring = RingBuffer::new(cap(3));
        assert!(ring.is_empty());
        assert_eq!(ring.push(1), None);
        assert_eq!(ring.push(2), None);
        assert!(!ring.is_full());
        assert_eq!(ring.push(3), None);
        assert!(ring.is_full());
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut ring = RingBuffer::new(cap(2));
        ring.push("a");
        ring.push("b");
        assert_eq!(ring.push("c"), Some("a"));
        assert_eq!(ring.push("d"), Some("b"));
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec!["c", "d"]);
        assert_eq!(ring.len(), ring.capacity());
    }

    #[test]
    fn test_capacity_one() {
        let mut ring = RingBuffer::new(cap(1));
        assert_eq!(ring.push(true), None);
        assert_eq!(ring.push(false), Some(true));
        assert_eq!(ring.len(), 1);
    }
}
