//! Fixed-capacity sample history
//!
//!  Circular buffer backed by a single allocation. Pushing past capacity
//!  overwrites the oldest entry, so memory per track stays constant for the
//!  whole session.

use serde::{Serialize, Serializer};

#[derive(Debug, Clone)]
pub struct History<T> {
    /// Backing storage, never grows beyond `capacity`
    slots: Vec<T>,
    /// Index of the oldest entry once the buffer is full
    head: usize,
    capacity: usize,
}

impl<T> History<T> {
    /// Create an empty history. A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    /// Append a sample, evicting the oldest one when full
    pub fn push(&mut self, item: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(item);
        } else {
            self.slots[self.head] = item;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    /// Most recently pushed sample
    pub fn latest(&self) -> Option<&T> {
        if self.slots.is_empty() {
            return None;
        }
        let idx = (self.head + self.slots.len() - 1) % self.slots.len();
        self.slots.get(idx)
    }

    /// Samples from oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: PartialEq> PartialEq for History<T> {
    fn eq(&self, other: &Self) -> bool {
        self.capacity == other.capacity && self.iter().eq(other.iter())
    }
}

impl<T: Serialize> Serialize for History<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_within_capacity() {
        let mut h = History::with_capacity(3);
        assert!(h.is_empty());
        assert_eq!(h.latest(), None);
        h.push(1);
        h.push(2);
        assert_eq!(h.len(), 2);
        assert_eq!(h.latest(), Some(&2));
        assert_eq!(h.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut h = History::with_capacity(3);
        for i in 1..=5 {
            h.push(i);
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.capacity(), 3);
        assert_eq!(h.latest(), Some(&5));
        assert_eq!(h.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(h.iter().rev().copied().collect::<Vec<_>>(), vec![5, 4, 3]);
    }

    #[test]
    fn test_zero_capacity_keeps_latest() {
        let mut h = History::with_capacity(0);
        h.push("a");
        h.push("b");
        assert_eq!(h.len(), 1);
        assert_eq!(h.latest(), Some(&"b"));
    }

    #[test]
    fn test_eq_ignores_rotation() {
        let mut a = History::with_capacity(2);
        let mut b = History::with_capacity(2);
        a.push(1);
        a.push(2);
        a.push(3);
        b.push(2);
        b.push(3);
        assert_eq!(a, b);
    }
}
