use serde::Serialize;
use std::collections::VecDeque;

/// Fixed-capacity FIFO ring. Pushing into a full ring evicts the oldest
/// element in O(1).
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct BoundedRing<T> {
    #[serde(skip)]
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> BoundedRing<T> {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    /// Append `item`, returning the evicted element when the ring was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Newest first.
    pub fn iter_recent(&self) -> impl Iterator<Item = &T> {
        self.items.iter().rev()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Drop elements from the front while `expired` holds. Elements are
    /// pushed in time order, so the first survivor ends the scan.
    pub fn prune_front<F>(&mut self, mut expired: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let mut removed = 0;
        while self.items.front().is_some_and(&mut expired) {
            self.items.pop_front();
            removed += 1;
        }
        removed
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
