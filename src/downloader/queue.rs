/*
 * rangecast - Concurrent multi-mirror HTTP range downloader.
 * Copyright (C) 2025  rangecast contributors
 */

//! The pending block queue: an ordered multiset of block indices still to
//! be fetched, with arbitrary-position pop and front-push. This is the
//! central concurrency primitive fetch loops contend on; contention is
//! bounded by the mirror count, so a plain mutex-guarded deque is enough
//! (no lock-free structure is required).

use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug)]
pub struct PendingQueue {
    inner: Mutex<VecDeque<usize>>,
}

impl PendingQueue {
    /// Build a queue preloaded with block ids `0..num_blocks`.
    pub fn new(num_blocks: usize) -> Self {
        Self {
            inner: Mutex::new((0..num_blocks).collect()),
        }
    }

    /// Remove and return the element at `pos` (0 = head). Returns `None` if
    /// `pos` is out of bounds (including an empty queue).
    pub fn pop_at(&self, pos: usize) -> Option<usize> {
        let mut q = self.inner.lock().unwrap();
        if pos >= q.len() {
            return None;
        }
        q.remove(pos)
    }

    /// Remove and return the element at `desired` (0 = head), clamping to
    /// the tail under the same lock that reads the length. Returns `None`
    /// only if the queue is empty. This is the primitive callers that pick
    /// a position from a separately-observed length must use instead of
    /// `len()` + `pop_at()`, which would race against a concurrent pop
    /// shrinking the queue between the two lock acquisitions.
    pub fn pop_biased(&self, desired: usize) -> Option<usize> {
        let mut q = self.inner.lock().unwrap();
        if q.is_empty() {
            return None;
        }
        let pos = desired.min(q.len() - 1);
        q.remove(pos)
    }

    /// Prepend `id` to the head of the queue.
    pub fn push_front(&self, id: usize) {
        self.inner.lock().unwrap().push_front(id);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_at_head_is_fifo_by_default() {
        let q = PendingQueue::new(3);
        assert_eq!(q.pop_at(0), Some(0));
        assert_eq!(q.pop_at(0), Some(1));
        assert_eq!(q.pop_at(0), Some(2));
        assert_eq!(q.pop_at(0), None);
    }

    #[test]
    fn pop_at_arbitrary_position() {
        let q = PendingQueue::new(5); // [0,1,2,3,4]
        assert_eq!(q.pop_at(2), Some(2)); // [0,1,3,4]
        assert_eq!(q.pop_at(2), Some(3)); // [0,1,4]
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn pop_at_rejects_out_of_range_positions() {
        let q = PendingQueue::new(2); // [0,1]
        // pop_at takes a position the caller already trusts to be in range;
        // it refuses rather than clamping. Clamping against a separately
        // observed length is pop_biased's job, not this one's.
        assert_eq!(q.pop_at(10), None);
        assert_eq!(q.pop_at(1), Some(1));
    }

    #[test]
    fn push_front_reinserts_at_head() {
        let q = PendingQueue::new(3); // [0,1,2]
        let x = q.pop_at(1).unwrap(); // removes 1 -> [0,2]
        q.push_front(x); // [1,0,2]
        assert_eq!(q.pop_at(0), Some(1));
        assert_eq!(q.pop_at(0), Some(0));
        assert_eq!(q.pop_at(0), Some(2));
    }

    #[test]
    fn pop_biased_clamps_to_tail_under_one_lock() {
        let q = PendingQueue::new(2); // [0,1]
        assert_eq!(q.pop_biased(10), Some(1));
        assert_eq!(q.pop_biased(10), Some(0));
        assert_eq!(q.pop_biased(10), None); // empty queue, not a panic
    }

    #[test]
    fn duplicate_ids_are_permitted() {
        let q = PendingQueue::new(2); // [0,1]
        q.push_front(0);
        assert_eq!(q.len(), 3);
        assert_eq!(q.pop_at(0), Some(0));
        assert_eq!(q.pop_at(0), Some(0));
        assert_eq!(q.pop_at(0), Some(1));
    }
}
