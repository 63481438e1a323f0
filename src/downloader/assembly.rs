/*
 * rangecast - Concurrent multi-mirror HTTP range downloader.
 * Copyright (C) 2025  rangecast contributors
 */

//! Sparse vector of block slots plus the contiguous-returned cursor.
//!
//! One mutex guards the slot vector, the returned cursor `R`, and
//! `invalid_block_count` together: the latter two are derived from a scan
//! of the former, so serializing all three behind a single lock is
//! equivalent to (and simpler than) splitting the scan from its inputs.

use bytes::Bytes;
use std::sync::Mutex;

#[derive(Debug)]
enum Slot {
    Empty,
    Filled(Bytes),
    Consumed,
}

struct Inner {
    slots: Vec<Slot>,
    /// Smallest index whose slot is not `Consumed`.
    returned: usize,
    /// Count of `Filled` slots at indices >= returned.
    invalid_block_count: usize,
}

pub struct AssemblyBuffer {
    inner: Mutex<Inner>,
}

impl AssemblyBuffer {
    pub fn new(num_blocks: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                slots: (0..num_blocks).map(|_| Slot::Empty).collect(),
                returned: 0,
                invalid_block_count: 0,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().slots.len()
    }

    /// If slot `block_id` is `Empty`, fill it with `bytes` and return `true`.
    /// Otherwise leave the existing contents untouched and return `false`
    /// (a peer mirror already delivered this block first).
    pub fn try_fill(&self, block_id: usize, bytes: Bytes) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.slots[block_id] {
            Slot::Empty => {
                inner.slots[block_id] = Slot::Filled(bytes);
                true
            }
            _ => false,
        }
    }

    /// `true` if slot `block_id` is still `Empty` (nobody has delivered it).
    pub fn is_empty_slot(&self, block_id: usize) -> bool {
        matches!(self.inner.lock().unwrap().slots[block_id], Slot::Empty)
    }

    pub fn returned_cursor(&self) -> usize {
        self.inner.lock().unwrap().returned
    }

    pub fn invalid_block_count(&self) -> usize {
        self.inner.lock().unwrap().invalid_block_count
    }

    /// Drain the largest ready contiguous prefix starting at the current
    /// returned cursor: every leading `Filled` slot is concatenated and
    /// marked `Consumed`, the cursor advances past them, and
    /// `invalid_block_count` is recomputed. Returns the concatenated bytes
    /// (empty if nothing new was ready).
    pub fn drain_prefix(&self) -> Bytes {
        let mut inner = self.inner.lock().unwrap();
        let mut out = Vec::new();
        let mut i = inner.returned;

        while i < inner.slots.len() {
            match &inner.slots[i] {
                Slot::Filled(bytes) => {
                    out.extend_from_slice(bytes);
                    inner.slots[i] = Slot::Consumed;
                    i += 1;
                }
                _ => break,
            }
        }
        inner.returned = i;

        let invalid = inner.slots[inner.returned..]
            .iter()
            .filter(|s| matches!(s, Slot::Filled(_)))
            .count();
        inner.invalid_block_count = invalid;

        Bytes::from(out)
    }

    /// `true` once every slot has been consumed (`R == N`).
    pub fn is_complete(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.returned == inner.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_ordering_invariant() {
        let buf = AssemblyBuffer::new(4);
        assert!(buf.try_fill(1, Bytes::from_static(b"b")));
        assert!(buf.try_fill(3, Bytes::from_static(b"d")));
        // block 0 still empty: nothing should be returned yet.
        assert_eq!(buf.drain_prefix(), Bytes::new());
        assert_eq!(buf.returned_cursor(), 0);
        assert_eq!(buf.invalid_block_count(), 2); // 1 and 3 buffered but blocked

        assert!(buf.try_fill(0, Bytes::from_static(b"a")));
        let out = buf.drain_prefix();
        assert_eq!(out, Bytes::from_static(b"ab"));
        assert_eq!(buf.returned_cursor(), 2);
        assert_eq!(buf.invalid_block_count(), 1); // block 3 still stuck behind 2

        assert!(buf.try_fill(2, Bytes::from_static(b"c")));
        let out = buf.drain_prefix();
        assert_eq!(out, Bytes::from_static(b"cd"));
        assert_eq!(buf.returned_cursor(), 4);
        assert!(buf.is_complete());
    }

    #[test]
    fn duplicate_deposit_is_discarded() {
        let buf = AssemblyBuffer::new(1);
        assert!(buf.try_fill(0, Bytes::from_static(b"first")));
        assert!(!buf.try_fill(0, Bytes::from_static(b"second")));
        assert_eq!(buf.drain_prefix(), Bytes::from_static(b"first"));
    }

    #[test]
    fn each_block_consumed_exactly_once() {
        let buf = AssemblyBuffer::new(2);
        buf.try_fill(0, Bytes::from_static(b"a"));
        buf.try_fill(1, Bytes::from_static(b"b"));
        let first = buf.drain_prefix();
        assert_eq!(first, Bytes::from_static(b"ab"));
        let second = buf.drain_prefix();
        assert_eq!(second, Bytes::new());
    }
}
