/*
 * rangecast - Concurrent multi-mirror HTTP range downloader.
 * Copyright (C) 2025  rangecast contributors
 */

//! Delay-biased block selection and the invalid-block duplication gate.
//!
//! Fast mirrors (small delay counter) always take the queue head and thus
//! the earliest-needed blocks, advancing the returned prefix. Slow mirrors
//! take later blocks, keeping busy without blocking the prefix. When every
//! delay is tied at the minimum, everyone draws from the head and the queue
//! drains naturally.

use super::assembly::AssemblyBuffer;
use super::mirror::MirrorSet;
use super::queue::PendingQueue;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub dynamic_block_selection: bool,
    pub duplicate_request: bool,
    pub threshold: usize,
}

pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Desired (unclamped) queue position for worker `w`. The caller clamps
    /// this to the queue's length itself, atomically with the pop, since
    /// the length observed here can go stale before the pop runs.
    fn desired_position(&self, w: usize, mirrors: &MirrorSet) -> usize {
        if !self.config.dynamic_block_selection {
            return 0;
        }
        let mirror_delay = mirrors.get(w).delay();
        let d = if mirror_delay == mirrors.min_delay() {
            0
        } else {
            mirror_delay.max(0)
        };
        d as usize
    }

    /// Position in the pending queue worker `w` should pull from next,
    /// clamped to a queue of length `queue_len`. Exposed for unit tests;
    /// `select_block` does not use this directly, since clamping against a
    /// separately-observed length would race a concurrent pop (see
    /// `PendingQueue::pop_biased`).
    fn position_for(&self, w: usize, mirrors: &MirrorSet, queue_len: usize) -> usize {
        if queue_len == 0 {
            return 0;
        }
        self.desired_position(w, mirrors).min(queue_len - 1)
    }

    /// Pop the block worker `w` should fetch next, recording it as in
    /// flight for that worker. Returns `None` once the queue is empty (the
    /// worker should exit its loop).
    pub fn select_block(
        &self,
        w: usize,
        mirrors: &MirrorSet,
        queue: &PendingQueue,
    ) -> Option<usize> {
        let desired = self.desired_position(w, mirrors);
        let block_id = queue.pop_biased(desired)?;
        mirrors.get(w).set_in_flight(block_id);
        Some(block_id)
    }

    /// Evaluate the four conditions of the invalid-block duplication gate
    /// for worker `w` and, if all hold, push the stalled target block to
    /// the queue's front so `w`'s next pull grabs it.
    pub fn maybe_duplicate(
        &self,
        w: usize,
        mirrors: &MirrorSet,
        queue: &PendingQueue,
        assembly: &AssemblyBuffer,
    ) {
        if !self.config.duplicate_request {
            return;
        }
        let Some(target) = mirrors.min_in_flight() else {
            return;
        };
        let is_fastest = mirrors.get(w).delay() == mirrors.min_delay();
        let stuck = assembly.invalid_block_count() > self.config.threshold;
        let target_unclaimed = assembly.is_empty_slot(target);

        if is_fastest && stuck && target_unclaimed {
            queue.push_front(target);
        }
    }

    /// Update worker `w`'s delay bias after a successful deposit, per the
    /// formula `delay[w] = (received_before - prev[w]) - M`.
    pub fn record_completion(&self, w: usize, mirrors: &MirrorSet, received_before: u64) {
        let mirror = mirrors.get(w);
        let n = received_before as i64 - mirror.prev() as i64;
        mirror.set_delay(n - mirrors.len() as i64);
        mirror.set_prev(received_before);
    }
}

/// Initial delay bias per spec §4.1 step 5: `floor((d_w/d_min - 1) * C)`
/// when prediction is enabled and the ratio exceeds 2, else 0.
pub fn initial_delay(d_w: f64, d_min: f64, coefficient: f64, prediction_enabled: bool) -> i64 {
    if prediction_enabled && d_min > 0.0 && d_w / d_min > 2.0 {
        ((d_w / d_min - 1.0) * coefficient).floor() as i64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::mirror::Mirror;
    use reqwest::Client;
    use url::Url;

    fn mirrors(n: usize) -> MirrorSet {
        let ms = (0..n)
            .map(|i| Mirror::new(Client::new(), Url::parse(&format!("http://m{}/", i)).unwrap()))
            .collect();
        MirrorSet::new(ms)
    }

    #[test]
    fn initial_delay_formula_s4() {
        // d0=1ms, d1=5ms, C=10 -> delay[0]=0, delay[1]=floor((5/1-1)*10)=40
        assert_eq!(initial_delay(1.0, 1.0, 10.0, true), 0);
        assert_eq!(initial_delay(5.0, 1.0, 10.0, true), 40);
    }

    #[test]
    fn initial_delay_disabled_or_below_threshold_is_zero() {
        assert_eq!(initial_delay(5.0, 1.0, 10.0, false), 0);
        // ratio of exactly 2 does not exceed 2, must stay 0
        assert_eq!(initial_delay(2.0, 1.0, 10.0, true), 0);
    }

    #[test]
    fn position_is_zero_when_dynamic_selection_disabled() {
        let set = mirrors(2);
        set.get(0).set_delay(9);
        let sched = Scheduler::new(SchedulerConfig {
            dynamic_block_selection: false,
            duplicate_request: true,
            threshold: 20,
        });
        assert_eq!(sched.position_for(0, &set, 100), 0);
    }

    #[test]
    fn position_clamps_to_min_delay_or_tail() {
        let set = mirrors(2);
        set.get(0).set_delay(3);
        set.get(1).set_delay(0); // unique minimum
        let sched = Scheduler::new(SchedulerConfig {
            dynamic_block_selection: true,
            duplicate_request: true,
            threshold: 20,
        });
        assert_eq!(sched.position_for(0, &set, 10), 3);
        assert_eq!(sched.position_for(1, &set, 10), 0); // tied minimum -> head
        assert_eq!(sched.position_for(0, &set, 2), 1); // clamps to len-1
    }

    #[test]
    fn tie_for_smallest_forces_head() {
        let set = mirrors(2);
        set.get(0).set_delay(0);
        set.get(1).set_delay(0);
        let sched = Scheduler::new(SchedulerConfig {
            dynamic_block_selection: true,
            duplicate_request: true,
            threshold: 20,
        });
        assert_eq!(sched.position_for(0, &set, 10), 0);
        assert_eq!(sched.position_for(1, &set, 10), 0);
    }

    #[test]
    fn duplication_requires_all_four_conditions() {
        let set = mirrors(2);
        let queue = PendingQueue::new(0);
        let assembly = AssemblyBuffer::new(5);
        let sched = Scheduler::new(SchedulerConfig {
            dynamic_block_selection: true,
            duplicate_request: true,
            threshold: 1,
        });

        set.get(0).set_in_flight(3);
        set.get(1).set_in_flight(1); // target = 1
        set.get(0).set_delay(0);
        set.get(1).set_delay(0); // both at minimum

        // Not stuck yet (invalid_block_count is 0 <= threshold): no duplication.
        sched.maybe_duplicate(0, &set, &queue, &assembly);
        assert_eq!(queue.len(), 0);

        // Fill blocks 2,3 to push invalid_block_count past the threshold,
        // while the target block (1) remains empty.
        assembly.try_fill(2, bytes::Bytes::from_static(b"x"));
        assembly.try_fill(3, bytes::Bytes::from_static(b"x"));
        assert!(assembly.invalid_block_count() > 1);

        sched.maybe_duplicate(0, &set, &queue, &assembly);
        assert_eq!(queue.pop_at(0), Some(1));
    }

    #[test]
    fn duplication_skipped_when_target_already_delivered() {
        let set = mirrors(2);
        let queue = PendingQueue::new(0);
        let assembly = AssemblyBuffer::new(5);
        let sched = Scheduler::new(SchedulerConfig {
            dynamic_block_selection: true,
            duplicate_request: true,
            threshold: 0,
        });

        set.get(0).set_in_flight(3);
        set.get(1).set_in_flight(1);
        assembly.try_fill(1, bytes::Bytes::from_static(b"already here"));
        assembly.try_fill(2, bytes::Bytes::from_static(b"x"));

        sched.maybe_duplicate(0, &set, &queue, &assembly);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn select_block_never_spuriously_empties_a_nonempty_queue() {
        // A slow worker's desired position can be computed against a queue
        // length that is stale by the time the pop runs (another worker
        // popped in between). select_block must still return a block as
        // long as the queue is non-empty, never `None`.
        let set = mirrors(2);
        set.get(0).set_delay(0);
        set.get(1).set_delay(50); // far deeper than any queue this test uses
        let queue = PendingQueue::new(1); // only one block left: [0]
        let sched = Scheduler::new(SchedulerConfig {
            dynamic_block_selection: true,
            duplicate_request: true,
            threshold: 20,
        });

        assert_eq!(sched.select_block(1, &set, &queue), Some(0));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn delay_update_formula() {
        let set = mirrors(2);
        let sched = Scheduler::new(SchedulerConfig {
            dynamic_block_selection: true,
            duplicate_request: true,
            threshold: 20,
        });
        set.get(0).set_prev(3);
        // received_before=10, M=2 -> delay = (10-3) - 2 = 5
        sched.record_completion(0, &set, 10);
        assert_eq!(set.get(0).delay(), 5);
        assert_eq!(set.get(0).prev(), 10);
    }
}
