// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Min-heap timer wheel driving the tick thread's poll timeout.
//!
//! Every back-off, heartbeat and LLRP reply deadline in this crate
//! (spec.md §5, "Timers") is a [`TimerEntry`] in one [`TimerWheel`] owned
//! by the [`crate::core::rt::scheduler::Scheduler`]. The wheel never
//! spins a thread of its own; the scheduler asks it for the next
//! deadline and uses that as the `mio::Poll::poll` timeout.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

/// Opaque identifier for a scheduled timer, unique for the lifetime of the
/// owning [`TimerWheel`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TimerId(u64);

struct TimerEntry {
    deadline: Instant,
    id: TimerId,
    repeat: Option<Duration>,
}

// BinaryHeap is a max-heap; reverse the ordering on `deadline` so the
// earliest deadline sorts to the top.
impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.deadline.cmp(&self.deadline)
    }
}
impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Eq for TimerEntry {}
impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}

/// A min-heap of pending deadlines plus a cancellation set.
///
/// `cancel` marks an id as dead rather than removing it from the heap
/// immediately — `BinaryHeap` has no efficient arbitrary removal, so
/// cancelled entries are filtered out lazily as they surface in
/// [`TimerWheel::pop_due`].
pub struct TimerWheel {
    heap: BinaryHeap<TimerEntry>,
    cancelled: std::collections::HashSet<TimerId>,
    next_id: AtomicU64,
}

impl TimerWheel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            cancelled: std::collections::HashSet::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Schedule a one-shot timer to fire at `now + delay`.
    pub fn schedule_once(&mut self, now: Instant, delay: Duration) -> TimerId {
        self.insert(now + delay, None)
    }

    /// Schedule a timer that re-arms itself with the same `period` every
    /// time it fires (heartbeats, LLRP known-UID flush, discovery TTL
    /// sweeps).
    pub fn schedule_repeating(&mut self, now: Instant, period: Duration) -> TimerId {
        self.insert(now + period, Some(period))
    }

    fn insert(&mut self, deadline: Instant, repeat: Option<Duration>) -> TimerId {
        let id = TimerId(self.next_id.fetch_add(1, AtomicOrdering::Relaxed));
        self.heap.push(TimerEntry { deadline, id, repeat });
        id
    }

    /// Cancel a pending timer. A no-op if it already fired or was never
    /// valid.
    pub fn cancel(&mut self, id: TimerId) {
        self.cancelled.insert(id);
    }

    /// Pop every timer whose deadline has elapsed as of `now`, re-arming
    /// repeating ones, and return the ids that fired.
    pub fn pop_due(&mut self, now: Instant) -> Vec<TimerId> {
        let mut fired = Vec::new();
        while let Some(top) = self.heap.peek() {
            if top.deadline > now {
                break;
            }
            let entry = self.heap.pop().expect("peeked Some");
            if self.cancelled.remove(&entry.id) {
                continue;
            }
            fired.push(entry.id);
            if let Some(period) = entry.repeat {
                self.heap.push(TimerEntry {
                    deadline: now + period,
                    id: entry.id,
                    repeat: Some(period),
                });
            }
        }
        fired
    }

    /// Duration until the next non-cancelled deadline, if any — used
    /// directly as the `mio::Poll::poll` timeout.
    #[must_use]
    pub fn next_timeout(&self, now: Instant) -> Option<Duration> {
        self.heap
            .iter()
            .filter(|e| !self.cancelled.contains(&e.id))
            .map(|e| e.deadline.saturating_duration_since(now))
            .min()
    }
}

impl Default for TimerWheel {
    fn default() -> Self {
        Self::new()
    }
}
