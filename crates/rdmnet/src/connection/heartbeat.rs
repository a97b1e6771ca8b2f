// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Heartbeat timing for a connected scope (spec.md §4.4: "both sides
//! exchange a null PDU at least every 15 s; absence for > 15 s triggers
//! `Connected → Discovery`").

use crate::config::{HEARTBEAT_INTERVAL_MS, HEARTBEAT_TIMEOUT_MS};
use std::time::{Duration, Instant};

/// Tracks when this side last sent a heartbeat and when the peer was
/// last heard from.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatTracker {
    last_sent: Instant,
    last_received: Instant,
}

impl HeartbeatTracker {
    #[must_use]
    pub fn start(now: Instant) -> Self {
        Self { last_sent: now, last_received: now }
    }

    /// `true` once `HEARTBEAT_INTERVAL_MS` has elapsed since our last
    /// send; caller should send a null PDU and call
    /// [`Self::record_sent`].
    #[must_use]
    pub fn should_send(&self, now: Instant) -> bool {
        now.duration_since(self.last_sent) >= Duration::from_millis(HEARTBEAT_INTERVAL_MS)
    }

    pub fn record_sent(&mut self, now: Instant) {
        self.last_sent = now;
    }

    /// Call on receipt of any traffic from the peer, not just a null PDU
    /// — any message proves liveness.
    pub fn record_received(&mut self, now: Instant) {
        self.last_received = now;
    }

    /// `true` once more than `HEARTBEAT_TIMEOUT_MS` has passed since the
    /// peer was last heard from.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.last_received) > Duration::from_millis(HEARTBEAT_TIMEOUT_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_after_timeout_without_traffic() {
        let now = Instant::now();
        let tracker = HeartbeatTracker::start(now);
        assert!(!tracker.is_expired(now + Duration::from_secs(10)));
        assert!(tracker.is_expired(now + Duration::from_secs(16)));
    }

    #[test]
    fn received_traffic_resets_the_timeout() {
        let now = Instant::now();
        let mut tracker = HeartbeatTracker::start(now);
        let later = now + Duration::from_secs(10);
        tracker.record_received(later);
        assert!(!tracker.is_expired(later + Duration::from_secs(10)));
    }

    #[test]
    fn should_send_once_interval_elapses() {
        let now = Instant::now();
        let mut tracker = HeartbeatTracker::start(now);
        assert!(!tracker.should_send(now + Duration::from_secs(5)));
        assert!(tracker.should_send(now + Duration::from_secs(16)));
        tracker.record_sent(now + Duration::from_secs(16));
        assert!(!tracker.should_send(now + Duration::from_secs(20)));
    }
}
