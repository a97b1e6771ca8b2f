// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! LLRP Manager: UID-range-bisection discovery (spec.md §4.5).
//!
//! [`DiscoveryEngine`] is sans-IO: it never touches a socket. Callers
//! drive it with [`DiscoveryEngine::start`], [`DiscoveryEngine::on_probe_reply`]
//! and [`DiscoveryEngine::on_window_expired`], and apply the returned
//! [`ManagerEvent`]s (send these bytes, surface this discovered target)
//! against whatever transport is at hand — a real [`crate::transport::udp::LlrpSocket`]
//! in production, an in-process channel in tests.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{LLRP_CLEAN_PROBE_THRESHOLD, LLRP_PORT, LLRP_REQUEST_MULTICAST_V4, LLRP_TIMEOUT_MS};
use crate::core::cid::Cid;
use crate::core::uid::Uid;
use crate::error::Result;
use crate::llrp::common::{fragment_probe_requests, uid_to_u64, FULL_RANGE_HI, FULL_RANGE_LO};
use crate::protocol::llrp::{broadcast_cid, ComponentType, LlrpPdu, LlrpVector, ProbeFilter, ProbeReply, ProbeRequest};
use crate::transport::{LlrpSocket, NetintService};

/// Public configuration for a [`DiscoveryEngine`] instance, mirrored by
/// the `LlrpManager` handle exposed from the crate root.
#[derive(Debug, Clone)]
pub struct LlrpManagerConfig {
    pub cid: Cid,
    pub filter: ProbeFilter,
}

/// One target found during a discovery pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredTarget {
    pub uid: Uid,
    pub cid: Cid,
    pub hardware_address: [u8; 6],
    pub component_type: ComponentType,
}

/// Output of feeding the engine a reply or a timer tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerEvent {
    /// Send these probe requests (already fragmented against the
    /// Known-UID cap) as one LLRP PDU each.
    SendProbeRequests(Vec<ProbeRequest>),
    /// A previously-unseen target answered a probe.
    TargetDiscovered(DiscoveredTarget),
    /// The active discovery pass has concluded; no more requests will
    /// be sent until [`DiscoveryEngine::start`] is called again.
    DiscoveryFinished,
}

/// A `[lo, hi]` UID range awaiting its own probe/bisect cycle.
type Range = (u64, u64);

/// UID-range-bisection discovery state machine.
///
/// Starts probing the full 48-bit UID space. A range is retransmitted
/// until [`LLRP_CLEAN_PROBE_THRESHOLD`] consecutive windows pass with no
/// reply. The original full range finishing cleanly ends discovery
/// outright; any narrower range (only ever produced by bisecting a
/// range that is itself a strict subset of the full space) finishing
/// cleanly instead pops the next pending range off the stack, or ends
/// discovery if none remain.
pub struct DiscoveryEngine {
    running: bool,
    current: Range,
    clean_windows: u32,
    stack: Vec<Range>,
    known: Vec<Uid>,
    discovered: HashSet<Uid>,
    replies_this_window: bool,
    window_deadline: Option<Instant>,
    filter: ProbeFilter,
}

impl DiscoveryEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            running: false,
            current: (FULL_RANGE_LO, FULL_RANGE_HI),
            clean_windows: 0,
            stack: Vec::new(),
            known: Vec::new(),
            discovered: HashSet::new(),
            replies_this_window: false,
            window_deadline: None,
            filter: ProbeFilter::default(),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Begin a fresh discovery pass over the full UID space.
    pub fn start(&mut self, filter: ProbeFilter, now: Instant) -> Vec<ManagerEvent> {
        self.running = true;
        self.current = (FULL_RANGE_LO, FULL_RANGE_HI);
        self.clean_windows = 0;
        self.stack.clear();
        self.known.clear();
        self.discovered.clear();
        self.replies_this_window = false;
        self.filter = filter;
        self.window_deadline = Some(now + Duration::from_millis(LLRP_TIMEOUT_MS));
        self.emit_probe_requests()
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.window_deadline = None;
    }

    /// When the caller's tick loop should next call [`Self::on_window_expired`].
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.window_deadline
    }

    /// Feed a parsed `PROBE_REPLY`. Returns a [`ManagerEvent::TargetDiscovered`]
    /// the first time a given UID answers; repeated replies for an
    /// already-known UID are silently ignored (the target should have
    /// suppressed itself, but a stray retransmit is not an error).
    pub fn on_probe_reply(
        &mut self,
        uid: Uid,
        cid: Cid,
        hardware_address: [u8; 6],
        component_type: ComponentType,
    ) -> Option<ManagerEvent> {
        if !self.running {
            return None;
        }
        self.replies_this_window = true;
        if !self.discovered.insert(uid) {
            return None;
        }
        self.known.push(uid);
        Some(ManagerEvent::TargetDiscovered(DiscoveredTarget { uid, cid, hardware_address, component_type }))
    }

    /// Drive the bisection state machine past one probe window. Call
    /// when `now >= self.next_deadline()`.
    pub fn on_window_expired(&mut self, now: Instant) -> Vec<ManagerEvent> {
        if !self.running {
            return Vec::new();
        }

        if self.replies_this_window {
            self.clean_windows = 0;
        } else {
            self.clean_windows += 1;
        }
        self.replies_this_window = false;

        if self.clean_windows < LLRP_CLEAN_PROBE_THRESHOLD {
            self.window_deadline = Some(now + Duration::from_millis(LLRP_TIMEOUT_MS));
            return self.emit_probe_requests();
        }

        // Three consecutive clean windows on the current range.
        if self.current == (FULL_RANGE_LO, FULL_RANGE_HI) {
            self.running = false;
            self.window_deadline = None;
            return vec![ManagerEvent::DiscoveryFinished];
        }

        if self.current.1 == self.current.0 {
            // Singleton range exhausted; nothing left to bisect.
            return self.advance_to_next_range(now);
        }

        self.bisect_current();
        self.window_deadline = Some(now + Duration::from_millis(LLRP_TIMEOUT_MS));
        self.emit_probe_requests()
    }

    fn bisect_current(&mut self) {
        let (lo, hi) = self.current;
        let mid = lo + (hi - lo) / 2;
        self.stack.push((mid + 1, hi));
        self.current = (lo, mid);
        self.clean_windows = 0;
    }

    fn advance_to_next_range(&mut self, now: Instant) -> Vec<ManagerEvent> {
        match self.stack.pop() {
            Some(range) => {
                self.current = range;
                self.clean_windows = 0;
                self.window_deadline = Some(now + Duration::from_millis(LLRP_TIMEOUT_MS));
                self.emit_probe_requests()
            }
            None => {
                self.running = false;
                self.window_deadline = None;
                vec![ManagerEvent::DiscoveryFinished]
            }
        }
    }

    fn emit_probe_requests(&self) -> Vec<ManagerEvent> {
        let (lo, hi) = self.current;
        let requests = fragment_probe_requests(lo, hi, self.filter, &self.known);
        vec![ManagerEvent::SendProbeRequests(requests)]
    }
}

impl Default for DiscoveryEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Public handle to a running LLRP Manager: owns the multicast socket
/// and drives a [`DiscoveryEngine`] from the caller's tick loop.
///
/// Runs co-located with an RPT controller's [`crate::client::Controller`]
/// or standalone (e.g. `rdmnet-llrpdump`).
pub struct LlrpManager {
    config: LlrpManagerConfig,
    engine: DiscoveryEngine,
    socket: Arc<LlrpSocket>,
    transaction_number: AtomicU32,
}

impl LlrpManager {
    /// Bind the LLRP multicast socket and construct an idle manager.
    pub fn create(config: LlrpManagerConfig, netints: &NetintService) -> Result<Self> {
        let socket = LlrpSocket::bind(netints)?;
        Ok(Self { config, engine: DiscoveryEngine::new(), socket: Arc::new(socket), transaction_number: AtomicU32::new(1) })
    }

    /// Begin a discovery pass, broadcasting the first probe-request(s)
    /// immediately.
    pub fn start_discovery(&mut self, filter: ProbeFilter) -> Result<()> {
        let events = self.engine.start(filter, Instant::now());
        self.dispatch(events)
    }

    pub fn stop_discovery(&mut self) {
        self.engine.stop();
    }

    #[must_use]
    pub fn is_discovering(&self) -> bool {
        self.engine.is_running()
    }

    /// Call once per tick; advances the bisection window if its
    /// deadline has passed.
    pub fn tick(&mut self, now: Instant) -> Result<()> {
        if let Some(deadline) = self.engine.next_deadline() {
            if now >= deadline {
                let events = self.engine.on_window_expired(now);
                return self.dispatch(events);
            }
        }
        Ok(())
    }

    /// Parse one incoming LLRP PDU directed at this manager (destination
    /// CID equal to either this manager's CID or the LLRP broadcast
    /// CID). Returns the discovered target, if this reply is new.
    pub fn on_datagram(&mut self, bytes: &[u8]) -> Option<DiscoveredTarget> {
        let pdu = LlrpPdu::decode(bytes).ok()?;
        if pdu.destination_cid != self.config.cid && pdu.destination_cid != broadcast_cid() {
            return None;
        }
        if pdu.vector != LlrpVector::ProbeReply {
            return None;
        }
        let reply = ProbeReply::decode(&pdu.payload).ok()?;
        match self.engine.on_probe_reply(reply.uid, self.config.cid, reply.hardware_address, reply.component_type) {
            Some(ManagerEvent::TargetDiscovered(target)) => Some(target),
            _ => None,
        }
    }

    /// Drain one pending inbound datagram from the socket, if any, and
    /// feed it to [`Self::on_datagram`].
    pub fn poll_socket(&mut self) -> Result<Option<DiscoveredTarget>> {
        let mut buf = vec![0u8; crate::config::MAX_PDU_SIZE];
        match self.socket.try_recv_from(&mut buf)? {
            Some((n, _addr)) => Ok(self.on_datagram(&buf[..n])),
            None => Ok(None),
        }
    }

    fn dispatch(&self, events: Vec<ManagerEvent>) -> Result<()> {
        let dest = SocketAddr::new(LLRP_REQUEST_MULTICAST_V4.into(), LLRP_PORT);
        for event in events {
            if let ManagerEvent::SendProbeRequests(requests) = event {
                for request in requests {
                    let txn = self.transaction_number.fetch_add(1, Ordering::Relaxed);
                    let pdu = LlrpPdu {
                        vector: LlrpVector::ProbeRequest,
                        destination_cid: broadcast_cid(),
                        transaction_number: txn,
                        payload: request.encode(),
                    };
                    self.socket.send_to(&pdu.encode(), dest)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid() -> Cid {
        Cid::from_bytes([0x48, 0xea, 0xee, 0x88, 0x2d, 0x5e, 0x43, 0xd4, 0xb0, 0xe9, 0x7a, 0x9d, 0x59, 0x77, 0xae, 0x9d])
    }

    fn target_uid() -> Uid {
        Uid::new(0x6574, 0x1234_5678)
    }

    #[test]
    fn single_target_in_full_range_discovered_within_four_probes() {
        let mut engine = DiscoveryEngine::new();
        let mut now = Instant::now();
        let events = engine.start(ProbeFilter::default(), now);
        assert!(matches!(events[0], ManagerEvent::SendProbeRequests(_)));

        let mut requests_sent = 1;
        let mut discovered = false;
        loop {
            now += Duration::from_millis(LLRP_TIMEOUT_MS);
            if !discovered {
                let ev = engine.on_probe_reply(target_uid(), cid(), [1, 2, 3, 4, 5, 6], ComponentType::RptDevice);
                assert!(matches!(ev, Some(ManagerEvent::TargetDiscovered(_))));
                discovered = true;
            }
            let events = engine.on_window_expired(now);
            if events.iter().any(|e| matches!(e, ManagerEvent::SendProbeRequests(_))) {
                requests_sent += 1;
            }
            if events.iter().any(|e| matches!(e, ManagerEvent::DiscoveryFinished)) {
                break;
            }
            assert!(requests_sent < 20, "discovery never terminated");
        }
        assert!(requests_sent >= 4, "expected at least four probe-requests, sent {requests_sent}");
        assert!(!engine.is_running());
    }

    #[test]
    fn empty_range_finishes_after_exactly_three_probes() {
        let mut engine = DiscoveryEngine::new();
        let mut now = Instant::now();
        engine.start(ProbeFilter::default(), now);
        let mut requests_sent = 1;
        loop {
            now += Duration::from_millis(LLRP_TIMEOUT_MS);
            let events = engine.on_window_expired(now);
            if events.iter().any(|e| matches!(e, ManagerEvent::SendProbeRequests(_))) {
                requests_sent += 1;
            }
            if events.contains(&ManagerEvent::DiscoveryFinished) {
                break;
            }
            assert!(requests_sent < 10);
        }
        assert_eq!(requests_sent, 3);
    }

    #[test]
    fn target_missing_first_two_probes_still_discovered() {
        let mut engine = DiscoveryEngine::new();
        let mut now = Instant::now();
        engine.start(ProbeFilter::default(), now);
        let mut window = 1;
        let mut requests_sent = 1;
        let mut finished = false;
        while !finished {
            now += Duration::from_millis(LLRP_TIMEOUT_MS);
            window += 1;
            if window == 3 {
                engine.on_probe_reply(target_uid(), cid(), [0; 6], ComponentType::RptDevice);
            }
            let events = engine.on_window_expired(now);
            if events.iter().any(|e| matches!(e, ManagerEvent::SendProbeRequests(_))) {
                requests_sent += 1;
            }
            finished = events.contains(&ManagerEvent::DiscoveryFinished);
            assert!(requests_sent < 20);
        }
        assert!(requests_sent >= 6, "expected at least six probe-requests, sent {requests_sent}");
        assert!(engine.discovered.contains(&target_uid()));
    }

    #[test]
    fn bisection_splits_a_narrower_range_and_both_halves_resolve() {
        let mut engine = DiscoveryEngine::new();
        engine.running = true;
        engine.current = (0, 100);
        engine.filter = ProbeFilter::default();
        let now = Instant::now();

        engine.on_probe_reply(Uid::new(0, 10), cid(), [0; 6], ComponentType::RptDevice);
        for _ in 0..LLRP_CLEAN_PROBE_THRESHOLD {
            engine.on_window_expired(now);
        }
        assert_eq!(engine.current, (0, 50));
        assert_eq!(engine.stack, vec![(51, 100)]);

        for _ in 0..LLRP_CLEAN_PROBE_THRESHOLD {
            engine.on_window_expired(now);
        }
        assert_eq!(engine.current, (51, 100));
        assert!(engine.stack.is_empty());

        let events = {
            let mut last = Vec::new();
            for _ in 0..LLRP_CLEAN_PROBE_THRESHOLD {
                last = engine.on_window_expired(now);
            }
            last
        };
        assert!(events.contains(&ManagerEvent::DiscoveryFinished));
    }

    #[test]
    fn duplicate_reply_for_known_uid_is_not_rediscovered() {
        let mut engine = DiscoveryEngine::new();
        engine.start(ProbeFilter::default(), Instant::now());
        let first = engine.on_probe_reply(target_uid(), cid(), [0; 6], ComponentType::RptDevice);
        assert!(first.is_some());
        let second = engine.on_probe_reply(target_uid(), cid(), [0; 6], ComponentType::RptDevice);
        assert!(second.is_none());
    }

    #[test]
    fn uid_to_u64_respects_ordering_used_for_bisection() {
        assert!(uid_to_u64(Uid::new(0, 0)) < uid_to_u64(Uid::new(0, 1)));
        assert!(uid_to_u64(Uid::new(0, 0xFFFF_FFFF)) < uid_to_u64(Uid::new(1, 0)));
    }
}
