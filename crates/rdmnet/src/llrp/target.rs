// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! LLRP Target: answers probe-requests and carries LLRP-wrapped RDM
//! commands for one RPT device/controller/broker component (spec.md
//! §4.6).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{LLRP_PORT, LLRP_REPLY_BACKOFF_MAX_MS, LLRP_REPLY_MULTICAST_V4};
use crate::core::cid::Cid;
use crate::core::uid::Uid;
use crate::error::Result;
use crate::llrp::common::uid_to_u64;
use crate::protocol::llrp::{broadcast_cid, LlrpPdu, LlrpVector, ComponentType, ProbeFilter, ProbeReply, ProbeRequest};
use crate::transport::{LlrpSocket, NetintService};

/// Public configuration for a [`TargetEngine`], mirrored by the
/// `LlrpTarget` handle exposed from the crate root.
#[derive(Debug, Clone)]
pub struct LlrpTargetConfig {
    pub cid: Cid,
    pub uid: Uid,
    pub hardware_address: [u8; 6],
    pub component_type: ComponentType,
}

/// Output of feeding the engine an incoming probe-request or a timer
/// tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetEvent {
    /// Send this reply once the scheduled back-off elapses.
    SendProbeReply(ProbeReply),
}

/// Reply-scheduling state machine for one LLRP target.
///
/// A matching probe-request schedules a reply at a uniformly random
/// delay in `[0, LLRP_REPLY_BACKOFF_MAX_MS)` rather than replying
/// immediately, spreading responses across many targets answering the
/// same probe-request to reduce reply collisions on the wire. A second
/// matching request arriving while a reply is already pending is
/// coalesced into the same scheduled reply rather than rescheduling
/// it.
pub struct TargetEngine {
    config: LlrpTargetConfig,
    connected_to_broker: bool,
    pending_reply_at: Option<Instant>,
}

impl TargetEngine {
    #[must_use]
    pub fn new(config: LlrpTargetConfig) -> Self {
        Self { config, connected_to_broker: false, pending_reply_at: None }
    }

    #[must_use]
    pub fn uid(&self) -> Uid {
        self.config.uid
    }

    /// Update whether this target currently holds an active broker TCP
    /// connection, consulted against [`ProbeFilter::CLIENT_TCP_CONNECTION_INACTIVE`].
    pub fn set_connected_to_broker(&mut self, connected: bool) {
        self.connected_to_broker = connected;
    }

    /// Evaluate an incoming probe-request. Returns `true` if it matched
    /// and a reply has been scheduled (or was already pending and is
    /// now coalesced); `false` if the request was filtered out.
    pub fn on_probe_request(&mut self, request: &ProbeRequest, now: Instant, reply_delay: Duration) -> bool {
        if !self.matches(request) {
            return false;
        }
        if self.pending_reply_at.is_none() {
            self.pending_reply_at = Some(now + reply_delay);
        }
        true
    }

    /// Pick a uniformly random reply delay in `[0, LLRP_REPLY_BACKOFF_MAX_MS)`.
    /// Exposed as a free function of `rand` so callers (and tests) can
    /// supply a fixed delay instead.
    #[must_use]
    pub fn random_reply_delay() -> Duration {
        Duration::from_millis(fastrand::u64(0..LLRP_REPLY_BACKOFF_MAX_MS))
    }

    fn matches(&self, request: &ProbeRequest) -> bool {
        if request.filter.contains(ProbeFilter::BROKERS_ONLY) && self.config.component_type != ComponentType::Broker {
            return false;
        }
        if request.filter.contains(ProbeFilter::CLIENT_TCP_CONNECTION_INACTIVE) && self.connected_to_broker {
            return false;
        }
        let uid = uid_to_u64(self.config.uid);
        let lo = uid_to_u64(request.lower_uid);
        let hi = uid_to_u64(request.upper_uid);
        if uid < lo || uid > hi {
            return false;
        }
        !request.known_uids.contains(&self.config.uid)
    }

    /// Call on every tick; emits the scheduled reply once `now` reaches
    /// its back-off deadline.
    pub fn on_tick(&mut self, now: Instant) -> Option<TargetEvent> {
        let deadline = self.pending_reply_at?;
        if now < deadline {
            return None;
        }
        self.pending_reply_at = None;
        Some(TargetEvent::SendProbeReply(ProbeReply {
            uid: self.config.uid,
            hardware_address: self.config.hardware_address,
            component_type: self.config.component_type,
        }))
    }

    #[must_use]
    pub fn has_pending_reply(&self) -> bool {
        self.pending_reply_at.is_some()
    }
}

/// Public handle to a running LLRP Target: owns the multicast socket
/// and answers probe-requests on the caller's tick loop.
///
/// Co-hosted by every RPT device/controller (spec.md §4.7, "co-hosted
/// LLRP target") and by brokers.
pub struct LlrpTarget {
    engine: TargetEngine,
    socket: Arc<LlrpSocket>,
}

impl LlrpTarget {
    /// Bind the LLRP multicast socket and construct a target engine.
    pub fn create(config: LlrpTargetConfig, netints: &NetintService) -> Result<Self> {
        let socket = LlrpSocket::bind(netints)?;
        Ok(Self { engine: TargetEngine::new(config), socket: Arc::new(socket) })
    }

    #[must_use]
    pub fn uid(&self) -> Uid {
        self.engine.uid()
    }

    pub fn set_connected_to_broker(&mut self, connected: bool) {
        self.engine.set_connected_to_broker(connected);
    }

    /// Drain one pending inbound datagram and evaluate it as a
    /// probe-request, scheduling a reply if it matches.
    pub fn poll_socket(&mut self, now: Instant) -> Result<()> {
        let mut buf = vec![0u8; crate::config::MAX_PDU_SIZE];
        if let Some((n, _addr)) = self.socket.try_recv_from(&mut buf)? {
            if let Ok(pdu) = LlrpPdu::decode(&buf[..n]) {
                if pdu.vector == LlrpVector::ProbeRequest && (pdu.destination_cid == broadcast_cid()) {
                    if let Ok(request) = ProbeRequest::decode(&pdu.payload) {
                        self.engine.on_probe_request(&request, now, TargetEngine::random_reply_delay());
                    }
                }
            }
        }
        Ok(())
    }

    /// Call once per tick; sends the scheduled reply once its back-off
    /// deadline elapses.
    pub fn tick(&mut self, now: Instant) -> Result<()> {
        if let Some(TargetEvent::SendProbeReply(reply)) = self.engine.on_tick(now) {
            let pdu = LlrpPdu { vector: LlrpVector::ProbeReply, destination_cid: broadcast_cid(), transaction_number: 0, payload: reply.encode() };
            let dest = SocketAddr::new(LLRP_REPLY_MULTICAST_V4.into(), LLRP_PORT);
            self.socket.send_to(&pdu.encode(), dest)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid() -> Cid {
        Cid::from_bytes([0x22; 16])
    }

    fn config() -> LlrpTargetConfig {
        LlrpTargetConfig { cid: cid(), uid: Uid::new(0x6574, 0x1234_5678), hardware_address: [1, 2, 3, 4, 5, 6], component_type: ComponentType::RptDevice }
    }

    fn full_range_request() -> ProbeRequest {
        ProbeRequest { lower_uid: Uid::new(0, 0), upper_uid: Uid::broadcast_all(), filter: ProbeFilter::default(), known_uids: Vec::new() }
    }

    #[test]
    fn matching_request_schedules_reply_after_backoff() {
        let mut engine = TargetEngine::new(config());
        let now = Instant::now();
        assert!(engine.on_probe_request(&full_range_request(), now, Duration::from_millis(500)));
        assert!(engine.on_tick(now).is_none());
        let event = engine.on_tick(now + Duration::from_millis(500));
        assert_eq!(
            event,
            Some(TargetEvent::SendProbeReply(ProbeReply { uid: config().uid, hardware_address: config().hardware_address, component_type: ComponentType::RptDevice }))
        );
    }

    #[test]
    fn known_uid_suppresses_reply() {
        let mut engine = TargetEngine::new(config());
        let mut req = full_range_request();
        req.known_uids.push(config().uid);
        assert!(!engine.on_probe_request(&req, Instant::now(), Duration::from_millis(0)));
    }

    #[test]
    fn out_of_range_request_does_not_match() {
        let mut engine = TargetEngine::new(config());
        let req = ProbeRequest { lower_uid: Uid::new(0, 0), upper_uid: Uid::new(0x10, 0), filter: ProbeFilter::default(), known_uids: Vec::new() };
        assert!(!engine.on_probe_request(&req, Instant::now(), Duration::from_millis(0)));
    }

    #[test]
    fn brokers_only_filter_excludes_non_broker_targets() {
        let mut engine = TargetEngine::new(config());
        let req = ProbeRequest { filter: ProbeFilter::from_bits(ProbeFilter::BROKERS_ONLY), ..full_range_request() };
        assert!(!engine.on_probe_request(&req, Instant::now(), Duration::from_millis(0)));
    }

    #[test]
    fn connection_inactive_filter_excludes_connected_targets() {
        let mut engine = TargetEngine::new(config());
        engine.set_connected_to_broker(true);
        let req = ProbeRequest { filter: ProbeFilter::from_bits(ProbeFilter::CLIENT_TCP_CONNECTION_INACTIVE), ..full_range_request() };
        assert!(!engine.on_probe_request(&req, Instant::now(), Duration::from_millis(0)));
    }

    #[test]
    fn second_matching_request_coalesces_into_pending_reply() {
        let mut engine = TargetEngine::new(config());
        let now = Instant::now();
        engine.on_probe_request(&full_range_request(), now, Duration::from_millis(1000));
        let first_deadline = engine.pending_reply_at;
        engine.on_probe_request(&full_range_request(), now + Duration::from_millis(100), Duration::from_millis(50));
        assert_eq!(engine.pending_reply_at, first_deadline);
    }

    #[test]
    fn random_reply_delay_stays_within_backoff_window() {
        for _ in 0..50 {
            let d = TargetEngine::random_reply_delay();
            assert!(d.as_millis() < u128::from(LLRP_REPLY_BACKOFF_MAX_MS));
        }
    }
}
