// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-scope broker connection state machine (spec.md §4.4).
//!
//! Sans-IO, like [`crate::llrp::manager::DiscoveryEngine`]: this module
//! only decides *what* to do next (connect, retransmit a heartbeat,
//! retry after a back-off) and hands that decision back as a list of
//! [`ConnectionAction`]s. The client session layer owns the actual
//! [`crate::transport::tcp::BrokerConnection`] and drives this engine
//! with [`ConnectionInput`].

pub mod backoff;
pub mod heartbeat;

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::core::cid::Cid;
use crate::core::types::Scope;
use crate::core::uid::Uid;
use crate::error::RdmnetStatus;

pub use backoff::Backoff;
pub use heartbeat::HeartbeatTracker;

/// Lifecycle of one scope's broker connection (spec.md §4.4's state
/// diagram).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Inactive,
    Discovery,
    Connecting { addr: SocketAddr },
    Connected { broker_cid: Cid, broker_uid: Uid },
    MarkedForDestruction,
}

/// Events the session layer feeds into the state machine.
#[derive(Debug, Clone)]
pub enum ConnectionInput {
    AddScope,
    BrokerFound(Vec<SocketAddr>),
    TcpConnected,
    TcpConnectFailed,
    HandshakeOk { broker_cid: Cid, broker_uid: Uid },
    HandshakeRejected(RdmnetStatus),
    Redirect(SocketAddr),
    PeerDisconnected(RdmnetStatus),
    RemoveScope,
    Tick(Instant),
}

/// Side effects the caller must carry out in response to an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    StartMonitoringScope,
    StopMonitoringScope,
    ConnectTo(SocketAddr),
    SendClientConnect,
    SendHeartbeat,
    ScheduleRetry(Duration),
    Connected { broker_cid: Cid, broker_uid: Uid },
    ConnectFailed(Option<RdmnetStatus>),
    Disconnected,
    Destroy,
}

/// One scope's connection state machine.
pub struct ScopeConnection {
    scope: Scope,
    state: ConnectionState,
    static_broker: Option<SocketAddr>,
    discovered_addrs: Vec<SocketAddr>,
    addr_index: usize,
    backoff: Backoff,
    heartbeat: Option<HeartbeatTracker>,
}

impl ScopeConnection {
    #[must_use]
    pub fn new(scope: Scope, static_broker: Option<SocketAddr>) -> Self {
        Self {
            scope,
            state: ConnectionState::Inactive,
            static_broker,
            discovered_addrs: Vec::new(),
            addr_index: 0,
            backoff: Backoff::new(),
            heartbeat: None,
        }
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Drive the state machine with one input, producing the actions the
    /// caller must perform.
    pub fn handle(&mut self, input: ConnectionInput) -> Vec<ConnectionAction> {
        match input {
            ConnectionInput::AddScope => self.on_add_scope(),
            ConnectionInput::BrokerFound(addrs) => self.on_broker_found(addrs),
            ConnectionInput::TcpConnected => self.on_tcp_connected(),
            ConnectionInput::TcpConnectFailed => self.on_connect_failed(None),
            ConnectionInput::HandshakeOk { broker_cid, broker_uid } => self.on_handshake_ok(broker_cid, broker_uid),
            ConnectionInput::HandshakeRejected(status) => self.on_connect_failed(Some(status)),
            ConnectionInput::Redirect(addr) => self.on_redirect(addr),
            ConnectionInput::PeerDisconnected(status) => self.on_peer_disconnected(status),
            ConnectionInput::RemoveScope => self.on_remove_scope(),
            ConnectionInput::Tick(now) => self.on_tick(now),
        }
    }

    fn on_add_scope(&mut self) -> Vec<ConnectionAction> {
        if !matches!(self.state, ConnectionState::Inactive) {
            return Vec::new();
        }
        if let Some(addr) = self.static_broker {
            self.state = ConnectionState::Connecting { addr };
            return vec![ConnectionAction::ConnectTo(addr)];
        }
        self.state = ConnectionState::Discovery;
        vec![ConnectionAction::StartMonitoringScope]
    }

    fn on_broker_found(&mut self, addrs: Vec<SocketAddr>) -> Vec<ConnectionAction> {
        if !matches!(self.state, ConnectionState::Discovery) || addrs.is_empty() {
            return Vec::new();
        }
        self.discovered_addrs = addrs;
        self.addr_index = 0;
        let addr = self.discovered_addrs[0];
        self.state = ConnectionState::Connecting { addr };
        vec![ConnectionAction::ConnectTo(addr)]
    }

    fn on_tcp_connected(&mut self) -> Vec<ConnectionAction> {
        if matches!(self.state, ConnectionState::Connecting { .. }) {
            vec![ConnectionAction::SendClientConnect]
        } else {
            Vec::new()
        }
    }

    fn on_handshake_ok(&mut self, broker_cid: Cid, broker_uid: Uid) -> Vec<ConnectionAction> {
        if !matches!(self.state, ConnectionState::Connecting { .. }) {
            return Vec::new();
        }
        self.backoff.reset();
        self.state = ConnectionState::Connected { broker_cid, broker_uid };
        vec![ConnectionAction::Connected { broker_cid, broker_uid }]
    }

    /// A failed TCP connect or a rejected handshake both advance to the
    /// next discovered address, or back to `Discovery` with back-off
    /// once every address has been tried (spec.md §4.4: "on failure,
    /// advance to the next, then next discovered broker").
    fn on_connect_failed(&mut self, status: Option<RdmnetStatus>) -> Vec<ConnectionAction> {
        if !matches!(self.state, ConnectionState::Connecting { .. }) {
            return Vec::new();
        }
        self.addr_index += 1;
        if self.static_broker.is_none() && self.addr_index < self.discovered_addrs.len() {
            let addr = self.discovered_addrs[self.addr_index];
            self.state = ConnectionState::Connecting { addr };
            return vec![ConnectionAction::ConnectTo(addr)];
        }
        self.state = ConnectionState::Discovery;
        let delay = self.backoff.next_delay();
        vec![ConnectionAction::ConnectFailed(status), ConnectionAction::ScheduleRetry(delay)]
    }

    fn on_redirect(&mut self, addr: SocketAddr) -> Vec<ConnectionAction> {
        if !matches!(self.state, ConnectionState::Connected { .. }) {
            return Vec::new();
        }
        self.state = ConnectionState::Connecting { addr };
        self.heartbeat = None;
        vec![ConnectionAction::ConnectTo(addr)]
    }

    fn on_peer_disconnected(&mut self, _status: RdmnetStatus) -> Vec<ConnectionAction> {
        if !matches!(self.state, ConnectionState::Connected { .. }) {
            return Vec::new();
        }
        self.heartbeat = None;
        self.state = ConnectionState::Discovery;
        let delay = self.backoff.next_delay();
        vec![ConnectionAction::Disconnected, ConnectionAction::ScheduleRetry(delay)]
    }

    fn on_remove_scope(&mut self) -> Vec<ConnectionAction> {
        if matches!(self.state, ConnectionState::MarkedForDestruction) {
            return Vec::new();
        }
        self.state = ConnectionState::MarkedForDestruction;
        vec![ConnectionAction::StopMonitoringScope, ConnectionAction::Destroy]
    }

    fn on_tick(&mut self, now: Instant) -> Vec<ConnectionAction> {
        match self.state {
            ConnectionState::Connecting { .. } => {
                self.heartbeat.get_or_insert_with(|| HeartbeatTracker::start(now));
                Vec::new()
            }
            ConnectionState::Connected { .. } => {
                let tracker = self.heartbeat.get_or_insert_with(|| HeartbeatTracker::start(now));
                if tracker.is_expired(now) {
                    self.heartbeat = None;
                    self.state = ConnectionState::Discovery;
                    let delay = self.backoff.next_delay();
                    return vec![ConnectionAction::Disconnected, ConnectionAction::ScheduleRetry(delay)];
                }
                if tracker.should_send(now) {
                    tracker.record_sent(now);
                    return vec![ConnectionAction::SendHeartbeat];
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// Call whenever traffic (any PDU, not just a heartbeat) is received
    /// on a `Connected` connection, to keep the liveness clock alive.
    pub fn record_traffic(&mut self, now: Instant) {
        if let Some(tracker) = self.heartbeat.as_mut() {
            tracker.record_received(now);
        }
    }
}
