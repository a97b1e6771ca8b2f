// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! [`Controller`]: the RPT controller client role (spec.md §4.4, §4.7).
//!
//! A thin handle around an `Arc<parking_lot::Mutex<ControllerState>>` —
//! every method takes `&self` and locks internally, the same shape
//! [`crate::llrp::target::LlrpTarget`] uses around its engine, so a
//! `Controller` can be driven from a tick loop and issued commands from
//! another thread without the caller ever needing a `mut` binding.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::client::session::{Session, SessionEvent};
use crate::client::Listener;
use crate::config::{defaults, EXPERIMENTAL_MANUFACTURER_ID};
use crate::connection::{ConnectionAction, ConnectionInput, ConnectionState, ScopeConnection};
use crate::context::Context;
use crate::core::cid::Cid;
use crate::core::types::{Scope, ScopeSlot, StaticBrokerConfig};
use crate::core::uid::Uid;
use crate::discovery::dns_message::{encode_ptr_query, DomainName};
use crate::discovery::resolver::{DiscoveryEvent, Resolver};
use crate::error::{Error, Origin, RdmnetStatus, Result};
use crate::llrp::target::{LlrpTarget, LlrpTargetConfig};
use crate::protocol::acn::{encode_tcp, RootLayerPdu, RootVector};
use crate::protocol::broker::{
    BrokerPdu, BrokerVector, ClientConnectMsg, ClientEntryData, ConnectReplyMsg, DisconnectReason,
    DynamicUidAssignmentListMsg, RedirectMsg,
};
use crate::protocol::llrp::ComponentType;
use crate::protocol::rdm::CommandClass;
use crate::protocol::rpt::RptPdu;
use crate::transport::tcp::BrokerConnection;
use crate::transport::mdns::MdnsSocket;
use crate::config::RDMNET_SERVICE_TYPE;

use super::dynamic_uid::{find_assignment, DynamicUidTracker};

/// Construction parameters for a [`Controller`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub cid: Cid,
    /// `None` requests a dynamically-assigned UID from every scope's
    /// broker, seeded from [`EXPERIMENTAL_MANUFACTURER_ID`].
    pub uid: Option<Uid>,
    pub search_domain: String,
}

impl ControllerConfig {
    #[must_use]
    pub fn new(cid: Cid) -> Self {
        Self { cid, uid: None, search_domain: "local.".to_string() }
    }
}

/// Per-scope parameters passed to [`Controller::add_scope`].
#[derive(Debug, Clone)]
pub struct ScopeConfig {
    pub scope: Scope,
    /// `Some` bypasses discovery entirely and connects directly.
    pub static_broker: Option<SocketAddr>,
}

impl From<Scope> for ScopeConfig {
    fn from(scope: Scope) -> Self {
        Self { scope, static_broker: None }
    }
}

impl From<StaticBrokerConfig> for ScopeConfig {
    fn from(config: StaticBrokerConfig) -> Self {
        Self { scope: config.scope, static_broker: config.listen_addrs.into_iter().next() }
    }
}

struct ScopeEntry {
    scope: Scope,
    static_broker: Option<SocketAddr>,
    conn: ScopeConnection,
    session: Session,
    tcp: Option<BrokerConnection>,
    dynamic_uid: DynamicUidTracker,
    assigned_uid: Option<Uid>,
    preamble_sent: bool,
    retry_at: Option<Instant>,
}

struct ControllerState {
    cid: Cid,
    uid: Uid,
    search_domain: String,
    scopes: HashMap<ScopeSlot, ScopeEntry>,
    next_slot: ScopeSlot,
    resolver: Resolver,
    mdns: MdnsSocket,
    llrp: LlrpTarget,
    listener: Option<Arc<dyn Listener>>,
}

/// Maps a DISCONNECT reason onto the closest [`RdmnetStatus`], since the
/// connection state machine's `PeerDisconnected` input speaks in terms of
/// the latter (spec.md §4.4 treats them as the same closed-connection
/// event).
fn disconnect_reason_to_status(reason: DisconnectReason) -> RdmnetStatus {
    match reason {
        DisconnectReason::ShuttingDown => RdmnetStatus::ShuttingDown,
        DisconnectReason::Capacity => RdmnetStatus::CapacityExceeded,
        DisconnectReason::HardwareFault => RdmnetStatus::HardwareFault,
        DisconnectReason::SoftwareFault => RdmnetStatus::SoftwareFault,
        DisconnectReason::Incompatible => RdmnetStatus::Incompatible,
    }
}

/// Queue one root-layer PDU on a scope's broker connection, sending the
/// TCP preamble only on the connection's first frame (spec.md §4.1: the
/// preamble appears once, at connection start).
fn queue_frame(entry: &mut ScopeEntry, sender_cid: Cid, vector: RootVector, payload: Vec<u8>) {
    let Some(tcp) = entry.tcp.as_mut() else { return };
    let pdu = RootLayerPdu { vector, sender_cid, payload };
    let bytes = if entry.preamble_sent {
        pdu.encode()
    } else {
        entry.preamble_sent = true;
        encode_tcp(&pdu)
    };
    tcp.queue_send(&bytes);
    let _ = tcp.flush();
}

impl Controller {
    /// Interpret the actions a [`ScopeConnection`] transition produced,
    /// driving sockets, the discovery resolver, and the listener.
    fn apply_connection_actions(
        ctx: &Context,
        state: &mut ControllerState,
        slot: ScopeSlot,
        entry: &mut ScopeEntry,
        now: Instant,
        actions: Vec<ConnectionAction>,
    ) {
        for action in actions {
            match action {
                ConnectionAction::StartMonitoringScope => {
                    if state.resolver.monitor_scope(entry.scope.clone()) {
                        let subtype = DomainName::from_str_dotted(&format!(
                            "_{}._sub.{RDMNET_SERVICE_TYPE}.local",
                            entry.scope.as_str()
                        ));
                        let query = encode_ptr_query(&subtype);
                        let _ = state.mdns.send_query(&query);
                    }
                }
                ConnectionAction::StopMonitoringScope => {
                    state.resolver.unmonitor_scope(&entry.scope);
                }
                ConnectionAction::ConnectTo(addr) => match BrokerConnection::connect(addr) {
                    Ok(tcp) => {
                        entry.tcp = Some(tcp);
                        entry.preamble_sent = false;
                    }
                    Err(_) => {
                        let retry = entry.conn.handle(ConnectionInput::TcpConnectFailed);
                        Self::apply_connection_actions(ctx, state, slot, entry, now, retry);
                    }
                },
                ConnectionAction::SendClientConnect => {
                    let client_entry = ClientEntryData {
                        client_protocol_version: 1,
                        client_cid: state.cid,
                        client_uid: entry.assigned_uid.unwrap_or(state.uid),
                        component_type: ComponentType::RptController,
                        binding_cid: Cid::nil(),
                    };
                    let msg = ClientConnectMsg {
                        scope: entry.scope.as_str().to_string(),
                        e133_version: 1,
                        search_domain: state.search_domain.clone(),
                        client_entry,
                    };
                    let pdu = BrokerPdu { vector: BrokerVector::ClientConnect, payload: msg.encode() };
                    queue_frame(entry, state.cid, RootVector::Broker, pdu.encode());
                }
                ConnectionAction::SendHeartbeat => {
                    let pdu = BrokerPdu { vector: BrokerVector::Null, payload: Vec::new() };
                    queue_frame(entry, state.cid, RootVector::Broker, pdu.encode());
                }
                ConnectionAction::ScheduleRetry(delay) => {
                    entry.retry_at = Some(now + delay);
                }
                ConnectionAction::Connected { broker_cid, broker_uid } => {
                    state.llrp.set_connected_to_broker(true);
                    if let Some(listener) = state.listener.as_ref() {
                        listener.on_connected(slot, broker_cid, broker_uid);
                    }
                }
                ConnectionAction::ConnectFailed(status) => {
                    entry.tcp = None;
                    if let Some(listener) = state.listener.as_ref() {
                        listener.on_disconnected(slot, status, Origin::Remote);
                    }
                }
                ConnectionAction::Disconnected => {
                    entry.tcp = None;
                    entry.preamble_sent = false;
                    state.llrp.set_connected_to_broker(false);
                    if let Some(listener) = state.listener.as_ref() {
                        listener.on_disconnected(slot, None, Origin::Local);
                    }
                }
                ConnectionAction::Destroy => {
                    entry.tcp = None;
                }
            }
        }
    }

    fn poll_scope(ctx: &Context, state: &mut ControllerState, slot: ScopeSlot, now: Instant) {
        let cid = state.cid;
        let Some(entry) = state.scopes.get_mut(&slot) else { return };

        if let (Some(retry_at), Some(addr)) = (entry.retry_at, entry.static_broker) {
            if now >= retry_at && matches!(entry.conn.state(), ConnectionState::Discovery) {
                entry.retry_at = None;
                let actions = entry.conn.handle(ConnectionInput::BrokerFound(vec![addr]));
                Self::apply_connection_actions(ctx, state, slot, entry, now, actions);
            }
        }

        let entry = state.scopes.get_mut(&slot).expect("checked above");
        if let Some(tcp) = entry.tcp.as_mut() {
            match tcp.state() {
                crate::transport::tcp::ConnectionState::Connecting => match tcp.poll_connect() {
                    Ok(true) => {
                        let actions = entry.conn.handle(ConnectionInput::TcpConnected);
                        Self::apply_connection_actions(ctx, state, slot, entry, now, actions);
                    }
                    Ok(false) => {}
                    Err(_) => {
                        entry.tcp = None;
                        let actions = entry.conn.handle(ConnectionInput::TcpConnectFailed);
                        Self::apply_connection_actions(ctx, state, slot, entry, now, actions);
                    }
                },
                crate::transport::tcp::ConnectionState::Connected => {
                    let pdus = entry.tcp.as_mut().and_then(|t| t.recv_all().ok()).unwrap_or_default();
                    if !pdus.is_empty() {
                        entry.conn.record_traffic(now);
                    }
                    for bytes in pdus {
                        Self::handle_inbound_pdu(ctx, state, slot, cid, now, &bytes);
                    }
                }
                crate::transport::tcp::ConnectionState::Closed => {
                    entry.tcp = None;
                    let actions = entry.conn.handle(ConnectionInput::TcpConnectFailed);
                    Self::apply_connection_actions(ctx, state, slot, entry, now, actions);
                }
            }
        }

        let entry = state.scopes.get_mut(&slot).expect("checked above");
        entry.session.expire_stale_commands(now, std::time::Duration::from_millis(crate::config::CONNECT_REPLY_TIMEOUT_MS));
        let actions = entry.conn.handle(ConnectionInput::Tick(now));
        Self::apply_connection_actions(ctx, state, slot, entry, now, actions);
    }

    fn handle_inbound_pdu(ctx: &Context, state: &mut ControllerState, slot: ScopeSlot, cid: Cid, now: Instant, bytes: &[u8]) {
        let Ok(root) = RootLayerPdu::decode(bytes) else { return };
        match root.vector {
            RootVector::Broker => Self::handle_broker_pdu(ctx, state, slot, cid, now, &root.payload),
            RootVector::Rpt => Self::handle_rpt_pdu(state, slot, &root.payload),
            _ => {}
        }
    }

    fn handle_broker_pdu(ctx: &Context, state: &mut ControllerState, slot: ScopeSlot, cid: Cid, now: Instant, bytes: &[u8]) {
        let Ok(pdu) = BrokerPdu::decode(bytes) else { return };
        let actions = match pdu.vector {
            BrokerVector::ConnectReply => {
                let Ok(reply) = ConnectReplyMsg::decode(&pdu.payload) else { return };
                let Some(entry) = state.scopes.get_mut(&slot) else { return };
                match reply.status {
                    Ok(()) => entry.conn.handle(ConnectionInput::HandshakeOk {
                        broker_cid: reply.broker_cid,
                        broker_uid: reply.broker_uid,
                    }),
                    Err(status) => entry.conn.handle(ConnectionInput::HandshakeRejected(status)),
                }
            }
            BrokerVector::RedirectV4 => {
                let Ok(redirect) = RedirectMsg::decode_v4(&pdu.payload) else { return };
                let Some(entry) = state.scopes.get_mut(&slot) else { return };
                entry.conn.handle(ConnectionInput::Redirect(redirect.addr))
            }
            BrokerVector::RedirectV6 => {
                let Ok(redirect) = RedirectMsg::decode_v6(&pdu.payload) else { return };
                let Some(entry) = state.scopes.get_mut(&slot) else { return };
                entry.conn.handle(ConnectionInput::Redirect(redirect.addr))
            }
            BrokerVector::Disconnect => {
                let Ok(reason) = DisconnectReason::decode(&pdu.payload) else { return };
                let Some(entry) = state.scopes.get_mut(&slot) else { return };
                entry.conn.handle(ConnectionInput::PeerDisconnected(disconnect_reason_to_status(reason)))
            }
            BrokerVector::AssignedDynamicUids => {
                let Ok(list) = DynamicUidAssignmentListMsg::decode(&pdu.payload) else { return };
                let Some(entry) = state.scopes.get_mut(&slot) else { return };
                if let Some(mappings) = entry.dynamic_uid.ingest(list.mappings, list.more_coming) {
                    if let Some(uid) = find_assignment(&mappings, cid) {
                        entry.assigned_uid = Some(uid);
                        if let Some(listener) = state.listener.as_ref() {
                            listener.on_dynamic_uid_assigned(slot, uid);
                        }
                    }
                }
                Vec::new()
            }
            _ => Vec::new(),
        };
        if !actions.is_empty() {
            let Some(entry) = state.scopes.get_mut(&slot) else { return };
            Self::apply_connection_actions(ctx, state, slot, entry, now, actions);
        }
    }

    fn handle_rpt_pdu(state: &mut ControllerState, slot: ScopeSlot, bytes: &[u8]) {
        let Ok(pdu) = RptPdu::decode(bytes) else { return };
        let Some(entry) = state.scopes.get_mut(&slot) else { return };
        let Ok(events) = entry.session.on_rpt_pdu(&pdu) else { return };
        let Some(listener) = state.listener.as_ref() else { return };
        for event in events {
            match event {
                SessionEvent::RdmResponse { source_uid, sequence, message } => {
                    listener.on_rdm_response(slot, source_uid, sequence, message);
                }
                SessionEvent::Unsolicited { sequence, message } => listener.on_rdm_command(slot, sequence, message),
                SessionEvent::RptStatus(status) => listener.on_rpt_status(slot, status),
            }
        }
    }

    fn poll_discovery(ctx: &Context, state: &mut ControllerState, now: Instant) {
        let mut buf = vec![0u8; crate::config::MAX_PDU_SIZE];
        let Ok(Some((n, _addr))) = state.mdns.try_recv_from(&mut buf) else { return };
        let events = state.resolver.on_packet(&buf[..n], now);
        Self::dispatch_discovery_events(ctx, state, now, events);
    }

    fn dispatch_discovery_events(ctx: &Context, state: &mut ControllerState, now: Instant, events: Vec<DiscoveryEvent>) {
        for event in events {
            if let DiscoveryEvent::BrokerResolved(scope, name) = &event {
                let Some(broker) = state.resolver.broker_by_instance(name).cloned() else { continue };
                if let Some(listener) = state.listener.as_ref() {
                    listener.on_broker_discovered(&broker);
                }
                let slot = state
                    .scopes
                    .iter()
                    .find(|(_, e)| &e.scope == scope && matches!(e.conn.state(), ConnectionState::Discovery))
                    .map(|(slot, _)| *slot);
                if let Some(slot) = slot {
                    let Some(entry) = state.scopes.get_mut(&slot) else { continue };
                    let addrs = broker.listen_addrs.clone();
                    let actions = entry.conn.handle(ConnectionInput::BrokerFound(addrs));
                    Self::apply_connection_actions(ctx, state, slot, entry, now, actions);
                }
            }
        }
    }
}

/// RPT controller: discovers/connects to brokers across one or more
/// scopes and exchanges RDM commands/responses with devices (spec.md
/// §4.4, §4.7).
pub struct Controller {
    ctx: Context,
    state: Arc<Mutex<ControllerState>>,
}

impl Controller {
    /// Create a controller: binds a co-hosted LLRP target and an mDNS
    /// socket, but joins no scopes until [`Self::add_scope`] is called.
    pub fn create(ctx: &Context, config: ControllerConfig) -> Result<Self> {
        let uid = config.uid.unwrap_or_else(|| Uid::dynamic_request(EXPERIMENTAL_MANUFACTURER_ID));
        let hardware_address = ctx.netints().lowest_mac().map(|(_, mac)| mac.0).unwrap_or([0; 6]);
        let llrp = LlrpTarget::create(
            LlrpTargetConfig { cid: config.cid, uid, hardware_address, component_type: ComponentType::RptController },
            ctx.netints(),
        )?;
        let mdns = MdnsSocket::bind(ctx.netints())?;
        let state = ControllerState {
            cid: config.cid,
            uid,
            search_domain: config.search_domain,
            scopes: HashMap::new(),
            next_slot: ScopeSlot::FIRST,
            resolver: Resolver::new(),
            mdns,
            llrp,
            listener: None,
        };
        Ok(Self { ctx: ctx.clone(), state: Arc::new(Mutex::new(state)) })
    }

    #[must_use]
    pub fn cid(&self) -> Cid {
        self.state.lock().cid
    }

    #[must_use]
    pub fn uid(&self) -> Uid {
        self.state.lock().uid
    }

    pub fn set_listener(&self, listener: Arc<dyn Listener>) {
        self.state.lock().listener = Some(listener);
    }

    /// Register a scope and start either its static connect or its
    /// discovery browse.
    ///
    /// # Errors
    /// Returns [`Error::NoMemory`] once `max_scopes_per_client` scopes
    /// are already registered.
    pub fn add_scope(&self, config: impl Into<ScopeConfig>) -> Result<ScopeSlot> {
        let config = config.into();
        let cap = self.ctx.config().cap("max_scopes_per_client", defaults::MAX_SCOPES_PER_CLIENT as u64) as usize;
        let pending = self.ctx.config().cap("max_pending_commands_per_scope", defaults::MAX_PENDING_COMMANDS_PER_SCOPE as u64) as usize;

        let mut state = self.state.lock();
        if state.scopes.len() >= cap {
            return Err(Error::NoMemory);
        }

        let slot = state.next_slot;
        state.next_slot = slot.next();

        let mut conn = ScopeConnection::new(config.scope.clone(), config.static_broker);
        let actions = conn.handle(ConnectionInput::AddScope);

        let mut entry = ScopeEntry {
            scope: config.scope,
            static_broker: config.static_broker,
            conn,
            session: Session::new(pending),
            tcp: None,
            dynamic_uid: DynamicUidTracker::new(),
            assigned_uid: None,
            preamble_sent: false,
            retry_at: None,
        };
        let now = Instant::now();
        Self::apply_connection_actions(&self.ctx, &mut state, slot, &mut entry, now, actions);
        state.scopes.insert(slot, entry);
        Ok(slot)
    }

    /// Disconnect (if connected) and remove a scope.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if `slot` does not name a registered
    /// scope.
    pub fn remove_scope(&self, slot: ScopeSlot, reason: DisconnectReason) -> Result<()> {
        let mut state = self.state.lock();
        let cid = state.cid;
        let now = Instant::now();
        {
            let entry = state.scopes.get_mut(&slot).ok_or(Error::NotFound)?;
            if matches!(entry.conn.state(), ConnectionState::Connected { .. }) {
                let pdu = BrokerPdu { vector: BrokerVector::Disconnect, payload: reason.encode().to_vec() };
                queue_frame(entry, cid, RootVector::Broker, pdu.encode());
            }
            let actions = entry.conn.handle(ConnectionInput::RemoveScope);
            Self::apply_connection_actions(&self.ctx, &mut state, slot, entry, now, actions);
        }
        state.scopes.remove(&slot);
        Ok(())
    }

    /// Send an RDM command on a connected scope, returning the sequence
    /// number to correlate the eventual response delivered through
    /// [`Listener::on_rdm_response`].
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] for an unknown scope,
    /// [`Error::WouldBlock`] if the scope is not currently connected, or
    /// [`Error::NoMemory`] once `max_pending_commands_per_scope` requests
    /// are outstanding.
    pub fn send_rdm_command(
        &self,
        slot: ScopeSlot,
        dest_uid: Uid,
        command_class: CommandClass,
        pid: u16,
        parameter_data: Vec<u8>,
    ) -> Result<u32> {
        let mut state = self.state.lock();
        let cid = state.cid;
        let uid = state.uid;
        let now = Instant::now();
        let entry = state.scopes.get_mut(&slot).ok_or(Error::NotFound)?;
        if !matches!(entry.conn.state(), ConnectionState::Connected { .. }) {
            return Err(Error::WouldBlock);
        }
        let source_uid = entry.assigned_uid.unwrap_or(uid);
        let (sequence, pdu) = entry.session.send_command(source_uid, dest_uid, command_class, pid, parameter_data, now)?;
        queue_frame(entry, cid, RootVector::Rpt, pdu.encode());
        Ok(sequence)
    }

    /// Drive every scope's connection state machine and the co-hosted
    /// LLRP target's reply scheduler forward to `now`. Call at a steady
    /// interval from the caller's own loop.
    pub fn tick(&self, now: Instant) -> Result<()> {
        let mut state = self.state.lock();
        state.llrp.tick(now)?;
        let slots: Vec<ScopeSlot> = state.scopes.keys().copied().collect();
        for slot in slots {
            Self::poll_scope(&self.ctx, &mut state, slot, now);
        }
        let expired = state.resolver.expire(now);
        Self::dispatch_discovery_events(&self.ctx, &mut state, now, expired);
        Ok(())
    }

    /// Drain pending socket readiness: the LLRP multicast socket, the
    /// mDNS socket, and every scope's broker TCP connection.
    pub fn poll_sockets(&self, now: Instant) -> Result<()> {
        let mut state = self.state.lock();
        state.llrp.poll_socket(now)?;
        Self::poll_discovery(&self.ctx, &mut state, now);
        Ok(())
    }

    /// Disconnect every scope with [`DisconnectReason::ShuttingDown`]
    /// and release this controller's resources.
    pub fn destroy(self) {
        let slots: Vec<ScopeSlot> = self.state.lock().scopes.keys().copied().collect();
        for slot in slots {
            let _ = self.remove_scope(slot, DisconnectReason::ShuttingDown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn test_cid() -> Cid {
        Cid::from_bytes([
            0x48, 0xea, 0xee, 0x88, 0x2d, 0x5e, 0x43, 0xd4, 0xb0, 0xe9, 0x7a, 0x9d, 0x59, 0x77, 0xae, 0x9d,
        ])
    }

    #[test]
    fn create_assigns_default_dynamic_uid_when_unset() {
        let ctx = Context::new(None).expect("context");
        let controller = Controller::create(&ctx, ControllerConfig::new(test_cid())).expect("controller");
        assert_eq!(controller.cid(), test_cid());
        assert_eq!(controller.uid().manufacturer, EXPERIMENTAL_MANUFACTURER_ID | 0x8000);
    }

    #[test]
    fn add_scope_with_static_broker_starts_connecting() {
        let ctx = Context::new(None).expect("context");
        let controller = Controller::create(&ctx, ControllerConfig::new(test_cid())).expect("controller");

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let slot = controller
            .add_scope(StaticBrokerConfig { scope: Scope::default_scope(), listen_addrs: vec![addr] })
            .expect("add_scope");
        assert_eq!(slot, ScopeSlot::FIRST);

        let state = controller.state.lock();
        let entry = state.scopes.get(&slot).expect("entry");
        assert!(matches!(entry.conn.state(), ConnectionState::Connecting { .. }));
    }

    #[test]
    fn add_scope_respects_max_scopes_cap() {
        let ctx = Context::new(None).expect("context");
        ctx.config().set_cap("max_scopes_per_client", 1);
        let controller = Controller::create(&ctx, ControllerConfig::new(test_cid())).expect("controller");

        controller.add_scope(Scope::new("one").unwrap()).expect("first scope");
        let err = controller.add_scope(Scope::new("two").unwrap());
        assert!(matches!(err, Err(Error::NoMemory)));
    }

    #[test]
    fn send_rdm_command_requires_connected_scope() {
        let ctx = Context::new(None).expect("context");
        let controller = Controller::create(&ctx, ControllerConfig::new(test_cid())).expect("controller");
        let slot = controller.add_scope(Scope::default_scope()).expect("add_scope");

        let err = controller.send_rdm_command(slot, Uid::new(0x6574, 1), CommandClass::GetCommand, 0x0060, vec![]);
        assert!(matches!(err, Err(Error::WouldBlock)));
    }
}
