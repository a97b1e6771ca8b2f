// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! [`Device`]: the RPT device client role (spec.md §4.4, §4.7, §6).
//!
//! Shaped like [`super::controller::Controller`] but joins exactly one
//! scope, set at construction — a device does not gain scopes at
//! runtime the way a controller's `add_scope` does. It additionally owns
//! the endpoint/responder containment tree ([`crate::core::node`]) a
//! controller has no use for.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::client::session::{Session, SessionEvent};
use crate::client::Listener;
use crate::config::{defaults, EXPERIMENTAL_MANUFACTURER_ID, RDMNET_SERVICE_TYPE};
use crate::connection::{ConnectionAction, ConnectionInput, ConnectionState, ScopeConnection};
use crate::context::Context;
use crate::core::cid::Cid;
use crate::core::node::{EndpointType, NetworkNode, NodeArena, NodeId};
use crate::core::types::{Scope, ScopeSlot};
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
use crate::protocol::rdm::{CommandClass, RdmMessage, ResponseType};
use crate::protocol::rpt::{RptHeader, RptPdu, RptVector};
use crate::transport::mdns::MdnsSocket;
use crate::transport::tcp::BrokerConnection;

use super::controller::ScopeConfig;
use super::dynamic_uid::{find_assignment, DynamicUidTracker};

/// Construction parameters for a [`Device`]. Unlike [`ControllerConfig`]
/// (`crate::client::controller::ControllerConfig`), the scope is fixed
/// at creation rather than added afterward (spec.md §6: `device::create(config)`).
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub cid: Cid,
    /// `None` requests a dynamically-assigned UID, seeded from
    /// [`EXPERIMENTAL_MANUFACTURER_ID`].
    pub uid: Option<Uid>,
    pub scope: ScopeConfig,
    pub search_domain: String,
}

impl DeviceConfig {
    #[must_use]
    pub fn new(cid: Cid, scope: impl Into<ScopeConfig>) -> Self {
        Self { cid, uid: None, scope: scope.into(), search_domain: "local.".to_string() }
    }
}

struct DeviceState {
    cid: Cid,
    uid: Uid,
    search_domain: String,
    scope: Scope,
    static_broker: Option<std::net::SocketAddr>,
    conn: ScopeConnection,
    session: Session,
    tcp: Option<BrokerConnection>,
    dynamic_uid: DynamicUidTracker,
    assigned_uid: Option<Uid>,
    preamble_sent: bool,
    retry_at: Option<Instant>,
    resolver: Resolver,
    mdns: MdnsSocket,
    llrp: LlrpTarget,
    listener: Option<Arc<dyn Listener>>,
    arena: NodeArena,
    root: NodeId,
    /// Endpoint id → arena node. The NULL endpoint (id 0) is seeded at
    /// creation and can never be removed (spec.md §3: "always present").
    endpoints: HashMap<u16, NodeId>,
}

fn disconnect_reason_to_status(reason: DisconnectReason) -> RdmnetStatus {
    match reason {
        DisconnectReason::ShuttingDown => RdmnetStatus::ShuttingDown,
        DisconnectReason::Capacity => RdmnetStatus::CapacityExceeded,
        DisconnectReason::HardwareFault => RdmnetStatus::HardwareFault,
        DisconnectReason::SoftwareFault => RdmnetStatus::SoftwareFault,
        DisconnectReason::Incompatible => RdmnetStatus::Incompatible,
    }
}

fn response_class_for(request_class: CommandClass) -> CommandClass {
    match request_class {
        CommandClass::GetCommand | CommandClass::GetCommandResponse => CommandClass::GetCommandResponse,
        CommandClass::SetCommand | CommandClass::SetCommandResponse => CommandClass::SetCommandResponse,
    }
}

/// Queue one root-layer PDU on the broker connection, sending the TCP
/// preamble only on the connection's first frame.
fn queue_frame(state: &mut DeviceState, vector: RootVector, payload: Vec<u8>) {
    let Some(tcp) = state.tcp.as_mut() else { return };
    let pdu = RootLayerPdu { vector, sender_cid: state.cid, payload };
    let bytes = if state.preamble_sent {
        pdu.encode()
    } else {
        state.preamble_sent = true;
        encode_tcp(&pdu)
    };
    tcp.queue_send(&bytes);
    let _ = tcp.flush();
}

impl Device {
    fn apply_connection_actions(state: &mut DeviceState, now: Instant, actions: Vec<ConnectionAction>) {
        for action in actions {
            match action {
                ConnectionAction::StartMonitoringScope => {
                    if state.resolver.monitor_scope(state.scope.clone()) {
                        let subtype = DomainName::from_str_dotted(&format!(
                            "_{}._sub.{RDMNET_SERVICE_TYPE}.local",
                            state.scope.as_str()
                        ));
                        let query = encode_ptr_query(&subtype);
                        let _ = state.mdns.send_query(&query);
                    }
                }
                ConnectionAction::StopMonitoringScope => {
                    state.resolver.unmonitor_scope(&state.scope.clone());
                }
                ConnectionAction::ConnectTo(addr) => match BrokerConnection::connect(addr) {
                    Ok(tcp) => {
                        state.tcp = Some(tcp);
                        state.preamble_sent = false;
                    }
                    Err(_) => {
                        let retry = state.conn.handle(ConnectionInput::TcpConnectFailed);
                        Self::apply_connection_actions(state, now, retry);
                    }
                },
                ConnectionAction::SendClientConnect => {
                    let client_entry = ClientEntryData {
                        client_protocol_version: 1,
                        client_cid: state.cid,
                        client_uid: state.assigned_uid.unwrap_or(state.uid),
                        component_type: ComponentType::RptDevice,
                        binding_cid: Cid::nil(),
                    };
                    let msg = ClientConnectMsg {
                        scope: state.scope.as_str().to_string(),
                        e133_version: 1,
                        search_domain: state.search_domain.clone(),
                        client_entry,
                    };
                    let pdu = BrokerPdu { vector: BrokerVector::ClientConnect, payload: msg.encode() };
                    queue_frame(state, RootVector::Broker, pdu.encode());
                }
                ConnectionAction::SendHeartbeat => {
                    let pdu = BrokerPdu { vector: BrokerVector::Null, payload: Vec::new() };
                    queue_frame(state, RootVector::Broker, pdu.encode());
                }
                ConnectionAction::ScheduleRetry(delay) => {
                    state.retry_at = Some(now + delay);
                }
                ConnectionAction::Connected { broker_cid, broker_uid } => {
                    state.llrp.set_connected_to_broker(true);
                    if let Some(listener) = state.listener.as_ref() {
                        listener.on_connected(ScopeSlot::FIRST, broker_cid, broker_uid);
                    }
                }
                ConnectionAction::ConnectFailed(status) => {
                    state.tcp = None;
                    if let Some(listener) = state.listener.as_ref() {
                        listener.on_disconnected(ScopeSlot::FIRST, status, Origin::Remote);
                    }
                }
                ConnectionAction::Disconnected => {
                    state.tcp = None;
                    state.preamble_sent = false;
                    state.llrp.set_connected_to_broker(false);
                    if let Some(listener) = state.listener.as_ref() {
                        listener.on_disconnected(ScopeSlot::FIRST, None, Origin::Local);
                    }
                }
                ConnectionAction::Destroy => {
                    state.tcp = None;
                }
            }
        }
    }

    fn poll_connection(state: &mut DeviceState, now: Instant) {
        if let (Some(retry_at), Some(addr)) = (state.retry_at, state.static_broker) {
            if now >= retry_at && matches!(state.conn.state(), ConnectionState::Discovery) {
                state.retry_at = None;
                let actions = state.conn.handle(ConnectionInput::BrokerFound(vec![addr]));
                Self::apply_connection_actions(state, now, actions);
            }
        }

        if let Some(tcp) = state.tcp.as_mut() {
            match tcp.state() {
                crate::transport::tcp::ConnectionState::Connecting => match tcp.poll_connect() {
                    Ok(true) => {
                        let actions = state.conn.handle(ConnectionInput::TcpConnected);
                        Self::apply_connection_actions(state, now, actions);
                    }
                    Ok(false) => {}
                    Err(_) => {
                        state.tcp = None;
                        let actions = state.conn.handle(ConnectionInput::TcpConnectFailed);
                        Self::apply_connection_actions(state, now, actions);
                    }
                },
                crate::transport::tcp::ConnectionState::Connected => {
                    let pdus = state.tcp.as_mut().and_then(|t| t.recv_all().ok()).unwrap_or_default();
                    if !pdus.is_empty() {
                        state.conn.record_traffic(now);
                    }
                    for bytes in pdus {
                        Self::handle_inbound_pdu(state, now, &bytes);
                    }
                }
                crate::transport::tcp::ConnectionState::Closed => {
                    state.tcp = None;
                    let actions = state.conn.handle(ConnectionInput::TcpConnectFailed);
                    Self::apply_connection_actions(state, now, actions);
                }
            }
        }

        state.session.expire_stale_commands(now, std::time::Duration::from_millis(crate::config::CONNECT_REPLY_TIMEOUT_MS));
        let actions = state.conn.handle(ConnectionInput::Tick(now));
        Self::apply_connection_actions(state, now, actions);
    }

    fn handle_inbound_pdu(state: &mut DeviceState, now: Instant, bytes: &[u8]) {
        let Ok(root) = RootLayerPdu::decode(bytes) else { return };
        match root.vector {
            RootVector::Broker => Self::handle_broker_pdu(state, now, &root.payload),
            RootVector::Rpt => Self::handle_rpt_pdu(state, &root.payload),
            _ => {}
        }
    }

    fn handle_broker_pdu(state: &mut DeviceState, now: Instant, bytes: &[u8]) {
        let Ok(pdu) = BrokerPdu::decode(bytes) else { return };
        let cid = state.cid;
        let actions = match pdu.vector {
            BrokerVector::ConnectReply => {
                let Ok(reply) = ConnectReplyMsg::decode(&pdu.payload) else { return };
                match reply.status {
                    Ok(()) => state.conn.handle(ConnectionInput::HandshakeOk {
                        broker_cid: reply.broker_cid,
                        broker_uid: reply.broker_uid,
                    }),
                    Err(status) => state.conn.handle(ConnectionInput::HandshakeRejected(status)),
                }
            }
            BrokerVector::RedirectV4 => {
                let Ok(redirect) = RedirectMsg::decode_v4(&pdu.payload) else { return };
                state.conn.handle(ConnectionInput::Redirect(redirect.addr))
            }
            BrokerVector::RedirectV6 => {
                let Ok(redirect) = RedirectMsg::decode_v6(&pdu.payload) else { return };
                state.conn.handle(ConnectionInput::Redirect(redirect.addr))
            }
            BrokerVector::Disconnect => {
                let Ok(reason) = DisconnectReason::decode(&pdu.payload) else { return };
                state.conn.handle(ConnectionInput::PeerDisconnected(disconnect_reason_to_status(reason)))
            }
            BrokerVector::AssignedDynamicUids => {
                let Ok(list) = DynamicUidAssignmentListMsg::decode(&pdu.payload) else { return };
                if let Some(mappings) = state.dynamic_uid.ingest(list.mappings, list.more_coming) {
                    if let Some(uid) = find_assignment(&mappings, cid) {
                        state.assigned_uid = Some(uid);
                        if let Some(listener) = state.listener.as_ref() {
                            listener.on_dynamic_uid_assigned(ScopeSlot::FIRST, uid);
                        }
                    }
                }
                Vec::new()
            }
            _ => Vec::new(),
        };
        if !actions.is_empty() {
            Self::apply_connection_actions(state, now, actions);
        }
    }

    fn handle_rpt_pdu(state: &mut DeviceState, bytes: &[u8]) {
        let Ok(pdu) = RptPdu::decode(bytes) else { return };
        let Ok(events) = state.session.on_rpt_pdu(&pdu) else { return };
        let Some(listener) = state.listener.as_ref() else { return };
        for event in events {
            match event {
                SessionEvent::RdmResponse { .. } => {
                    // A device never sends commands, so it never has a
                    // pending entry to correlate against; unreachable in
                    // practice but harmless if a peer misbehaves.
                }
                SessionEvent::Unsolicited { sequence, message } => {
                    listener.on_rdm_command(ScopeSlot::FIRST, sequence, message);
                }
                SessionEvent::RptStatus(status) => listener.on_rpt_status(ScopeSlot::FIRST, status),
            }
        }
    }

    fn poll_discovery(state: &mut DeviceState, now: Instant) {
        let mut buf = vec![0u8; crate::config::MAX_PDU_SIZE];
        let Ok(Some((n, _addr))) = state.mdns.try_recv_from(&mut buf) else { return };
        let events = state.resolver.on_packet(&buf[..n], now);
        Self::dispatch_discovery_events(state, now, events);
    }

    fn dispatch_discovery_events(state: &mut DeviceState, now: Instant, events: Vec<DiscoveryEvent>) {
        for event in events {
            if let DiscoveryEvent::BrokerResolved(scope, name) = &event {
                let Some(broker) = state.resolver.broker_by_instance(name).cloned() else { continue };
                if let Some(listener) = state.listener.as_ref() {
                    listener.on_broker_discovered(&broker);
                }
                if scope == &state.scope && matches!(state.conn.state(), ConnectionState::Discovery) {
                    let addrs = broker.listen_addrs.clone();
                    let actions = state.conn.handle(ConnectionInput::BrokerFound(addrs));
                    Self::apply_connection_actions(state, now, actions);
                }
            }
        }
    }
}

/// RPT device: joins one scope and answers RDM commands addressed to its
/// endpoints/responders (spec.md §4.4, §4.7, §6).
pub struct Device {
    ctx: Context,
    state: Arc<Mutex<DeviceState>>,
}

impl Device {
    /// Create a device: binds a co-hosted LLRP target and an mDNS
    /// socket, and immediately starts connecting (or discovering) the
    /// configured scope.
    pub fn create(ctx: &Context, config: DeviceConfig) -> Result<Self> {
        let uid = config.uid.unwrap_or_else(|| Uid::dynamic_request(EXPERIMENTAL_MANUFACTURER_ID));
        let hardware_address = ctx.netints().lowest_mac().map(|(_, mac)| mac.0).unwrap_or([0; 6]);
        let llrp = LlrpTarget::create(
            LlrpTargetConfig { cid: config.cid, uid, hardware_address, component_type: ComponentType::RptDevice },
            ctx.netints(),
        )?;
        let mdns = MdnsSocket::bind(ctx.netints())?;

        let mut arena = NodeArena::new();
        let root = arena.insert_root(NetworkNode::Client { cid: config.cid, uid });
        let null_endpoint = arena.insert_child(root, NetworkNode::Endpoint { id: 0, endpoint_type: EndpointType::Null });
        let mut endpoints = HashMap::new();
        endpoints.insert(0, null_endpoint);

        let pending = ctx.config().cap("max_pending_commands_per_scope", defaults::MAX_PENDING_COMMANDS_PER_SCOPE as u64) as usize;
        let mut conn = ScopeConnection::new(config.scope.scope.clone(), config.scope.static_broker);
        let actions = conn.handle(ConnectionInput::AddScope);

        let mut state = DeviceState {
            cid: config.cid,
            uid,
            search_domain: config.search_domain,
            scope: config.scope.scope,
            static_broker: config.scope.static_broker,
            conn,
            session: Session::new(pending),
            tcp: None,
            dynamic_uid: DynamicUidTracker::new(),
            assigned_uid: None,
            preamble_sent: false,
            retry_at: None,
            resolver: Resolver::new(),
            mdns,
            llrp,
            listener: None,
            arena,
            root,
            endpoints,
        };
        let now = Instant::now();
        Self::apply_connection_actions(&mut state, now, actions);

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

    /// Add a virtual endpoint (spec.md §3: an endpoint with no physical
    /// port backing it, e.g. a soft-patched DMX universe).
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if `id` is already in use.
    pub fn add_virtual_endpoint(&self, id: u16) -> Result<NodeId> {
        self.add_endpoint(id, EndpointType::Virtual)
    }

    /// Add a physical endpoint (a hardware DMX/RDM port).
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if `id` is already in use.
    pub fn add_physical_endpoint(&self, id: u16) -> Result<NodeId> {
        self.add_endpoint(id, EndpointType::Physical)
    }

    fn add_endpoint(&self, id: u16, endpoint_type: EndpointType) -> Result<NodeId> {
        if id == 0 {
            return Err(Error::InvalidArgument("endpoint id 0 is reserved for the NULL endpoint"));
        }
        let mut state = self.state.lock();
        if state.endpoints.contains_key(&id) {
            return Err(Error::InvalidArgument("endpoint id already in use"));
        }
        let root = state.root;
        let node = state.arena.insert_child(root, NetworkNode::Endpoint { id, endpoint_type });
        state.endpoints.insert(id, node);
        Ok(node)
    }

    /// Remove an endpoint and every responder bound to it.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] for an unknown id, or
    /// [`Error::InvalidArgument`] for the NULL endpoint (id 0), which is
    /// always present.
    pub fn remove_endpoint(&self, id: u16) -> Result<()> {
        if id == 0 {
            return Err(Error::InvalidArgument("the NULL endpoint cannot be removed"));
        }
        let mut state = self.state.lock();
        let node = state.endpoints.remove(&id).ok_or(Error::NotFound)?;
        state.arena.remove(node);
        Ok(())
    }

    /// Register a responder under `endpoint_id` (spec.md §3: UID +
    /// optional binding UID + control field).
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] for an unknown endpoint, or
    /// [`Error::NoMemory`] once `max_responders_per_endpoint` responders
    /// are already registered on it.
    pub fn add_responder(&self, endpoint_id: u16, uid: Uid, binding_uid: Option<Uid>, control: u16) -> Result<NodeId> {
        let cap = self.ctx.config().cap("max_responders_per_endpoint", defaults::MAX_RESPONDERS_PER_ENDPOINT as u64) as usize;
        let mut state = self.state.lock();
        let endpoint = *state.endpoints.get(&endpoint_id).ok_or(Error::NotFound)?;
        if state.arena.children(endpoint).len() >= cap {
            return Err(Error::NoMemory);
        }
        Ok(state.arena.insert_child(endpoint, NetworkNode::Responder { uid, binding_uid, control }))
    }

    /// Send an RDM response to `request`, echoing `sequence` back as the
    /// RPT header requires for correlation at the controller (spec.md
    /// §4.7).
    ///
    /// # Errors
    /// Returns [`Error::WouldBlock`] if the scope is not currently
    /// connected.
    pub fn send_rdm_response(
        &self,
        sequence: u32,
        request: &RdmMessage,
        response_type: ResponseType,
        parameter_data: Vec<u8>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if !matches!(state.conn.state(), ConnectionState::Connected { .. }) {
            return Err(Error::WouldBlock);
        }
        let source_uid = state.assigned_uid.unwrap_or(state.uid);
        let response = RdmMessage {
            dest_uid: request.src_uid,
            src_uid: source_uid,
            transaction_number: request.transaction_number,
            port_id_or_response_type: response_type.to_u8(),
            message_count: 0,
            sub_device: request.sub_device,
            command_class: response_class_for(request.command_class),
            pid: request.pid,
            parameter_data,
        };
        let pdu = RptPdu {
            header: RptHeader {
                source_uid,
                source_endpoint: 0,
                dest_uid: request.src_uid,
                dest_endpoint: 0,
                sequence,
            },
            vector: RptVector::Notification,
            payload: response.encode().map_err(|_| Error::InvalidArgument("parameter_data"))?,
        };
        queue_frame(&mut state, RootVector::Rpt, pdu.encode());
        Ok(())
    }

    /// Drive the connection state machine and the co-hosted LLRP
    /// target's reply scheduler forward to `now`. Call at a steady
    /// interval from the caller's own loop.
    pub fn tick(&self, now: Instant) -> Result<()> {
        let mut state = self.state.lock();
        state.llrp.tick(now)?;
        Self::poll_connection(&mut state, now);
        let expired = state.resolver.expire(now);
        Self::dispatch_discovery_events(&mut state, now, expired);
        Ok(())
    }

    /// Drain pending socket readiness: the LLRP multicast socket, the
    /// mDNS socket, and the broker TCP connection.
    pub fn poll_sockets(&self, now: Instant) -> Result<()> {
        let mut state = self.state.lock();
        state.llrp.poll_socket(now)?;
        Self::poll_discovery(&mut state, now);
        Ok(())
    }

    /// Disconnect with [`DisconnectReason::ShuttingDown`] and release
    /// this device's resources.
    pub fn destroy(self) {
        let mut state = self.state.lock();
        if matches!(state.conn.state(), ConnectionState::Connected { .. }) {
            let pdu = BrokerPdu { vector: BrokerVector::Disconnect, payload: DisconnectReason::ShuttingDown.encode().to_vec() };
            queue_frame(&mut state, RootVector::Broker, pdu.encode());
        }
        let now = Instant::now();
        let actions = state.conn.handle(ConnectionInput::RemoveScope);
        Self::apply_connection_actions(&mut state, now, actions);
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
        let device = Device::create(&ctx, DeviceConfig::new(test_cid(), Scope::default_scope())).expect("device");
        assert_eq!(device.cid(), test_cid());
        assert_eq!(device.uid().manufacturer, EXPERIMENTAL_MANUFACTURER_ID | 0x8000);
    }

    #[test]
    fn create_with_static_broker_starts_connecting() {
        let ctx = Context::new(None).expect("context");
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let config = DeviceConfig::new(
            test_cid(),
            crate::core::types::StaticBrokerConfig { scope: Scope::default_scope(), listen_addrs: vec![addr] },
        );
        let device = Device::create(&ctx, config).expect("device");
        let state = device.state.lock();
        assert!(matches!(state.conn.state(), ConnectionState::Connecting { .. }));
    }

    #[test]
    fn endpoint_zero_is_reserved() {
        let ctx = Context::new(None).expect("context");
        let device = Device::create(&ctx, DeviceConfig::new(test_cid(), Scope::default_scope())).expect("device");
        assert!(device.add_virtual_endpoint(0).is_err());
        assert!(device.remove_endpoint(0).is_err());
    }

    #[test]
    fn add_responder_under_new_endpoint() {
        let ctx = Context::new(None).expect("context");
        let device = Device::create(&ctx, DeviceConfig::new(test_cid(), Scope::default_scope())).expect("device");
        let endpoint = device.add_physical_endpoint(1).expect("endpoint");
        let responder = device.add_responder(1, Uid::new(0x6574, 1), None, 0).expect("responder");

        let state = device.state.lock();
        assert_eq!(state.arena.parent(responder), Some(endpoint));
    }

    #[test]
    fn add_responder_rejects_unknown_endpoint() {
        let ctx = Context::new(None).expect("context");
        let device = Device::create(&ctx, DeviceConfig::new(test_cid(), Scope::default_scope())).expect("device");
        let err = device.add_responder(99, Uid::new(0x6574, 1), None, 0);
        assert!(matches!(err, Err(Error::NotFound)));
    }

    #[test]
    fn send_rdm_response_requires_connected_scope() {
        let ctx = Context::new(None).expect("context");
        let device = Device::create(&ctx, DeviceConfig::new(test_cid(), Scope::default_scope())).expect("device");
        let request = RdmMessage {
            dest_uid: device.uid(),
            src_uid: Uid::new(0x6574, 12345678),
            transaction_number: 0,
            port_id_or_response_type: 1,
            message_count: 0,
            sub_device: 0,
            command_class: CommandClass::GetCommand,
            pid: 0x0060,
            parameter_data: vec![],
        };
        let err = device.send_rdm_response(0, &request, ResponseType::Ack, vec![1, 2, 3]);
        assert!(matches!(err, Err(Error::WouldBlock)));
    }
}
