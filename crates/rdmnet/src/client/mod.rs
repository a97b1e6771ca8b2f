// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RPT client roles: [`Controller`] and [`Device`] (spec.md §4.4).
//!
//! Both are thin handles around a socket-free state machine, the same
//! split the LLRP module uses between `TargetEngine`/`DiscoveryEngine`
//! and their `LlrpTarget`/`LlrpManager` wrappers: a `Controller`/`Device`
//! owns an `Arc<parking_lot::Mutex<_>>` state and exposes `&self`
//! methods so a caller never needs `mut` to drive it from several
//! places (a UI thread issuing commands, a tick thread driving sockets).
//!
//! # Modules
//!
//! - `session` - RDM request/response correlation and ACK_OVERFLOW reassembly
//! - `dynamic_uid` - dynamic UID assignment tracking
//! - `controller` - [`Controller`], the RPT controller role
//! - `device` - [`Device`], the RPT device role

pub mod controller;
pub mod device;
pub mod dynamic_uid;
pub mod session;

pub use controller::{Controller, ControllerConfig, ScopeConfig};
pub use device::{Device, DeviceConfig};

use crate::core::cid::Cid;
use crate::core::types::{DiscoveredBroker, ScopeSlot};
use crate::core::uid::Uid;
use crate::error::{Origin, RdmnetStatus};
use crate::protocol::rdm::RdmMessage;
use crate::protocol::rpt::RptStatusPayload;

/// Asynchronous events a [`Controller`] or [`Device`] delivers to its
/// caller. Every method has a no-op default; implement only the events
/// you care about.
///
/// Errors returned directly from a `Controller`/`Device` method cover
/// synchronous misuse (bad argument, resource cap hit). Failures that
/// happen later — on the wire, after the call already returned — are
/// instead delivered here, per the note in [`crate::error::Error`].
pub trait Listener: Send + Sync {
    /// A scope finished its CONNECT/CONNECT_REPLY handshake.
    fn on_connected(&self, _scope: ScopeSlot, _broker_cid: Cid, _broker_uid: Uid) {}

    /// A scope's broker connection was lost or rejected.
    fn on_disconnected(&self, _scope: ScopeSlot, _status: Option<RdmnetStatus>, _origin: Origin) {}

    /// An RDM response correlated to a command this client sent.
    fn on_rdm_response(&self, _scope: ScopeSlot, _source_uid: Uid, _sequence: u32, _message: RdmMessage) {}

    /// An RDM command addressed to this client (Device role, or a
    /// Controller acting as an RDM proxy target). `sequence` must be
    /// echoed back in the reply via `Device::send_rdm_response`.
    fn on_rdm_command(&self, _scope: ScopeSlot, _sequence: u32, _message: RdmMessage) {}

    /// An RPT_STATUS PDU the broker or peer sent instead of a response.
    fn on_rpt_status(&self, _scope: ScopeSlot, _status: RptStatusPayload) {}

    /// The broker finished assigning a requested dynamic UID.
    fn on_dynamic_uid_assigned(&self, _scope: ScopeSlot, _uid: Uid) {}

    /// A new broker was resolved via mDNS for a monitored scope.
    fn on_broker_discovered(&self, _broker: &DiscoveredBroker) {}
}
