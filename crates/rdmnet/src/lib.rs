// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # RDMnet — ANSI E1.33 protocol core
//!
//! A pure Rust implementation of the wire-level framing and discovery/
//! messaging engines behind RDMnet (ANSI E1.33), the network transport for
//! RDM (ANSI E1.20) control messages over IP.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rdmnet::{Context, Controller, ControllerConfig, Scope};
//!
//! fn main() -> rdmnet::Result<()> {
//!     let ctx = Context::new(None)?;
//!     let controller = Controller::create(&ctx, ControllerConfig::new(ctx.generate_cid()))?;
//!     let _scope = controller.add_scope(Scope::default_scope())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                       Client session layer                         |
//! |   Controller/Device handles, ACK_OVERFLOW reassembly, dynamic UID   |
//! +---------------------------------------------------------------------+
//! |        Connection state machine       |      LLRP engines          |
//! |  Discovery -> Connecting -> Connected  |  Manager bisection, Target |
//! +---------------------------------------------------------------------+
//! |   Discovery service (mDNS/DNS-SD)    |   Multicast / netint service |
//! +---------------------------------------------------------------------+
//! |                           Wire codec                                |
//! |   ACN root layer | LLRP PDU | Broker/RPT/EPT PDU | embedded RDM     |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Modules overview
//!
//! - [`core`] — CID/UID primitives, the process-wide handle table, the tick
//!   thread, and the node arena for the containment hierarchy.
//! - [`protocol`] — stateless wire codec for every PDU family in §4.1.
//! - [`transport`] — network-interface enumeration and UDP/TCP socket glue.
//! - [`discovery`] — DNS-SD/mDNS browse-and-resolve for `_rdmnet._tcp`.
//! - [`connection`] — the per-scope broker connection state machine.
//! - [`llrp`] — the LLRP Manager discovery engine and LLRP Target engine.
//! - [`client`] — the client session layer (Controller/Device handles).
//!
//! ## See Also
//!
//! - [ANSI E1.33 (RDMnet)](https://tsp.esta.org/tsp/documents/published_docs.php)
//! - [ANSI E1.20 (RDM)](https://tsp.esta.org/tsp/documents/published_docs.php)
//! - [ANSI E1.17 (ACN)](https://tsp.esta.org/tsp/documents/published_docs.php)

/// Client session layer: `Controller`/`Device` handles, scope lifecycle,
/// RDM command/response correlation, ACK_OVERFLOW reassembly.
pub mod client;
/// Global configuration: RTPS-equivalent constants and runtime resource caps.
pub mod config;
/// Per-scope broker connection state machine (discovery, handshake,
/// heartbeat, redirect, reconnect back-off).
pub mod connection;
/// Core primitives shared by every layer: CID/UID, the handle table, the
/// tick-loop scheduler, and the network-node arena.
pub mod core;
/// The `Context` aggregate: owns runtime configuration, every entity's
/// handle table, and the tick-thread scheduler.
pub mod context;
/// mDNS/DNS-SD discovery service for locating brokers.
pub mod discovery;
/// Crate-wide error taxonomy and `Result` alias.
pub mod error;
/// LLRP Manager discovery engine and LLRP Target engine.
pub mod llrp;
/// Compile-time configurable logging system (zero-cost when disabled).
pub mod logging;
/// Wire codec: ACN root layer, LLRP/Broker/RPT/EPT PDUs, embedded RDM.
pub mod protocol;
/// Network transport: interface enumeration, UDP multicast, TCP framing.
pub mod transport;

pub use client::{Controller, ControllerConfig, Device, DeviceConfig};
pub use context::Context;
pub use core::cid::Cid;
pub use core::types::{Scope, ScopeSlot, StaticBrokerConfig};
pub use core::uid::{Uid, UidClass};
pub use error::{Error, Result};
pub use llrp::manager::{LlrpManager, LlrpManagerConfig};
pub use llrp::target::{LlrpTarget, LlrpTargetConfig};

/// RDMnet core version string.
pub const VERSION: &str = "0.1.0";
