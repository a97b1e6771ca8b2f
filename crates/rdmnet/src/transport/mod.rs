// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Socket-level transport for RDMnet: LLRP multicast UDP and broker
//! TCP connections, plus network-interface enumeration (spec.md §4.2).
//!
//! # Modules
//!
//! - `netint` - interface enumeration and lowest-MAC selection
//! - `udp` - LLRP multicast socket
//! - `tcp` - broker TCP connection, non-blocking send/recv framing
//! - `mdns` - mDNS/DNS-SD multicast socket for broker discovery

pub mod mdns;
pub mod netint;
pub mod tcp;
pub mod udp;

pub use mdns::MdnsSocket;
pub use netint::{MacAddr, NetintId, NetintInfo, NetintService};
pub use tcp::{BrokerConnection, BrokerConnectionStats, ConnectionState};
pub use udp::LlrpSocket;
