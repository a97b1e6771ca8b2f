// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RDMnet global configuration — single source of truth.
//!
//! Centralizes every protocol constant (multicast groups, UDP port,
//! LLRP/heartbeat timing) and the caller-tunable resource caps from §5.
//! **Never hardcode these elsewhere.**
//!
//! - Level 1 (static): compile-time constants straight from the E1.33/
//!   E1.17 text.
//! - Level 2 (dynamic): [`RuntimeConfig`] for resource caps and back-off
//!   bounds a deployment may want to tune without a rebuild.

use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

// =======================================================================
// Transport (ANSI E1.33 §6, "EXTERNAL INTERFACES")
// =======================================================================

/// UDP source/destination port for LLRP traffic (ANSI E1.33).
pub const LLRP_PORT: u16 = 5569;

/// LLRP multicast group used by managers to send probe-requests, and by
/// targets to listen for them.
pub const LLRP_REQUEST_MULTICAST_V4: Ipv4Addr = Ipv4Addr::new(239, 255, 250, 133);

/// LLRP multicast group used by targets to send probe-replies, and by
/// managers to listen for them.
pub const LLRP_REPLY_MULTICAST_V4: Ipv4Addr = Ipv4Addr::new(239, 255, 250, 85);

/// DNS-SD service type RDMnet brokers advertise under.
pub const RDMNET_SERVICE_TYPE: &str = "_rdmnet._tcp";

/// Standard mDNS port and multicast group (RFC 6762) used to browse and
/// resolve [`RDMNET_SERVICE_TYPE`] advertisements.
pub const MDNS_PORT: u16 = 5353;
pub const MDNS_MULTICAST_V4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// Manufacturer ID range ANSI E1.20 reserves for prototyping/testing
/// (0x7ff0-0x7fff); used as the default dynamic-UID-request manufacturer
/// ID when a `Controller`/`Device` is created without an explicit UID.
pub const EXPERIMENTAL_MANUFACTURER_ID: u16 = 0x7ff0;

// =======================================================================
// LLRP timing (spec.md §4.5/§4.6)
// =======================================================================

/// Window a manager waits for probe-replies after sending a probe-request
/// before deciding whether to retransmit, bisect, or finish.
pub const LLRP_TIMEOUT_MS: u64 = 2_000;

/// Upper bound of a target's randomized probe-reply back-off window.
pub const LLRP_REPLY_BACKOFF_MAX_MS: u64 = 1_500;

/// Consecutive clean (no-reply) probe-requests required at a range before
/// the manager either bisects further or finishes discovery.
pub const LLRP_CLEAN_PROBE_THRESHOLD: u32 = 3;

/// Maximum number of Known-UIDs carried in a single probe-request PDU
/// before the manager must fragment across multiple PDUs.
///
/// Matches `LLRP_KNOWN_UID_SIZE` in the original implementation.
pub const LLRP_KNOWN_UID_SIZE: usize = 200;

// =======================================================================
// Connection timing (spec.md §4.4 / §5)
// =======================================================================

/// Heartbeat interval: both sides of a connected scope exchange a NULL
/// broker PDU at least this often.
pub const HEARTBEAT_INTERVAL_MS: u64 = 15_000;

/// A connection is considered lost if no heartbeat or other traffic is
/// observed for this long.
pub const HEARTBEAT_TIMEOUT_MS: u64 = 15_000;

/// Maximum time to wait for a CONNECT_REPLY after sending CONNECT.
pub const CONNECT_REPLY_TIMEOUT_MS: u64 = 5_000;

/// Base of the exponential connect-retry back-off.
pub const CONNECT_BACKOFF_BASE_MS: u64 = 1_000;

/// Cap of the exponential connect-retry back-off.
pub const CONNECT_BACKOFF_MAX_MS: u64 = 30_000;

// =======================================================================
// Wire limits (spec.md §4.1)
// =======================================================================

/// Maximum scope string payload length, excluding the NUL terminator.
pub const SCOPE_STRING_PADDED_LENGTH: usize = 64; // 63 bytes + NUL
/// Maximum search-domain payload length, excluding the NUL terminator.
pub const SEARCH_DOMAIN_PADDED_LENGTH: usize = 231; // 230 bytes + NUL
/// Maximum parameter-data length embedded in one RDM command/response.
pub const RDM_MAX_PARAMETER_DATA_LENGTH: usize = 231;
/// Ceiling on any single PDU this implementation will parse; protects
/// against a declared length that outruns the receive buffer.
pub const MAX_PDU_SIZE: usize = 65_536;

/// Default resource caps (spec.md §5, "Resource caps"). Each may be
/// overridden per-deployment through [`RuntimeConfig`].
pub mod defaults {
    /// Maximum scopes a single client may register.
    pub const MAX_SCOPES_PER_CLIENT: usize = 4;
    /// Maximum responders registered under one endpoint.
    pub const MAX_RESPONDERS_PER_ENDPOINT: usize = 512;
    /// Maximum RDM commands awaiting a response, per scope.
    pub const MAX_PENDING_COMMANDS_PER_SCOPE: usize = 256;
    /// Maximum discovered LLRP targets tracked by one manager.
    pub const MAX_DISCOVERED_TARGETS: usize = 8_192;
}

/// Caller-tunable resource caps and back-off bounds.
///
/// Lock-free: [`DashMap`] shards the override table so readers never
/// contend with each other, and the active [`NetintConfig`] snapshot is
/// swapped atomically via [`ArcSwap`] rather than guarded by a `Mutex`.
#[derive(Clone)]
pub struct RuntimeConfig {
    overrides: Arc<DashMap<&'static str, u64>>,
    netint: Arc<ArcSwap<NetintConfig>>,
}

impl RuntimeConfig {
    /// Build a runtime config with every cap at its spec.md default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            overrides: Arc::new(DashMap::new()),
            netint: Arc::new(ArcSwap::new(Arc::new(NetintConfig::default()))),
        }
    }

    /// Override a named resource cap (see [`defaults`] for the key set
    /// implied by each constant's name, e.g. `"max_scopes_per_client"`).
    pub fn set_cap(&self, key: &'static str, value: u64) {
        self.overrides.insert(key, value);
    }

    /// Read a resource cap, falling back to `default_value` if unset.
    #[must_use]
    pub fn cap(&self, key: &'static str, default_value: u64) -> u64 {
        self.overrides
            .get(key)
            .map(|v| *v.value())
            .unwrap_or(default_value)
    }

    /// Atomically replace the active network-interface selection.
    pub fn set_netint(&self, netint: NetintConfig) {
        self.netint.store(Arc::new(netint));
    }

    /// Snapshot the active network-interface selection.
    #[must_use]
    pub fn netint(&self) -> Arc<NetintConfig> {
        self.netint.load_full()
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Restricts which network interfaces the multicast/netint service
/// considers, per spec.md §4.2.
#[derive(Debug, Clone, Default)]
pub struct NetintConfig {
    /// When non-empty, only these interface indices are enumerated.
    pub allowed_indices: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_override_round_trips() {
        let cfg = RuntimeConfig::new();
        assert_eq!(cfg.cap("max_scopes_per_client", 4), 4);
        cfg.set_cap("max_scopes_per_client", 8);
        assert_eq!(cfg.cap("max_scopes_per_client", 4), 8);
    }

    #[test]
    fn netint_swap_is_visible_immediately() {
        let cfg = RuntimeConfig::new();
        assert!(cfg.netint().allowed_indices.is_empty());
        cfg.set_netint(NetintConfig { allowed_indices: vec![2, 3] });
        assert_eq!(cfg.netint().allowed_indices, vec![2, 3]);
    }
}
