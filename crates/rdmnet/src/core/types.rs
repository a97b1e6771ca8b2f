// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared value types from the data model (spec.md §3): `Scope`, scope
//! slots, static broker configuration, and the saved-message invariant.

use crate::config::SCOPE_STRING_PADDED_LENGTH;
use crate::core::cid::Cid;
use crate::core::uid::Uid;
use crate::error::{Error, Result};
use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// The scope every client joins unless configured otherwise.
pub const DEFAULT_SCOPE_STRING: &str = "default";

/// A bounded string identifier (≤ 63 payload bytes + NUL) naming a broker
/// collective (spec.md §3).
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Scope(String);

impl Scope {
    /// Build a `Scope`, rejecting strings that would overflow the
    /// 63-byte wire payload.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.len() >= SCOPE_STRING_PADDED_LENGTH {
            return Err(Error::StringTooLong {
                field: "scope",
                max: SCOPE_STRING_PADDED_LENGTH - 1,
            });
        }
        if value.is_empty() {
            return Err(Error::InvalidArgument("scope must not be empty"));
        }
        Ok(Self(value))
    }

    /// The default RDMnet scope, `"default"`.
    #[must_use]
    pub fn default_scope() -> Self {
        Self(DEFAULT_SCOPE_STRING.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope({:?})", self.0)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::default_scope()
    }
}

/// Integer 1…0xFFFF identifying one scope entry inside a client's
/// configuration; slots form an ordered sparse map (spec.md §3).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ScopeSlot(u16);

impl ScopeSlot {
    /// The first assignable slot.
    pub const FIRST: ScopeSlot = ScopeSlot(1);

    /// Wrap a raw slot number.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] for slot `0`, which is reserved
    /// as "unassigned."
    pub fn new(raw: u16) -> Result<Self> {
        if raw == 0 {
            return Err(Error::InvalidArgument("scope slot 0 is reserved"));
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// The next slot after this one, wrapping before `0`.
    #[must_use]
    pub fn next(self) -> Self {
        if self.0 == u16::MAX { ScopeSlot(1) } else { ScopeSlot(self.0 + 1) }
    }
}

impl fmt::Debug for ScopeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeSlot({})", self.0)
    }
}

/// Optional (scope → broker socket address) that bypasses discovery
/// entirely (spec.md §3, §4.4).
#[derive(Debug, Clone)]
pub struct StaticBrokerConfig {
    pub scope: Scope,
    pub listen_addrs: Vec<SocketAddr>,
}

/// A broker observed via discovery: scope, service-instance name, CID,
/// UID, E1.33 version, listen addresses and TTL (spec.md §3).
///
/// Created on first resolved record; destroyed when the TTL expires, a
/// zero-TTL goodbye is received, or discovery is cancelled for the owning
/// monitored scope.
#[derive(Debug, Clone)]
pub struct DiscoveredBroker {
    pub scope: Scope,
    pub service_instance_name: String,
    pub cid: Cid,
    pub uid: Uid,
    pub e133_version: u16,
    pub listen_addrs: Vec<SocketAddr>,
    pub ttl: Duration,
    pub(crate) last_seen: Instant,
}

impl DiscoveredBroker {
    /// `true` once SRV + TXT have been observed and at least one A/AAAA
    /// has resolved — the point at which the session layer is allowed to
    /// see this entry (spec.md §4.3).
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.listen_addrs.is_empty()
    }

    /// `true` if the TTL has elapsed since the last refresh.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.last_seen) >= self.ttl
    }

    pub(crate) fn refresh(&mut self, now: Instant, ttl: Duration) {
        self.last_seen = now;
        self.ttl = ttl;
    }
}
