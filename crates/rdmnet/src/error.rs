// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error taxonomy.
//!
//! Covers every error kind named in the protocol design: invalid argument,
//! not-initialized, not-found, no-memory, connection failure, protocol
//! rejection, disconnect, and RDM NACK. Malformed inbound bytes are *not*
//! part of this taxonomy — the codec counts and drops them silently
//! (see [`crate::protocol::CodecStats`]); they never reach a caller.

use std::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Reason a broker rejected or ended a connection.
///
/// Mirrors the RDMnet disconnect/connect-reply status vocabulary (see
/// `VECTOR_BROKER_CONNECT_REPLY` / `VECTOR_BROKER_DISCONNECT` payloads in
/// the original implementation) rather than a bare string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdmnetStatus {
    ScopeMismatch,
    CapacityExceeded,
    DuplicateUid,
    InvalidClientEntry,
    InvalidUid,
    AlreadyConnected,
    ShuttingDown,
    HardwareFault,
    SoftwareFault,
    Incompatible,
}

impl RdmnetStatus {
    /// Wire encoding used in CONNECT_REPLY and the dynamic-UID mapping
    /// status field. `0` is reserved for "no error" at the call sites
    /// that embed this (see [`crate::protocol::broker::ConnectReplyMsg`]);
    /// it is not a variant of this enum.
    #[must_use]
    pub fn to_u16(self) -> u16 {
        match self {
            Self::ScopeMismatch => 1,
            Self::CapacityExceeded => 2,
            Self::DuplicateUid => 3,
            Self::InvalidClientEntry => 4,
            Self::InvalidUid => 5,
            Self::AlreadyConnected => 6,
            Self::ShuttingDown => 7,
            Self::HardwareFault => 8,
            Self::SoftwareFault => 9,
            Self::Incompatible => 10,
        }
    }

    #[must_use]
    pub fn from_u16(value: u16) -> Self {
        match value {
            2 => Self::CapacityExceeded,
            3 => Self::DuplicateUid,
            4 => Self::InvalidClientEntry,
            5 => Self::InvalidUid,
            6 => Self::AlreadyConnected,
            7 => Self::ShuttingDown,
            8 => Self::HardwareFault,
            9 => Self::SoftwareFault,
            10 => Self::Incompatible,
            _ => Self::ScopeMismatch,
        }
    }
}

impl fmt::Display for RdmnetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ScopeMismatch => "scope mismatch",
            Self::CapacityExceeded => "broker capacity exceeded",
            Self::DuplicateUid => "duplicate UID",
            Self::InvalidClientEntry => "invalid client entry",
            Self::InvalidUid => "invalid UID",
            Self::AlreadyConnected => "client already connected",
            Self::ShuttingDown => "broker shutting down",
            Self::HardwareFault => "hardware fault",
            Self::SoftwareFault => "software fault",
            Self::Incompatible => "incompatible protocol version",
        };
        f.write_str(s)
    }
}

/// Whether a disconnect/failure originated locally or from the remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Remote,
}

/// Errors returned by RDMnet core operations.
///
/// Synchronous API calls return this directly (see §7 "Propagation
/// policy"); asynchronous failures are instead delivered through a
/// [`crate::client::Listener`] event carrying the same information.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Invalid argument
    // ========================================================================
    /// A required value was null/empty/zeroed where one is not allowed.
    InvalidArgument(&'static str),
    /// A string exceeded its fixed wire length (scope: 63 bytes, domain: 230).
    StringTooLong { field: &'static str, max: usize },
    /// A UID did not belong to the class the operation expected.
    InvalidUid(String),

    // ========================================================================
    // Not initialized / not found
    // ========================================================================
    /// API used before [`crate::context::Context::new`] succeeded.
    NotInitialized,
    /// A handle did not resolve to a live instance.
    NotFound,

    // ========================================================================
    // Resource caps
    // ========================================================================
    /// A configured resource cap (connections, scopes, responders, pending
    /// commands, Known-UIDs) was hit; the library never allocates
    /// unboundedly in response to network input.
    NoMemory,
    /// The operation would need to block; the library only offers
    /// asynchronous, callback-driven long-running work.
    WouldBlock,

    // ========================================================================
    // Connection / protocol
    // ========================================================================
    /// Socket-level create/connect/send/receive failure.
    ConnectionFailed(std::io::Error),
    /// The broker sent a non-OK connect-reply.
    ProtocolRejected(RdmnetStatus),
    /// Heartbeat timeout, peer disconnect message, or socket close.
    Disconnected { status: RdmnetStatus, origin: Origin },

    // ========================================================================
    // Codec (synchronous decode calls only — see module docs)
    // ========================================================================
    /// A PDU failed codec validation on a path that surfaces errors
    /// synchronously (e.g. decoding a buffer the caller handed in directly).
    MalformedMessage(&'static str),

    // ========================================================================
    // RDM
    // ========================================================================
    /// An RDM response carried a `NACK_REASON`. Delivered as a normal
    /// response; this variant is only used by helpers that collapse a
    /// response into a `Result`.
    RdmNack(u16),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(what) => write!(f, "invalid argument: {what}"),
            Self::StringTooLong { field, max } => {
                write!(f, "{field} exceeds maximum wire length of {max} bytes")
            }
            Self::InvalidUid(reason) => write!(f, "invalid UID: {reason}"),
            Self::NotInitialized => f.write_str("rdmnet not initialized"),
            Self::NotFound => f.write_str("handle not found"),
            Self::NoMemory => f.write_str("resource cap exceeded"),
            Self::WouldBlock => f.write_str("operation would block"),
            Self::ConnectionFailed(e) => write!(f, "connection failed: {e}"),
            Self::ProtocolRejected(status) => write!(f, "connect rejected: {status}"),
            Self::Disconnected { status, origin } => {
                let who = match origin {
                    Origin::Local => "locally",
                    Origin::Remote => "by remote",
                };
                write!(f, "disconnected {who}: {status}")
            }
            Self::MalformedMessage(reason) => write!(f, "malformed message: {reason}"),
            Self::RdmNack(reason) => write!(f, "RDM NACK, reason 0x{reason:04x}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConnectionFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::ConnectionFailed(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_variants_are_human_readable() {
        assert_eq!(
            Error::InvalidArgument("cid").to_string(),
            "invalid argument: cid"
        );
        assert_eq!(
            Error::StringTooLong { field: "scope", max: 63 }.to_string(),
            "scope exceeds maximum wire length of 63 bytes"
        );
        assert_eq!(Error::NotFound.to_string(), "handle not found");
        assert_eq!(
            Error::Disconnected { status: RdmnetStatus::CapacityExceeded, origin: Origin::Remote }
                .to_string(),
            "disconnected by remote: broker capacity exceeded"
        );
    }

    #[test]
    fn io_error_converts_to_connection_failed() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::ConnectionFailed(_)));
    }
}
