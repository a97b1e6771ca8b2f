// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire codec: ACN root layer, LLRP/Broker/RPT/EPT PDUs, embedded RDM
//! (spec.md §4.1).
//!
//! The codec is stateless and synchronous: every `encode_*` function
//! takes a value and returns bytes, every `decode_*` function takes
//! bytes and returns a value or a [`PduError`]. Nothing here owns a
//! socket or a timer; higher layers (`transport`, `connection`, `llrp`)
//! call into this module on both ends of the wire.

pub mod acn;
pub mod broker;
pub mod ept;
pub mod llrp;
pub mod rdm;
pub mod rpt;

use std::sync::atomic::{AtomicU64, Ordering};

/// Decode-time failures. Every variant is recoverable at the call site:
/// the codec never panics on attacker-controlled input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PduError {
    /// Fewer bytes were available than the PDU's fixed header requires.
    Truncated,
    /// A declared PDU length did not fit inside its enclosing buffer.
    LengthOutOfBounds,
    /// A nested PDU's length did not sum correctly into its parent's.
    NestedLengthMismatch,
    /// A vector field held a value outside the allowed enumeration.
    UnknownVector(u32),
    /// A fixed preamble (UDP or TCP) did not match the expected bytes.
    BadPreamble,
    /// A NUL-padded string field was not NUL-terminated within its wire
    /// width.
    UnterminatedString,
}

impl std::fmt::Display for PduError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated => write!(f, "PDU truncated before its fixed header ended"),
            Self::LengthOutOfBounds => write!(f, "declared PDU length exceeds enclosing buffer"),
            Self::NestedLengthMismatch => {
                write!(f, "nested PDU lengths do not sum to the parent's declared length")
            }
            Self::UnknownVector(v) => write!(f, "vector {v:#010x} is not a recognized value"),
            Self::BadPreamble => write!(f, "ACN preamble bytes did not match"),
            Self::UnterminatedString => write!(f, "fixed-width string field was not NUL-terminated"),
        }
    }
}

impl std::error::Error for PduError {}

pub type PduResult<T> = Result<T, PduError>;

/// Per-process counters for malformed inbound bytes (spec.md §7: "dropped
/// silently at the codec level; counter incremented for diagnostics").
#[derive(Default)]
pub struct CodecStats {
    malformed: AtomicU64,
}

impl CodecStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }
}

/// Pack a NUL-terminated, NUL-padded fixed-width string field.
///
/// # Panics
/// Panics if `value` does not fit in `width - 1` bytes; callers validate
/// this at construction time (see [`crate::core::types::Scope::new`]).
pub(crate) fn pack_padded_string(value: &str, width: usize) -> Vec<u8> {
    assert!(value.len() < width, "string does not fit the padded wire field");
    let mut out = vec![0u8; width];
    out[..value.len()].copy_from_slice(value.as_bytes());
    out
}

/// Unpack a NUL-terminated, NUL-padded fixed-width string field.
pub(crate) fn unpack_padded_string(bytes: &[u8]) -> PduResult<String> {
    let end = bytes.iter().position(|&b| b == 0).ok_or(PduError::UnterminatedString)?;
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_string_round_trips() {
        let packed = pack_padded_string("default", 64);
        assert_eq!(packed.len(), 64);
        assert_eq!(unpack_padded_string(&packed).unwrap(), "default");
    }

    #[test]
    fn unterminated_string_is_rejected() {
        let bytes = vec![b'x'; 8];
        assert_eq!(unpack_padded_string(&bytes), Err(PduError::UnterminatedString));
    }

    #[test]
    fn codec_stats_count_malformed() {
        let stats = CodecStats::new();
        assert_eq!(stats.malformed(), 0);
        stats.record_malformed();
        stats.record_malformed();
        assert_eq!(stats.malformed(), 2);
    }
}
