// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! EPT (Extensible Packet Transport) PDU framing: arbitrary
//! manufacturer-defined payloads relayed through a broker (spec.md
//! §4.1). This core frames EPT traffic but does not interpret payload
//! contents — that is explicitly out of scope (spec.md §1).

use super::acn::{pack_flags_and_length, unpack_flags_and_length};
use super::{PduError, PduResult};
use crate::core::cid::Cid;

const EPT_HEADER_LEN: usize = 3 + 4 + 16;

/// EPT PDU vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EptVector {
    Data,
    Status,
}

impl EptVector {
    const DATA: u32 = 1;
    const STATUS: u32 = 2;

    #[must_use]
    pub fn to_u32(self) -> u32 {
        match self {
            Self::Data => Self::DATA,
            Self::Status => Self::STATUS,
        }
    }

    pub fn from_u32(value: u32) -> PduResult<Self> {
        match value {
            Self::DATA => Ok(Self::Data),
            Self::STATUS => Ok(Self::Status),
            other => Err(PduError::UnknownVector(other)),
        }
    }
}

/// One EPT PDU: destination CID, vector, and an opaque payload.
#[derive(Debug, Clone)]
pub struct EptPdu {
    pub dest_cid: Cid,
    pub vector: EptVector,
    pub payload: Vec<u8>,
}

impl EptPdu {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let total_len = (EPT_HEADER_LEN + self.payload.len()) as u32;
        let mut out = Vec::with_capacity(total_len as usize);
        out.extend_from_slice(&pack_flags_and_length(0x07, total_len));
        out.extend_from_slice(&self.vector.to_u32().to_be_bytes());
        out.extend_from_slice(&self.dest_cid.as_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn decode(bytes: &[u8]) -> PduResult<Self> {
        if bytes.len() < EPT_HEADER_LEN {
            return Err(PduError::Truncated);
        }
        let (_, length) = unpack_flags_and_length([bytes[0], bytes[1], bytes[2]]);
        let length = length as usize;
        if length < EPT_HEADER_LEN || length > bytes.len() {
            return Err(PduError::LengthOutOfBounds);
        }
        let vector = EptVector::from_u32(u32::from_be_bytes([bytes[3], bytes[4], bytes[5], bytes[6]]))?;
        let mut cid_bytes = [0u8; 16];
        cid_bytes.copy_from_slice(&bytes[7..23]);
        Ok(Self { dest_cid: Cid::from_bytes(cid_bytes), vector, payload: bytes[23..length].to_vec() })
    }
}
