// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! LLRP PDU framing: probe-request, probe-reply and the LLRP-wrapped RDM
//! command/response carrier (spec.md §4.1).

use super::acn::{pack_flags_and_length, unpack_flags_and_length};
use super::{PduError, PduResult};
use crate::core::cid::Cid;
use crate::core::uid::Uid;

const LLRP_HEADER_LEN: usize = 3 + 4 + 16 + 4;

/// LLRP PDU vector: what kind of payload follows the LLRP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlrpVector {
    ProbeRequest,
    ProbeReply,
    RdmCommand,
}

impl LlrpVector {
    const PROBE_REQUEST: u32 = 0x0000_0001;
    const PROBE_REPLY: u32 = 0x0000_0002;
    const RDM_COMMAND: u32 = 0x0000_0003;

    #[must_use]
    pub fn to_u32(self) -> u32 {
        match self {
            Self::ProbeRequest => Self::PROBE_REQUEST,
            Self::ProbeReply => Self::PROBE_REPLY,
            Self::RdmCommand => Self::RDM_COMMAND,
        }
    }

    pub fn from_u32(value: u32) -> PduResult<Self> {
        match value {
            Self::PROBE_REQUEST => Ok(Self::ProbeRequest),
            Self::PROBE_REPLY => Ok(Self::ProbeReply),
            Self::RDM_COMMAND => Ok(Self::RdmCommand),
            other => Err(PduError::UnknownVector(other)),
        }
    }
}

/// The LLRP envelope: flags+length, vector, destination CID, transaction
/// number, then a vector-specific payload.
#[derive(Debug, Clone)]
pub struct LlrpPdu {
    pub vector: LlrpVector,
    pub destination_cid: Cid,
    pub transaction_number: u32,
    pub payload: Vec<u8>,
}

impl LlrpPdu {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let total_len = (LLRP_HEADER_LEN + self.payload.len()) as u32;
        let mut out = Vec::with_capacity(total_len as usize);
        out.extend_from_slice(&pack_flags_and_length(0x07, total_len));
        out.extend_from_slice(&self.vector.to_u32().to_be_bytes());
        out.extend_from_slice(&self.destination_cid.as_bytes());
        out.extend_from_slice(&self.transaction_number.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn decode(bytes: &[u8]) -> PduResult<Self> {
        if bytes.len() < LLRP_HEADER_LEN {
            return Err(PduError::Truncated);
        }
        let (_, length) = unpack_flags_and_length([bytes[0], bytes[1], bytes[2]]);
        let length = length as usize;
        if length < LLRP_HEADER_LEN || length > bytes.len() {
            return Err(PduError::LengthOutOfBounds);
        }
        let vector = LlrpVector::from_u32(u32::from_be_bytes([bytes[3], bytes[4], bytes[5], bytes[6]]))?;
        let mut cid_bytes = [0u8; 16];
        cid_bytes.copy_from_slice(&bytes[7..23]);
        let transaction_number = u32::from_be_bytes([bytes[23], bytes[24], bytes[25], bytes[26]]);
        Ok(Self {
            vector,
            destination_cid: Cid::from_bytes(cid_bytes),
            transaction_number,
            payload: bytes[27..length].to_vec(),
        })
    }
}

/// Component type carried in a probe-reply and in a broker client entry
/// (spec.md §3, §4.6; supplemented vocabulary from `original_source`
/// `client_entry.h`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    Broker,
    RptController,
    RptDevice,
    Unknown,
}

impl ComponentType {
    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::RptDevice => 0,
            Self::RptController => 1,
            Self::Broker => 2,
            Self::Unknown => 0xff,
        }
    }

    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::RptDevice,
            1 => Self::RptController,
            2 => Self::Broker,
            _ => Self::Unknown,
        }
    }
}

/// Filter bits carried in a probe-request (spec.md §4.6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeFilter(u16);

impl ProbeFilter {
    pub const CLIENT_TCP_CONNECTION_INACTIVE: u16 = 0x0001;
    pub const BROKERS_ONLY: u16 = 0x0002;

    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[must_use]
    pub fn contains(self, flag: u16) -> bool {
        self.0 & flag != 0
    }
}

const SUB_VECTOR_PROBE_REQUEST_DATA: u8 = 1;
const SUB_VECTOR_PROBE_REPLY_DATA: u8 = 1;
const PROBE_REQUEST_HEADER_LEN: usize = 3 + 1 + 6 + 6 + 2;
const PROBE_REPLY_LEN: usize = 3 + 1 + 6 + 6 + 1;

/// Probe-request payload: UID range, filter bitfield, and the
/// suppression (Known-UID) list the manager has accumulated so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub lower_uid: Uid,
    pub upper_uid: Uid,
    pub filter: ProbeFilter,
    pub known_uids: Vec<Uid>,
}

impl ProbeRequest {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let total_len = (PROBE_REQUEST_HEADER_LEN + self.known_uids.len() * 6) as u32;
        let mut out = Vec::with_capacity(total_len as usize);
        out.extend_from_slice(&pack_flags_and_length(0x07, total_len));
        out.push(SUB_VECTOR_PROBE_REQUEST_DATA);
        out.extend_from_slice(&self.lower_uid.to_wire());
        out.extend_from_slice(&self.upper_uid.to_wire());
        out.extend_from_slice(&self.filter.bits().to_be_bytes());
        for uid in &self.known_uids {
            out.extend_from_slice(&uid.to_wire());
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> PduResult<Self> {
        if bytes.len() < PROBE_REQUEST_HEADER_LEN {
            return Err(PduError::Truncated);
        }
        let (_, length) = unpack_flags_and_length([bytes[0], bytes[1], bytes[2]]);
        let length = length as usize;
        if length < PROBE_REQUEST_HEADER_LEN || length > bytes.len() {
            return Err(PduError::LengthOutOfBounds);
        }
        if bytes[3] != SUB_VECTOR_PROBE_REQUEST_DATA {
            return Err(PduError::UnknownVector(u32::from(bytes[3])));
        }
        let lower_uid = Uid::from_wire(bytes[4..10].try_into().expect("6 bytes"));
        let upper_uid = Uid::from_wire(bytes[10..16].try_into().expect("6 bytes"));
        let filter = ProbeFilter::from_bits(u16::from_be_bytes([bytes[16], bytes[17]]));

        let known_bytes = &bytes[18..length];
        if known_bytes.len() % 6 != 0 {
            return Err(PduError::NestedLengthMismatch);
        }
        let known_uids = known_bytes
            .chunks_exact(6)
            .map(|c| Uid::from_wire(c.try_into().expect("6 bytes")))
            .collect();

        Ok(Self { lower_uid, upper_uid, filter, known_uids })
    }
}

/// Probe-reply payload: the responding UID, its hardware address, and
/// component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReply {
    pub uid: Uid,
    pub hardware_address: [u8; 6],
    pub component_type: ComponentType,
}

impl ProbeReply {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PROBE_REPLY_LEN);
        out.extend_from_slice(&pack_flags_and_length(0x07, PROBE_REPLY_LEN as u32));
        out.push(SUB_VECTOR_PROBE_REPLY_DATA);
        out.extend_from_slice(&self.uid.to_wire());
        out.extend_from_slice(&self.hardware_address);
        out.push(self.component_type.to_u8());
        out
    }

    pub fn decode(bytes: &[u8]) -> PduResult<Self> {
        if bytes.len() < PROBE_REPLY_LEN {
            return Err(PduError::Truncated);
        }
        if bytes[3] != SUB_VECTOR_PROBE_REPLY_DATA {
            return Err(PduError::UnknownVector(u32::from(bytes[3])));
        }
        let uid = Uid::from_wire(bytes[4..10].try_into().expect("6 bytes"));
        let mut hardware_address = [0u8; 6];
        hardware_address.copy_from_slice(&bytes[10..16]);
        let component_type = ComponentType::from_u8(bytes[16]);
        Ok(Self { uid, hardware_address, component_type })
    }
}

/// The LLRP broadcast CID: probe-replies addressed to this destination
/// are accepted by every manager, not just the one that sent the
/// matching probe-request (spec.md §4.5).
#[must_use]
pub fn broadcast_cid() -> Cid {
    Cid::from_bytes([0xff; 16])
}
