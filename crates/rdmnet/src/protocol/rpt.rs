// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RPT (RDMnet Reliable Transport) PDU framing: the broker protocol that
//! carries RDM command/notification traffic within a scope (spec.md
//! §4.1).

use super::acn::{pack_flags_and_length, unpack_flags_and_length};
use super::rdm::RdmMessage;
use super::{PduError, PduResult};
use crate::core::uid::Uid;

const RPT_HEADER_LEN: usize = 3 + 4 + 6 + 2 + 6 + 2 + 4;

/// RPT PDU vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RptVector {
    Request,
    Notification,
    Status,
}

impl RptVector {
    const REQUEST: u32 = 1;
    const NOTIFICATION: u32 = 2;
    const STATUS: u32 = 3;

    #[must_use]
    pub fn to_u32(self) -> u32 {
        match self {
            Self::Request => Self::REQUEST,
            Self::Notification => Self::NOTIFICATION,
            Self::Status => Self::STATUS,
        }
    }

    pub fn from_u32(value: u32) -> PduResult<Self> {
        match value {
            Self::REQUEST => Ok(Self::Request),
            Self::NOTIFICATION => Ok(Self::Notification),
            Self::STATUS => Ok(Self::Status),
            other => Err(PduError::UnknownVector(other)),
        }
    }
}

/// Addressing and ordering fields common to every RPT PDU.
#[derive(Debug, Clone, Copy)]
pub struct RptHeader {
    pub source_uid: Uid,
    pub source_endpoint: u16,
    pub dest_uid: Uid,
    pub dest_endpoint: u16,
    pub sequence: u32,
}

/// One RPT PDU: header, vector, and a vector-specific payload (a chain
/// of RDM command/response PDUs for `Request`/`Notification`, or a
/// [`RptStatusPayload`] for `Status`).
#[derive(Debug, Clone)]
pub struct RptPdu {
    pub header: RptHeader,
    pub vector: RptVector,
    pub payload: Vec<u8>,
}

impl RptPdu {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let total_len = (RPT_HEADER_LEN + self.payload.len()) as u32;
        let mut out = Vec::with_capacity(total_len as usize);
        out.extend_from_slice(&pack_flags_and_length(0x07, total_len));
        out.extend_from_slice(&self.vector.to_u32().to_be_bytes());
        out.extend_from_slice(&self.header.source_uid.to_wire());
        out.extend_from_slice(&self.header.source_endpoint.to_be_bytes());
        out.extend_from_slice(&self.header.dest_uid.to_wire());
        out.extend_from_slice(&self.header.dest_endpoint.to_be_bytes());
        out.extend_from_slice(&self.header.sequence.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn decode(bytes: &[u8]) -> PduResult<Self> {
        if bytes.len() < RPT_HEADER_LEN {
            return Err(PduError::Truncated);
        }
        let (_, length) = unpack_flags_and_length([bytes[0], bytes[1], bytes[2]]);
        let length = length as usize;
        if length < RPT_HEADER_LEN || length > bytes.len() {
            return Err(PduError::LengthOutOfBounds);
        }
        let vector = RptVector::from_u32(u32::from_be_bytes([bytes[3], bytes[4], bytes[5], bytes[6]]))?;
        let source_uid = Uid::from_wire(bytes[7..13].try_into().expect("6 bytes"));
        let source_endpoint = u16::from_be_bytes([bytes[13], bytes[14]]);
        let dest_uid = Uid::from_wire(bytes[15..21].try_into().expect("6 bytes"));
        let dest_endpoint = u16::from_be_bytes([bytes[21], bytes[22]]);
        let sequence = u32::from_be_bytes([bytes[23], bytes[24], bytes[25], bytes[26]]);
        Ok(Self {
            header: RptHeader { source_uid, source_endpoint, dest_uid, dest_endpoint, sequence },
            vector,
            payload: bytes[27..length].to_vec(),
        })
    }
}

/// Encode a chain of RDM messages back-to-back; each message is
/// self-delimiting via its own declared length, so no extra framing is
/// needed between them (spec.md §4.1, "payload of chained RDM command
/// PDUs").
pub fn encode_rdm_chain(messages: &[RdmMessage]) -> PduResult<Vec<u8>> {
    let mut out = Vec::new();
    for msg in messages {
        out.extend_from_slice(&msg.encode()?);
    }
    Ok(out)
}

/// Decode a back-to-back chain of RDM messages until the buffer is
/// exhausted.
pub fn decode_rdm_chain(bytes: &[u8]) -> PduResult<Vec<RdmMessage>> {
    let mut out = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let msg = RdmMessage::decode(&bytes[offset..])?;
        // message_len (byte[2]) already counts from the start code, so just add the checksum
        let consumed = bytes[offset + 2] as usize + 2;
        out.push(msg);
        offset += consumed;
    }
    Ok(out)
}

/// RPT status codes, supplemented from `original_source`'s
/// `rpt_prot.h` status vocabulary (spec.md §9 leaves the exact surface
/// policy as an implementer decision — see `DESIGN.md`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RptStatusCode {
    UnknownRptVector,
    RdmTimeout,
    RdmInvalidResponse,
    UnknownRdmUid,
    UnknownEndpoint,
    BroadcastComplete,
    UnknownVector,
    InvalidMessage,
    InvalidCommandClass,
    QueueOverflow,
}

impl RptStatusCode {
    #[must_use]
    pub fn to_u16(self) -> u16 {
        match self {
            Self::UnknownRptVector => 0x0001,
            Self::RdmTimeout => 0x0002,
            Self::RdmInvalidResponse => 0x0003,
            Self::UnknownRdmUid => 0x0004,
            Self::UnknownEndpoint => 0x0005,
            Self::BroadcastComplete => 0x0006,
            Self::UnknownVector => 0x0007,
            Self::InvalidMessage => 0x0008,
            Self::InvalidCommandClass => 0x0009,
            Self::QueueOverflow => 0x000A,
        }
    }

    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            0x0001 => Self::UnknownRptVector,
            0x0002 => Self::RdmTimeout,
            0x0003 => Self::RdmInvalidResponse,
            0x0004 => Self::UnknownRdmUid,
            0x0005 => Self::UnknownEndpoint,
            0x0006 => Self::BroadcastComplete,
            0x0007 => Self::UnknownVector,
            0x0008 => Self::InvalidMessage,
            0x0009 => Self::InvalidCommandClass,
            0x000A => Self::QueueOverflow,
            _ => return None,
        })
    }
}

/// RPT STATUS payload: a status code plus a free-form diagnostic string.
#[derive(Debug, Clone)]
pub struct RptStatusPayload {
    pub code: RptStatusCode,
    pub status_message: String,
}

impl RptStatusPayload {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let msg_bytes = self.status_message.as_bytes();
        let mut out = Vec::with_capacity(2 + 2 + msg_bytes.len());
        out.extend_from_slice(&self.code.to_u16().to_be_bytes());
        out.extend_from_slice(&(msg_bytes.len() as u16).to_be_bytes());
        out.extend_from_slice(msg_bytes);
        out
    }

    pub fn decode(bytes: &[u8]) -> PduResult<Self> {
        if bytes.len() < 4 {
            return Err(PduError::Truncated);
        }
        let code = RptStatusCode::from_u16(u16::from_be_bytes([bytes[0], bytes[1]]))
            .ok_or_else(|| PduError::UnknownVector(u32::from(u16::from_be_bytes([bytes[0], bytes[1]]))))?;
        let msg_len = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        if bytes.len() < 4 + msg_len {
            return Err(PduError::LengthOutOfBounds);
        }
        let status_message = String::from_utf8_lossy(&bytes[4..4 + msg_len]).into_owned();
        Ok(Self { code, status_message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::rdm::CommandClass;

    fn header() -> RptHeader {
        RptHeader {
            source_uid: Uid::new(0x6574, 1),
            source_endpoint: 0,
            dest_uid: Uid::new(0x6574, 2),
            dest_endpoint: 0,
            sequence: 7,
        }
    }

    #[test]
    fn rpt_pdu_round_trips() {
        let pdu = RptPdu { header: header(), vector: RptVector::Request, payload: vec![1, 2, 3] };
        let encoded = pdu.encode();
        let decoded = RptPdu::decode(&encoded).unwrap();
        assert_eq!(decoded.vector, RptVector::Request);
        assert_eq!(decoded.header.sequence, 7);
        assert_eq!(decoded.payload, vec![1, 2, 3]);
    }

    #[test]
    fn rdm_chain_round_trips() {
        let msg = RdmMessage {
            dest_uid: Uid::new(0x6574, 2),
            src_uid: Uid::new(0x6574, 1),
            transaction_number: 1,
            port_id_or_response_type: 0,
            message_count: 0,
            sub_device: 0,
            command_class: CommandClass::GetCommand,
            pid: 0x0060,
            parameter_data: vec![],
        };
        let chain = vec![msg.clone(), msg];
        let encoded = encode_rdm_chain(&chain).unwrap();
        let decoded = decode_rdm_chain(&encoded).unwrap();
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn status_payload_round_trips() {
        let status = RptStatusPayload {
            code: RptStatusCode::UnknownEndpoint,
            status_message: "no such endpoint".to_string(),
        };
        let decoded = RptStatusPayload::decode(&status.encode()).unwrap();
        assert_eq!(decoded.code, RptStatusCode::UnknownEndpoint);
        assert_eq!(decoded.status_message, "no such endpoint");
    }
}
