// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Embedded RDM (ANSI E1.20) command/response bytes, exactly as carried
//! inside an RPT PDU (spec.md §4.1).
//!
//! RDMnet restricts the RDM wire form relative to a bare RDM link: only
//! GET/SET command classes are tunnelled (no DISCOVERY), and
//! `ACK_TIMER` responses are forbidden — a controller that would need
//! one must poll again instead.

use super::{PduError, PduResult};
use crate::config::RDM_MAX_PARAMETER_DATA_LENGTH;
use crate::core::uid::Uid;

/// RDM start code, identical for every message this crate tunnels.
const RDM_START_CODE: u8 = 0xCC;
const RDM_SUB_START_CODE: u8 = 0x01;
/// Fixed header length from sub-start-code through PDL, inclusive,
/// not counting the two leading start-code bytes or the parameter data.
const FIXED_HEADER_LEN: usize = 1 + 1 + 6 + 6 + 1 + 1 + 1 + 2 + 1 + 2 + 1;
const CHECKSUM_LEN: usize = 2;

/// RDM command class, restricted to the four RDMnet actually tunnels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandClass {
    GetCommand,
    GetCommandResponse,
    SetCommand,
    SetCommandResponse,
}

impl CommandClass {
    const GET_COMMAND: u8 = 0x20;
    const GET_COMMAND_RESPONSE: u8 = 0x21;
    const SET_COMMAND: u8 = 0x30;
    const SET_COMMAND_RESPONSE: u8 = 0x31;

    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::GetCommand => Self::GET_COMMAND,
            Self::GetCommandResponse => Self::GET_COMMAND_RESPONSE,
            Self::SetCommand => Self::SET_COMMAND,
            Self::SetCommandResponse => Self::SET_COMMAND_RESPONSE,
        }
    }

    pub fn from_u8(value: u8) -> PduResult<Self> {
        match value {
            Self::GET_COMMAND => Ok(Self::GetCommand),
            Self::GET_COMMAND_RESPONSE => Ok(Self::GetCommandResponse),
            Self::SET_COMMAND => Ok(Self::SetCommand),
            Self::SET_COMMAND_RESPONSE => Ok(Self::SetCommandResponse),
            other => Err(PduError::UnknownVector(u32::from(other))),
        }
    }

    #[must_use]
    pub fn is_response(self) -> bool {
        matches!(self, Self::GetCommandResponse | Self::SetCommandResponse)
    }
}

/// RDM response type. `AckTimer` is deliberately absent: RDMnet forbids
/// it (spec.md §3), so [`ResponseType::from_u8`] rejects its wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Ack,
    AckOverflow,
    NackReason,
}

impl ResponseType {
    const ACK: u8 = 0x00;
    const ACK_TIMER: u8 = 0x01;
    const ACK_OVERFLOW: u8 = 0x02;
    const NACK_REASON: u8 = 0x03;

    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Ack => Self::ACK,
            Self::AckOverflow => Self::ACK_OVERFLOW,
            Self::NackReason => Self::NACK_REASON,
        }
    }

    pub fn from_u8(value: u8) -> PduResult<Self> {
        match value {
            Self::ACK => Ok(Self::Ack),
            Self::ACK_OVERFLOW => Ok(Self::AckOverflow),
            Self::NACK_REASON => Ok(Self::NackReason),
            Self::ACK_TIMER => Err(PduError::UnknownVector(u32::from(value))),
            other => Err(PduError::UnknownVector(u32::from(other))),
        }
    }
}

/// One embedded RDM command or response.
///
/// `port_id_or_response_type` carries the raw wire byte: for a command
/// it is the port ID (unused by this core beyond round-tripping it);
/// for a response it is a [`ResponseType`] (use
/// [`RdmMessage::response_type`]).
#[derive(Debug, Clone)]
pub struct RdmMessage {
    pub dest_uid: Uid,
    pub src_uid: Uid,
    pub transaction_number: u8,
    pub port_id_or_response_type: u8,
    pub message_count: u8,
    pub sub_device: u16,
    pub command_class: CommandClass,
    pub pid: u16,
    pub parameter_data: Vec<u8>,
}

impl RdmMessage {
    /// Interpret `port_id_or_response_type` as a [`ResponseType`],
    /// valid only when [`CommandClass::is_response`] is true.
    pub fn response_type(&self) -> PduResult<ResponseType> {
        ResponseType::from_u8(self.port_id_or_response_type)
    }

    /// For a NACK response, the 2-byte NACK reason code (spec.md §7,
    /// "RDM NACK").
    #[must_use]
    pub fn nack_reason(&self) -> Option<u16> {
        if self.response_type() != Ok(ResponseType::NackReason) || self.parameter_data.len() < 2 {
            return None;
        }
        Some(u16::from_be_bytes([self.parameter_data[0], self.parameter_data[1]]))
    }

    /// Encode to the exact RDM wire form, including the trailing 16-bit
    /// checksum.
    ///
    /// # Errors
    /// Returns [`PduError::LengthOutOfBounds`] if `parameter_data`
    /// exceeds [`RDM_MAX_PARAMETER_DATA_LENGTH`].
    pub fn encode(&self) -> PduResult<Vec<u8>> {
        if self.parameter_data.len() > RDM_MAX_PARAMETER_DATA_LENGTH {
            return Err(PduError::LengthOutOfBounds);
        }
        let message_len = (FIXED_HEADER_LEN + 1 + self.parameter_data.len()) as u8;
        let mut body = Vec::with_capacity(1 + message_len as usize + CHECKSUM_LEN);
        body.push(RDM_SUB_START_CODE);
        body.push(message_len);
        body.extend_from_slice(&self.dest_uid.to_wire());
        body.extend_from_slice(&self.src_uid.to_wire());
        body.push(self.transaction_number);
        body.push(self.port_id_or_response_type);
        body.push(self.message_count);
        body.extend_from_slice(&self.sub_device.to_be_bytes());
        body.push(self.command_class.to_u8());
        body.extend_from_slice(&self.pid.to_be_bytes());
        body.push(self.parameter_data.len() as u8);
        body.extend_from_slice(&self.parameter_data);

        let mut out = Vec::with_capacity(1 + body.len() + CHECKSUM_LEN);
        out.push(RDM_START_CODE);
        out.extend_from_slice(&body);
        let checksum: u32 = std::iter::once(RDM_START_CODE).chain(body.iter().copied()).map(u32::from).sum();
        out.extend_from_slice(&(checksum as u16).to_be_bytes());
        Ok(out)
    }

    /// Decode and checksum-validate an RDM message from `bytes`.
    pub fn decode(bytes: &[u8]) -> PduResult<Self> {
        if bytes.len() < 1 + FIXED_HEADER_LEN + CHECKSUM_LEN {
            return Err(PduError::Truncated);
        }
        if bytes[0] != RDM_START_CODE || bytes[1] != RDM_SUB_START_CODE {
            return Err(PduError::BadPreamble);
        }
        let message_len = bytes[2] as usize;
        if message_len < FIXED_HEADER_LEN + 1 {
            return Err(PduError::LengthOutOfBounds);
        }
        let total_len = message_len + CHECKSUM_LEN;
        if total_len > bytes.len() {
            return Err(PduError::LengthOutOfBounds);
        }

        let checksum_bytes = &bytes[message_len..total_len];
        let expected: u32 = bytes[..message_len].iter().copied().map(u32::from).sum();
        let actual = u16::from_be_bytes([checksum_bytes[0], checksum_bytes[1]]);
        if actual != expected as u16 {
            return Err(PduError::NestedLengthMismatch);
        }

        let dest_uid = Uid::from_wire(bytes[3..9].try_into().expect("6 bytes"));
        let src_uid = Uid::from_wire(bytes[9..15].try_into().expect("6 bytes"));
        let transaction_number = bytes[15];
        let port_id_or_response_type = bytes[16];
        let message_count = bytes[17];
        let sub_device = u16::from_be_bytes([bytes[18], bytes[19]]);
        let command_class = CommandClass::from_u8(bytes[20])?;
        let pid = u16::from_be_bytes([bytes[21], bytes[22]]);
        let pdl = bytes[23] as usize;
        if pdl > RDM_MAX_PARAMETER_DATA_LENGTH || 24 + pdl != message_len {
            return Err(PduError::NestedLengthMismatch);
        }
        let parameter_data = bytes[24..24 + pdl].to_vec();

        Ok(Self {
            dest_uid,
            src_uid,
            transaction_number,
            port_id_or_response_type,
            message_count,
            sub_device,
            command_class,
            pid,
            parameter_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RdmMessage {
        RdmMessage {
            dest_uid: Uid::new(0x6574, 0x1234_5678),
            src_uid: Uid::new(0x6574, 1),
            transaction_number: 5,
            port_id_or_response_type: 1,
            message_count: 0,
            sub_device: 0,
            command_class: CommandClass::GetCommand,
            pid: 0x0060,
            parameter_data: vec![0xde, 0xad, 0xbe, 0xef],
        }
    }

    #[test]
    fn round_trips() {
        let msg = sample();
        let encoded = msg.encode().unwrap();
        let decoded = RdmMessage::decode(&encoded).unwrap();
        assert_eq!(decoded.dest_uid, msg.dest_uid);
        assert_eq!(decoded.pid, msg.pid);
        assert_eq!(decoded.parameter_data, msg.parameter_data);
    }

    #[test]
    fn rejects_oversize_parameter_data() {
        let mut msg = sample();
        msg.parameter_data = vec![0u8; RDM_MAX_PARAMETER_DATA_LENGTH + 1];
        assert_eq!(msg.encode(), Err(PduError::LengthOutOfBounds));
    }

    #[test]
    fn rejects_corrupted_checksum() {
        let mut encoded = sample().encode().unwrap();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;
        assert_eq!(RdmMessage::decode(&encoded), Err(PduError::NestedLengthMismatch));
    }

    #[test]
    fn ack_timer_is_rejected_as_forbidden() {
        assert!(ResponseType::from_u8(0x01).is_err());
    }

    #[test]
    fn nack_reason_reads_parameter_data() {
        let mut msg = sample();
        msg.command_class = CommandClass::GetCommandResponse;
        msg.port_id_or_response_type = ResponseType::NackReason.to_u8();
        msg.parameter_data = 0x0001u16.to_be_bytes().to_vec();
        assert_eq!(msg.nack_reason(), Some(1));
    }
}
