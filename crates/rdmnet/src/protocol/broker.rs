// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Broker PDU framing: the TCP handshake, client-list maintenance,
//! dynamic-UID request/assignment, disconnect and heartbeat messages
//! (spec.md §4.1, §4.4, §4.7).
//!
//! The `VECTOR_BROKER_*` vocabulary and `ClientEntryData` fields are
//! supplemented from `original_source`'s `broker_prot.h` /
//! `client_entry.h`, per `SPEC_FULL.md`'s "Supplemented features."

use super::acn::{pack_flags_and_length, unpack_flags_and_length};
use super::llrp::ComponentType;
use super::{pack_padded_string, unpack_padded_string, PduError, PduResult};
use crate::config::{SCOPE_STRING_PADDED_LENGTH, SEARCH_DOMAIN_PADDED_LENGTH};
use crate::core::cid::Cid;
use crate::core::uid::Uid;
use crate::error::RdmnetStatus;

const BROKER_HEADER_LEN: usize = 3 + 4;

/// Broker PDU vector (spec.md §4.1). Numeric assignments are an internal,
/// self-consistent choice documented in `DESIGN.md` as an open-question
/// resolution (see `protocol::acn`'s `RootVector` for the same caveat).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerVector {
    ClientConnect,
    ConnectReply,
    ClientEntryUpdate,
    RedirectV4,
    RedirectV6,
    ConnectedClientList,
    ClientAdd,
    ClientRemove,
    ClientEntryChange,
    RequestDynamicUids,
    AssignedDynamicUids,
    FetchDynamicUidList,
    Disconnect,
    Null,
}

impl BrokerVector {
    const TABLE: &'static [(BrokerVector, u32)] = &[
        (BrokerVector::ClientConnect, 1),
        (BrokerVector::ConnectReply, 2),
        (BrokerVector::ClientEntryUpdate, 3),
        (BrokerVector::RedirectV4, 4),
        (BrokerVector::RedirectV6, 5),
        (BrokerVector::ConnectedClientList, 6),
        (BrokerVector::ClientAdd, 7),
        (BrokerVector::ClientRemove, 8),
        (BrokerVector::ClientEntryChange, 9),
        (BrokerVector::RequestDynamicUids, 10),
        (BrokerVector::AssignedDynamicUids, 11),
        (BrokerVector::FetchDynamicUidList, 12),
        (BrokerVector::Disconnect, 13),
        (BrokerVector::Null, 14),
    ];

    #[must_use]
    pub fn to_u32(self) -> u32 {
        Self::TABLE.iter().find(|(v, _)| *v == self).map(|(_, n)| *n).expect("exhaustive table")
    }

    pub fn from_u32(value: u32) -> PduResult<Self> {
        Self::TABLE
            .iter()
            .find(|(_, n)| *n == value)
            .map(|(v, _)| *v)
            .ok_or(PduError::UnknownVector(value))
    }
}

/// The broker PDU envelope: flags+length, vector, then a vector-specific
/// payload.
#[derive(Debug, Clone)]
pub struct BrokerPdu {
    pub vector: BrokerVector,
    pub payload: Vec<u8>,
}

impl BrokerPdu {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let total_len = (BROKER_HEADER_LEN + self.payload.len()) as u32;
        let mut out = Vec::with_capacity(total_len as usize);
        out.extend_from_slice(&pack_flags_and_length(0x07, total_len));
        out.extend_from_slice(&self.vector.to_u32().to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn decode(bytes: &[u8]) -> PduResult<Self> {
        if bytes.len() < BROKER_HEADER_LEN {
            return Err(PduError::Truncated);
        }
        let (_, length) = unpack_flags_and_length([bytes[0], bytes[1], bytes[2]]);
        let length = length as usize;
        if length < BROKER_HEADER_LEN || length > bytes.len() {
            return Err(PduError::LengthOutOfBounds);
        }
        let vector = BrokerVector::from_u32(u32::from_be_bytes([bytes[3], bytes[4], bytes[5], bytes[6]]))?;
        Ok(Self { vector, payload: bytes[7..length].to_vec() })
    }
}

/// RPT client capability/identity fields carried in CLIENT_CONNECT,
/// CLIENT_ENTRY_UPDATE and every client-list message (supplemented from
/// `original_source`'s `client_entry.h`; spec.md §3 only says
/// "capability set").
#[derive(Debug, Clone, Copy)]
pub struct ClientEntryData {
    pub client_protocol_version: u16,
    pub client_cid: Cid,
    pub client_uid: Uid,
    pub component_type: ComponentType,
    /// `Cid::nil()` when the client is not bound to a specific peer CID.
    pub binding_cid: Cid,
}

const CLIENT_ENTRY_LEN: usize = 2 + 16 + 6 + 1 + 16;

impl ClientEntryData {
    #[must_use]
    pub fn encode(&self) -> [u8; CLIENT_ENTRY_LEN] {
        let mut out = [0u8; CLIENT_ENTRY_LEN];
        out[0..2].copy_from_slice(&self.client_protocol_version.to_be_bytes());
        out[2..18].copy_from_slice(&self.client_cid.as_bytes());
        out[18..24].copy_from_slice(&self.client_uid.to_wire());
        out[24] = self.component_type.to_u8();
        out[25..41].copy_from_slice(&self.binding_cid.as_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> PduResult<Self> {
        if bytes.len() < CLIENT_ENTRY_LEN {
            return Err(PduError::Truncated);
        }
        let client_protocol_version = u16::from_be_bytes([bytes[0], bytes[1]]);
        let mut cid_bytes = [0u8; 16];
        cid_bytes.copy_from_slice(&bytes[2..18]);
        let client_uid = Uid::from_wire(bytes[18..24].try_into().expect("6 bytes"));
        let component_type = ComponentType::from_u8(bytes[24]);
        let mut binding_bytes = [0u8; 16];
        binding_bytes.copy_from_slice(&bytes[25..41]);
        Ok(Self {
            client_protocol_version,
            client_cid: Cid::from_bytes(cid_bytes),
            client_uid,
            component_type,
            binding_cid: Cid::from_bytes(binding_bytes),
        })
    }
}

/// CLIENT_CONNECT payload: scope, E1.33 version, search domain, and the
/// sending client's entry.
#[derive(Debug, Clone)]
pub struct ClientConnectMsg {
    pub scope: String,
    pub e133_version: u16,
    pub search_domain: String,
    pub client_entry: ClientEntryData,
}

impl ClientConnectMsg {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            SCOPE_STRING_PADDED_LENGTH + 2 + SEARCH_DOMAIN_PADDED_LENGTH + CLIENT_ENTRY_LEN,
        );
        out.extend_from_slice(&pack_padded_string(&self.scope, SCOPE_STRING_PADDED_LENGTH));
        out.extend_from_slice(&self.e133_version.to_be_bytes());
        out.extend_from_slice(&pack_padded_string(&self.search_domain, SEARCH_DOMAIN_PADDED_LENGTH));
        out.extend_from_slice(&self.client_entry.encode());
        out
    }

    pub fn decode(bytes: &[u8]) -> PduResult<Self> {
        let scope_end = SCOPE_STRING_PADDED_LENGTH;
        let version_end = scope_end + 2;
        let domain_end = version_end + SEARCH_DOMAIN_PADDED_LENGTH;
        if bytes.len() < domain_end + CLIENT_ENTRY_LEN {
            return Err(PduError::Truncated);
        }
        let scope = unpack_padded_string(&bytes[..scope_end])?;
        let e133_version = u16::from_be_bytes([bytes[scope_end], bytes[scope_end + 1]]);
        let search_domain = unpack_padded_string(&bytes[version_end..domain_end])?;
        let client_entry = ClientEntryData::decode(&bytes[domain_end..])?;
        Ok(Self { scope, e133_version, search_domain, client_entry })
    }
}

/// CONNECT_REPLY payload.
#[derive(Debug, Clone, Copy)]
pub struct ConnectReplyMsg {
    pub status: Result<(), RdmnetStatus>,
    pub e133_version: u16,
    pub broker_cid: Cid,
    pub broker_uid: Uid,
}

impl ConnectReplyMsg {
    #[must_use]
    pub fn encode(&self) -> [u8; 2 + 2 + 16 + 6] {
        let mut out = [0u8; 26];
        let code: u16 = self.status.err().map_or(0, |s| s.to_u16());
        out[0..2].copy_from_slice(&code.to_be_bytes());
        out[2..4].copy_from_slice(&self.e133_version.to_be_bytes());
        out[4..20].copy_from_slice(&self.broker_cid.as_bytes());
        out[20..26].copy_from_slice(&self.broker_uid.to_wire());
        out
    }

    pub fn decode(bytes: &[u8]) -> PduResult<Self> {
        if bytes.len() < 26 {
            return Err(PduError::Truncated);
        }
        let code = u16::from_be_bytes([bytes[0], bytes[1]]);
        let status = if code == 0 { Ok(()) } else { Err(RdmnetStatus::from_u16(code)) };
        let e133_version = u16::from_be_bytes([bytes[2], bytes[3]]);
        let mut cid_bytes = [0u8; 16];
        cid_bytes.copy_from_slice(&bytes[4..20]);
        let broker_uid = Uid::from_wire(bytes[20..26].try_into().expect("6 bytes"));
        Ok(Self {
            status,
            e133_version,
            broker_cid: Cid::from_bytes(cid_bytes),
            broker_uid,
        })
    }
}

/// Reason accompanying a DISCONNECT message, sent by either peer
/// (supplemented from `original_source`'s disconnect vector payload).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    ShuttingDown,
    Capacity,
    HardwareFault,
    SoftwareFault,
    Incompatible,
}

impl DisconnectReason {
    #[must_use]
    pub fn to_u16(self) -> u16 {
        match self {
            Self::ShuttingDown => 0,
            Self::Capacity => 1,
            Self::HardwareFault => 2,
            Self::SoftwareFault => 3,
            Self::Incompatible => 4,
        }
    }

    #[must_use]
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => Self::Capacity,
            2 => Self::HardwareFault,
            3 => Self::SoftwareFault,
            4 => Self::Incompatible,
            _ => Self::ShuttingDown,
        }
    }

    #[must_use]
    pub fn encode(self) -> [u8; 2] {
        self.to_u16().to_be_bytes()
    }

    pub fn decode(bytes: &[u8]) -> PduResult<Self> {
        if bytes.len() < 2 {
            return Err(PduError::Truncated);
        }
        Ok(Self::from_u16(u16::from_be_bytes([bytes[0], bytes[1]])))
    }
}

/// REDIRECT_V4/REDIRECT_V6 payload: the new listen address to connect to.
#[derive(Debug, Clone, Copy)]
pub struct RedirectMsg {
    pub addr: std::net::SocketAddr,
}

impl RedirectMsg {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self.addr {
            std::net::SocketAddr::V4(v4) => {
                let mut out = Vec::with_capacity(6);
                out.extend_from_slice(&v4.ip().octets());
                out.extend_from_slice(&v4.port().to_be_bytes());
                out
            }
            std::net::SocketAddr::V6(v6) => {
                let mut out = Vec::with_capacity(18);
                out.extend_from_slice(&v6.ip().octets());
                out.extend_from_slice(&v6.port().to_be_bytes());
                out
            }
        }
    }

    /// Decode assuming an IPv4 address (REDIRECT_V4 vector).
    pub fn decode_v4(bytes: &[u8]) -> PduResult<Self> {
        if bytes.len() < 6 {
            return Err(PduError::Truncated);
        }
        let ip = std::net::Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
        let port = u16::from_be_bytes([bytes[4], bytes[5]]);
        Ok(Self { addr: (ip, port).into() })
    }

    /// Decode assuming an IPv6 address (REDIRECT_V6 vector).
    pub fn decode_v6(bytes: &[u8]) -> PduResult<Self> {
        if bytes.len() < 18 {
            return Err(PduError::Truncated);
        }
        let mut octets = [0u8; 16];
        octets.copy_from_slice(&bytes[0..16]);
        let ip = std::net::Ipv6Addr::from(octets);
        let port = u16::from_be_bytes([bytes[16], bytes[17]]);
        Ok(Self { addr: (ip, port).into() })
    }
}

/// One `(RID, assigned UID)` mapping inside a dynamic-UID request or
/// assignment list. RID is a 128-bit responder identifier — wire-
/// identical to a CID, so this core reuses [`Cid`] rather than define a
/// near-duplicate 16-byte type.
#[derive(Debug, Clone, Copy)]
pub struct DynamicUidMapping {
    pub rid: Cid,
    pub assigned_uid: Option<Uid>,
    pub status: Option<RdmnetStatus>,
}

impl DynamicUidMapping {
    #[must_use]
    pub fn encode(&self) -> [u8; 16 + 6 + 2] {
        let mut out = [0u8; 24];
        out[0..16].copy_from_slice(&self.rid.as_bytes());
        out[16..22].copy_from_slice(&self.assigned_uid.unwrap_or(Uid::new(0, 0)).to_wire());
        let code = self.status.map_or(0, |s| s.to_u16());
        out[22..24].copy_from_slice(&code.to_be_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> PduResult<Self> {
        if bytes.len() < 24 {
            return Err(PduError::Truncated);
        }
        let mut rid_bytes = [0u8; 16];
        rid_bytes.copy_from_slice(&bytes[0..16]);
        let uid = Uid::from_wire(bytes[16..22].try_into().expect("6 bytes"));
        let code = u16::from_be_bytes([bytes[22], bytes[23]]);
        Ok(Self {
            rid: Cid::from_bytes(rid_bytes),
            assigned_uid: if code == 0 { Some(uid) } else { None },
            status: if code == 0 { None } else { Some(RdmnetStatus::from_u16(code)) },
        })
    }
}

/// One entry of a REQUEST_DYNAMIC_UIDS list: the manufacturer ID a UID
/// should be drawn from, plus the responder's stable RID (supplemented
/// from `original_source`'s `DynamicUidRequestListEntry`).
#[derive(Debug, Clone, Copy)]
pub struct DynamicUidRequestEntry {
    pub manufacturer_id: u16,
    pub rid: Cid,
}

/// REQUEST_DYNAMIC_UIDS / ASSIGNED_DYNAMIC_UIDS payload. `more_coming`
/// signals the list continues in a following PDU when it would not fit
/// in one (spec.md §4.7).
#[derive(Debug, Clone)]
pub struct DynamicUidRequestListMsg {
    pub more_coming: bool,
    pub requests: Vec<DynamicUidRequestEntry>,
}

impl DynamicUidRequestListMsg {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.requests.len() * 18);
        out.push(u8::from(self.more_coming));
        for entry in &self.requests {
            out.extend_from_slice(&entry.manufacturer_id.to_be_bytes());
            out.extend_from_slice(entry.rid.as_bytes());
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> PduResult<Self> {
        if bytes.is_empty() {
            return Err(PduError::Truncated);
        }
        let more_coming = bytes[0] != 0;
        let rest = &bytes[1..];
        if rest.len() % 18 != 0 {
            return Err(PduError::LengthOutOfBounds);
        }
        let requests = rest
            .chunks_exact(18)
            .map(|chunk| {
                let manufacturer_id = u16::from_be_bytes([chunk[0], chunk[1]]);
                let mut rid_bytes = [0u8; 16];
                rid_bytes.copy_from_slice(&chunk[2..18]);
                DynamicUidRequestEntry { manufacturer_id, rid: Cid::from_bytes(rid_bytes) }
            })
            .collect();
        Ok(Self { more_coming, requests })
    }
}

/// ASSIGNED_DYNAMIC_UIDS payload: a `more_coming`-chained list of
/// [`DynamicUidMapping`]s.
#[derive(Debug, Clone)]
pub struct DynamicUidAssignmentListMsg {
    pub more_coming: bool,
    pub mappings: Vec<DynamicUidMapping>,
}

impl DynamicUidAssignmentListMsg {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.mappings.len() * 24);
        out.push(u8::from(self.more_coming));
        for mapping in &self.mappings {
            out.extend_from_slice(&mapping.encode());
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> PduResult<Self> {
        if bytes.is_empty() {
            return Err(PduError::Truncated);
        }
        let more_coming = bytes[0] != 0;
        let rest = &bytes[1..];
        if rest.len() % 24 != 0 {
            return Err(PduError::LengthOutOfBounds);
        }
        let mappings = rest.chunks_exact(24).map(DynamicUidMapping::decode).collect::<PduResult<Vec<_>>>()?;
        Ok(Self { more_coming, mappings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cid(b: u8) -> Cid {
        Cid::from_bytes([b; 16])
    }

    #[test]
    fn broker_pdu_round_trips() {
        let pdu = BrokerPdu { vector: BrokerVector::Null, payload: vec![] };
        let encoded = pdu.encode();
        let decoded = BrokerPdu::decode(&encoded).unwrap();
        assert_eq!(decoded.vector, BrokerVector::Null);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn client_entry_round_trips() {
        let entry = ClientEntryData {
            client_protocol_version: 1,
            client_cid: sample_cid(0x42),
            client_uid: Uid::new(0x6574, 7),
            component_type: ComponentType::RptController,
            binding_cid: Cid::nil(),
        };
        let decoded = ClientEntryData::decode(&entry.encode()).unwrap();
        assert_eq!(decoded.client_uid, entry.client_uid);
        assert_eq!(decoded.component_type, ComponentType::RptController);
    }

    #[test]
    fn client_connect_round_trips() {
        let msg = ClientConnectMsg {
            scope: "default".to_string(),
            e133_version: 1,
            search_domain: "local.".to_string(),
            client_entry: ClientEntryData {
                client_protocol_version: 1,
                client_cid: sample_cid(0x11),
                client_uid: Uid::dynamic_request(0x6574),
                component_type: ComponentType::RptController,
                binding_cid: Cid::nil(),
            },
        };
        let decoded = ClientConnectMsg::decode(&msg.encode()).unwrap();
        assert_eq!(decoded.scope, "default");
        assert_eq!(decoded.search_domain, "local.");
        assert_eq!(decoded.client_entry.client_uid, msg.client_entry.client_uid);
    }

    #[test]
    fn connect_reply_round_trips_ok_and_error() {
        let ok = ConnectReplyMsg {
            status: Ok(()),
            e133_version: 1,
            broker_cid: sample_cid(0x22),
            broker_uid: Uid::new(0x6574, 99),
        };
        assert_eq!(ConnectReplyMsg::decode(&ok.encode()).unwrap().status, Ok(()));

        let err = ConnectReplyMsg { status: Err(RdmnetStatus::ScopeMismatch), ..ok };
        assert_eq!(
            ConnectReplyMsg::decode(&err.encode()).unwrap().status,
            Err(RdmnetStatus::ScopeMismatch)
        );
    }

    #[test]
    fn redirect_v4_round_trips() {
        let msg = RedirectMsg { addr: "10.0.0.5:5569".parse().unwrap() };
        let decoded = RedirectMsg::decode_v4(&msg.encode()).unwrap();
        assert_eq!(decoded.addr, msg.addr);
    }

    #[test]
    fn dynamic_uid_mapping_round_trips_success_and_failure() {
        let ok = DynamicUidMapping {
            rid: sample_cid(0x33),
            assigned_uid: Some(Uid::new(0x6574 | 0x8000, 55)),
            status: None,
        };
        let decoded = DynamicUidMapping::decode(&ok.encode()).unwrap();
        assert_eq!(decoded.assigned_uid, ok.assigned_uid);

        let failed = DynamicUidMapping {
            rid: sample_cid(0x44),
            assigned_uid: None,
            status: Some(RdmnetStatus::CapacityExceeded),
        };
        let decoded = DynamicUidMapping::decode(&failed.encode()).unwrap();
        assert_eq!(decoded.status, Some(RdmnetStatus::CapacityExceeded));
    }

    #[test]
    fn dynamic_uid_request_list_round_trips_and_carries_more_coming() {
        let msg = DynamicUidRequestListMsg {
            more_coming: true,
            requests: vec![
                DynamicUidRequestEntry { manufacturer_id: 0x6574, rid: sample_cid(0x55) },
                DynamicUidRequestEntry { manufacturer_id: 0x6574, rid: sample_cid(0x66) },
            ],
        };
        let decoded = DynamicUidRequestListMsg::decode(&msg.encode()).unwrap();
        assert!(decoded.more_coming);
        assert_eq!(decoded.requests.len(), 2);
        assert_eq!(decoded.requests[0].manufacturer_id, 0x6574);
    }

    #[test]
    fn dynamic_uid_assignment_list_round_trips() {
        let msg = DynamicUidAssignmentListMsg {
            more_coming: false,
            mappings: vec![DynamicUidMapping {
                rid: sample_cid(0x77),
                assigned_uid: Some(Uid::new(0x6574 | 0x8000, 1)),
                status: None,
            }],
        };
        let decoded = DynamicUidAssignmentListMsg::decode(&msg.encode()).unwrap();
        assert!(!decoded.more_coming);
        assert_eq!(decoded.mappings[0].assigned_uid, msg.mappings[0].assigned_uid);
    }
}
