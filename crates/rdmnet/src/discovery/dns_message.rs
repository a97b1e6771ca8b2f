// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Minimal DNS message parser/encoder covering the record types mDNS/
//! DNS-SD broker discovery needs: PTR, SRV, TXT, A, AAAA (spec.md §4.3).
//!
//! Domain-name comparison is label-wise and case-insensitive and follows
//! compression-pointer chains, per spec.md §4.3's explicit requirement
//! ("the implementation must compare by unpacking pointer references
//! against the original datagram") rather than comparing undecoded
//! label bytes.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    Truncated,
    BadPointer,
    BadLabel,
    UnsupportedRecordType(u16),
}

impl fmt::Display for DnsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "DNS message truncated"),
            Self::BadPointer => write!(f, "invalid compression pointer"),
            Self::BadLabel => write!(f, "invalid domain-name label"),
            Self::UnsupportedRecordType(t) => write!(f, "unsupported record type {t}"),
        }
    }
}

impl std::error::Error for DnsError {}

pub type DnsResult<T> = Result<T, DnsError>;

/// A domain name as a list of labels, already decoded through any
/// compression-pointer chain. Comparison is label-wise and
/// case-insensitive (spec.md §4.3).
#[derive(Debug, Clone, Default)]
pub struct DomainName(pub Vec<String>);

impl DomainName {
    #[must_use]
    pub fn from_str_dotted(s: &str) -> Self {
        Self(s.split('.').filter(|l| !l.is_empty()).map(str::to_string).collect())
    }

    #[must_use]
    pub fn ends_with(&self, suffix: &DomainName) -> bool {
        if suffix.0.len() > self.0.len() {
            return false;
        }
        let offset = self.0.len() - suffix.0.len();
        self.0[offset..].iter().zip(&suffix.0).all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        for label in &self.0 {
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
        out.push(0);
    }

    /// Parse a name starting at `offset`, following compression
    /// pointers against the full message `buf`. Returns the name and
    /// the offset immediately after it in the *original* (non-pointer)
    /// stream.
    fn parse(buf: &[u8], offset: usize) -> DnsResult<(Self, usize)> {
        let mut labels = Vec::new();
        let mut pos = offset;
        let mut end_of_record: Option<usize> = None;
        let mut hops = 0;

        loop {
            hops += 1;
            if hops > 128 {
                return Err(DnsError::BadPointer);
            }
            let len = *buf.get(pos).ok_or(DnsError::Truncated)? as usize;
            if len == 0 {
                pos += 1;
                if end_of_record.is_none() {
                    end_of_record = Some(pos);
                }
                break;
            }
            if len & 0xC0 == 0xC0 {
                let b2 = *buf.get(pos + 1).ok_or(DnsError::Truncated)? as usize;
                let pointer = ((len & 0x3F) << 8) | b2;
                if end_of_record.is_none() {
                    end_of_record = Some(pos + 2);
                }
                if pointer >= pos {
                    return Err(DnsError::BadPointer);
                }
                pos = pointer;
                continue;
            }
            let start = pos + 1;
            let stop = start + len;
            let bytes = buf.get(start..stop).ok_or(DnsError::Truncated)?;
            labels.push(String::from_utf8_lossy(bytes).into_owned());
            pos = stop;
        }

        Ok((Self(labels), end_of_record.unwrap_or(pos)))
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// One parsed resource-record, minus its name (kept alongside by the
/// caller).
#[derive(Debug, Clone)]
pub enum RecordData {
    Ptr(DomainName),
    Srv { priority: u16, weight: u16, port: u16, target: DomainName },
    Txt(Vec<(String, Vec<u8>)>),
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
}

#[derive(Debug, Clone)]
pub struct ResourceRecord {
    pub name: DomainName,
    pub ttl: u32,
    pub data: RecordData,
}

const TYPE_A: u16 = 1;
const TYPE_PTR: u16 = 12;
const TYPE_TXT: u16 = 16;
const TYPE_AAAA: u16 = 28;
const TYPE_SRV: u16 = 33;

/// A parsed DNS/mDNS message: question count is not retained since
/// discovery only cares about answer + additional records.
#[derive(Debug, Clone, Default)]
pub struct DnsMessage {
    pub records: Vec<ResourceRecord>,
}

impl DnsMessage {
    /// Parse every answer/authority/additional record in `buf`. Question
    /// records are skipped (this engine only resolves responses).
    pub fn decode(buf: &[u8]) -> DnsResult<Self> {
        if buf.len() < 12 {
            return Err(DnsError::Truncated);
        }
        let qdcount = u16::from_be_bytes([buf[4], buf[5]]) as usize;
        let ancount = u16::from_be_bytes([buf[6], buf[7]]) as usize;
        let nscount = u16::from_be_bytes([buf[8], buf[9]]) as usize;
        let arcount = u16::from_be_bytes([buf[10], buf[11]]) as usize;

        let mut pos = 12;
        for _ in 0..qdcount {
            let (_, after_name) = DomainName::parse(buf, pos)?;
            pos = after_name + 4; // QTYPE + QCLASS
        }

        let mut records = Vec::new();
        for _ in 0..(ancount + nscount + arcount) {
            let (name, after_name) = DomainName::parse(buf, pos)?;
            let header = buf.get(after_name..after_name + 10).ok_or(DnsError::Truncated)?;
            let rtype = u16::from_be_bytes([header[0], header[1]]);
            let ttl = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
            let rdlength = u16::from_be_bytes([header[8], header[9]]) as usize;
            let rdata_start = after_name + 10;
            let rdata = buf.get(rdata_start..rdata_start + rdlength).ok_or(DnsError::Truncated)?;

            let data = match rtype {
                TYPE_PTR => RecordData::Ptr(DomainName::parse(buf, rdata_start)?.0),
                TYPE_SRV => {
                    if rdata.len() < 6 {
                        return Err(DnsError::Truncated);
                    }
                    let priority = u16::from_be_bytes([rdata[0], rdata[1]]);
                    let weight = u16::from_be_bytes([rdata[2], rdata[3]]);
                    let port = u16::from_be_bytes([rdata[4], rdata[5]]);
                    let (target, _) = DomainName::parse(buf, rdata_start + 6)?;
                    RecordData::Srv { priority, weight, port, target }
                }
                TYPE_TXT => RecordData::Txt(parse_txt(rdata)),
                TYPE_A => {
                    if rdata.len() != 4 {
                        return Err(DnsError::Truncated);
                    }
                    RecordData::A(Ipv4Addr::new(rdata[0], rdata[1], rdata[2], rdata[3]))
                }
                TYPE_AAAA => {
                    if rdata.len() != 16 {
                        return Err(DnsError::Truncated);
                    }
                    let mut octets = [0u8; 16];
                    octets.copy_from_slice(rdata);
                    RecordData::Aaaa(Ipv6Addr::from(octets))
                }
                other => return Err(DnsError::UnsupportedRecordType(other)),
            };

            records.push(ResourceRecord { name, ttl, data });
            pos = rdata_start + rdlength;
        }

        Ok(Self { records })
    }
}

fn parse_txt(rdata: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < rdata.len() {
        let len = rdata[i] as usize;
        i += 1;
        if len == 0 || i + len > rdata.len() {
            break;
        }
        let entry = &rdata[i..i + len];
        i += len;
        match entry.iter().position(|&b| b == b'=') {
            Some(eq) => out.push((String::from_utf8_lossy(&entry[..eq]).into_owned(), entry[eq + 1..].to_vec())),
            None => out.push((String::from_utf8_lossy(entry).into_owned(), Vec::new())),
        }
    }
    out
}

/// Encode a minimal PTR query for `name`, used to kick off a browse.
#[must_use]
pub fn encode_ptr_query(name: &DomainName) -> Vec<u8> {
    let mut out = vec![0u8; 12];
    out[5] = 1; // QDCOUNT = 1
    name.encode(&mut out);
    out.extend_from_slice(&12u16.to_be_bytes()); // QTYPE PTR
    out.extend_from_slice(&1u16.to_be_bytes()); // QCLASS IN
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_message_with_ptr_and_pointer_srv() -> Vec<u8> {
        // Header: 0 questions, 2 answers.
        let mut buf = vec![0u8; 12];
        buf[7] = 2;

        // Answer 1: PTR "_rdmnet._tcp.local" -> "Test Service Instance._rdmnet._tcp.local"
        let service = DomainName::from_str_dotted("_rdmnet._tcp.local");
        service.encode(&mut buf);
        buf.extend_from_slice(&12u16.to_be_bytes()); // TYPE PTR
        buf.extend_from_slice(&1u16.to_be_bytes()); // CLASS IN
        buf.extend_from_slice(&120u32.to_be_bytes()); // TTL
        let rdata_len_pos = buf.len();
        buf.extend_from_slice(&0u16.to_be_bytes()); // placeholder RDLENGTH
        let rdata_start = buf.len();
        let instance = DomainName::from_str_dotted("Test Service Instance._rdmnet._tcp.local");
        instance.encode(&mut buf);
        let rdlen = (buf.len() - rdata_start) as u16;
        buf[rdata_len_pos..rdata_len_pos + 2].copy_from_slice(&rdlen.to_be_bytes());

        let instance_name_offset = rdata_start as u16;

        // Answer 2: SRV for the instance name, using a compression
        // pointer back to where the instance name was encoded above.
        buf.push(0xC0);
        buf.push(instance_name_offset as u8);
        buf.extend_from_slice(&33u16.to_be_bytes()); // TYPE SRV
        buf.extend_from_slice(&1u16.to_be_bytes()); // CLASS IN
        buf.extend_from_slice(&120u32.to_be_bytes()); // TTL
        let srv_rdata = {
            let mut r = Vec::new();
            r.extend_from_slice(&0u16.to_be_bytes()); // priority
            r.extend_from_slice(&0u16.to_be_bytes()); // weight
            r.extend_from_slice(&5569u16.to_be_bytes()); // port
            let target = DomainName::from_str_dotted("host.local");
            target.encode(&mut r);
            r
        };
        buf.extend_from_slice(&(srv_rdata.len() as u16).to_be_bytes());
        buf.extend_from_slice(&srv_rdata);

        buf
    }

    #[test]
    fn decodes_ptr_and_pointer_compressed_srv() {
        let buf = build_message_with_ptr_and_pointer_srv();
        let msg = DnsMessage::decode(&buf).unwrap();
        assert_eq!(msg.records.len(), 2);
        match &msg.records[0].data {
            RecordData::Ptr(name) => assert_eq!(name.to_string(), "Test Service Instance._rdmnet._tcp.local"),
            other => panic!("expected PTR, got {other:?}"),
        }
        match &msg.records[1].data {
            RecordData::Srv { port, target, .. } => {
                assert_eq!(*port, 5569);
                assert_eq!(target.to_string(), "host.local");
            }
            other => panic!("expected SRV, got {other:?}"),
        }
        assert_eq!(msg.records[1].name.to_string(), "Test Service Instance._rdmnet._tcp.local");
    }

    #[test]
    fn domain_name_equality_is_case_insensitive() {
        let a = DomainName::from_str_dotted("_RDMnet._tcp.LOCAL");
        let b = DomainName::from_str_dotted("_rdmnet._tcp.local");
        assert!(a.ends_with(&b));
    }

    #[test]
    fn txt_record_round_trips_key_value_pairs() {
        let mut rdata = Vec::new();
        for (k, v) in [("E133Scope", "default"), ("CID", "48eaee88")] {
            let entry = format!("{k}={v}");
            rdata.push(entry.len() as u8);
            rdata.extend_from_slice(entry.as_bytes());
        }
        let parsed = parse_txt(&rdata);
        assert_eq!(parsed[0], ("E133Scope".to_string(), b"default".to_vec()));
        assert_eq!(parsed[1], ("CID".to_string(), b"48eaee88".to_vec()));
    }

    #[test]
    fn zero_ttl_goodbye_record_still_decodes() {
        let mut buf = vec![0u8; 12];
        buf[7] = 1;
        let name = DomainName::from_str_dotted("_rdmnet._tcp.local");
        name.encode(&mut buf);
        buf.extend_from_slice(&12u16.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes()); // TTL = 0, goodbye
        let rdata_start_marker = buf.len();
        buf.extend_from_slice(&0u16.to_be_bytes());
        let rdata_start = buf.len();
        DomainName::from_str_dotted("Test Service Instance._rdmnet._tcp.local").encode(&mut buf);
        let rdlen = (buf.len() - rdata_start) as u16;
        buf[rdata_start_marker..rdata_start_marker + 2].copy_from_slice(&rdlen.to_be_bytes());

        let msg = DnsMessage::decode(&buf).unwrap();
        assert_eq!(msg.records[0].ttl, 0);
    }
}
