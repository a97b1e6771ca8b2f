// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed view over a broker's TXT record key/value pairs (spec.md §4.3).

use crate::core::cid::Cid;
use crate::core::uid::Uid;

/// The broker attributes carried in a service instance's TXT record.
#[derive(Debug, Clone, Default)]
pub struct BrokerTxtRecord {
    pub txt_vers: Option<u32>,
    pub e133_scope: Option<String>,
    pub e133_vers: Option<u16>,
    pub cid: Option<Cid>,
    pub uid: Option<Uid>,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
}

impl BrokerTxtRecord {
    #[must_use]
    pub fn from_pairs(pairs: &[(String, Vec<u8>)]) -> Self {
        let mut out = Self::default();
        for (key, value) in pairs {
            let text = String::from_utf8_lossy(value);
            match key.as_str() {
                "TxtVers" => out.txt_vers = text.parse().ok(),
                "E133Scope" => out.e133_scope = Some(text.into_owned()),
                "E133Vers" => out.e133_vers = text.parse().ok(),
                "CID" => out.cid = parse_cid(&text),
                "UID" => out.uid = parse_uid(&text),
                "Model" => out.model = Some(text.into_owned()),
                "Manuf" => out.manufacturer = Some(text.into_owned()),
                _ => {}
            }
        }
        out
    }

    /// `true` once the fields the session layer needs to trust this
    /// broker are all present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.e133_scope.is_some() && self.cid.is_some() && self.uid.is_some()
    }
}

fn parse_cid(text: &str) -> Option<Cid> {
    let hex: String = text.chars().filter(|c| *c != '-').collect();
    if hex.len() != 32 {
        return None;
    }
    let mut bytes = [0u8; 16];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(Cid::from_bytes(bytes))
}

fn parse_uid(text: &str) -> Option<Uid> {
    let (manuf, device) = text.split_once(':')?;
    Some(Uid::new(u16::from_str_radix(manuf, 16).ok()?, u32::from_str_radix(device, 16).ok()?))
}
