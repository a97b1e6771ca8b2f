// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Built-in mDNS/DNS-SD broker discovery (spec.md §4.3).
//!
//! No dependency on an external mDNS daemon: [`dns_message`] decodes the
//! wire records directly, [`txt`] interprets a broker's TXT record, and
//! [`resolver`] is the sans-IO browse-and-resolve state machine the
//! client session layer drives with received datagrams.

pub mod dns_message;
pub mod resolver;
pub mod txt;

pub use dns_message::{DnsError, DnsMessage, DomainName, RecordData, ResourceRecord};
pub use resolver::{DiscoveryEvent, Resolver};
pub use txt::BrokerTxtRecord;
