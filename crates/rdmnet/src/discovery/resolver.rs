// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Browse-and-resolve state machine for RDMnet broker discovery (spec.md
//! §4.3). Sans-IO: [`Resolver::on_packet`] takes already-received mDNS
//! bytes and a clock reading, and returns the [`DiscoveryEvent`]s to
//! surface to the client session layer — nothing here touches a socket,
//! the same seam [`crate::llrp::manager::DiscoveryEngine`] uses.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use crate::config::RDMNET_SERVICE_TYPE;
use crate::core::types::{DiscoveredBroker, Scope};
use crate::discovery::dns_message::{DnsMessage, DomainName, RecordData, ResourceRecord};
use crate::discovery::txt::BrokerTxtRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    BrokerResolved(Scope, String),
    BrokerLost(Scope, String),
}

#[derive(Debug, Default)]
struct PendingEntry {
    scope: Scope,
    instance_name: String,
    txt: Option<BrokerTxtRecord>,
    host: Option<String>,
    port: Option<u16>,
    addrs: Vec<IpAddr>,
    ttl: Duration,
}

/// Tracks monitored scopes (reference-counted, per spec.md §4.3) and the
/// pending/resolved broker instances discovered under them.
#[derive(Default)]
pub struct Resolver {
    monitored: HashMap<Scope, u32>,
    pending: HashMap<String, PendingEntry>,
    resolved: HashMap<String, DiscoveredBroker>,
}

impl Resolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or add a reference to) browsing for `scope`. Returns
    /// `true` the first time this scope becomes monitored — the caller
    /// should send the PTR query only on that transition.
    pub fn monitor_scope(&mut self, scope: Scope) -> bool {
        let count = self.monitored.entry(scope).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Drop one reference to `scope`. Returns `true` once the last
    /// reference is gone and the browse should stop.
    pub fn unmonitor_scope(&mut self, scope: &Scope) -> bool {
        let Some(count) = self.monitored.get_mut(scope) else { return false };
        *count -= 1;
        if *count == 0 {
            self.monitored.remove(scope);
            self.pending.retain(|_, entry| &entry.scope != scope);
            self.resolved.retain(|_, broker| &broker.scope != scope);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn resolved_brokers(&self) -> impl Iterator<Item = &DiscoveredBroker> {
        self.resolved.values()
    }

    /// Looks up a resolved broker by the fully-qualified DNS-SD instance
    /// name carried in [`DiscoveryEvent`] payloads.
    #[must_use]
    pub fn broker_by_instance(&self, fully_qualified_name: &str) -> Option<&DiscoveredBroker> {
        self.resolved.get(fully_qualified_name)
    }

    /// Parse one received mDNS/DNS-SD message and fold it into the
    /// pending/resolved tables.
    pub fn on_packet(&mut self, bytes: &[u8], now: Instant) -> Vec<DiscoveryEvent> {
        let Ok(msg) = DnsMessage::decode(bytes) else { return Vec::new() };
        let mut events = Vec::new();

        for record in &msg.records {
            match &record.data {
                RecordData::Ptr(instance) => self.handle_ptr(record, instance, now, &mut events),
                RecordData::Txt(pairs) => {
                    let key = record.name.to_string();
                    if let Some(entry) = self.pending.get_mut(&key) {
                        entry.txt = Some(BrokerTxtRecord::from_pairs(pairs));
                    }
                }
                RecordData::Srv { port, target, .. } => {
                    let key = record.name.to_string();
                    if let Some(entry) = self.pending.get_mut(&key) {
                        entry.host = Some(target.to_string());
                        entry.port = Some(*port);
                    }
                }
                RecordData::A(addr) => self.handle_address(&record.name, IpAddr::V4(*addr)),
                RecordData::Aaaa(addr) => self.handle_address(&record.name, IpAddr::V6(*addr)),
            }
        }

        events.extend(self.promote_ready_entries(now));
        events
    }

    fn handle_ptr(&mut self, record: &ResourceRecord, instance: &DomainName, now: Instant, events: &mut Vec<DiscoveryEvent>) {
        let Some(scope) = scope_for_subtype(&record.name) else { return };
        if !self.monitored.contains_key(&scope) {
            return;
        }
        let key = instance.to_string();

        if record.ttl == 0 {
            self.pending.remove(&key);
            if self.resolved.remove(&key).is_some() {
                events.push(DiscoveryEvent::BrokerLost(scope, key));
            }
            return;
        }

        let instance_name = instance.0.first().cloned().unwrap_or_default();
        let entry = self.pending.entry(key).or_insert_with(|| PendingEntry {
            scope: scope.clone(),
            instance_name,
            ttl: Duration::from_secs(u64::from(record.ttl)),
            ..Default::default()
        });
        entry.ttl = Duration::from_secs(u64::from(record.ttl));
        let _ = now;
    }

    fn handle_address(&mut self, name: &DomainName, addr: IpAddr) {
        let host = name.to_string();
        for entry in self.pending.values_mut() {
            if entry.host.as_deref() == Some(host.as_str()) && !entry.addrs.contains(&addr) {
                entry.addrs.push(addr);
            }
        }
    }

    fn promote_ready_entries(&mut self, now: Instant) -> Vec<DiscoveryEvent> {
        let mut events = Vec::new();
        let ready: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, e)| e.port.is_some() && !e.addrs.is_empty() && e.txt.as_ref().is_some_and(BrokerTxtRecord::is_complete))
            .map(|(k, _)| k.clone())
            .collect();

        for key in ready {
            let Some(entry) = self.pending.remove(&key) else { continue };
            let txt = entry.txt.expect("filtered above");
            let listen_addrs: Vec<SocketAddr> = entry.addrs.iter().map(|ip| SocketAddr::new(*ip, entry.port.expect("filtered above"))).collect();
            let broker = DiscoveredBroker {
                scope: entry.scope.clone(),
                service_instance_name: entry.instance_name.clone(),
                cid: txt.cid.expect("filtered above"),
                uid: txt.uid.expect("filtered above"),
                e133_version: txt.e133_vers.unwrap_or(1),
                listen_addrs,
                ttl: entry.ttl,
                last_seen: now,
            };
            events.push(DiscoveryEvent::BrokerResolved(entry.scope, key.clone()));
            self.resolved.insert(key, broker);
        }
        events
    }

    /// Age out entries whose TTL has elapsed since they were last
    /// refreshed (spec.md §4.3, "A TTL countdown timer ages each entry").
    pub fn expire(&mut self, now: Instant) -> Vec<DiscoveryEvent> {
        let expired: Vec<String> = self.resolved.iter().filter(|(_, b)| b.is_expired(now)).map(|(k, _)| k.clone()).collect();
        let mut events = Vec::new();
        for key in expired {
            if let Some(broker) = self.resolved.remove(&key) {
                events.push(DiscoveryEvent::BrokerLost(broker.scope.clone(), key));
            }
        }
        events
    }
}

/// Extracts the monitored scope from a DNS-SD subtype PTR name of the
/// form `<scope>._sub._rdmnet._tcp.local`.
fn scope_for_subtype(name: &DomainName) -> Option<Scope> {
    let service = DomainName::from_str_dotted(&format!("_sub.{RDMNET_SERVICE_TYPE}.local"));
    if name.0.len() <= service.0.len() {
        return None;
    }
    let suffix = DomainName(name.0[name.0.len() - service.0.len()..].to_vec());
    if !suffix.ends_with(&service) {
        return None;
    }
    let raw = &name.0[0];
    Scope::new(raw.trim_start_matches('_')).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::dns_message::encode_ptr_query;

    fn build_full_resolution(instance: &str, ttl: u32, scope: &str) -> Vec<u8> {
        let mut buf = vec![0u8; 12];
        buf[7] = 3; // 3 answers: PTR, SRV, TXT (+ 1 additional A)
        buf[11] = 1;

        let subtype = DomainName::from_str_dotted(&format!("_{scope}._sub._rdmnet._tcp.local"));
        subtype.encode(&mut buf);
        buf.extend_from_slice(&12u16.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&ttl.to_be_bytes());
        let instance_name = DomainName::from_str_dotted(&format!("{instance}._rdmnet._tcp.local"));
        let mut rdata = Vec::new();
        instance_name.encode(&mut rdata);
        buf.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        buf.extend_from_slice(&rdata);

        instance_name.encode(&mut buf);
        buf.extend_from_slice(&33u16.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&ttl.to_be_bytes());
        let mut srv_rdata = Vec::new();
        srv_rdata.extend_from_slice(&0u16.to_be_bytes());
        srv_rdata.extend_from_slice(&0u16.to_be_bytes());
        srv_rdata.extend_from_slice(&5569u16.to_be_bytes());
        DomainName::from_str_dotted("host.local").encode(&mut srv_rdata);
        buf.extend_from_slice(&(srv_rdata.len() as u16).to_be_bytes());
        buf.extend_from_slice(&srv_rdata);

        instance_name.encode(&mut buf);
        buf.extend_from_slice(&16u16.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&ttl.to_be_bytes());
        let mut txt_rdata = Vec::new();
        for (k, v) in [
            ("E133Scope", scope.to_string()),
            ("CID", "48eaee88-2d5e-43d4-b0e9-7a9d5977ae9d".to_string()),
            ("UID", "6574:12345678".to_string()),
        ] {
            let entry = format!("{k}={v}");
            txt_rdata.push(entry.len() as u8);
            txt_rdata.extend_from_slice(entry.as_bytes());
        }
        buf.extend_from_slice(&(txt_rdata.len() as u16).to_be_bytes());
        buf.extend_from_slice(&txt_rdata);

        DomainName::from_str_dotted("host.local").encode(&mut buf);
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&ttl.to_be_bytes());
        buf.extend_from_slice(&4u16.to_be_bytes());
        buf.extend_from_slice(&[10, 0, 0, 5]);

        buf
    }

    #[test]
    fn resolves_broker_once_srv_txt_and_address_seen() {
        let mut resolver = Resolver::new();
        let scope = Scope::default_scope();
        assert!(resolver.monitor_scope(scope.clone()));

        let _ = encode_ptr_query(&DomainName::from_str_dotted("_default._sub._rdmnet._tcp.local"));
        let packet = build_full_resolution("Test Service Instance", 120, "default");
        let events = resolver.on_packet(&packet, Instant::now());

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], DiscoveryEvent::BrokerResolved(s, name) if s == &scope && name == "Test Service Instance._rdmnet._tcp.local"));
        assert_eq!(resolver.resolved_brokers().count(), 1);
    }

    #[test]
    fn goodbye_ttl_zero_removes_resolved_entry() {
        let mut resolver = Resolver::new();
        let scope = Scope::default_scope();
        resolver.monitor_scope(scope.clone());
        resolver.on_packet(&build_full_resolution("Test Service Instance", 120, "default"), Instant::now());
        assert_eq!(resolver.resolved_brokers().count(), 1);

        let mut goodbye = vec![0u8; 12];
        goodbye[7] = 1;
        let subtype = DomainName::from_str_dotted("_default._sub._rdmnet._tcp.local");
        subtype.encode(&mut goodbye);
        goodbye.extend_from_slice(&12u16.to_be_bytes());
        goodbye.extend_from_slice(&1u16.to_be_bytes());
        goodbye.extend_from_slice(&0u32.to_be_bytes());
        let instance_name = DomainName::from_str_dotted("Test Service Instance._rdmnet._tcp.local");
        let mut rdata = Vec::new();
        instance_name.encode(&mut rdata);
        goodbye.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        goodbye.extend_from_slice(&rdata);

        let events = resolver.on_packet(&goodbye, Instant::now());
        assert_eq!(events, vec![DiscoveryEvent::BrokerLost(scope, "Test Service Instance._rdmnet._tcp.local".to_string())]);
        assert_eq!(resolver.resolved_brokers().count(), 0);
    }

    #[test]
    fn unmonitored_scope_ptr_is_ignored() {
        let mut resolver = Resolver::new();
        // No monitor_scope call at all.
        let events = resolver.on_packet(&build_full_resolution("Test Service Instance", 120, "default"), Instant::now());
        assert!(events.is_empty());
    }

    #[test]
    fn reference_counted_unmonitor_stops_on_last_release() {
        let mut resolver = Resolver::new();
        let scope = Scope::default_scope();
        assert!(resolver.monitor_scope(scope.clone()));
        assert!(!resolver.monitor_scope(scope.clone()));
        assert!(!resolver.unmonitor_scope(&scope));
        assert!(resolver.unmonitor_scope(&scope));
    }

    #[test]
    fn expire_removes_stale_resolved_entry() {
        let mut resolver = Resolver::new();
        let scope = Scope::default_scope();
        resolver.monitor_scope(scope.clone());
        let now = Instant::now();
        resolver.on_packet(&build_full_resolution("Test Service Instance", 1, "default"), now);
        assert_eq!(resolver.resolved_brokers().count(), 1);

        let events = resolver.expire(now + Duration::from_secs(2));
        assert_eq!(events.len(), 1);
        assert_eq!(resolver.resolved_brokers().count(), 0);
    }
}
