// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end mDNS/DNS-SD broker resolution scenarios, feeding synthetic
//! DNS-SD response bytes straight to [`rdmnet::discovery::Resolver`]
//! (sans-IO — no socket involved).

use std::time::{Duration, Instant};

use rdmnet::discovery::{DiscoveryEvent, Resolver};
use rdmnet::Scope;

const SERVICE_INSTANCE: &str = "Test Service Instance";
const SCOPE: &str = "default";

/// Appends `name`'s dotted labels in DNS wire form (length-prefixed,
/// zero-terminated). No compression pointers — `Resolver` only requires
/// following them on decode, not emitting them.
fn encode_name(name: &str, buf: &mut Vec<u8>) {
    for label in name.split('.').filter(|l| !l.is_empty()) {
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
    }
    buf.push(0);
}

/// Builds a minimal DNS-SD response: PTR (subtype -> instance), SRV
/// (instance -> host:port), TXT (scope/CID/UID), and an A record for the
/// host, all sharing `ttl` seconds.
fn full_resolution_response(ttl: u32) -> Vec<u8> {
    let mut buf = vec![0u8; 12];
    buf[7] = 3; // PTR, SRV, TXT answers
    buf[11] = 1; // A additional record

    let instance_name = format!("{SERVICE_INSTANCE}._rdmnet._tcp.local");

    encode_name(&format!("_{SCOPE}._sub._rdmnet._tcp.local"), &mut buf);
    buf.extend_from_slice(&12u16.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes());
    buf.extend_from_slice(&ttl.to_be_bytes());
    let mut rdata = Vec::new();
    encode_name(&instance_name, &mut rdata);
    buf.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    buf.extend_from_slice(&rdata);

    encode_name(&instance_name, &mut buf);
    buf.extend_from_slice(&33u16.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes());
    buf.extend_from_slice(&ttl.to_be_bytes());
    let mut srv_rdata = Vec::new();
    srv_rdata.extend_from_slice(&0u16.to_be_bytes());
    srv_rdata.extend_from_slice(&0u16.to_be_bytes());
    srv_rdata.extend_from_slice(&5569u16.to_be_bytes());
    encode_name("broker-host.local", &mut srv_rdata);
    buf.extend_from_slice(&(srv_rdata.len() as u16).to_be_bytes());
    buf.extend_from_slice(&srv_rdata);

    encode_name(&instance_name, &mut buf);
    buf.extend_from_slice(&16u16.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes());
    buf.extend_from_slice(&ttl.to_be_bytes());
    let mut txt_rdata = Vec::new();
    for (k, v) in [
        ("E133Scope", SCOPE.to_string()),
        ("CID", "48eaee88-2d5e-43d4-b0e9-7a9d5977ae9d".to_string()),
        ("UID", "6574:12345678".to_string()),
    ] {
        let entry = format!("{k}={v}");
        txt_rdata.push(entry.len() as u8);
        txt_rdata.extend_from_slice(entry.as_bytes());
    }
    buf.extend_from_slice(&(txt_rdata.len() as u16).to_be_bytes());
    buf.extend_from_slice(&txt_rdata);

    encode_name("broker-host.local", &mut buf);
    buf.extend_from_slice(&1u16.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes());
    buf.extend_from_slice(&ttl.to_be_bytes());
    buf.extend_from_slice(&4u16.to_be_bytes());
    buf.extend_from_slice(&[10, 0, 0, 5]);

    buf
}

/// A bare goodbye PTR (TTL 0) for the same service instance.
fn goodbye_response() -> Vec<u8> {
    let mut buf = vec![0u8; 12];
    buf[7] = 1;
    encode_name(&format!("_{SCOPE}._sub._rdmnet._tcp.local"), &mut buf);
    buf.extend_from_slice(&12u16.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes());
    buf.extend_from_slice(&0u32.to_be_bytes());
    let mut rdata = Vec::new();
    encode_name(&format!("{SERVICE_INSTANCE}._rdmnet._tcp.local"), &mut rdata);
    buf.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    buf.extend_from_slice(&rdata);
    buf
}

/// Scenario 5: a PTR/SRV/TXT/A response for "Test Service Instance" with
/// TTL 120s inserts exactly one resolved broker with a 120000ms TTL.
#[test]
fn ptr_response_inserts_discovered_broker() {
    let mut resolver = Resolver::new();
    let scope = Scope::new(SCOPE).unwrap();
    assert!(resolver.monitor_scope(scope.clone()));

    let events = resolver.on_packet(&full_resolution_response(120), Instant::now());

    assert_eq!(events.len(), 1);
    let expected_name = format!("{SERVICE_INSTANCE}._rdmnet._tcp.local");
    assert_eq!(events[0], DiscoveryEvent::BrokerResolved(scope.clone(), expected_name.clone()));

    let brokers: Vec<_> = resolver.resolved_brokers().collect();
    assert_eq!(brokers.len(), 1);
    assert_eq!(brokers[0].service_instance_name, SERVICE_INSTANCE);
    assert_eq!(brokers[0].ttl, Duration::from_millis(120_000));
}

/// Scenario 6: a goodbye (TTL 0) for an already-resolved broker marks it
/// for removal; it is gone on the next observation.
#[test]
fn goodbye_removes_previously_discovered_broker() {
    let mut resolver = Resolver::new();
    let scope = Scope::new(SCOPE).unwrap();
    resolver.monitor_scope(scope.clone());
    resolver.on_packet(&full_resolution_response(120), Instant::now());
    assert_eq!(resolver.resolved_brokers().count(), 1);

    let events = resolver.on_packet(&goodbye_response(), Instant::now());

    let expected_name = format!("{SERVICE_INSTANCE}._rdmnet._tcp.local");
    assert_eq!(events, vec![DiscoveryEvent::BrokerLost(scope, expected_name)]);
    assert_eq!(resolver.resolved_brokers().count(), 0);
}
