// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Network-interface enumeration and the lowest-MAC selection rule used
//! to seed generated CIDs (spec.md §4.2).
//!
//! Linux: parses `ip -4 addr show` for interface names/addresses and
//! `ip link show` for hardware addresses, the same way
//! `transport::multicast` parses `ip addr show` for SPDP/SEDP interface
//! discovery. Non-Linux platforms fall back to the `local_ip_address`
//! crate, which has no MAC-address API — on those platforms
//! [`NetintInfo::mac`] is always `None` and `lowest_mac` falls back to a
//! deterministic address derived from the interface's IPv4 address (see
//! `DESIGN.md`, "netint MAC discovery").

use std::io;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use crate::config::{LLRP_PORT, LLRP_REPLY_MULTICAST_V4, LLRP_REQUEST_MULTICAST_V4, MDNS_MULTICAST_V4, MDNS_PORT};

/// 48-bit hardware address, ordered so "numerically lowest MAC" (spec.md
/// §4.2) is a plain `min()` over this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MacAddr(pub [u8; 6]);

impl std::fmt::Display for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", b[0], b[1], b[2], b[3], b[4], b[5])
    }
}

/// Index into [`NetintService::interfaces`]; stable for the life of a
/// `NetintService` instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetintId(pub(crate) usize);

/// One discovered, non-loopback IPv4 network interface.
#[derive(Debug, Clone)]
pub struct NetintInfo {
    pub name: String,
    pub addr: Ipv4Addr,
    pub mac: Option<MacAddr>,
}

/// Enumerates local network interfaces and resolves the lowest-MAC
/// interface used as the default seed for generated identifiers.
#[derive(Debug)]
pub struct NetintService {
    interfaces: Vec<NetintInfo>,
}

impl NetintService {
    /// Enumerate interfaces now. Call again (replacing the old instance)
    /// to pick up interface changes; this core does not watch for them.
    pub fn discover() -> io::Result<Self> {
        let interfaces = discover_interfaces()?;
        Ok(Self { interfaces })
    }

    #[must_use]
    pub fn interfaces(&self) -> &[NetintInfo] {
        &self.interfaces
    }

    #[must_use]
    pub fn is_valid(&self, id: NetintId) -> bool {
        self.interfaces.get(id.0).is_some()
    }

    #[must_use]
    pub fn get(&self, id: NetintId) -> Option<&NetintInfo> {
        self.interfaces.get(id.0)
    }

    /// The interface with the numerically lowest MAC address, per
    /// spec.md §4.2's default UID/CID seed rule. Interfaces with no
    /// resolvable MAC are never selected unless none have one, in which
    /// case the first discovered interface is used.
    #[must_use]
    pub fn lowest_mac(&self) -> Option<(NetintId, MacAddr)> {
        let with_mac = self
            .interfaces
            .iter()
            .enumerate()
            .filter_map(|(i, info)| info.mac.map(|mac| (NetintId(i), mac)))
            .min_by_key(|(_, mac)| *mac);
        with_mac.or_else(|| {
            self.interfaces
                .first()
                .map(|info| (NetintId(0), info.mac.unwrap_or(fallback_mac(info.addr))))
        })
    }

    /// Bind a UDP socket and join it to the LLRP request and reply
    /// multicast groups (`239.255.250.133` / `239.255.250.85`) on every
    /// discovered interface, mirroring `join_multicast_group`'s
    /// all-interfaces join strategy.
    pub fn bind_llrp_multicast(&self) -> io::Result<UdpSocket> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, LLRP_PORT))?;
        let groups = [LLRP_REQUEST_MULTICAST_V4, LLRP_REPLY_MULTICAST_V4];

        if self.interfaces.is_empty() {
            for group in &groups {
                socket.join_multicast_v4(group, &Ipv4Addr::UNSPECIFIED)?;
            }
            return Ok(socket);
        }

        for info in &self.interfaces {
            for group in &groups {
                match socket.join_multicast_v4(group, &info.addr) {
                    Ok(()) => {
                        log::debug!("joined LLRP multicast group {group} on {}", info.name);
                    }
                    Err(e) if e.raw_os_error() == Some(98) => {
                        log::debug!("LLRP multicast group {group} already joined on {}", info.name);
                    }
                    Err(e) => {
                        log::debug!("join_multicast_v4({group}) on {} failed (non-fatal): {e}", info.name);
                    }
                }
            }
        }
        socket.set_multicast_loop_v4(true)?;
        Ok(socket)
    }

    /// Bind a UDP socket on [`MDNS_PORT`] and join the mDNS multicast
    /// group on every discovered interface, for browsing/resolving
    /// `_rdmnet._tcp` advertisements.
    pub fn bind_mdns_multicast(&self) -> io::Result<UdpSocket> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, MDNS_PORT))?;

        if self.interfaces.is_empty() {
            socket.join_multicast_v4(&MDNS_MULTICAST_V4, &Ipv4Addr::UNSPECIFIED)?;
            return Ok(socket);
        }

        for info in &self.interfaces {
            match socket.join_multicast_v4(&MDNS_MULTICAST_V4, &info.addr) {
                Ok(()) => log::debug!("joined mDNS multicast group on {}", info.name),
                Err(e) if e.raw_os_error() == Some(98) => {
                    log::debug!("mDNS multicast group already joined on {}", info.name);
                }
                Err(e) => log::debug!("join_multicast_v4(mDNS) on {} failed (non-fatal): {e}", info.name),
            }
        }
        socket.set_multicast_loop_v4(true)?;
        Ok(socket)
    }
}

/// Deterministic stand-in MAC used only when no platform MAC source is
/// available; the low 32 bits are the interface's IPv4 address so
/// selection stays stable across runs on the same host.
fn fallback_mac(addr: Ipv4Addr) -> MacAddr {
    let o = addr.octets();
    MacAddr([0x02, 0x00, o[0], o[1], o[2], o[3]])
}

fn discover_interfaces() -> io::Result<Vec<NetintInfo>> {
    if let Ok(var) = std::env::var("RDMNET_NETINT") {
        if let Ok(addr) = var.parse::<Ipv4Addr>() {
            log::debug!("using RDMNET_NETINT override: {addr}");
            return Ok(vec![NetintInfo { name: "override".to_string(), addr, mac: None }]);
        }
    }
    discover_interfaces_platform()
}

#[cfg(target_os = "linux")]
fn discover_interfaces_platform() -> io::Result<Vec<NetintInfo>> {
    use std::process::Command;

    let output = match Command::new("ip").args(["-4", "addr", "show"]).output() {
        Ok(o) => o,
        Err(_) => {
            log::debug!("'ip' command not found, using local_ip_address crate");
            return Ok(discover_interfaces_crate());
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut interfaces = Vec::new();
    let mut current_name: Option<String> = None;

    for line in stdout.lines() {
        if !line.starts_with(' ') {
            // "N: name: <FLAGS> ..." interface header line.
            current_name = line.split(':').nth(1).map(|s| s.trim().to_string());
            continue;
        }
        if line.contains("127.0.0.1") || line.contains("host lo") {
            continue;
        }
        if let Some(inet_part) = line.trim().strip_prefix("inet ") {
            if let Some(addr_str) = inet_part.split('/').next() {
                if let Ok(addr) = addr_str.trim().parse::<Ipv4Addr>() {
                    let name = current_name.clone().unwrap_or_else(|| "unknown".to_string());
                    let mac = mac_for_interface(&name);
                    interfaces.push(NetintInfo { name, addr, mac });
                }
            }
        }
    }

    Ok(interfaces)
}

#[cfg(target_os = "linux")]
fn mac_for_interface(name: &str) -> Option<MacAddr> {
    use std::process::Command;

    let output = Command::new("ip").args(["link", "show", name]).output().ok()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        if let Some(rest) = line.trim().strip_prefix("link/ether ") {
            let hex = rest.split_whitespace().next()?;
            return parse_mac(hex);
        }
    }
    None
}

fn parse_mac(text: &str) -> Option<MacAddr> {
    let mut bytes = [0u8; 6];
    let mut parts = text.split(':');
    for b in &mut bytes {
        *b = u8::from_str_radix(parts.next()?, 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(MacAddr(bytes))
}

#[cfg(not(target_os = "linux"))]
fn discover_interfaces_platform() -> io::Result<Vec<NetintInfo>> {
    Ok(discover_interfaces_crate())
}

fn discover_interfaces_crate() -> Vec<NetintInfo> {
    let interfaces = match local_ip_address::list_afinet_netifas() {
        Ok(ifs) => ifs,
        Err(e) => {
            log::debug!("failed to list network interfaces: {e}");
            return Vec::new();
        }
    };

    let mut out = Vec::new();
    for (name, ip) in interfaces {
        if let IpAddr::V4(addr) = ip {
            if !addr.is_loopback() {
                out.push(NetintInfo { name, addr, mac: None });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_parses_colon_hex() {
        assert_eq!(parse_mac("02:42:ac:11:00:02"), Some(MacAddr([0x02, 0x42, 0xac, 0x11, 0x00, 0x02])));
        assert_eq!(parse_mac("not-a-mac"), None);
    }

    #[test]
    fn mac_display_is_lowercase_colon_hex() {
        let mac = MacAddr([0x02, 0x42, 0xac, 0x11, 0x00, 0x02]);
        assert_eq!(mac.to_string(), "02:42:ac:11:00:02");
    }

    #[test]
    fn lowest_mac_picks_minimum() {
        let svc = NetintService {
            interfaces: vec![
                NetintInfo { name: "b".to_string(), addr: Ipv4Addr::new(10, 0, 0, 2), mac: Some(MacAddr([0, 0, 0, 0, 0, 9])) },
                NetintInfo { name: "a".to_string(), addr: Ipv4Addr::new(10, 0, 0, 1), mac: Some(MacAddr([0, 0, 0, 0, 0, 2])) },
            ],
        };
        let (id, mac) = svc.lowest_mac().unwrap();
        assert_eq!(id, NetintId(1));
        assert_eq!(mac, MacAddr([0, 0, 0, 0, 0, 2]));
    }

    #[test]
    fn lowest_mac_falls_back_when_none_resolved() {
        let svc = NetintService {
            interfaces: vec![NetintInfo { name: "eth0".to_string(), addr: Ipv4Addr::new(10, 0, 0, 5), mac: None }],
        };
        let (id, _mac) = svc.lowest_mac().unwrap();
        assert_eq!(id, NetintId(0));
    }
}
