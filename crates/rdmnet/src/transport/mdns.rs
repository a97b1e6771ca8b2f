// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UDP transport for mDNS/DNS-SD broker discovery (spec.md §4.3).
//!
//! Mirrors [`crate::transport::udp::LlrpSocket`]: one non-blocking
//! socket, multicast-joined on every discovered interface, shared
//! between the query sender and the read-side poller.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;

use crate::config::{MDNS_MULTICAST_V4, MDNS_PORT};

use super::netint::NetintService;

/// Shared, non-blocking UDP socket used for mDNS query/response traffic.
#[derive(Debug)]
pub struct MdnsSocket {
    socket: Arc<UdpSocket>,
}

impl MdnsSocket {
    /// Bind the mDNS socket and join the standard multicast group on
    /// every discovered interface.
    pub fn bind(netints: &NetintService) -> io::Result<Self> {
        let socket = netints.bind_mdns_multicast()?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket: Arc::new(socket) })
    }

    pub fn send_to(&self, data: &[u8], dest: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(data, dest)
    }

    /// Send `data` (a PTR query) to the standard mDNS multicast group.
    pub fn send_query(&self, data: &[u8]) -> io::Result<usize> {
        self.send_to(data, SocketAddr::from((MDNS_MULTICAST_V4, MDNS_PORT)))
    }

    /// Non-blocking receive. Returns `Ok(None)` on `WouldBlock`.
    pub fn try_recv_from(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.socket.recv_from(buf) {
            Ok((n, addr)) => Ok(Some((n, addr))),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
impl MdnsSocket {
    /// Test-only constructor bypassing multicast join, which needs
    /// network privileges a sandboxed test runner may not have.
    fn from_bound(socket: UdpSocket) -> Self {
        socket.set_nonblocking(true).expect("set_nonblocking");
        Self { socket: Arc::new(socket) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_and_recv_round_trip_over_loopback() {
        let a = MdnsSocket::from_bound(UdpSocket::bind("127.0.0.1:0").unwrap());
        let b = MdnsSocket::from_bound(UdpSocket::bind("127.0.0.1:0").unwrap());
        let b_addr = b.socket.local_addr().unwrap();

        a.socket.send_to(b"query", b_addr).unwrap();

        let mut buf = [0u8; 16];
        let mut received = None;
        for _ in 0..100 {
            if let Some((n, _addr)) = b.try_recv_from(&mut buf).unwrap() {
                received = Some(buf[..n].to_vec());
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(received, Some(b"query".to_vec()));
    }
}
