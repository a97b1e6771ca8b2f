// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UDP transport for LLRP discovery traffic (spec.md §4.2).
//!
//! LLRP PDUs are exchanged over a single UDP socket bound to
//! `LLRP_PORT`, multicast-joined to both the request and reply groups,
//! with unicast sends used for PROBE_REPLY/REPLY traffic back to the
//! originating manager.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;

use super::netint::NetintService;

/// Shared, non-blocking UDP socket used for LLRP request/reply traffic.
///
/// Cloning via [`Self::socket`] hands out another `Arc` to the same
/// underlying socket, so a read-side poller and a write-side caller can
/// share it without contention beyond what the OS socket already
/// serializes.
#[derive(Debug)]
pub struct LlrpSocket {
    socket: Arc<UdpSocket>,
}

impl LlrpSocket {
    /// Bind the LLRP socket and join it to the standard multicast
    /// groups on every discovered interface.
    pub fn bind(netints: &NetintService) -> io::Result<Self> {
        let socket = netints.bind_llrp_multicast()?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket: Arc::new(socket) })
    }

    #[must_use]
    pub fn socket(&self) -> Arc<UdpSocket> {
        Arc::clone(&self.socket)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn send_to(&self, data: &[u8], dest: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(data, dest)
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
impl LlrpSocket {
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
        let a = LlrpSocket::from_bound(UdpSocket::bind("127.0.0.1:0").unwrap());
        let b = LlrpSocket::from_bound(UdpSocket::bind("127.0.0.1:0").unwrap());
        let b_addr = b.local_addr().unwrap();

        a.send_to(b"hello", b_addr).unwrap();

        let mut buf = [0u8; 16];
        let mut received = None;
        for _ in 0..100 {
            if let Some((n, _addr)) = b.try_recv_from(&mut buf).unwrap() {
                received = Some(buf[..n].to_vec());
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(received, Some(b"hello".to_vec()));
    }

    #[test]
    fn try_recv_from_returns_none_when_empty() {
        let sock = LlrpSocket::from_bound(UdpSocket::bind("127.0.0.1:0").unwrap());
        let mut buf = [0u8; 16];
        assert!(sock.try_recv_from(&mut buf).unwrap().is_none());
    }
}
