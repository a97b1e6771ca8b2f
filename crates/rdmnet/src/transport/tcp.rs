// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TCP connection to a broker: non-blocking stream, outbound send
//! queue, and a read-side reassembly buffer framed on the ACN root
//! layer's own declared length (no extra length-prefix framing is
//! needed — each root-layer PDU is self-delimiting, spec.md §4.1).

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::time::Instant;

use mio::net::TcpStream as MioTcpStream;

use crate::protocol::acn::TCP_PREAMBLE;

/// Lifecycle of one broker TCP connection (spec.md §5, connection state
/// machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Closed,
}

impl ConnectionState {
    #[must_use]
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::Connected)
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Per-connection counters surfaced through introspection/logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrokerConnectionStats {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// One TCP connection to a broker.
///
/// Read/write calls never block: callers drive this from the tick
/// thread's mio readiness events (see [`crate::core::rt::scheduler`]).
pub struct BrokerConnection {
    stream: MioTcpStream,
    remote_addr: SocketAddr,
    state: ConnectionState,
    stats: BrokerConnectionStats,
    connect_started: Instant,
    send_queue: VecDeque<u8>,
    recv_buf: Vec<u8>,
}

impl BrokerConnection {
    /// Begin a non-blocking connect to a broker's listen address.
    pub fn connect(remote_addr: SocketAddr) -> io::Result<Self> {
        let stream = MioTcpStream::connect(remote_addr)?;
        Ok(Self {
            stream,
            remote_addr,
            state: ConnectionState::Connecting,
            stats: BrokerConnectionStats::default(),
            connect_started: Instant::now(),
            send_queue: VecDeque::new(),
            recv_buf: Vec::new(),
        })
    }

    #[must_use]
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn stats(&self) -> BrokerConnectionStats {
        self.stats
    }

    #[must_use]
    pub fn connecting_since(&self) -> Instant {
        self.connect_started
    }

    pub fn stream_mut(&mut self) -> &mut MioTcpStream {
        &mut self.stream
    }

    /// Call once a writable-readiness event confirms the connect
    /// finished (mirrors the `mark_connected` transition after the
    /// first writable event on a connecting socket).
    pub fn mark_connected(&mut self) {
        if self.state == ConnectionState::Connecting {
            let _ = self.stream.set_nodelay(true);
            self.state = ConnectionState::Connected;
        }
    }

    /// Check whether a non-blocking connect has completed. Returns
    /// `Ok(true)` the first time the socket becomes writable with no
    /// pending error (and marks the connection `Connected`), `Ok(false)`
    /// while the connect is still in flight, and the socket error if it
    /// failed outright.
    pub fn poll_connect(&mut self) -> io::Result<bool> {
        if self.state != ConnectionState::Connecting {
            return Ok(self.state == ConnectionState::Connected);
        }
        if let Some(err) = self.stream.take_error()? {
            return Err(err);
        }
        match self.stream.peer_addr() {
            Ok(_) => {
                self.mark_connected();
                Ok(true)
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::NotConnected | io::ErrorKind::WouldBlock) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn close(&mut self) {
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        self.state = ConnectionState::Closed;
    }

    /// Queue raw bytes (a full, already-framed root-layer PDU) for
    /// sending; call [`Self::flush`] on writable readiness to push
    /// them to the socket.
    pub fn queue_send(&mut self, data: &[u8]) {
        self.send_queue.extend(data);
    }

    /// Push as much of the queued send buffer as the socket accepts
    /// without blocking.
    pub fn flush(&mut self) -> io::Result<()> {
        while !self.send_queue.is_empty() {
            let (front, _) = self.send_queue.as_slices();
            match self.stream.write(front) {
                Ok(0) => return Err(io::Error::new(io::ErrorKind::WriteZero, "broker connection closed")),
                Ok(n) => {
                    self.send_queue.drain(..n);
                    self.stats.bytes_sent += n as u64;
                    self.stats.messages_sent += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Read available bytes into the reassembly buffer, then split off
    /// every complete root-layer PDU it now contains. A PDU is complete
    /// once `recv_buf` holds at least the 3-byte flags+length prefix and
    /// at least `length` bytes total.
    pub fn recv_all(&mut self) -> io::Result<Vec<Vec<u8>>> {
        let mut chunk = [0u8; 4096];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    self.state = ConnectionState::Closed;
                    break;
                }
                Ok(n) => {
                    self.recv_buf.extend_from_slice(&chunk[..n]);
                    self.stats.bytes_received += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }

        let mut pdus = Vec::new();
        loop {
            // TCP preamble is only sent once, at connection start; once
            // stripped, every subsequent frame is a bare root-layer PDU.
            if self.recv_buf.starts_with(&TCP_PREAMBLE) {
                self.recv_buf.drain(..TCP_PREAMBLE.len());
                // 4-byte zero postamble-length field follows the preamble.
                if self.recv_buf.len() < 4 {
                    break;
                }
                self.recv_buf.drain(..4);
            }
            if self.recv_buf.len() < 3 {
                break;
            }
            let length = (u32::from(self.recv_buf[0] & 0x0F) << 16)
                | (u32::from(self.recv_buf[1]) << 8)
                | u32::from(self.recv_buf[2]);
            let length = length as usize;
            if length < 3 || self.recv_buf.len() < length {
                break;
            }
            pdus.push(self.recv_buf.drain(..length).collect());
            self.stats.messages_received += 1;
        }
        Ok(pdus)
    }
}

impl std::fmt::Debug for BrokerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerConnection")
            .field("remote_addr", &self.remote_addr)
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{TcpListener, TcpStream as StdTcpStream};

    fn pair() -> (BrokerConnection, StdTcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let conn = BrokerConnection::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        server.set_nonblocking(true).unwrap();
        (conn, server)
    }

    #[test]
    fn flush_sends_queued_bytes() {
        let (mut conn, mut server) = pair();
        conn.mark_connected();
        conn.queue_send(&[1, 2, 3, 4]);
        conn.flush().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(20));
        let mut buf = [0u8; 16];
        let n = server.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[1, 2, 3, 4]);
    }

    #[test]
    fn recv_all_splits_complete_pdus() {
        let (mut conn, mut server) = pair();
        conn.mark_connected();

        // Two minimal root-layer PDUs back to back, length=3 each (no body).
        let pdu = [0x70u8, 0x00, 0x03];
        server.write_all(&pdu).unwrap();
        server.write_all(&pdu).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));

        let pdus = conn.recv_all().unwrap();
        assert_eq!(pdus.len(), 2);
        assert_eq!(pdus[0], pdu);
    }

    #[test]
    fn recv_all_waits_for_partial_pdu() {
        let (mut conn, mut server) = pair();
        conn.mark_connected();
        server.write_all(&[0x70, 0x00]).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));

        let pdus = conn.recv_all().unwrap();
        assert!(pdus.is_empty());
    }
}
