//! Async UDP socket wrapper for Courier.
//!
//! Exposes the three primitives the protocol core consumes: `send_to`,
//! `recv_from`, and a readiness-wait-with-timeout receive.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::Mutex;

use crate::core::constants::RECV_BUFFER_SIZE;

/// Async UDP socket wrapper.
///
/// All methods take `&self` so one socket can be shared between the send
/// and acknowledgment activities; the receive buffer is reused across calls
/// under its own lock. The design assumes a single receive loop per socket.
#[derive(Debug)]
pub struct CourierSocket {
    /// The underlying UDP socket.
    socket: UdpSocket,
    /// Receive buffer, reused across receives.
    recv_buffer: Mutex<Vec<u8>>,
}

impl CourierSocket {
    /// Create a new socket bound to the given address.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self::from_socket(socket))
    }

    /// Create a Courier socket from an existing UDP socket.
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self {
            socket,
            recv_buffer: Mutex::new(vec![0u8; RECV_BUFFER_SIZE]),
        }
    }

    /// Get the local address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Send a datagram to a specific address.
    pub async fn send_to(&self, data: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(data, addr).await
    }

    /// Receive one datagram and return its bytes and the sender's address.
    pub async fn recv_from(&self) -> io::Result<(Vec<u8>, SocketAddr)> {
        let mut buf = self.recv_buffer.lock().await;
        let (len, addr) = self.socket.recv_from(&mut buf).await?;
        Ok((buf[..len].to_vec(), addr))
    }

    /// Wait up to `timeout` for one datagram.
    ///
    /// Returns `Ok(None)` when the wait elapses without traffic; a timeout
    /// is an expected outcome, not an error.
    pub async fn recv_timed(
        &self,
        timeout: Duration,
    ) -> io::Result<Option<(Vec<u8>, SocketAddr)>> {
        match tokio::time::timeout(timeout, self.recv_from()).await {
            Ok(result) => result.map(Some),
            Err(_elapsed) => Ok(None),
        }
    }
}
