//! Receiver reorder engine: classification, ack echoes, in-order delivery.
//!
//! One engine serves one peer from a single receive loop, so no lock is
//! needed around the stash. The peer address is pinned by the first DATA
//! packet; datagrams from anyone else are dropped.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::stash::{ReorderStash, StashOutcome};
use crate::core::{CourierError, DeliverySink};
use crate::transport::CourierSocket;
use crate::wire::{self, PacketHeader};

/// Outcome of handling one inbound datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// In-window DATA packet: acked, stashed, and `delivered` payloads
    /// handed to the sink by the sweep (zero while a gap remains).
    Accepted {
        /// Payload count released to the application by this packet.
        delivered: usize,
    },
    /// Stale duplicate (`seq` below expected): acked again, not delivered.
    StaleDuplicate,
    /// Beyond the receive window: dropped silently, no ack.
    OutOfWindow,
    /// Dropped without protocol action (malformed, non-DATA, or from an
    /// unexpected peer).
    Ignored,
}

/// Receiver reorder engine for one session (one peer).
#[derive(Debug)]
pub struct ReceiverEngine<D: DeliverySink> {
    socket: Arc<CourierSocket>,
    stash: ReorderStash,
    sink: D,
    /// The receiver's private outgoing-packet counter, bumped per ack sent.
    /// Exists only so DATA and ACK packets share one wire format.
    ack_seq: u32,
    /// Peer pinned by the first DATA packet.
    peer: Option<SocketAddr>,
    packets_delivered: u64,
    acks_sent: u64,
}

impl<D: DeliverySink> ReceiverEngine<D> {
    /// Create an engine delivering to `sink`, acking over `socket`.
    pub fn new(socket: Arc<CourierSocket>, window_size: usize, sink: D) -> Self {
        Self {
            socket,
            stash: ReorderStash::new(window_size),
            sink,
            ack_seq: 0,
            peer: None,
            packets_delivered: 0,
            acks_sent: 0,
        }
    }

    /// The sequence number the application is owed next.
    pub fn expected(&self) -> u32 {
        self.stash.expected()
    }

    /// Total payloads handed to the sink so far.
    pub fn packets_delivered(&self) -> u64 {
        self.packets_delivered
    }

    /// Total acknowledgments transmitted so far.
    pub fn acks_sent(&self) -> u64 {
        self.acks_sent
    }

    /// The peer pinned by the first DATA packet, if any.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// The socket this engine receives on and acks over.
    pub fn socket(&self) -> &CourierSocket {
        &self.socket
    }

    /// Handle one inbound datagram from `from`.
    ///
    /// Errors only when the delivery sink fails; every network-level
    /// problem is local recovery (drop, log, keep looping).
    pub async fn handle_datagram(
        &mut self,
        datagram: &[u8],
        from: SocketAddr,
    ) -> Result<ReceiveOutcome, CourierError> {
        let (header, payload) = match wire::decode(datagram) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!(%from, error = %e, "dropping malformed datagram");
                return Ok(ReceiveOutcome::Ignored);
            }
        };

        if !header.flags.is_data() {
            debug!(%from, flags = header.flags.as_byte(), "dropping non-data datagram");
            return Ok(ReceiveOutcome::Ignored);
        }

        // One sender per session: the first DATA packet pins the peer.
        match self.peer {
            None => self.peer = Some(from),
            Some(peer) if peer != from => {
                debug!(%from, %peer, "dropping datagram from unexpected peer");
                return Ok(ReceiveOutcome::Ignored);
            }
            Some(_) => {}
        }

        let seq = header.sequence_number;
        match self.stash.accept(seq, payload.to_vec()) {
            StashOutcome::Stale => {
                trace!(seq, expected = self.stash.expected(), "stale duplicate");
                self.ack_echo(seq, from).await;
                Ok(ReceiveOutcome::StaleDuplicate)
            }
            StashOutcome::OutOfWindow => {
                trace!(seq, expected = self.stash.expected(), "beyond window, dropped");
                Ok(ReceiveOutcome::OutOfWindow)
            }
            StashOutcome::Stored { delivered } => {
                self.ack_echo(seq, from).await;
                let count = delivered.len();
                for payload in delivered {
                    self.sink.deliver(&payload)?;
                    self.packets_delivered += 1;
                }
                trace!(
                    seq,
                    delivered = count,
                    expected = self.stash.expected(),
                    "data packet accepted"
                );
                Ok(ReceiveOutcome::Accepted { delivered: count })
            }
        }
    }

    /// Transmit an acknowledgment naming `seq` back to the sender.
    ///
    /// A failed ack is logged and forgotten: the sender's retransmission
    /// covers the loss either way.
    async fn ack_echo(&mut self, seq: u32, to: SocketAddr) {
        let header = PacketHeader::ack(self.ack_seq, seq);
        self.ack_seq = self.ack_seq.wrapping_add(1);

        let datagram = wire::encode(&header, &[]);
        match self.socket.send_to(&datagram, to).await {
            Ok(_) => self.acks_sent += 1,
            Err(e) => warn!(seq, error = %e, "ack transmit failed"),
        }
    }
}
