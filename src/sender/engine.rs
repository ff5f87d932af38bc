//! Sender window engine: admission, acknowledgment polling, retransmission.
//!
//! [`SenderEngine`] couples the pure [`SlidingWindow`] state to the socket.
//! It is shared (`Arc`) between the two sender-side activities, the
//! input/send loop and the poll/ack/retransmit loop, which synchronize on
//! one lock over the window and the local sequence counter. The lock is
//! held only for the critical section mutating window state plus the
//! transmit syscall itself, never across a full acknowledgment wait.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use super::window::SlidingWindow;
use crate::core::constants::{
    DEFAULT_POLL_TIMEOUT, DEFAULT_RETRANSMIT_AGE, DEFAULT_WINDOW_SIZE, MAX_PAYLOAD_SIZE,
};
use crate::core::StatsSink;
use crate::transport::{CourierSocket, TransportError, TransportResult};
use crate::wire;

/// Outcome of one [`SenderEngine::send`] attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The packet was transmitted and is now in flight under this sequence
    /// number.
    Admitted(u32),
    /// The window is at capacity; retry after the next acknowledgment.
    /// Never blocks.
    WindowFull,
    /// The socket write failed; the caller may retry the same payload.
    TransmitFailed,
}

/// Outcome of one [`SenderEngine::poll_for_ack`] cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// An acknowledgment for this sequence number arrived and was processed.
    Acked(u32),
    /// The wait elapsed; a retransmission pass has already run.
    Timeout,
    /// A datagram arrived but was dropped (malformed or not an ACK).
    Ignored,
}

/// Sender engine configuration.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Bound on unacknowledged packets in flight.
    pub window_size: usize,
    /// Age (in aging cycles) at which an in-flight packet is retransmitted.
    pub retransmit_age: u32,
    /// Bound on a single acknowledgment wait.
    pub poll_timeout: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            retransmit_age: DEFAULT_RETRANSMIT_AGE,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// Shared mutable sender state: the window plus the stats sink fed by it.
#[derive(Debug)]
struct SenderState<S> {
    window: SlidingWindow,
    stats: S,
}

/// Sender window engine for one session (one peer).
///
/// Multiple concurrent peers require one engine per peer; this design
/// intentionally supports exactly one.
#[derive(Debug)]
pub struct SenderEngine<S: StatsSink> {
    socket: CourierSocket,
    peer: SocketAddr,
    state: Mutex<SenderState<S>>,
    config: SenderConfig,
    started: Instant,
}

impl<S: StatsSink> SenderEngine<S> {
    /// Create an engine sending to `peer` over `socket`.
    pub fn new(socket: CourierSocket, peer: SocketAddr, config: SenderConfig, stats: S) -> Self {
        Self {
            socket,
            peer,
            state: Mutex::new(SenderState {
                window: SlidingWindow::new(config.window_size),
                stats,
            }),
            config,
            started: Instant::now(),
        }
    }

    /// The peer this engine transmits to.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Number of packets currently awaiting acknowledgment.
    pub async fn in_flight(&self) -> usize {
        self.state.lock().await.window.in_flight()
    }

    /// Try to admit and transmit one payload as a new DATA packet.
    ///
    /// Returns [`SendOutcome::WindowFull`] without blocking when the window
    /// is at capacity. On a successful transmit the packet is recorded in
    /// flight and every outstanding packet's age is bumped by one.
    pub async fn send(&self, payload: &[u8]) -> TransportResult<SendOutcome> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(TransportError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let mut state = self.state.lock().await;
        if !state.window.can_admit() {
            trace!(in_flight = state.window.in_flight(), "window full");
            return Ok(SendOutcome::WindowFull);
        }

        let header = state.window.build_data_header();
        let datagram = wire::encode(&header, payload);

        match self.socket.send_to(&datagram, self.peer).await {
            Ok(_) => {
                state.window.record_sent(header, payload.to_vec());
                trace!(
                    seq = header.sequence_number,
                    len = payload.len(),
                    "data packet transmitted"
                );
                Ok(SendOutcome::Admitted(header.sequence_number))
            }
            Err(e) => {
                warn!(seq = header.sequence_number, error = %e, "transmit failed");
                Ok(SendOutcome::TransmitFailed)
            }
        }
    }

    /// Process one acknowledgment, retiring the matching in-flight packet.
    ///
    /// A second acknowledgment for the same sequence number is a no-op.
    /// Each retirement is reported to the stats sink.
    pub async fn on_ack(&self, ack_number: u32) {
        let mut state = self.state.lock().await;
        match state.window.retire(ack_number) {
            Some(retired) => {
                let elapsed = self.started.elapsed();
                state.stats.record(retired.header.sequence_number, elapsed);
                trace!(
                    seq = ack_number,
                    in_flight = state.window.in_flight(),
                    "packet acknowledged"
                );
            }
            None => trace!(seq = ack_number, "ack for unknown or retired packet ignored"),
        }
    }

    /// Wait up to the configured timeout for one incoming acknowledgment.
    ///
    /// On a datagram: decode, feed [`on_ack`](Self::on_ack), and report the
    /// acknowledged number. Malformed or non-ACK datagrams are dropped and
    /// the caller's loop continues. On timeout, the same cycle that failed
    /// to receive runs the retransmission pass before returning.
    pub async fn poll_for_ack(&self) -> TransportResult<PollOutcome> {
        let received = self
            .socket
            .recv_timed(self.config.poll_timeout)
            .await
            .map_err(TransportError::ReceiveFailed)?;

        let Some((datagram, from)) = received else {
            self.check_retransmissions().await;
            return Ok(PollOutcome::Timeout);
        };

        let (header, _) = match wire::decode(&datagram) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!(%from, error = %e, "dropping malformed datagram");
                return Ok(PollOutcome::Ignored);
            }
        };

        if !header.flags.is_ack() {
            debug!(%from, flags = header.flags.as_byte(), "dropping non-ack datagram");
            return Ok(PollOutcome::Ignored);
        }

        self.on_ack(header.ack_number).await;
        Ok(PollOutcome::Acked(header.ack_number))
    }

    /// Run one aging pass and retransmit every packet that is due.
    ///
    /// Retransmissions resend the identical header and payload. Invoked once
    /// per poll cycle, not from a separate timer.
    pub async fn check_retransmissions(&self) {
        let due = {
            let mut state = self.state.lock().await;
            state
                .window
                .tick_retransmissions(self.config.retransmit_age)
        };

        // The lock is released before resending: an entry retired in the
        // gap goes out once more and is acked as a stale duplicate.
        for (header, payload) in due {
            debug!(seq = header.sequence_number, "retransmitting");
            let datagram = wire::encode(&header, &payload);
            if let Err(e) = self.socket.send_to(&datagram, self.peer).await {
                warn!(seq = header.sequence_number, error = %e, "retransmit failed");
            }
        }
    }
}
