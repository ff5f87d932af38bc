//! Protocol constants for the Courier wire format and engines.
//!
//! The wire-format values are fixed by the protocol and MUST NOT be changed.
//! The timing and window defaults are starting points; both engines accept
//! overrides through their configuration structs.

use std::time::Duration;

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// Packet role: acknowledgment (empty payload, `ack_number` is meaningful).
pub const FLAG_ACK: u8 = 0x01;

/// Packet role: data (payload carries application bytes).
pub const FLAG_DATA: u8 = 0x02;

/// Fixed header size: seq(4) + ack(4) + flags(1) + data_length(2).
pub const HEADER_SIZE: usize = 11;

/// Fixed 2-byte marker ending every encoded packet (ETX, ETX).
///
/// Used to delimit logical packets inside a datagram read loop.
pub const TERMINATOR: [u8; 2] = [0x03, 0x03];

/// Size of the trailing terminator marker.
pub const TERMINATOR_SIZE: usize = 2;

/// Total size of an encoded ACK packet (header + empty payload + terminator).
pub const ACK_PACKET_SIZE: usize = HEADER_SIZE + TERMINATOR_SIZE;

/// Maximum payload bytes carried by a single DATA packet.
pub const MAX_PAYLOAD_SIZE: usize = 1010;

// =============================================================================
// WINDOW AND RETRANSMISSION
// =============================================================================

/// Default bound on unacknowledged packets in flight.
pub const DEFAULT_WINDOW_SIZE: usize = 5;

/// Default age (in aging cycles) at which an in-flight packet is retransmitted.
pub const DEFAULT_RETRANSMIT_AGE: u32 = 3;

// =============================================================================
// TIMING
// =============================================================================

/// Default bound on a single acknowledgment wait.
///
/// Doubles as the shutdown-responsiveness bound: every blocking receive in
/// the drivers returns within this interval so the stop signal is observed.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Delay before retrying a send that was refused with a full window.
pub const WINDOW_RETRY_DELAY: Duration = Duration::from_millis(50);

// =============================================================================
// BUFFERS
// =============================================================================

/// Receive buffer size (maximum UDP datagram).
pub const RECV_BUFFER_SIZE: usize = 65535;
