//! Wire codec for Courier packets.
//!
//! Every datagram exchanged between peers carries exactly one packet:
//! a fixed header, `data_length` payload bytes, and a 2-byte terminator.
//! This module is pure data transformation; no I/O happens here.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian** (network byte order).
//!
//! ```text
//! offset  0: sequence_number  (4 bytes)
//! offset  4: ack_number       (4 bytes)
//! offset  8: flags            (1 byte)   DATA=0x02, ACK=0x01
//! offset  9: data_length      (2 bytes)
//! offset 11: payload          (data_length bytes)
//! offset 11+data_length: terminator (2 bytes, ETX ETX)
//! ```
//!
//! An ACK packet has an empty payload, so its encoded size is always
//! [`constants::ACK_PACKET_SIZE`]. There is no checksum field; the
//! transport-layer checksum is relied upon.

use thiserror::Error;

use crate::core::constants::{self, HEADER_SIZE, TERMINATOR};

// Byte offsets of each field within the serialized header.
const OFF_SEQ: usize = 0;
const OFF_ACK: usize = 4;
const OFF_FLAGS: usize = 8;
const OFF_DATA_LEN: usize = 9;

/// Packet role flags.
///
/// `ACK` and `DATA` describe the packet's role and are not combined in
/// practice; the uniform header lets both roles share one codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketFlags(u8);

impl PacketFlags {
    /// Acknowledgment packet.
    pub const ACK: Self = Self(constants::FLAG_ACK);
    /// Data packet.
    pub const DATA: Self = Self(constants::FLAG_DATA);

    /// Create flags from a raw byte.
    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Get the raw byte value.
    pub fn as_byte(self) -> u8 {
        self.0
    }

    /// Check if the ACK bit is set.
    pub fn is_ack(self) -> bool {
        self.0 & constants::FLAG_ACK != 0
    }

    /// Check if the DATA bit is set.
    pub fn is_data(self) -> bool {
        self.0 & constants::FLAG_DATA != 0
    }
}

/// Fixed-size packet header.
///
/// Fields are in host byte order; [`encode`] converts to network byte order
/// on the wire and [`decode`] converts back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// The sender's own outgoing-packet counter.
    ///
    /// Each side numbers its outgoing packets independently; an ACK's
    /// sequence number is the *receiver's* private counter, unrelated to the
    /// data stream it acknowledges.
    pub sequence_number: u32,
    /// Sequence number being acknowledged (meaningful when `flags` is ACK).
    pub ack_number: u32,
    /// Packet role.
    pub flags: PacketFlags,
    /// Exact payload byte count. Set from the actual payload by [`encode`].
    pub data_length: u16,
}

impl PacketHeader {
    /// Build a DATA header for the given sequence number.
    ///
    /// `data_length` is filled in by [`encode`] from the actual payload.
    pub fn data(sequence_number: u32) -> Self {
        Self {
            sequence_number,
            ack_number: 0,
            flags: PacketFlags::DATA,
            data_length: 0,
        }
    }

    /// Build an ACK header confirming `ack_number`.
    ///
    /// `sequence_number` is the acknowledging side's own outgoing counter.
    pub fn ack(sequence_number: u32, ack_number: u32) -> Self {
        Self {
            sequence_number,
            ack_number,
            flags: PacketFlags::ACK,
            data_length: 0,
        }
    }
}

/// Errors that can occur while decoding a packet.
#[derive(Debug, Error)]
pub enum WireError {
    /// Fewer bytes than the fixed header size are present.
    #[error("malformed packet: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum expected size.
        expected: usize,
        /// Actual size received.
        actual: usize,
    },

    /// The buffer holds fewer payload bytes than `data_length` claims.
    #[error("payload truncated: header says {expected} bytes, {actual} available")]
    PayloadTruncated {
        /// Payload length from the header.
        expected: usize,
        /// Payload bytes actually available.
        actual: usize,
    },
}

/// Serialize a header and payload into a transmit-ready buffer.
///
/// `header.data_length` is computed from the actual payload; any value
/// already stored in that field is ignored. The terminator is appended last.
pub fn encode(header: &PacketHeader, payload: &[u8]) -> Vec<u8> {
    debug_assert!(payload.len() <= u16::MAX as usize);

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len() + TERMINATOR.len());
    buf.extend_from_slice(&header.sequence_number.to_be_bytes());
    buf.extend_from_slice(&header.ack_number.to_be_bytes());
    buf.push(header.flags.as_byte());
    buf.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&TERMINATOR);
    buf
}

/// Parse a packet from a raw byte buffer.
///
/// Reads exactly the fixed header, then treats the following `data_length`
/// bytes as payload. Trailing bytes (the terminator) are not consumed; a
/// caller reading from a stream must therefore read the header first and
/// then exactly `data_length` more bytes: a two-phase read.
///
/// Never reads past `data_length` payload bytes relative to the header.
pub fn decode(buf: &[u8]) -> Result<(PacketHeader, &[u8]), WireError> {
    if buf.len() < HEADER_SIZE {
        return Err(WireError::TooShort {
            expected: HEADER_SIZE,
            actual: buf.len(),
        });
    }

    let sequence_number = u32::from_be_bytes(buf[OFF_SEQ..OFF_SEQ + 4].try_into().unwrap());
    let ack_number = u32::from_be_bytes(buf[OFF_ACK..OFF_ACK + 4].try_into().unwrap());
    let flags = PacketFlags::from_byte(buf[OFF_FLAGS]);
    let data_length = u16::from_be_bytes(buf[OFF_DATA_LEN..OFF_DATA_LEN + 2].try_into().unwrap());

    let available = buf.len() - HEADER_SIZE;
    if available < data_length as usize {
        return Err(WireError::PayloadTruncated {
            expected: data_length as usize,
            actual: available,
        });
    }

    let header = PacketHeader {
        sequence_number,
        ack_number,
        flags,
        data_length,
    };
    let payload = &buf[HEADER_SIZE..HEADER_SIZE + data_length as usize];
    Ok((header, payload))
}
