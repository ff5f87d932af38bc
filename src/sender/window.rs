//! Sliding-window state for the sending side.
//!
//! [`SlidingWindow`] tracks every transmitted-but-unacknowledged packet and
//! the sender's own outgoing sequence counter. It only manages state; all
//! socket I/O is the caller's responsibility.
//!
//! # Aging
//!
//! Retransmission is counter-based, not clock-based: every in-flight entry
//! carries an `age` that is bumped once per retransmission-check pass *and*
//! once per successful transmit of any packet, so all outstanding packets
//! age together. An entry whose age reaches the caller's threshold is due
//! for retransmission and its age resets to zero.

use std::collections::VecDeque;

use crate::wire::PacketHeader;

/// A transmitted packet awaiting acknowledgment.
#[derive(Debug, Clone)]
pub struct InFlightPacket {
    /// The header exactly as sent.
    pub header: PacketHeader,
    /// The payload exactly as sent.
    pub payload: Vec<u8>,
    /// Aging cycles survived since (re)transmission.
    pub age: u32,
}

/// Send-side window state for one session.
///
/// Bounded FIFO of [`InFlightPacket`] plus the local outgoing sequence
/// counter. Both live under the sender engine's single lock.
#[derive(Debug)]
pub struct SlidingWindow {
    /// Bound on simultaneously unacknowledged packets.
    capacity: usize,
    /// Sequence number to assign to the next new packet.
    next_seq: u32,
    /// In-flight packets, oldest first.
    in_flight: VecDeque<InFlightPacket>,
}

impl SlidingWindow {
    /// Create a window admitting at most `capacity` unacked packets.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "window capacity must be at least 1");
        Self {
            capacity,
            next_seq: 0,
            in_flight: VecDeque::with_capacity(capacity),
        }
    }

    /// `true` when there is room for one more in-flight packet.
    pub fn can_admit(&self) -> bool {
        self.in_flight.len() < self.capacity
    }

    /// Number of packets currently awaiting acknowledgment.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// `true` when nothing is awaiting acknowledgment.
    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// The sequence number the next admitted packet will carry.
    pub fn next_sequence(&self) -> u32 {
        self.next_seq
    }

    /// Build the DATA header for the next outgoing packet.
    ///
    /// Does not mutate the window; call [`record_sent`](Self::record_sent)
    /// once the packet has actually been transmitted.
    pub fn build_data_header(&self) -> PacketHeader {
        PacketHeader::data(self.next_seq)
    }

    /// Record a successfully transmitted packet and age the whole window.
    ///
    /// Advances the sequence counter and bumps the age of every in-flight
    /// entry, including the one just added.
    ///
    /// # Panics
    ///
    /// Panics in debug mode when the window is already full; check
    /// [`can_admit`](Self::can_admit) before transmitting.
    pub fn record_sent(&mut self, header: PacketHeader, payload: Vec<u8>) {
        debug_assert!(
            self.can_admit(),
            "record_sent on a full window ({} / {})",
            self.in_flight.len(),
            self.capacity
        );
        self.in_flight.push_back(InFlightPacket {
            header,
            payload,
            age: 0,
        });
        self.next_seq = self.next_seq.wrapping_add(1);
        self.age_all();
    }

    /// Retire the in-flight packet acknowledged by `ack_number`.
    ///
    /// Returns the retired entry, or `None` when no entry matches: acks
    /// for already-retired or unknown sequence numbers are silently ignored,
    /// so acknowledging twice removes at most one packet.
    pub fn retire(&mut self, ack_number: u32) -> Option<InFlightPacket> {
        let idx = self
            .in_flight
            .iter()
            .position(|p| p.header.sequence_number == ack_number)?;
        self.in_flight.remove(idx)
    }

    /// Run one aging pass and collect the packets due for retransmission.
    ///
    /// Every entry's age is bumped by one; entries reaching `threshold` are
    /// returned (header and payload unchanged, ready to re-encode) and their
    /// age resets to zero.
    pub fn tick_retransmissions(&mut self, threshold: u32) -> Vec<(PacketHeader, Vec<u8>)> {
        self.age_all();

        let mut due = Vec::new();
        for entry in self.in_flight.iter_mut() {
            if entry.age >= threshold {
                due.push((entry.header, entry.payload.clone()));
                entry.age = 0;
            }
        }
        due
    }

    /// Oldest-first view of the in-flight packets.
    pub fn entries(&self) -> impl Iterator<Item = &InFlightPacket> {
        self.in_flight.iter()
    }

    fn age_all(&mut self) {
        for entry in self.in_flight.iter_mut() {
            entry.age += 1;
        }
    }
}
