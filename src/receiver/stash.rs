//! Reorder stash: receive-side window and in-order delivery sweep.
//!
//! The stash holds packets that arrived ahead of the expected sequence
//! number. Slot `i` represents the relative offset
//! `sequence_number - expected == i`; whenever the expected number
//! advances, the slots shift left so indices stay relative to it. It only
//! manages state; acknowledgments and I/O are the caller's responsibility.

/// An out-of-order payload parked in the stash.
#[derive(Debug, Clone)]
struct StashSlot {
    sequence_number: u32,
    payload: Vec<u8>,
}

/// How an arriving packet was classified against the receive window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StashOutcome {
    /// `seq < expected`: stale duplicate. Ack it again, never re-deliver.
    Stale,
    /// In window: stored (overwriting any stale occupant), then swept.
    /// `delivered` holds the payloads released in order, oldest first;
    /// empty when a gap remains at the window front.
    Stored {
        /// Payloads released by the delivery sweep, in sequence order.
        delivered: Vec<Vec<u8>>,
    },
    /// `seq >= expected + window`: outside the receive window. Dropped
    /// silently; the sender's own timeout will retransmit it.
    OutOfWindow,
}

/// Receive-side reorder state for one session.
#[derive(Debug)]
pub struct ReorderStash {
    /// Next sequence number owed to the application. Monotonic.
    expected: u32,
    /// Fixed window of slots, index = offset from `expected`.
    slots: Vec<Option<StashSlot>>,
}

impl ReorderStash {
    /// Create a stash with `window_size` slots.
    ///
    /// # Panics
    ///
    /// Panics if `window_size` is zero.
    pub fn new(window_size: usize) -> Self {
        assert!(window_size >= 1, "window size must be at least 1");
        Self {
            expected: 0,
            slots: vec![None; window_size],
        }
    }

    /// The sequence number the application is owed next.
    pub fn expected(&self) -> u32 {
        self.expected
    }

    /// Number of slots in the receive window.
    pub fn window_size(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots (arrived but not yet deliverable).
    pub fn stashed(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Classify and store one arriving packet, then sweep.
    ///
    /// Delivery order is guaranteed as long as the gap between the lowest
    /// missing and highest arrived sequence number stays within the window.
    pub fn accept(&mut self, sequence_number: u32, payload: Vec<u8>) -> StashOutcome {
        if sequence_number < self.expected {
            return StashOutcome::Stale;
        }

        let offset = (sequence_number - self.expected) as usize;
        if offset >= self.slots.len() {
            return StashOutcome::OutOfWindow;
        }

        // Overwrites any stale occupant of the slot.
        self.slots[offset] = Some(StashSlot {
            sequence_number,
            payload,
        });

        StashOutcome::Stored {
            delivered: self.sweep(),
        }
    }

    /// Release every contiguous payload at the window front.
    ///
    /// While slot 0 is occupied: take its payload, advance `expected`, and
    /// shift the remaining slots left so indices stay relative to it.
    fn sweep(&mut self) -> Vec<Vec<u8>> {
        let mut delivered = Vec::new();
        while let Some(slot) = self.slots[0].take() {
            debug_assert_eq!(slot.sequence_number, self.expected);
            delivered.push(slot.payload);
            self.expected = self.expected.wrapping_add(1);
            // Slot 0 is vacant after take(); rotating parks it at the tail.
            self.slots.rotate_left(1);
        }
        delivered
    }
}
