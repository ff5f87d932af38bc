//! Transport layer error types.
//!
//! The protocol is designed for local recovery: malformed packets are
//! dropped, transmit failures are retried, and only socket loss is fatal.

use std::io;

use thiserror::Error;

use crate::wire::WireError;

/// Transport layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Packet decode failure. Dropped, no ack, loop continues.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Socket write error. Logged; the caller may retry the same payload.
    #[error("transmit failed: {0}")]
    TransmitFailed(#[source] io::Error),

    /// Socket read error other than a timeout. Logged; the loop continues
    /// unless the socket itself is gone.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] io::Error),

    /// Payload exceeds the per-packet maximum.
    #[error("payload too large: {len} bytes (max {max})")]
    PayloadTooLarge {
        /// Offered payload size.
        len: usize,
        /// Per-packet maximum.
        max: usize,
    },
}

impl TransportError {
    /// Check whether this error means the socket is unusable.
    pub fn is_fatal(&self) -> bool {
        match self {
            TransportError::Wire(_) => false,
            TransportError::PayloadTooLarge { .. } => false,
            TransportError::TransmitFailed(e) | TransportError::ReceiveFailed(e) => {
                matches!(
                    e.kind(),
                    io::ErrorKind::NotConnected | io::ErrorKind::BrokenPipe
                )
            }
        }
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
