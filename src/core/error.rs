//! Error types for the Courier protocol.

use std::io;

use thiserror::Error;

/// Errors raised while the session is being set up.
///
/// Every variant is fatal: the driver routes through the `FatalError` phase,
/// surfaces the message to the operator, and exits non-zero after cleanup.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Configuration rejected before any I/O was attempted.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Binding the UDP socket failed.
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        /// The address we tried to bind.
        addr: std::net::SocketAddr,
        /// The underlying socket error.
        #[source]
        source: io::Error,
    },
}

/// Top-level Courier errors.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Transport error (codec or socket).
    #[error("transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    /// Session setup error.
    #[error("setup error: {0}")]
    Setup(#[from] SetupError),

    /// I/O error outside the socket path (e.g. the delivery sink).
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl CourierError {
    /// Check whether this error must terminate the session.
    ///
    /// Transient network errors never crash the process; only setup failures
    /// or unrecoverable socket/sink loss end the session.
    pub fn is_fatal(&self) -> bool {
        match self {
            CourierError::Setup(_) => true,
            CourierError::Io(_) => true,
            CourierError::Transport(e) => e.is_fatal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;

    #[test]
    fn test_setup_errors_are_fatal() {
        let err = CourierError::from(SetupError::InvalidConfig("window size 0".into()));
        assert!(err.is_fatal());

        let err = CourierError::from(SetupError::BindFailed {
            addr: "127.0.0.1:9".parse().unwrap(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        });
        assert!(err.is_fatal());
    }

    #[test]
    fn test_transient_transport_errors_are_not_fatal() {
        let err = CourierError::from(TransportError::TransmitFailed(io::Error::new(
            io::ErrorKind::WouldBlock,
            "busy",
        )));
        assert!(!err.is_fatal());
    }
}
