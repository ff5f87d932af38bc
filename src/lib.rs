//! Courier: reliable, ordered message delivery over UDP.
//!
//! Courier layers a fixed-size sliding window, per-packet acknowledgments,
//! and counter-based retransmission aging on top of plain datagrams. The
//! sender admits at most a window's worth of unacknowledged packets and
//! resends any that age out; the receiver stashes out-of-order arrivals and
//! releases payloads to the application strictly in sequence order.
//!
//! # Architecture
//!
//! - [`wire`]: the packet codec (fixed big-endian header, payload,
//!   terminator).
//! - [`transport`]: the async UDP socket wrapper and transport errors.
//! - [`sender`]: sliding-window state and the engine driving admission,
//!   acknowledgment handling, and retransmission.
//! - [`receiver`]: the reorder stash and the engine driving classification,
//!   ack echoes, and in-order delivery.
//! - [`session`]: the lifecycle state machine plus ready-made client and
//!   server run loops.
//! - [`stats`]: acknowledgment latency recording.
//!
//! # Example
//!
//! ```no_run
//! use courier_protocol::prelude::*;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), CourierError> {
//!     let config = ClientConfig::new("127.0.0.1:4433".parse().unwrap());
//!     let (tx, rx) = mpsc::channel(16);
//!     tx.send(b"hello".to_vec()).await.ok();
//!     drop(tx);
//!
//!     run_client(config, rx, NullStats, ShutdownToken::new()).await
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod core;
pub mod receiver;
pub mod sender;
pub mod session;
pub mod stats;
pub mod transport;
pub mod wire;

pub use crate::core::{CourierError, DeliverySink, SetupError, StatsSink, WriteSink};

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::core::{CourierError, DeliverySink, SetupError, StatsSink, WriteSink};
    pub use crate::receiver::{ReceiveOutcome, ReceiverEngine};
    pub use crate::sender::{PollOutcome, SendOutcome, SenderConfig, SenderEngine};
    pub use crate::session::{
        run_client, run_server, ClientConfig, ServerConfig, ServerSummary, ShutdownToken,
    };
    pub use crate::stats::{FileStats, NullStats};
    pub use crate::transport::{CourierSocket, TransportError};
    pub use crate::wire::{PacketFlags, PacketHeader};
}
