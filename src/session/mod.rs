//! Session drivers: lifecycle state machine, shutdown signaling, and the
//! client/server run loops built on them.

mod client;
mod phase;
mod server;
mod shutdown;

pub use client::{run_client, ClientConfig, ClientConfigBuilder};
pub use phase::{PhaseOutcome, SessionPhase};
pub use server::{run_server, ServerConfig, ServerSummary};
pub use shutdown::ShutdownToken;
