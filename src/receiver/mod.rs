//! Receiver side: reorder stash and the engine driving it.

mod engine;
mod stash;

pub use engine::{ReceiveOutcome, ReceiverEngine};
pub use stash::{ReorderStash, StashOutcome};
