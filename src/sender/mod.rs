//! Sender side: sliding-window state and the window engine driving it.

mod engine;
mod window;

pub use engine::{PollOutcome, SendOutcome, SenderConfig, SenderEngine};
pub use window::{InFlightPacket, SlidingWindow};
