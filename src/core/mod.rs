//! Core constants, error types, and application-facing traits.

pub mod constants;
mod error;
mod traits;

pub use error::{CourierError, SetupError};
pub use traits::{DeliverySink, StatsSink, WriteSink};
