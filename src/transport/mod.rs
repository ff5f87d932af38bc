//! Socket abstraction and transport error taxonomy.

mod error;
mod socket;

pub use error::{TransportError, TransportResult};
pub use socket::CourierSocket;
