//! Packet encoding and decoding (the wire codec).

mod packet;

pub use packet::{decode, encode, PacketFlags, PacketHeader, WireError};
