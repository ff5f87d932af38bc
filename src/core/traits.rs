//! Application-facing seams of the protocol core.
//!
//! The engines never talk to the application directly; they call through
//! these traits. The receiver hands ordered payloads to a [`DeliverySink`],
//! and the sender reports acknowledgment retirements to a [`StatsSink`].

use std::io::{self, Write};
use std::time::Duration;

/// Ordered byte-stream sink on the receiving side.
///
/// The reorder engine calls [`deliver`](Self::deliver) once per payload, in
/// strictly increasing sequence order, regardless of network arrival order.
pub trait DeliverySink: Send {
    /// Accept the next in-order payload.
    fn deliver(&mut self, payload: &[u8]) -> io::Result<()>;
}

/// Collects payloads in delivery order. Convenient for tests.
impl DeliverySink for Vec<Vec<u8>> {
    fn deliver(&mut self, payload: &[u8]) -> io::Result<()> {
        self.push(payload.to_vec());
        Ok(())
    }
}

/// Adapter delivering each payload to a [`Write`] followed by a newline.
///
/// Matches the line-oriented display the protocol was built for: one
/// application message per line.
#[derive(Debug)]
pub struct WriteSink<W: Write + Send>(pub W);

impl<W: Write + Send> DeliverySink for WriteSink<W> {
    fn deliver(&mut self, payload: &[u8]) -> io::Result<()> {
        self.0.write_all(payload)?;
        self.0.write_all(b"\n")?;
        self.0.flush()
    }
}

/// Observational sink invoked on every acknowledgment retirement.
///
/// `record(sequence_number, elapsed)` is called exactly once when an
/// in-flight packet is retired by an ack; `elapsed` is measured from engine
/// start. Purely observational: implementations must never influence
/// protocol behavior, and recording failures are swallowed by the caller.
pub trait StatsSink: Send {
    /// Record the retirement of `sequence_number` at session offset `elapsed`.
    fn record(&mut self, sequence_number: u32, elapsed: Duration);
}

/// Collects retirement records in memory. Convenient for tests.
impl StatsSink for Vec<(u32, Duration)> {
    fn record(&mut self, sequence_number: u32, elapsed: Duration) {
        self.push((sequence_number, elapsed));
    }
}
