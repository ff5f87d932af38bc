//! Acknowledgment latency recording.
//!
//! The sender reports `(sequence number, elapsed since session start)` for
//! every retired packet. [`FileStats`] persists them as `seq,millis` lines,
//! one per acknowledgment, ready for plotting; [`NullStats`] discards them.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use tracing::warn;

use crate::core::StatsSink;

/// Stats sink that discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStats;

impl StatsSink for NullStats {
    fn record(&mut self, _sequence_number: u32, _elapsed: Duration) {}
}

/// Stats sink appending `seq,millis` lines to a file.
///
/// Write failures are logged and swallowed: losing a stats line never
/// disturbs the session.
#[derive(Debug)]
pub struct FileStats {
    writer: BufWriter<File>,
}

impl FileStats {
    /// Create (or truncate) the stats file at `path`.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl StatsSink for FileStats {
    fn record(&mut self, sequence_number: u32, elapsed: Duration) {
        let result = writeln!(self.writer, "{},{}", sequence_number, elapsed.as_millis())
            .and_then(|()| self.writer.flush());
        if let Err(e) = result {
            warn!(seq = sequence_number, error = %e, "stats record dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("courier-stats-{}-{}.csv", tag, std::process::id()))
    }

    #[test]
    fn test_file_stats_writes_csv_lines() {
        let path = temp_path("lines");
        let mut stats = FileStats::create(&path).unwrap();

        stats.record(0, Duration::from_millis(12));
        stats.record(1, Duration::from_millis(340));
        drop(stats);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "0,12\n1,340\n");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_null_stats_accepts_records() {
        let mut stats = NullStats;
        stats.record(7, Duration::from_secs(1));
    }
}
