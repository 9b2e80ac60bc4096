//! File-backed log sink.
//!
//! The log is a plain UTF-8 text file: a two line header written once with
//! truncation, followed by one five line record per completed round.

use crate::error::{Result, SystemError};
use crate::metrics::data::LogRecord;
use crate::metrics::traits::LogSink;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// First header line of every log.
pub const LOG_HEADER: &str = "SYSTEM LOG STARTED";
/// Second header line of every log.
pub const LOG_SEPARATOR: &str = "==================";

/// Appends records to a file, reopening it on every write.
#[derive(Debug, Clone)]
pub struct FileLogSink {
    path: PathBuf,
}

impl FileLogSink {
    /// Create a sink writing to `path`. Nothing is opened until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn unavailable(&self, err: std::io::Error) -> SystemError {
        SystemError::sink_unavailable(&self.path, err.to_string())
    }
}

impl LogSink for FileLogSink {
    fn write_header(&self) -> Result<()> {
        let mut file = File::create(&self.path).map_err(|e| self.unavailable(e))?;
        writeln!(file, "{}", LOG_HEADER).map_err(|e| self.unavailable(e))?;
        writeln!(file, "{}", LOG_SEPARATOR).map_err(|e| self.unavailable(e))?;
        debug!(path = %self.path.display(), "log header written");
        Ok(())
    }

    fn write(&self, record: &LogRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.unavailable(e))?;
        file.write_all(record.to_string().as_bytes())
            .map_err(|e| self.unavailable(e))?;
        Ok(())
    }
}
