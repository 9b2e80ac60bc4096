//! Traits at the edges of the aggregation core.

use crate::error::Result;
use crate::metrics::data::LogRecord;
use crate::metrics::source::SourceKind;

/// Raw counter values as exposed by the operating system, before any unit
/// conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawReading {
    /// Thermal zone reading in millidegrees Celsius.
    Temperature { millidegrees: i64 },
    /// Total and available memory in kibibytes.
    Memory { total_kb: u64, available_kb: u64 },
    /// Cumulative byte counters of one network interface.
    Network { rx_bytes: u64, tx_bytes: u64 },
}

/// Trait for reading raw metric values.
///
/// Implementations read whatever backs a source (pseudo-files on Linux, a
/// fixture in tests) and either return the raw reading for the requested
/// source or fail with [`crate::SystemError::SourceUnavailable`].
pub trait RawMetricReader: Send + Sync {
    /// Read the current raw value(s) for `source`.
    fn read_raw(&self, source: SourceKind) -> Result<RawReading>;
}

/// Trait for persisting log records.
///
/// `write` is called from inside the aggregation critical section, so
/// implementations must not try to take that lock themselves.
pub trait LogSink: Send + Sync {
    /// Start a fresh log, discarding any previous contents.
    fn write_header(&self) -> Result<()>;

    /// Append one record.
    fn write(&self, record: &LogRecord) -> Result<()>;
}
