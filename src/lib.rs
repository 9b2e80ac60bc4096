//! # Pi Logger - periodic host metrics log for Raspberry Pi
//!
//! Samples CPU temperature, memory usage and network byte counters from
//! independently scheduled tasks and writes one consolidated record to a
//! text log each time a round of samples completes.
//!
//! ## Features
//!
//! - **Independent sources**: each metric runs on its own period
//! - **Fan-in aggregation**: one record per completed round, never two
//! - **Isolated failures**: a broken source is reported, not fatal (configurable)
//! - **Library + Binary**: use as a crate or standalone application
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pi_logger::{LoggerConfig, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LoggerConfig::default().with_log_path("log_file.txt");
//!     let report = Orchestrator::new(config)?.run().await?;
//!     println!("wrote {} records", report.flushes);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod sink;

// Re-export public API
pub use error::{Result, SystemError};
pub use metrics::{
    barrier::{AggregationBarrier, Arrival, RoundPolicy, BARRIER_THRESHOLD},
    data::{LogRecord, MetricSlot, MetricSnapshot, SharedMetricState, UNSET},
    reader::ProcfsReader,
    source::{Aggregator, FailurePolicy, MetricSource, SourceEvent, SourceKind, SourceStatus},
    traits::{LogSink, RawMetricReader, RawReading},
};
pub use orchestrator::{sample_once, LoggerConfig, Orchestrator, RunReport};
pub use sink::FileLogSink;

/// The default log file path
pub const DEFAULT_LOG_PATH: &str = "log_file.txt";

/// The default run duration in milliseconds
pub const DEFAULT_RUN_DURATION_MS: u64 = 20_000;

/// The default network interface
pub const DEFAULT_INTERFACE: &str = "lo";
