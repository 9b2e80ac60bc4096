//! Metric sampling and round aggregation.
//!
//! This module holds the shared metric state, the fan-in barrier that
//! decides when a round is complete, the periodic sources that feed them,
//! and the pseudo-file reader the sources sample from.

pub mod barrier;
pub mod data;
pub mod reader;
pub mod source;
pub mod traits;

// Re-export commonly used items
pub use barrier::{AggregationBarrier, Arrival, RoundPolicy};
pub use data::{LogRecord, MetricSlot, MetricSnapshot, SharedMetricState};
pub use source::{Aggregator, FailurePolicy, MetricSource, SourceKind};
pub use traits::{LogSink, RawMetricReader, RawReading};
