//! Periodic metric sources and the lock-guarded aggregation core they feed.

use crate::error::{Result, SystemError};
use crate::metrics::barrier::{AggregationBarrier, Arrival, RoundPolicy};
use crate::metrics::data::{LogRecord, MetricSlot, MetricSnapshot, SharedMetricState};
use crate::metrics::traits::{LogSink, RawMetricReader, RawReading};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One of the independently scheduled metric producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// CPU thermal zone
    Temperature,
    /// System memory statistics
    Memory,
    /// Byte counters of the watched network interface
    Network,
}

impl SourceKind {
    /// Number of sources.
    pub const COUNT: usize = 3;

    /// Every source, in spawn order.
    pub const ALL: [SourceKind; SourceKind::COUNT] =
        [SourceKind::Temperature, SourceKind::Memory, SourceKind::Network];

    pub(crate) fn index(self) -> usize {
        match self {
            SourceKind::Temperature => 0,
            SourceKind::Memory => 1,
            SourceKind::Network => 2,
        }
    }

    /// Slots this source writes on every successful read.
    pub fn slots(self) -> &'static [MetricSlot] {
        match self {
            SourceKind::Temperature => &[MetricSlot::Temperature],
            SourceKind::Memory => &[MetricSlot::Memory],
            SourceKind::Network => &[MetricSlot::NetTransmit, MetricSlot::NetReceive],
        }
    }

    /// Convert a raw reading into engineering-unit slot values.
    pub fn convert(self, raw: RawReading) -> Result<Sample> {
        match (self, raw) {
            (SourceKind::Temperature, RawReading::Temperature { millidegrees }) => {
                Ok(vec![(MetricSlot::Temperature, celsius_from_millidegrees(millidegrees))])
            }
            (
                SourceKind::Memory,
                RawReading::Memory {
                    total_kb,
                    available_kb,
                },
            ) => Ok(vec![(MetricSlot::Memory, used_memory_mb(total_kb, available_kb))]),
            (SourceKind::Network, RawReading::Network { rx_bytes, tx_bytes }) => Ok(vec![
                (MetricSlot::NetTransmit, kilobytes_from_bytes(tx_bytes)),
                (MetricSlot::NetReceive, kilobytes_from_bytes(rx_bytes)),
            ]),
            (kind, raw) => Err(SystemError::parse_error(format!(
                "{} source received mismatched reading {:?}",
                kind, raw
            ))),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Temperature => "temperature",
            SourceKind::Memory => "memory",
            SourceKind::Network => "network",
        };
        f.write_str(name)
    }
}

/// Converted slot values produced by one read.
pub type Sample = Vec<(MetricSlot, i64)>;

/// Millidegrees Celsius to whole degrees, rounded to nearest.
pub fn celsius_from_millidegrees(millidegrees: i64) -> i64 {
    (millidegrees as f64 / 1000.0).round() as i64
}

/// Used memory in MB from total and available kibibytes, truncated.
pub fn used_memory_mb(total_kb: u64, available_kb: u64) -> i64 {
    (total_kb as i64 - available_kb as i64) / 1024
}

/// Byte counter to kilobytes, rounded to nearest.
///
/// The counters are cumulative, so the result is an absolute figure even
/// though the log labels it as a rate.
pub fn kilobytes_from_bytes(bytes: u64) -> i64 {
    (bytes as f64 / 1024.0).round() as i64
}

/// What a source does when its raw read fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report the failure, reset the source's slots to unset, skip the
    /// arrival and keep sampling.
    #[default]
    Isolate,
    /// Stop the source with the error, which ends the whole run.
    Abort,
}

/// Health change reported by a source to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    /// A read failed; the source's slots are unset until it recovers.
    Unavailable { reason: String },
    /// The first good read after one or more failures.
    Recovered,
    /// The source observed cancellation and exited.
    Stopped,
}

/// A status update tagged with the reporting source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEvent {
    pub source: SourceKind,
    pub status: SourceStatus,
}

/// Arrival and flush counts since the aggregator was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundTotals {
    /// Arrivals reported by all sources
    pub arrivals: u64,
    /// Records successfully written
    pub flushes: u64,
}

#[derive(Debug)]
struct RoundState {
    metrics: SharedMetricState,
    barrier: AggregationBarrier,
    totals: RoundTotals,
}

/// Shared metric state and aggregation barrier behind a single lock.
///
/// Every source holds an `Arc` to the same aggregator. A call to
/// [`Aggregator::record`] writes the sample, reports the arrival and, when
/// that arrival completes a round, writes the log record, all without
/// releasing the lock.
pub struct Aggregator {
    inner: Mutex<RoundState>,
    sink: Arc<dyn LogSink>,
    interface: String,
}

impl Aggregator {
    /// Create an aggregator flushing into `sink`.
    pub fn new(sink: Arc<dyn LogSink>, policy: RoundPolicy, interface: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(RoundState {
                metrics: SharedMetricState::new(),
                barrier: AggregationBarrier::new(policy),
                totals: RoundTotals::default(),
            }),
            sink,
            interface: interface.into(),
        }
    }

    /// Store a sample and report the arrival of `source`.
    ///
    /// Errors only if the arrival triggered a flush and the sink failed.
    pub fn record(&self, source: SourceKind, sample: &[(MetricSlot, i64)]) -> Result<Arrival> {
        let mut guard = self.inner.lock();
        let RoundState {
            metrics,
            barrier,
            totals,
        } = &mut *guard;

        for &(slot, value) in sample {
            metrics.set(slot, value);
        }
        totals.arrivals += 1;

        let sink = &self.sink;
        let interface = self.interface.as_str();
        let outcome = barrier.arrive(source, || {
            let record = LogRecord::capture(metrics, interface);
            sink.write(&record)
        })?;

        if outcome == Arrival::Flushed {
            totals.flushes += 1;
            info!(source = %source, flushes = totals.flushes, "round flushed");
        }
        Ok(outcome)
    }

    /// Reset every slot owned by `source` to the unset sentinel.
    pub fn mark_unavailable(&self, source: SourceKind) {
        let mut guard = self.inner.lock();
        for &slot in source.slots() {
            guard.metrics.clear(slot);
        }
    }

    /// Current metric values.
    pub fn snapshot(&self) -> MetricSnapshot {
        self.inner.lock().metrics.snapshot()
    }

    /// Arrivals counted in the open round.
    pub fn pending_arrivals(&self) -> usize {
        self.inner.lock().barrier.count()
    }

    /// Totals since creation.
    pub fn totals(&self) -> RoundTotals {
        self.inner.lock().totals
    }
}

/// A periodic task sampling one source into an [`Aggregator`].
pub struct MetricSource {
    kind: SourceKind,
    period: Duration,
    reader: Arc<dyn RawMetricReader>,
    aggregator: Arc<Aggregator>,
    policy: FailurePolicy,
    status: Option<UnboundedSender<SourceEvent>>,
}

impl MetricSource {
    /// Create a source that samples every `period`.
    pub fn new(
        kind: SourceKind,
        period: Duration,
        reader: Arc<dyn RawMetricReader>,
        aggregator: Arc<Aggregator>,
    ) -> Self {
        Self {
            kind,
            period,
            reader,
            aggregator,
            policy: FailurePolicy::default(),
            status: None,
        }
    }

    /// Set the read failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Report health changes on `status`.
    pub fn with_status_channel(mut self, status: UnboundedSender<SourceEvent>) -> Self {
        self.status = Some(status);
        self
    }

    /// Read and convert one sample.
    pub fn sample(&self) -> Result<Sample> {
        let raw = self.reader.read_raw(self.kind)?;
        self.kind
            .convert(raw)
            .map_err(|e| SystemError::source_unavailable(self.kind, e.to_string()))
    }

    fn report(&self, status: SourceStatus) {
        if let Some(tx) = &self.status {
            // The orchestrator may already be gone during shutdown.
            let _ = tx.send(SourceEvent {
                source: self.kind,
                status,
            });
        }
    }

    /// Run until `cancel` fires.
    ///
    /// Cancellation is checked at the top of each iteration and raced
    /// against the sleep, so shutdown never waits out a full period.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let mut healthy = true;

        info!(source = %self.kind, period_ms = self.period.as_millis() as u64, "source started");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.sample() {
                Ok(sample) => {
                    if !healthy {
                        healthy = true;
                        info!(source = %self.kind, "source recovered");
                        self.report(SourceStatus::Recovered);
                    }
                    debug!(source = %self.kind, ?sample, "sampled");
                    if let Err(e) = self.aggregator.record(self.kind, &sample) {
                        error!(source = %self.kind, error = %e, "failed to write log record");
                        return Err(e);
                    }
                }
                Err(e) => match self.policy {
                    FailurePolicy::Abort => {
                        error!(source = %self.kind, error = %e, "source read failed");
                        return Err(e);
                    }
                    FailurePolicy::Isolate => {
                        warn!(source = %self.kind, error = %e, "source read failed, marking unavailable");
                        healthy = false;
                        self.aggregator.mark_unavailable(self.kind);
                        self.report(SourceStatus::Unavailable {
                            reason: e.to_string(),
                        });
                    }
                },
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.period) => {}
            }
        }

        info!(source = %self.kind, "source stopped");
        self.report(SourceStatus::Stopped);
        Ok(())
    }
}
