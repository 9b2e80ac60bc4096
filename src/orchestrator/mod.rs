//! Lifetime management for a logger run.
//!
//! The orchestrator writes the log header, spawns one task per metric
//! source, lets them run for the configured duration (or until shutdown is
//! requested), then cancels them and waits for every task to exit.

pub mod config;

pub use config::LoggerConfig;

use crate::error::{Result, SystemError};
use crate::metrics::data::{LogRecord, SharedMetricState};
use crate::metrics::source::{Aggregator, MetricSource, SourceEvent, SourceKind, SourceStatus};
use crate::metrics::traits::{LogSink, RawMetricReader};
use crate::sink::FileLogSink;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Summary of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Arrivals reported by all sources
    pub arrivals: u64,
    /// Records written after the header
    pub flushes: u64,
    /// Failed reads per source
    pub failures: HashMap<SourceKind, u64>,
    /// Recoveries per source
    pub recoveries: HashMap<SourceKind, u64>,
    /// Sources that observed shutdown and exited cleanly
    pub stopped: Vec<SourceKind>,
}

impl RunReport {
    fn observe(&mut self, event: SourceEvent) {
        match event.status {
            SourceStatus::Unavailable { reason } => {
                warn!(source = %event.source, %reason, "source unavailable");
                *self.failures.entry(event.source).or_default() += 1;
            }
            SourceStatus::Recovered => {
                *self.recoveries.entry(event.source).or_default() += 1;
            }
            SourceStatus::Stopped => self.stopped.push(event.source),
        }
    }

    /// Failed reads reported by `source`.
    pub fn failures_for(&self, source: SourceKind) -> u64 {
        self.failures.get(&source).copied().unwrap_or(0)
    }

    /// Whether every source exited on its own.
    pub fn all_stopped(&self) -> bool {
        SourceKind::ALL.iter().all(|s| self.stopped.contains(s))
    }
}

/// Runs the three metric sources against one shared aggregator.
pub struct Orchestrator {
    config: LoggerConfig,
    reader: Arc<dyn RawMetricReader>,
    sink: Arc<dyn LogSink>,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Create an orchestrator reading pseudo-files and logging to the
    /// configured file.
    pub fn new(config: LoggerConfig) -> Result<Self> {
        config.validate()?;
        let reader = Arc::new(config.reader());
        let sink = Arc::new(FileLogSink::new(config.log_path.clone()));
        Ok(Self::with_components(config, reader, sink))
    }

    /// Create an orchestrator with explicit reader and sink.
    pub fn with_components(
        config: LoggerConfig,
        reader: Arc<dyn RawMetricReader>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            config,
            reader,
            sink,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that ends the run early when cancelled.
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until the configured duration elapses or shutdown is requested.
    ///
    /// Returns the first fatal error (sink failure, or a source failure under
    /// [`FailurePolicy::Abort`](crate::FailurePolicy::Abort)) after all
    /// sources have stopped.
    pub async fn run(self) -> Result<RunReport> {
        self.sink.write_header()?;

        let aggregator = Arc::new(Aggregator::new(
            Arc::clone(&self.sink),
            self.config.round_policy,
            self.config.interface.clone(),
        ));
        let (status_tx, mut status_rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();

        for kind in SourceKind::ALL {
            let source = MetricSource::new(
                kind,
                self.config.interval(kind),
                Arc::clone(&self.reader),
                Arc::clone(&aggregator),
            )
            .with_failure_policy(self.config.failure_policy)
            .with_status_channel(status_tx.clone());
            tasks.spawn(source.run(self.cancel.child_token()));
        }
        drop(status_tx);

        info!(
            duration_ms = self.config.run_duration_ms,
            log = %self.config.log_path.display(),
            "logger started"
        );

        let mut report = RunReport::default();
        let mut fatal = None;
        let deadline = tokio::time::sleep(self.config.run_duration());
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    info!("run duration elapsed");
                    break;
                }
                _ = self.cancel.cancelled() => {
                    info!("shutdown requested");
                    break;
                }
                Some(event) = status_rx.recv() => report.observe(event),
                Some(joined) = tasks.join_next() => {
                    if let Err(e) = flatten(joined) {
                        fatal = Some(e);
                        break;
                    }
                }
            }
        }

        self.cancel.cancel();
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = flatten(joined) {
                fatal.get_or_insert(e);
            }
        }
        while let Some(event) = status_rx.recv().await {
            report.observe(event);
        }

        let totals = aggregator.totals();
        report.arrivals = totals.arrivals;
        report.flushes = totals.flushes;

        if let Some(e) = fatal {
            error!(error = %e, "logger stopped on fatal error");
            return Err(e);
        }

        info!(
            arrivals = report.arrivals,
            flushes = report.flushes,
            "logger stopped"
        );
        Ok(report)
    }
}

fn flatten(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    joined.map_err(|e| SystemError::system_error(format!("source task failed: {}", e)))?
}

/// Read every source once and build a record without touching the log.
pub fn sample_once(reader: &dyn RawMetricReader, interface: &str) -> Result<LogRecord> {
    let mut state = SharedMetricState::new();
    for kind in SourceKind::ALL {
        let raw = reader.read_raw(kind)?;
        for (slot, value) in kind.convert(raw)? {
            state.set(slot, value);
        }
    }
    Ok(LogRecord::capture(&state, interface))
}
