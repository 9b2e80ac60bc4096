//! Fan-in barrier that turns source arrivals into log flushes.

use crate::error::Result;
use crate::metrics::source::SourceKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of arrivals that completes a round.
pub const BARRIER_THRESHOLD: usize = 3;

/// What counts towards completing a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPolicy {
    /// Every arrival counts, so a fast source may fill a round on its own
    /// while a slow one contributes nothing.
    #[default]
    Arrivals,
    /// Each source counts at most once per round; repeat arrivals still
    /// refresh the shared state but do not advance the counter.
    DistinctSources,
}

/// Outcome of a single [`AggregationBarrier::arrive`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// The arrival was counted; the round is still open.
    Counted,
    /// The source already contributed to this round.
    Repeated,
    /// The arrival completed the round and the flush ran.
    Flushed,
}

/// Counts arrivals against [`BARRIER_THRESHOLD`] and runs exactly one flush
/// per completed round.
///
/// The barrier does no locking. It lives next to
/// [`SharedMetricState`](crate::metrics::data::SharedMetricState) under one
/// mutex, and `arrive` must be called with that mutex held so the increment,
/// the threshold check, the flush and the reset happen as one step.
#[derive(Debug)]
pub struct AggregationBarrier {
    policy: RoundPolicy,
    count: usize,
    contributed: [bool; SourceKind::COUNT],
}

impl AggregationBarrier {
    /// Create an empty barrier.
    pub fn new(policy: RoundPolicy) -> Self {
        Self {
            policy,
            count: 0,
            contributed: [false; SourceKind::COUNT],
        }
    }

    /// Record an arrival from `source`, running `flush` if it completes the
    /// round.
    ///
    /// The counter is reset before a flush error is returned, so a failed
    /// write never leaves the barrier at the threshold.
    pub fn arrive<F>(&mut self, source: SourceKind, flush: F) -> Result<Arrival>
    where
        F: FnOnce() -> Result<()>,
    {
        if self.policy == RoundPolicy::DistinctSources {
            let seen = &mut self.contributed[source.index()];
            if *seen {
                debug!(source = %source, count = self.count, "repeat arrival ignored");
                return Ok(Arrival::Repeated);
            }
            *seen = true;
        }

        self.count += 1;
        debug!(source = %source, count = self.count, "arrival");

        if self.count < BARRIER_THRESHOLD {
            return Ok(Arrival::Counted);
        }

        let flushed = flush();
        self.reset();
        flushed.map(|()| Arrival::Flushed)
    }

    fn reset(&mut self) {
        self.count = 0;
        self.contributed = [false; SourceKind::COUNT];
    }

    /// Arrivals counted in the current round.
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Default for AggregationBarrier {
    fn default() -> Self {
        Self::new(RoundPolicy::default())
    }
}
