//! Data structures for the tracked metrics and the records written to the log.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value held by a slot that has not been written yet.
pub const UNSET: i64 = -1;

/// Width of the right-aligned label column in a log record, colon included.
const LABEL_WIDTH: usize = 37;

/// Longest network label plus one separating space.
const NET_LABEL_MIN_WIDTH: usize = "Transmission Rate:".len() + 1;

/// One of the tracked metric fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSlot {
    /// CPU temperature in °C
    Temperature,
    /// Used memory in MB
    Memory,
    /// Transmitted kilobytes on the watched interface
    NetTransmit,
    /// Received kilobytes on the watched interface
    NetReceive,
}

impl MetricSlot {
    /// Every slot, in record order.
    pub const ALL: [MetricSlot; 4] = [
        MetricSlot::Temperature,
        MetricSlot::Memory,
        MetricSlot::NetTransmit,
        MetricSlot::NetReceive,
    ];

    fn index(self) -> usize {
        match self {
            MetricSlot::Temperature => 0,
            MetricSlot::Memory => 1,
            MetricSlot::NetTransmit => 2,
            MetricSlot::NetReceive => 3,
        }
    }
}

/// Most recently observed value for every slot.
///
/// Holds no lock of its own: callers mutate and snapshot it while holding
/// the lock that also guards the aggregation barrier, so a write, the
/// arrival it reports and a possible flush form one critical section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedMetricState {
    values: [i64; 4],
}

impl SharedMetricState {
    /// Create a state block with every slot unset.
    pub fn new() -> Self {
        Self {
            values: [UNSET; 4],
        }
    }

    /// Overwrite the value of a slot.
    pub fn set(&mut self, slot: MetricSlot, value: i64) {
        self.values[slot.index()] = value;
    }

    /// Return a slot to the unset sentinel.
    pub fn clear(&mut self, slot: MetricSlot) {
        self.values[slot.index()] = UNSET;
    }

    /// Current value of one slot.
    pub fn get(&self, slot: MetricSlot) -> i64 {
        self.values[slot.index()]
    }

    /// Copy of the current values of all slots.
    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            temperature: self.get(MetricSlot::Temperature),
            memory: self.get(MetricSlot::Memory),
            transmit_rate: self.get(MetricSlot::NetTransmit),
            receive_rate: self.get(MetricSlot::NetReceive),
        }
    }
}

impl Default for SharedMetricState {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`SharedMetricState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// CPU temperature in °C
    pub temperature: i64,
    /// Used memory in MB
    pub memory: i64,
    /// Transmitted KB
    pub transmit_rate: i64,
    /// Received KB
    pub receive_rate: i64,
}

/// A single record as written to the log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Local time at which the record was materialized
    pub timestamp: DateTime<Local>,
    /// Interface the network counters were read from
    pub interface: String,
    /// Metric values at flush time
    pub values: MetricSnapshot,
}

impl LogRecord {
    /// Materialize a record from the current state, stamped with the current time.
    pub fn capture(state: &SharedMetricState, interface: impl Into<String>) -> Self {
        Self::at(Local::now(), state.snapshot(), interface)
    }

    /// Build a record with an explicit timestamp.
    pub fn at(
        timestamp: DateTime<Local>,
        values: MetricSnapshot,
        interface: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            interface: interface.into(),
            values,
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = format!("[Interface: {}]", self.interface);
        // Long interface names push the labels right but keep one space before them.
        let net_width = LABEL_WIDTH
            .saturating_sub(prefix.chars().count())
            .max(NET_LABEL_MIN_WIDTH);

        writeln!(
            f,
            "{:>w$} [{}]",
            "Timestamp:",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            w = LABEL_WIDTH
        )?;
        writeln!(
            f,
            "{:>w$} {}°C",
            "CPU Temperature:",
            self.values.temperature,
            w = LABEL_WIDTH
        )?;
        writeln!(
            f,
            "{:>w$} {} MB",
            "Memory Usage:",
            self.values.memory,
            w = LABEL_WIDTH
        )?;
        writeln!(
            f,
            "{}{:>w$} {} KB/s",
            prefix,
            "Transmission Rate:",
            self.values.transmit_rate,
            w = net_width
        )?;
        writeln!(
            f,
            "{}{:>w$} {} KB/s",
            prefix,
            "Received Rate:",
            self.values.receive_rate,
            w = net_width
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_state_starts_unset() {
        let state = SharedMetricState::new();
        for slot in MetricSlot::ALL {
            assert_eq!(state.get(slot), UNSET);
        }
    }

    #[test]
    fn test_set_overwrites() {
        let mut state = SharedMetricState::new();
        state.set(MetricSlot::Temperature, 40);
        state.set(MetricSlot::Temperature, 42);
        assert_eq!(state.snapshot().temperature, 42);

        state.clear(MetricSlot::Temperature);
        assert_eq!(state.get(MetricSlot::Temperature), UNSET);
    }

    #[test]
    fn test_record_layout() {
        let timestamp = Local.with_ymd_and_hms(2025, 3, 26, 14, 5, 9).unwrap();
        let values = MetricSnapshot {
            temperature: 45,
            memory: 585,
            transmit_rate: 1023,
            receive_rate: 7,
        };
        let text = LogRecord::at(timestamp, values, "lo").to_string();
        let expected = concat!(
            "                           Timestamp: [2025-03-26 14:05:09]\n",
            "                     CPU Temperature: 45°C\n",
            "                        Memory Usage: 585 MB\n",
            "[Interface: lo]    Transmission Rate: 1023 KB/s\n",
            "[Interface: lo]        Received Rate: 7 KB/s\n",
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_long_interface_keeps_label_separated() {
        let timestamp = Local.with_ymd_and_hms(2025, 3, 26, 14, 5, 9).unwrap();
        let values = MetricSnapshot {
            temperature: UNSET,
            memory: UNSET,
            transmit_rate: UNSET,
            receive_rate: 3,
        };
        let text = LogRecord::at(timestamp, values, "enx00e04c68a1b2c3").to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[3],
            "[Interface: enx00e04c68a1b2c3] Transmission Rate: -1 KB/s"
        );
        assert_eq!(lines[4], "[Interface: enx00e04c68a1b2c3]     Received Rate: 3 KB/s");
    }
}
