//! Raw metric reads from Linux pseudo-files.

use crate::error::{Result, SystemError};
use crate::metrics::source::SourceKind;
use crate::metrics::traits::{RawMetricReader, RawReading};
use std::fs;
use std::path::{Path, PathBuf};

/// Default thermal zone for the CPU on a Raspberry Pi.
pub const DEFAULT_THERMAL_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";
/// Default memory statistics file.
pub const DEFAULT_MEMINFO_PATH: &str = "/proc/meminfo";
/// Default network statistics file.
pub const DEFAULT_NET_DEV_PATH: &str = "/proc/net/dev";

/// Reads the three metric sources from procfs and sysfs.
#[derive(Debug, Clone)]
pub struct ProcfsReader {
    thermal_path: PathBuf,
    meminfo_path: PathBuf,
    net_dev_path: PathBuf,
    interface: String,
}

impl ProcfsReader {
    /// Create a reader for the standard pseudo-file locations.
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            thermal_path: PathBuf::from(DEFAULT_THERMAL_PATH),
            meminfo_path: PathBuf::from(DEFAULT_MEMINFO_PATH),
            net_dev_path: PathBuf::from(DEFAULT_NET_DEV_PATH),
            interface: interface.into(),
        }
    }

    /// Read temperature from a different thermal zone file.
    pub fn with_thermal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.thermal_path = path.into();
        self
    }

    /// Read memory statistics from a different file.
    pub fn with_meminfo_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.meminfo_path = path.into();
        self
    }

    /// Read network statistics from a different file.
    pub fn with_net_dev_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.net_dev_path = path.into();
        self
    }

    /// Interface whose counters are reported.
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Path backing `source`.
    pub fn path_for(&self, source: SourceKind) -> &Path {
        match source {
            SourceKind::Temperature => &self.thermal_path,
            SourceKind::Memory => &self.meminfo_path,
            SourceKind::Network => &self.net_dev_path,
        }
    }

    fn read_source(&self, source: SourceKind) -> Result<String> {
        let path = self.path_for(source);
        fs::read_to_string(path).map_err(|e| {
            SystemError::source_unavailable(
                source,
                format!("cannot open {}: {}", path.display(), e),
            )
        })
    }
}

impl RawMetricReader for ProcfsReader {
    fn read_raw(&self, source: SourceKind) -> Result<RawReading> {
        let contents = self.read_source(source)?;

        let reading = match source {
            SourceKind::Temperature => parse_temperature(&contents).map(|millidegrees| {
                RawReading::Temperature { millidegrees }
            }),
            SourceKind::Memory => parse_meminfo(&contents).map(|(total_kb, available_kb)| {
                RawReading::Memory {
                    total_kb,
                    available_kb,
                }
            }),
            SourceKind::Network => parse_net_dev(&contents, &self.interface)
                .map(|(rx_bytes, tx_bytes)| RawReading::Network { rx_bytes, tx_bytes }),
        };

        reading.map_err(|e| SystemError::source_unavailable(source, e.to_string()))
    }
}

/// Parse a thermal zone file holding a single millidegree value.
pub fn parse_temperature(contents: &str) -> Result<i64> {
    let trimmed = contents.trim();
    trimmed
        .parse::<i64>()
        .map_err(|_| SystemError::parse_error(format!("invalid temperature value '{}'", trimmed)))
}

/// Extract `MemTotal` and `MemAvailable` (in kB) from a meminfo listing.
pub fn parse_meminfo(contents: &str) -> Result<(u64, u64)> {
    let mut total = None;
    let mut available = None;

    for line in contents.lines() {
        if let Some((key, value_str)) = line.split_once(':') {
            let value = value_str
                .split_whitespace()
                .next()
                .and_then(|v| v.parse::<u64>().ok());
            match key.trim() {
                "MemTotal" => total = value,
                "MemAvailable" => available = value,
                _ => {}
            }
        }
    }

    match (total, available) {
        (Some(total), Some(available)) => Ok((total, available)),
        (None, _) => Err(SystemError::parse_error("MemTotal not found")),
        (_, None) => Err(SystemError::parse_error("MemAvailable not found")),
    }
}

/// Extract the received and transmitted byte counters for `interface` from
/// a `/proc/net/dev` table.
///
/// Received bytes are the first column after the interface name and
/// transmitted bytes the ninth.
pub fn parse_net_dev(contents: &str, interface: &str) -> Result<(u64, u64)> {
    for line in contents.lines() {
        let Some((name, stats)) = line.split_once(':') else {
            continue;
        };
        if name.trim() != interface {
            continue;
        }

        let fields: Vec<&str> = stats.split_whitespace().collect();
        if fields.len() < 9 {
            return Err(SystemError::parse_error(format!(
                "interface {} has {} columns, expected at least 9",
                interface,
                fields.len()
            )));
        }

        let rx_bytes = fields[0]
            .parse::<u64>()
            .map_err(|_| SystemError::parse_error(format!("invalid rx bytes '{}'", fields[0])))?;
        let tx_bytes = fields[8]
            .parse::<u64>()
            .map_err(|_| SystemError::parse_error(format!("invalid tx bytes '{}'", fields[8])))?;
        return Ok((rx_bytes, tx_bytes));
    }

    Err(SystemError::parse_error(format!(
        "interface {} not found",
        interface
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MEMINFO: &str = concat!(
        "MemTotal:        1000000 kB\n",
        "MemFree:          100000 kB\n",
        "MemAvailable:     400000 kB\n",
        "Buffers:           20000 kB\n",
    );

    const NET_DEV: &str = concat!(
        "Inter-|   Receive                                                |  Transmit\n",
        " face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n",
        "    lo: 2097152    1200    0    0    0     0          0         0  1048000    1200    0    0    0     0       0          0\n",
        "  eth0:   55555      10    0    0    0     0          0         0     6666      20    0    0    0     0       0          0\n",
    );

    #[test]
    fn test_parse_temperature() {
        assert_eq!(parse_temperature("45321\n").unwrap(), 45321);
        assert!(parse_temperature("hot").is_err());
    }

    #[test]
    fn test_parse_meminfo() {
        assert_eq!(parse_meminfo(MEMINFO).unwrap(), (1_000_000, 400_000));
        assert!(parse_meminfo("MemTotal: 10 kB\n").is_err());
    }

    #[test]
    fn test_parse_net_dev() {
        assert_eq!(parse_net_dev(NET_DEV, "lo").unwrap(), (2_097_152, 1_048_000));
        assert_eq!(parse_net_dev(NET_DEV, "eth0").unwrap(), (55_555, 6_666));
        assert!(parse_net_dev(NET_DEV, "wlan0").is_err());
    }

    #[test]
    fn test_reader_with_custom_paths() {
        let dir = tempfile::tempdir().unwrap();
        let thermal = dir.path().join("temp");
        let meminfo = dir.path().join("meminfo");
        let net_dev = dir.path().join("dev");
        fs::File::create(&thermal)
            .unwrap()
            .write_all(b"45321\n")
            .unwrap();
        fs::write(&meminfo, MEMINFO).unwrap();
        fs::write(&net_dev, NET_DEV).unwrap();

        let reader = ProcfsReader::new("lo")
            .with_thermal_path(&thermal)
            .with_meminfo_path(&meminfo)
            .with_net_dev_path(&net_dev);

        assert_eq!(
            reader.read_raw(SourceKind::Temperature).unwrap(),
            RawReading::Temperature {
                millidegrees: 45321
            }
        );
        assert_eq!(
            reader.read_raw(SourceKind::Memory).unwrap(),
            RawReading::Memory {
                total_kb: 1_000_000,
                available_kb: 400_000
            }
        );
        assert_eq!(
            reader.read_raw(SourceKind::Network).unwrap(),
            RawReading::Network {
                rx_bytes: 2_097_152,
                tx_bytes: 1_048_000
            }
        );
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let reader = ProcfsReader::new("lo").with_thermal_path("/nonexistent/thermal/temp");
        match reader.read_raw(SourceKind::Temperature) {
            Err(SystemError::SourceUnavailable { kind, .. }) => {
                assert_eq!(kind, SourceKind::Temperature)
            }
            other => panic!("expected SourceUnavailable, got {:?}", other),
        }
    }
}
