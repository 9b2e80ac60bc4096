//! Logger run configuration.

use crate::error::{Result, SystemError};
use crate::metrics::barrier::RoundPolicy;
use crate::metrics::reader::{
    ProcfsReader, DEFAULT_MEMINFO_PATH, DEFAULT_NET_DEV_PATH, DEFAULT_THERMAL_PATH,
};
use crate::metrics::source::{FailurePolicy, SourceKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for one logger run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Log file written by the sink
    pub log_path: PathBuf,
    /// Time before shutdown is signalled, in milliseconds
    pub run_duration_ms: u64,
    /// Temperature sampling period in milliseconds
    pub temperature_interval_ms: u64,
    /// Memory sampling period in milliseconds
    pub memory_interval_ms: u64,
    /// Network sampling period in milliseconds
    pub network_interval_ms: u64,
    /// Network interface whose counters are logged
    pub interface: String,
    /// Thermal zone file
    pub thermal_path: PathBuf,
    /// Memory statistics file
    pub meminfo_path: PathBuf,
    /// Network statistics file
    pub net_dev_path: PathBuf,
    /// Behaviour on a failed source read
    pub failure_policy: FailurePolicy,
    /// What completes a round
    pub round_policy: RoundPolicy,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(crate::DEFAULT_LOG_PATH),
            run_duration_ms: crate::DEFAULT_RUN_DURATION_MS,
            temperature_interval_ms: 2000,
            memory_interval_ms: 3000,
            network_interval_ms: 4000,
            interface: crate::DEFAULT_INTERFACE.to_string(),
            thermal_path: PathBuf::from(DEFAULT_THERMAL_PATH),
            meminfo_path: PathBuf::from(DEFAULT_MEMINFO_PATH),
            net_dev_path: PathBuf::from(DEFAULT_NET_DEV_PATH),
            failure_policy: FailurePolicy::default(),
            round_policy: RoundPolicy::default(),
        }
    }
}

impl LoggerConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            SystemError::config_error(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            SystemError::config_error(format!("invalid config {}: {}", path.display(), e))
        })
    }

    /// Set the log file path.
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    /// Set the run duration.
    pub fn with_run_duration_ms(mut self, ms: u64) -> Self {
        self.run_duration_ms = ms;
        self
    }

    /// Set the sampling period of one source.
    pub fn with_interval_ms(mut self, source: SourceKind, ms: u64) -> Self {
        match source {
            SourceKind::Temperature => self.temperature_interval_ms = ms,
            SourceKind::Memory => self.memory_interval_ms = ms,
            SourceKind::Network => self.network_interval_ms = ms,
        }
        self
    }

    /// Set the watched network interface.
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = interface.into();
        self
    }

    /// Set the read failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Set the round policy.
    pub fn with_round_policy(mut self, policy: RoundPolicy) -> Self {
        self.round_policy = policy;
        self
    }

    /// Sampling period of `source`.
    pub fn interval(&self, source: SourceKind) -> Duration {
        let ms = match source {
            SourceKind::Temperature => self.temperature_interval_ms,
            SourceKind::Memory => self.memory_interval_ms,
            SourceKind::Network => self.network_interval_ms,
        };
        Duration::from_millis(ms)
    }

    /// Total run duration.
    pub fn run_duration(&self) -> Duration {
        Duration::from_millis(self.run_duration_ms)
    }

    /// Build the pseudo-file reader described by this configuration.
    pub fn reader(&self) -> ProcfsReader {
        ProcfsReader::new(self.interface.clone())
            .with_thermal_path(self.thermal_path.clone())
            .with_meminfo_path(self.meminfo_path.clone())
            .with_net_dev_path(self.net_dev_path.clone())
    }

    /// Reject configurations that cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.log_path.as_os_str().is_empty() {
            return Err(SystemError::config_error("log path must not be empty"));
        }
        if self.run_duration_ms == 0 {
            return Err(SystemError::config_error("run duration must be positive"));
        }
        for source in SourceKind::ALL {
            if self.interval(source).is_zero() {
                return Err(SystemError::config_error(format!(
                    "{} interval must be positive",
                    source
                )));
            }
        }
        if self.interface.trim().is_empty() {
            return Err(SystemError::config_error("interface must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = LoggerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.interface, "lo");
        assert_eq!(config.interval(SourceKind::Memory), Duration::from_millis(3000));
    }

    #[test]
    fn test_builder() {
        let config = LoggerConfig::default()
            .with_log_path("/tmp/pi.log")
            .with_run_duration_ms(500)
            .with_interval_ms(SourceKind::Network, 50)
            .with_interface("eth0")
            .with_failure_policy(FailurePolicy::Abort)
            .with_round_policy(RoundPolicy::DistinctSources);

        assert_eq!(config.log_path, PathBuf::from("/tmp/pi.log"));
        assert_eq!(config.run_duration(), Duration::from_millis(500));
        assert_eq!(config.interval(SourceKind::Network), Duration::from_millis(50));
        assert_eq!(config.reader().interface(), "eth0");
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.round_policy, RoundPolicy::DistinctSources);
    }

    #[test]
    fn test_validation_rejects_zero_interval() {
        let config = LoggerConfig::default().with_interval_ms(SourceKind::Temperature, 0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("temperature interval"));

        assert!(LoggerConfig::default().with_run_duration_ms(0).validate().is_err());
        assert!(LoggerConfig::default().with_interface(" ").validate().is_err());
    }

    #[test]
    fn test_load_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logger.json");
        fs::write(
            &path,
            r#"{ "interface": "wlan0", "round_policy": "distinct_sources", "memory_interval_ms": 1500 }"#,
        )
        .unwrap();

        let config = LoggerConfig::load(&path).unwrap();
        assert_eq!(config.interface, "wlan0");
        assert_eq!(config.round_policy, RoundPolicy::DistinctSources);
        assert_eq!(config.memory_interval_ms, 1500);
        assert_eq!(config.temperature_interval_ms, 2000);
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logger.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(LoggerConfig::load(&path), Err(SystemError::Config(_))));
    }
}
