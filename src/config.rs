//! Simulator configuration
//!
//! All tunables live in one TOML file. Every field has a default, so a
//! missing file or a partial one still yields a runnable configuration:
//!
//! ```toml
//! device_id = "sim-device-001"
//! interval_seconds = 5.0
//! publish_policy = "fire_and_forget"
//! shutdown_timeout_secs = 5.0
//!
//! [sampling_range]
//! min = 20.0
//! max = 35.0
//!
//! [destination]
//! credentials_path = "key.json"
//! project_id = "steel-league-483016-f0"
//! topic_id = "temperature-readings"
//! ```
//!
//! Lookup order: an explicit `--config` path (must exist), then
//! `<config_dir>/temp-sim/simulator.toml`, then built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

use crate::sensor::generator::{is_on_hundredths_grid, SamplingRange};
use crate::simulator::policy::PublishPolicy;

const CONFIG_DIR: &str = "temp-sim";
const CONFIG_FILE: &str = "simulator.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file {0} does not exist")]
    NotFound(PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid sampling range [{min}, {max}]")]
    InvalidRange { min: f64, max: f64 },

    #[error("Sampling bound {0} has more than two decimals")]
    OffGridBound(f64),

    #[error("Invalid publish interval {0}s")]
    InvalidInterval(f64),

    #[error("Invalid shutdown timeout {0}s")]
    InvalidShutdownTimeout(f64),

    #[error("device_id must not be empty")]
    EmptyDeviceId,

    #[error("Invalid QoS level {0}, expected 0, 1 or 2")]
    InvalidQos(u8),

    #[error("keep_alive_secs must be at least 1")]
    InvalidKeepAlive,

    #[error("Invalid log level {0:?}")]
    InvalidLogLevel(String),
}

/// Where readings go and how to authenticate.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct DestinationConfig {
    /// Credential file, read once at startup
    pub credentials_path: PathBuf,
    pub project_id: String,
    pub topic_id: String,
    pub broker_host: String,
    pub broker_port: u16,
    /// Used unless the credential file names its own client id
    pub client_id: String,
    pub keep_alive_secs: u64,
    /// MQTT QoS level, 0..=2
    pub qos: u8,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("key.json"),
            project_id: "steel-league-483016-f0".to_string(),
            topic_id: "temperature-readings".to_string(),
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "temp-sim".to_string(),
            keep_alive_secs: 5,
            qos: 1,
        }
    }
}

/// Complete simulator configuration.
///
/// Shared read-only by the loop once validated.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Identifier stamped on every reading
    pub device_id: String,
    /// Delay between publishes
    pub interval_seconds: f64,
    /// How the loop treats publish outcomes
    pub publish_policy: PublishPolicy,
    /// Stop after this many readings; unbounded when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u64>,
    /// How long a stopping loop waits for outstanding publishes to settle
    pub shutdown_timeout_secs: f64,
    pub log_level: String,
    pub sampling_range: SamplingRange,
    pub destination: DestinationConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            device_id: "sim-device-001".to_string(),
            interval_seconds: 5.0,
            publish_policy: PublishPolicy::default(),
            max_iterations: None,
            shutdown_timeout_secs: 5.0,
            log_level: "info".to_string(),
            sampling_range: SamplingRange::default(),
            destination: DestinationConfig::default(),
        }
    }
}

impl SimulatorConfig {
    /// Checks every value the loop relies on.
    ///
    /// Topic identifiers are checked separately when the topic path is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let SamplingRange { min, max } = self.sampling_range;
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(ConfigError::InvalidRange { min, max });
        }
        for bound in [min, max] {
            if !is_on_hundredths_grid(bound) {
                return Err(ConfigError::OffGridBound(bound));
            }
        }

        self.interval()?;
        self.shutdown_timeout()?;
        self.log_level()?;

        if self.device_id.trim().is_empty() {
            return Err(ConfigError::EmptyDeviceId);
        }
        if self.destination.qos > 2 {
            return Err(ConfigError::InvalidQos(self.destination.qos));
        }
        if self.destination.keep_alive_secs == 0 {
            return Err(ConfigError::InvalidKeepAlive);
        }
        Ok(())
    }

    pub fn interval(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(self.interval_seconds)
            .map_err(|_| ConfigError::InvalidInterval(self.interval_seconds))
    }

    pub fn shutdown_timeout(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(self.shutdown_timeout_secs)
            .map_err(|_| ConfigError::InvalidShutdownTimeout(self.shutdown_timeout_secs))
    }

    pub fn log_level(&self) -> Result<Level, ConfigError> {
        Level::from_str(&self.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }

    pub async fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// `<config_dir>/temp-sim/simulator.toml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Loads the configuration and reports which file it came from.
///
/// An explicit path must exist. The default location is optional; without
/// it the built-in defaults are returned with no source.
pub async fn load(explicit: Option<&Path>) -> Result<(SimulatorConfig, Option<PathBuf>), ConfigError> {
    if let Some(path) = explicit {
        let config = SimulatorConfig::from_file(path).await?;
        return Ok((config, Some(path.to_path_buf())));
    }

    match default_config_path() {
        Some(path) if tokio::fs::try_exists(&path).await.unwrap_or(false) => {
            let config = SimulatorConfig::from_file(&path).await?;
            Ok((config, Some(path)))
        }
        _ => Ok((SimulatorConfig::default(), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_valid() {
        let config = SimulatorConfig::default();
        config.validate().unwrap();

        assert_eq!(config.device_id, "sim-device-001");
        assert_eq!(config.interval().unwrap(), Duration::from_secs(5));
        assert_eq!(config.sampling_range, SamplingRange { min: 20.0, max: 35.0 });
        assert_eq!(config.publish_policy, PublishPolicy::FireAndForget);
        assert_eq!(config.max_iterations, None);
        assert_eq!(config.shutdown_timeout().unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: SimulatorConfig = toml::from_str(
            r#"
            device_id = "lab-probe-7"
            publish_policy = "await_and_abort"

            [sampling_range]
            min = 25.0
            max = 25.0

            [destination]
            topic_id = "lab"
            "#,
        )
        .unwrap();

        assert_eq!(config.device_id, "lab-probe-7");
        assert_eq!(config.publish_policy, PublishPolicy::AwaitAndAbort);
        assert_eq!(config.sampling_range, SamplingRange { min: 25.0, max: 25.0 });
        assert_eq!(config.destination.topic_id, "lab");
        assert_eq!(config.destination.project_id, "steel-league-483016-f0");
        assert_eq!(config.interval_seconds, 5.0);
        config.validate().unwrap();
    }

    #[test]
    fn serialized_defaults_parse_back() {
        let rendered = toml::to_string_pretty(&SimulatorConfig::default()).unwrap();
        let parsed: SimulatorConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, SimulatorConfig::default());
    }

    #[test]
    fn rejects_inverted_and_non_finite_ranges() {
        let mut config = SimulatorConfig::default();
        config.sampling_range = SamplingRange { min: 30.0, max: 20.0 };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRange { .. })));

        config.sampling_range = SamplingRange { min: f64::NAN, max: 20.0 };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRange { .. })));
    }

    #[test]
    fn rejects_bounds_off_the_hundredths_grid() {
        let mut config = SimulatorConfig::default();
        config.sampling_range = SamplingRange { min: 20.005, max: 35.0 };
        assert!(matches!(config.validate(), Err(ConfigError::OffGridBound(_))));
    }

    #[test]
    fn rejects_bad_scalars() {
        let mut config = SimulatorConfig::default();
        config.interval_seconds = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidInterval(_))));

        let mut config = SimulatorConfig::default();
        config.device_id = " ".into();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyDeviceId)));

        let mut config = SimulatorConfig::default();
        config.destination.qos = 3;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidQos(3))));

        let mut config = SimulatorConfig::default();
        config.destination.keep_alive_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidKeepAlive)));

        let mut config = SimulatorConfig::default();
        config.shutdown_timeout_secs = f64::INFINITY;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidShutdownTimeout(_))
        ));

        let mut config = SimulatorConfig::default();
        config.log_level = "chatty".into();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLogLevel(_))));
    }

    #[test]
    fn zero_interval_is_allowed() {
        let mut config = SimulatorConfig::default();
        config.interval_seconds = 0.0;
        config.validate().unwrap();
        assert_eq!(config.interval().unwrap(), Duration::ZERO);
    }

    #[tokio::test]
    async fn load_reads_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "interval_seconds = 0.5\nmax_iterations = 3").unwrap();

        let (config, source) = load(Some(file.path())).await.unwrap();
        assert_eq!(source.as_deref(), Some(file.path()));
        assert_eq!(config.interval().unwrap(), Duration::from_millis(500));
        assert_eq!(config.max_iterations, Some(3));
    }

    #[tokio::test]
    async fn load_fails_for_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(matches!(load(Some(&path)).await, Err(ConfigError::NotFound(_))));
    }

    #[tokio::test]
    async fn load_reports_parse_errors_with_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "interval_seconds = \"soon\"").unwrap();

        let err = load(Some(file.path())).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { path, .. } if path == file.path()));
    }
}
