use clap::Parser;
use std::path::PathBuf;

use crate::config::SimulatorConfig;
use crate::simulator::PublishPolicy;

/// Publishes simulated temperature readings to a pub/sub topic.
#[derive(Debug, Parser)]
#[command(name = "temp-sim", version, about)]
pub struct Cli {
    /// Configuration file (TOML). Defaults to <config_dir>/temp-sim/simulator.toml
    #[arg(short, long, env = "TEMP_SIM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Identifier stamped on every reading
    #[arg(long, env = "TEMP_SIM_DEVICE_ID")]
    pub device_id: Option<String>,

    /// Seconds between publishes
    #[arg(long, env = "TEMP_SIM_INTERVAL_SECS")]
    pub interval_secs: Option<f64>,

    /// Stop after this many readings
    #[arg(short = 'n', long)]
    pub iterations: Option<u64>,

    /// How publish outcomes are handled
    #[arg(long, value_enum, env = "TEMP_SIM_POLICY")]
    pub policy: Option<PublishPolicy>,

    /// Credential file for the broker
    #[arg(long, env = "TEMP_SIM_CREDENTIALS")]
    pub credentials: Option<PathBuf>,
}

impl Cli {
    /// Overlays the flags that were given onto `config`.
    pub fn apply(&self, config: &mut SimulatorConfig) {
        if let Some(device_id) = &self.device_id {
            config.device_id = device_id.clone();
        }
        if let Some(interval) = self.interval_secs {
            config.interval_seconds = interval;
        }
        if let Some(iterations) = self.iterations {
            config.max_iterations = Some(iterations);
        }
        if let Some(policy) = self.policy {
            config.publish_policy = policy;
        }
        if let Some(credentials) = &self.credentials {
            config.destination.credentials_path = credentials.clone();
        }
    }
}
