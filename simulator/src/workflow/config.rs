use anyhow::Context;
use radarcore::generator::{GeneratorConfig, MotionMode};
use radarcore::protocol::RadarMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Server,
    Client,
    Standalone,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub role: Role,
    pub host: String,
    pub port: u16,
    pub stream_id: u8,
    pub mode: RadarMode,
    pub motion: MotionMode,
    pub tick_interval_ms: u64,
    pub ticks: Option<u64>,
    pub track_local: bool,
    pub track_remote: bool,
    pub bridge: Option<SocketAddr>,
    pub generator: GeneratorConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            role: Role::default(),
            host: "127.0.0.1".to_string(),
            port: 8888,
            stream_id: 1,
            mode: RadarMode::default(),
            motion: MotionMode::default(),
            tick_interval_ms: 100,
            ticks: None,
            track_local: true,
            track_remote: true,
            bridge: None,
            generator: GeneratorConfig::default(),
        }
    }
}

impl SimulatorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading simulator config {}", path_ref.display()))?;
        let config: SimulatorConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing simulator config {}", path_ref.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.role != Role::Standalone && self.host.trim().is_empty() {
            anyhow::bail!("host must be set for the {:?} role", self.role);
        }
        if self.tick_interval_ms == 0 {
            anyhow::bail!("tick_interval_ms must be positive");
        }
        if self.generator.min_distance_m >= self.generator.max_distance_m {
            anyhow::bail!(
                "generator distance bounds are empty: {} >= {}",
                self.generator.min_distance_m,
                self.generator.max_distance_m
            );
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}
