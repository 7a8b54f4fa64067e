//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `monitor.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - StoreConfig: where STH-Comet and Orion live, fiware tenant headers.
//!     - DeviceConfig: which entity is watched and which attribute takes commands.
//!     - Thresholds: one open (min, max) band per signal.
//!     - PollingConfig: tick interval and how many samples to ask for.
//!     - DashboardConfig: bind address, display timezone, page title.
//!     - LoggingConfig: default log level, per-tick reading output.
//!
//! everything is read once at startup and never mutated afterwards.
//!
//! ==============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::domain::{Signal, Thresholds};
use crate::error::MonitorError;
use crate::timezone;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MonitorConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    /// base url of the STH-Comet history service
    pub sth_url: String,
    /// base url of the Orion context broker
    pub orion_url: String,
    pub fiware_service: String,
    pub fiware_service_path: String,
    pub timeout_seconds: u64,
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sth_url: "http://20.81.162.205:8666".to_string(),
            orion_url: "http://20.81.162.205:1026".to_string(),
            fiware_service: "smart".to_string(),
            fiware_service_path: "/".to_string(),
            timeout_seconds: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DeviceConfig {
    pub entity_type: String,
    pub entity_id: String,
    /// attribute the iot agent maps to the lamp's command handler
    pub command_attribute: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            entity_type: "Lamp".to_string(),
            entity_id: "urn:ngsi-ld:Lamp:EDGE4".to_string(),
            command_attribute: "led".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_seconds: u64,
    /// samples fetched per signal for evaluation; only the newest is used
    pub latest_count: u32,
    /// samples fetched per signal for the charts
    pub history_size: u32,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_seconds: 3, latest_count: 1, history_size: 50 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub bind_addr: String,
    /// iana zone the charts are drawn in
    pub timezone: String,
    pub title: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8050".to_string(),
            timezone: "America/Sao_Paulo".to_string(),
            title: "Vinheria Dashboard".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: true }
    }
}

impl MonitorConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: MonitorConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Load with default fallback
    ///
    /// an explicit path must load. otherwise the first of `config/monitor.toml`
    /// and `../config/monitor.toml` that exists is used, and built-in defaults
    /// when neither does. returns where the config came from.
    pub fn load_or_default(explicit: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        let paths = [
            PathBuf::from("config").join("monitor.toml"),
            PathBuf::from("..").join("config").join("monitor.toml"),
        ];

        for path in paths {
            if path.exists() {
                let config = Self::load(&path)
                    .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
                return Ok((config, Some(path)));
            }
        }

        Ok((Self::default(), None))
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        for signal in Signal::PRIORITY {
            let band = self.thresholds.band(signal);
            if !(band.min < band.max) {
                return Err(MonitorError::Config(format!(
                    "{} band needs min < max (got {} / {})",
                    signal, band.min, band.max
                )));
            }
        }
        if self.polling.interval_seconds == 0 {
            return Err(MonitorError::Config("polling.interval_seconds must be > 0".into()));
        }
        if self.polling.latest_count == 0 || self.polling.history_size == 0 {
            return Err(MonitorError::Config("polling sample counts must be > 0".into()));
        }
        if self.store.timeout_seconds == 0 {
            return Err(MonitorError::Config("store.timeout_seconds must be > 0".into()));
        }
        self.zone()?;
        Ok(())
    }

    pub fn zone(&self) -> Result<Tz, MonitorError> {
        timezone::parse_zone(&self.dashboard.timezone)
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        tracing::info!("┌─────────────────────────────────────────┐");
        tracing::info!("│          MONITOR CONFIGURATION          │");
        tracing::info!("├─────────────────────────────────────────┤");
        tracing::info!("│ Entity: {} ({})", self.device.entity_id, self.device.entity_type);
        tracing::info!("│ STH: {}", self.store.sth_url);
        tracing::info!("│ Orion: {}", self.store.orion_url);
        tracing::info!("│ Poll Interval: {}s", self.polling.interval_seconds);
        tracing::info!("│ History Size: {}", self.polling.history_size);
        for signal in Signal::PRIORITY {
            let band = self.thresholds.band(signal);
            tracing::info!("│ {}: ({}, {})", signal, band.min, band.max);
        }
        tracing::info!("│ Timezone: {}", self.dashboard.timezone);
        tracing::info!("└─────────────────────────────────────────┘");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ThresholdBand;

    #[test]
    fn defaults_match_deployment() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.polling.interval_seconds, 3);
        assert_eq!(config.polling.history_size, 50);
        assert_eq!(config.thresholds.temperature, ThresholdBand::new(10.0, 18.0));
        assert_eq!(config.device.command_attribute, "led");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = MonitorConfig::from_toml(
            r#"
            [device]
            entity_id = "urn:ngsi-ld:Lamp:001"

            [thresholds.temperature]
            min = 12.0
            max = 16.0
            [thresholds.humidity]
            min = 50.0
            max = 80.0
            [thresholds.luminosity]
            min = 0
            max = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.device.entity_id, "urn:ngsi-ld:Lamp:001");
        assert_eq!(config.device.entity_type, "Lamp");
        assert_eq!(config.thresholds.temperature.max, 16.0);
        assert_eq!(config.thresholds.luminosity.max, 30.0);
        assert_eq!(config.store.timeout_seconds, 5);
    }

    #[test]
    fn inverted_band_is_rejected() {
        let mut config = MonitorConfig::default();
        config.thresholds.humidity = ThresholdBand::new(80.0, 50.0);
        assert!(config.validate().is_err());

        config.thresholds.humidity = ThresholdBand::new(50.0, 50.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_interval_and_bad_zone_are_rejected() {
        let mut config = MonitorConfig::default();
        config.polling.interval_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.dashboard.timezone = "Nowhere/Land".to_string();
        assert!(config.validate().is_err());
    }
}
