//! Configuration loading for MargaNav

use crate::error::{MargaError, Result};
use crate::guidance::GuidanceConfig;
use crate::sink::SinkFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MargaConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub guidance: GuidanceSettings,
    #[serde(default)]
    pub selection: SelectionConfig,
}

/// Network endpoints
#[derive(Clone, Debug, Deserialize)]
pub struct ConnectionConfig {
    /// Address the feed listener binds to (default: 0.0.0.0:4000)
    #[serde(default = "default_feed_bind")]
    pub feed_bind: String,

    /// Actuator address; commands are only logged when unset
    #[serde(default)]
    pub sink_addr: Option<String>,

    /// Actuator frame format (default: digit)
    #[serde(default)]
    pub sink_format: SinkFormat,

    /// Connect and write timeout in milliseconds (default: 2000)
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

/// Location graph source
#[derive(Clone, Debug, Deserialize)]
pub struct GraphConfig {
    /// Path to the JSON graph snapshot
    #[serde(default = "default_graph_path")]
    pub path: String,

    /// Write graph edits back to `path` (default: true)
    #[serde(default = "default_persist_edits")]
    pub persist_edits: bool,
}

/// Guidance timing and heading settings
#[derive(Clone, Debug, Deserialize)]
pub struct GuidanceSettings {
    /// Guidance timer period in milliseconds (default: 500)
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Minimum interval between commands in milliseconds (default: 3000)
    #[serde(default = "default_dwell")]
    pub dwell_ms: u64,

    /// Bearing lookahead as percent of route length (default: 5.0)
    #[serde(default = "default_lookahead")]
    pub lookahead_percent: f64,

    /// Offset added to the sensed heading in degrees (default: 0.0)
    #[serde(default)]
    pub calibration_offset_deg: f64,

    /// Status log interval in seconds (default: 5)
    #[serde(default = "default_status_interval")]
    pub status_interval_secs: u64,
}

/// Route endpoints selected at startup
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            feed_bind: default_feed_bind(),
            sink_addr: None,
            sink_format: SinkFormat::default(),
            timeout_ms: default_timeout(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            path: default_graph_path(),
            persist_edits: default_persist_edits(),
        }
    }
}

impl Default for GuidanceSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            dwell_ms: default_dwell(),
            lookahead_percent: default_lookahead(),
            calibration_offset_deg: 0.0,
            status_interval_secs: default_status_interval(),
        }
    }
}

// Default value functions
fn default_feed_bind() -> String {
    "0.0.0.0:4000".to_string()
}

fn default_timeout() -> u64 {
    2000
}

fn default_graph_path() -> String {
    "maps/sample_floor.json".to_string()
}

fn default_persist_edits() -> bool {
    true
}

fn default_tick_interval() -> u64 {
    500
}

fn default_dwell() -> u64 {
    3000
}

fn default_lookahead() -> f64 {
    5.0
}

fn default_status_interval() -> u64 {
    5
}

impl MargaConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MargaError::Config(format!("Failed to read config file: {}", e)))?;
        let config: MargaConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the guidance loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.guidance.tick_interval_ms == 0 {
            return Err(MargaError::Config("tick_interval_ms must be > 0".into()));
        }
        if !self.guidance.lookahead_percent.is_finite() || self.guidance.lookahead_percent <= 0.0 {
            return Err(MargaError::Config(
                "lookahead_percent must be a positive number".into(),
            ));
        }
        if !self.guidance.calibration_offset_deg.is_finite() {
            return Err(MargaError::Config(
                "calibration_offset_deg must be finite".into(),
            ));
        }
        Ok(())
    }

    pub fn graph_path(&self) -> PathBuf {
        PathBuf::from(&self.graph.path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.connection.timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.guidance.tick_interval_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.guidance.status_interval_secs)
    }

    /// Controller settings derived from the `[guidance]` table
    pub fn guidance_config(&self) -> GuidanceConfig {
        GuidanceConfig {
            dwell: Duration::from_millis(self.guidance.dwell_ms),
            lookahead_percent: self.guidance.lookahead_percent,
            calibration_offset_deg: self.guidance.calibration_offset_deg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: MargaConfig = toml::from_str("").unwrap();
        assert_eq!(config.connection.feed_bind, "0.0.0.0:4000");
        assert!(config.connection.sink_addr.is_none());
        assert_eq!(config.connection.sink_format, SinkFormat::Digit);
        assert_eq!(config.guidance.dwell_ms, 3000);
        assert_eq!(config.guidance.tick_interval_ms, 500);
        assert!(config.graph.persist_edits);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_tables() {
        let config: MargaConfig = toml::from_str(
            r#"
            [connection]
            sink_addr = "192.168.1.20:4001"
            sink_format = "json"

            [guidance]
            calibration_offset_deg = -7.5

            [selection]
            start = "1700000000001"
            "#,
        )
        .unwrap();

        assert_eq!(config.connection.sink_addr.as_deref(), Some("192.168.1.20:4001"));
        assert_eq!(config.connection.sink_format, SinkFormat::Json);
        assert_eq!(config.connection.timeout_ms, 2000);
        assert_eq!(config.guidance.calibration_offset_deg, -7.5);
        assert_eq!(config.guidance.lookahead_percent, 5.0);
        assert_eq!(config.selection.start.as_deref(), Some("1700000000001"));
        assert!(config.selection.end.is_none());

        let guidance = config.guidance_config();
        assert_eq!(guidance.dwell, Duration::from_millis(3000));
        assert_eq!(guidance.calibration_offset_deg, -7.5);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("marga.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[guidance]\ntick_interval_ms = 0").unwrap();

        assert!(matches!(MargaConfig::load(&path), Err(MargaError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = MargaConfig::load(Path::new("/nonexistent/marga.toml"));
        assert!(matches!(result, Err(MargaError::Config(_))));
    }

    #[test]
    fn test_unknown_sink_format() {
        let result: std::result::Result<MargaConfig, _> =
            toml::from_str("[connection]\nsink_format = \"morse\"");
        assert!(result.is_err());
    }
}
