//! Bootstrap configuration
//!
//! Loaded once from a TOML file at startup; nothing here changes while the
//! process runs. Every durable operational setting (schedules, selections,
//! played flags) lives in the collaborator service, so the file stays
//! minimal: where the collaborator is, which device to play on, and how
//! often to poll.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Top-level configuration file contents.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Collaborator service base URL
    pub api_url: String,

    /// Operator station identity carried in history records
    pub user_id: Uuid,

    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub autoplay: AutoplayConfig,

    #[serde(default)]
    pub playback: PlaybackFileConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Audio output device selection.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Output device name prefix; None = system default device
    #[serde(default)]
    pub name: Option<String>,

    /// Playback sample rate
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

/// Refresh polling intervals.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_update_secs")]
    pub update_secs: u64,

    #[serde(default = "default_background_update_secs")]
    pub background_update_secs: u64,
}

/// Autoplay scan settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AutoplayConfig {
    #[serde(default = "default_autoplay_enabled")]
    pub enabled: bool,

    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
}

/// Temp-clip location and completion timing.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackFileConfig {
    /// Fixed path for the downloaded clip; None = per-user data dir
    #[serde(default)]
    pub temp_file: Option<PathBuf>,

    /// Slack added to the clip duration before the completion stop fires
    #[serde(default = "default_finish_slack_secs")]
    pub finish_slack_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_update_secs() -> u64 {
    30
}

fn default_background_update_secs() -> u64 {
    60
}

fn default_autoplay_enabled() -> bool {
    true
}

fn default_poll_secs() -> u64 {
    5
}

fn default_finish_slack_secs() -> u64 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: None,
            sample_rate: default_sample_rate(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            update_secs: default_update_secs(),
            background_update_secs: default_background_update_secs(),
        }
    }
}

impl Default for AutoplayConfig {
    fn default() -> Self {
        Self {
            enabled: default_autoplay_enabled(),
            poll_secs: default_poll_secs(),
        }
    }
}

impl Default for PlaybackFileConfig {
    fn default() -> Self {
        Self {
            temp_file: None,
            finish_slack_secs: default_finish_slack_secs(),
        }
    }
}

impl Config {
    /// Load and parse the configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Config = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))?;
        Ok(config)
    }

    /// Fixed path of the temp audio clip for the current session.
    pub fn temp_file_path(&self) -> PathBuf {
        if let Some(path) = &self.playback.temp_file {
            return path.clone();
        }
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("speaker-console")
            .join("announcement.wav")
    }

    pub fn schedule_update_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.update_secs.max(1))
    }

    pub fn background_update_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.background_update_secs.max(1))
    }

    pub fn autoplay_poll_interval(&self) -> Duration {
        Duration::from_secs(self.autoplay.poll_secs.max(1))
    }

    pub fn finish_slack(&self) -> Duration {
        Duration::from_secs(self.playback.finish_slack_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            api_url = "http://127.0.0.1:8080/api"
            user_id = "e8c1c5d1-dfa5-4252-ad97-5d3d222794e1"
            "#,
        )
        .unwrap();

        assert_eq!(config.device.sample_rate, 44100);
        assert_eq!(config.schedule.update_secs, 30);
        assert!(config.autoplay.enabled);
        assert_eq!(config.logging.level, "info");
        assert!(config
            .temp_file_path()
            .ends_with("speaker-console/announcement.wav"));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config: Config = toml::from_str(
            r#"
            api_url = "http://127.0.0.1:8080/api"
            user_id = "e8c1c5d1-dfa5-4252-ad97-5d3d222794e1"

            [device]
            name = "Speakers (USB Audio)"
            sample_rate = 48000

            [autoplay]
            enabled = false
            poll_secs = 2

            [playback]
            temp_file = "/tmp/clip.wav"
            "#,
        )
        .unwrap();

        assert_eq!(config.device.name.as_deref(), Some("Speakers (USB Audio)"));
        assert_eq!(config.device.sample_rate, 48000);
        assert!(!config.autoplay.enabled);
        assert_eq!(config.temp_file_path(), PathBuf::from("/tmp/clip.wav"));
    }
}
