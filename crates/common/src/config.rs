//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where projects are stored.
    #[serde(default = "dirs_default_projects")]
    pub projects_dir: PathBuf,

    /// Playback tuning parameters.
    #[serde(default)]
    pub playback: PlaybackTuning,

    /// Default export settings.
    #[serde(default)]
    pub export: ExportDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tunable parameters for the preview tick loop and audio sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackTuning {
    /// Fade envelope window at item entry/exit, in milliseconds.
    pub fade_window_ms: u32,

    /// Maximum divergence between a source's actual and expected
    /// position before a forced reseek, in seconds. Tighter values
    /// stutter from frequent reseeks, looser values desync audibly.
    pub drift_tolerance_secs: f64,

    /// Maximum gain change applied per tick while smoothing toward
    /// the target gain.
    pub gain_step: f64,

    /// Gain discrepancies below this snap directly to target.
    pub gain_epsilon: f64,

    /// Preview tick rate in Hz.
    pub tick_rate_hz: u32,
}

/// Default export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDefaults {
    /// Output format identifier (e.g., "mp4-h264").
    pub format: String,

    /// Output width in pixels.
    pub width: u32,

    /// Output height in pixels.
    pub height: u32,

    /// Output frame rate.
    pub fps: u32,

    /// Video bitrate in kbit/s.
    pub video_bitrate_kbps: u32,

    /// Audio bitrate in kbit/s.
    pub audio_bitrate_kbps: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "cutline=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            projects_dir: dirs_default_projects(),
            playback: PlaybackTuning::default(),
            export: ExportDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for PlaybackTuning {
    fn default() -> Self {
        Self {
            fade_window_ms: 50,
            drift_tolerance_secs: 0.25,
            gain_step: 0.08,
            gain_epsilon: 0.001,
            tick_rate_hz: 60,
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            format: "mp4-h264".to_string(),
            width: 1920,
            height: 1080,
            fps: 30,
            video_bitrate_kbps: 8000,
            audio_bitrate_kbps: 192,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl PlaybackTuning {
    /// Fade window in seconds.
    pub fn fade_window_secs(&self) -> f64 {
        self.fade_window_ms as f64 / 1000.0
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("cutline").join("config.json")
}

/// Default projects directory.
fn dirs_default_projects() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("cutline").join("projects")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_sections_default_when_missing() {
        // Old config files that predate newer sections must still load.
        let legacy = r#"{ "projects_dir": "/tmp/projects" }"#;
        let config: AppConfig = serde_json::from_str(legacy).unwrap();
        assert_eq!(config.playback.fade_window_ms, 50);
        assert!((config.playback.drift_tolerance_secs - 0.25).abs() < 1e-9);
        assert_eq!(config.export.width, 1920);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_fade_window_converts_to_secs() {
        let tuning = PlaybackTuning::default();
        assert!((tuning.fade_window_secs() - 0.05).abs() < 1e-9);
    }
}
