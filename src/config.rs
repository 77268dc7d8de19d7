use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::report::Thresholds;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Application configuration loaded from TOML config file.
/// All fields have sensible defaults — the config file is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Frame rate shared by both dancers' sequences.
    pub fps: f64,
    /// Continuous windowed alignment settings.
    pub continuous: ContinuousConfig,
    /// Key-pose segmentation and segment alignment settings.
    pub segments: SegmentConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            continuous: ContinuousConfig::default(),
            segments: SegmentConfig::default(),
        }
    }
}

/// Continuous windowed aligner parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContinuousConfig {
    /// Half-width of the candidate search window, in seconds.
    pub window_radius_sec: f64,
    /// Spacing between query times, in seconds.
    pub analysis_interval_sec: f64,
    pub pose_weight: f64,
    pub velocity_weight: f64,
    /// User ahead of the reference by more than this many seconds is "Early".
    pub early_threshold: f64,
    /// User behind the reference by more than this many seconds is "Late".
    pub late_threshold: f64,
}

impl Default for ContinuousConfig {
    fn default() -> Self {
        Self {
            window_radius_sec: 0.5,
            analysis_interval_sec: 0.5,
            pose_weight: 0.7,
            velocity_weight: 0.3,
            early_threshold: 0.15,
            late_threshold: 0.15,
        }
    }
}

impl ContinuousConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            early: self.early_threshold,
            late: self.late_threshold,
        }
    }
}

/// Discrete key-pose segmentation parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Mean joint speed below which a local minimum counts as a key pose.
    pub motion_threshold: f64,
    /// Offsets in `[-offset_window, offset_window]` frames are searched per segment.
    pub offset_window: usize,
    pub early_threshold: f64,
    pub late_threshold: f64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            motion_threshold: 0.05,
            offset_window: 10,
            early_threshold: 0.05,
            late_threshold: 0.05,
        }
    }
}

impl SegmentConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            early: self.early_threshold,
            late: self.late_threshold,
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/stepsync/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => match Self::load_from(&path) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Failed to load {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load config from an explicit path. Unlike [`AppConfig::load`], failures are errors.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&contents)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str::<AppConfig>(contents)?)
    }

    /// Reject values the aligners cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("fps", self.fps)?;

        let c = &self.continuous;
        positive("continuous.window_radius_sec", c.window_radius_sec)?;
        positive("continuous.analysis_interval_sec", c.analysis_interval_sec)?;
        finite("continuous.pose_weight", c.pose_weight)?;
        finite("continuous.velocity_weight", c.velocity_weight)?;
        positive("continuous.early_threshold", c.early_threshold)?;
        positive("continuous.late_threshold", c.late_threshold)?;

        let s = &self.segments;
        positive("segments.motion_threshold", s.motion_threshold)?;
        positive("segments.early_threshold", s.early_threshold)?;
        positive("segments.late_threshold", s.late_threshold)?;
        Ok(())
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} is not a finite number"),
        })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be > 0, got {value}"),
        })
    }
}
