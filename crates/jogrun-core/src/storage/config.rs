//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - The default workout (durations, interval count, auto-detect mode)
//! - Feedback settings (volume, warning window, pre-countdown)
//! - Detection thresholds and calibration tuning
//!
//! Configuration is stored at `~/.config/jogrun/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::detect::{CalibrationSettings, ClassifierConfig, DetectionDefaults};
use crate::error::{ConfigError, ValidationError};
use crate::session::WorkoutSettings;
use crate::timer::{AutoDetectMode, TimerConfig};

/// Default workout offered by the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutConfig {
    #[serde(default = "default_jog_secs")]
    pub jog_secs: u32,
    #[serde(default = "default_run_secs")]
    pub run_secs: u32,
    #[serde(default = "default_intervals")]
    pub intervals: u32,
    #[serde(default)]
    pub mode: AutoDetectMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// 0.0 ..= 1.0
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default = "default_warning_secs")]
    pub warning_secs: u32,
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Steps per minute.
    #[serde(default = "default_cadence_threshold")]
    pub cadence_threshold: f64,
    #[serde(default = "default_cadence_hysteresis")]
    pub cadence_hysteresis: f64,
    /// Metres per second.
    #[serde(default = "default_gps_threshold")]
    pub gps_threshold: f64,
    #[serde(default = "default_gps_hysteresis")]
    pub gps_hysteresis: f64,
    #[serde(default = "default_min_samples")]
    pub calibration_min_samples: usize,
    #[serde(default = "default_hysteresis_ratio")]
    pub calibration_hysteresis_ratio: f64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/jogrun/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub workout: WorkoutConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
}

// Default functions
fn default_jog_secs() -> u32 {
    60
}
fn default_run_secs() -> u32 {
    30
}
fn default_intervals() -> u32 {
    5
}
fn default_volume() -> f64 {
    1.0
}
fn default_warning_secs() -> u32 {
    crate::timer::DEFAULT_WARNING_SECS
}
fn default_countdown_secs() -> u32 {
    crate::session::DEFAULT_COUNTDOWN_SECS
}
fn default_cadence_threshold() -> f64 {
    ClassifierConfig::CADENCE_DEFAULT.threshold
}
fn default_cadence_hysteresis() -> f64 {
    ClassifierConfig::CADENCE_DEFAULT.hysteresis
}
fn default_gps_threshold() -> f64 {
    ClassifierConfig::GPS_SPEED_DEFAULT.threshold
}
fn default_gps_hysteresis() -> f64 {
    ClassifierConfig::GPS_SPEED_DEFAULT.hysteresis
}
fn default_min_samples() -> usize {
    CalibrationSettings::default().min_samples
}
fn default_hysteresis_ratio() -> f64 {
    CalibrationSettings::default().hysteresis_ratio
}

impl Default for WorkoutConfig {
    fn default() -> Self {
        Self {
            jog_secs: default_jog_secs(),
            run_secs: default_run_secs(),
            intervals: default_intervals(),
            mode: AutoDetectMode::Off,
        }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            warning_secs: default_warning_secs(),
            countdown_secs: default_countdown_secs(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            cadence_threshold: default_cadence_threshold(),
            cadence_hysteresis: default_cadence_hysteresis(),
            gps_threshold: default_gps_threshold(),
            gps_hysteresis: default_gps_hysteresis(),
            calibration_min_samples: default_min_samples(),
            calibration_hysteresis_ratio: default_hysteresis_ratio(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        let mut current = root;
        while let Some(part) = parts.next() {
            if part.is_empty() {
                return Err(unknown());
            }
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => value
                    .parse::<bool>()
                    .map(serde_json::Value::Bool)
                    .map_err(|e| invalid(e.to_string()))?,
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<u64>() {
                        serde_json::Value::Number(n.into())
                    } else if let Ok(n) = value.parse::<f64>() {
                        serde_json::Number::from_f64(n)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                    } else {
                        return Err(invalid(format!("cannot parse '{value}' as number")));
                    }
                }
                serde_json::Value::Object(_) => return Err(unknown()),
                _ => serde_json::Value::String(value.to_string()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file; writing defaults");
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key. Leaves `self` untouched on error.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting workout would be invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.timer_config().map_err(|e| invalid(e.to_string()))?;
        *self = updated;
        Ok(())
    }

    /// All leaf keys with their values, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Ok(serde_json::Value::Object(sections)) = serde_json::to_value(self) {
            for (section, fields) in sections {
                if let serde_json::Value::Object(fields) = fields {
                    for (name, _) in fields {
                        let key = format!("{section}.{name}");
                        if let Some(value) = self.get(&key) {
                            out.push((key, value));
                        }
                    }
                }
            }
        }
        out
    }

    /// The configured default workout.
    pub fn timer_config(&self) -> Result<TimerConfig, ValidationError> {
        TimerConfig::new(
            self.workout.jog_secs,
            self.workout.run_secs,
            self.workout.intervals,
            self.workout.mode,
            self.feedback.volume,
        )
    }

    pub fn detection_defaults(&self) -> DetectionDefaults {
        let d = &self.detection;
        DetectionDefaults {
            cadence: ClassifierConfig::new(d.cadence_threshold, d.cadence_hysteresis),
            gps_speed: ClassifierConfig::new(d.gps_threshold, d.gps_hysteresis),
            calibration: CalibrationSettings {
                min_samples: d.calibration_min_samples.max(1),
                hysteresis_ratio: d.calibration_hysteresis_ratio.max(0.0),
            },
        }
    }

    pub fn workout_settings(&self) -> WorkoutSettings {
        WorkoutSettings {
            warning_secs: self.feedback.warning_secs,
            countdown_secs: self.feedback.countdown_secs,
            detection: self.detection_defaults(),
        }
    }
}
