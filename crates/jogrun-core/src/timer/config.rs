use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The two alternating segments of an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Jog,
    Run,
}

impl Phase {
    pub fn other(self) -> Self {
        match self {
            Phase::Jog => Phase::Run,
            Phase::Run => Phase::Jog,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Jog => "jog",
            Phase::Run => "run",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jog" => Ok(Phase::Jog),
            "run" => Ok(Phase::Run),
            other => Err(ValidationError::UnknownPhase(other.to_string())),
        }
    }
}

/// Which sensor, if any, drives phase auto-detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoDetectMode {
    #[default]
    Off,
    /// Step cadence, with first-interval calibration.
    Treadmill,
    /// GPS ground speed with fixed thresholds.
    Outdoor,
}

impl AutoDetectMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AutoDetectMode::Off => "off",
            AutoDetectMode::Treadmill => "treadmill",
            AutoDetectMode::Outdoor => "outdoor",
        }
    }
}

impl fmt::Display for AutoDetectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutoDetectMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(AutoDetectMode::Off),
            "treadmill" => Ok(AutoDetectMode::Treadmill),
            "outdoor" => Ok(AutoDetectMode::Outdoor),
            other => Err(ValidationError::UnknownMode(other.to_string())),
        }
    }
}

/// Workout parameters captured once when a workout starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    pub jog_duration_secs: u32,
    pub run_duration_secs: u32,
    pub interval_count: u32,
    #[serde(default)]
    pub auto_detect_mode: AutoDetectMode,
    /// 0.0 .. 1.0, advisory only; passed through to feedback sinks.
    #[serde(default = "default_volume")]
    pub volume: f64,
}

fn default_volume() -> f64 {
    1.0
}

impl TimerConfig {
    /// Build a validated config from user input.
    ///
    /// # Errors
    ///
    /// Returns an error if `interval_count` is zero or `volume` lies outside
    /// `0.0..=1.0`.
    pub fn new(
        jog_duration_secs: u32,
        run_duration_secs: u32,
        interval_count: u32,
        auto_detect_mode: AutoDetectMode,
        volume: f64,
    ) -> Result<Self, ValidationError> {
        let config = Self {
            jog_duration_secs,
            run_duration_secs,
            interval_count,
            auto_detect_mode,
            volume,
        };
        config.validate()?;
        Ok(config)
    }

    /// Re-check a config that did not come through [`new`](Self::new), such
    /// as one deserialized from a command.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_count == 0 {
            return Err(ValidationError::ZeroIntervals(self.interval_count));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(ValidationError::VolumeOutOfRange(self.volume));
        }
        Ok(())
    }

    /// The placeholder config carried by an idle timer.
    pub fn empty() -> Self {
        Self {
            jog_duration_secs: 0,
            run_duration_secs: 0,
            interval_count: 0,
            auto_detect_mode: AutoDetectMode::Off,
            volume: 1.0,
        }
    }

    pub fn duration_secs(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Jog => self.jog_duration_secs,
            Phase::Run => self.run_duration_secs,
        }
    }

    /// Phase an interval begins with: jog, unless jog has no duration.
    pub fn opening_phase(&self) -> Phase {
        if self.jog_duration_secs == 0 {
            Phase::Run
        } else {
            Phase::Jog
        }
    }

    /// Seconds in one jog + run interval.
    pub fn interval_secs(&self) -> u64 {
        self.jog_duration_secs as u64 + self.run_duration_secs as u64
    }

    /// Total scheduled seconds across all intervals.
    pub fn total_secs(&self) -> u64 {
        self.interval_secs().saturating_mul(self.interval_count as u64)
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_zero_intervals() {
        let err = TimerConfig::new(60, 30, 0, AutoDetectMode::Off, 1.0).unwrap_err();
        assert_eq!(err, ValidationError::ZeroIntervals(0));
    }

    #[test]
    fn new_rejects_volume_out_of_range() {
        assert!(TimerConfig::new(60, 30, 5, AutoDetectMode::Off, 1.5).is_err());
        assert!(TimerConfig::new(60, 30, 5, AutoDetectMode::Off, -0.1).is_err());
        assert!(TimerConfig::new(60, 30, 5, AutoDetectMode::Off, 0.0).is_ok());
    }

    #[test]
    fn validate_catches_literal_configs() {
        let cfg = TimerConfig {
            interval_count: 0,
            ..TimerConfig::new(5, 3, 1, AutoDetectMode::Off, 1.0).unwrap()
        };
        assert_eq!(cfg.validate(), Err(ValidationError::ZeroIntervals(0)));
        assert!(TimerConfig::empty().validate().is_err());
    }

    #[test]
    fn opening_phase_skips_empty_jog() {
        let cfg = TimerConfig::new(0, 30, 2, AutoDetectMode::Off, 1.0).unwrap();
        assert_eq!(cfg.opening_phase(), Phase::Run);
        let cfg = TimerConfig::new(10, 30, 2, AutoDetectMode::Off, 1.0).unwrap();
        assert_eq!(cfg.opening_phase(), Phase::Jog);
    }

    #[test]
    fn total_secs() {
        let cfg = TimerConfig::new(5, 3, 2, AutoDetectMode::Off, 1.0).unwrap();
        assert_eq!(cfg.total_secs(), 16);
    }

    #[test]
    fn mode_and_phase_parse() {
        assert_eq!("Treadmill".parse::<AutoDetectMode>().unwrap(), AutoDetectMode::Treadmill);
        assert!("bike".parse::<AutoDetectMode>().is_err());
        assert_eq!("run".parse::<Phase>().unwrap(), Phase::Run);
        assert_eq!(Phase::Jog.other(), Phase::Run);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let cfg = TimerConfig::new(5, 3, 2, AutoDetectMode::Outdoor, 0.5).unwrap();
        let json = serde_json::to_value(cfg).unwrap();
        assert_eq!(json["auto_detect_mode"], "outdoor");
    }
}
