//! Auto-detection: metric stream -> calibration -> classifier -> detected phase.
//!
//! The detected phase is informational. It is reported alongside the timer
//! state but never drives the timer; the schedule alone decides phase and
//! interval progression.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::calibration::{CalibrationData, CalibrationEngine, CalibrationSettings, CalibrationStatus};
use super::classifier::ClassifierConfig;
use crate::events::Event;
use crate::timer::{AutoDetectMode, Phase};

/// Fixed thresholds used whenever no calibration applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionDefaults {
    pub cadence: ClassifierConfig,
    pub gps_speed: ClassifierConfig,
    pub calibration: CalibrationSettings,
}

impl Default for DetectionDefaults {
    fn default() -> Self {
        Self {
            cadence: ClassifierConfig::CADENCE_DEFAULT,
            gps_speed: ClassifierConfig::GPS_SPEED_DEFAULT,
            calibration: CalibrationSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoDetectResult {
    pub detected_phase: Phase,
    pub current_metric: f64,
    pub calibration_status: CalibrationStatus,
}

#[derive(Debug, Clone)]
pub struct AutoDetectCoordinator {
    mode: AutoDetectMode,
    defaults: DetectionDefaults,
    calibration: CalibrationEngine,
    status: CalibrationStatus,
    detected: Phase,
    metric: f64,
    declared_phase: Phase,
    interval: u32,
}

impl AutoDetectCoordinator {
    pub fn new(defaults: DetectionDefaults) -> Self {
        Self {
            mode: AutoDetectMode::Off,
            defaults,
            calibration: CalibrationEngine::new(defaults.calibration),
            status: CalibrationStatus::None,
            detected: Phase::Jog,
            metric: 0.0,
            declared_phase: Phase::Jog,
            interval: 1,
        }
    }

    pub fn mode(&self) -> AutoDetectMode {
        self.mode
    }

    pub fn calibration_data(&self) -> &CalibrationData {
        self.calibration.data()
    }

    /// Switch sensors. Any change discards calibration state.
    pub fn set_mode(&mut self, mode: AutoDetectMode) -> bool {
        if mode == self.mode {
            return false;
        }
        tracing::debug!(from = %self.mode, to = %mode, "auto-detect mode changed");
        self.mode = mode;
        self.calibration.reset();
        self.status = match mode {
            AutoDetectMode::Treadmill => CalibrationStatus::Calibrating,
            AutoDetectMode::Off | AutoDetectMode::Outdoor => CalibrationStatus::None,
        };
        self.detected = Phase::Jog;
        self.metric = 0.0;
        true
    }

    /// Track the schedule's declared phase and interval.
    pub fn observe_timer(&mut self, declared_phase: Phase, interval: u32) -> Vec<Event> {
        if declared_phase == self.declared_phase && interval == self.interval {
            return Vec::new();
        }
        self.declared_phase = declared_phase;
        self.interval = interval;
        self.evaluate().into_iter().collect()
    }

    /// Feed one metric reading (cadence or speed, depending on mode).
    pub fn on_reading(&mut self, value: f64) -> Vec<Event> {
        let mut events = Vec::new();
        if self.mode == AutoDetectMode::Off || !value.is_finite() {
            return events;
        }
        self.metric = value.max(0.0);

        if self.mode == AutoDetectMode::Treadmill && self.interval == 1 {
            if let Some(cal) = self.calibration.record(self.declared_phase, self.metric) {
                self.status = CalibrationStatus::Calibrated;
                tracing::info!(
                    jog_mean = cal.jog_mean,
                    run_mean = cal.run_mean,
                    threshold = cal.threshold,
                    hysteresis = cal.hysteresis,
                    "cadence calibrated"
                );
                events.push(Event::CalibrationCompleted {
                    jog_mean: cal.jog_mean,
                    run_mean: cal.run_mean,
                    threshold: cal.threshold,
                    hysteresis: cal.hysteresis,
                    at: Utc::now(),
                });
            }
        }

        events.extend(self.evaluate());
        events
    }

    /// Thresholds classification currently runs with; `None` while the
    /// detected phase mirrors the schedule or detection is off.
    pub fn active_classifier(&self) -> Option<ClassifierConfig> {
        match self.mode {
            AutoDetectMode::Off => None,
            AutoDetectMode::Outdoor => Some(self.defaults.gps_speed),
            AutoDetectMode::Treadmill => match self.calibration.calibration() {
                Some(cal) => Some(cal.classifier()),
                None if self.interval == 1 => None,
                None => Some(self.defaults.cadence),
            },
        }
    }

    pub fn result(&self) -> Option<AutoDetectResult> {
        if self.mode == AutoDetectMode::Off {
            return None;
        }
        Some(AutoDetectResult {
            detected_phase: self.detected,
            current_metric: self.metric,
            calibration_status: self.status,
        })
    }

    fn evaluate(&mut self) -> Option<Event> {
        if self.mode == AutoDetectMode::Off {
            return None;
        }
        let next = match self.active_classifier() {
            Some(cfg) => cfg.classify(self.metric, self.detected),
            // Still calibrating: trust the schedule.
            None => self.declared_phase,
        };
        if next == self.detected {
            return None;
        }
        self.detected = next;
        tracing::debug!(phase = %next, metric = self.metric, "detected phase changed");
        Some(Event::PhaseDetected {
            phase: next,
            metric: self.metric,
            at: Utc::now(),
        })
    }
}

impl Default for AutoDetectCoordinator {
    fn default() -> Self {
        Self::new(DetectionDefaults::default())
    }
}
