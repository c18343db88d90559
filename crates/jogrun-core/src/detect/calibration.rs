//! Personal cadence calibration.
//!
//! During the first interval of a treadmill workout, cadence samples are
//! filed under the phase the schedule *declares* (not the detected one).
//! Once both phases have enough samples the jog/run split is fixed at the
//! midpoint of the two means and never recomputed for the session.

use serde::{Deserialize, Serialize};

use super::classifier::ClassifierConfig;
use crate::timer::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationStatus {
    /// No calibration applies (outdoor mode).
    #[default]
    None,
    Calibrating,
    Calibrated,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSettings {
    /// Samples required per phase before a threshold is computed.
    pub min_samples: usize,
    /// Dead band as a share of the jog/run gap.
    pub hysteresis_ratio: f64,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            min_samples: 3,
            hysteresis_ratio: 0.15,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationData {
    pub jog_samples: Vec<f64>,
    pub run_samples: Vec<f64>,
    pub jog_mean: Option<f64>,
    pub run_mean: Option<f64>,
    pub threshold: Option<f64>,
}

impl CalibrationData {
    pub fn samples(&self, phase: Phase) -> &[f64] {
        match phase {
            Phase::Jog => &self.jog_samples,
            Phase::Run => &self.run_samples,
        }
    }
}

/// Result of a completed calibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub jog_mean: f64,
    pub run_mean: f64,
    pub threshold: f64,
    pub hysteresis: f64,
}

impl Calibration {
    pub fn classifier(&self) -> ClassifierConfig {
        ClassifierConfig::new(self.threshold, self.hysteresis)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CalibrationEngine {
    data: CalibrationData,
    settings: CalibrationSettings,
}

impl CalibrationEngine {
    pub fn new(settings: CalibrationSettings) -> Self {
        Self {
            data: CalibrationData::default(),
            settings,
        }
    }

    pub fn data(&self) -> &CalibrationData {
        &self.data
    }

    pub fn is_calibrated(&self) -> bool {
        self.data.threshold.is_some()
    }

    pub fn status(&self) -> CalibrationStatus {
        if self.is_calibrated() {
            CalibrationStatus::Calibrated
        } else {
            CalibrationStatus::Calibrating
        }
    }

    /// File one cadence sample under the declared phase.
    ///
    /// Returns the calibration when this sample completed it. Samples are
    /// ignored once calibrated, and non-positive or non-finite readings are
    /// never recorded.
    pub fn record(&mut self, declared: Phase, cadence: f64) -> Option<Calibration> {
        if self.is_calibrated() || !cadence.is_finite() || cadence <= 0.0 {
            return None;
        }
        match declared {
            Phase::Jog => self.data.jog_samples.push(cadence),
            Phase::Run => self.data.run_samples.push(cadence),
        }
        self.try_compute()
    }

    /// Threshold and dead band learned from the samples, once available.
    pub fn calibration(&self) -> Option<Calibration> {
        let threshold = self.data.threshold?;
        let jog_mean = self.data.jog_mean?;
        let run_mean = self.data.run_mean?;
        Some(Calibration {
            jog_mean,
            run_mean,
            threshold,
            hysteresis: (run_mean - jog_mean).abs() * self.settings.hysteresis_ratio,
        })
    }

    pub fn reset(&mut self) {
        self.data = CalibrationData::default();
    }

    fn try_compute(&mut self) -> Option<Calibration> {
        let min = self.settings.min_samples.max(1);
        if self.data.jog_samples.len() < min || self.data.run_samples.len() < min {
            return None;
        }
        let jog_mean = mean(&self.data.jog_samples);
        let run_mean = mean(&self.data.run_samples);
        self.data.jog_mean = Some(jog_mean);
        self.data.run_mean = Some(run_mean);
        self.data.threshold = Some((jog_mean + run_mean) / 2.0);
        self.calibration()
    }
}

fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> CalibrationEngine {
        CalibrationEngine::new(CalibrationSettings::default())
    }

    #[test]
    fn computes_midpoint_and_scaled_hysteresis() {
        let mut cal = engine();
        for v in [145.0, 150.0, 155.0] {
            assert!(cal.record(Phase::Jog, v).is_none());
        }
        assert!(cal.record(Phase::Run, 185.0).is_none());
        assert!(cal.record(Phase::Run, 190.0).is_none());
        let done = cal.record(Phase::Run, 195.0).expect("calibrated");

        assert!((done.jog_mean - 150.0).abs() < 1e-9);
        assert!((done.run_mean - 190.0).abs() < 1e-9);
        assert!((done.threshold - 170.0).abs() < 1e-9);
        assert!((done.hysteresis - 6.0).abs() < 1e-9);
        assert_eq!(cal.status(), CalibrationStatus::Calibrated);
    }

    #[test]
    fn needs_min_samples_for_both_phases() {
        let mut cal = engine();
        for _ in 0..10 {
            cal.record(Phase::Jog, 150.0);
        }
        cal.record(Phase::Run, 190.0);
        cal.record(Phase::Run, 190.0);
        assert!(!cal.is_calibrated());
        assert_eq!(cal.status(), CalibrationStatus::Calibrating);
        assert!(cal.calibration().is_none());
    }

    #[test]
    fn threshold_frozen_after_first_computation() {
        let mut cal = engine();
        for _ in 0..3 {
            cal.record(Phase::Jog, 150.0);
            cal.record(Phase::Run, 190.0);
        }
        let first = cal.calibration().unwrap();
        assert!(cal.record(Phase::Run, 240.0).is_none());
        assert_eq!(cal.calibration().unwrap(), first);
        assert_eq!(cal.data().run_samples.len(), 3);
    }

    #[test]
    fn ignores_zero_and_non_finite_samples() {
        let mut cal = engine();
        cal.record(Phase::Jog, 0.0);
        cal.record(Phase::Jog, f64::NAN);
        cal.record(Phase::Jog, -4.0);
        assert!(cal.data().samples(Phase::Jog).is_empty());
    }

    #[test]
    fn reset_clears_everything() {
        let mut cal = engine();
        for _ in 0..3 {
            cal.record(Phase::Jog, 150.0);
            cal.record(Phase::Run, 190.0);
        }
        cal.reset();
        assert_eq!(cal.data(), &CalibrationData::default());
        assert!(!cal.is_calibrated());
    }
}
