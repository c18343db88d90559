//! Hysteresis classifier mapping a scalar metric onto a phase.
//!
//! - at or above `threshold + hysteresis`: run
//! - at or below `threshold - hysteresis`: jog
//! - in between: keep the previous phase
//!
//! The dead band keeps a reading that hovers around the threshold from
//! flipping the phase back and forth.

use serde::{Deserialize, Serialize};

use crate::timer::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub threshold: f64,
    /// Half-width of the dead band, never negative.
    pub hysteresis: f64,
}

impl ClassifierConfig {
    /// Treadmill fallback: 170 steps/min, +-5.
    pub const CADENCE_DEFAULT: Self = Self {
        threshold: 170.0,
        hysteresis: 5.0,
    };

    /// Outdoor: 3.0 m/s, +-0.3.
    pub const GPS_SPEED_DEFAULT: Self = Self {
        threshold: 3.0,
        hysteresis: 0.3,
    };

    pub fn new(threshold: f64, hysteresis: f64) -> Self {
        Self {
            threshold,
            hysteresis: hysteresis.max(0.0),
        }
    }

    pub fn lower(&self) -> f64 {
        self.threshold - self.hysteresis
    }

    pub fn upper(&self) -> f64 {
        self.threshold + self.hysteresis
    }

    pub fn classify(&self, value: f64, previous: Phase) -> Phase {
        classify(value, previous, self)
    }
}

pub fn classify(value: f64, previous: Phase, config: &ClassifierConfig) -> Phase {
    if value >= config.upper() {
        Phase::Run
    } else if value <= config.lower() {
        Phase::Jog
    } else {
        previous
    }
}
