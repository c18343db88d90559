use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::detect::AutoDetectResult;
use crate::timer::{Phase, TimerStatus};

/// Every observable change in a workout produces an Event.
/// Feedback sinks decide how (and whether) to present each one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Pre-workout countdown second; the workout starts after `1`.
    CountdownTick {
        seconds_left: u32,
        at: DateTime<Utc>,
    },
    WorkoutStarted {
        session_id: Uuid,
        phase: Phase,
        duration_secs: u32,
        total_intervals: u32,
        /// Advisory playback volume, 0.0 .. 1.0.
        volume: f64,
        at: DateTime<Utc>,
    },
    /// Schedule moved to a new phase or interval while running.
    PhaseChanged {
        phase: Phase,
        interval: u32,
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    /// Closing seconds of a jog phase.
    WarningTick {
        seconds_left: u32,
        at: DateTime<Utc>,
    },
    WorkoutPaused {
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    WorkoutResumed {
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    WorkoutStopped {
        at: DateTime<Utc>,
    },
    WorkoutCompleted {
        intervals: u32,
        at: DateTime<Utc>,
    },
    /// Sensor-derived phase changed. Informational only.
    PhaseDetected {
        phase: Phase,
        metric: f64,
        at: DateTime<Utc>,
    },
    CalibrationCompleted {
        jog_mean: f64,
        run_mean: f64,
        threshold: f64,
        hysteresis: f64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        status: TimerStatus,
        phase: Phase,
        interval: u32,
        total_intervals: u32,
        remaining_secs: u32,
        phase_progress: f64,
        workout_progress_pct: f64,
        /// Pending pre-workout countdown, if any.
        countdown: Option<u32>,
        detection: Option<AutoDetectResult>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Snake-case tag as it appears in serialized form.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::CountdownTick { .. } => "countdown_tick",
            Event::WorkoutStarted { .. } => "workout_started",
            Event::PhaseChanged { .. } => "phase_changed",
            Event::WarningTick { .. } => "warning_tick",
            Event::WorkoutPaused { .. } => "workout_paused",
            Event::WorkoutResumed { .. } => "workout_resumed",
            Event::WorkoutStopped { .. } => "workout_stopped",
            Event::WorkoutCompleted { .. } => "workout_completed",
            Event::PhaseDetected { .. } => "phase_detected",
            Event::CalibrationCompleted { .. } => "calibration_completed",
            Event::StateSnapshot { .. } => "state_snapshot",
        }
    }
}
