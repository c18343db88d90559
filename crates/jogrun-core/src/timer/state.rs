//! Workout state and its pure transition function.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!            |
//!            v
//!        Completed
//!
//! any --stop--> Idle
//! ```
//!
//! Every transition goes through [`reduce`], which maps `(state, action)` to a
//! new state without side effects.

use serde::{Deserialize, Serialize};

use super::config::{Phase, TimerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerAction {
    Start { config: TimerConfig },
    Tick,
    Pause,
    Resume,
    Stop,
    ForcePhase { phase: Phase },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimerState {
    pub status: TimerStatus,
    pub current_phase: Phase,
    /// 1-indexed.
    pub current_interval: u32,
    pub remaining_seconds: u32,
    pub total_intervals: u32,
    pub config: TimerConfig,
}

impl TimerState {
    /// The initial state, also restored by `Stop`.
    pub fn idle() -> Self {
        Self {
            status: TimerStatus::Idle,
            current_phase: Phase::Jog,
            current_interval: 1,
            remaining_seconds: 0,
            total_intervals: 0,
            config: TimerConfig::empty(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn is_last_interval(&self) -> bool {
        self.current_interval >= self.total_intervals
    }

    /// Configured length of the phase currently shown.
    pub fn phase_duration_secs(&self) -> u32 {
        self.config.duration_secs(self.current_phase)
    }

    /// Running in the jog phase with `0 < remaining <= warning_secs`.
    pub fn is_warning(&self, warning_secs: u32) -> bool {
        self.is_running()
            && self.current_phase == Phase::Jog
            && self.remaining_seconds > 0
            && self.remaining_seconds <= warning_secs
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn phase_progress(&self) -> f64 {
        let total = self.phase_duration_secs();
        if total == 0 {
            return 0.0;
        }
        let remaining = self.remaining_seconds.min(total);
        1.0 - (remaining as f64 / total as f64)
    }

    /// 0.0 .. 100.0 progress across the whole workout.
    pub fn workout_progress_pct(&self) -> f64 {
        match self.status {
            TimerStatus::Idle => return 0.0,
            TimerStatus::Completed => return 100.0,
            TimerStatus::Running | TimerStatus::Paused => {}
        }
        let total = self.config.total_secs();
        if total == 0 {
            return 0.0;
        }
        let finished_intervals = self.current_interval.saturating_sub(1) as u64;
        let mut elapsed = finished_intervals * self.config.interval_secs();
        let in_phase = self
            .phase_duration_secs()
            .saturating_sub(self.remaining_seconds) as u64;
        elapsed += match self.current_phase {
            Phase::Jog => in_phase,
            Phase::Run => self.config.jog_duration_secs as u64 + in_phase,
        };
        (elapsed as f64 / total as f64 * 100.0).min(100.0)
    }

    fn enter(self, phase: Phase, interval: u32) -> Self {
        Self {
            current_phase: phase,
            current_interval: interval,
            remaining_seconds: self.config.duration_secs(phase),
            ..self
        }
    }

    fn complete(self) -> Self {
        Self {
            status: TimerStatus::Completed,
            remaining_seconds: 0,
            ..self
        }
    }

    /// Opening phase of the following interval, or completion after the last.
    fn next_interval(self) -> Self {
        if self.is_last_interval() {
            return self.complete();
        }
        let phase = self.config.opening_phase();
        self.enter(phase, self.current_interval + 1)
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Apply one action to a state.
///
/// A zero-length phase is never re-entered within a single call: a tick that
/// expires a phase performs at most one transition, so a 0s/0s workout
/// finishes one interval per tick.
pub fn reduce(state: TimerState, action: TimerAction) -> TimerState {
    match action {
        TimerAction::Start { config } => {
            let config = TimerConfig {
                interval_count: config.interval_count.max(1),
                ..config
            };
            let phase = config.opening_phase();
            TimerState {
                status: TimerStatus::Running,
                current_phase: phase,
                current_interval: 1,
                remaining_seconds: config.duration_secs(phase),
                total_intervals: config.interval_count,
                config,
            }
        }
        TimerAction::Tick => {
            if state.status != TimerStatus::Running {
                return state;
            }
            let next = state.remaining_seconds.saturating_sub(1);
            if next > 0 {
                return TimerState {
                    remaining_seconds: next,
                    ..state
                };
            }
            match state.current_phase {
                Phase::Jog if state.config.run_duration_secs == 0 => state.next_interval(),
                Phase::Jog => state.enter(Phase::Run, state.current_interval),
                Phase::Run => state.next_interval(),
            }
        }
        TimerAction::Pause => match state.status {
            TimerStatus::Running => TimerState {
                status: TimerStatus::Paused,
                ..state
            },
            _ => state,
        },
        TimerAction::Resume => match state.status {
            TimerStatus::Paused => TimerState {
                status: TimerStatus::Running,
                ..state
            },
            _ => state,
        },
        TimerAction::Stop => TimerState::idle(),
        TimerAction::ForcePhase { phase } => {
            if state.status != TimerStatus::Running || state.current_phase == phase {
                return state;
            }
            state.enter(phase, state.current_interval)
        }
    }
}
