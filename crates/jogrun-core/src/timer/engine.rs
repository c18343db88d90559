//! Timer engine implementation.
//!
//! The timer engine owns the workout state and is driven from outside: the
//! caller invokes `tick()` once per elapsed second (see
//! [`TickScheduler`](super::TickScheduler)) and forwards user commands.
//!
//! Each command runs the pure [`reduce`] function and then compares the old
//! and new state to derive feedback cues.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new();
//! engine.start(config);
//! // once per second:
//! let events = engine.tick(); // phase changes, warnings, completion
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::{Phase, TimerConfig};
use super::state::{reduce, TimerAction, TimerState, TimerStatus};
use crate::detect::AutoDetectResult;
use crate::events::Event;

/// Seconds before the end of a jog phase during which warning cues fire.
pub const DEFAULT_WARNING_SECS: u32 = 10;

/// Core timer engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    state: TimerState,
    warning_secs: u32,
    /// Set on every start; identifies the workout in lifecycle events.
    #[serde(default)]
    session_id: Option<Uuid>,
}

impl TimerEngine {
    pub fn new() -> Self {
        Self::with_warning_secs(DEFAULT_WARNING_SECS)
    }

    pub fn with_warning_secs(warning_secs: u32) -> Self {
        Self {
            state: TimerState::idle(),
            warning_secs,
            session_id: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn status(&self) -> TimerStatus {
        self.state.status
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, countdown: Option<u32>, detection: Option<AutoDetectResult>) -> Event {
        let s = &self.state;
        Event::StateSnapshot {
            status: s.status,
            phase: s.current_phase,
            interval: s.current_interval,
            total_intervals: s.total_intervals,
            remaining_secs: s.remaining_seconds,
            phase_progress: s.phase_progress(),
            workout_progress_pct: s.workout_progress_pct(),
            countdown,
            detection,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, config: TimerConfig) -> Vec<Event> {
        self.dispatch(TimerAction::Start { config })
    }

    /// Call once per elapsed second.
    pub fn tick(&mut self) -> Vec<Event> {
        self.dispatch(TimerAction::Tick)
    }

    pub fn pause(&mut self) -> Vec<Event> {
        self.dispatch(TimerAction::Pause)
    }

    pub fn resume(&mut self) -> Vec<Event> {
        self.dispatch(TimerAction::Resume)
    }

    pub fn stop(&mut self) -> Vec<Event> {
        self.dispatch(TimerAction::Stop)
    }

    pub fn force_phase(&mut self, phase: Phase) -> Vec<Event> {
        self.dispatch(TimerAction::ForcePhase { phase })
    }

    /// Apply an action and return the cues it produced.
    pub fn dispatch(&mut self, action: TimerAction) -> Vec<Event> {
        let prev = self.state;
        let next = reduce(prev, action);
        self.state = next;

        if matches!(action, TimerAction::Start { .. }) {
            self.session_id = Some(Uuid::new_v4());
        }
        if prev != next {
            tracing::debug!(
                ?action,
                status = ?next.status,
                phase = %next.current_phase,
                interval = next.current_interval,
                remaining = next.remaining_seconds,
                "timer transition"
            );
        }

        let events = self.cues(&prev, &next, action);
        if matches!(action, TimerAction::Stop) {
            self.session_id = None;
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn cues(&self, prev: &TimerState, next: &TimerState, action: TimerAction) -> Vec<Event> {
        let at = Utc::now();
        let mut events = Vec::new();

        match action {
            TimerAction::Start { config } => {
                tracing::info!(
                    jog = config.jog_duration_secs,
                    run = config.run_duration_secs,
                    intervals = config.interval_count,
                    mode = %config.auto_detect_mode,
                    "workout started"
                );
                events.push(Event::WorkoutStarted {
                    session_id: self.session_id.unwrap_or_default(),
                    phase: next.current_phase,
                    duration_secs: next.remaining_seconds,
                    total_intervals: next.total_intervals,
                    volume: config.volume,
                    at,
                });
            }
            TimerAction::Pause if prev.status != next.status => {
                events.push(Event::WorkoutPaused {
                    remaining_secs: next.remaining_seconds,
                    at,
                });
            }
            TimerAction::Resume if prev.status != next.status => {
                events.push(Event::WorkoutResumed {
                    remaining_secs: next.remaining_seconds,
                    at,
                });
            }
            TimerAction::Stop if prev.status != TimerStatus::Idle => {
                tracing::info!("workout stopped");
                events.push(Event::WorkoutStopped { at });
            }
            _ => {}
        }

        let segment_changed = prev.current_phase != next.current_phase
            || prev.current_interval != next.current_interval;
        if prev.is_running() && next.is_running() && segment_changed {
            events.push(Event::PhaseChanged {
                phase: next.current_phase,
                interval: next.current_interval,
                duration_secs: next.remaining_seconds,
                at,
            });
        }

        let warning = next.is_warning(self.warning_secs);
        if warning
            && (!prev.is_warning(self.warning_secs)
                || prev.remaining_seconds != next.remaining_seconds)
        {
            events.push(Event::WarningTick {
                seconds_left: next.remaining_seconds,
                at,
            });
        }

        if next.status == TimerStatus::Completed && prev.status != TimerStatus::Completed {
            tracing::info!(intervals = next.total_intervals, "workout completed");
            events.push(Event::WorkoutCompleted {
                intervals: next.total_intervals,
                at,
            });
        }

        events
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}
