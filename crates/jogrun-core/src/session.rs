//! Workout session orchestration.
//!
//! [`Workout`] is the synchronous heart: it owns the timer engine, the
//! auto-detect coordinator and the feedback sink, and reacts to ticks,
//! commands and sensor readings one at a time.
//!
//! [`SessionRunner`] wraps a workout in a single tokio task. Tick firings,
//! commands and sensor readings all arrive on one unbounded queue and are
//! handled to completion in order, so no state is ever touched
//! concurrently. After every input the runner reconciles the tick chain and
//! the sensor subscription with the new state; stopping a workout cancels
//! both before the next input is looked at.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::detect::{AutoDetectCoordinator, DetectionDefaults, Deliver, SensorHub, SensorReading};
use crate::events::Event;
use crate::feedback::{deliver, FeedbackSink};
use crate::timer::{
    AutoDetectMode, Phase, TickEmitter, TickScheduler, TimerConfig, TimerEngine, TimerState,
    TimerStatus, DEFAULT_WARNING_SECS,
};

/// Seconds of pre-workout countdown when none is configured.
pub const DEFAULT_COUNTDOWN_SECS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSettings {
    pub warning_secs: u32,
    /// 0 starts immediately.
    pub countdown_secs: u32,
    pub detection: DetectionDefaults,
}

impl Default for WorkoutSettings {
    fn default() -> Self {
        Self {
            warning_secs: DEFAULT_WARNING_SECS,
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            detection: DetectionDefaults::default(),
        }
    }
}

/// Commands the presentation layer issues.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SessionCommand {
    Start { config: TimerConfig },
    Pause,
    Resume,
    Stop,
    ForcePhase { phase: Phase },
    /// Emit a `StateSnapshot` to the sink.
    Snapshot,
}

#[derive(Debug, Clone, Copy)]
struct PendingStart {
    config: TimerConfig,
    seconds_left: u32,
}

pub struct Workout<S> {
    engine: TimerEngine,
    detector: AutoDetectCoordinator,
    sink: S,
    countdown_secs: u32,
    pending: Option<PendingStart>,
}

impl<S: FeedbackSink> Workout<S> {
    pub fn new(sink: S) -> Self {
        Self::with_settings(sink, WorkoutSettings::default())
    }

    pub fn with_settings(sink: S, settings: WorkoutSettings) -> Self {
        Self {
            engine: TimerEngine::with_warning_secs(settings.warning_secs),
            detector: AutoDetectCoordinator::new(settings.detection),
            sink,
            countdown_secs: settings.countdown_secs,
            pending: None,
        }
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn state(&self) -> &TimerState {
        self.engine.state()
    }

    pub fn detector(&self) -> &AutoDetectCoordinator {
        &self.detector
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Seconds left on a pending pre-workout countdown.
    pub fn countdown(&self) -> Option<u32> {
        self.pending.map(|p| p.seconds_left)
    }

    /// A countdown is pending or the timer is running.
    pub fn needs_clock(&self) -> bool {
        self.pending.is_some() || self.state().is_running()
    }

    /// Sensors are only consulted while a workout is in progress.
    pub fn detection_mode(&self) -> AutoDetectMode {
        match self.state().status {
            TimerStatus::Running | TimerStatus::Paused => self.state().config.auto_detect_mode,
            TimerStatus::Idle | TimerStatus::Completed => AutoDetectMode::Off,
        }
    }

    pub fn snapshot(&self) -> Event {
        self.engine.snapshot(self.countdown(), self.detector.result())
    }

    pub fn command(&mut self, command: SessionCommand) {
        let events = match command {
            SessionCommand::Start { config } => self.request_start(config),
            SessionCommand::Pause => self.engine.pause(),
            SessionCommand::Resume => self.engine.resume(),
            SessionCommand::Stop => {
                self.pending = None;
                self.engine.stop()
            }
            SessionCommand::ForcePhase { phase } => self.engine.force_phase(phase),
            SessionCommand::Snapshot => vec![self.snapshot()],
        };
        self.publish(events);
    }

    /// One elapsed second.
    pub fn tick(&mut self) {
        let events = match self.pending.as_mut() {
            Some(pending) => {
                pending.seconds_left = pending.seconds_left.saturating_sub(1);
                if pending.seconds_left > 0 {
                    vec![Event::CountdownTick {
                        seconds_left: pending.seconds_left,
                        at: chrono::Utc::now(),
                    }]
                } else {
                    let config = pending.config;
                    self.pending = None;
                    self.engine.start(config)
                }
            }
            None => self.engine.tick(),
        };
        self.publish(events);
    }

    /// One metric reading from the active sensor.
    pub fn reading(&mut self, value: f64) {
        let events = self.detector.on_reading(value);
        deliver(&mut self.sink, &events);
    }

    fn request_start(&mut self, config: TimerConfig) -> Vec<Event> {
        let busy = matches!(
            self.state().status,
            TimerStatus::Running | TimerStatus::Paused
        );
        if busy || self.pending.is_some() {
            tracing::warn!(status = ?self.state().status, "start ignored; workout in progress");
            return Vec::new();
        }
        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "start ignored; invalid workout");
            return Vec::new();
        }
        if self.countdown_secs == 0 {
            return self.engine.start(config);
        }
        self.pending = Some(PendingStart {
            config,
            seconds_left: self.countdown_secs,
        });
        vec![Event::CountdownTick {
            seconds_left: self.countdown_secs,
            at: chrono::Utc::now(),
        }]
    }

    /// Deliver timer cues, then let the detector catch up with the new
    /// schedule position.
    fn publish(&mut self, mut events: Vec<Event>) {
        self.detector.set_mode(self.detection_mode());
        let state = *self.state();
        events.extend(
            self.detector
                .observe_timer(state.current_phase, state.current_interval),
        );
        deliver(&mut self.sink, &events);
    }
}

/// Everything that can arrive on the session queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionInput {
    Tick { generation: u64 },
    Command(SessionCommand),
    Reading(SensorReading),
    Shutdown,
}

/// Cloneable sender for a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionInput>,
}

impl SessionHandle {
    /// Returns `false` once the session has shut down.
    pub fn send(&self, command: SessionCommand) -> bool {
        self.tx.send(SessionInput::Command(command)).is_ok()
    }

    pub fn start(&self, config: TimerConfig) -> bool {
        self.send(SessionCommand::Start { config })
    }

    pub fn pause(&self) -> bool {
        self.send(SessionCommand::Pause)
    }

    pub fn resume(&self) -> bool {
        self.send(SessionCommand::Resume)
    }

    pub fn stop(&self) -> bool {
        self.send(SessionCommand::Stop)
    }

    pub fn force_phase(&self, phase: Phase) -> bool {
        self.send(SessionCommand::ForcePhase { phase })
    }

    pub fn shutdown(&self) -> bool {
        self.tx.send(SessionInput::Shutdown).is_ok()
    }
}

pub struct SessionRunner<S> {
    workout: Workout<S>,
    scheduler: TickScheduler,
    sensors: SensorHub,
    tx: mpsc::UnboundedSender<SessionInput>,
    rx: mpsc::UnboundedReceiver<SessionInput>,
    deliver: Deliver,
    finish_on_complete: bool,
    finish_on_stop: bool,
}

impl<S: FeedbackSink> SessionRunner<S> {
    pub fn new(workout: Workout<S>, sensors: SensorHub) -> Self {
        Self::with_scheduler(workout, sensors, TickScheduler::new())
    }

    pub fn with_scheduler(workout: Workout<S>, sensors: SensorHub, scheduler: TickScheduler) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let reading_tx = tx.clone();
        let deliver: Deliver =
            std::sync::Arc::new(move |r| reading_tx.send(SessionInput::Reading(r)).is_ok());
        Self {
            workout,
            scheduler,
            sensors,
            tx,
            rx,
            deliver,
            finish_on_complete: false,
            finish_on_stop: false,
        }
    }

    /// Return from [`run`](Self::run) as soon as the workout completes.
    pub fn finish_on_complete(mut self, finish: bool) -> Self {
        self.finish_on_complete = finish;
        self
    }

    /// Return from [`run`](Self::run) once a stop command leaves nothing
    /// pending.
    pub fn finish_on_stop(mut self, finish: bool) -> Self {
        self.finish_on_stop = finish;
        self
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            tx: self.tx.clone(),
        }
    }

    /// Process inputs until shutdown. Returns the workout for inspection.
    pub async fn run(mut self) -> Workout<S> {
        while let Some(input) = self.rx.recv().await {
            match input {
                SessionInput::Tick { generation } => {
                    if self.scheduler.accepts(generation) {
                        self.workout.tick();
                    } else {
                        tracing::trace!(generation, "stale tick dropped");
                    }
                }
                SessionInput::Command(command) => self.workout.command(command),
                SessionInput::Reading(reading) => {
                    if self.sensors.accepts(&reading) {
                        self.workout.reading(reading.value);
                    } else {
                        tracing::trace!(subscription = %reading.subscription, "stale reading dropped");
                    }
                }
                SessionInput::Shutdown => break,
            }
            self.reconcile();

            if self.finished(&input) {
                break;
            }
        }
        self.scheduler.stop();
        self.sensors.unsubscribe_all();
        self.workout
    }

    fn finished(&self, input: &SessionInput) -> bool {
        let status = self.workout.state().status;
        if self.finish_on_complete && status == TimerStatus::Completed {
            return true;
        }
        self.finish_on_stop
            && matches!(input, SessionInput::Command(SessionCommand::Stop))
            && !self.workout.needs_clock()
    }

    fn reconcile(&mut self) {
        let tx = self.tx.clone();
        self.scheduler.sync(self.workout.needs_clock(), move || -> TickEmitter {
            Box::new(move |generation| tx.send(SessionInput::Tick { generation }).is_ok())
        });
        self.sensors
            .sync(self.workout.detection_mode(), &self.deliver);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::CalibrationStatus;
    use crate::feedback::RecordingSink;

    fn config(jog: u32, run: u32, intervals: u32, mode: AutoDetectMode) -> TimerConfig {
        TimerConfig::new(jog, run, intervals, mode, 1.0).unwrap()
    }

    fn workout(countdown_secs: u32) -> Workout<RecordingSink> {
        Workout::with_settings(
            RecordingSink::new(),
            WorkoutSettings {
                warning_secs: 0,
                countdown_secs,
                ..WorkoutSettings::default()
            },
        )
    }

    #[test]
    fn countdown_precedes_start() {
        let mut w = workout(3);
        w.command(SessionCommand::Start {
            config: config(5, 3, 1, AutoDetectMode::Off),
        });
        assert_eq!(w.countdown(), Some(3));
        assert_eq!(w.state().status, TimerStatus::Idle);
        assert!(w.needs_clock());

        w.tick();
        w.tick();
        assert_eq!(w.countdown(), Some(1));
        w.tick();
        assert_eq!(w.countdown(), None);
        assert_eq!(w.state().status, TimerStatus::Running);
        assert_eq!(w.state().remaining_seconds, 5);

        assert_eq!(
            w.sink().kinds(),
            vec!["countdown_tick", "countdown_tick", "countdown_tick", "workout_started"]
        );
    }

    #[test]
    fn stop_cancels_pending_countdown() {
        let mut w = workout(5);
        w.command(SessionCommand::Start {
            config: config(5, 3, 1, AutoDetectMode::Off),
        });
        w.command(SessionCommand::Stop);
        assert_eq!(w.countdown(), None);
        assert!(!w.needs_clock());
        for _ in 0..10 {
            w.tick();
        }
        assert_eq!(w.state().status, TimerStatus::Idle);
    }

    #[test]
    fn start_ignored_while_running() {
        let mut w = workout(0);
        w.command(SessionCommand::Start {
            config: config(5, 3, 2, AutoDetectMode::Off),
        });
        w.tick();
        w.command(SessionCommand::Start {
            config: config(60, 30, 9, AutoDetectMode::Off),
        });
        assert_eq!(w.state().remaining_seconds, 4);
        assert_eq!(w.state().total_intervals, 2);
    }

    #[test]
    fn start_with_invalid_config_is_ignored() {
        let mut w = workout(0);
        let command: SessionCommand = serde_json::from_value(serde_json::json!({
            "command": "start",
            "config": {
                "jog_duration_secs": 5,
                "run_duration_secs": 3,
                "interval_count": 0
            }
        }))
        .unwrap();
        w.command(command);
        assert_eq!(w.state().status, TimerStatus::Idle);
        assert!(!w.needs_clock());
        assert!(w.sink().events.is_empty());
    }

    #[test]
    fn detection_follows_workout_lifecycle() {
        let mut w = workout(0);
        w.command(SessionCommand::Start {
            config: config(60, 30, 2, AutoDetectMode::Treadmill),
        });
        assert_eq!(w.detection_mode(), AutoDetectMode::Treadmill);
        assert_eq!(
            w.detector().result().unwrap().calibration_status,
            CalibrationStatus::Calibrating
        );
        w.command(SessionCommand::Pause);
        assert_eq!(w.detection_mode(), AutoDetectMode::Treadmill);
        w.command(SessionCommand::Stop);
        assert_eq!(w.detection_mode(), AutoDetectMode::Off);
        assert!(w.detector().result().is_none());
    }

    #[test]
    fn detected_mismatch_never_moves_the_timer() {
        let mut w = workout(0);
        w.command(SessionCommand::Start {
            config: config(60, 30, 2, AutoDetectMode::Outdoor),
        });
        for _ in 0..5 {
            w.reading(6.0);
        }
        assert_eq!(w.detector().result().unwrap().detected_phase, Phase::Run);
        assert_eq!(w.state().current_phase, Phase::Jog);
        assert_eq!(w.state().remaining_seconds, 60);
    }

    #[test]
    fn snapshot_command_reports_detection() {
        let mut w = workout(0);
        w.command(SessionCommand::Start {
            config: config(60, 30, 2, AutoDetectMode::Outdoor),
        });
        w.reading(2.0);
        w.command(SessionCommand::Snapshot);
        match w.sink().events.last() {
            Some(Event::StateSnapshot { detection, .. }) => {
                let d = detection.expect("detection present");
                assert_eq!(d.current_metric, 2.0);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }
}
