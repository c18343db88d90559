//! # Jogrun Core Library
//!
//! This library provides the core logic for the jogrun interval timer: a
//! workout alternates jog and run phases for a fixed number of intervals,
//! with optional sensor-based detection of what the runner is actually doing.
//! Every operation is available through the standalone CLI binary; any GUI is
//! a thin layer over the same core.
//!
//! ## Architecture
//!
//! - **Timer**: a pure reducer over [`TimerState`], wrapped by [`TimerEngine`]
//!   for cue derivation and driven by a drift-corrected [`TickScheduler`]
//! - **Detection**: hysteresis classification of cadence or GPS speed, with
//!   first-interval cadence calibration on the treadmill
//! - **Session**: one queue that serialises ticks, commands and sensor
//!   readings for a live workout
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: timer state machine plus feedback cues
//! - [`AutoDetectCoordinator`]: observational phase detection
//! - [`Workout`] / [`SessionRunner`]: synchronous core and its async driver
//! - [`Config`]: application configuration management

pub mod detect;
pub mod error;
pub mod events;
pub mod feedback;
pub mod session;
pub mod storage;
pub mod timer;

pub use detect::{
    classify, AutoDetectCoordinator, AutoDetectResult, CalibrationEngine, CalibrationStatus,
    ClassifierConfig, DetectionDefaults, SensorHub, SensorKind, SensorReading, SensorSource,
};
pub use error::{ConfigError, CoreError, ValidationError};
pub use events::Event;
pub use feedback::{FeedbackSink, JsonLinesSink, RecordingSink, TracingSink};
pub use session::{SessionCommand, SessionHandle, SessionRunner, Workout, WorkoutSettings};
pub use storage::Config;
pub use timer::{
    reduce, AutoDetectMode, Phase, TickScheduler, TimerAction, TimerConfig, TimerEngine,
    TimerState, TimerStatus,
};
