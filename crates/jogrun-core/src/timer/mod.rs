mod config;
mod engine;
mod scheduler;
mod state;

pub use config::{AutoDetectMode, Phase, TimerConfig};
pub use engine::{TimerEngine, DEFAULT_WARNING_SECS};
pub use scheduler::{DriftClock, TickEmitter, TickScheduler, TICK_PERIOD};
pub use state::{reduce, TimerAction, TimerState, TimerStatus};
