pub mod classify;
pub mod config;
pub mod run;
pub mod simulate;

use clap::Args;
use jogrun_core::error::Result;
use jogrun_core::{AutoDetectMode, Config, TimerConfig, ValidationError, WorkoutSettings};

/// Workout overrides shared by `run` and `simulate`. Unset values come from
/// the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct WorkoutArgs {
    /// Jog phase length in seconds
    #[arg(long)]
    pub jog: Option<u32>,
    /// Run phase length in seconds
    #[arg(long)]
    pub run: Option<u32>,
    /// Number of jog/run intervals
    #[arg(long)]
    pub intervals: Option<u32>,
    /// Auto-detect mode: off, treadmill or outdoor
    #[arg(long)]
    pub mode: Option<AutoDetectMode>,
    /// Cue volume, 0.0 to 1.0
    #[arg(long)]
    pub volume: Option<f64>,
}

impl WorkoutArgs {
    pub fn resolve(&self, config: &Config) -> Result<TimerConfig, ValidationError> {
        TimerConfig::new(
            self.jog.unwrap_or(config.workout.jog_secs),
            self.run.unwrap_or(config.workout.run_secs),
            self.intervals.unwrap_or(config.workout.intervals),
            self.mode.unwrap_or(config.workout.mode),
            self.volume.unwrap_or(config.feedback.volume),
        )
    }
}

/// Workout to run plus the session settings, from the config file and flags.
pub fn load_workout(args: &WorkoutArgs) -> Result<(TimerConfig, WorkoutSettings)> {
    let config = Config::load()?;
    let timer = args.resolve(&config)?;
    Ok((timer, config.workout_settings()))
}
