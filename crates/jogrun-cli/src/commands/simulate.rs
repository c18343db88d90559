//! Deterministic replay: one loop iteration is one second, no wall clock.

use clap::Args;
use jogrun_core::{JsonLinesSink, SessionCommand, TimerStatus, Workout};

use super::{load_workout, WorkoutArgs};

#[derive(Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub workout: WorkoutArgs,
    /// Stop after this many ticks (default: until the workout completes)
    #[arg(long)]
    pub ticks: Option<u64>,
    /// Pre-workout countdown seconds
    #[arg(long, default_value_t = 0)]
    pub countdown: u32,
    /// Sensor reading delivered after tick N, as N=VALUE (repeatable)
    #[arg(long = "reading", value_parser = parse_reading)]
    pub readings: Vec<(u64, f64)>,
    /// Pause after tick N (repeatable)
    #[arg(long = "pause-at")]
    pub pause_at: Vec<u64>,
    /// Resume after tick N (repeatable)
    #[arg(long = "resume-at")]
    pub resume_at: Vec<u64>,
    /// Print a state snapshot after every tick
    #[arg(long)]
    pub snapshots: bool,
}

fn parse_reading(s: &str) -> Result<(u64, f64), String> {
    let (tick, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TICK=VALUE, got '{s}'"))?;
    let tick = tick
        .trim()
        .parse()
        .map_err(|e| format!("bad tick '{tick}': {e}"))?;
    let value = value
        .trim()
        .parse()
        .map_err(|e| format!("bad value '{value}': {e}"))?;
    Ok((tick, value))
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (timer, mut settings) = load_workout(&args.workout)?;
    settings.countdown_secs = args.countdown;

    let mut workout = Workout::with_settings(JsonLinesSink::new(std::io::stdout()), settings);
    workout.command(SessionCommand::Start { config: timer });
    apply_at(&mut workout, &args, 0);

    // Every unpaused tick counts down, moves the timer or crosses a
    // zero-length phase, and no pause outlasts the last resume.
    let limit = args.ticks.unwrap_or_else(|| {
        let last_resume = args.resume_at.iter().max().copied().unwrap_or(0);
        u64::from(args.countdown)
            + timer.total_secs()
            + 2 * u64::from(timer.interval_count)
            + last_resume
    });

    let mut tick = 0;
    while tick < limit {
        if args.ticks.is_none() && finished(&workout) {
            break;
        }
        tick += 1;
        workout.tick();
        apply_at(&mut workout, &args, tick);
        if args.snapshots {
            workout.command(SessionCommand::Snapshot);
        }
    }

    if !args.snapshots {
        workout.command(SessionCommand::Snapshot);
    }
    tracing::debug!(ticks = tick, status = ?workout.state().status, "simulation finished");
    Ok(())
}

fn finished(workout: &Workout<JsonLinesSink<std::io::Stdout>>) -> bool {
    workout.countdown().is_none()
        && matches!(workout.state().status, TimerStatus::Completed | TimerStatus::Idle)
}

fn apply_at(workout: &mut Workout<JsonLinesSink<std::io::Stdout>>, args: &SimulateArgs, tick: u64) {
    if args.pause_at.contains(&tick) {
        workout.command(SessionCommand::Pause);
    }
    if args.resume_at.contains(&tick) {
        workout.command(SessionCommand::Resume);
    }
    for &(_, value) in args.readings.iter().filter(|(at, _)| *at == tick) {
        workout.reading(value);
    }
}
