//! Live workout on the wall clock.
//!
//! Events are printed as JSON lines on stdout. Stdin is read line by line:
//!
//! - `pause`, `resume`, `stop`, `jog`, `run`, `quit`: session commands
//! - `steps N`: cumulative step count, converted to cadence
//! - a bare number: cadence (treadmill) or GPS speed in m/s (outdoor)
//!
//! The session ends when the workout completes, on `stop`, on `quit`, or when
//! stdin closes.

use std::io::BufRead;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use clap::Args;
use jogrun_core::detect::{CadenceWindow, SensorFeed, SpeedFilter};
use jogrun_core::{
    JsonLinesSink, Phase, SensorHub, SensorKind, SensorSource, SessionCommand,
    SessionHandle, SessionRunner, TimerStatus, Workout,
};

use super::{load_workout, WorkoutArgs};

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub workout: WorkoutArgs,
    /// Pre-workout countdown seconds (overrides config)
    #[arg(long)]
    pub countdown: Option<u32>,
    /// Print a state snapshot every second
    #[arg(long)]
    pub snapshots: bool,
}

/// Whichever stdin-backed source is currently subscribed.
type FeedSlot = Arc<Mutex<Option<SensorFeed>>>;

struct StdinSensor {
    kind: SensorKind,
    slot: FeedSlot,
}

impl SensorSource for StdinSensor {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn subscribe(&mut self, feed: SensorFeed) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(feed);
        }
    }

    fn unsubscribe(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            slot.take();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum InputLine {
    Command(SessionCommand),
    Quit,
    Steps(u64),
    Metric(f64),
}

fn parse_line(line: &str) -> Option<InputLine> {
    let line = line.trim();
    let mut words = line.split_whitespace();
    let first = words.next()?.to_ascii_lowercase();
    let parsed = match first.as_str() {
        "pause" => InputLine::Command(SessionCommand::Pause),
        "resume" => InputLine::Command(SessionCommand::Resume),
        "stop" => InputLine::Command(SessionCommand::Stop),
        "status" => InputLine::Command(SessionCommand::Snapshot),
        "quit" | "exit" => InputLine::Quit,
        "jog" | "run" => InputLine::Command(SessionCommand::ForcePhase {
            phase: first.parse::<Phase>().ok()?,
        }),
        "steps" => InputLine::Steps(words.next()?.parse().ok()?),
        _ => InputLine::Metric(line.parse().ok()?),
    };
    Some(parsed)
}

/// Reads stdin on a plain thread; lines become commands or sensor readings.
/// End of input shuts the session down.
fn spawn_stdin_reader(handle: SessionHandle, slot: FeedSlot) {
    std::thread::spawn(move || {
        let started = Instant::now();
        let mut cadence = CadenceWindow::default();
        let mut speed = SpeedFilter::default();

        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let Some(input) = parse_line(&line) else {
                tracing::warn!(%line, "unrecognised input");
                continue;
            };
            let feed = slot.lock().ok().and_then(|s| s.clone());
            match input {
                InputLine::Command(command) => {
                    if !handle.send(command) {
                        break;
                    }
                }
                InputLine::Quit => break,
                InputLine::Steps(total) => {
                    let at_ms = started.elapsed().as_millis() as u64;
                    let spm = cadence.push(at_ms, total);
                    if let (Some(feed), Some(spm)) = (feed, spm) {
                        if feed.kind() == SensorKind::Cadence {
                            feed.push(spm);
                        }
                    }
                }
                InputLine::Metric(value) => match feed {
                    Some(feed) if feed.kind() == SensorKind::GpsSpeed => {
                        if let Some(v) = speed.accept(value) {
                            feed.push(v);
                        }
                    }
                    Some(feed) => {
                        feed.push(value);
                    }
                    None => tracing::debug!(value, "no active sensor; reading ignored"),
                },
            }
        }
        handle.shutdown();
    });
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (timer, mut settings) = load_workout(&args.workout)?;
    if let Some(countdown) = args.countdown {
        settings.countdown_secs = countdown;
    }

    let slot: FeedSlot = Arc::default();
    let sensors = SensorHub::new()
        .with_source(Box::new(StdinSensor {
            kind: SensorKind::Cadence,
            slot: Arc::clone(&slot),
        }))
        .with_source(Box::new(StdinSensor {
            kind: SensorKind::GpsSpeed,
            slot: Arc::clone(&slot),
        }));

    let runtime = tokio::runtime::Runtime::new()?;
    let workout = runtime.block_on(async move {
        let workout = Workout::with_settings(JsonLinesSink::new(std::io::stdout()), settings);
        let runner = SessionRunner::new(workout, sensors)
            .finish_on_complete(true)
            .finish_on_stop(true);
        let handle = runner.handle();
        handle.start(timer);
        spawn_stdin_reader(handle.clone(), slot);

        let snapshots = args.snapshots.then(|| {
            let handle = handle.clone();
            tokio::spawn(async move {
                let mut every = tokio::time::interval(Duration::from_secs(1));
                loop {
                    every.tick().await;
                    if !handle.send(SessionCommand::Snapshot) {
                        break;
                    }
                }
            })
        });

        let workout = runner.run().await;
        if let Some(task) = snapshots {
            task.abort();
        }
        workout
    });

    let status = workout.state().status;
    tracing::info!(?status, "session ended");
    if status == TimerStatus::Completed {
        eprintln!("workout complete: {} intervals", workout.state().total_intervals);
    }
    Ok(())
}
