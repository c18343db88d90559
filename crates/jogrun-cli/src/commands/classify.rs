use clap::Args;
use jogrun_core::{classify, AutoDetectMode, ClassifierConfig, Config, Phase};
use serde::Serialize;

#[derive(Args)]
pub struct ClassifyArgs {
    /// Cadence in steps/min (treadmill) or speed in m/s (outdoor)
    #[arg(allow_negative_numbers = true)]
    pub value: f64,
    /// Which default thresholds to use: treadmill or outdoor
    #[arg(long, default_value = "treadmill")]
    pub mode: AutoDetectMode,
    /// Phase detected before this value (hysteresis side)
    #[arg(long, default_value = "jog")]
    pub previous: Phase,
    /// Override the configured threshold
    #[arg(long)]
    pub threshold: Option<f64>,
    /// Override the configured hysteresis
    #[arg(long)]
    pub hysteresis: Option<f64>,
}

#[derive(Serialize)]
struct Classification {
    value: f64,
    previous: Phase,
    phase: Phase,
    threshold: f64,
    hysteresis: f64,
}

pub fn run(args: ClassifyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let defaults = Config::load()?.detection_defaults();
    let base = match args.mode {
        AutoDetectMode::Treadmill => defaults.cadence,
        AutoDetectMode::Outdoor => defaults.gps_speed,
        AutoDetectMode::Off => return Err("classify needs --mode treadmill or outdoor".into()),
    };
    let cfg = ClassifierConfig::new(
        args.threshold.unwrap_or(base.threshold),
        args.hysteresis.unwrap_or(base.hysteresis),
    );

    let result = Classification {
        value: args.value,
        previous: args.previous,
        phase: classify(args.value, args.previous, &cfg),
        threshold: cfg.threshold,
        hysteresis: cfg.hysteresis,
    };
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
