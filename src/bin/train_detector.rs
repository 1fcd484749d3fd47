//! train_detector - run YOLO training with the project's hyperparameters.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use safety_detect::config::DetectorConfig;
use safety_detect::train::{TrainingPlan, DEFAULT_YOLO_BIN};

#[derive(Parser, Debug)]
#[command(author, version, about = "Train the safety equipment detector with Ultralytics YOLO")]
struct Args {
    /// Ultralytics CLI executable.
    #[arg(long, default_value = DEFAULT_YOLO_BIN)]
    yolo_bin: PathBuf,

    /// Starting weights.
    #[arg(long)]
    model: Option<String>,

    /// Dataset description (YAML).
    #[arg(long)]
    data: Option<String>,

    #[arg(long)]
    epochs: Option<u32>,

    /// Training device (GPU index or cpu).
    #[arg(long)]
    device: Option<String>,

    /// Print the command instead of running it.
    #[arg(long)]
    dry_run: bool,

    /// Configuration file (overrides SAFETY_DETECT_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => DetectorConfig::load_from(path)?,
        None => DetectorConfig::load()?,
    };
    let mut plan = TrainingPlan::default().with_overrides(&config.train);
    if let Some(model) = args.model {
        plan.model = model;
    }
    if let Some(data) = args.data {
        plan.data = data;
    }
    if let Some(epochs) = args.epochs {
        plan.epochs = epochs;
    }
    if let Some(device) = args.device {
        plan.device = device;
    }
    plan.validate()?;

    if args.dry_run {
        println!("{}", plan.command_line(&args.yolo_bin));
        return Ok(());
    }

    let status = plan.run(&args.yolo_bin)?;
    if !status.success() {
        return Err(anyhow!("training failed: {}", status));
    }
    Ok(())
}
