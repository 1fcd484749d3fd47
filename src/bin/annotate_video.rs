//! annotate_video - annotate every frame of a video file.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use safety_detect::batch::annotate_stream;
use safety_detect::cli::{DetectorArgs, DetectorSession};
use safety_detect::ingest::{FrameSource, SourceHints, SourceSpec};
use safety_detect::sink::open_sink;
use safety_detect::ui::Ui;

#[derive(Parser, Debug)]
#[command(author, version, about = "Annotate safety equipment detections in a video file")]
struct Args {
    /// Input video.
    #[arg(long, short = 'i', default_value = "input.mp4")]
    input: String,

    /// Annotated output: video file, or a directory for PNG frames.
    #[arg(long, short = 'o', default_value = "output_detected_video.mp4")]
    output: PathBuf,

    #[command(flatten)]
    detector: DetectorArgs,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = Ui::detect(args.detector.ui);

    let config = args.detector.load_config()?;
    let mut session = {
        let _stage = ui.stage("loading detector");
        DetectorSession::start(config, false)?
    };

    let mut source = FrameSource::open(&SourceSpec::parse(&args.input), &SourceHints::default())
        .with_context(|| format!("error opening video file {}", args.input))?;
    let info = source.info();
    let mut sink = open_sink(&args.output, &info)?;

    log::info!("starting detection...");
    let progress = ui.frames(None);
    let summary = annotate_stream(
        &mut source,
        session.detector.as_mut(),
        &session.classes,
        &session.annotate,
        sink.as_mut(),
        &progress,
    );
    let finished = sink.finish();
    summary?;
    finished?;
    log::info!("output saved to {}", args.output.display());
    Ok(())
}
