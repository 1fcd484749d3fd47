//! live_detect - real-time safety equipment detection.
//!
//! Pulls frames from a camera, stream URL or file, annotates each one and
//! optionally writes the annotated stream to `--output` and the latest frame
//! to `--preview`. Runs until the source ends or Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use safety_detect::cli::{DetectorArgs, DetectorSession};
use safety_detect::ingest::{FrameSource, SourceHints, SourceSpec};
use safety_detect::live::{run_live, LiveOptions};
use safety_detect::sink::{open_sink, FrameSink, SnapshotSink};
use safety_detect::ui::Ui;
use safety_detect::FpsMeter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Real-time safety equipment detection from a webcam, IP camera or video file"
)]
struct Args {
    /// Webcam index (0, 1, ...), stream URL (e.g. http://192.168.1.2:4747/video) or file.
    #[arg(long, default_value = "0")]
    source: String,

    /// Save the annotated stream (video file, or a directory for PNG frames).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Keep the latest annotated frame in this image file.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Stop after this many processed frames.
    #[arg(long)]
    max_frames: Option<u64>,

    /// Requested capture width.
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Requested capture height.
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Requested capture frame rate.
    #[arg(long, default_value_t = 30)]
    fps: u32,

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
        DetectorSession::start(config, true)?
    };
    log::info!("model loaded on device: {}", session.device);

    let spec = SourceSpec::parse(&args.source);
    let hints = SourceHints {
        width: args.width,
        height: args.height,
        fps: args.fps,
    };
    let mut source = FrameSource::open(&spec, &hints)
        .with_context(|| format!("could not open video source {}", args.source))?;
    let info = source.info();

    let mut sinks: Vec<Box<dyn FrameSink>> = Vec::new();
    if let Some(output) = &args.output {
        sinks.push(open_sink(output, &info)?);
        log::info!("saving output to: {}", output.display());
    }
    if let Some(preview) = &args.preview {
        sinks.push(Box::new(SnapshotSink::create(preview)?));
        log::info!("preview image: {}", preview.display());
    }

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    ctrlc::set_handler(move || {
        stop_flag.store(true, Ordering::SeqCst);
    })
    .context("error setting Ctrl-C handler")?;

    let options = LiveOptions {
        annotate: session.annotate,
        device_label: session.device.label(),
        max_frames: args.max_frames,
    };
    let mut fps = FpsMeter::new();
    let result = run_live(
        &mut source,
        session.detector.as_mut(),
        &session.classes,
        &options,
        &mut fps,
        &mut sinks,
        &stop,
    );

    for sink in sinks {
        if let Err(err) = sink.finish() {
            log::error!("failed to finalize output: {:#}", err);
        }
    }
    let summary = result?;
    log::info!(
        "detection stopped after {} frames ({} detections, last FPS {:.1})",
        summary.frames_processed,
        summary.detections,
        summary.last_fps
    );
    Ok(())
}
