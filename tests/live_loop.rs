use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use safety_detect::annotate::{AnnotateConfig, FpsMeter};
use safety_detect::detect::StubBackend;
use safety_detect::live::{run_live, LiveOptions, StopReason};
use safety_detect::{
    BBox, ClassTable, DetectParams, DetectorBackend, Frame, FrameSink, FrameSource, RawDetection,
    SourceHints, SourceSpec,
};

#[derive(Clone, Default)]
struct CollectingSink {
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl FrameSink for CollectingSink {
    fn write(&mut self, frame: &Frame) -> Result<()> {
        self.frames.lock().unwrap().push(frame.clone());
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames.lock().unwrap().len() as u64
    }
}

/// Fails on every second frame.
struct FlakyDetector {
    calls: u64,
}

impl DetectorBackend for FlakyDetector {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn detect(&mut self, _frame: &Frame, _params: &DetectParams) -> Result<Vec<RawDetection>> {
        self.calls += 1;
        if self.calls % 2 == 0 {
            return Err(anyhow!("inference timeout"));
        }
        Ok(Vec::new())
    }
}

fn hints() -> SourceHints {
    SourceHints {
        width: 160,
        height: 120,
        fps: 30,
    }
}

fn options(max_frames: Option<u64>) -> LiveOptions {
    LiveOptions {
        annotate: AnnotateConfig {
            params: DetectParams::default(),
            bounds_check: true,
        },
        device_label: "CPU".to_string(),
        max_frames,
    }
}

fn open(spec: &str) -> FrameSource {
    FrameSource::open(&SourceSpec::parse(spec), &hints()).expect("open synthetic source")
}

#[test]
fn runs_until_source_is_exhausted() -> Result<()> {
    let mut source = open("stub://cam?frames=25");
    let mut detector = StubBackend::scripted(vec![
        RawDetection::new(BBox::new(20.0, 20.0, 60.0, 60.0), 0.9, 0),
        RawDetection::new(BBox::new(100.0, 20.0, 200.0, 60.0), 0.9, 1),
    ]);
    let sink = CollectingSink::default();
    let mut sinks: Vec<Box<dyn FrameSink>> = vec![Box::new(sink.clone())];
    let mut fps = FpsMeter::new();
    let stop = AtomicBool::new(false);

    let summary = run_live(
        &mut source,
        &mut detector,
        &ClassTable::safety_equipment(),
        &options(None),
        &mut fps,
        &mut sinks,
        &stop,
    )?;

    assert_eq!(summary.stop_reason, StopReason::EndOfStream);
    assert_eq!(summary.frames_processed, 25);
    // The second box leaves the 160px frame and is rejected by the bounds check.
    assert_eq!(summary.detections, 25);
    assert_eq!(detector.calls(), 25);
    assert_eq!(sink.frames.lock().unwrap().len(), 25);
    assert!(fps.fps() > 0.0);
    Ok(())
}

#[test]
fn frame_limit_stops_an_endless_source() -> Result<()> {
    let mut source = open("stub://cam");
    let mut detector = StubBackend::new();
    let mut fps = FpsMeter::new();
    let stop = AtomicBool::new(false);

    let summary = run_live(
        &mut source,
        &mut detector,
        &ClassTable::safety_equipment(),
        &options(Some(7)),
        &mut fps,
        &mut [],
        &stop,
    )?;

    assert_eq!(summary.stop_reason, StopReason::FrameLimit);
    assert_eq!(summary.frames_processed, 7);
    Ok(())
}

#[test]
fn stop_signal_is_checked_before_each_frame() -> Result<()> {
    let mut source = open("stub://cam");
    let mut detector = StubBackend::new();
    let mut fps = FpsMeter::new();
    let stop = AtomicBool::new(true);

    let summary = run_live(
        &mut source,
        &mut detector,
        &ClassTable::safety_equipment(),
        &options(None),
        &mut fps,
        &mut [],
        &stop,
    )?;

    assert_eq!(summary.stop_reason, StopReason::StopRequested);
    assert_eq!(summary.frames_processed, 0);
    assert_eq!(source.frames_captured(), 0);
    Ok(())
}

#[test]
fn detector_failures_skip_frames() -> Result<()> {
    let mut source = open("stub://cam?frames=10");
    let mut detector = FlakyDetector { calls: 0 };
    let sink = CollectingSink::default();
    let mut sinks: Vec<Box<dyn FrameSink>> = vec![Box::new(sink.clone())];
    let mut fps = FpsMeter::new();
    let stop = AtomicBool::new(false);

    let summary = run_live(
        &mut source,
        &mut detector,
        &ClassTable::safety_equipment(),
        &options(None),
        &mut fps,
        &mut sinks,
        &stop,
    )?;

    assert_eq!(summary.stop_reason, StopReason::EndOfStream);
    assert_eq!(summary.frames_processed, 5);
    assert_eq!(summary.frames_skipped, 5);
    assert_eq!(sink.frames.lock().unwrap().len(), 5);
    Ok(())
}

#[test]
fn written_frames_carry_the_hud() -> Result<()> {
    let mut source = open("stub://cam?frames=1");
    let mut reference = open("stub://cam?frames=1");
    let raw = reference.next_frame()?.expect("reference frame");

    let sink = CollectingSink::default();
    let mut sinks: Vec<Box<dyn FrameSink>> = vec![Box::new(sink.clone())];
    let mut fps = FpsMeter::new();
    let stop = AtomicBool::new(false);
    run_live(
        &mut source,
        &mut StubBackend::new(),
        &ClassTable::safety_equipment(),
        &options(None),
        &mut fps,
        &mut sinks,
        &stop,
    )?;

    let written = sink.frames.lock().unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(
        (written[0].width(), written[0].height()),
        (raw.width(), raw.height())
    );
    assert_ne!(written[0], raw);
    Ok(())
}

#[test]
fn corrupt_frame_is_skipped_and_grab_failure_stops() -> Result<()> {
    let mut source = open("stub://cam?frames=10&corrupt=3&fail_at=6");
    let mut detector = StubBackend::new();
    let sink = CollectingSink::default();
    let mut sinks: Vec<Box<dyn FrameSink>> = vec![Box::new(sink.clone())];
    let mut fps = FpsMeter::new();
    let stop = AtomicBool::new(false);

    let summary = run_live(
        &mut source,
        &mut detector,
        &ClassTable::safety_equipment(),
        &options(None),
        &mut fps,
        &mut sinks,
        &stop,
    )?;

    assert_eq!(summary.stop_reason, StopReason::GrabFailed);
    assert_eq!(summary.frames_skipped, 1);
    assert_eq!(summary.frames_processed, 4);
    assert_eq!(detector.calls(), 4);
    assert_eq!(sink.frames.lock().unwrap().len(), 4);
    assert_eq!(source.frames_captured(), 6);
    Ok(())
}
