//! Whole-file annotation pass.

use anyhow::{Context, Result};

use crate::annotate::{annotate, AnnotateConfig};
use crate::classes::ClassTable;
use crate::detect::DetectorBackend;
use crate::error::PipelineError;
use crate::ingest::FrameSource;
use crate::sink::FrameSink;
use crate::ui::FrameProgress;

/// Frames between `processed N frames` log lines.
pub const PROGRESS_INTERVAL: u64 = 30;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub frames_read: u64,
    pub frames_written: u64,
    pub frames_skipped: u64,
    pub detections: u64,
}

/// Annotate every frame of `source` into `sink`. The sink is not finished.
pub fn annotate_stream(
    source: &mut FrameSource,
    detector: &mut dyn DetectorBackend,
    classes: &ClassTable,
    config: &AnnotateConfig,
    sink: &mut dyn FrameSink,
    progress: &FrameProgress,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();

    loop {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(err) if PipelineError::is_invalid_frame(&err) => {
                log::warn!("skipping undecodable frame: {:#}", err);
                summary.frames_skipped += 1;
                continue;
            }
            Err(err) => {
                log::error!(
                    "stopping after {} frames: {:#}",
                    summary.frames_read,
                    err
                );
                break;
            }
        };
        summary.frames_read += 1;
        progress.inc();

        match detector.detect(&frame, &config.params) {
            Ok(detections) => {
                let annotated = annotate(frame, &detections, classes, config);
                summary.detections += annotated.stats.total_detections as u64;
                sink.write(&annotated.frame)
                    .context("write annotated frame")?;
                summary.frames_written += 1;
            }
            Err(err) => {
                log::warn!(
                    "detector failed on frame {}, skipping: {:#}",
                    summary.frames_read,
                    err
                );
                summary.frames_skipped += 1;
            }
        }

        if summary.frames_read % PROGRESS_INTERVAL == 0 {
            log::info!("processed {} frames", summary.frames_read);
        }
    }

    progress.finish();
    log::info!(
        "detection complete: {} frames read, {} written, {} skipped, {} detections",
        summary.frames_read,
        summary.frames_written,
        summary.frames_skipped,
        summary.detections
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BBox, DetectParams, RawDetection, StubBackend};
    use crate::frame::Frame;
    use crate::ingest::{SourceHints, SourceSpec};
    use crate::ui::{Ui, UiMode};

    #[derive(Default)]
    struct CountingSink {
        frames: Vec<(u32, u32)>,
    }

    impl FrameSink for CountingSink {
        fn write(&mut self, frame: &Frame) -> Result<()> {
            self.frames.push((frame.width(), frame.height()));
            Ok(())
        }

        fn finish(self: Box<Self>) -> Result<()> {
            Ok(())
        }

        fn frames_written(&self) -> u64 {
            self.frames.len() as u64
        }
    }

    #[test]
    fn annotates_every_frame_of_a_finite_source() -> Result<()> {
        let hints = SourceHints {
            width: 64,
            height: 48,
            fps: 20,
        };
        let mut source = FrameSource::open(&SourceSpec::parse("stub://clip?frames=35"), &hints)?;
        let mut detector = StubBackend::scripted(vec![RawDetection::new(
            BBox::new(4.0, 4.0, 20.0, 20.0),
            0.8,
            0,
        )]);
        let config = AnnotateConfig {
            params: DetectParams::default(),
            bounds_check: false,
        };
        let mut sink = CountingSink::default();
        let progress = Ui::new(UiMode::Plain, false).frames(None);

        let summary = annotate_stream(
            &mut source,
            &mut detector,
            &ClassTable::safety_equipment(),
            &config,
            &mut sink,
            &progress,
        )?;

        assert_eq!(summary.frames_read, 35);
        assert_eq!(summary.frames_written, 35);
        assert_eq!(summary.detections, 35);
        assert_eq!(sink.frames_written(), 35);
        assert!(sink.frames.iter().all(|dims| *dims == (64, 48)));
        assert_eq!(progress.position(), 35);
        Ok(())
    }

    #[test]
    fn corrupt_frame_is_skipped_and_grab_failure_ends_the_pass() -> Result<()> {
        let hints = SourceHints {
            width: 32,
            height: 24,
            fps: 20,
        };
        let mut source = FrameSource::open(
            &SourceSpec::parse("stub://clip?frames=10&corrupt=2&fail_at=5"),
            &hints,
        )?;
        let mut detector = StubBackend::new();
        let config = AnnotateConfig {
            params: DetectParams::default(),
            bounds_check: false,
        };
        let mut sink = CountingSink::default();
        let progress = Ui::new(UiMode::Plain, false).frames(None);

        let summary = annotate_stream(
            &mut source,
            &mut detector,
            &ClassTable::safety_equipment(),
            &config,
            &mut sink,
            &progress,
        )?;

        assert_eq!(summary.frames_read, 3);
        assert_eq!(summary.frames_skipped, 1);
        assert_eq!(summary.frames_written, 3);
        assert_eq!(sink.frames_written(), 3);
        assert_eq!(source.frames_captured(), 5);
        Ok(())
    }
}
