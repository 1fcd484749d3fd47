//! Live detection loop.
//!
//! Pull a frame, run the detector, annotate, draw the HUD, hand the frame to
//! every sink, repeat. One frame is in flight at a time. The stop flag is read
//! only between frames.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use image::Rgb;

use crate::annotate::{annotate, draw_hud, AnnotateConfig, FpsMeter, HudLine};
use crate::classes::ClassTable;
use crate::detect::DetectorBackend;
use crate::error::PipelineError;
use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::sink::FrameSink;

const HUD_FPS_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const HUD_INFO_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const HUD_FPS_SCALE: f32 = 30.0;
const HUD_INFO_SCALE: f32 = 22.0;

#[derive(Clone, Debug)]
pub struct LiveOptions {
    pub annotate: AnnotateConfig,
    /// Shown on the HUD, e.g. `CUDA:0`.
    pub device_label: String,
    pub max_frames: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    GrabFailed,
    StopRequested,
    FrameLimit,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LiveSummary {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub detections: u64,
    pub last_fps: f64,
    pub stop_reason: StopReason,
}

/// HUD text for one frame.
pub fn hud_lines(fps: f64, device_label: &str, config: &AnnotateConfig) -> Vec<HudLine> {
    vec![
        HudLine {
            text: format!("FPS: {:.1}", fps),
            color: HUD_FPS_COLOR,
            scale: HUD_FPS_SCALE,
        },
        HudLine {
            text: format!("Device: {}", device_label),
            color: HUD_INFO_COLOR,
            scale: HUD_INFO_SCALE,
        },
        HudLine {
            text: format!(
                "Conf: {} | IoU: {}",
                config.params.conf_threshold, config.params.iou_threshold
            ),
            color: HUD_INFO_COLOR,
            scale: HUD_INFO_SCALE,
        },
    ]
}

/// Run until the source ends, a grab fails, `stop` is raised or the frame
/// limit is reached. Sinks are written but not finished.
pub fn run_live(
    source: &mut FrameSource,
    detector: &mut dyn DetectorBackend,
    classes: &ClassTable,
    options: &LiveOptions,
    fps: &mut FpsMeter,
    sinks: &mut [Box<dyn FrameSink>],
    stop: &AtomicBool,
) -> Result<LiveSummary> {
    let mut summary = LiveSummary {
        frames_processed: 0,
        frames_skipped: 0,
        detections: 0,
        last_fps: fps.fps(),
        stop_reason: StopReason::EndOfStream,
    };
    let mut window_detections = 0u64;

    log::info!("starting real-time detection; press Ctrl-C to stop");
    loop {
        if stop.load(Ordering::SeqCst) {
            summary.stop_reason = StopReason::StopRequested;
            break;
        }
        if options
            .max_frames
            .is_some_and(|limit| summary.frames_processed >= limit)
        {
            summary.stop_reason = StopReason::FrameLimit;
            break;
        }

        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                log::info!("video source ended");
                summary.stop_reason = StopReason::EndOfStream;
                break;
            }
            Err(err) if PipelineError::is_invalid_frame(&err) => {
                log::warn!("skipping frame: {:#}", err);
                summary.frames_skipped += 1;
                continue;
            }
            Err(err) => {
                log::error!("failed to grab frame: {:#}", err);
                summary.stop_reason = StopReason::GrabFailed;
                break;
            }
        };

        let Some(mut annotated) = process_frame(frame, detector, classes, options) else {
            summary.frames_skipped += 1;
            continue;
        };

        summary.frames_processed += 1;
        let accepted = annotated.stats.total_detections as u64;
        summary.detections += accepted;
        window_detections += accepted;
        log::debug!(
            "frame {}: {}",
            summary.frames_processed,
            annotated.stats.summary()
        );

        if let Some(estimate) = fps.tick() {
            log::info!(
                "FPS: {:.1} ({} detections in last window)",
                estimate,
                window_detections
            );
            window_detections = 0;
        }
        summary.last_fps = fps.fps();

        draw_hud(
            annotated.frame.image_mut(),
            &hud_lines(fps.fps(), &options.device_label, &options.annotate),
        );
        for sink in sinks.iter_mut() {
            sink.write(&annotated.frame)
                .context("write annotated frame")?;
        }
    }

    log::info!(
        "detection stopped ({:?}): {} frames processed, {} skipped, {} detections",
        summary.stop_reason,
        summary.frames_processed,
        summary.frames_skipped,
        summary.detections
    );
    Ok(summary)
}

fn process_frame(
    frame: Frame,
    detector: &mut dyn DetectorBackend,
    classes: &ClassTable,
    options: &LiveOptions,
) -> Option<crate::annotate::Annotation> {
    match detector.detect(&frame, &options.annotate.params) {
        Ok(detections) => Some(annotate(frame, &detections, classes, &options.annotate)),
        Err(err) => {
            log::warn!("detector failed, skipping frame: {:#}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::DetectParams;

    #[test]
    fn hud_shows_fps_device_and_thresholds() {
        let config = AnnotateConfig {
            params: DetectParams {
                conf_threshold: 0.5,
                iou_threshold: 0.45,
                max_detections: 300,
            },
            bounds_check: true,
        };
        let lines = hud_lines(12.345, "CUDA:0", &config);
        let text: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(text, vec!["FPS: 12.3", "Device: CUDA:0", "Conf: 0.5 | IoU: 0.45"]);
    }
}
