//! Frame annotation pipeline.
//!
//! Takes one decoded frame and the detector's raw output for it, decides which
//! detections are acceptable, draws the accepted ones with a confidence-tier
//! style and summarises them. `annotate` keeps no state between calls; frame
//! order only matters to the separate `FpsMeter` used by the live loop.

mod filter;
mod fps;
mod render;
mod stats;
mod style;

pub use filter::{AcceptancePolicy, Verdict};
pub use fps::{FpsMeter, FPS_WINDOW};
pub use render::{draw_hud, HudLine};
pub use stats::FrameStats;
pub use style::{Style, Tier, HIGH_TIER_MIN, MEDIUM_TIER_MIN};

use image::{Rgb, RgbImage};
use serde::Serialize;

use crate::classes::ClassTable;
use crate::detect::{BBox, DetectParams, RawDetection};
use crate::error::PipelineError;
use crate::frame::Frame;

/// Thresholds plus the bounds-check switch.
///
/// `params` is the same value handed to the detector; only
/// `params.conf_threshold` is enforced here.
#[derive(Clone, Copy, Debug)]
pub struct AnnotateConfig {
    pub params: DetectParams,
    pub bounds_check: bool,
}

impl AnnotateConfig {
    pub fn policy(&self) -> AcceptancePolicy {
        AcceptancePolicy {
            conf_threshold: self.params.conf_threshold,
            bounds_check: self.bounds_check,
        }
    }
}

/// How one raw detection was treated.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderedDetection {
    pub label: String,
    pub bbox: BBox,
    pub confidence: f32,
    pub class_id: usize,
    pub tier: Tier,
    #[serde(skip)]
    pub color: Rgb<u8>,
    pub thickness: u32,
    pub verdict: Verdict,
}

impl RenderedDetection {
    pub fn accepted(&self) -> bool {
        self.verdict.is_accepted()
    }
}

#[derive(Clone, Debug)]
pub struct Annotation {
    /// Annotated copy of the input, same dimensions.
    pub frame: Frame,
    pub stats: FrameStats,
    /// Every input detection in input order, accepted or not.
    pub detections: Vec<RenderedDetection>,
}

impl Annotation {
    pub fn accepted(&self) -> impl Iterator<Item = &RenderedDetection> {
        self.detections.iter().filter(|d| d.accepted())
    }
}

/// Filter, style, draw and count `detections` on `frame`.
pub fn annotate(
    mut frame: Frame,
    detections: &[RawDetection],
    classes: &ClassTable,
    config: &AnnotateConfig,
) -> Annotation {
    let policy = config.policy();
    let (width, height) = (frame.width(), frame.height());
    let mut stats = FrameStats::default();
    let mut rendered = Vec::with_capacity(detections.len());

    for det in detections {
        let verdict = policy.check(det, classes, width, height);
        let tier = Tier::from_confidence(det.confidence);
        let style = tier.style();
        let label = classes
            .label(det.class_id)
            .map(str::to_string)
            .unwrap_or_else(|| det.class_id.to_string());

        if verdict.is_accepted() {
            let text = format!("{} {:.2}", label, det.confidence);
            render::draw_detection(frame.image_mut(), &det.bbox, style, &text);
            stats.record(&label, det.confidence);
        } else {
            log::trace!(
                "skipping {} ({:.2}) at {:?}: {:?}",
                label,
                det.confidence,
                det.bbox,
                verdict
            );
        }

        rendered.push(RenderedDetection {
            label,
            bbox: det.bbox,
            confidence: det.confidence,
            class_id: det.class_id,
            tier,
            color: style.color,
            thickness: style.thickness,
            verdict,
        });
    }

    Annotation {
        frame,
        stats,
        detections: rendered,
    }
}

/// `annotate` for an image that has not been validated yet.
pub fn annotate_image(
    image: RgbImage,
    detections: &[RawDetection],
    classes: &ClassTable,
    config: &AnnotateConfig,
) -> Result<Annotation, PipelineError> {
    let frame = Frame::new(image)?;
    Ok(annotate(frame, detections, classes, config))
}
