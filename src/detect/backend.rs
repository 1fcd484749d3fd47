use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::detect::result::RawDetection;
use crate::frame::Frame;

/// Thresholds forwarded to the detector.
///
/// `conf_threshold` is also re-applied by the annotation pipeline, so a backend
/// that ignores it still cannot push low-confidence boxes onto a frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectParams {
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            conf_threshold: 0.5,
            iou_threshold: 0.5,
            max_detections: 300,
        }
    }
}

/// Detector capability: image in, raw detections out.
///
/// Non-max suppression is the backend's job. Output order is whatever the
/// backend produces; callers must not depend on it.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on one frame.
    fn detect(&mut self, frame: &Frame, params: &DetectParams) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook, run once before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
