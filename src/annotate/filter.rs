use serde::Serialize;

use crate::classes::ClassTable;
use crate::detect::RawDetection;
use crate::error::PipelineError;

/// Outcome of the acceptance checks for one detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    BelowThreshold,
    UnknownClass,
    Malformed,
    OutOfBounds,
}

impl Verdict {
    pub fn is_accepted(self) -> bool {
        self == Verdict::Accepted
    }
}

/// Acceptance rules applied to every detection, in order:
/// confidence, class id, box shape, then (optionally) frame bounds.
#[derive(Clone, Copy, Debug)]
pub struct AcceptancePolicy {
    pub conf_threshold: f32,
    pub bounds_check: bool,
}

impl AcceptancePolicy {
    pub fn check(
        &self,
        det: &RawDetection,
        classes: &ClassTable,
        frame_width: u32,
        frame_height: u32,
    ) -> Verdict {
        if det.confidence.is_nan() || det.confidence < self.conf_threshold {
            return Verdict::BelowThreshold;
        }
        if !classes.contains(det.class_id) {
            return Verdict::UnknownClass;
        }
        if !det.bbox.is_well_formed() {
            log::debug!("{}", PipelineError::MalformedDetection(det.bbox));
            return Verdict::Malformed;
        }
        if self.bounds_check && !det.bbox.is_within(frame_width, frame_height) {
            return Verdict::OutOfBounds;
        }
        Verdict::Accepted
    }
}
