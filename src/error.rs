//! Failure taxonomy shared by sources, the annotation pipeline and the service.

use thiserror::Error;

use crate::detect::BBox;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Camera, stream or file could not be opened. Fatal for the run or request.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// A frame could not be decoded or has no pixels. Fatal for that frame only.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// A detection whose box has x2 < x1, y2 < y1 or non-finite coordinates.
    /// Recovered by skipping the detection.
    #[error("malformed detection: box ({:.1}, {:.1}, {:.1}, {:.1})", .0.x1, .0.y1, .0.x2, .0.y2)]
    MalformedDetection(BBox),
}

impl PipelineError {
    pub fn is_invalid_frame(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InvalidFrame(_))
        )
    }
}
