use anyhow::Result;

use crate::detect::backend::{DetectParams, DetectorBackend};
use crate::detect::result::RawDetection;
use crate::frame::Frame;

/// Stub backend for tests and dry runs. Replays a fixed detection list on every
/// frame, ignoring pixels and thresholds.
#[derive(Clone, Debug, Default)]
pub struct StubBackend {
    script: Vec<RawDetection>,
    calls: u64,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(script: Vec<RawDetection>) -> Self {
        Self { script, calls: 0 }
    }

    /// Number of frames this backend has been asked about.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _frame: &Frame, _params: &DetectParams) -> Result<Vec<RawDetection>> {
        self.calls += 1;
        Ok(self.script.clone())
    }
}
