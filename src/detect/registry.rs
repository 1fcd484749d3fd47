use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Result};

use super::backend::DetectorBackend;
use super::backends::StubBackend;
use crate::device::ComputeDevice;

/// Detector backends this build knows how to construct.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Stub,
    Tract,
}

impl BackendKind {
    /// `tract` when compiled in, `stub` otherwise.
    pub fn default_for_build() -> Self {
        if cfg!(feature = "backend-tract") {
            BackendKind::Tract
        } else {
            BackendKind::Stub
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Stub => "stub",
            BackendKind::Tract => "tract",
        }
    }

    /// Whether the backend can run on an accelerator. Neither the stub nor
    /// tract has a GPU path.
    pub const fn supports_gpu(self) -> bool {
        match self {
            BackendKind::Stub | BackendKind::Tract => false,
        }
    }

    /// Device used when none was requested: GPU 0 where supported, else CPU.
    pub const fn default_device(self) -> ComputeDevice {
        if self.supports_gpu() {
            ComputeDevice::Cuda(0)
        } else {
            ComputeDevice::Cpu
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(BackendKind::Stub),
            "tract" | "onnx" => Ok(BackendKind::Tract),
            other => Err(anyhow!("unknown detector backend '{}'", other)),
        }
    }
}

/// Build the detector once at startup. `requested` is `None` when no device
/// was configured. The returned device is the one the backend will actually
/// run on.
pub fn build_backend(
    kind: BackendKind,
    model_path: &Path,
    input_size: u32,
    requested: Option<ComputeDevice>,
) -> Result<(Box<dyn DetectorBackend>, ComputeDevice)> {
    let device = match requested {
        Some(device) => device.resolve(kind.supports_gpu()),
        None => kind.default_device(),
    };
    let mut backend: Box<dyn DetectorBackend> = match kind {
        BackendKind::Stub => {
            log::warn!("using stub detector backend; no detections will be produced");
            Box::new(StubBackend::new())
        }
        BackendKind::Tract => build_tract(model_path, input_size)?,
    };
    backend.warm_up()?;
    log::info!(
        "detector backend '{}' ready on {}",
        backend.name(),
        device.label()
    );
    Ok((backend, device))
}

#[cfg(feature = "backend-tract")]
fn build_tract(model_path: &Path, input_size: u32) -> Result<Box<dyn DetectorBackend>> {
    log::info!("loading ONNX model {}", model_path.display());
    Ok(Box::new(super::backends::TractBackend::new(
        model_path, input_size,
    )?))
}

#[cfg(not(feature = "backend-tract"))]
fn build_tract(model_path: &Path, _input_size: u32) -> Result<Box<dyn DetectorBackend>> {
    Err(anyhow!(
        "cannot load {}: the tract backend requires the backend-tract feature",
        model_path.display()
    ))
}
