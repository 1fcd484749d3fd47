//! Compute device selection.
//!
//! The `--device` selector is opaque to the annotation pipeline; it only decides
//! where the detector runs and what the live HUD prints.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComputeDevice {
    Cpu,
    Cuda(u32),
}

impl ComputeDevice {
    /// Fall back to CPU when the backend cannot use the requested accelerator.
    pub fn resolve(self, backend_supports_gpu: bool) -> Self {
        match self {
            ComputeDevice::Cuda(index) if !backend_supports_gpu => {
                log::warn!("CUDA:{} requested but not available; using CPU for inference", index);
                ComputeDevice::Cpu
            }
            other => other,
        }
    }

    pub fn label(&self) -> String {
        match self {
            ComputeDevice::Cpu => "CPU".to_string(),
            ComputeDevice::Cuda(index) => format!("CUDA:{index}"),
        }
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for ComputeDevice {
    type Err = anyhow::Error;

    /// Accepts `cpu`, a bare GPU index (`0`), or `cuda:<index>`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        if s == "cpu" {
            return Ok(ComputeDevice::Cpu);
        }
        if s == "cuda" {
            return Ok(ComputeDevice::Cuda(0));
        }
        let index = s.strip_prefix("cuda:").unwrap_or(&s);
        index
            .parse::<u32>()
            .map(ComputeDevice::Cuda)
            .map_err(|_| anyhow!("invalid device '{}': expected cpu, N or cuda:N", s))
    }
}
