//! Synthetic source (`stub://`) for tests and dry runs.
//!
//! Query keys: `frames=N` ends the stream after N frames, `corrupt=K` makes
//! the K-th pull an undecodable frame, `fail_at=K` makes the K-th pull a
//! failed grab. Pulls are counted from 1. Unknown keys are ignored.

use anyhow::{anyhow, bail, Result};

use super::{SourceHints, SourceInfo};
use crate::error::PipelineError;
use crate::frame::Frame;

pub(crate) struct SyntheticSource {
    name: String,
    width: u32,
    height: u32,
    fps: u32,
    options: SyntheticOptions,
    frame_count: u64,
    scene_state: u8,
}

impl SyntheticSource {
    pub(crate) fn new(name: &str, hints: &SourceHints) -> Result<Self> {
        if hints.width == 0 || hints.height == 0 {
            return Err(anyhow!(
                "synthetic source needs a non-empty geometry, got {}x{}",
                hints.width,
                hints.height
            ));
        }
        let options = parse_options(name)?;
        log::info!("SyntheticSource: connected to {}", name);
        Ok(Self {
            name: name.to_string(),
            width: hints.width,
            height: hints.height,
            fps: hints.fps.max(1),
            options,
            frame_count: 0,
            scene_state: 0,
        })
    }

    pub(crate) fn info(&self) -> SourceInfo {
        SourceInfo {
            width: self.width,
            height: self.height,
            fps: f64::from(self.fps),
        }
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self
            .options
            .limit
            .is_some_and(|limit| self.frame_count >= limit)
        {
            log::debug!("SyntheticSource: {} exhausted", self.name);
            return Ok(None);
        }
        self.frame_count += 1;
        if self.options.fail_at == Some(self.frame_count) {
            bail!("{}: grab failed at frame {}", self.name, self.frame_count);
        }
        if self.options.corrupt_at == Some(self.frame_count) {
            return Err(PipelineError::InvalidFrame(format!(
                "{}: corrupt frame {}",
                self.name, self.frame_count
            ))
            .into());
        }
        let pixels = self.generate_synthetic_pixels();
        Ok(Some(Frame::from_rgb(pixels, self.width, self.height)?))
    }

    pub(crate) fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    fn generate_synthetic_pixels(&mut self) -> Vec<u8> {
        let pixel_count = (self.width as usize) * (self.height as usize) * 3;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        pixels
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct SyntheticOptions {
    /// Without a limit frames never run out.
    limit: Option<u64>,
    corrupt_at: Option<u64>,
    fail_at: Option<u64>,
}

fn parse_options(name: &str) -> Result<SyntheticOptions> {
    let mut options = SyntheticOptions::default();
    let Some((_, query)) = name.split_once('?') else {
        return Ok(options);
    };
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let slot = match key {
            "frames" => &mut options.limit,
            "corrupt" => &mut options.corrupt_at,
            "fail_at" => &mut options.fail_at,
            _ => continue,
        };
        let parsed = value
            .parse::<u64>()
            .map_err(|_| anyhow!("invalid {} '{}' in {}", key, value, name))?;
        *slot = Some(parsed);
    }
    Ok(options)
}
