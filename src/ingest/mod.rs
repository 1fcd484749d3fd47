//! Frame sources.
//!
//! A source is named by a single string, the way the `--source` flag takes it:
//! - `0`, `1`, ... : local camera index (`/dev/videoN`, feature `ingest-v4l2`)
//! - `http://...`, `rtsp://...` : network stream (feature `ingest-ffmpeg`)
//! - `stub://name[?frames=N&corrupt=K&fail_at=K]` : synthetic frames for tests and dry runs
//! - anything else : local video file (feature `ingest-ffmpeg`)
//!
//! Sources are pulled one frame at a time. `next_frame` yields `Ok(None)` at
//! end of stream, `Err(PipelineError::InvalidFrame)` for a frame that could not
//! be decoded (the caller may keep pulling), and any other error for a failed
//! grab.

#[cfg(feature = "ingest-ffmpeg")]
mod ffmpeg;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
mod synthetic;
#[cfg(feature = "ingest-v4l2")]
mod v4l2;

use std::fmt;

use anyhow::Result;

use crate::error::PipelineError;
use crate::frame::Frame;

#[cfg(feature = "ingest-ffmpeg")]
use ffmpeg::FfmpegSource;
use synthetic::SyntheticSource;
#[cfg(feature = "ingest-v4l2")]
use v4l2::V4l2Source;

/// Fallback frame rate when a container does not report one.
pub const DEFAULT_SOURCE_FPS: f64 = 20.0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceSpec {
    Camera(u32),
    Stream(String),
    File(String),
    Synthetic(String),
}

impl SourceSpec {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(index) = raw.parse() {
                return SourceSpec::Camera(index);
            }
        }
        if raw.starts_with("stub://") {
            return SourceSpec::Synthetic(raw.to_string());
        }
        if raw.contains("://") {
            return SourceSpec::Stream(raw.to_string());
        }
        SourceSpec::File(raw.to_string())
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Camera(index) => write!(f, "camera {index}"),
            SourceSpec::Stream(url) => f.write_str(url),
            SourceSpec::File(path) => f.write_str(path),
            SourceSpec::Synthetic(name) => f.write_str(name),
        }
    }
}

/// Requested capture geometry. Cameras may negotiate something else; synthetic
/// sources use it as-is; files ignore it.
#[derive(Clone, Copy, Debug)]
pub struct SourceHints {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for SourceHints {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// Geometry the source actually delivers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

pub struct FrameSource {
    spec: SourceSpec,
    backend: SourceBackend,
}

enum SourceBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "ingest-ffmpeg")]
    Ffmpeg(FfmpegSource),
    #[cfg(feature = "ingest-v4l2")]
    V4l2(V4l2Source),
}

impl FrameSource {
    /// Open and connect. Any failure is reported as `SourceUnavailable`.
    pub fn open(spec: &SourceSpec, hints: &SourceHints) -> Result<Self> {
        let backend = open_backend(spec, hints).map_err(|err| {
            anyhow::Error::new(PipelineError::SourceUnavailable(format!("{spec}: {err:#}")))
        })?;
        let source = Self {
            spec: spec.clone(),
            backend,
        };
        let info = source.info();
        log::info!(
            "video source {}: {}x{} @ {:.1} FPS",
            source.spec,
            info.width,
            info.height,
            info.fps
        );
        Ok(source)
    }

    pub fn spec(&self) -> &SourceSpec {
        &self.spec
    }

    pub fn info(&self) -> SourceInfo {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.info(),
            #[cfg(feature = "ingest-ffmpeg")]
            SourceBackend::Ffmpeg(source) => source.info(),
            #[cfg(feature = "ingest-v4l2")]
            SourceBackend::V4l2(source) => source.info(),
        }
    }

    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            SourceBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-ffmpeg")]
            SourceBackend::Ffmpeg(source) => source.next_frame(),
            #[cfg(feature = "ingest-v4l2")]
            SourceBackend::V4l2(source) => source.next_frame(),
        }
    }

    pub fn frames_captured(&self) -> u64 {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.frames_captured(),
            #[cfg(feature = "ingest-ffmpeg")]
            SourceBackend::Ffmpeg(source) => source.frames_captured(),
            #[cfg(feature = "ingest-v4l2")]
            SourceBackend::V4l2(source) => source.frames_captured(),
        }
    }
}

fn open_backend(spec: &SourceSpec, hints: &SourceHints) -> Result<SourceBackend> {
    match spec {
        SourceSpec::Synthetic(name) => Ok(SourceBackend::Synthetic(SyntheticSource::new(
            name, hints,
        )?)),
        SourceSpec::Camera(index) => open_camera(*index, hints),
        SourceSpec::Stream(location) | SourceSpec::File(location) => open_media(location),
    }
}

#[cfg(feature = "ingest-v4l2")]
fn open_camera(index: u32, hints: &SourceHints) -> Result<SourceBackend> {
    let device = format!("/dev/video{index}");
    Ok(SourceBackend::V4l2(V4l2Source::open(&device, hints)?))
}

#[cfg(not(feature = "ingest-v4l2"))]
fn open_camera(index: u32, _hints: &SourceHints) -> Result<SourceBackend> {
    anyhow::bail!("camera {} requires the ingest-v4l2 feature", index)
}

#[cfg(feature = "ingest-ffmpeg")]
fn open_media(location: &str) -> Result<SourceBackend> {
    Ok(SourceBackend::Ffmpeg(FfmpegSource::open(location)?))
}

#[cfg(not(feature = "ingest-ffmpeg"))]
fn open_media(location: &str) -> Result<SourceBackend> {
    anyhow::bail!("decoding {} requires the ingest-ffmpeg feature", location)
}
