//! Frame sinks: where annotated frames go after the pipeline.
//!
//! `open_sink` picks the sink from the output path. Video extensions are
//! encoded with ffmpeg (feature `ingest-ffmpeg`); any other path is treated as
//! a directory of numbered PNG frames.

#[cfg(feature = "ingest-ffmpeg")]
mod ffmpeg;
mod image_seq;
mod snapshot;

use std::path::Path;

use anyhow::Result;

use crate::frame::Frame;
use crate::ingest::SourceInfo;

#[cfg(feature = "ingest-ffmpeg")]
pub use ffmpeg::VideoFileSink;
pub use image_seq::ImageSequenceSink;
pub use snapshot::SnapshotSink;

pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mkv", "mov"];

pub trait FrameSink {
    fn write(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and close. Frames written before a failed `finish` may be lost.
    fn finish(self: Box<Self>) -> Result<()>;

    fn frames_written(&self) -> u64;
}

pub fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

pub fn open_sink(path: &Path, info: &SourceInfo) -> Result<Box<dyn FrameSink>> {
    let sink: Box<dyn FrameSink> = if is_video_path(path) {
        open_video_sink(path, info)?
    } else {
        Box::new(ImageSequenceSink::create(path)?)
    };
    log::info!("writing annotated frames to {}", path.display());
    Ok(sink)
}

#[cfg(feature = "ingest-ffmpeg")]
fn open_video_sink(path: &Path, info: &SourceInfo) -> Result<Box<dyn FrameSink>> {
    Ok(Box::new(VideoFileSink::create(path, info)?))
}

#[cfg(not(feature = "ingest-ffmpeg"))]
fn open_video_sink(path: &Path, _info: &SourceInfo) -> Result<Box<dyn FrameSink>> {
    anyhow::bail!(
        "writing {} requires the ingest-ffmpeg feature; pass a directory to get PNG frames",
        path.display()
    )
}
