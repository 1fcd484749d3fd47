use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::FrameSink;
use crate::frame::Frame;

/// Keeps one image file holding the most recent frame.
///
/// The image is written to a sibling temp file and renamed over the target so
/// viewers polling the file never see a partial write.
pub struct SnapshotSink {
    path: PathBuf,
    staging: PathBuf,
    written: u64,
}

impl SnapshotSink {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create preview directory {}", parent.display()))?;
        }
        let mut staging = path.as_os_str().to_owned();
        staging.push(".partial");
        Ok(Self {
            path: path.to_path_buf(),
            staging: PathBuf::from(staging),
            written: 0,
        })
    }
}

impl FrameSink for SnapshotSink {
    fn write(&mut self, frame: &Frame) -> Result<()> {
        let format = image::ImageFormat::from_path(&self.path).unwrap_or(image::ImageFormat::Png);
        frame
            .image()
            .save_with_format(&self.staging, format)
            .with_context(|| format!("write preview {}", self.staging.display()))?;
        fs::rename(&self.staging, &self.path)
            .with_context(|| format!("replace preview {}", self.path.display()))?;
        self.written += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_latest_frame() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("preview.png");
        let mut sink = Box::new(SnapshotSink::create(&path)?);
        sink.write(&Frame::solid(4, 4, [10, 10, 10])?)?;
        sink.write(&Frame::solid(4, 4, [200, 10, 10])?)?;
        sink.finish()?;

        let latest = image::open(&path)?.to_rgb8();
        assert_eq!(latest.get_pixel(1, 1).0, [200, 10, 10]);
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }
}
