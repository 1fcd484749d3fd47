use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::FrameSink;
use crate::frame::Frame;

/// Numbered PNG files in one directory: `frame_000000.png`, `frame_000001.png`, ...
pub struct ImageSequenceSink {
    dir: PathBuf,
    written: u64,
}

impl ImageSequenceSink {
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("create output directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: 0,
        })
    }

    fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.png"))
    }
}

impl FrameSink for ImageSequenceSink {
    fn write(&mut self, frame: &Frame) -> Result<()> {
        let path = self.frame_path(self.written);
        frame
            .image()
            .save(&path)
            .with_context(|| format!("write {}", path.display()))?;
        self.written += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        log::info!(
            "wrote {} frames to {}",
            self.written,
            self.dir.display()
        );
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.written
    }
}
