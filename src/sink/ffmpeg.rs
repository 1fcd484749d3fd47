//! Video file output through the ffmpeg MPEG-4 encoder.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use ffmpeg_next as ffmpeg;

use super::FrameSink;
use crate::frame::Frame;
use crate::ingest::SourceInfo;

pub struct VideoFileSink {
    path: PathBuf,
    output: ffmpeg::format::context::Output,
    encoder: ffmpeg::encoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    stream_index: usize,
    encoder_time_base: ffmpeg::Rational,
    stream_time_base: ffmpeg::Rational,
    width: u32,
    height: u32,
    written: u64,
}

impl VideoFileSink {
    pub fn create(path: &Path, info: &SourceInfo) -> Result<Self> {
        use ffmpeg::util::format::pixel::Pixel;

        ffmpeg::init().context("initialize ffmpeg")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output directory {}", parent.display()))?;
        }

        let mut output = ffmpeg::format::output(&path)
            .with_context(|| format!("open output {} with ffmpeg", path.display()))?;
        let global_header = output
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::MPEG4)
            .ok_or_else(|| anyhow!("ffmpeg was built without an MPEG-4 encoder"))?;
        let mut stream = output.add_stream(codec).context("add video stream")?;
        let stream_index = stream.index();

        let fps = info.fps.round().clamp(1.0, 240.0) as i32;
        let time_base = ffmpeg::Rational::new(1, fps);

        let mut encoder = ffmpeg::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .context("create video encoder")?;
        encoder.set_width(info.width);
        encoder.set_height(info.height);
        encoder.set_format(Pixel::YUV420P);
        encoder.set_time_base(time_base);
        encoder.set_frame_rate(Some(ffmpeg::Rational::new(fps, 1)));
        if global_header {
            encoder.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
        }
        let encoder = encoder.open_as(codec).context("open MPEG-4 encoder")?;
        stream.set_parameters(&encoder);
        stream.set_time_base(time_base);

        output
            .write_header()
            .with_context(|| format!("write header for {}", path.display()))?;
        let stream_time_base = output
            .stream(stream_index)
            .map(|s| s.time_base())
            .ok_or_else(|| anyhow!("output stream {} vanished", stream_index))?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            Pixel::RGB24,
            info.width,
            info.height,
            Pixel::YUV420P,
            info.width,
            info.height,
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        log::info!(
            "VideoFileSink: {} {}x{} @ {} FPS",
            path.display(),
            info.width,
            info.height,
            fps
        );
        Ok(Self {
            path: path.to_path_buf(),
            output,
            encoder,
            scaler,
            stream_index,
            encoder_time_base: time_base,
            stream_time_base,
            width: info.width,
            height: info.height,
            written: 0,
        })
    }

    fn drain_packets(&mut self) -> Result<()> {
        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .with_context(|| format!("write packet to {}", self.path.display()))?;
        }
        Ok(())
    }
}

impl FrameSink for VideoFileSink {
    fn write(&mut self, frame: &Frame) -> Result<()> {
        use ffmpeg::util::format::pixel::Pixel;

        if frame.width() != self.width || frame.height() != self.height {
            bail!(
                "frame is {}x{} but {} was opened for {}x{}",
                frame.width(),
                frame.height(),
                self.path.display(),
                self.width,
                self.height
            );
        }

        let mut rgb = ffmpeg::frame::Video::new(Pixel::RGB24, self.width, self.height);
        let row_bytes = self.width as usize * 3;
        let stride = rgb.stride(0);
        let src = frame.as_rgb_bytes();
        let dst = rgb.data_mut(0);
        for (row, chunk) in src.chunks_exact(row_bytes).enumerate() {
            let start = row * stride;
            dst[start..start + row_bytes].copy_from_slice(chunk);
        }

        let mut yuv = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&rgb, &mut yuv)
            .context("convert frame to YUV420P")?;
        yuv.set_pts(Some(self.written as i64));

        self.encoder
            .send_frame(&yuv)
            .context("send frame to encoder")?;
        self.drain_packets()?;
        self.written += 1;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        self.encoder.send_eof().context("flush encoder")?;
        self.drain_packets()?;
        self.output
            .write_trailer()
            .with_context(|| format!("finalize {}", self.path.display()))?;
        log::info!(
            "VideoFileSink: wrote {} frames to {}",
            self.written,
            self.path.display()
        );
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.written
    }
}
