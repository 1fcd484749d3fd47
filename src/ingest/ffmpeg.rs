//! File and network-stream decoding through FFmpeg.

use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;

use super::{SourceInfo, DEFAULT_SOURCE_FPS};
use crate::error::PipelineError;
use crate::frame::Frame;

pub(crate) struct FfmpegSource {
    location: String,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    fps: f64,
    frame_count: u64,
    draining: bool,
    finished: bool,
}

impl FfmpegSource {
    pub(crate) fn open(location: &str) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(location)
            .with_context(|| format!("failed to open '{}' with ffmpeg", location))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("'{}' has no video track", location))?;
        let stream_index = input_stream.index();
        let fps = frame_rate(input_stream.avg_frame_rate())
            .or_else(|| frame_rate(input_stream.rate()))
            .unwrap_or(DEFAULT_SOURCE_FPS);
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        log::info!("FfmpegSource: opened {}", location);
        Ok(Self {
            location: location.to_string(),
            input,
            stream_index,
            decoder,
            scaler,
            fps,
            frame_count: 0,
            draining: false,
            finished: false,
        })
    }

    pub(crate) fn info(&self) -> SourceInfo {
        SourceInfo {
            width: self.decoder.width(),
            height: self.decoder.height(),
            fps: self.fps,
        }
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        let mut decoded = ffmpeg::frame::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_ok() {
            return self.convert(&decoded).map(Some);
        }

        while !self.draining {
            let Some((stream, packet)) = self.input.packets().next() else {
                self.decoder.send_eof().context("flush ffmpeg decoder")?;
                self.draining = true;
                break;
            };
            if stream.index() != self.stream_index {
                continue;
            }
            if let Err(err) = self.decoder.send_packet(&packet) {
                return Err(PipelineError::InvalidFrame(format!(
                    "{}: undecodable packet: {}",
                    self.location, err
                ))
                .into());
            }
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.convert(&decoded).map(Some);
            }
        }

        if self.decoder.receive_frame(&mut decoded).is_ok() {
            return self.convert(&decoded).map(Some);
        }
        log::info!(
            "FfmpegSource: end of {} after {} frames",
            self.location,
            self.frame_count
        );
        self.finished = true;
        Ok(None)
    }

    pub(crate) fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> Result<Frame> {
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .map_err(|e| PipelineError::InvalidFrame(format!("scale frame to RGB: {e}")))?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
        self.frame_count += 1;
        Ok(Frame::from_rgb(pixels, width, height)?)
    }
}

fn frame_rate(rate: ffmpeg::Rational) -> Option<f64> {
    if rate.numerator() <= 0 || rate.denominator() <= 0 {
        return None;
    }
    let fps = f64::from(rate);
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        let pixels = data
            .get(..row_bytes * height as usize)
            .ok_or_else(|| PipelineError::InvalidFrame("frame buffer too short".into()))?;
        return Ok((pixels.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .ok_or_else(|| PipelineError::InvalidFrame("frame row out of bounds".into()))?,
        );
    }

    Ok((pixels, width, height))
}
