//! Local camera capture through V4L2.
//!
//! The driver is asked for packed RGB at the hinted size; whatever it
//! negotiates instead (YUYV, NV12 or MJPEG) is converted to RGB per frame.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use super::normalize::{normalize_to_rgb, PixelFormat};
use super::{SourceHints, SourceInfo};
use crate::error::PipelineError;
use crate::frame::Frame;

pub(crate) struct V4l2Source {
    device_path: String,
    state: DeviceV4l2State,
    encoding: Encoding,
    active_width: u32,
    active_height: u32,
    fps: f64,
    frame_count: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Encoding {
    Raw(PixelFormat),
    Mjpeg,
}

impl Encoding {
    fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"RGB3" => Some(Encoding::Raw(PixelFormat::Rgb24)),
            b"YUYV" => Some(Encoding::Raw(PixelFormat::Yuyv)),
            b"NV12" => Some(Encoding::Raw(PixelFormat::Nv12)),
            b"MJPG" => Some(Encoding::Mjpeg),
            _ => None,
        }
    }
}

#[self_referencing]
struct DeviceV4l2State {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Source {
    pub(crate) fn open(device_path: &str, hints: &SourceHints) -> Result<Self> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let device = v4l::Device::with_path(device_path)
            .with_context(|| format!("open v4l2 device {}", device_path))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = hints.width;
        format.height = hints.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "V4l2Source: failed to set format on {}: {}",
                    device_path,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };
        let encoding = Encoding::from_fourcc(&format.fourcc.repr).ok_or_else(|| {
            anyhow!(
                "{} negotiated unsupported pixel format {}",
                device_path,
                format.fourcc
            )
        })?;

        let mut fps = f64::from(hints.fps.max(1));
        if hints.fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(hints.fps);
            match device.set_params(&params) {
                Ok(applied) => {
                    let interval = applied.interval;
                    if interval.numerator > 0 && interval.denominator > 0 {
                        fps = f64::from(interval.denominator) / f64::from(interval.numerator);
                    }
                }
                Err(err) => {
                    log::warn!("V4l2Source: failed to set fps on {}: {}", device_path, err);
                }
            }
        }

        let state = DeviceV4l2StateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;

        log::info!(
            "V4l2Source: connected to {} ({}x{} {:?})",
            device_path,
            format.width,
            format.height,
            encoding
        );
        Ok(Self {
            device_path: device_path.to_string(),
            state,
            encoding,
            active_width: format.width,
            active_height: format.height,
            fps,
            frame_count: 0,
        })
    }

    pub(crate) fn info(&self) -> SourceInfo {
        SourceInfo {
            width: self.active_width,
            height: self.active_height,
            fps: self.fps,
        }
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        use v4l::io::traits::CaptureStream;

        let device_path = &self.device_path;
        let payload = self.state.with_mut(|fields| {
            fields
                .stream
                .next()
                .map(|(buf, meta)| {
                    let used = (meta.bytesused as usize).min(buf.len());
                    let used = if used == 0 { buf.len() } else { used };
                    buf[..used].to_vec()
                })
                .map_err(|err| {
                    anyhow::Error::new(err).context(format!("capture v4l2 frame from {device_path}"))
                })
        })?;

        self.frame_count += 1;
        let frame = match self.encoding {
            Encoding::Mjpeg => Frame::decode(&payload)?,
            Encoding::Raw(format) => {
                let rgb = normalize_to_rgb(&payload, self.active_width, self.active_height, format)
                    .map_err(|err| PipelineError::InvalidFrame(err.to_string()))?;
                Frame::from_rgb(rgb, self.active_width, self.active_height)?
            }
        };
        Ok(Some(frame))
    }

    pub(crate) fn frames_captured(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_supported_fourccs() {
        assert_eq!(
            Encoding::from_fourcc(b"RGB3"),
            Some(Encoding::Raw(PixelFormat::Rgb24))
        );
        assert_eq!(
            Encoding::from_fourcc(b"YUYV"),
            Some(Encoding::Raw(PixelFormat::Yuyv))
        );
        assert_eq!(Encoding::from_fourcc(b"MJPG"), Some(Encoding::Mjpeg));
        assert_eq!(Encoding::from_fourcc(b"H264"), None);
    }

    #[test]
    fn missing_device_fails_to_open() {
        let result = V4l2Source::open("/dev/video-does-not-exist", &SourceHints::default());
        assert!(result.is_err());
    }
}
