//! Decoded raster frames.
//!
//! `Frame` is the unit that flows from a source, through the detector and the
//! annotation pipeline, into a sink. It always holds a non-empty RGB buffer whose
//! length matches its dimensions; anything else is rejected as `InvalidFrame`
//! at construction time so downstream stages never see a half-decoded image.

use std::io::Cursor;

use anyhow::{Context, Result};
use image::{ImageFormat, RgbImage};

use crate::error::PipelineError;

#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Wrap an already decoded image. Zero-sized images are invalid.
    pub fn new(image: RgbImage) -> Result<Self, PipelineError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PipelineError::InvalidFrame(format!(
                "frame has no pixels ({}x{})",
                image.width(),
                image.height()
            )));
        }
        Ok(Self { image })
    }

    /// Build a frame from packed RGB24 bytes.
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self, PipelineError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| PipelineError::InvalidFrame("frame dimensions overflow".into()))?;
        if pixels.len() != expected {
            return Err(PipelineError::InvalidFrame(format!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| PipelineError::InvalidFrame("RGB buffer rejected".into()))?;
        Self::new(image)
    }

    /// Decode an encoded still image (PNG, JPEG).
    pub fn decode(bytes: &[u8]) -> Result<Self, PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::InvalidFrame("empty image payload".into()));
        }
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| PipelineError::InvalidFrame(format!("image decode failed: {e}")))?;
        Self::new(decoded.to_rgb8())
    }

    /// A frame filled with a single colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self, PipelineError> {
        Self::new(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub(crate) fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Packed RGB24 pixel bytes, row-major.
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.encode(ImageFormat::Png)
    }

    pub fn encode_jpeg(&self) -> Result<Vec<u8>> {
        self.encode(ImageFormat::Jpeg)
    }

    fn encode(&self, format: ImageFormat) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.image
            .write_to(&mut out, format)
            .with_context(|| format!("encode frame as {format:?}"))?;
        Ok(out.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_frames() {
        assert!(matches!(
            Frame::new(RgbImage::new(0, 480)),
            Err(PipelineError::InvalidFrame(_))
        ));
        assert!(matches!(
            Frame::decode(&[]),
            Err(PipelineError::InvalidFrame(_))
        ));
    }

    #[test]
    fn rejects_garbage_payload() {
        assert!(matches!(
            Frame::decode(b"definitely not an image"),
            Err(PipelineError::InvalidFrame(_))
        ));
    }

    #[test]
    fn rgb_length_is_validated() {
        assert!(Frame::from_rgb(vec![0u8; 12], 2, 2).is_ok());
        assert!(matches!(
            Frame::from_rgb(vec![0u8; 11], 2, 2),
            Err(PipelineError::InvalidFrame(_))
        ));
    }

    #[test]
    fn png_encoding_decodes_to_same_pixels() -> Result<()> {
        let frame = Frame::solid(8, 4, [10, 20, 30])?;
        let decoded = Frame::decode(&frame.encode_png()?)?;
        assert_eq!(decoded, frame);
        Ok(())
    }
}
