//! Drawing primitives for detection overlays.

use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use once_cell::sync::Lazy;

use crate::detect::BBox;

use super::style::Style;

const LABEL_SCALE: f32 = 18.0;
const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const LABEL_PAD: i32 = 10;
/// Pixels beyond the frame edge that box corners are clipped to.
const CLIP_MARGIN: f32 = 16.0;

static FONT: Lazy<Option<FontRef<'static>>> = Lazy::new(|| {
    FontRef::try_from_slice(include_bytes!("../../assets/fonts/DejaVuSans.ttf"))
        .map_err(|e| log::error!("embedded overlay font is unreadable: {}", e))
        .ok()
});

/// Outline plus a filled label tab sitting on the top edge of the box.
pub fn draw_detection(img: &mut RgbImage, bbox: &BBox, style: Style, label: &str) {
    let x1 = clip(bbox.x1, img.width());
    let y1 = clip(bbox.y1, img.height());
    let x2 = clip(bbox.x2, img.width());
    let y2 = clip(bbox.y2, img.height());
    draw_outline(img, (x1, y1, x2, y2), style.color, style.thickness);
    draw_label(img, x1, y1, label, style.color);
}

/// Clamp a box coordinate to the frame plus `CLIP_MARGIN` so integer
/// arithmetic on corners cannot overflow. Edges clipped outside the frame
/// stay invisible.
fn clip(value: f32, limit: u32) -> i32 {
    value.clamp(-CLIP_MARGIN, limit as f32 + CLIP_MARGIN) as i32
}

/// Rectangle outline with corners included, grown inwards to `thickness` pixels.
fn draw_outline(
    img: &mut RgbImage,
    (x1, y1, x2, y2): (i32, i32, i32, i32),
    color: Rgb<u8>,
    thickness: u32,
) {
    let width = x2 - x1 + 1;
    let height = y2 - y1 + 1;
    for inset in 0..thickness.max(1) as i32 {
        let w = width - 2 * inset;
        let h = height - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let rect = Rect::at(x1 + inset, y1 + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(img, rect, color);
    }
}

fn draw_label(img: &mut RgbImage, x: i32, y: i32, text: &str, background: Rgb<u8>) {
    let Some(font) = FONT.as_ref() else {
        return;
    };
    let scale = PxScale::from(LABEL_SCALE);
    let (text_w, text_h) = text_size(scale, font, text);
    if text_w == 0 || text_h == 0 {
        return;
    }
    let tab_h = text_h as i32 + LABEL_PAD;
    let tab = Rect::at(x, y - tab_h).of_size(text_w, tab_h as u32);
    draw_filled_rect_mut(img, tab, background);
    draw_text_mut(
        img,
        LABEL_TEXT_COLOR,
        x,
        y - text_h as i32 - LABEL_PAD / 2,
        scale,
        font,
        text,
    );
}

/// One line of heads-up text.
#[derive(Clone, Debug)]
pub struct HudLine {
    pub text: String,
    pub color: Rgb<u8>,
    pub scale: f32,
}

/// Stack text lines in the top-left corner.
pub fn draw_hud(img: &mut RgbImage, lines: &[HudLine]) {
    let Some(font) = FONT.as_ref() else {
        return;
    };
    let mut y = 10;
    for line in lines {
        let scale = PxScale::from(line.scale);
        draw_text_mut(img, line.color, 10, y, scale, font, &line.text);
        let (_, h) = text_size(scale, font, &line.text);
        y += h as i32 + 12;
    }
}
