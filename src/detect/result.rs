use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates, corners `(x1, y1)` and `(x2, y2)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from centre/size form as emitted by YOLO heads.
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Corners are finite and ordered (x1 <= x2, y1 <= y2).
    pub fn is_well_formed(&self) -> bool {
        let finite = [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite());
        finite && self.x2 >= self.x1 && self.y2 >= self.y1
    }

    /// Box lies entirely inside `[0, width] x [0, height]`.
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        self.x1 >= 0.0
            && self.y1 >= 0.0
            && self.x2 <= width as f32
            && self.y2 <= height as f32
    }

    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self {
            x1: self.x1 * sx,
            y1: self.y1 * sy,
            x2: self.x2 * sx,
            y2: self.y2 * sy,
        }
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// One detector output for one frame: box, confidence in `[0, 1]`, class id.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub bbox: BBox,
    pub confidence: f32,
    pub class_id: usize,
}

impl RawDetection {
    pub fn new(bbox: BBox, confidence: f32, class_id: usize) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_corners_are_malformed() {
        assert!(BBox::new(10.0, 10.0, 50.0, 50.0).is_well_formed());
        assert!(BBox::new(10.0, 10.0, 10.0, 10.0).is_well_formed());
        assert!(!BBox::new(50.0, 10.0, 10.0, 50.0).is_well_formed());
        assert!(!BBox::new(10.0, 50.0, 50.0, 10.0).is_well_formed());
        assert!(!BBox::new(f32::NAN, 0.0, 1.0, 1.0).is_well_formed());
    }

    #[test]
    fn bounds_are_inclusive_of_frame_edges() {
        assert!(BBox::new(0.0, 0.0, 640.0, 480.0).is_within(640, 480));
        assert!(!BBox::new(600.0, 10.0, 700.0, 50.0).is_within(640, 480));
        assert!(!BBox::new(-1.0, 10.0, 50.0, 50.0).is_within(640, 480));
    }

    #[test]
    fn center_form_converts_to_corners() {
        let b = BBox::from_center(50.0, 40.0, 20.0, 10.0);
        assert_eq!(b, BBox::new(40.0, 35.0, 60.0, 45.0));
        assert_eq!(b.area(), 200.0);
    }
}
