use crate::detect::result::{BBox, RawDetection};

/// Intersection over union of two boxes. Zero when either box has no area.
pub fn iou(a: &BBox, b: &BBox) -> f32 {
    let ix1 = a.x1.max(b.x1);
    let iy1 = a.y1.max(b.y1);
    let ix2 = a.x2.min(b.x2);
    let iy2 = a.y2.min(b.y2);
    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    let union = a.area() + b.area() - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Class-aware greedy NMS.
///
/// Candidates are visited in descending confidence; a candidate is dropped when
/// it overlaps an already kept box of the same class by more than
/// `iou_threshold`. At most `max_detections` boxes are returned, highest
/// confidence first.
pub fn non_max_suppression(
    mut candidates: Vec<RawDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<RawDetection> = Vec::new();
    for cand in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == cand.class_id && iou(&k.bbox, &cand.bbox) > iou_threshold);
        if !suppressed {
            kept.push(cand);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32, conf: f32, class_id: usize) -> RawDetection {
        RawDetection::new(BBox::new(x1, y1, x2, y2), conf, class_id)
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(20.0, 20.0, 30.0, 30.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn overlapping_same_class_keeps_highest_confidence() {
        let kept = non_max_suppression(
            vec![
                det(0.0, 0.0, 10.0, 10.0, 0.6, 0),
                det(1.0, 1.0, 11.0, 11.0, 0.9, 0),
            ],
            0.5,
            300,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn overlapping_different_classes_are_both_kept() {
        let kept = non_max_suppression(
            vec![
                det(0.0, 0.0, 10.0, 10.0, 0.6, 0),
                det(1.0, 1.0, 11.0, 11.0, 0.9, 1),
            ],
            0.5,
            300,
        );
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn caps_at_max_detections() {
        let candidates = (0..10)
            .map(|i| {
                let x = i as f32 * 20.0;
                det(x, 0.0, x + 10.0, 10.0, 0.5 + i as f32 * 0.01, 0)
            })
            .collect();
        let kept = non_max_suppression(candidates, 0.5, 3);
        assert_eq!(kept.len(), 3);
        assert!(kept[0].confidence >= kept[1].confidence);
    }
}
