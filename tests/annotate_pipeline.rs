use std::collections::BTreeMap;

use image::Rgb;

use safety_detect::annotate::{annotate, AnnotateConfig, Tier, Verdict};
use safety_detect::{BBox, ClassTable, DetectParams, Frame, RawDetection};

const BACKGROUND: [u8; 3] = [30, 30, 30];

fn config(conf_threshold: f32, bounds_check: bool) -> AnnotateConfig {
    AnnotateConfig {
        params: DetectParams {
            conf_threshold,
            ..DetectParams::default()
        },
        bounds_check,
    }
}

fn det(x1: f32, y1: f32, x2: f32, y2: f32, conf: f32, class_id: usize) -> RawDetection {
    RawDetection::new(BBox::new(x1, y1, x2, y2), conf, class_id)
}

fn blank() -> Frame {
    Frame::solid(640, 480, BACKGROUND).unwrap()
}

#[test]
fn end_to_end_live_scenario() {
    let classes = ClassTable::new(["fireextinguisher"]);
    let detections = [
        det(10.0, 10.0, 50.0, 50.0, 0.9, 0),
        det(600.0, 10.0, 700.0, 50.0, 0.9, 0),
    ];

    let out = annotate(blank(), &detections, &classes, &config(0.5, true));

    assert_eq!(out.detections[0].verdict, Verdict::Accepted);
    assert_eq!(out.detections[1].verdict, Verdict::OutOfBounds);
    let expected: BTreeMap<String, usize> = [("fireextinguisher".to_string(), 1)].into();
    assert_eq!(out.stats.counts_by_class, expected);
    assert_eq!(out.stats.total_detections, 1);
    assert_eq!(out.stats.confidences, vec![0.9]);

    let green = Tier::High.style().color;
    assert_eq!(*out.frame.image().get_pixel(10, 30), green);
    // The rejected box's right half lies inside the frame and must stay clean.
    assert_eq!(*out.frame.image().get_pixel(600, 30), Rgb(BACKGROUND));
    assert_eq!(*out.frame.image().get_pixel(639, 50), Rgb(BACKGROUND));
}

#[test]
fn below_threshold_leaves_no_trace() {
    let classes = ClassTable::safety_equipment();
    let original = blank();
    let out = annotate(
        original.clone(),
        &[
            det(100.0, 100.0, 300.0, 300.0, 0.49, 0),
            det(50.0, 200.0, 80.0, 260.0, 0.1, 2),
        ],
        &classes,
        &config(0.5, false),
    );

    assert_eq!(out.frame, original);
    assert_eq!(out.stats.total_detections, 0);
    assert!(out.stats.counts_by_class.is_empty());
    assert!(out.stats.confidences.is_empty());
}

#[test]
fn accepted_detections_counted_once_under_their_label() {
    let classes = ClassTable::safety_equipment();
    let out = annotate(
        blank(),
        &[
            det(10.0, 100.0, 60.0, 160.0, 0.95, 1),
            det(200.0, 100.0, 260.0, 160.0, 0.65, 1),
            det(400.0, 100.0, 460.0, 160.0, 0.55, 2),
            det(400.0, 300.0, 460.0, 360.0, 0.3, 0),
        ],
        &classes,
        &config(0.5, true),
    );

    assert_eq!(out.stats.count("toolbox"), 2);
    assert_eq!(out.stats.count("oxygen tank"), 1);
    assert_eq!(out.stats.count("fireextinguisher"), 0);
    assert_eq!(
        out.stats.counts_by_class.values().sum::<usize>(),
        out.stats.total_detections
    );
    assert_eq!(out.stats.confidences, vec![0.95, 0.65, 0.55]);

    let tiers: Vec<_> = out.accepted().map(|d| d.tier).collect();
    assert_eq!(tiers, vec![Tier::High, Tier::Medium, Tier::Low]);
    let thickness: Vec<_> = out.accepted().map(|d| d.thickness).collect();
    assert_eq!(thickness, vec![3, 2, 2]);
}

#[test]
fn tier_boundaries_are_exact() {
    assert_eq!(Tier::from_confidence(0.7), Tier::High);
    assert_eq!(Tier::from_confidence(0.69999), Tier::Medium);
    assert_eq!(Tier::from_confidence(0.6), Tier::Medium);
    assert_eq!(Tier::from_confidence(0.59999), Tier::Low);

    let high = Tier::High.style();
    let medium = Tier::Medium.style();
    let low = Tier::Low.style();
    assert_ne!(high.color, medium.color);
    assert_ne!(medium.color, low.color);
    assert_ne!(high.color, low.color);
    assert!(high.thickness > low.thickness);
}

#[test]
fn annotate_is_idempotent() {
    let classes = ClassTable::safety_equipment();
    let detections = [
        det(20.0, 40.0, 120.0, 140.0, 0.81, 0),
        det(300.0, 200.0, 380.0, 330.0, 0.62, 2),
    ];
    let cfg = config(0.5, true);

    let first = annotate(blank(), &detections, &classes, &cfg);
    let second = annotate(blank(), &detections, &classes, &cfg);

    assert_eq!(first.stats, second.stats);
    assert_eq!(first.frame, second.frame);
}

#[test]
fn malformed_box_is_skipped_without_error() {
    let classes = ClassTable::safety_equipment();
    let original = blank();
    let out = annotate(
        original.clone(),
        &[
            det(200.0, 100.0, 100.0, 200.0, 0.9, 0),
            det(100.0, 200.0, 200.0, 100.0, 0.9, 0),
            det(f32::NAN, 10.0, 20.0, 20.0, 0.9, 0),
        ],
        &classes,
        &config(0.5, false),
    );

    assert!(out
        .detections
        .iter()
        .all(|d| d.verdict == Verdict::Malformed));
    assert_eq!(out.stats.total_detections, 0);
    assert_eq!(out.frame, original);
}

#[test]
fn empty_class_table_rejects_everything() {
    let classes = ClassTable::empty();
    let detections = [
        det(10.0, 10.0, 50.0, 50.0, 0.99, 0),
        det(100.0, 100.0, 150.0, 150.0, 0.75, 1),
    ];
    for bounds_check in [true, false] {
        let out = annotate(blank(), &detections, &classes, &config(0.5, bounds_check));
        assert_eq!(out.stats.total_detections, 0);
        assert!(out
            .detections
            .iter()
            .all(|d| d.verdict == Verdict::UnknownClass));
    }
}

#[test]
fn out_of_bounds_accepted_when_check_disabled() {
    let classes = ClassTable::new(["fireextinguisher"]);
    let out = annotate(
        blank(),
        &[det(600.0, 10.0, 700.0, 50.0, 0.9, 0)],
        &classes,
        &config(0.5, false),
    );
    assert_eq!(out.stats.count("fireextinguisher"), 1);
    assert_eq!((out.frame.width(), out.frame.height()), (640, 480));
}

#[test]
fn huge_finite_boxes_render_without_bounds_check() {
    let classes = ClassTable::new(["fireextinguisher"]);
    let frame = Frame::solid(64, 48, BACKGROUND).unwrap();
    let out = annotate(
        frame,
        &[
            det(-3.0e9, 0.0, 3.0e9, 30.0, 0.9, 0),
            det(10.0, -3.0e9, 20.0, 30.0, 0.9, 0),
        ],
        &classes,
        &config(0.5, false),
    );

    assert_eq!(out.stats.count("fireextinguisher"), 2);
    assert_eq!((out.frame.width(), out.frame.height()), (64, 48));
    assert_eq!(*out.frame.image().get_pixel(40, 30), Tier::High.style().color);
}
