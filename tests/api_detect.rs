use anyhow::{anyhow, Result};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tower::ServiceExt;

use safety_detect::annotate::AnnotateConfig;
use safety_detect::api::{router, ApiState, ClassesResponse, DetectResponse, ErrorBody};
use safety_detect::detect::StubBackend;
use safety_detect::{BBox, ClassTable, DetectParams, DetectorBackend, Frame, RawDetection};

const BOUNDARY: &str = "safety-detect-test-boundary";
const MAX_UPLOAD: usize = 4 * 1024 * 1024;

struct BrokenDetector;

impl DetectorBackend for BrokenDetector {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn detect(&mut self, _frame: &Frame, _params: &DetectParams) -> Result<Vec<RawDetection>> {
        Err(anyhow!("model crashed"))
    }
}

fn app_with(detector: Box<dyn DetectorBackend>) -> Router {
    let annotate = AnnotateConfig {
        params: DetectParams::default(),
        bounds_check: false,
    };
    router(
        ApiState::new(detector, ClassTable::safety_equipment(), annotate),
        MAX_UPLOAD,
    )
}

fn scripted_app() -> Router {
    app_with(Box::new(StubBackend::scripted(vec![
        RawDetection::new(BBox::new(10.0, 20.0, 110.0, 140.0), 0.9, 0),
        RawDetection::new(BBox::new(200.0, 20.0, 260.0, 90.0), 0.3, 1),
        RawDetection::new(BBox::new(300.0, 20.0, 360.0, 90.0), 0.8, 7),
    ])))
}

fn multipart_body(field: &str, filename: Option<&str>, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    match filename {
        Some(name) => body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        ),
        None => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n").as_bytes(),
        ),
    }
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn detect_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/detect")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn detect_returns_accepted_detections_and_png() {
    let png = Frame::solid(640, 480, [90, 90, 90]).unwrap().encode_png().unwrap();
    let response = scripted_app()
        .oneshot(detect_request(multipart_body("file", Some("scene.png"), &png)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: DetectResponse = read_json(response).await;
    assert_eq!(body.detections.len(), 1);
    assert_eq!(body.detections[0].class, "fireextinguisher");
    assert_eq!(body.detections[0].conf, 0.9);
    assert_eq!(body.detections[0].bbox, [10.0, 20.0, 110.0, 140.0]);
    assert_eq!(body.confidences, vec![0.9]);
    assert_eq!(body.class_counts.len(), 3);
    assert_eq!(body.class_counts["fireextinguisher"], 1);
    assert_eq!(body.class_counts["toolbox"], 0);
    assert_eq!(body.class_counts["oxygen tank"], 0);

    let decoded = STANDARD.decode(&body.image).unwrap();
    let annotated = Frame::decode(&decoded).unwrap();
    assert_eq!((annotated.width(), annotated.height()), (640, 480));
    assert_eq!(
        annotated.image().get_pixel(10, 80).0,
        [0, 255, 0],
        "high-confidence outline should be green"
    );
}

#[tokio::test]
async fn field_with_filename_is_accepted_under_any_name() {
    let jpeg = Frame::solid(64, 64, [10, 200, 10]).unwrap().encode_jpeg().unwrap();
    let response = app_with(Box::new(StubBackend::new()))
        .oneshot(detect_request(multipart_body("image", Some("cam.jpg"), &jpeg)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: DetectResponse = read_json(response).await;
    assert!(body.detections.is_empty());
    assert!(body.class_counts.values().all(|count| *count == 0));
}

#[tokio::test]
async fn undecodable_upload_is_invalid_frame() {
    let response = scripted_app()
        .oneshot(detect_request(multipart_body(
            "file",
            Some("notes.txt"),
            b"definitely not an image",
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = read_json(response).await;
    assert_eq!(body.error, "invalid_frame");
    assert!(body.detail.is_some());
}

#[tokio::test]
async fn missing_file_field_is_rejected() {
    let response = scripted_app()
        .oneshot(detect_request(multipart_body("note", None, b"hello")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = read_json(response).await;
    assert_eq!(body.error, "missing_file");
}

#[tokio::test]
async fn detector_failure_is_a_server_error() {
    let png = Frame::solid(32, 32, [0, 0, 0]).unwrap().encode_png().unwrap();
    let response = app_with(Box::new(BrokenDetector))
        .oneshot(detect_request(multipart_body("file", Some("x.png"), &png)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn health_and_classes() {
    let app = scripted_app();
    let response = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let health: serde_json::Value = read_json(response).await;
    assert_eq!(health, serde_json::json!({"status": "ok"}));

    let response = app
        .oneshot(Request::get("/classes").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let classes: ClassesResponse = read_json(response).await;
    assert_eq!(
        classes.classes,
        vec!["fireextinguisher", "toolbox", "oxygen tank"]
    );
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let response = scripted_app()
        .oneshot(
            Request::get("/health")
                .header(header::ORIGIN, "http://localhost:5173")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
