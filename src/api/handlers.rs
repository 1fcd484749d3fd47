use anyhow::anyhow;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::dto::{ClassesResponse, DetectResponse, ErrorBody, HealthResponse};
use super::ApiState;
use crate::annotate::annotate;
use crate::error::PipelineError;
use crate::frame::Frame;

const FILE_FIELD: &str = "file";

#[derive(Debug)]
pub enum ApiError {
    MissingFile,
    InvalidFrame(String),
    BadRequest(StatusCode, String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, detail) = match self {
            ApiError::MissingFile => (StatusCode::BAD_REQUEST, "missing_file", None),
            ApiError::InvalidFrame(detail) => {
                (StatusCode::BAD_REQUEST, "invalid_frame", Some(detail))
            }
            ApiError::BadRequest(status, detail) => (status, "bad_request", Some(detail)),
            ApiError::Internal(err) => {
                log::error!("detect request failed: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    Some(format!("{:#}", err)),
                )
            }
        };
        let body = ErrorBody {
            error: error.to_string(),
            detail,
        };
        (status, Json(body)).into_response()
    }
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn classes(State(state): State<ApiState>) -> Json<ClassesResponse> {
    Json(ClassesResponse {
        classes: state.classes.labels().to_vec(),
    })
}

pub async fn detect(
    State(state): State<ApiState>,
    multipart: Multipart,
) -> Result<Json<DetectResponse>, ApiError> {
    let upload = read_upload(multipart).await?;
    log::debug!("detect: received {} bytes", upload.len());

    let response = tokio::task::spawn_blocking(move || run_detection(&state, &upload))
        .await
        .map_err(|err| ApiError::Internal(anyhow!("detection task failed: {}", err)))??;
    Ok(Json(response))
}

/// Bytes of the `file` field, or of the first field carrying a filename.
async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|err| ApiError::BadRequest(err.status(), err.body_text()))?;
        let Some(field) = field else {
            return Err(ApiError::MissingFile);
        };
        let is_upload = field.name() == Some(FILE_FIELD) || field.file_name().is_some();
        if !is_upload {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::BadRequest(err.status(), err.body_text()))?;
        return Ok(bytes.to_vec());
    }
}

fn run_detection(state: &ApiState, upload: &[u8]) -> Result<DetectResponse, ApiError> {
    let frame = Frame::decode(upload).map_err(|err| match err {
        PipelineError::InvalidFrame(detail) => ApiError::InvalidFrame(detail),
        other => ApiError::Internal(other.into()),
    })?;

    let detections = {
        let mut detector = state
            .detector
            .lock()
            .map_err(|_| ApiError::Internal(anyhow!("detector lock poisoned")))?;
        detector
            .detect(&frame, &state.annotate.params)
            .map_err(ApiError::Internal)?
    };

    let annotation = annotate(frame, &detections, &state.classes, &state.annotate);
    log::info!(
        "detect: {}x{} image, {}",
        annotation.frame.width(),
        annotation.frame.height(),
        annotation.stats.summary()
    );
    let png = annotation.frame.encode_png().map_err(ApiError::Internal)?;
    Ok(DetectResponse::from_annotation(
        &annotation,
        &state.classes,
        STANDARD.encode(png),
    ))
}
