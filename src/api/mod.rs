//! Inference web service.
//!
//! `POST /detect` takes one multipart image and answers with the accepted
//! detections, the annotated image as base64 PNG and per-class counts.
//! The detector is built once by the caller and injected through
//! [`ApiState`]; requests share it behind a mutex and share the class table
//! read-only.

mod dto;
mod handlers;

pub use dto::{ClassesResponse, DetectResponse, DetectionDto, ErrorBody, HealthResponse};
pub use handlers::ApiError;

use std::future::Future;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::annotate::AnnotateConfig;
use crate::classes::ClassTable;
use crate::detect::DetectorBackend;

/// Shared by every request.
#[derive(Clone)]
pub struct ApiState {
    pub detector: Arc<Mutex<Box<dyn DetectorBackend>>>,
    pub classes: Arc<ClassTable>,
    pub annotate: AnnotateConfig,
}

impl ApiState {
    pub fn new(
        detector: Box<dyn DetectorBackend>,
        classes: ClassTable,
        annotate: AnnotateConfig,
    ) -> Self {
        Self {
            detector: Arc::new(Mutex::new(detector)),
            classes: Arc::new(classes),
            annotate,
        }
    }
}

pub fn router(state: ApiState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/detect", post(handlers::detect))
        .route("/health", get(handlers::health))
        .route("/classes", get(handlers::classes))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve<F>(addr: &str, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {}", addr))?;
    log::info!("detection API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("serve detection API")?;
    log::info!("detection API stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for Ctrl-C: {}", err);
        std::future::pending::<()>().await;
    }
    log::info!("shutdown requested");
}
