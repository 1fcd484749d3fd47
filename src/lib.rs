//! Safety-equipment detection toolkit.
//!
//! A YOLO-family detector finds fire extinguishers, toolboxes and oxygen tanks
//! in camera streams, video files and uploaded images. This crate is the layer
//! around that detector:
//!
//! - `annotate`: the per-frame pipeline (acceptance filtering, confidence tiers,
//!   overlay rendering, statistics) plus the live loop's FPS meter
//! - `detect`: the detector capability and its backends
//! - `ingest` / `sink`: frame sources and annotated-frame outputs
//! - `live`, `batch`, `api`, `train`: the four tools built on top
//!
//! # Module Structure
//!
//! - `frame`: validated RGB rasters
//! - `classes`: class id to label table
//! - `config` / `cli`: layered settings shared by the binaries
//! - `error`: `PipelineError` taxonomy

pub mod annotate;
pub mod api;
pub mod batch;
pub mod classes;
pub mod cli;
pub mod config;
pub mod detect;
pub mod device;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod live;
pub mod sink;
pub mod train;
pub mod ui;

pub use annotate::{annotate, annotate_image, AnnotateConfig, Annotation, FpsMeter, FrameStats};
pub use classes::ClassTable;
pub use config::DetectorConfig;
pub use detect::{build_backend, BBox, BackendKind, DetectParams, DetectorBackend, RawDetection};
pub use device::ComputeDevice;
pub use error::PipelineError;
pub use frame::Frame;
pub use ingest::{FrameSource, SourceHints, SourceInfo, SourceSpec};
pub use sink::{open_sink, FrameSink};
