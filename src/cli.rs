//! Flags shared by the detection binaries.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::annotate::AnnotateConfig;
use crate::classes::ClassTable;
use crate::config::DetectorConfig;
use crate::detect::{build_backend, BackendKind, DetectorBackend};
use crate::device::ComputeDevice;
use crate::ui::UiMode;

#[derive(Args, Debug, Clone, Default)]
pub struct DetectorArgs {
    /// Configuration file (overrides SAFETY_DETECT_CONFIG).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Model weights (ONNX).
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Detector backend: tract or stub.
    #[arg(long)]
    pub backend: Option<BackendKind>,

    /// Compute device: GPU index (0, 1, ...), cuda:N or cpu.
    #[arg(long)]
    pub device: Option<ComputeDevice>,

    /// Confidence threshold.
    #[arg(long)]
    pub conf: Option<f32>,

    /// IoU threshold for NMS.
    #[arg(long)]
    pub iou: Option<f32>,

    /// Maximum detections per image.
    #[arg(long = "max-det")]
    pub max_det: Option<usize>,

    /// Class table, one label per line.
    #[arg(long)]
    pub classes: Option<PathBuf>,

    /// Reject boxes that leave the frame.
    #[arg(long)]
    pub bounds_check: Option<bool>,

    /// Terminal output style.
    #[arg(long, value_enum, default_value_t = UiMode::Auto)]
    pub ui: UiMode,
}

impl DetectorArgs {
    /// Configuration layers, then these flags on top.
    pub fn load_config(&self) -> Result<DetectorConfig> {
        let mut cfg = match &self.config {
            Some(path) => DetectorConfig::load_from(path)?,
            None => DetectorConfig::load()?,
        };
        self.apply(&mut cfg);
        cfg.validate().context("invalid command-line thresholds")?;
        Ok(cfg)
    }

    pub fn apply(&self, cfg: &mut DetectorConfig) {
        if let Some(model) = &self.model {
            cfg.model.path = model.clone();
        }
        if let Some(backend) = self.backend {
            cfg.model.backend = backend;
        }
        if let Some(device) = self.device {
            cfg.model.device = Some(device);
        }
        if let Some(conf) = self.conf {
            cfg.thresholds.conf_threshold = conf;
        }
        if let Some(iou) = self.iou {
            cfg.thresholds.iou_threshold = iou;
        }
        if let Some(max_det) = self.max_det {
            cfg.thresholds.max_detections = max_det;
        }
        if let Some(classes) = &self.classes {
            cfg.classes_path = Some(classes.clone());
        }
        if let Some(bounds_check) = self.bounds_check {
            cfg.bounds_check = Some(bounds_check);
        }
    }
}

/// Everything a tool needs before the first frame.
pub struct DetectorSession {
    pub config: DetectorConfig,
    pub classes: ClassTable,
    pub detector: Box<dyn DetectorBackend>,
    pub device: ComputeDevice,
    pub annotate: AnnotateConfig,
}

impl DetectorSession {
    /// Load classes and build the detector. `bounds_check_default` is the
    /// tool's own default when neither config nor flags set it.
    pub fn start(config: DetectorConfig, bounds_check_default: bool) -> Result<Self> {
        let classes = ClassTable::resolve(config.classes_path.as_deref())?;
        log::info!("class table: {} labels", classes.len());
        let (detector, device) = build_backend(
            config.model.backend,
            &config.model.path,
            config.model.input_size,
            config.model.device,
        )?;
        let annotate = AnnotateConfig {
            params: config.thresholds,
            bounds_check: config.bounds_check_or(bounds_check_default),
        };
        log::info!(
            "confidence threshold: {}, IoU threshold: {}, max detections: {}, bounds check: {}",
            annotate.params.conf_threshold,
            annotate.params.iou_threshold,
            annotate.params.max_detections,
            annotate.bounds_check
        );
        Ok(Self {
            config,
            classes,
            detector,
            device,
            annotate,
        })
    }
}
