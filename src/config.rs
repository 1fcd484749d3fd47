use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::detect::{BackendKind, DetectParams};
use crate::device::ComputeDevice;
use crate::train::TrainOverrides;

pub const CONFIG_ENV: &str = "SAFETY_DETECT_CONFIG";

const DEFAULT_MODEL_PATH: &str = "runs/detect/train5/weights/best.onnx";
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_CONF: f32 = 0.5;
const DEFAULT_IOU: f32 = 0.5;
const DEFAULT_MAX_DET: usize = 300;
const DEFAULT_API_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    model: Option<ModelConfigFile>,
    thresholds: Option<ThresholdConfigFile>,
    classes: Option<ClassesConfigFile>,
    api: Option<ApiConfigFile>,
    render: Option<RenderConfigFile>,
    train: Option<TrainOverrides>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ModelConfigFile {
    path: Option<PathBuf>,
    backend: Option<String>,
    input_size: Option<u32>,
    device: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ThresholdConfigFile {
    conf: Option<f32>,
    iou: Option<f32>,
    max_det: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ClassesConfigFile {
    path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ApiConfigFile {
    addr: Option<String>,
    max_upload_bytes: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RenderConfigFile {
    bounds_check: Option<bool>,
}

/// Settings shared by every tool. Command-line flags are applied on top by
/// each binary.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub model: ModelSettings,
    pub thresholds: DetectParams,
    pub classes_path: Option<PathBuf>,
    pub api: ApiSettings,
    /// `None` leaves the per-tool default in place.
    pub bounds_check: Option<bool>,
    pub train: TrainOverrides,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub path: PathBuf,
    pub backend: BackendKind,
    pub input_size: u32,
    /// `None` runs on the backend's preferred device.
    pub device: Option<ComputeDevice>,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub addr: String,
    pub max_upload_bytes: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model: ModelSettings {
                path: PathBuf::from(DEFAULT_MODEL_PATH),
                backend: BackendKind::default_for_build(),
                input_size: DEFAULT_INPUT_SIZE,
                device: None,
            },
            thresholds: DetectParams {
                conf_threshold: DEFAULT_CONF,
                iou_threshold: DEFAULT_IOU,
                max_detections: DEFAULT_MAX_DET,
            },
            classes_path: None,
            api: ApiSettings {
                addr: DEFAULT_API_ADDR.to_string(),
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            bounds_check: None,
            train: TrainOverrides::default(),
        }
    }
}

impl DetectorConfig {
    /// Defaults, then the TOML file named by `SAFETY_DETECT_CONFIG`, then
    /// `SAFETY_*` environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var(CONFIG_ENV).ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Same layering from an explicit file, for tools that take `--config`.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: DetectorConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let model_file = file.model.unwrap_or_default();
        let backend = match model_file.backend {
            Some(name) => BackendKind::from_str(&name)?,
            None => defaults.model.backend,
        };
        let device = model_file
            .device
            .as_deref()
            .map(ComputeDevice::from_str)
            .transpose()?;
        let model = ModelSettings {
            path: model_file.path.unwrap_or(defaults.model.path),
            backend,
            input_size: model_file.input_size.unwrap_or(defaults.model.input_size),
            device,
        };

        let thresholds_file = file.thresholds.unwrap_or_default();
        let thresholds = DetectParams {
            conf_threshold: thresholds_file
                .conf
                .unwrap_or(defaults.thresholds.conf_threshold),
            iou_threshold: thresholds_file
                .iou
                .unwrap_or(defaults.thresholds.iou_threshold),
            max_detections: thresholds_file
                .max_det
                .unwrap_or(defaults.thresholds.max_detections),
        };

        let api_file = file.api.unwrap_or_default();
        let api = ApiSettings {
            addr: api_file.addr.unwrap_or(defaults.api.addr),
            max_upload_bytes: api_file
                .max_upload_bytes
                .unwrap_or(defaults.api.max_upload_bytes),
        };

        Ok(Self {
            model,
            thresholds,
            classes_path: file.classes.and_then(|classes| classes.path),
            api,
            bounds_check: file.render.and_then(|render| render.bounds_check),
            train: file.train.unwrap_or_default(),
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(path) = env_nonempty("SAFETY_MODEL_PATH") {
            self.model.path = PathBuf::from(path);
        }
        if let Some(backend) = env_nonempty("SAFETY_BACKEND") {
            self.model.backend = BackendKind::from_str(&backend)
                .with_context(|| "SAFETY_BACKEND is not a known backend")?;
        }
        if let Some(device) = env_nonempty("SAFETY_DEVICE") {
            self.model.device = Some(
                ComputeDevice::from_str(&device)
                    .with_context(|| "SAFETY_DEVICE is not a device selector")?,
            );
        }
        if let Some(path) = env_nonempty("SAFETY_CLASSES_PATH") {
            self.classes_path = Some(PathBuf::from(path));
        }
        if let Some(addr) = env_nonempty("SAFETY_API_ADDR") {
            self.api.addr = addr;
        }
        if let Some(conf) = env_nonempty("SAFETY_CONF") {
            self.thresholds.conf_threshold = conf
                .parse()
                .map_err(|_| anyhow!("SAFETY_CONF must be a number between 0 and 1"))?;
        }
        if let Some(iou) = env_nonempty("SAFETY_IOU") {
            self.thresholds.iou_threshold = iou
                .parse()
                .map_err(|_| anyhow!("SAFETY_IOU must be a number between 0 and 1"))?;
        }
        if let Some(max_det) = env_nonempty("SAFETY_MAX_DET") {
            self.thresholds.max_detections = max_det
                .parse()
                .map_err(|_| anyhow!("SAFETY_MAX_DET must be a positive integer"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        validate_unit("conf", self.thresholds.conf_threshold)?;
        validate_unit("iou", self.thresholds.iou_threshold)?;
        if self.thresholds.max_detections == 0 {
            return Err(anyhow!("max_det must be at least 1"));
        }
        if self.model.input_size == 0 || self.model.input_size % 32 != 0 {
            return Err(anyhow!(
                "model input_size must be a positive multiple of 32, got {}",
                self.model.input_size
            ));
        }
        if self.api.max_upload_bytes == 0 {
            return Err(anyhow!("api max_upload_bytes must be greater than zero"));
        }
        Ok(())
    }

    /// Bounds checking for a tool whose built-in default is `tool_default`.
    pub fn bounds_check_or(&self, tool_default: bool) -> bool {
        self.bounds_check.unwrap_or(tool_default)
    }
}

fn validate_unit(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
    }
    Ok(())
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<DetectorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config {}: {}", path.display(), e))?;
    toml::from_str(&raw).map_err(|e| anyhow!("failed to parse config {}: {}", path.display(), e))
}
