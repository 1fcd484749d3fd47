//! Training driver.
//!
//! Training is delegated to the Ultralytics `yolo` command-line tool. This
//! module only owns the hyperparameter set and renders it as
//! `yolo detect train key=value ...`.

use std::path::Path;
use std::process::{Command, ExitStatus};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_YOLO_BIN: &str = "yolo";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrainingPlan {
    pub model: String,
    pub data: String,
    pub epochs: u32,
    pub imgsz: u32,
    pub batch: u32,
    pub optimizer: String,
    pub lr0: f64,
    pub lrf: f64,
    pub momentum: f64,
    pub weight_decay: f64,
    pub hsv_h: f64,
    pub hsv_s: f64,
    pub hsv_v: f64,
    pub flipud: f64,
    pub fliplr: f64,
    pub mosaic: f64,
    pub mixup: f64,
    pub patience: u32,
    pub workers: u32,
    pub device: String,
    pub single_cls: bool,
}

impl Default for TrainingPlan {
    fn default() -> Self {
        Self {
            model: "yolov8l.pt".to_string(),
            data: "yolo_params.yaml".to_string(),
            epochs: 200,
            imgsz: 640,
            batch: 4,
            optimizer: "SGD".to_string(),
            lr0: 0.001,
            lrf: 0.01,
            momentum: 0.937,
            weight_decay: 0.0005,
            hsv_h: 0.015,
            hsv_s: 0.7,
            hsv_v: 0.4,
            flipud: 0.2,
            fliplr: 0.5,
            mosaic: 1.0,
            mixup: 0.3,
            patience: 0,
            workers: 0,
            device: "0".to_string(),
            single_cls: false,
        }
    }
}

/// Partial plan as written in the `[train]` config section.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TrainOverrides {
    pub model: Option<String>,
    pub data: Option<String>,
    pub epochs: Option<u32>,
    pub imgsz: Option<u32>,
    pub batch: Option<u32>,
    pub optimizer: Option<String>,
    pub lr0: Option<f64>,
    pub lrf: Option<f64>,
    pub momentum: Option<f64>,
    pub weight_decay: Option<f64>,
    pub hsv_h: Option<f64>,
    pub hsv_s: Option<f64>,
    pub hsv_v: Option<f64>,
    pub flipud: Option<f64>,
    pub fliplr: Option<f64>,
    pub mosaic: Option<f64>,
    pub mixup: Option<f64>,
    pub patience: Option<u32>,
    pub workers: Option<u32>,
    pub device: Option<String>,
    pub single_cls: Option<bool>,
}

macro_rules! apply_overrides {
    ($plan:expr, $overrides:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $overrides.$field.clone() {
                $plan.$field = value;
            }
        )+
    };
}

impl TrainingPlan {
    pub fn with_overrides(mut self, overrides: &TrainOverrides) -> Self {
        apply_overrides!(
            self, overrides, model, data, epochs, imgsz, batch, optimizer, lr0, lrf, momentum,
            weight_decay, hsv_h, hsv_s, hsv_v, flipud, fliplr, mosaic, mixup, patience, workers,
            device, single_cls,
        );
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(anyhow!("epochs must be at least 1"));
        }
        if self.batch == 0 {
            return Err(anyhow!("batch must be at least 1"));
        }
        if self.imgsz == 0 || self.imgsz % 32 != 0 {
            return Err(anyhow!("imgsz must be a positive multiple of 32, got {}", self.imgsz));
        }
        for (name, value) in [
            ("hsv_h", self.hsv_h),
            ("hsv_s", self.hsv_s),
            ("hsv_v", self.hsv_v),
            ("flipud", self.flipud),
            ("fliplr", self.fliplr),
            ("mosaic", self.mosaic),
            ("mixup", self.mixup),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
            }
        }
        if self.lr0 <= 0.0 {
            return Err(anyhow!("lr0 must be positive"));
        }
        Ok(())
    }

    /// `["detect", "train", "model=...", ...]` in a fixed order.
    pub fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["detect".to_string(), "train".to_string()];
        let mut kv = |key: &str, value: String| args.push(format!("{key}={value}"));
        kv("model", self.model.clone());
        kv("data", self.data.clone());
        kv("epochs", self.epochs.to_string());
        kv("imgsz", self.imgsz.to_string());
        kv("batch", self.batch.to_string());
        kv("optimizer", self.optimizer.clone());
        kv("lr0", format!("{:?}", self.lr0));
        kv("lrf", format!("{:?}", self.lrf));
        kv("momentum", format!("{:?}", self.momentum));
        kv("weight_decay", format!("{:?}", self.weight_decay));
        kv("hsv_h", format!("{:?}", self.hsv_h));
        kv("hsv_s", format!("{:?}", self.hsv_s));
        kv("hsv_v", format!("{:?}", self.hsv_v));
        kv("flipud", format!("{:?}", self.flipud));
        kv("fliplr", format!("{:?}", self.fliplr));
        kv("mosaic", format!("{:?}", self.mosaic));
        kv("mixup", format!("{:?}", self.mixup));
        kv("patience", self.patience.to_string());
        kv("workers", self.workers.to_string());
        kv("device", self.device.clone());
        kv(
            "single_cls",
            if self.single_cls { "True" } else { "False" }.to_string(),
        );
        args
    }

    pub fn command(&self, yolo_bin: &Path) -> Command {
        let mut cmd = Command::new(yolo_bin);
        cmd.args(self.to_cli_args());
        cmd
    }

    /// Shell-style rendering for `--dry-run` and logs.
    pub fn command_line(&self, yolo_bin: &Path) -> String {
        std::iter::once(yolo_bin.display().to_string())
            .chain(self.to_cli_args().into_iter().map(|arg| shell_quote(&arg)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the trainer in the foreground, inheriting stdio.
    pub fn run(&self, yolo_bin: &Path) -> Result<ExitStatus> {
        self.validate()?;
        if !Path::new(&self.data).exists() {
            log::warn!("dataset description {} does not exist", self.data);
        }
        log::info!("starting training: {}", self.command_line(yolo_bin));
        let status = self
            .command(yolo_bin)
            .status()
            .with_context(|| format!("launch {}", yolo_bin.display()))?;
        if status.success() {
            log::info!("training finished");
        } else {
            log::error!("training exited with {}", status);
        }
        Ok(status)
    }
}

fn shell_quote(arg: &str) -> String {
    if arg
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "=._-/:".contains(c))
    {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
