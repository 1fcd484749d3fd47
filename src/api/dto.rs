use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::annotate::{Annotation, Tier};
use crate::classes::ClassTable;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionDto {
    pub class: String,
    pub conf: f32,
    #[serde(rename = "box")]
    pub bbox: [f32; 4],
    pub tier: Tier,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectResponse {
    pub detections: Vec<DetectionDto>,
    /// Annotated image, PNG, standard base64.
    pub image: String,
    pub class_counts: BTreeMap<String, usize>,
    pub confidences: Vec<f32>,
}

impl DetectResponse {
    pub fn from_annotation(annotation: &Annotation, classes: &ClassTable, image: String) -> Self {
        Self {
            detections: annotation
                .accepted()
                .map(|det| DetectionDto {
                    class: det.label.clone(),
                    conf: det.confidence,
                    bbox: det.bbox.to_array(),
                    tier: det.tier,
                })
                .collect(),
            image,
            class_counts: annotation.stats.counts_for_table(classes),
            confidences: annotation.stats.confidences.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassesResponse {
    pub classes: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
