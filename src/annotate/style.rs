use image::Rgb;
use serde::{Deserialize, Serialize};

/// Lower confidence bound of the high tier.
pub const HIGH_TIER_MIN: f32 = 0.7;
/// Lower confidence bound of the medium tier.
pub const MEDIUM_TIER_MIN: f32 = 0.6;

/// Confidence tier governing how prominently a detection is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Low,
    Medium,
    High,
}

impl Tier {
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence >= HIGH_TIER_MIN {
            Tier::High
        } else if confidence >= MEDIUM_TIER_MIN {
            Tier::Medium
        } else {
            Tier::Low
        }
    }

    pub fn style(self) -> Style {
        match self {
            Tier::High => Style {
                color: Rgb([0, 255, 0]),
                thickness: 3,
            },
            Tier::Medium => Style {
                color: Rgb([255, 255, 0]),
                thickness: 2,
            },
            Tier::Low => Style {
                color: Rgb([255, 165, 0]),
                thickness: 2,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Style {
    pub color: Rgb<u8>,
    pub thickness: u32,
}
