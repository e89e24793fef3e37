use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Class label carried by every detection.
pub const TRAFFIC_LIGHT_CLASS: &str = "traffic_light";

/// Classification a detection or a human annotation carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightState {
    RedLight,
    YellowLight,
    GreenLight,
    TrafficLight,
    NoTrafficLight,
}

impl LightState {
    /// Classes tracked per class in accuracy reports.
    pub const LABELED: [LightState; 4] = [
        LightState::RedLight,
        LightState::YellowLight,
        LightState::GreenLight,
        LightState::TrafficLight,
    ];

    pub const ALL: [LightState; 5] = [
        LightState::RedLight,
        LightState::YellowLight,
        LightState::GreenLight,
        LightState::TrafficLight,
        LightState::NoTrafficLight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LightState::RedLight => "red_light",
            LightState::YellowLight => "yellow_light",
            LightState::GreenLight => "green_light",
            LightState::TrafficLight => "traffic_light",
            LightState::NoTrafficLight => "no_traffic_light",
        }
    }

    pub fn is_labeled(&self) -> bool {
        !matches!(self, LightState::NoTrafficLight)
    }
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for LightState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        LightState::ALL
            .into_iter()
            .find(|state| state.as_str() == needle)
            .ok_or_else(|| {
                anyhow!(
                    "unknown light state '{}' (expected one of red_light, yellow_light, green_light, traffic_light, no_traffic_light)",
                    s.trim()
                )
            })
    }
}

/// A single simulated traffic light detection.
///
/// Pixel coordinates are `[x1, y1, x2, y2]`. Detections are produced by
/// labeler backends and never modified afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    bbox: [i32; 4],
    confidence: f64,
    class_label: String,
    light_state: LightState,
}

impl Detection {
    /// Confidence is clamped into `[0, 1]`.
    pub fn new(light_state: LightState, bbox: [i32; 4], confidence: f64) -> Self {
        Self {
            bbox,
            confidence: confidence.clamp(0.0, 1.0),
            class_label: TRAFFIC_LIGHT_CLASS.to_string(),
            light_state,
        }
    }

    pub fn bbox(&self) -> [i32; 4] {
        self.bbox
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn class_label(&self) -> &str {
        &self.class_label
    }

    pub fn light_state(&self) -> LightState {
        self.light_state
    }

    pub fn width(&self) -> i32 {
        self.bbox[2] - self.bbox[0]
    }

    pub fn height(&self) -> i32 {
        self.bbox[3] - self.bbox[1]
    }
}

/// Highest-confidence detection. Ties keep the earliest entry.
pub fn primary_detection(detections: &[Detection]) -> Option<&Detection> {
    detections.iter().fold(None, |best: Option<&Detection>, det| match best {
        Some(current) if current.confidence >= det.confidence => Some(current),
        _ => Some(det),
    })
}
