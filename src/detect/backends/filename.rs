use anyhow::Result;

use crate::detect::backend::LabelerBackend;
use crate::detect::hash::seeded_values;
use crate::detect::result::{Detection, LightState};
use crate::media::{MediaFile, MediaType};

const AMBIGUOUS_THRESHOLD: f64 = 0.7;

const RED_KEYWORDS: &[&str] = &["red", "stop"];
const GREEN_KEYWORDS: &[&str] = &["green", "go"];
const YELLOW_KEYWORDS: &[&str] = &["yellow", "amber", "caution"];
const SIGNAL_KEYWORDS: &[&str] = &["light", "signal"];

/// Hash-derived values for one file name.
#[derive(Clone, Copy, Debug)]
struct NameSeed {
    base_confidence: f64,
    jitter_a: i32,
    jitter_b: i32,
    ambiguous: f64,
    ambiguous_confidence: f64,
    jitter_c: i32,
    jitter_d: i32,
}

impl NameSeed {
    fn new(name: &str) -> Self {
        let n = seeded_values::<10>(name);
        Self {
            base_confidence: 0.75 + n[0] * 0.20,
            jitter_a: (n[1] * 20.0).floor() as i32,
            jitter_b: (n[2] * 20.0).floor() as i32,
            ambiguous: n[3],
            ambiguous_confidence: 0.45 + n[4] * 0.20,
            jitter_c: (n[5] * 40.0).floor() as i32,
            jitter_d: (n[6] * 40.0).floor() as i32,
        }
    }
}

/// Simulated processing time in seconds (1.0 to 3.0), derived from the name.
pub fn simulated_processing_secs(file_name: &str) -> f64 {
    let n = seeded_values::<10>(file_name);
    1.0 + n[9] * 2.0
}

/// Label a file purely from its name.
///
/// Same name, same output. File content is never read.
pub fn label_file(file_name: &str) -> Vec<Detection> {
    let lowered = file_name.to_lowercase();
    let has_any = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));
    let seed = NameSeed::new(file_name);
    let base = seed.base_confidence;

    let mut detections = Vec::new();

    let red = has_any(RED_KEYWORDS);
    let green = has_any(GREEN_KEYWORDS);
    let yellow = has_any(YELLOW_KEYWORDS);

    if red {
        detections.push(Detection::new(
            LightState::RedLight,
            [150 + seed.jitter_a, 100 + seed.jitter_b, 200, 180],
            base,
        ));
    }
    if green {
        detections.push(Detection::new(
            LightState::GreenLight,
            [300 + seed.jitter_a, 120 + seed.jitter_b, 350, 200],
            base,
        ));
    }
    if yellow {
        detections.push(Detection::new(
            LightState::YellowLight,
            [250 + seed.jitter_a, 110 + seed.jitter_b, 300, 190],
            base,
        ));
    }

    // Full signal head when only the generic keyword is present.
    if lowered.contains("traffic") && !(red || green || yellow) {
        detections.push(Detection::new(
            LightState::RedLight,
            [200, 80, 240, 130],
            base,
        ));
        detections.push(Detection::new(
            LightState::YellowLight,
            [200, 130, 240, 180],
            base - 0.05,
        ));
        detections.push(Detection::new(
            LightState::GreenLight,
            [200, 180, 240, 230],
            base + 0.02,
        ));
    }

    if has_any(SIGNAL_KEYWORDS) || seed.ambiguous > AMBIGUOUS_THRESHOLD {
        detections.push(Detection::new(
            LightState::TrafficLight,
            [
                100 + seed.jitter_c,
                50 + seed.jitter_d,
                140 + seed.jitter_c,
                120 + seed.jitter_d,
            ],
            seed.ambiguous_confidence,
        ));
    }

    detections
}

/// Backend that derives detections from the file name alone.
#[derive(Default)]
pub struct FileNameLabeler;

impl FileNameLabeler {
    pub fn new() -> Self {
        Self
    }
}

impl LabelerBackend for FileNameLabeler {
    fn name(&self) -> &'static str {
        "filename"
    }

    fn supports(&self, media_type: MediaType) -> bool {
        matches!(media_type, MediaType::Image | MediaType::Video)
    }

    fn label(&mut self, file: &MediaFile) -> Result<Vec<Detection>> {
        Ok(label_file(&file.name))
    }
}
