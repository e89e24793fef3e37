//! Accuracy of model predictions against manual annotations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::annotation::ManualAnnotation;
use crate::detect::{primary_detection, Detection, LightState};

/// Human label versus the primary detection for one file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub file_name: String,
    pub human_label: LightState,
    pub model_prediction: LightState,
    pub model_confidence: f64,
    pub is_correct: bool,
}

impl ComparisonResult {
    /// Compare an annotation with a file's detections.
    ///
    /// Returns `None` when there are no detections, since there is no
    /// prediction to compare against.
    pub fn compare(annotation: &ManualAnnotation, detections: &[Detection]) -> Option<Self> {
        let primary = primary_detection(detections)?;
        Some(Self {
            file_name: annotation.file_name.clone(),
            human_label: annotation.human_label,
            model_prediction: primary.light_state(),
            model_confidence: primary.confidence(),
            is_correct: annotation.human_label == primary.light_state(),
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassStats {
    pub correct: usize,
    pub total: usize,
}

impl ClassStats {
    /// Percentage, or `None` when the class was never annotated.
    pub fn accuracy(&self) -> Option<f64> {
        (self.total > 0).then(|| self.correct as f64 / self.total as f64 * 100.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total: usize,
    pub correct: usize,
    /// Overall accuracy in percent.
    pub accuracy: f64,
    /// Only the four labeled classes; `no_traffic_light` is not tracked here.
    pub per_class: BTreeMap<LightState, ClassStats>,
}

/// Aggregate comparisons. `None` for an empty input.
pub fn compute_metrics(comparisons: &[ComparisonResult]) -> Option<Metrics> {
    if comparisons.is_empty() {
        return None;
    }

    let total = comparisons.len();
    let correct = comparisons.iter().filter(|c| c.is_correct).count();

    let mut per_class: BTreeMap<LightState, ClassStats> = LightState::LABELED
        .into_iter()
        .map(|state| (state, ClassStats::default()))
        .collect();
    for comparison in comparisons {
        if let Some(stats) = per_class.get_mut(&comparison.human_label) {
            stats.total += 1;
            if comparison.is_correct {
                stats.correct += 1;
            }
        }
    }

    Some(Metrics {
        total,
        correct,
        accuracy: correct as f64 / total as f64 * 100.0,
        per_class,
    })
}
