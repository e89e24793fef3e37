//! CSV and JSON exports of batch results and accuracy comparisons.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;

use crate::batch::FileResult;
use crate::metrics::{compute_metrics, ComparisonResult, Metrics};

pub const BATCH_HEADER: &str =
    "File Name,File Size,Detections Count,Processing Time,Light States,Confidence Scores";
pub const ACCURACY_HEADER: &str =
    "File Name,Human Label,Model Prediction,Model Confidence,Correct,Match";

const MULTI_VALUE_SEPARATOR: &str = "; ";

/// Quote a field when it contains a delimiter, quote or line break.
pub fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn push_row(out: &mut String, fields: &[&str]) {
    let row: Vec<Cow<'_, str>> = fields.iter().map(|f| csv_field(f)).collect();
    out.push_str(&row.join(","));
    out.push('\n');
}

/// One row per file.
pub fn batch_csv(results: &[FileResult]) -> String {
    let mut out = String::new();
    out.push_str(BATCH_HEADER);
    out.push('\n');
    for result in results {
        let states = result
            .detections
            .iter()
            .map(|d| d.light_state().as_str())
            .collect::<Vec<_>>()
            .join(MULTI_VALUE_SEPARATOR);
        let scores = result
            .detections
            .iter()
            .map(|d| format!("{:.2}", d.confidence()))
            .collect::<Vec<_>>()
            .join(MULTI_VALUE_SEPARATOR);
        push_row(
            &mut out,
            &[
                &result.name,
                &result.size.to_string(),
                &result.detections.len().to_string(),
                &format!("{:.2}s", result.processing_time_secs),
                &states,
                &scores,
            ],
        );
    }
    out
}

/// One row per comparison; used for both single-image and batch exports.
pub fn accuracy_csv(comparisons: &[ComparisonResult]) -> String {
    let mut out = String::new();
    out.push_str(ACCURACY_HEADER);
    out.push('\n');
    for c in comparisons {
        push_row(
            &mut out,
            &[
                &c.file_name,
                c.human_label.as_str(),
                c.model_prediction.as_str(),
                &format!("{:.2}", c.model_confidence),
                if c.is_correct { "Yes" } else { "No" },
                if c.is_correct { "✓" } else { "✗" },
            ],
        );
    }
    out
}

pub fn batch_results_file_name(date: NaiveDate) -> String {
    format!("traffic_light_batch_results_{}.csv", date.format("%Y-%m-%d"))
}

pub fn batch_accuracy_file_name(date: NaiveDate) -> String {
    format!("traffic_light_batch_accuracy_{}.csv", date.format("%Y-%m-%d"))
}

/// Single-image accuracy export, named after the source file's base name.
pub fn single_accuracy_file_name(source_name: &str, date: NaiveDate) -> String {
    let base = Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");
    format!(
        "traffic_light_accuracy_{}_{}.csv",
        base,
        date.format("%Y-%m-%d")
    )
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Write `contents` into `dir/file_name`, creating `dir` if needed.
pub fn write_export(dir: impl AsRef<Path>, file_name: &str, contents: &str) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export dir {}", dir.display()))?;
    let path = dir.join(file_name);
    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write export {}", path.display()))?;
    log::info!("export written to {}", path.display());
    Ok(path)
}

/// Full batch run as JSON.
#[derive(Debug, Serialize)]
pub struct BatchReport<'a> {
    pub generated_at: DateTime<Local>,
    pub results: &'a [FileResult],
    pub comparisons: &'a [ComparisonResult],
    pub metrics: Option<Metrics>,
    pub cancelled: bool,
}

impl<'a> BatchReport<'a> {
    pub fn new(
        results: &'a [FileResult],
        comparisons: &'a [ComparisonResult],
        cancelled: bool,
    ) -> Self {
        Self {
            generated_at: Local::now(),
            results,
            comparisons,
            metrics: compute_metrics(comparisons),
            cancelled,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
