//! Sequential batch orchestration.
//!
//! One file is in flight at a time. For each file the orchestrator:
//! 1. Marks it `processing`
//! 2. Labels it through the registry
//! 3. Derives the simulated processing time (optionally sleeping for it)
//! 4. Records a preview when enabled
//! 5. Marks it `completed` (or `error` when the labeler fails)
//! 6. Compares against the annotation, if any
//!
//! The cancel token is checked before every file and during simulated delays.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::annotation::AnnotationBook;
use crate::detect::{simulated_processing_secs, Detection, LabelerRegistry};
use crate::media::{MediaFile, MediaType};
use crate::metrics::ComparisonResult;
use crate::preview::{preview_or_none, Preview};

const DELAY_SLICE: Duration = Duration::from_millis(50);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Error,
}

/// Per-file record, updated in place as the batch advances.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileResult {
    pub name: String,
    pub size: u64,
    pub detections: Vec<Detection>,
    pub processing_time_secs: f64,
    pub media_type: MediaType,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<Preview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileResult {
    pub fn pending(file: &MediaFile) -> Self {
        Self {
            name: file.name.clone(),
            size: file.size,
            detections: Vec::new(),
            processing_time_secs: 0.0,
            media_type: file.media_type,
            status: FileStatus::Pending,
            preview: None,
            error: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, FileStatus::Completed | FileStatus::Error)
    }
}

/// Shared cancellation flag, checked between files.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Progress notifications emitted in order by the batch loop.
#[derive(Clone, Debug, PartialEq)]
pub enum BatchEvent {
    Started {
        index: usize,
        total: usize,
    },
    Completed {
        index: usize,
        result: FileResult,
        comparison: Option<ComparisonResult>,
        progress: f64,
    },
    Failed {
        index: usize,
        result: FileResult,
        progress: f64,
    },
    Finished {
        cancelled: bool,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchOutcome {
    pub results: Vec<FileResult>,
    pub comparisons: Vec<ComparisonResult>,
    pub cancelled: bool,
}

impl BatchOutcome {
    pub fn finished_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_finished()).count()
    }

    pub fn progress(&self) -> f64 {
        progress_percent(self.finished_count(), self.results.len())
    }
}

/// `done / total * 100`; zero for an empty batch.
pub fn progress_percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        done as f64 / total as f64 * 100.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchOptions {
    /// Multiplier applied to the simulated processing time; 0 disables sleeping.
    pub simulate_delay_scale: f64,
    /// Record image dimensions for each file.
    pub preview: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            simulate_delay_scale: 0.0,
            preview: true,
        }
    }
}

pub struct Orchestrator {
    registry: LabelerRegistry,
    options: BatchOptions,
}

impl Orchestrator {
    pub fn new(registry: LabelerRegistry, options: BatchOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &LabelerRegistry {
        &self.registry
    }

    /// Label one file outside of a batch.
    pub fn process_single(&self, file: &MediaFile) -> FileResult {
        let mut result = FileResult::pending(file);
        self.process_file(file, &mut result, &CancelToken::new());
        result
    }

    /// Process every file in order without cancellation or event reporting.
    pub fn process_batch(&self, files: &[MediaFile], annotations: &AnnotationBook) -> BatchOutcome {
        self.run(files, annotations, &CancelToken::new(), |_| {})
    }

    /// Process files sequentially, reporting each step to `on_event`.
    pub fn run<F>(
        &self,
        files: &[MediaFile],
        annotations: &AnnotationBook,
        cancel: &CancelToken,
        mut on_event: F,
    ) -> BatchOutcome
    where
        F: FnMut(BatchEvent),
    {
        let total = files.len();
        let mut outcome = BatchOutcome {
            results: files.iter().map(FileResult::pending).collect(),
            ..BatchOutcome::default()
        };
        let started = Instant::now();
        log::info!("batch started: {} files", total);

        for (index, file) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                log::warn!(
                    "batch cancelled before {} ({} of {} left)",
                    file.name,
                    total - index,
                    total
                );
                outcome.cancelled = true;
                break;
            }

            on_event(BatchEvent::Started { index, total });
            let result = &mut outcome.results[index];
            self.process_file(file, result, cancel);
            let progress = progress_percent(index + 1, total);

            if result.status == FileStatus::Error {
                on_event(BatchEvent::Failed {
                    index,
                    result: result.clone(),
                    progress,
                });
                continue;
            }

            let comparison = annotations
                .get(&file.name)
                .and_then(|annotation| ComparisonResult::compare(annotation, &result.detections));
            if let Some(comparison) = &comparison {
                outcome.comparisons.push(comparison.clone());
            }
            on_event(BatchEvent::Completed {
                index,
                result: result.clone(),
                comparison,
                progress,
            });
        }

        log::info!(
            "batch finished: {}/{} files, {} comparisons, {:.2}s{}",
            outcome.finished_count(),
            total,
            outcome.comparisons.len(),
            started.elapsed().as_secs_f64(),
            if outcome.cancelled { " (cancelled)" } else { "" }
        );
        on_event(BatchEvent::Finished {
            cancelled: outcome.cancelled,
        });
        outcome
    }

    fn process_file(&self, file: &MediaFile, result: &mut FileResult, cancel: &CancelToken) {
        result.status = FileStatus::Processing;
        log::debug!("processing {}", file.name);

        let detections = match self.registry.label_with(file) {
            Ok(detections) => detections,
            Err(err) => {
                log::error!("labeling {} failed: {:#}", file.name, err);
                result.status = FileStatus::Error;
                result.error = Some(format!("{:#}", err));
                return;
            }
        };

        result.processing_time_secs = simulated_processing_secs(&file.name);
        self.simulate_delay(result.processing_time_secs, cancel);

        if self.options.preview {
            result.preview = preview_or_none(file);
        }
        if detections.is_empty() {
            log::info!("{}: no traffic lights detected", file.name);
        } else {
            log::info!("{}: {} detections", file.name, detections.len());
        }
        result.detections = detections;
        result.status = FileStatus::Completed;
    }

    fn simulate_delay(&self, secs: f64, cancel: &CancelToken) {
        let scaled = secs * self.options.simulate_delay_scale;
        if !(scaled.is_finite() && scaled > 0.0) {
            return;
        }
        let deadline = Duration::try_from_secs_f64(scaled)
            .ok()
            .and_then(|delay| Instant::now().checked_add(delay));
        let Some(deadline) = deadline else {
            log::warn!("simulated delay of {scaled}s is out of range, skipping");
            return;
        };
        while !cancel.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(DELAY_SLICE.min(deadline - now));
        }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(LabelerRegistry::with_builtin(), BatchOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::ManualAnnotation;
    use crate::detect::{LabelerBackend, LightState};
    use anyhow::{anyhow, Result};

    fn files(names: &[&str]) -> Vec<MediaFile> {
        names
            .iter()
            .map(|n| MediaFile::virtual_file(*n, 100).unwrap())
            .collect()
    }

    struct Flaky;

    impl LabelerBackend for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn supports(&self, _media_type: MediaType) -> bool {
            true
        }

        fn label(&mut self, file: &MediaFile) -> Result<Vec<Detection>> {
            if file.name.starts_with("corrupt") {
                return Err(anyhow!("cannot decode {}", file.name));
            }
            Ok(crate::detect::label_file(&file.name))
        }
    }

    #[test]
    fn batch_preserves_order_and_completes() {
        let input = files(&["red_a.jpg", "cat.jpg", "traffic.mp4"]);
        let outcome = Orchestrator::default().process_batch(&input, &AnnotationBook::new());
        assert_eq!(outcome.results.len(), 3);
        let names: Vec<&str> = outcome.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["red_a.jpg", "cat.jpg", "traffic.mp4"]);
        assert!(outcome
            .results
            .iter()
            .all(|r| r.status == FileStatus::Completed));
        assert!(outcome
            .results
            .iter()
            .all(|r| (1.0..=3.0).contains(&r.processing_time_secs)));
        assert_eq!(outcome.progress(), 100.0);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn comparisons_skip_files_without_detections() {
        let input = files(&["red_stop_sign.jpg", "cat.jpg", "blue_car.jpg"]);
        let mut book = AnnotationBook::new();
        book.annotate(ManualAnnotation::new("red_stop_sign.jpg", LightState::RedLight));
        book.annotate(ManualAnnotation::new("cat.jpg", LightState::NoTrafficLight));

        let outcome = Orchestrator::default().process_batch(&input, &book);
        assert_eq!(outcome.comparisons.len(), 1);
        let comparison = &outcome.comparisons[0];
        assert_eq!(comparison.file_name, "red_stop_sign.jpg");
        assert!(comparison.is_correct);
    }

    #[test]
    fn events_report_progress_in_order() {
        let input = files(&["a.jpg", "b.jpg", "c.jpg", "d.jpg"]);
        let mut progress = Vec::new();
        let mut finished = None;
        Orchestrator::default().run(&input, &AnnotationBook::new(), &CancelToken::new(), |event| {
            match event {
                BatchEvent::Completed { progress: p, .. } => progress.push(p),
                BatchEvent::Finished { cancelled } => finished = Some(cancelled),
                _ => {}
            }
        });
        assert_eq!(progress, vec![25.0, 50.0, 75.0, 100.0]);
        assert_eq!(finished, Some(false));
    }

    #[test]
    fn cancel_stops_between_files() {
        let input = files(&["a.jpg", "b.jpg", "c.jpg"]);
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let outcome = Orchestrator::default().run(&input, &AnnotationBook::new(), &cancel, |event| {
            if let BatchEvent::Completed { index: 0, .. } = event {
                trigger.cancel();
            }
        });
        assert!(outcome.cancelled);
        assert_eq!(outcome.results[0].status, FileStatus::Completed);
        assert_eq!(outcome.results[1].status, FileStatus::Pending);
        assert_eq!(outcome.results[2].status, FileStatus::Pending);
        assert_eq!(outcome.results.len(), 3);
    }

    #[test]
    fn labeler_failure_marks_error_and_continues() {
        let mut registry = LabelerRegistry::new();
        registry.register(Flaky);
        let orchestrator = Orchestrator::new(registry, BatchOptions::default());
        let input = files(&["corrupt.jpg", "red.jpg"]);
        let mut failed = 0;
        let outcome = orchestrator.run(&input, &AnnotationBook::new(), &CancelToken::new(), |event| {
            if let BatchEvent::Failed { progress, .. } = event {
                assert_eq!(progress, 50.0);
                failed += 1;
            }
        });
        assert_eq!(failed, 1);
        assert_eq!(outcome.results[0].status, FileStatus::Error);
        assert!(outcome.results[0]
            .error
            .as_deref()
            .unwrap()
            .contains("cannot decode"));
        assert_eq!(outcome.results[1].status, FileStatus::Completed);
        assert_eq!(outcome.progress(), 100.0);
    }

    #[test]
    fn oversized_delay_scale_skips_sleep() {
        let orchestrator = Orchestrator::new(
            LabelerRegistry::with_builtin(),
            BatchOptions {
                simulate_delay_scale: 1e20,
                preview: false,
            },
        );
        let file = MediaFile::virtual_file("a.jpg", 1).unwrap();
        let started = Instant::now();
        let result = orchestrator.process_single(&file);
        assert_eq!(result.status, FileStatus::Completed);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn red_green_tie_predicts_red() {
        let input = files(&["red_green.jpg"]);
        let mut book = AnnotationBook::new();
        book.annotate(ManualAnnotation::new("red_green.jpg", LightState::GreenLight));
        let outcome = Orchestrator::default().process_batch(&input, &book);
        let detections = &outcome.results[0].detections;
        assert_eq!(detections[0].confidence(), detections[1].confidence());
        let comparison = &outcome.comparisons[0];
        assert_eq!(comparison.model_prediction, LightState::RedLight);
        assert!(!comparison.is_correct);
    }

    #[test]
    fn empty_batch_has_zero_progress() {
        let outcome = Orchestrator::default().process_batch(&[], &AnnotationBook::new());
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.progress(), 0.0);
    }

    #[test]
    fn single_file_mode_completes() {
        let file = MediaFile::virtual_file("green_light.png", 5).unwrap();
        let result = Orchestrator::default().process_single(&file);
        assert_eq!(result.status, FileStatus::Completed);
        assert!(!result.detections.is_empty());
        assert_eq!(result.preview, None);
    }
}
