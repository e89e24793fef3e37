//! Application state as a typed action log and a single reducer.
//!
//! Every state change goes through `reduce`, so a session can be replayed
//! from its actions without any rendering layer. The batch loop drives the
//! store through `BatchEvent`s, which keeps it the only mutation source while
//! a batch runs.

use serde::{Deserialize, Serialize};

use crate::annotation::{AnnotationBook, ManualAnnotation};
use crate::batch::{BatchEvent, CancelToken, FileResult, FileStatus, Orchestrator};
use crate::media::MediaFile;
use crate::metrics::{compute_metrics, ComparisonResult, Metrics};

pub const EMPTY_FOLDER_NOTICE: &str = "no supported image/video files in the selected folder";
pub const NO_BATCH_NOTICE: &str = "select a folder before starting a batch";
pub const BATCH_RUNNING_NOTICE: &str = "a batch is already running";
pub const BATCH_CANCELLED_NOTICE: &str = "batch cancelled";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Single,
    Batch,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppState {
    pub mode: Mode,
    pub selected: Option<MediaFile>,
    pub single_result: Option<FileResult>,
    pub batch_files: Vec<MediaFile>,
    pub results: Vec<FileResult>,
    pub annotations: AnnotationBook,
    pub comparisons: Vec<ComparisonResult>,
    pub progress: f64,
    pub batch_running: bool,
    /// User-facing message from the last action, if any.
    pub notice: Option<String>,
}

impl AppState {
    /// Comparison for the single-mode file, when it is annotated and has detections.
    pub fn single_comparison(&self) -> Option<ComparisonResult> {
        let result = self.single_result.as_ref()?;
        let annotation = self.annotations.get(&result.name)?;
        ComparisonResult::compare(annotation, &result.detections)
    }

    pub fn metrics(&self) -> Option<Metrics> {
        compute_metrics(&self.comparisons)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    SelectFile(MediaFile),
    SelectFolder(Vec<MediaFile>),
    SingleCompleted(FileResult),
    StartBatch,
    FileStarted {
        index: usize,
    },
    FileCompleted {
        index: usize,
        result: FileResult,
        comparison: Option<ComparisonResult>,
        progress: f64,
    },
    FileFailed {
        index: usize,
        result: FileResult,
        progress: f64,
    },
    BatchFinished {
        cancelled: bool,
    },
    Annotate(ManualAnnotation),
    ClearAnnotations,
    Reset,
}

impl From<BatchEvent> for Action {
    fn from(event: BatchEvent) -> Self {
        match event {
            BatchEvent::Started { index, .. } => Action::FileStarted { index },
            BatchEvent::Completed {
                index,
                result,
                comparison,
                progress,
            } => Action::FileCompleted {
                index,
                result,
                comparison,
                progress,
            },
            BatchEvent::Failed {
                index,
                result,
                progress,
            } => Action::FileFailed {
                index,
                result,
                progress,
            },
            BatchEvent::Finished { cancelled } => Action::BatchFinished { cancelled },
        }
    }
}

/// The single reducer.
pub fn reduce(mut state: AppState, action: &Action) -> AppState {
    state.notice = None;
    match action {
        Action::SelectFile(file) => {
            state.mode = Mode::Single;
            state.selected = Some(file.clone());
            state.single_result = None;
        }
        Action::SelectFolder(files) => {
            if files.is_empty() {
                state.notice = Some(EMPTY_FOLDER_NOTICE.to_string());
                return state;
            }
            state.mode = Mode::Batch;
            state.batch_files = files.clone();
            state.results = files.iter().map(FileResult::pending).collect();
            state.comparisons.clear();
            state.progress = 0.0;
        }
        Action::SingleCompleted(result) => {
            state.single_result = Some(result.clone());
        }
        Action::StartBatch => {
            if state.batch_running {
                state.notice = Some(BATCH_RUNNING_NOTICE.to_string());
                return state;
            }
            if state.batch_files.is_empty() {
                state.notice = Some(NO_BATCH_NOTICE.to_string());
                return state;
            }
            state.mode = Mode::Batch;
            state.batch_running = true;
            state.results = state.batch_files.iter().map(FileResult::pending).collect();
            state.comparisons.clear();
            state.progress = 0.0;
        }
        Action::FileStarted { index } => {
            if let Some(result) = state.results.get_mut(*index) {
                result.status = FileStatus::Processing;
            }
        }
        Action::FileCompleted {
            index,
            result,
            comparison,
            progress,
        } => {
            if let Some(slot) = state.results.get_mut(*index) {
                *slot = result.clone();
            }
            if let Some(comparison) = comparison {
                state.comparisons.push(comparison.clone());
            }
            state.progress = *progress;
        }
        Action::FileFailed {
            index,
            result,
            progress,
        } => {
            if let Some(slot) = state.results.get_mut(*index) {
                *slot = result.clone();
            }
            state.progress = *progress;
        }
        Action::BatchFinished { cancelled } => {
            state.batch_running = false;
            if *cancelled {
                state.notice = Some(BATCH_CANCELLED_NOTICE.to_string());
            }
        }
        Action::Annotate(annotation) => {
            state.annotations.annotate(annotation.clone());
        }
        Action::ClearAnnotations => {
            state.annotations.clear();
        }
        Action::Reset => {
            state = AppState::default();
        }
    }
    state
}

/// State plus the actions that produced it.
#[derive(Debug, Default)]
pub struct Store {
    state: AppState,
    actions: Vec<Action>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store by applying `actions` in order.
    pub fn replay<I>(actions: I) -> Self
    where
        I: IntoIterator<Item = Action>,
    {
        let mut store = Self::new();
        for action in actions {
            store.dispatch(action);
        }
        store
    }

    pub fn dispatch(&mut self, action: Action) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, &action);
        self.actions.push(action);
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Label the selected file in single mode.
    pub fn run_single(&mut self, orchestrator: &Orchestrator) -> Option<&FileResult> {
        let file = self.state.selected.clone()?;
        let result = orchestrator.process_single(&file);
        self.dispatch(Action::SingleCompleted(result));
        self.state.single_result.as_ref()
    }

    /// Run the selected folder through the orchestrator, dispatching every
    /// batch event into the store.
    pub fn run_batch(&mut self, orchestrator: &Orchestrator, cancel: &CancelToken) {
        self.run_batch_with(orchestrator, cancel, |_| {});
    }

    /// Like `run_batch`, showing each event to `observe` before it is dispatched.
    pub fn run_batch_with<F>(
        &mut self,
        orchestrator: &Orchestrator,
        cancel: &CancelToken,
        mut observe: F,
    ) where
        F: FnMut(&BatchEvent),
    {
        self.dispatch(Action::StartBatch);
        if !self.state.batch_running {
            return;
        }
        let files = self.state.batch_files.clone();
        let annotations = self.state.annotations.clone();
        orchestrator.run(&files, &annotations, cancel, |event| {
            observe(&event);
            self.dispatch(event.into());
        });
    }
}
