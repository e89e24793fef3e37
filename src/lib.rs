//! Traffic Light Lab
//!
//! This crate simulates traffic light detection over user-selected images and
//! videos and measures how well the simulated labels agree with manual
//! annotations.
//!
//! # Architecture
//!
//! Labeling is deterministic: the built-in labeler derives every detection
//! from the file name alone, so the same file always yields the same result.
//! Files are processed strictly one at a time and results land at the same
//! index as their input.
//!
//! # Module Structure
//!
//! - `detect`: Detection types, the labeler backend seam and the name-hash labeler
//! - `media`: File selection and folder scanning
//! - `batch`: Sequential orchestrator, progress events and cancellation
//! - `annotation` / `metrics`: Manual labels and accuracy aggregation
//! - `export`: CSV and JSON exports
//! - `store`: Action log and reducer for application state
//! - `dataset`: YOLO label helpers
//! - `config`, `ui`, `cli`: Ambient configuration, terminal progress and the `tlight` front end

pub mod annotation;
pub mod batch;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod detect;
pub mod export;
pub mod media;
pub mod metrics;
pub mod preview;
pub mod store;
pub mod ui;

pub use annotation::{AnnotationBook, ManualAnnotation};
pub use batch::{
    BatchEvent, BatchOptions, BatchOutcome, CancelToken, FileResult, FileStatus, Orchestrator,
};
pub use config::LabConfig;
pub use detect::{
    label_file, primary_detection, Detection, FileNameLabeler, LabelerBackend, LabelerRegistry,
    LightState,
};
pub use media::{scan_folder, MediaFile, MediaType};
pub use metrics::{compute_metrics, ComparisonResult, Metrics};
pub use store::{reduce, Action, AppState, Store};
