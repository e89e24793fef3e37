use anyhow::Result;

use crate::detect::result::Detection;
use crate::media::{MediaFile, MediaType};

/// Labeler backend trait.
///
/// The batch orchestrator and the CLI only talk to labelers through this
/// trait, so the file-name simulator can be swapped for a real inference
/// backend without touching either of them.
///
/// Implementations must be deterministic for a given input when used in
/// reproducible runs; the bundled `FileNameLabeler` ignores file content
/// entirely.
pub trait LabelerBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Returns true when the backend can label this kind of media.
    fn supports(&self, media_type: MediaType) -> bool;

    /// Produce detections for a file.
    ///
    /// An error marks the file as failed; the batch keeps going.
    fn label(&mut self, file: &MediaFile) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
