//! Image previews.
//!
//! A preview records the decoded dimensions of an image. Videos and files
//! without a path get no preview. Failures are never fatal to a batch.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::media::{MediaFile, MediaType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub width: u32,
    pub height: u32,
}

/// Generate a preview, logging and swallowing any failure.
pub fn preview_or_none(file: &MediaFile) -> Option<Preview> {
    match generate(file) {
        Ok(preview) => preview,
        Err(err) => {
            log::warn!("preview for {} unavailable: {:#}", file.name, err);
            None
        }
    }
}

/// Read image dimensions from disk.
#[cfg(feature = "preview")]
pub fn generate(file: &MediaFile) -> Result<Option<Preview>> {
    use anyhow::Context;

    let Some(path) = file.path.as_deref() else {
        return Ok(None);
    };
    if file.media_type != MediaType::Image {
        return Ok(None);
    }
    let (width, height) = image::image_dimensions(path)
        .with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(Some(Preview { width, height }))
}

#[cfg(not(feature = "preview"))]
pub fn generate(file: &MediaFile) -> Result<Option<Preview>> {
    if file.media_type == MediaType::Image && file.path.is_some() {
        log::debug!("preview feature disabled, skipping {}", file.name);
    }
    Ok(None)
}
