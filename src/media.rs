//! Media file selection.
//!
//! This module provides `MediaFile` for the files a user selects, either one
//! at a time or by folder. It is responsible for:
//! - Filtering to image and video types by extension (`image/*`, `video/*`)
//! - Reading file size from metadata
//! - Walking folders in a stable order
//!
//! File content is never read here.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("webp", "image/webp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
];

const VIDEO_EXTENSIONS: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// Classify a file by extension. Unsupported types return `None`.
    pub fn from_path(path: &Path) -> Option<Self> {
        mime_for(path).map(|(media_type, _)| media_type)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Image => f.pad("image"),
            MediaType::Video => f.pad("video"),
        }
    }
}

fn mime_for(path: &Path) -> Option<(MediaType, &'static str)> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if let Some((_, mime)) = IMAGE_EXTENSIONS.iter().find(|(e, _)| *e == ext) {
        return Some((MediaType::Image, mime));
    }
    VIDEO_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| (MediaType::Video, *mime))
}

/// A user-selected image or video.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    /// File name without directories; the key for annotations.
    pub name: String,
    /// Location on disk, absent for name-only entries.
    pub path: Option<PathBuf>,
    /// Size in bytes.
    pub size: u64,
    pub media_type: MediaType,
}

impl MediaFile {
    /// Open a file on disk, rejecting unsupported types.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let media_type = MediaType::from_path(path).ok_or_else(|| {
            anyhow!(
                "{} is not a supported image/video file",
                path.display()
            )
        })?;
        let meta = std::fs::metadata(path)
            .with_context(|| format!("failed to read metadata for {}", path.display()))?;
        if !meta.is_file() {
            return Err(anyhow!("{} is not a regular file", path.display()));
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("{} has no usable file name", path.display()))?
            .to_string();
        Ok(Self {
            name,
            path: Some(path.to_path_buf()),
            size: meta.len(),
            media_type,
        })
    }

    /// Build an entry from a name alone (no file on disk).
    pub fn virtual_file(name: impl Into<String>, size: u64) -> Result<Self> {
        let name = name.into();
        let media_type = MediaType::from_path(Path::new(&name))
            .ok_or_else(|| anyhow!("{} is not a supported image/video file", name))?;
        Ok(Self {
            name,
            path: None,
            size,
            media_type,
        })
    }

    pub fn mime_type(&self) -> &'static str {
        let lookup = self
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.name));
        mime_for(&lookup)
            .map(|(_, mime)| mime)
            .unwrap_or("application/octet-stream")
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }
}

/// Collect supported media under `dir`, recursively, sorted by path.
///
/// Errors when the folder holds no supported files.
pub fn scan_folder(dir: impl AsRef<Path>) -> Result<Vec<MediaFile>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(anyhow!("{} is not a directory", dir.display()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if MediaType::from_path(entry.path()).is_none() {
            log::debug!("skipping unsupported file {}", entry.path().display());
            continue;
        }
        files.push(MediaFile::open(entry.path())?);
    }

    if files.is_empty() {
        return Err(anyhow!(
            "no supported image/video files found in {}",
            dir.display()
        ));
    }
    log::info!("found {} media files in {}", files.len(), dir.display());
    Ok(files)
}

/// Resolve a mix of files and folders into an ordered media list.
pub fn collect_inputs<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<MediaFile>> {
    let mut files = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        if input.is_dir() {
            files.extend(scan_folder(input)?);
        } else {
            files.push(MediaFile::open(input)?);
        }
    }
    Ok(files)
}
