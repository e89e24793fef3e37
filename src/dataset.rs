//! YOLO-format label helpers for traffic light training data.
//!
//! Label files hold one object per line: `class_id cx cy w h`, with the
//! center and size normalized to `[0, 1]`.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::detect::{Detection, LightState};

/// Training class order.
pub const CLASS_NAMES: [LightState; 4] = LightState::LABELED;

pub fn class_id(state: LightState) -> Option<u8> {
    CLASS_NAMES
        .iter()
        .position(|s| *s == state)
        .map(|id| id as u8)
}

pub fn class_for_id(id: u8) -> Option<LightState> {
    CLASS_NAMES.get(id as usize).copied()
}

/// Render a detection as a YOLO label line for an image of the given size.
pub fn to_yolo_line(detection: &Detection, width: u32, height: u32) -> Result<String> {
    if width == 0 || height == 0 {
        return Err(anyhow!("image dimensions must be non-zero"));
    }
    let id = class_id(detection.light_state()).ok_or_else(|| {
        anyhow!(
            "{} has no training class",
            detection.light_state()
        )
    })?;
    let [x1, y1, x2, y2] = detection.bbox();
    let (w, h) = (width as f64, height as f64);
    let clamp = |v: f64| v.clamp(0.0, 1.0);
    let cx = clamp((x1 + x2) as f64 / 2.0 / w);
    let cy = clamp((y1 + y2) as f64 / 2.0 / h);
    let bw = clamp((x2 - x1) as f64 / w);
    let bh = clamp((y2 - y1) as f64 / h);
    Ok(format!("{id} {cx:.6} {cy:.6} {bw:.6} {bh:.6}"))
}

/// A problem found in a label file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelIssue {
    pub path: PathBuf,
    pub line: Option<usize>,
    pub message: String,
}

impl std::fmt::Display for LabelIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{} - {}", self.path.display(), line, self.message),
            None => write!(f, "{} - {}", self.path.display(), self.message),
        }
    }
}

/// Check a single label line. Returns the problem, if any.
pub fn check_label_line(line: &str) -> Option<String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 5 {
        return Some("invalid format".to_string());
    }
    let Ok(values) = parts
        .iter()
        .map(|p| p.parse::<f64>())
        .collect::<std::result::Result<Vec<f64>, _>>()
    else {
        return Some("non-numeric value".to_string());
    };
    let class = values[0];
    if class.fract() != 0.0
        || !(0.0..=255.0).contains(&class)
        || class_for_id(class as u8).is_none()
    {
        return Some(format!("unknown class id {}", parts[0]));
    }
    if values[1..].iter().any(|v| !(0.0..=1.0).contains(v)) {
        return Some("values out of range".to_string());
    }
    None
}

/// Dataset splits laid out as `images/<split>` and `labels/<split>`.
pub const SPLITS: [&str; 3] = ["train", "val", "test"];

const IMAGE_EXTENSIONS: [&str; 2] = ["jpg", "png"];

/// Validate every `*.txt` label file directly inside `labels`.
///
/// Each label needs a matching `<stem>.jpg` or `<stem>.png` in `images`;
/// label files without one are reported and their lines are not checked.
pub fn validate_label_dir(
    labels: impl AsRef<Path>,
    images: impl AsRef<Path>,
) -> Result<Vec<LabelIssue>> {
    let (labels, images) = (labels.as_ref(), images.as_ref());
    let mut paths: Vec<PathBuf> = std::fs::read_dir(labels)
        .with_context(|| format!("failed to read label dir {}", labels.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("txt"))
        .collect();
    paths.sort();

    let mut issues = Vec::new();
    for path in paths {
        if !has_image(&path, images) {
            issues.push(LabelIssue {
                path,
                line: None,
                message: "missing image".to_string(),
            });
            continue;
        }
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) => {
                issues.push(LabelIssue {
                    path,
                    line: None,
                    message: format!("error reading file: {err}"),
                });
                continue;
            }
        };
        for (index, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(message) = check_label_line(line) {
                issues.push(LabelIssue {
                    path: path.clone(),
                    line: Some(index + 1),
                    message,
                });
            }
        }
    }
    Ok(issues)
}

/// Validate `labels/<split>` against `images/<split>` for every split under
/// a dataset root. Splits without a label directory are skipped.
pub fn validate_dataset(root: impl AsRef<Path>) -> Result<Vec<LabelIssue>> {
    let root = root.as_ref();
    let labels_root = root.join("labels");
    if !labels_root.is_dir() {
        return Err(anyhow!("{} has no labels directory", root.display()));
    }
    let mut issues = Vec::new();
    for split in SPLITS {
        let labels = labels_root.join(split);
        if !labels.is_dir() {
            log::debug!("no {split} labels in {}", root.display());
            continue;
        }
        issues.extend(validate_label_dir(&labels, root.join("images").join(split))?);
    }
    Ok(issues)
}

fn has_image(label: &Path, images: &Path) -> bool {
    let Some(stem) = label.file_stem() else {
        return false;
    };
    IMAGE_EXTENSIONS.iter().any(|ext| {
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(ext);
        images.join(name).is_file()
    })
}
