//! Manual ground-truth annotations keyed by file name.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::detect::LightState;
use crate::media::MediaType;

/// A human label for one file. Confidence is always 1.0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManualAnnotation {
    pub file_name: String,
    pub human_label: LightState,
    pub confidence: f64,
}

impl ManualAnnotation {
    pub fn new(file_name: impl Into<String>, human_label: LightState) -> Self {
        Self {
            file_name: file_name.into(),
            human_label,
            confidence: 1.0,
        }
    }
}

/// Annotations keyed by file name; annotating a file again replaces the entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationBook {
    entries: BTreeMap<String, ManualAnnotation>,
}

impl AnnotationBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Returns the previous annotation, if any.
    pub fn annotate(&mut self, annotation: ManualAnnotation) -> Option<ManualAnnotation> {
        self.entries
            .insert(annotation.file_name.clone(), annotation)
    }

    pub fn get(&self, file_name: &str) -> Option<&ManualAnnotation> {
        self.entries.get(file_name)
    }

    pub fn remove(&mut self, file_name: &str) -> Option<ManualAnnotation> {
        self.entries.remove(file_name)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManualAnnotation> {
        self.entries.values()
    }

    /// Load annotations from a `.json` map (`{"file.jpg": "red_light"}`) or
    /// `.csv` lines (`file.jpg,red_light`, header optional).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read annotations {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let book = if is_json {
            Self::from_json(&raw)
        } else {
            Self::from_csv(&raw)
        };
        book.with_context(|| format!("invalid annotations file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let labels: BTreeMap<String, String> = serde_json::from_str(raw)?;
        let mut book = Self::new();
        for (file_name, label) in labels {
            let state: LightState = label
                .parse()
                .with_context(|| format!("entry '{file_name}'"))?;
            book.annotate(ManualAnnotation::new(file_name, state));
        }
        Ok(book)
    }

    /// The first record is skipped as a header when its label column is not
    /// a light state and its name column is not a media file name.
    pub fn from_csv(raw: &str) -> Result<Self> {
        let mut book = Self::new();
        let mut first_record = true;
        for (line_no, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((name, label)) = line.rsplit_once(',') else {
                return Err(anyhow!("line {}: expected 'file_name,label'", line_no + 1));
            };
            let name = name.trim().trim_matches('"');
            let label = label.trim().trim_matches('"');
            let parsed = label.parse::<LightState>();
            if std::mem::take(&mut first_record)
                && parsed.is_err()
                && MediaType::from_path(Path::new(name)).is_none()
            {
                log::debug!("skipping annotation header '{line}'");
                continue;
            }
            let state = parsed.with_context(|| format!("line {}", line_no + 1))?;
            book.annotate(ManualAnnotation::new(name, state));
        }
        Ok(book)
    }
}

impl<'a> IntoIterator for &'a AnnotationBook {
    type Item = &'a ManualAnnotation;
    type IntoIter = std::collections::btree_map::Values<'a, String, ManualAnnotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reannotating_replaces() {
        let mut book = AnnotationBook::new();
        assert!(book
            .annotate(ManualAnnotation::new("a.jpg", LightState::RedLight))
            .is_none());
        let previous = book
            .annotate(ManualAnnotation::new("a.jpg", LightState::GreenLight))
            .unwrap();
        assert_eq!(previous.human_label, LightState::RedLight);
        assert_eq!(book.len(), 1);
        assert_eq!(book.get("a.jpg").unwrap().human_label, LightState::GreenLight);
        assert_eq!(book.get("a.jpg").unwrap().confidence, 1.0);
    }

    #[test]
    fn parses_csv_with_header_and_comments() {
        let raw = "file_name,label\n# comment\nred.jpg, red_light\n\"a,b.jpg\",green_light\n";
        let book = AnnotationBook::from_csv(raw).unwrap();
        assert_eq!(book.len(), 2);
        assert_eq!(book.get("red.jpg").unwrap().human_label, LightState::RedLight);
        assert_eq!(book.get("a,b.jpg").unwrap().human_label, LightState::GreenLight);
    }

    #[test]
    fn rejects_unknown_labels() {
        assert!(AnnotationBook::from_csv("red.jpg,purple_light").is_err());
        assert!(AnnotationBook::from_csv("no-comma-here").is_err());
    }

    #[test]
    fn header_may_follow_comments_and_use_any_name() {
        let raw = "# exported labels\nfile,human_label\nred.jpg,Red_Light\n";
        let book = AnnotationBook::from_csv(raw).unwrap();
        assert_eq!(book.len(), 1);
        assert_eq!(book.get("red.jpg").unwrap().human_label, LightState::RedLight);

        // A bad label on a media file is an error, never a header.
        assert!(AnnotationBook::from_csv("red.jpg,redlight\n").is_err());
        assert!(AnnotationBook::from_csv("file,label\nfile,label\n").is_err());
    }

    #[test]
    fn json_labels_are_case_insensitive() {
        let book = AnnotationBook::from_json(r#"{"a.jpg": "GREEN_LIGHT"}"#).unwrap();
        assert_eq!(book.get("a.jpg").unwrap().human_label, LightState::GreenLight);
        assert!(AnnotationBook::from_json(r#"{"a.jpg": "blue_light"}"#).is_err());
    }

    #[test]
    fn parses_json_map() {
        let book =
            AnnotationBook::from_json(r#"{"x.png": "no_traffic_light", "y.png": "yellow_light"}"#)
                .unwrap();
        assert_eq!(
            book.get("x.png").unwrap().human_label,
            LightState::NoTrafficLight
        );
        assert_eq!(book.iter().count(), 2);
    }
}
