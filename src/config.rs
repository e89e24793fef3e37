use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::batch::BatchOptions;

const DEFAULT_BACKEND: &str = "filename";
const DEFAULT_EXPORT_DIR: &str = ".";
const DEFAULT_DELAY_SCALE: f64 = 0.0;
const DEFAULT_UI_MODE: &str = "auto";

#[derive(Debug, Deserialize, Default)]
struct LabConfigFile {
    backend: Option<String>,
    export_dir: Option<PathBuf>,
    ui: Option<String>,
    batch: Option<BatchConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct BatchConfigFile {
    simulate_delay_scale: Option<f64>,
    preview: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabConfig {
    /// Labeler backend used by default.
    pub backend: String,
    pub export_dir: PathBuf,
    /// Progress UI mode: auto, plain or pretty.
    pub ui: String,
    pub batch: BatchSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSettings {
    pub simulate_delay_scale: f64,
    pub preview: bool,
}

impl BatchSettings {
    pub fn options(&self) -> BatchOptions {
        BatchOptions {
            simulate_delay_scale: self.simulate_delay_scale,
            preview: self.preview,
        }
    }
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            ui: DEFAULT_UI_MODE.to_string(),
            batch: BatchSettings {
                simulate_delay_scale: DEFAULT_DELAY_SCALE,
                preview: true,
            },
        }
    }
}

impl LabConfig {
    /// Load from `TLIGHT_CONFIG` (if set), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("TLIGHT_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit file, then apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: LabConfigFile) -> Self {
        let defaults = Self::default();
        let batch = file.batch.unwrap_or_default();
        Self {
            backend: file.backend.unwrap_or(defaults.backend),
            export_dir: file.export_dir.unwrap_or(defaults.export_dir),
            ui: file.ui.unwrap_or(defaults.ui),
            batch: BatchSettings {
                simulate_delay_scale: batch
                    .simulate_delay_scale
                    .unwrap_or(defaults.batch.simulate_delay_scale),
                preview: batch.preview.unwrap_or(defaults.batch.preview),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(backend) = std::env::var("TLIGHT_BACKEND") {
            if !backend.trim().is_empty() {
                self.backend = backend.trim().to_string();
            }
        }
        if let Ok(dir) = std::env::var("TLIGHT_EXPORT_DIR") {
            if !dir.trim().is_empty() {
                self.export_dir = PathBuf::from(dir);
            }
        }
        if let Ok(ui) = std::env::var("TLIGHT_UI") {
            if !ui.trim().is_empty() {
                self.ui = ui.trim().to_string();
            }
        }
        if let Ok(scale) = std::env::var("TLIGHT_DELAY_SCALE") {
            self.batch.simulate_delay_scale = scale
                .trim()
                .parse()
                .map_err(|_| anyhow!("TLIGHT_DELAY_SCALE must be a number"))?;
        }
        if let Ok(preview) = std::env::var("TLIGHT_PREVIEW") {
            self.batch.preview = parse_bool(&preview)
                .ok_or_else(|| anyhow!("TLIGHT_PREVIEW must be true/false"))?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.backend.trim().is_empty() {
            return Err(anyhow!("backend must not be empty"));
        }
        let scale = self.batch.simulate_delay_scale;
        if !scale.is_finite() || scale < 0.0 {
            return Err(anyhow!(
                "simulate_delay_scale must be a finite number >= 0 (got {})",
                scale
            ));
        }
        self.ui = self.ui.to_ascii_lowercase();
        if !matches!(self.ui.as_str(), "auto" | "plain" | "pretty") {
            return Err(anyhow!("ui must be one of auto, plain, pretty"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<LabConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
