use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::detect::result::Detection;
use crate::media::{MediaFile, MediaType};

use super::backend::LabelerBackend;
use super::backends::FileNameLabeler;

type SharedBackend = Arc<Mutex<dyn LabelerBackend>>;

/// Registry of labeler backends.
///
/// Backends are wrapped in `Mutex` because `LabelerBackend::label` takes `&mut self`.
pub struct LabelerRegistry {
    backends: HashMap<String, SharedBackend>,
    default_name: Option<String>,
}

impl LabelerRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Registry holding the built-in backends, `filename` as default.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(FileNameLabeler::new());
        registry
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: LabelerBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(Mutex::new(backend)));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("labeler backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    /// Get backend by name.
    pub fn get(&self, name: &str) -> Option<SharedBackend> {
        self.backends.get(name).cloned()
    }

    /// Get default backend.
    pub fn default_backend(&self) -> Option<SharedBackend> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// List registered backends, sorted by name.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Warm up every registered backend.
    pub fn warm_up(&self) -> Result<()> {
        for (name, backend) in &self.backends {
            let mut guard = backend
                .lock()
                .map_err(|_| anyhow!("labeler backend '{}' lock poisoned", name))?;
            guard.warm_up()?;
        }
        Ok(())
    }

    /// Select a backend that can label the given media type.
    ///
    /// Prefers the default backend when it supports the media type.
    pub fn backend_for(&self, media_type: MediaType) -> Result<SharedBackend> {
        if let Some(default_backend) = self.default_backend() {
            let supports = {
                let guard = default_backend
                    .lock()
                    .map_err(|_| anyhow!("default labeler lock poisoned"))?;
                guard.supports(media_type)
            };
            if supports {
                return Ok(default_backend);
            }
        }

        let mut names: Vec<&String> = self.backends.keys().collect();
        names.sort();
        for name in names {
            let backend = &self.backends[name];
            let supports = {
                let guard = backend
                    .lock()
                    .map_err(|_| anyhow!("labeler lock poisoned"))?;
                guard.supports(media_type)
            };
            if supports {
                return Ok(backend.clone());
            }
        }

        Err(anyhow!(
            "no registered labeler supports {} files",
            media_type
        ))
    }

    /// Label a file with a backend that supports its media type.
    pub fn label_with(&self, file: &MediaFile) -> Result<Vec<Detection>> {
        let backend = self.backend_for(file.media_type)?;
        let mut guard = backend
            .lock()
            .map_err(|_| anyhow!("labeler lock poisoned"))?;
        guard.label(file)
    }
}

impl Default for LabelerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::LightState;

    struct ImageOnly;

    impl LabelerBackend for ImageOnly {
        fn name(&self) -> &'static str {
            "image_only"
        }

        fn supports(&self, media_type: MediaType) -> bool {
            media_type == MediaType::Image
        }

        fn label(&mut self, _file: &MediaFile) -> Result<Vec<Detection>> {
            Ok(vec![Detection::new(LightState::GreenLight, [0, 0, 10, 10], 1.0)])
        }
    }

    #[test]
    fn first_registered_is_default() {
        let mut registry = LabelerRegistry::new();
        registry.register(ImageOnly);
        registry.register(FileNameLabeler::new());
        assert_eq!(registry.default_name(), Some("image_only"));
        assert_eq!(registry.list(), vec!["filename", "image_only"]);
    }

    #[test]
    fn falls_back_when_default_lacks_support() {
        let mut registry = LabelerRegistry::new();
        registry.register(ImageOnly);
        registry.register(FileNameLabeler::new());

        let image = MediaFile::virtual_file("cat.jpg", 10).unwrap();
        let dets = registry.label_with(&image).unwrap();
        assert_eq!(dets[0].light_state(), LightState::GreenLight);

        let video = MediaFile::virtual_file("red_clip.mp4", 10).unwrap();
        let dets = registry.label_with(&video).unwrap();
        assert_eq!(dets[0].light_state(), LightState::RedLight);
    }

    #[test]
    fn set_default_rejects_unknown() {
        let mut registry = LabelerRegistry::with_builtin();
        assert!(registry.set_default("onnx").is_err());
        assert!(registry.set_default("filename").is_ok());
    }

    #[test]
    fn empty_registry_errors() {
        let registry = LabelerRegistry::new();
        let file = MediaFile::virtual_file("red.jpg", 1).unwrap();
        assert!(registry.label_with(&file).is_err());
    }
}
