//! Per-document view preferences: scale, rotation and the style of new
//! textboxes. Stored through the same key-value backend as annotations.

use crate::config::ViewDefaults;
use crate::persistence::{KeyValueStore, PersistenceError};
use annotator_model::{GeometryError, Rotation, Viewport};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("scale must be a positive number, got {0}")]
    InvalidScale(f64),
    #[error("text size must be a positive number, got {0}")]
    InvalidTextSize(f64),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("failed to serialize setting: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct ViewSettings<K> {
    backend: K,
    defaults: ViewDefaults,
}

impl<K: KeyValueStore> ViewSettings<K> {
    pub fn new(backend: K, defaults: ViewDefaults) -> Self {
        Self { backend, defaults }
    }

    pub fn scale(&self, document: &str) -> Result<f64, SettingsError> {
        let stored: Option<f64> = self.read(&key(document, "scale"))?;
        Ok(stored.filter(|scale| *scale > 0.0).unwrap_or(self.defaults.scale))
    }

    pub fn set_scale(&self, document: &str, scale: f64) -> Result<(), SettingsError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(SettingsError::InvalidScale(scale));
        }
        self.write(&key(document, "scale"), &scale)
    }

    pub fn rotation(&self, document: &str) -> Result<Rotation, SettingsError> {
        let stored: Option<i32> = self.read(&key(document, "rotate"))?;
        match stored.map(Rotation::from_degrees) {
            Some(Ok(rotation)) => Ok(rotation),
            Some(Err(error)) => {
                warn!(document, %error, "ignoring stored rotation");
                Ok(self.defaults.rotation)
            }
            None => Ok(self.defaults.rotation),
        }
    }

    pub fn set_rotation(&self, document: &str, rotation: Rotation) -> Result<(), SettingsError> {
        self.write(&key(document, "rotate"), &rotation.degrees())
    }

    /// Turns the document a quarter clockwise and returns the new rotation.
    pub fn rotate_clockwise(&self, document: &str) -> Result<Rotation, SettingsError> {
        let rotation = self.rotation(document)?.clockwise();
        self.set_rotation(document, rotation)?;
        Ok(rotation)
    }

    pub fn text_size(&self, document: &str) -> Result<f64, SettingsError> {
        let stored: Option<f64> = self.read(&key(document, "text/size"))?;
        Ok(stored.unwrap_or(self.defaults.text_size))
    }

    pub fn set_text_size(&self, document: &str, size: f64) -> Result<(), SettingsError> {
        if !size.is_finite() || size <= 0.0 {
            return Err(SettingsError::InvalidTextSize(size));
        }
        self.write(&key(document, "text/size"), &size)
    }

    pub fn text_color(&self, document: &str) -> Result<String, SettingsError> {
        let stored: Option<String> = self.read(&key(document, "text/color"))?;
        Ok(stored.unwrap_or_else(|| self.defaults.text_color.clone()))
    }

    pub fn set_text_color(&self, document: &str, color: &str) -> Result<(), SettingsError> {
        self.write(&key(document, "text/color"), &color)
    }

    /// Viewport of a page of the document under its stored scale and rotation.
    pub fn viewport_for(&self, document: &str, page_width: f64, page_height: f64) -> Result<Viewport, SettingsError> {
        let scale = self.scale(document)?;
        let rotation = self.rotation(document)?;
        Ok(Viewport::for_page(page_width, page_height, scale, rotation)?)
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SettingsError> {
        let Some(bytes) = self.backend.load(key)? else {
            return Ok(None);
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                warn!(key, %error, "unreadable view setting, using default");
                Ok(None)
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), SettingsError> {
        self.backend.save(key, &serde_json::to_vec(value)?)?;
        Ok(())
    }
}

fn key(document: &str, setting: &str) -> String {
    format!("{document}/{setting}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    fn settings() -> ViewSettings<MemoryStore> {
        ViewSettings::new(MemoryStore::new(), ViewDefaults::default())
    }

    #[test]
    fn test_defaults_before_anything_is_stored() {
        let settings = settings();
        assert_eq!(settings.scale("doc").unwrap(), 1.33);
        assert_eq!(settings.rotation("doc").unwrap(), Rotation::Deg0);
        assert_eq!(settings.text_size("doc").unwrap(), 10.0);
        assert_eq!(settings.text_color("doc").unwrap(), "red");
    }

    #[test]
    fn test_settings_are_per_document() {
        let settings = settings();
        settings.set_scale("a", 2.5).unwrap();
        settings.set_text_color("a", "#0f0").unwrap();

        assert_eq!(settings.scale("a").unwrap(), 2.5);
        assert_eq!(settings.scale("b").unwrap(), 1.33);
        assert_eq!(settings.text_color("a").unwrap(), "#0f0");
        assert_eq!(settings.text_color("b").unwrap(), "red");
    }

    #[test]
    fn test_rotate_clockwise_wraps_around() {
        let settings = settings();
        settings.set_rotation("doc", Rotation::Deg180).unwrap();

        assert_eq!(settings.rotate_clockwise("doc").unwrap(), Rotation::Deg270);
        assert_eq!(settings.rotate_clockwise("doc").unwrap(), Rotation::Deg0);
        assert_eq!(settings.rotation("doc").unwrap(), Rotation::Deg0);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let settings = settings();
        assert!(matches!(settings.set_scale("doc", 0.0), Err(SettingsError::InvalidScale(_))));
        assert!(matches!(settings.set_text_size("doc", -3.0), Err(SettingsError::InvalidTextSize(_))));
    }

    #[test]
    fn test_unusable_stored_values_fall_back_to_defaults() {
        let backend = MemoryStore::new();
        backend.save("doc/rotate", b"45").unwrap();
        backend.save("doc/scale", b"\"large\"").unwrap();

        let settings = ViewSettings::new(backend, ViewDefaults::default());
        assert_eq!(settings.rotation("doc").unwrap(), Rotation::Deg0);
        assert_eq!(settings.scale("doc").unwrap(), 1.33);
    }

    #[test]
    fn test_viewport_uses_stored_state() {
        let settings = settings();
        settings.set_scale("doc", 2.0).unwrap();
        settings.set_rotation("doc", Rotation::Deg90).unwrap();

        let viewport = settings.viewport_for("doc", 600.0, 800.0).unwrap();
        assert_eq!(viewport, Viewport::new(2.0, Rotation::Deg90, 1600.0, 1200.0));
    }
}
