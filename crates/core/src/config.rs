//! Annotator configuration.
//!
//! Values come from built-in defaults, optionally overridden by a TOML file
//! and then by environment variables.

use annotator_model::Rotation;
use serde::Deserialize;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const ENV_DATA_DIR: &str = "ANNOTATOR_DATA_DIR";
const ENV_DEFAULT_SCALE: &str = "ANNOTATOR_DEFAULT_SCALE";
const ENV_DEFAULT_ROTATION: &str = "ANNOTATOR_DEFAULT_ROTATION";
const ENV_TEXT_SIZE: &str = "ANNOTATOR_TEXT_SIZE";
const ENV_TEXT_COLOR: &str = "ANNOTATOR_TEXT_COLOR";

/// Values a document falls back to before the user changes anything.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewDefaults {
    pub scale: f64,
    pub rotation: Rotation,
    pub text_size: f64,
    pub text_color: String,
}

impl Default for ViewDefaults {
    fn default() -> Self {
        Self { scale: 1.33, rotation: Rotation::Deg0, text_size: 10.0, text_color: "red".to_owned() }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotatorConfig {
    /// Where the file backend keeps its data. `None` means the platform default.
    pub data_dir: Option<PathBuf>,
    pub view: ViewDefaults,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    default_scale: Option<f64>,
    default_rotation: Option<i32>,
    text_size: Option<f64>,
    text_color: Option<String>,
}

impl AnnotatorConfig {
    pub fn with_data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_default_scale(mut self, scale: f64) -> Self {
        self.view.scale = scale;
        self
    }

    pub fn with_default_rotation(mut self, rotation: Rotation) -> Self {
        self.view.rotation = rotation;
        self
    }

    pub fn with_text_size(mut self, size: f64) -> Self {
        self.view.text_size = size;
        self
    }

    pub fn with_text_color(mut self, color: impl Into<String>) -> Self {
        self.view.text_color = color.into();
        self
    }

    /// Loads configuration from environment variables on top of the defaults.
    ///
    /// Environment variables:
    /// - `ANNOTATOR_DATA_DIR`: data directory of the file backend
    /// - `ANNOTATOR_DEFAULT_SCALE`: initial page scale (default: 1.33)
    /// - `ANNOTATOR_DEFAULT_ROTATION`: initial rotation, 0/90/180/270 (default: 0)
    /// - `ANNOTATOR_TEXT_SIZE`: font size of new textboxes (default: 10)
    /// - `ANNOTATOR_TEXT_COLOR`: colour of new textboxes (default: red)
    ///
    /// # Errors
    /// Returns an error if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().merge_env()
    }

    /// Loads the TOML file at `path` on top of the defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or holds invalid values.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Defaults, then the optional file, then the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.merge_env()
    }

    fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(contents)?;
        let mut config = Self::default();

        if let Some(dir) = file.data_dir {
            config.data_dir = Some(dir);
        }
        if let Some(scale) = file.default_scale {
            config.view.scale = positive("default_scale", scale)?;
        }
        if let Some(degrees) = file.default_rotation {
            config.view.rotation = rotation("default_rotation", degrees)?;
        }
        if let Some(size) = file.text_size {
            config.view.text_size = positive("text_size", size)?;
        }
        if let Some(color) = file.text_color {
            config.view.text_color = color;
        }

        Ok(config)
    }

    fn merge_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(dir) = env::var(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Ok(value) = env::var(ENV_DEFAULT_SCALE) {
            self.view.scale = positive(ENV_DEFAULT_SCALE, parse(ENV_DEFAULT_SCALE, &value)?)?;
        }
        if let Ok(value) = env::var(ENV_DEFAULT_ROTATION) {
            self.view.rotation = rotation(ENV_DEFAULT_ROTATION, parse(ENV_DEFAULT_ROTATION, &value)?)?;
        }
        if let Ok(value) = env::var(ENV_TEXT_SIZE) {
            self.view.text_size = positive(ENV_TEXT_SIZE, parse(ENV_TEXT_SIZE, &value)?)?;
        }
        if let Ok(value) = env::var(ENV_TEXT_COLOR) {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue(ENV_TEXT_COLOR.to_owned()));
            }
            self.view.text_color = value;
        }

        Ok(self)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue(key.to_owned()))
}

fn positive(key: &str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue(key.to_owned()))
    }
}

fn rotation(key: &str, degrees: i32) -> Result<Rotation, ConfigError> {
    Rotation::from_degrees(degrees).map_err(|_| ConfigError::InvalidValue(key.to_owned()))
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed configuration file: {0}")]
    Parse(#[from] toml::de::Error),
}
