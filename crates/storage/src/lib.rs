//! File-backed key-value store for annotation data.
//!
//! Each key maps to one file under the store root. Keys are split on `/`
//! into path segments (`report.pdf/annotations` becomes
//! `report.pdf/annotations.json`); every segment is percent-escaped so no key
//! can reach outside the root. Writes go to a temporary file that is renamed
//! over the target.

use annotator_core::config::AnnotatorConfig;
use annotator_core::persistence::{KeyValueStore, PersistenceError, PersistenceResult};
use directories::ProjectDirs;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "PdfAnnotator", "pdf-annotator").ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().to_path_buf() })
    }

    /// Uses the configured data directory, or the platform default when none is set.
    pub fn from_config(config: &AnnotatorConfig) -> Result<Self, StorageError> {
        match &config.data_dir {
            Some(dir) => Ok(Self::with_root(dir)),
            None => Self::from_default_project(),
        }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PersistenceResult<PathBuf> {
        if key.is_empty() || key.split('/').any(str::is_empty) {
            return Err(PersistenceError::InvalidKey(key.to_owned()));
        }

        let mut path = self.root.clone();
        let segments: Vec<&str> = key.split('/').collect();
        let (file, dirs) = segments.split_last().ok_or_else(|| PersistenceError::InvalidKey(key.to_owned()))?;
        for dir in dirs {
            path.push(escape_segment(dir));
        }
        path.push(format!("{}.json", escape_segment(file)));
        Ok(path)
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn save(&self, key: &str, bytes: &[u8]) -> PersistenceResult<()> {
        let path = self.path_for(key)?;
        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent)?;

        let temp_path = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &path)?;

        debug!(key, path = %path.display(), bytes = bytes.len(), "saved");
        Ok(())
    }

    fn remove(&self, key: &str) -> PersistenceResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "removed");
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

/// Percent-escapes everything except ASCII alphanumerics, `-`, `_` and
/// interior dots, so `.` and `..` can never name a directory.
fn escape_segment(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for (index, byte) in segment.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' || (byte == b'.' && index > 0);
        if keep {
            escaped.push(char::from(byte));
        } else {
            escaped.push_str(&format!("%{byte:02X}"));
        }
    }
    escaped
}
