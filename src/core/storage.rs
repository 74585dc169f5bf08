//! Named blob persistence.
//!
//! The core never touches the filesystem directly: memory and the speech
//! flag are stored as independent named blobs behind [`BlobStore`].

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use tempfile::NamedTempFile;
use tracing::warn;

use crate::core::error::StorageError;

pub const MEMORY_BLOB: &str = "memory";
pub const SPEECH_ENABLED_BLOB: &str = "speech-enabled";

pub trait BlobStore: Send + Sync {
    /// Returns `Ok(None)` when the blob has never been written.
    fn read(&self, name: &str) -> Result<Option<String>, StorageError>;
    fn write(&self, name: &str, contents: &str) -> Result<(), StorageError>;
}

/// Stores each blob as `<dir>/<name>.json`, replacing files atomically.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl BlobStore for FileBlobStore {
    fn read(&self, name: &str) -> Result<Option<String>, StorageError> {
        let path = self.blob_path(name);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read { path, source }),
        }
    }

    fn write(&self, name: &str, contents: &str) -> Result<(), StorageError> {
        let path = self.blob_path(name);
        let write_err = |source| StorageError::Write {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(write_err)?;
        let mut temp_file = NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        temp_file.write_all(contents.as_bytes()).map_err(write_err)?;
        temp_file.as_file_mut().sync_all().map_err(write_err)?;
        temp_file
            .persist(&path)
            .map_err(|err| write_err(err.error))?;
        Ok(())
    }
}

/// Process-local store used by tests and `--ephemeral` runs.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(name: &str, contents: &str) -> Self {
        let store = Self::new();
        store
            .blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), contents.to_string());
        store
    }
}

impl BlobStore for InMemoryBlobStore {
    fn read(&self, name: &str) -> Result<Option<String>, StorageError> {
        let blobs = self.blobs.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(blobs.get(name).cloned())
    }

    fn write(&self, name: &str, contents: &str) -> Result<(), StorageError> {
        let mut blobs = self.blobs.lock().unwrap_or_else(PoisonError::into_inner);
        blobs.insert(name.to_string(), contents.to_string());
        Ok(())
    }
}

/// Persisted "speak replies aloud" flag. Absent or corrupt means off.
pub struct SpeechPreference;

impl SpeechPreference {
    pub fn load(store: &dyn BlobStore) -> bool {
        let raw = match store.read(SPEECH_ENABLED_BLOB) {
            Ok(Some(raw)) => raw,
            Ok(None) => return false,
            Err(err) => {
                warn!(error = %err, "speech flag unreadable, defaulting to off");
                return false;
            }
        };

        match serde_json::from_str::<bool>(raw.trim()) {
            Ok(enabled) => enabled,
            Err(source) => {
                let err = StorageError::Parse {
                    name: SPEECH_ENABLED_BLOB.to_string(),
                    source,
                };
                warn!(error = %err, "speech flag corrupt, defaulting to off");
                false
            }
        }
    }

    pub fn save(store: &dyn BlobStore, enabled: bool) {
        let contents = if enabled { "true" } else { "false" };
        if let Err(err) = store.write(SPEECH_ENABLED_BLOB, contents) {
            warn!(error = %err, "failed to persist speech flag");
        }
    }
}
