//! JSON documents on disk: tolerant loads, atomic pretty-printed saves

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// The two logical documents the agent persists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Transcript,
    Memory,
}

impl StorageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Transcript => "transcript",
            StorageKey::Memory => "memory",
        }
    }
}

/// Maps each [`StorageKey`] to a fixed file location
#[derive(Debug, Clone)]
pub struct JsonStore {
    transcript_path: PathBuf,
    memory_path: PathBuf,
}

impl JsonStore {
    pub fn new(transcript_path: impl Into<PathBuf>, memory_path: impl Into<PathBuf>) -> Self {
        Self {
            transcript_path: transcript_path.into(),
            memory_path: memory_path.into(),
        }
    }

    pub fn path(&self, key: StorageKey) -> &Path {
        match key {
            StorageKey::Transcript => &self.transcript_path,
            StorageKey::Memory => &self.memory_path,
        }
    }

    /// Load a document, falling back to `default` when the file is missing or unusable
    pub fn load<T: DeserializeOwned>(&self, key: StorageKey, default: T) -> T {
        let path = self.path(key);
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(document = key.as_str(), path = %path.display(), "no saved document");
                return default;
            }
            Err(err) => {
                warn!(
                    document = key.as_str(),
                    path = %path.display(),
                    "Failed to read saved document, using default: {err}"
                );
                return default;
            }
        };

        if raw.trim().is_empty() {
            return default;
        }

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    document = key.as_str(),
                    path = %path.display(),
                    "Saved document is corrupt, using default: {err}"
                );
                default
            }
        }
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: StorageKey, value: &T) -> Result<()> {
        write_json_atomic(self.path(key), value)
            .with_context(|| format!("Failed to save {}", key.as_str()))
    }
}

/// Pretty-print `value` to a temp file beside `path`, then rename it into place
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory {}", parent.display()))?;

    let json = serde_json::to_string_pretty(value).context("Failed to serialize document")?;

    let mut temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    temp.write_all(json.as_bytes())
        .and_then(|()| temp.write_all(b"\n"))
        .and_then(|()| temp.as_file().sync_all())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    temp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
