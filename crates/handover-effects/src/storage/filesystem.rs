//! Filesystem storage handler
//!
//! Stores one UTF-8 file per key under a base directory. Writes go to a
//! temporary sibling first and are renamed into place, so a crash never leaves
//! a half-written build hash behind.

use async_trait::async_trait;
use handover_core::effects::StorageEffects;
use handover_core::{HandoverError, HandoverResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Filesystem-backed durable storage
#[derive(Debug, Clone)]
pub struct FilesystemStorageHandler {
    base_path: PathBuf,
}

impl FilesystemStorageHandler {
    /// Create a handler rooted at `base_path`, creating the directory if needed
    pub fn new(base_path: impl Into<PathBuf>) -> HandoverResult<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path).map_err(|e| {
            HandoverError::storage(format!(
                "Failed to create storage directory {}: {e}",
                base_path.display()
            ))
        })?;
        debug!(path = %base_path.display(), "Initialized filesystem storage");
        Ok(Self { base_path })
    }

    /// Directory holding the stored keys
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> HandoverResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(HandoverError::invalid(format!("Invalid storage key: {key:?}")));
        }
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl StorageEffects for FilesystemStorageHandler {
    async fn retrieve(&self, key: &str) -> HandoverResult<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HandoverError::storage(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn store(&self, key: &str, value: String) -> HandoverResult<()> {
        let path = self.key_path(key)?;
        let tmp_path = self.base_path.join(format!(".{key}.tmp"));
        fs::write(&tmp_path, value.as_bytes()).await.map_err(|e| {
            HandoverError::storage(format!("Failed to write {}: {e}", tmp_path.display()))
        })?;
        fs::rename(&tmp_path, &path).await.map_err(|e| {
            HandoverError::storage(format!("Failed to replace {}: {e}", path.display()))
        })?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> HandoverResult<bool> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(HandoverError::storage(format!(
                "Failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}
