//! Document metadata and on-disk file storage.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use docgate_core::{DocumentId, Entity};

/// Metadata of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
    pub extension: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Document {
    type Id = DocumentId;

    fn id(&self) -> DocumentId {
        self.id
    }
}

/// Extension of an uploaded file name, lowercased and restricted to
/// `[a-z0-9]` so it is always safe to use in a path.
pub fn extension_of(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Error)]
pub enum FileStorageError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Stores file bodies as `<root>/<id>[.<ext>]`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: DocumentId, extension: &str) -> PathBuf {
        if extension.is_empty() {
            self.root.join(id.to_string())
        } else {
            self.root.join(format!("{id}.{extension}"))
        }
    }

    /// Write a file body, creating the root directory on first use. Returns
    /// the stored size in bytes.
    pub async fn write(
        &self,
        id: DocumentId,
        extension: &str,
        bytes: &[u8],
    ) -> Result<u64, FileStorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| FileStorageError::Io {
                path: self.root.clone(),
                source,
            })?;

        let path = self.path_for(id, extension);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| FileStorageError::Io {
                path: path.clone(),
                source,
            })?;

        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|source| FileStorageError::Io { path, source })?;
        Ok(meta.len())
    }

    /// Delete a stored body. Missing files are not an error.
    pub async fn remove(&self, id: DocumentId, extension: &str) -> Result<(), FileStorageError> {
        let path = self.path_for(id, extension);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(FileStorageError::Io { path, source }),
        }
    }
}
