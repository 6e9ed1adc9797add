//! Local filesystem blob storage.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::storage::{BlobStore, StorageError};

/// Stores blobs as files under a media root, served under a base URL.
///
/// Storage paths map directly to directories below the root; URLs are
/// `{base_url}/{path}` with no signing.
pub struct FilesystemStore {
    root: PathBuf,
    base_url: String,
}

impl FilesystemStore {
    /// Create the store, creating the media root if needed.
    pub async fn new(
        root: impl AsRef<Path>,
        base_url: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Resolve a storage path to a file path, rejecting anything that could
    /// escape the media root.
    fn object_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        if path.is_empty() || path.contains("..") || path.starts_with('/') || path.contains('\\') {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        for component in Path::new(path).components() {
            match component {
                Component::Normal(_) => {}
                _ => return Err(StorageError::InvalidPath(path.to_string())),
            }
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl BlobStore for FilesystemStore {
    async fn put(&self, path: &str, data: Bytes, _content_type: &str) -> Result<(), StorageError> {
        let target = self.object_path(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a uniquely named temp file, fsync, then rename so readers
        // never observe a half-written object.
        let temp = target.with_file_name(format!(
            "{}.tmp.{}",
            target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Uuid::new_v4().simple()
        ));
        let write_result = async {
            let mut file = fs::File::create(&temp).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp, &target).await
        }
        .await;

        if let Err(e) = write_result {
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::Io(e));
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let target = self.object_path(path)?;
        fs::try_exists(&target).await.map_err(StorageError::Io)
    }

    async fn url(&self, path: &str) -> Result<String, StorageError> {
        self.object_path(path)?;
        Ok(format!("{}/{path}", self.base_url))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.object_path(path)?;
        fs::remove_file(&target).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(path.to_string())
            } else {
                StorageError::Io(e)
            }
        })
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
