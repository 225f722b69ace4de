//! Object storage collaborator boundary.
//!
//! The pipeline treats storage as a byte-addressable object store keyed by
//! container and object name, with a string-to-string metadata map per
//! object. Metadata keys are case-insensitive and stored lowercased. The
//! default implementation is filesystem-backed under the configured data
//! directory; tests substitute an in-memory store.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageError;

/// Object metadata map. Keys are lowercased on write.
pub type Metadata = HashMap<String, String>;

/// Lowercase all keys so lookups behave case-insensitively.
pub fn normalize_metadata(metadata: &Metadata) -> Metadata {
    metadata
        .iter()
        .map(|(key, value)| (key.to_lowercase(), value.clone()))
        .collect()
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create the container if it does not already exist.
    async fn ensure_container(&self, container: &str) -> Result<(), StorageError>;

    /// Store an object, overwriting any existing object of the same name.
    async fn put(
        &self,
        container: &str,
        name: &str,
        content: Bytes,
        metadata: &Metadata,
    ) -> Result<(), StorageError>;

    /// Read an object's bytes.
    async fn read(&self, container: &str, name: &str) -> Result<Bytes, StorageError>;

    /// Read an object's metadata map.
    async fn metadata(&self, container: &str, name: &str) -> Result<Metadata, StorageError>;

    /// Replace an object's metadata map.
    async fn set_metadata(
        &self,
        container: &str,
        name: &str,
        metadata: Metadata,
    ) -> Result<(), StorageError>;
}

/// Suffix of the sidecar file holding an object's metadata.
const METADATA_SUFFIX: &str = ".meta.json";

/// Filesystem-backed object store: containers are directories under the
/// root, objects are files, metadata lives in a `<name>.meta.json` sidecar.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Object and container names must stay inside the store root. Names
    /// that look like metadata sidecars are rejected so an object can never
    /// shadow another object's metadata.
    fn validate_name(name: &str) -> Result<(), StorageError> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
            || name.ends_with(METADATA_SUFFIX);
        if invalid {
            return Err(StorageError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn object_path(&self, container: &str, name: &str) -> Result<PathBuf, StorageError> {
        Self::validate_name(container)?;
        Self::validate_name(name)?;
        Ok(self.root.join(container).join(name))
    }

    fn sidecar_path(&self, container: &str, name: &str) -> Result<PathBuf, StorageError> {
        let mut path = self.object_path(container, name)?;
        path.set_file_name(format!("{name}{METADATA_SUFFIX}"));
        Ok(path)
    }

    fn not_found(container: &str, name: &str) -> StorageError {
        StorageError::NotFound {
            container: container.to_string(),
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn ensure_container(&self, container: &str) -> Result<(), StorageError> {
        Self::validate_name(container)?;
        tokio::fs::create_dir_all(self.root.join(container))
            .await
            .map_err(StorageError::Io)
    }

    async fn put(
        &self,
        container: &str,
        name: &str,
        content: Bytes,
        metadata: &Metadata,
    ) -> Result<(), StorageError> {
        let path = self.object_path(container, name)?;
        tokio::fs::create_dir_all(self.root.join(container))
            .await
            .map_err(StorageError::Io)?;
        tokio::fs::write(&path, &content)
            .await
            .map_err(StorageError::Io)?;

        let sidecar = self.sidecar_path(container, name)?;
        let encoded = serde_json::to_vec_pretty(&normalize_metadata(metadata))
            .map_err(StorageError::Serialization)?;
        tokio::fs::write(&sidecar, encoded)
            .await
            .map_err(StorageError::Io)
    }

    async fn read(&self, container: &str, name: &str) -> Result<Bytes, StorageError> {
        let path = self.object_path(container, name)?;
        match tokio::fs::read(&path).await {
            Ok(content) => Ok(Bytes::from(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Self::not_found(container, name))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn metadata(&self, container: &str, name: &str) -> Result<Metadata, StorageError> {
        let path = self.object_path(container, name)?;
        if !tokio::fs::try_exists(&path).await.map_err(StorageError::Io)? {
            return Err(Self::not_found(container, name));
        }

        let sidecar = self.sidecar_path(container, name)?;
        match tokio::fs::read(&sidecar).await {
            Ok(encoded) => {
                serde_json::from_slice(&encoded).map_err(StorageError::Serialization)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Metadata::new()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn set_metadata(
        &self,
        container: &str,
        name: &str,
        metadata: Metadata,
    ) -> Result<(), StorageError> {
        let path = self.object_path(container, name)?;
        if !tokio::fs::try_exists(&path).await.map_err(StorageError::Io)? {
            return Err(Self::not_found(container, name));
        }

        let sidecar = self.sidecar_path(container, name)?;
        let encoded = serde_json::to_vec_pretty(&normalize_metadata(&metadata))
            .map_err(StorageError::Serialization)?;
        tokio::fs::write(&sidecar, encoded)
            .await
            .map_err(StorageError::Io)
    }
}
