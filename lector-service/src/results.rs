//! Persistence of finished OCR results.
//!
//! One JSON document per processed upload, keyed by document id. Writes are
//! idempotent overwrites, so re-processing a document is always safe.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage::{Metadata, ObjectStore};

/// Finished OCR result for one document.
///
/// `text_normalized` is always derived deterministically from
/// `text_original` and `language`; the pair is written as one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrStoredResult {
    pub document_id: String,
    pub blob_name: String,
    pub original_file_name: String,
    pub content_type: String,
    pub language: Option<String>,
    pub text_original: String,
    pub text_normalized: String,
    pub created_at_utc: DateTime<Utc>,
}

#[async_trait]
pub trait OcrResultStore: Send + Sync {
    /// Persist a result, overwriting any prior result for the same document.
    async fn save(&self, result: &OcrStoredResult) -> Result<(), StorageError>;

    /// Load a result by document id, `None` if the document has not finished
    /// processing.
    async fn load(&self, document_id: &str) -> Result<Option<OcrStoredResult>, StorageError>;
}

/// Result store writing pretty-printed JSON into an object-store container.
pub struct BlobOcrResultStore {
    store: Arc<dyn ObjectStore>,
    container: String,
}

impl BlobOcrResultStore {
    pub fn new(store: Arc<dyn ObjectStore>, container: String) -> Self {
        Self { store, container }
    }

    fn blob_name(document_id: &str) -> String {
        format!("{document_id}.json")
    }
}

#[async_trait]
impl OcrResultStore for BlobOcrResultStore {
    async fn save(&self, result: &OcrStoredResult) -> Result<(), StorageError> {
        self.store.ensure_container(&self.container).await?;

        let encoded =
            serde_json::to_vec_pretty(result).map_err(StorageError::Serialization)?;

        self.store
            .put(
                &self.container,
                &Self::blob_name(&result.document_id),
                Bytes::from(encoded),
                &Metadata::new(),
            )
            .await
    }

    async fn load(&self, document_id: &str) -> Result<Option<OcrStoredResult>, StorageError> {
        let content = match self
            .store
            .read(&self.container, &Self::blob_name(document_id))
            .await
        {
            Ok(content) => content,
            Err(StorageError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        serde_json::from_slice(&content)
            .map(Some)
            .map_err(StorageError::Serialization)
    }
}
