//! Per-job OCR processing.
//!
//! A job runs through a fixed sequence: mark the source blob as running,
//! read its bytes, extract text through the OCR backend, normalize for
//! search, persist the result, mark done. Every step is a hard sequence
//! point; a failure anywhere leaves the blob's status at `ocr-running` so
//! an incomplete job stays observable from the outside.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{ServiceResult, StorageError};
use crate::normalize;
use crate::ocr::OcrExtractor;
use crate::results::{OcrResultStore, OcrStoredResult};
use crate::service::queue::OcrJob;
use crate::storage::ObjectStore;

/// Metadata key holding the job lifecycle status.
pub const STATUS_KEY: &str = "processingstatus";
/// Metadata key holding the last status-change timestamp.
pub const UPDATED_AT_KEY: &str = "processingupdatedat";

/// Status value while a job is being processed.
pub const STATUS_RUNNING: &str = "ocr-running";
/// Status value once the result has been persisted.
pub const STATUS_DONE: &str = "ocr-done";

/// Processes one dequeued job to completion.
#[async_trait]
pub trait ProcessJob: Send + Sync {
    async fn process(&self, job: &OcrJob, cancel: &CancellationToken) -> ServiceResult<()>;
}

pub struct OcrJobProcessor {
    store: Arc<dyn ObjectStore>,
    extractor: OcrExtractor,
    results: Arc<dyn OcrResultStore>,
    documents_container: String,
}

impl OcrJobProcessor {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        extractor: OcrExtractor,
        results: Arc<dyn OcrResultStore>,
        documents_container: String,
    ) -> Self {
        Self {
            store,
            extractor,
            results,
            documents_container,
        }
    }

    /// Read-modify-write of the blob's metadata: pre-existing keys are
    /// preserved, only the status pair changes.
    async fn mark_status(&self, job: &OcrJob, status: &str) -> Result<(), StorageError> {
        let mut metadata = self
            .store
            .metadata(&self.documents_container, &job.blob_name)
            .await?;
        metadata.insert(STATUS_KEY.to_string(), status.to_string());
        metadata.insert(UPDATED_AT_KEY.to_string(), Utc::now().to_rfc3339());
        self.store
            .set_metadata(&self.documents_container, &job.blob_name, metadata)
            .await
    }
}

#[async_trait]
impl ProcessJob for OcrJobProcessor {
    async fn process(&self, job: &OcrJob, cancel: &CancellationToken) -> ServiceResult<()> {
        self.mark_status(job, STATUS_RUNNING).await?;

        let content = self
            .store
            .read(&self.documents_container, &job.blob_name)
            .await?;

        let text_original = self
            .extractor
            .extract_text(content, &job.content_type, cancel)
            .await?;

        let text_normalized =
            normalize::normalize_for_search(&text_original, job.language.as_deref());

        let stored = OcrStoredResult {
            document_id: job.document_id.clone(),
            blob_name: job.blob_name.clone(),
            original_file_name: job.original_file_name.clone(),
            content_type: job.content_type.clone(),
            language: job.language.clone(),
            text_original,
            text_normalized,
            created_at_utc: Utc::now(),
        };
        self.results.save(&stored).await?;

        self.mark_status(job, STATUS_DONE).await?;

        info!(doc_id = %job.document_id, "OCR job completed");
        Ok(())
    }
}
