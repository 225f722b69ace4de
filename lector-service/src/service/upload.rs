//! Document upload and job submission.
//!
//! Uploads are validated, written to the documents container with their
//! provenance metadata, and queued for OCR. The caller gets a receipt as
//! soon as the job is enqueued; completion is observable out-of-band via
//! the blob's status metadata and the result endpoint.

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::service::LectorService;
use crate::service::queue::OcrJob;
use crate::storage::Metadata;

/// File extensions accepted for upload (lowercase, without the dot).
const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png", "txt"];

/// Content types accepted for upload.
const ALLOWED_CONTENT_TYPES: &[&str] =
    &["application/pdf", "image/jpeg", "image/png", "text/plain"];

/// Receipt returned to the uploader once the job is queued.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub document_id: String,
    pub blob_name: String,
    pub original_name: String,
    pub size: u64,
}

impl LectorService {
    /// Validate and store an uploaded document, then enqueue it for OCR.
    pub async fn upload_document(
        &self,
        content: Bytes,
        file_name: &str,
        content_type: &str,
        source: Option<String>,
        language: Option<String>,
    ) -> ServiceResult<UploadReceipt> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ServiceError::UnsupportedExtension { extension });
        }

        if !ALLOWED_CONTENT_TYPES
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(content_type))
        {
            return Err(ServiceError::UnsupportedContentType {
                content_type: content_type.to_string(),
            });
        }

        let size = content.len() as u64;
        let max = self.config.limits.max_document_size_bytes;
        if size > max {
            return Err(ServiceError::FileTooLarge { size, max });
        }

        let document_id = Uuid::new_v4().to_string();
        let blob_name = format!("{document_id}.{extension}");

        let mut metadata = Metadata::new();
        metadata.insert("originalname".to_string(), file_name.to_string());
        metadata.insert("contenttype".to_string(), content_type.to_string());
        metadata.insert("uploadedat".to_string(), Utc::now().to_rfc3339());
        metadata.insert(
            "source".to_string(),
            source.clone().unwrap_or_else(|| "unknown".to_string()),
        );
        metadata.insert(
            "language".to_string(),
            language.clone().unwrap_or_else(|| "unknown".to_string()),
        );

        let container = &self.config.storage.documents_container;
        self.store.ensure_container(container).await?;
        self.store
            .put(container, &blob_name, content, &metadata)
            .await?;

        self.queue.enqueue(OcrJob {
            document_id: document_id.clone(),
            blob_name: blob_name.clone(),
            original_file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            source,
            language,
        })?;

        info!(
            doc_id = %document_id,
            blob = %blob_name,
            file = %file_name,
            "Document uploaded and queued for OCR"
        );

        Ok(UploadReceipt {
            document_id,
            blob_name,
            original_name: file_name.to_string(),
            size,
        })
    }
}
