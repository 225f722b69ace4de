//! Core service state and the OCR processing pipeline modules.

use std::sync::Arc;

use crate::config::StaticConfig;
use crate::error::ServiceResult;
use crate::ocr::{OcrExtractor, ReadOcrClient};
use crate::results::{BlobOcrResultStore, OcrResultStore};
use crate::service::processor::{OcrJobProcessor, ProcessJob};
use crate::service::queue::OcrJobQueue;
use crate::storage::{FsObjectStore, ObjectStore};

pub mod processor;
pub mod queue;
pub mod upload;
pub mod worker;

/// Shared service state: configuration plus the storage, result-store, and
/// queue collaborators. Handlers and the background worker both hang off
/// this.
pub struct LectorService {
    pub config: StaticConfig,
    pub store: Arc<dyn ObjectStore>,
    pub results: Arc<dyn OcrResultStore>,
    pub queue: Arc<OcrJobQueue>,
}

impl LectorService {
    /// Wire up the production collaborators: filesystem-backed object store
    /// under the configured data directory, blob-backed result store, and a
    /// fresh in-memory job queue.
    pub fn new(config: StaticConfig) -> Self {
        let store: Arc<dyn ObjectStore> =
            Arc::new(FsObjectStore::new(config.storage.data_dir.clone()));
        let results: Arc<dyn OcrResultStore> = Arc::new(BlobOcrResultStore::new(
            store.clone(),
            config.storage.results_container.clone(),
        ));

        Self {
            config,
            store,
            results,
            queue: Arc::new(OcrJobQueue::new()),
        }
    }

    /// Build the job processor for the background worker. Fails fast when
    /// the OCR backend configuration is incomplete.
    pub fn ocr_processor(&self) -> ServiceResult<Arc<dyn ProcessJob>> {
        let backend = Arc::new(ReadOcrClient::new(&self.config.ocr)?);
        let extractor = OcrExtractor::new(backend, &self.config.ocr);

        Ok(Arc::new(OcrJobProcessor::new(
            self.store.clone(),
            extractor,
            self.results.clone(),
            self.config.storage.documents_container.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use tokio_util::sync::CancellationToken;

    use crate::config::OcrConfig;
    use crate::error::{OcrError, ServiceError};
    use crate::ocr::{
        AnalyzeResult, OcrBackend, OperationHandle, OperationStatus, ReadLine, ReadOperation,
        ReadResult,
    };
    use crate::service::processor::{STATUS_DONE, STATUS_KEY};
    use crate::service::worker::start_ocr_worker;
    use crate::storage::memory::MemoryObjectStore;

    /// Backend stub answering every submission with one page of fixed text.
    struct FixedTextBackend {
        text: String,
    }

    #[async_trait]
    impl OcrBackend for FixedTextBackend {
        async fn submit(
            &self,
            _content: Bytes,
            _content_type: &str,
        ) -> Result<OperationHandle, OcrError> {
            Ok(OperationHandle::new("op-1"))
        }

        async fn fetch(&self, _handle: &OperationHandle) -> Result<ReadOperation, OcrError> {
            Ok(ReadOperation {
                status: OperationStatus::Succeeded,
                analyze_result: Some(AnalyzeResult {
                    read_results: vec![ReadResult {
                        lines: vec![ReadLine {
                            text: Some(self.text.clone()),
                        }],
                    }],
                }),
                payload: String::new(),
            })
        }
    }

    fn test_service() -> LectorService {
        let config: StaticConfig = serde_json::from_str("{}").unwrap();
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let results: Arc<dyn OcrResultStore> = Arc::new(BlobOcrResultStore::new(
            store.clone(),
            config.storage.results_container.clone(),
        ));
        LectorService {
            config,
            store,
            results,
            queue: Arc::new(OcrJobQueue::new()),
        }
    }

    #[tokio::test]
    async fn test_upload_through_worker_to_stored_result() {
        let service = Arc::new(test_service());
        let shutdown = CancellationToken::new();

        let extractor = OcrExtractor::new(
            Arc::new(FixedTextBackend {
                text: "مرحبا  بالعالم".to_string(),
            }),
            &OcrConfig {
                poll_interval_ms: 1,
                ..OcrConfig::default()
            },
        );
        let processor: Arc<dyn ProcessJob> = Arc::new(OcrJobProcessor::new(
            service.store.clone(),
            extractor,
            service.results.clone(),
            service.config.storage.documents_container.clone(),
        ));
        let worker = start_ocr_worker(service.queue.clone(), processor, shutdown.clone());

        let receipt = service
            .upload_document(
                Bytes::from_static(b"pixels"),
                "scan.png",
                "image/png",
                None,
                Some("ar".to_string()),
            )
            .await
            .unwrap();

        // Wait for the worker to finish the job
        let stored = {
            let mut stored = None;
            for _ in 0..200 {
                if let Some(result) = service.results.load(&receipt.document_id).await.unwrap() {
                    stored = Some(result);
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            stored.expect("worker never persisted a result")
        };

        assert_eq!(stored.text_original, "مرحبا  بالعالم");
        assert_eq!(stored.text_normalized, "مرحبا بالعالم");
        assert_eq!(stored.language.as_deref(), Some("ar"));

        // Status on the source blob reached ocr-done; loading waits out the
        // final metadata write
        for _ in 0..200 {
            let metadata = service
                .store
                .metadata(
                    &service.config.storage.documents_container,
                    &receipt.blob_name,
                )
                .await
                .unwrap();
            if metadata.get(STATUS_KEY).map(String::as_str) == Some(STATUS_DONE) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let metadata = service
            .store
            .metadata(
                &service.config.storage.documents_container,
                &receipt.blob_name,
            )
            .await
            .unwrap();
        assert_eq!(metadata.get(STATUS_KEY).map(String::as_str), Some(STATUS_DONE));

        shutdown.cancel();
        worker.await.unwrap();
    }

    #[test]
    fn test_ocr_processor_requires_backend_config() {
        let service = test_service();
        let err = service.ocr_processor().err().unwrap();
        assert!(matches!(err, ServiceError::Config { .. }));
    }
}
