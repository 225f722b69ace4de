//! Background OCR worker.
//!
//! Single long-running loop: dequeue, process, repeat until the shutdown
//! signal fires. Each job executes inside an isolated failure boundary:
//! errors and panics are logged with the document id and the loop moves on,
//! so one bad job never stops the worker. Jobs still queued at shutdown are
//! dropped.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::QueueError;
use crate::service::processor::ProcessJob;
use crate::service::queue::OcrJobQueue;

/// Start the OCR worker. This should be called once on server startup.
pub fn start_ocr_worker(
    queue: Arc<OcrJobQueue>,
    processor: Arc<dyn ProcessJob>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("OCR worker started");

        loop {
            let job = match queue.dequeue(&shutdown).await {
                Ok(job) => job,
                Err(QueueError::Cancelled) => break,
                Err(QueueError::Closed) => {
                    warn!("OCR job queue closed, worker stopping");
                    break;
                }
            };

            debug!(doc_id = %job.document_id, blob = %job.blob_name, "Processing OCR job");

            let outcome = AssertUnwindSafe(processor.process(&job, &shutdown))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(doc_id = %job.document_id, error = %e, "OCR job failed");
                }
                Err(_) => {
                    error!(doc_id = %job.document_id, "OCR job panicked");
                }
            }
        }

        info!("OCR worker stopped");
    })
}
