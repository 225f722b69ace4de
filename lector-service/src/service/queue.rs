//! In-process OCR job queue.
//!
//! Unbounded multi-producer/single-consumer queue decoupling upload
//! requests from background processing. Jobs live only in memory: anything
//! still queued when the process stops is lost, a deliberate simplicity
//! tradeoff over a durable log.

use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::error::QueueError;

/// One pending OCR job. Created once at upload time, never mutated, and
/// consumed exactly once by a worker.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrJob {
    pub document_id: String,
    pub blob_name: String,
    pub original_file_name: String,
    pub content_type: String,
    pub source: Option<String>,
    pub language: Option<String>,
}

/// FIFO job queue across all producers combined.
pub struct OcrJobQueue {
    sender: UnboundedSender<OcrJob>,
    receiver: Mutex<UnboundedReceiver<OcrJob>>,
}

impl OcrJobQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    /// Enqueue a job. Never blocks; fails only once the queue is closed.
    pub fn enqueue(&self, job: OcrJob) -> Result<(), QueueError> {
        self.sender.send(job).map_err(|_| QueueError::Closed)
    }

    /// Wait for the next job. Single logical consumer: the receiver lock is
    /// held only for the duration of one dequeue, so a job is delivered to
    /// exactly one caller.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Result<OcrJob, QueueError> {
        let mut receiver = self.receiver.lock().await;
        tokio::select! {
            _ = cancel.cancelled() => Err(QueueError::Cancelled),
            job = receiver.recv() => job.ok_or(QueueError::Closed),
        }
    }
}

impl Default for OcrJobQueue {
    fn default() -> Self {
        Self::new()
    }
}
