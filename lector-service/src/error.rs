use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Document not found: {document_id}")]
    DocumentNotFound { document_id: String },

    #[error("{0}")]
    Ocr(#[from] OcrError),

    #[error("Storage error")]
    Storage(#[from] StorageError),

    #[error("Job queue error")]
    Queue(#[from] QueueError),

    #[error("Unsupported file extension: {extension}")]
    UnsupportedExtension { extension: String },

    #[error("Unsupported content type: {content_type}")]
    UnsupportedContentType { content_type: String },

    #[error("File too large: {size} bytes (max {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// OCR backend errors.
///
/// Submit/handle/response problems are protocol errors and are not retried
/// within a single extraction. `Failed` carries the backend's own failure
/// payload; `Timeout` means the operation never reached a terminal status
/// within the configured attempt budget. Callers can tell the two apart.
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR submit rejected (status {status}): {body}")]
    SubmitRejected { status: u16, body: String },

    #[error("Missing operation handle in OCR submit response")]
    MissingOperationHandle,

    #[error("Connection failed to OCR backend at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("OCR status poll failed (status {status})")]
    PollRejected { status: u16 },

    #[error("Invalid response from OCR backend")]
    InvalidResponse {
        #[source]
        source: serde_json::Error,
    },

    #[error("OCR operation failed. Payload: {payload}")]
    Failed { payload: String },

    #[error("OCR operation timed out after {attempts} poll attempts")]
    Timeout { attempts: u32 },

    #[error("OCR extraction cancelled")]
    Cancelled,
}

/// Object store errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {container}/{name}")]
    NotFound { container: String, name: String },

    #[error("Invalid object name: {name}")]
    InvalidName { name: String },

    #[error("Storage IO failed")]
    Io(#[source] std::io::Error),

    #[error("Metadata serialization failed")]
    Serialization(#[source] serde_json::Error),
}

/// Job queue errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueueError {
    #[error("Job queue is closed")]
    Closed,

    #[error("Dequeue cancelled by shutdown signal")]
    Cancelled,
}

/// API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::DocumentNotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ServiceError::UnsupportedExtension { .. }
            | ServiceError::UnsupportedContentType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ServiceError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::DocumentNotFound { .. } => "document_not_found",
            ServiceError::Ocr(OcrError::SubmitRejected { .. }) => "ocr_submit_rejected",
            ServiceError::Ocr(OcrError::Failed { .. }) => "ocr_failed",
            ServiceError::Ocr(OcrError::Timeout { .. }) => "ocr_timeout",
            ServiceError::Ocr(_) => "ocr_error",
            ServiceError::Storage(_) => "storage_error",
            ServiceError::Queue(_) => "queue_error",
            ServiceError::UnsupportedExtension { .. } => "unsupported_extension",
            ServiceError::UnsupportedContentType { .. } => "unsupported_content_type",
            ServiceError::FileTooLarge { .. } => "file_too_large",
            ServiceError::InvalidRequest { .. } => "invalid_request",
            ServiceError::Config { .. } => "config_error",
            ServiceError::Internal { .. } => "internal_error",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();

        let response = ErrorResponse {
            message: self.to_string(),
            code: Some(code),
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
