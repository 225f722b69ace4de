//! OCR backend client and extraction driver.
//!
//! The backend speaks a submit-then-poll protocol: a document upload is
//! acknowledged with `202 Accepted` plus an operation handle, and the
//! operation is polled until it reaches a terminal status. `ReadOcrClient`
//! is the HTTP implementation; `OcrExtractor` drives any `OcrBackend` to
//! completion and assembles the recognized lines into a single text blob.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::OcrConfig;
use crate::error::{OcrError, ServiceError, ServiceResult};

/// Opaque reference to a submitted, in-progress extraction operation.
#[derive(Debug, Clone)]
pub struct OperationHandle(String);

impl OperationHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Status reported by the backend for a read operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Other(String),
}

impl OperationStatus {
    /// Status comparison is case-insensitive; anything unrecognized keeps
    /// the poll loop going.
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "notstarted" => Self::NotStarted,
            "running" => Self::Running,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            _ => Self::Other(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    #[serde(default)]
    pub read_results: Vec<ReadResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadResult {
    #[serde(default)]
    pub lines: Vec<ReadLine>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadLine {
    pub text: Option<String>,
}

/// One poll response from the backend. The raw body is kept so an explicit
/// failure can surface the backend's own diagnostics.
#[derive(Debug, Clone)]
pub struct ReadOperation {
    pub status: OperationStatus,
    pub analyze_result: Option<AnalyzeResult>,
    pub payload: String,
}

/// Minimal submit/poll contract with the OCR backend.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Submit document bytes for recognition, returning the operation
    /// handle to poll.
    async fn submit(
        &self,
        content: Bytes,
        content_type: &str,
    ) -> Result<OperationHandle, OcrError>;

    /// Fetch the current state of a submitted operation.
    async fn fetch(&self, handle: &OperationHandle) -> Result<ReadOperation, OcrError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadOperationBody {
    status: String,
    analyze_result: Option<AnalyzeResult>,
}

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// HTTP client for a Read-style OCR backend.
pub struct ReadOcrClient {
    client: Client,
    endpoint: String,
    key: String,
}

impl ReadOcrClient {
    pub fn new(config: &OcrConfig) -> ServiceResult<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(ServiceError::Config {
                message: "Missing ocr.endpoint".to_string(),
            });
        }
        if config.key.trim().is_empty() {
            return Err(ServiceError::Config {
                message: "Missing ocr.key".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                ServiceError::Ocr(OcrError::Connection {
                    url: config.endpoint.clone(),
                    source: e,
                })
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            key: config.key.clone(),
        })
    }
}

#[async_trait]
impl OcrBackend for ReadOcrClient {
    async fn submit(
        &self,
        content: Bytes,
        content_type: &str,
    ) -> Result<OperationHandle, OcrError> {
        let url = format!("{}/vision/v3.1/read/analyze", self.endpoint);

        let content_type = if content_type.trim().is_empty() {
            mime::APPLICATION_OCTET_STREAM.as_ref()
        } else {
            content_type
        };

        let response = self
            .client
            .post(&url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.key)
            .header(header::CONTENT_TYPE, content_type)
            .body(content)
            .send()
            .await
            .map_err(|e| OcrError::Connection {
                url: url.clone(),
                source: e,
            })?;

        if response.status() != StatusCode::ACCEPTED {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::SubmitRejected { status, body });
        }

        let handle = response
            .headers()
            .get("operation-location")
            .and_then(|value| value.to_str().ok())
            .ok_or(OcrError::MissingOperationHandle)?;

        Ok(OperationHandle::new(handle))
    }

    async fn fetch(&self, handle: &OperationHandle) -> Result<ReadOperation, OcrError> {
        let response = self
            .client
            .get(handle.as_str())
            .header(SUBSCRIPTION_KEY_HEADER, &self.key)
            .send()
            .await
            .map_err(|e| OcrError::Connection {
                url: handle.as_str().to_string(),
                source: e,
            })?;

        let status = response.status();
        let payload = response.text().await.map_err(|e| OcrError::Connection {
            url: handle.as_str().to_string(),
            source: e,
        })?;

        if !status.is_success() {
            return Err(OcrError::PollRejected {
                status: status.as_u16(),
            });
        }

        let body: ReadOperationBody =
            serde_json::from_str(&payload).map_err(|e| OcrError::InvalidResponse { source: e })?;

        Ok(ReadOperation {
            status: OperationStatus::parse(&body.status),
            analyze_result: body.analyze_result,
            payload,
        })
    }
}

/// Drives a submit/poll extraction to completion.
///
/// Resubmission creates a new operation handle on the backend, so the whole
/// extraction is safe to retry at the caller's discretion.
pub struct OcrExtractor {
    backend: Arc<dyn OcrBackend>,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl OcrExtractor {
    pub fn new(backend: Arc<dyn OcrBackend>, config: &OcrConfig) -> Self {
        Self {
            backend,
            poll_interval: config.poll_interval(),
            max_poll_attempts: config.max_poll_attempts,
        }
    }

    /// Extract the document's text: submit, poll until a terminal status,
    /// and assemble the recognized lines.
    ///
    /// Exhausting the attempt budget is a `Timeout`, distinct from the
    /// backend explicitly reporting `Failed`.
    pub async fn extract_text(
        &self,
        content: Bytes,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> Result<String, OcrError> {
        let handle = self.backend.submit(content, content_type).await?;

        for _ in 0..self.max_poll_attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(OcrError::Cancelled),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let operation = self.backend.fetch(&handle).await?;

            match operation.status {
                OperationStatus::Succeeded => {
                    return Ok(assemble_text(operation.analyze_result.as_ref()));
                }
                OperationStatus::Failed => {
                    return Err(OcrError::Failed {
                        payload: operation.payload,
                    });
                }
                _ => {}
            }
        }

        Err(OcrError::Timeout {
            attempts: self.max_poll_attempts,
        })
    }
}

/// Concatenate every recognized line across all pages, newline-separated.
fn assemble_text(result: Option<&AnalyzeResult>) -> String {
    let mut out = String::new();
    if let Some(result) = result {
        for page in &result.read_results {
            for line in &page.lines {
                if let Some(text) = &line.text {
                    out.push_str(text);
                    out.push('\n');
                }
            }
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn succeeded_operation(lines: &[&str]) -> ReadOperation {
        ReadOperation {
            status: OperationStatus::Succeeded,
            analyze_result: Some(AnalyzeResult {
                read_results: vec![ReadResult {
                    lines: lines
                        .iter()
                        .map(|text| ReadLine {
                            text: Some(text.to_string()),
                        })
                        .collect(),
                }],
            }),
            payload: String::new(),
        }
    }

    fn running_operation() -> ReadOperation {
        ReadOperation {
            status: OperationStatus::Running,
            analyze_result: None,
            payload: "{\"status\":\"running\"}".to_string(),
        }
    }

    /// Backend stub returning a scripted sequence of poll responses; once
    /// the script runs out it repeats the last entry.
    struct ScriptedBackend {
        responses: Mutex<VecDeque<ReadOperation>>,
        last: ReadOperation,
        fetches: AtomicU32,
    }

    impl ScriptedBackend {
        fn new(responses: Vec<ReadOperation>, last: ReadOperation) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                last,
                fetches: AtomicU32::new(0),
            }
        }

        fn fetch_count(&self) -> u32 {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OcrBackend for ScriptedBackend {
        async fn submit(
            &self,
            _content: Bytes,
            _content_type: &str,
        ) -> Result<OperationHandle, OcrError> {
            Ok(OperationHandle::new("op-1"))
        }

        async fn fetch(&self, _handle: &OperationHandle) -> Result<ReadOperation, OcrError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let next = self.responses.lock().unwrap().pop_front();
            Ok(next.unwrap_or_else(|| self.last.clone()))
        }
    }

    fn extractor(backend: Arc<dyn OcrBackend>) -> OcrExtractor {
        OcrExtractor::new(backend, &OcrConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_succeeded() {
        let backend = Arc::new(ScriptedBackend::new(
            vec![
                running_operation(),
                running_operation(),
                running_operation(),
                running_operation(),
                running_operation(),
            ],
            succeeded_operation(&["first line", "second line"]),
        ));
        let extractor = extractor(backend.clone());

        let text = extractor
            .extract_text(
                Bytes::from_static(b"doc"),
                "application/pdf",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(text, "first line\nsecond line");
        assert_eq!(backend.fetch_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_after_attempt_budget() {
        let backend = Arc::new(ScriptedBackend::new(vec![], running_operation()));
        let extractor = extractor(backend.clone());

        let err = extractor
            .extract_text(
                Bytes::from_static(b"doc"),
                "application/pdf",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OcrError::Timeout { attempts: 30 }));
        assert_eq!(backend.fetch_count(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_status_preserves_payload() {
        let failed = ReadOperation {
            status: OperationStatus::Failed,
            analyze_result: None,
            payload: "{\"status\":\"failed\",\"error\":\"bad scan\"}".to_string(),
        };
        let backend = Arc::new(ScriptedBackend::new(vec![], failed));
        let extractor = extractor(backend);

        let err = extractor
            .extract_text(
                Bytes::from_static(b"doc"),
                "application/pdf",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            OcrError::Failed { payload } => assert!(payload.contains("bad scan")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_aborts_poll_loop() {
        let backend = Arc::new(ScriptedBackend::new(vec![], running_operation()));
        let extractor = extractor(backend.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = extractor
            .extract_text(Bytes::from_static(b"doc"), "application/pdf", &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, OcrError::Cancelled));
        assert_eq!(backend.fetch_count(), 0);
    }

    #[test]
    fn test_operation_status_parse_is_case_insensitive() {
        assert_eq!(OperationStatus::parse("Succeeded"), OperationStatus::Succeeded);
        assert_eq!(OperationStatus::parse("FAILED"), OperationStatus::Failed);
        assert_eq!(OperationStatus::parse("notStarted"), OperationStatus::NotStarted);
        assert_eq!(OperationStatus::parse("running"), OperationStatus::Running);
        assert_eq!(
            OperationStatus::parse("queued"),
            OperationStatus::Other("queued".to_string())
        );
    }

    #[test]
    fn test_assemble_text_joins_pages_and_lines() {
        let result = AnalyzeResult {
            read_results: vec![
                ReadResult {
                    lines: vec![
                        ReadLine {
                            text: Some("page one, line one".to_string()),
                        },
                        ReadLine { text: None },
                        ReadLine {
                            text: Some("page one, line two".to_string()),
                        },
                    ],
                },
                ReadResult {
                    lines: vec![ReadLine {
                        text: Some("page two".to_string()),
                    }],
                },
            ],
        };

        assert_eq!(
            assemble_text(Some(&result)),
            "page one, line one\npage one, line two\npage two"
        );
        assert_eq!(assemble_text(None), "");
    }
}
