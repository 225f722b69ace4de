//! Static service configuration.
//!
//! Loaded once at startup from an optional `config` file plus
//! `LECTOR`-prefixed environment variables. Changing any of these settings
//! requires a restart.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct StaticConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default)]
    pub ocr: OcrConfig,

    #[serde(default = "default_limits")]
    pub limits: LimitsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Object storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Container holding uploaded document blobs.
    #[serde(default = "default_documents_container")]
    pub documents_container: String,

    /// Container holding persisted OCR results.
    #[serde(default = "default_results_container")]
    pub results_container: String,
}

/// OCR backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Base URL of the Read OCR endpoint. Required at runtime.
    #[serde(default)]
    pub endpoint: String,

    /// Subscription key sent with every backend request. Required at runtime.
    #[serde(default)]
    pub key: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl OcrConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            key: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Request limits
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_document_size_bytes")]
    pub max_document_size_bytes: u64,
}

// ==================== Default Value Functions ====================

pub(crate) fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_storage() -> StorageConfig {
    StorageConfig {
        data_dir: default_data_dir(),
        documents_container: default_documents_container(),
        results_container: default_results_container(),
    }
}

pub(crate) fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

pub(crate) fn default_documents_container() -> String {
    "documents".to_string()
}

pub(crate) fn default_results_container() -> String {
    "ocr-results".to_string()
}

pub(crate) fn default_poll_interval_ms() -> u64 {
    1200
}

pub(crate) fn default_max_poll_attempts() -> u32 {
    30
}

pub(crate) fn default_request_timeout_secs() -> u64 {
    60
}

pub(crate) fn default_limits() -> LimitsConfig {
    LimitsConfig {
        max_document_size_bytes: default_max_document_size_bytes(),
    }
}

pub(crate) fn default_max_document_size_bytes() -> u64 {
    200 * 1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: StaticConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.data_dir, PathBuf::from("./data"));
        assert_eq!(config.storage.documents_container, "documents");
        assert_eq!(config.storage.results_container, "ocr-results");
        assert_eq!(config.ocr.poll_interval(), Duration::from_millis(1200));
        assert_eq!(config.ocr.max_poll_attempts, 30);
        assert_eq!(config.limits.max_document_size_bytes, 200 * 1024 * 1024);
    }

    #[test]
    fn test_overrides() {
        let config: StaticConfig = serde_json::from_str(
            r#"{
                "server": { "port": 9000 },
                "ocr": {
                    "endpoint": "https://ocr.example.com",
                    "key": "secret",
                    "poll_interval_ms": 250,
                    "max_poll_attempts": 5
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.ocr.endpoint, "https://ocr.example.com");
        assert_eq!(config.ocr.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.ocr.max_poll_attempts, 5);
    }
}
