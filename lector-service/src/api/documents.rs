//! Document upload and result retrieval handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use bytes::Bytes;

use crate::api::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::results::OcrStoredResult;
use crate::service::upload::UploadReceipt;

/// `POST /api/documents`: multipart upload with optional `source` and
/// `language` fields. Returns as soon as the OCR job is enqueued.
pub async fn upload_document_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ServiceResult<Json<UploadReceipt>> {
    let mut file: Option<(String, String, Bytes)> = None;
    let mut source: Option<String> = None;
    let mut language: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::InvalidRequest {
            message: format!("Malformed multipart request: {e}"),
        })?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field
                    .file_name()
                    .unwrap_or("document")
                    .to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or(mime::APPLICATION_OCTET_STREAM.as_ref())
                    .to_string();
                let content =
                    field
                        .bytes()
                        .await
                        .map_err(|e| ServiceError::InvalidRequest {
                            message: format!("Failed to read uploaded file: {e}"),
                        })?;
                file = Some((file_name, content_type, content));
            }
            Some("source") => {
                source = read_text_field(field).await?;
            }
            Some("language") => {
                language = read_text_field(field).await?;
            }
            _ => {}
        }
    }

    let (file_name, content_type, content) = file.ok_or(ServiceError::InvalidRequest {
        message: "No file uploaded".to_string(),
    })?;

    if content.is_empty() {
        return Err(ServiceError::InvalidRequest {
            message: "No file uploaded".to_string(),
        });
    }

    let receipt = state
        .service
        .upload_document(content, &file_name, &content_type, source, language)
        .await?;

    Ok(Json(receipt))
}

/// `GET /api/documents/{id}/result`: the persisted OCR result, 404 until
/// processing has completed.
pub async fn get_document_result_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ServiceResult<Json<OcrStoredResult>> {
    state
        .service
        .results
        .load(&id)
        .await?
        .map(Json)
        .ok_or(ServiceError::DocumentNotFound { document_id: id })
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> ServiceResult<Option<String>> {
    let value = field
        .text()
        .await
        .map_err(|e| ServiceError::InvalidRequest {
            message: format!("Malformed multipart field: {e}"),
        })?;
    let value = value.trim().to_string();
    Ok(if value.is_empty() { None } else { Some(value) })
}
