//! HTTP API for the Lector service.
//!
//! This module provides the REST API endpoints for:
//! - Health monitoring
//! - Document upload
//! - OCR result retrieval

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::service::LectorService;

pub mod documents;
use documents::{get_document_result_handler, upload_document_handler};

/// Application state
pub struct AppState {
    pub service: Arc<LectorService>,
    pub start_time: Instant,
}

/// Build the API router
pub fn router(service: Arc<LectorService>) -> Router {
    let max_body_size = service.config.limits.max_document_size_bytes as usize;

    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Document endpoints - with larger body limit for file uploads
        .route(
            "/documents",
            post(upload_document_handler).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route(
            "/documents/{id}/result",
            get(get_document_result_handler),
        );

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
}
