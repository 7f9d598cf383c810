//! HTTP front end: upload form, batch receipt upload, CSV download and a
//! JSON endpoint for parsing pre-recognized lines.

pub mod config;
pub mod error;
pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use yenslip_ocr::{OcrBackend, ReceiptPipeline};
use yenslip_storage::DbPool;

pub use config::{ConfigError, OcrBackendKind, ServerConfig};
pub use error::AppError;
pub use handlers::*;

pub type Pipeline = ReceiptPipeline<Box<dyn OcrBackend>>;

/// Shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub pipeline: Arc<Pipeline>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pool: DbPool, pipeline: Pipeline, max_upload_bytes: usize) -> Self {
        Self {
            pool,
            pipeline: Arc::new(pipeline),
            max_upload_bytes,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let limit = state.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/upload", post(upload))
        .route("/receipts/{id}", get(get_receipt_json))
        .route("/receipts/{id}/csv", get(download_csv))
        .route("/ocr.log", get(show_ocr_log))
        .route("/api/parse", post(parse_lines))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(addr: &str, state: AppState) -> Result<(), std::io::Error> {
    tracing::info!("Starting receipt server on {}", addr);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await
}
