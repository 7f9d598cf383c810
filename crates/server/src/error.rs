use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use yenslip_export::ExportError;
use yenslip_ocr::{OcrError, PipelineError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("no files uploaded")]
    NoFiles,
    #[error("bad receipt_id")]
    BadReceiptId,
    #[error("not found")]
    NotFound,
    #[error("invalid upload: {0}")]
    Multipart(#[from] MultipartError),
    #[error("processing failed: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NoFiles | AppError::BadReceiptId => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Multipart(e) => e.status(),
            AppError::Pipeline(PipelineError::Ocr(OcrError::NotConfigured(_))) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Pipeline(PipelineError::Ocr(OcrError::Timeout(_))) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            AppError::Pipeline(PipelineError::Ocr(_)) => StatusCode::BAD_GATEWAY,
            AppError::Pipeline(PipelineError::Io(_))
            | AppError::Database(_)
            | AppError::Export(_)
            | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
