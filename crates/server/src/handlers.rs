use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{Html, IntoResponse},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use yenslip_core::{Item, ParseResult, Yen};
use yenslip_export::{receipt_csv, render_results, render_upload_form, ReceiptView};
use yenslip_ocr::ProcessedReceipt;
use yenslip_storage::{get_receipt, get_receipt_items, insert_receipt, NewReceipt};

use crate::{AppError, AppState};

/// Multipart field carrying the receipt images.
pub const UPLOAD_FIELD: &str = "receipts";

pub async fn index() -> Html<String> {
    Html(render_upload_form())
}

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Batch upload: every file is stored, recognized, parsed and persisted.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Html<String>, AppError> {
    let mut processed: Vec<(i64, ProcessedReceipt)> = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .filter(|n| !n.is_empty())
            .unwrap_or("receipt")
            .to_string();
        let data = field.bytes().await?;
        if data.is_empty() {
            continue;
        }

        let receipt = state.pipeline.process_bytes(&data, &file_name).await?;
        let stored_path = receipt.stored_path.to_string_lossy();
        let id = insert_receipt(
            &state.pool,
            &NewReceipt {
                original_filename: &receipt.original_filename,
                stored_path: &stored_path,
                content_hash: &receipt.hash_hex,
            },
            &receipt.parsed,
        )
        .await?;
        info!(
            receipt_id = id,
            file = %file_name,
            items = receipt.parsed.items.len(),
            total = ?receipt.parsed.total,
            "receipt processed"
        );
        processed.push((id, receipt));
    }

    if processed.is_empty() {
        return Err(AppError::NoFiles);
    }

    let views: Vec<ReceiptView<'_>> = processed
        .iter()
        .map(|(id, r)| ReceiptView {
            receipt_id: *id,
            original_filename: &r.original_filename,
            items: &r.parsed.items,
            total: r.parsed.total,
        })
        .collect();
    Ok(Html(render_results(&views)))
}

#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    pub id: i64,
    pub original_filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub items: Vec<Item>,
    pub total: Option<Yen>,
}

pub async fn get_receipt_json(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ReceiptResponse>, AppError> {
    let record = get_receipt(&state.pool, id).await?.ok_or(AppError::NotFound)?;
    let items = get_receipt_items(&state.pool, id).await?;

    Ok(Json(ReceiptResponse {
        id: record.id,
        original_filename: record.original_filename,
        uploaded_at: record.uploaded_at,
        items,
        total: record.total,
    }))
}

pub async fn download_csv(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id <= 0 {
        return Err(AppError::BadReceiptId);
    }
    let record = get_receipt(&state.pool, id).await?.ok_or(AppError::NotFound)?;
    let items = get_receipt_items(&state.pool, id).await?;
    let body = receipt_csv(&ParseResult::new(items, record.total))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=UTF-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"receipt_{id}.csv\""),
            ),
        ],
        body,
    ))
}

/// Full OCR text of every upload so far, as appended by the pipeline.
pub async fn show_ocr_log(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let path = state.pipeline.ocr_log().ok_or(AppError::NotFound)?;
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(AppError::NotFound),
        Err(e) => return Err(e.into()),
    };
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=UTF-8")], text))
}

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub lines: Vec<String>,
}

/// Parse already-recognized lines; no OCR and no persistence.
pub async fn parse_lines(
    State(state): State<AppState>,
    Json(request): Json<ParseRequest>,
) -> Json<ParseResult> {
    Json(state.pipeline.extractor().extract(&request.lines))
}
