use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use yenslip_core::ParseResult;

use crate::extract::Extractor;
use crate::hash;
use crate::recognizer::{OcrBackend, OcrError, Recognition};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
}

/// The result of a single receipt processing run.
#[derive(Debug, Clone)]
pub struct ProcessedReceipt {
    /// SHA-256 hex digest of the uploaded bytes.
    pub hash_hex: String,
    /// Where the image was stored in the uploads tree.
    pub stored_path: PathBuf,
    pub original_filename: String,
    /// Recognized lines, as returned by the OCR backend.
    pub lines: Vec<String>,
    pub parsed: ParseResult,
    /// The OCR service's own reading of items and total, when it has one.
    pub structured: Option<ParseResult>,
}

/// Orchestrates: hash → content-store → OCR → log → parse.
pub struct ReceiptPipeline<R: OcrBackend> {
    recognizer: R,
    extractor: Arc<Extractor>,
    uploads_dir: PathBuf,
    ocr_log: Option<PathBuf>,
}

impl<R: OcrBackend> ReceiptPipeline<R> {
    pub fn new(recognizer: R, uploads_dir: PathBuf) -> Self {
        Self {
            recognizer,
            extractor: Arc::new(Extractor::default_layout().clone()),
            uploads_dir,
            ocr_log: None,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Append every recognized receipt to this file.
    pub fn with_ocr_log(mut self, path: PathBuf) -> Self {
        self.ocr_log = Some(path);
        self
    }

    pub fn ocr_log(&self) -> Option<&Path> {
        self.ocr_log.as_deref()
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Process a file on disk.
    pub async fn process_file(&self, path: &Path) -> Result<ProcessedReceipt, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("receipt");
        self.process_bytes(&bytes, name).await
    }

    /// Process one uploaded image.
    pub async fn process_bytes(
        &self,
        data: &[u8],
        original_filename: &str,
    ) -> Result<ProcessedReceipt, PipelineError> {
        // 1. Hash for content addressing.
        let hash_hex = hash::to_hex(&hash::sha256_bytes(data));

        // 2. Persist the image.
        let ext = hash::upload_extension(original_filename);
        let stored_path = hash::upload_path(&self.uploads_dir, &hash_hex, &ext);
        if let Some(parent) = stored_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&stored_path, data).await?;

        // 3. Run OCR.
        let Recognition { lines, structured } = self.recognizer.recognize_receipt(data).await?;
        tracing::info!(file = original_filename, lines = lines.len(), "OCR finished");

        // 4. Keep the full OCR text for later inspection.
        if let Some(log) = &self.ocr_log {
            append_ocr_log(log, original_filename, &lines).await?;
        }

        // 5. Extract items and total.
        let parsed = self.extractor.extract(&lines);
        if parsed.total.is_none() {
            tracing::warn!(file = original_filename, "no total detected");
        }
        if let Some(s) = &structured {
            if s.total != parsed.total {
                tracing::warn!(
                    file = original_filename,
                    parsed = ?parsed.total,
                    service = ?s.total,
                    "total differs from the service's receipt fields"
                );
            }
        }

        Ok(ProcessedReceipt {
            hash_hex,
            stored_path,
            original_filename: original_filename.to_string(),
            lines,
            parsed,
            structured,
        })
    }
}

async fn append_ocr_log(path: &Path, title: &str, lines: &[String]) -> std::io::Result<()> {
    let ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    let entry = format!("==== {ts} {title} ====\n{}\n\n", lines.join("\n"));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(entry.as_bytes()).await?;
    file.flush().await
}
