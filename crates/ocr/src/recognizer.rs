use async_trait::async_trait;
use thiserror::Error;
use yenslip_core::ParseResult;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR service not configured: {0} is unset")]
    NotConfigured(&'static str),
    #[error("OCR request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("OCR service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("OCR response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Analysis response carried no Operation-Location header")]
    MissingOperationLocation,
    #[error("Analysis did not finish within {0:?}")]
    Timeout(std::time::Duration),
    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),
}

/// Everything a backend read from one image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recognition {
    pub lines: Vec<String>,
    /// Items and total from the service's own receipt model, for backends
    /// that have one.
    pub structured: Option<ParseResult>,
}

/// Abstraction over a text-recognition service.
/// Implementations accept raw image bytes and return the recognized lines
/// in reading order, geometry discarded.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    async fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<String>, OcrError>;

    async fn recognize_receipt(&self, image_bytes: &[u8]) -> Result<Recognition, OcrError> {
        Ok(Recognition {
            lines: self.recognize(image_bytes).await?,
            structured: None,
        })
    }
}

#[async_trait]
impl OcrBackend for Box<dyn OcrBackend> {
    async fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<String>, OcrError> {
        (**self).recognize(image_bytes).await
    }

    async fn recognize_receipt(&self, image_bytes: &[u8]) -> Result<Recognition, OcrError> {
        (**self).recognize_receipt(image_bytes).await
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns preset lines, for exercising the pipeline without a network.
pub struct MockRecognizer {
    pub lines: Vec<String>,
}

impl MockRecognizer {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { lines: lines.into_iter().map(Into::into).collect() }
    }

    /// One line per `\n`-separated row of `text`.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines())
    }
}

#[async_trait]
impl OcrBackend for MockRecognizer {
    async fn recognize(&self, _image_bytes: &[u8]) -> Result<Vec<String>, OcrError> {
        Ok(self.lines.clone())
    }
}
