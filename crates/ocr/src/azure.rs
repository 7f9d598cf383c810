//! Azure AI Vision and Document Intelligence backends.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Deserialize;
use yenslip_core::{Item, ParseResult, Yen};

use crate::name::sanitize_name;
use crate::normalize::normalize_line;
use crate::recognizer::{OcrBackend, OcrError, Recognition};

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION_HEADER: &str = "operation-location";

pub const VISION_API_VERSION: &str = "2024-02-01";
pub const DOCUMENT_API_VERSION: &str = "2024-11-30";

const SUBMIT_TIMEOUT: Duration = Duration::from_secs(120);
const POLL_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(600);
const DEFAULT_POLL_DEADLINE: Duration = Duration::from_secs(60);

/// `prebuilt-receipt` field names, in order of preference.
const TOTAL_FIELDS: [&str; 4] = ["Total", "TotalPrice", "TotalAmount", "AmountDue"];
const ITEM_NAME_FIELDS: [&str; 3] = ["Description", "Name", "ItemName"];
const ITEM_PRICE_FIELDS: [&str; 4] = ["TotalPrice", "Price", "Amount", "UnitPrice"];

re!(re_first_amount, r"[0-9][0-9,]*");

fn client() -> Result<reqwest::Client, OcrError> {
    Ok(reqwest::Client::builder().timeout(SUBMIT_TIMEOUT).build()?)
}

fn required(value: &str, name: &'static str) -> Result<String, OcrError> {
    let value = value.trim().trim_end_matches('/');
    if value.is_empty() {
        return Err(OcrError::NotConfigured(name));
    }
    Ok(value.to_string())
}

// ── Image Analysis 4.0 `read` ─────────────────────────────────────────────────

pub struct VisionReadRecognizer {
    client: reqwest::Client,
    endpoint: String,
    key: String,
    language: String,
}

impl VisionReadRecognizer {
    pub fn new(endpoint: &str, key: &str) -> Result<Self, OcrError> {
        Ok(Self {
            client: client()?,
            endpoint: required(endpoint, "VISION_ENDPOINT")?,
            key: required(key, "VISION_KEY")?,
            language: "ja".to_string(),
        })
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    fn analyze_url(&self) -> String {
        format!(
            "{}/imageanalysis:analyze?features=read&language={}&api-version={VISION_API_VERSION}",
            self.endpoint, self.language
        )
    }
}

#[async_trait]
impl OcrBackend for VisionReadRecognizer {
    async fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<String>, OcrError> {
        let resp = self
            .client
            .post(self.analyze_url())
            .header(SUBSCRIPTION_KEY_HEADER, &self.key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image_bytes.to_vec())
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let parsed: ReadResponse = serde_json::from_str(&body)?;
        Ok(parsed.into_lines())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadResponse {
    #[serde(default)]
    read_result: Option<ReadResult>,
}

#[derive(Debug, Default, Deserialize)]
struct ReadResult {
    #[serde(default)]
    blocks: Vec<ReadBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct ReadBlock {
    #[serde(default)]
    lines: Vec<ReadLine>,
}

#[derive(Debug, Default, Deserialize)]
struct ReadLine {
    #[serde(default)]
    text: String,
}

impl ReadResponse {
    fn into_lines(self) -> Vec<String> {
        self.read_result
            .into_iter()
            .flat_map(|r| r.blocks)
            .flat_map(|b| b.lines)
            .map(|l| l.text)
            .filter(|t| !t.is_empty())
            .collect()
    }
}

// ── Document Intelligence `prebuilt-receipt` ──────────────────────────────────

/// Submits the image, then polls the returned operation until it settles.
pub struct DocumentIntelligenceRecognizer {
    client: reqwest::Client,
    endpoint: String,
    key: String,
    poll_interval: Duration,
    deadline: Duration,
}

impl DocumentIntelligenceRecognizer {
    pub fn new(endpoint: &str, key: &str) -> Result<Self, OcrError> {
        Ok(Self {
            client: client()?,
            endpoint: required(endpoint, "DI_ENDPOINT")?,
            key: required(key, "DI_KEY")?,
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_POLL_DEADLINE,
        })
    }

    pub fn with_polling(mut self, interval: Duration, deadline: Duration) -> Self {
        self.poll_interval = interval;
        self.deadline = deadline;
        self
    }

    fn analyze_url(&self) -> String {
        format!(
            "{}/documentintelligence/documentModels/prebuilt-receipt:analyze?api-version={DOCUMENT_API_VERSION}",
            self.endpoint
        )
    }

    async fn submit(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        let resp = self
            .client
            .post(self.analyze_url())
            .header(SUBSCRIPTION_KEY_HEADER, &self.key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image_bytes.to_vec())
            .send()
            .await?;

        if resp.status() != StatusCode::ACCEPTED {
            let status = resp.status();
            let body = resp.text().await?;
            return Err(status_error(status, &body));
        }

        resp.headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(OcrError::MissingOperationLocation)
    }

    /// Submit, then poll until the operation settles.
    async fn analyze(&self, image_bytes: &[u8]) -> Result<AnalyzeResult, OcrError> {
        let operation = self.submit(image_bytes).await?;
        let started = Instant::now();

        loop {
            if started.elapsed() > self.deadline {
                return Err(OcrError::Timeout(self.deadline));
            }
            tokio::time::sleep(self.poll_interval).await;

            let resp = self
                .client
                .get(&operation)
                .header(SUBSCRIPTION_KEY_HEADER, &self.key)
                .timeout(POLL_REQUEST_TIMEOUT)
                .send()
                .await?;
            let status = resp.status();
            let body = resp.text().await?;
            if !status.is_success() {
                return Err(status_error(status, &body));
            }

            let op: AnalyzeOperation = serde_json::from_str(&body)?;
            match op.status.as_str() {
                "succeeded" => return Ok(op.analyze_result.unwrap_or_default()),
                "failed" => {
                    let message = op.error.and_then(|e| e.message).unwrap_or(body);
                    return Err(OcrError::AnalysisFailed(message));
                }
                other => tracing::debug!(status = other, "document analysis still running"),
            }
        }
    }

    /// Lines plus the items and total of the service's receipt model.
    pub async fn recognize_structured(&self, image_bytes: &[u8]) -> Result<Recognition, OcrError> {
        let result = self.analyze(image_bytes).await?;
        let structured = result.structured_receipt();
        Ok(Recognition {
            lines: result.into_lines(),
            structured,
        })
    }
}

#[async_trait]
impl OcrBackend for DocumentIntelligenceRecognizer {
    async fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<String>, OcrError> {
        Ok(self.analyze(image_bytes).await?.into_lines())
    }

    async fn recognize_receipt(&self, image_bytes: &[u8]) -> Result<Recognition, OcrError> {
        self.recognize_structured(image_bytes).await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    #[serde(default)]
    status: String,
    #[serde(default)]
    analyze_result: Option<AnalyzeResult>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalyzeResult {
    #[serde(default)]
    pages: Vec<DocumentPage>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    documents: Vec<AnalyzedDocument>,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentPage {
    #[serde(default)]
    lines: Vec<DocumentLine>,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentLine {
    #[serde(default)]
    content: String,
}

impl AnalyzeResult {
    /// Page lines, or the flat `content` split on newlines when pages are empty.
    fn into_lines(self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .pages
            .into_iter()
            .flat_map(|p| p.lines)
            .map(|l| l.content)
            .filter(|c| !c.is_empty())
            .collect();
        if lines.is_empty() {
            lines = self
                .content
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect();
        }
        lines
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }

    /// Items and total from the first analyzed document's fields; `None`
    /// when the service returned no document.
    fn structured_receipt(&self) -> Option<ParseResult> {
        let fields = &self.documents.first()?.fields;

        let total = TOTAL_FIELDS
            .iter()
            .filter_map(|k| fields.get(*k))
            .find_map(DocumentField::amount)
            .filter(|t| *t >= 0)
            .map(Yen::new);

        let rows = fields
            .get("Items")
            .or_else(|| fields.get("items"))
            .and_then(|f| f.value_array.as_deref())
            .unwrap_or_default();
        let items = rows.iter().filter_map(structured_item).collect();

        Some(ParseResult::new(items, total))
    }
}

fn structured_item(row: &DocumentField) -> Option<Item> {
    let obj = row.value_object.as_ref()?;
    let name = first_field(obj, &ITEM_NAME_FIELDS)
        .and_then(DocumentField::text)
        .and_then(normalize_line)
        .map(|n| sanitize_name(&n))?;
    let price = first_field(obj, &ITEM_PRICE_FIELDS)?.amount()?;
    Item::new(name, price).ok()
}

fn first_field<'a>(fields: &'a HashMap<String, DocumentField>, keys: &[&str]) -> Option<&'a DocumentField> {
    keys.iter().find_map(|k| fields.get(*k))
}

#[derive(Debug, Default, Deserialize)]
struct AnalyzedDocument {
    #[serde(default)]
    fields: HashMap<String, DocumentField>,
}

/// One typed field of a `prebuilt-receipt` document.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentField {
    value_string: Option<String>,
    value_number: Option<f64>,
    value_currency: Option<CurrencyValue>,
    value_array: Option<Vec<DocumentField>>,
    value_object: Option<HashMap<String, DocumentField>>,
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CurrencyValue {
    amount: Option<f64>,
}

impl DocumentField {
    fn text(&self) -> Option<&str> {
        self.value_string
            .as_deref()
            .or(self.content.as_deref())
            .map(str::trim)
    }

    /// Currency amount, then plain number, then the first digit run of the
    /// raw content (which may carry `¥`, commas or a rate mark).
    fn amount(&self) -> Option<i64> {
        if let Some(amount) = self.value_currency.as_ref().and_then(|c| c.amount) {
            return Some(amount.round() as i64);
        }
        if let Some(number) = self.value_number {
            return Some(number.round() as i64);
        }
        let digits = re_first_amount().find(self.content.as_deref()?)?;
        digits.as_str().replace(',', "").parse().ok()
    }
}

// ── Shared error envelope ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn status_error(status: StatusCode, body: &str) -> OcrError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.to_string());
    OcrError::Status { status: status.as_u16(), message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn read_response_lines_in_block_order() {
        let parsed: ReadResponse = serde_json::from_value(json!({
            "readResult": { "blocks": [
                { "lines": [ { "text": "Coffee" }, { "text": "" } ] },
                { "lines": [ { "text": "¥200" } ] }
            ]}
        }))
        .unwrap();
        assert_eq!(parsed.into_lines(), vec!["Coffee", "¥200"]);
    }

    #[test]
    fn read_response_without_result_is_empty() {
        let parsed: ReadResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.into_lines().is_empty());
    }

    #[test]
    fn analyze_result_falls_back_to_content() {
        let result: AnalyzeResult = serde_json::from_value(json!({
            "pages": [ { "lines": [] } ],
            "content": "Coffee\r\n ¥200 \n\nTOTAL"
        }))
        .unwrap();
        assert_eq!(result.into_lines(), vec!["Coffee", "¥200", "TOTAL"]);
    }

    #[test]
    fn receipt_fields_become_items_and_total() {
        let result: AnalyzeResult = serde_json::from_value(json!({
            "documents": [ { "fields": {
                "Total": { "content": "合計" },
                "TotalPrice": { "valueCurrency": { "amount": 447.6, "currencyCode": "JPY" } },
                "Items": { "valueArray": [
                    { "valueObject": {
                        "Description": { "valueString": "◎天然水 軽" },
                        "TotalPrice": { "valueCurrency": { "amount": 108.0 } }
                    }},
                    { "valueObject": {
                        "Name": { "content": "ﾌｧﾐﾁｷ" },
                        "Price": { "content": "¥1,220軽" }
                    }},
                    { "valueObject": {
                        "ItemName": { "valueString": "コーヒー S" },
                        "Amount": { "valueNumber": 120 }
                    }},
                    { "valueObject": {
                        "Description": { "valueString": "値引" },
                        "TotalPrice": { "valueNumber": 0 }
                    }},
                    { "valueObject": {
                        "Description": { "valueString": "・" },
                        "TotalPrice": { "valueNumber": 50 }
                    }}
                ]}
            }}]
        }))
        .unwrap();

        let parsed = result.structured_receipt().unwrap();
        let pairs: Vec<(&str, i64)> = parsed
            .items
            .iter()
            .map(|i| (i.name(), i.price().amount()))
            .collect();
        assert_eq!(pairs, vec![("天然水", 108), ("ファミチキ", 1220), ("コーヒー S", 120)]);
        assert_eq!(parsed.total, Some(Yen::new(448)));
    }

    #[test]
    fn no_document_means_no_structured_result() {
        let result: AnalyzeResult = serde_json::from_value(json!({ "content": "TOTAL" })).unwrap();
        assert_eq!(result.structured_receipt(), None);

        let result: AnalyzeResult =
            serde_json::from_value(json!({ "documents": [ { "fields": {} } ] })).unwrap();
        assert_eq!(result.structured_receipt(), Some(ParseResult::empty()));
    }

    #[test]
    fn status_error_prefers_service_message() {
        let err = status_error(StatusCode::UNAUTHORIZED, r#"{"error":{"message":"bad key"}}"#);
        assert!(matches!(err, OcrError::Status { status: 401, ref message } if message == "bad key"));

        let err = status_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(err, OcrError::Status { status: 502, ref message } if message == "upstream down"));
    }

    #[test]
    fn missing_credentials_are_reported() {
        assert!(matches!(
            VisionReadRecognizer::new("", "key"),
            Err(OcrError::NotConfigured("VISION_ENDPOINT"))
        ));
        assert!(matches!(
            DocumentIntelligenceRecognizer::new("https://example.test", " "),
            Err(OcrError::NotConfigured("DI_KEY"))
        ));
    }

    #[tokio::test]
    async fn vision_read_round_trip() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/imageanalysis:analyze")
                    .query_param("features", "read")
                    .query_param("language", "ja")
                    .header("Ocp-Apim-Subscription-Key", "secret");
                then.status(200).json_body(json!({
                    "readResult": { "blocks": [ { "lines": [
                        { "text": "Coffee" }, { "text": "¥200" }
                    ]}]}
                }));
            })
            .await;

        let recognizer = VisionReadRecognizer::new(&format!("{}/", server.base_url()), "secret").unwrap();
        let lines = recognizer.recognize(b"image").await.unwrap();

        mock.assert_async().await;
        assert_eq!(lines, vec!["Coffee", "¥200"]);
    }

    #[tokio::test]
    async fn vision_read_sends_configured_language() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/imageanalysis:analyze")
                    .query_param("language", "en");
                then.status(200).json_body(json!({ "readResult": { "blocks": [] } }));
            })
            .await;

        let recognizer = VisionReadRecognizer::new(&server.base_url(), "secret")
            .unwrap()
            .with_language("en");
        assert!(recognizer.recognize(b"image").await.unwrap().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn vision_read_http_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/imageanalysis:analyze");
                then.status(403).json_body(json!({ "error": { "message": "quota exceeded" } }));
            })
            .await;

        let recognizer = VisionReadRecognizer::new(&server.base_url(), "secret").unwrap();
        let err = recognizer.recognize(b"image").await.unwrap_err();
        assert!(matches!(err, OcrError::Status { status: 403, ref message } if message == "quota exceeded"));
    }

    #[tokio::test]
    async fn document_analysis_polls_operation() {
        let server = MockServer::start_async().await;
        let operation_url = server.url("/operations/1");
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/documentintelligence/documentModels/prebuilt-receipt:analyze");
                then.status(202).header("Operation-Location", operation_url.as_str());
            })
            .await;
        let poll = server
            .mock_async(|when, then| {
                when.method(GET).path("/operations/1");
                then.status(200).json_body(json!({
                    "status": "succeeded",
                    "analyzeResult": { "pages": [ { "lines": [
                        { "content": "TOTAL" }, { "content": "¥500" }
                    ]}]}
                }));
            })
            .await;

        let recognizer = DocumentIntelligenceRecognizer::new(&server.base_url(), "secret")
            .unwrap()
            .with_polling(Duration::from_millis(1), Duration::from_secs(5));
        let lines = recognizer.recognize(b"image").await.unwrap();

        poll.assert_async().await;
        assert_eq!(lines, vec!["TOTAL", "¥500"]);
    }

    #[tokio::test]
    async fn document_analysis_reads_receipt_fields() {
        let server = MockServer::start_async().await;
        let operation_url = server.url("/operations/3");
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/documentintelligence/documentModels/prebuilt-receipt:analyze");
                then.status(202).header("Operation-Location", operation_url.as_str());
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/operations/3");
                then.status(200).json_body(json!({
                    "status": "succeeded",
                    "analyzeResult": {
                        "pages": [ { "lines": [
                            { "content": "おにぎり" }, { "content": "¥150" },
                            { "content": "合計 ¥150" }
                        ]}],
                        "documents": [ { "fields": {
                            "Total": { "valueCurrency": { "amount": 150 } },
                            "Items": { "valueArray": [ { "valueObject": {
                                "Description": { "valueString": "おにぎり" },
                                "TotalPrice": { "valueCurrency": { "amount": 150 } }
                            }}]}
                        }}]
                    }
                }));
            })
            .await;

        let recognizer = DocumentIntelligenceRecognizer::new(&server.base_url(), "secret")
            .unwrap()
            .with_polling(Duration::from_millis(1), Duration::from_secs(5));
        let recognition = recognizer.recognize_receipt(b"image").await.unwrap();

        assert_eq!(recognition.lines, vec!["おにぎり", "¥150", "合計 ¥150"]);
        let structured = recognition.structured.unwrap();
        assert_eq!(structured.items, vec![Item::new("おにぎり", 150).unwrap()]);
        assert_eq!(structured.total, Some(Yen::new(150)));
    }

    #[tokio::test]
    async fn document_analysis_failure() {
        let server = MockServer::start_async().await;
        let operation_url = server.url("/operations/2");
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/documentintelligence/documentModels/prebuilt-receipt:analyze");
                then.status(202).header("Operation-Location", operation_url.as_str());
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/operations/2");
                then.status(200)
                    .json_body(json!({ "status": "failed", "error": { "message": "corrupt image" } }));
            })
            .await;

        let recognizer = DocumentIntelligenceRecognizer::new(&server.base_url(), "secret")
            .unwrap()
            .with_polling(Duration::from_millis(1), Duration::from_secs(5));
        let err = recognizer.recognize(b"image").await.unwrap_err();
        assert!(matches!(err, OcrError::AnalysisFailed(ref m) if m == "corrupt image"));
    }

    #[tokio::test]
    async fn document_analysis_requires_operation_location() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/documentintelligence/documentModels/prebuilt-receipt:analyze");
                then.status(202);
            })
            .await;

        let recognizer = DocumentIntelligenceRecognizer::new(&server.base_url(), "secret").unwrap();
        let err = recognizer.recognize(b"image").await.unwrap_err();
        assert!(matches!(err, OcrError::MissingOperationLocation));
    }
}
