use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("Failed to parse vocabulary TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid pattern in `{table}`: {source}")]
    Pattern {
        table: &'static str,
        #[source]
        source: regex::Error,
    },
}

/// Heuristic word lists for one receipt layout.
///
/// Token lists are literal and matched against the compacted, upper-cased
/// line. Pattern lists are case-insensitive regular expressions matched
/// against the normalized line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Banner that precedes the item block.
    pub header_tokens: Vec<String>,
    pub total_tokens: Vec<String>,
    pub subtotal_tokens: Vec<String>,
    /// Store name, address, phone, timestamps, register and loyalty metadata.
    pub noise_patterns: Vec<String>,
    /// Tax-rate categories; noise unless the line carries a price.
    pub rate_category_patterns: Vec<String>,
    /// Payment and tax lines that must never become items.
    pub tax_payment_patterns: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::convenience_store()
    }
}

impl Vocabulary {
    /// Layout of a Japanese convenience-store register receipt.
    pub fn convenience_store() -> Self {
        Self {
            header_tokens: strings(&["領収証", "領収書", "レシート", "RECEIPT"]),
            total_tokens: strings(&["合計", "TOTAL"]),
            subtotal_tokens: strings(&["小計", "SUBTOTAL"]),
            noise_patterns: strings(&[
                r"ファミリーマート|FamilyMart|FAMIMA",
                r"\bTEL\b|電話|東京都|区|市|町|丁目|番地",
                r"\d{2,4}-\d{2,4}-\d{3,4}",
                r"登録番号|\bT\d{13}\b",
                r"\d{4}[/\-年]\d{1,2}[/\-月]\d{1,2}",
                r"\d{1,2}:\d{2}",
                r"レジ|責|担当|取引|領収|お客様|店舗|店",
                r"ポイント|会員|クーポン|\bPOINTS?\b",
            ]),
            rate_category_patterns: strings(&[r"税込|税率|標準|軽減|対象"]),
            tax_payment_patterns: strings(&[
                r"消費税|内税|外税|税額|預り|釣|現金|クレジット|電子|交通系|支払|残高",
                r"\b(?:CASH|CHANGE|CREDIT|BALANCE|TAX)\b",
            ]),
        }
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, VocabularyError> {
        Ok(toml::from_str(toml_content)?)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
