use regex::{RegexSet, RegexSetBuilder};
use serde::Serialize;

use crate::name::strip_rate_marker;
use crate::normalize::compact;
use crate::price;
use crate::vocab::{Vocabulary, VocabularyError};

re!(re_numeric_shape, r"^[0-9/\-:. ]+$");

/// Shorter lines are OCR debris, not names.
pub const MIN_NAME_CHARS: usize = 3;

/// What a normalized line contributes to the receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineRole {
    Noise,
    TotalMarker,
    PricedItem,
    NameCandidate,
    PriceOnly,
    Unknown,
}

/// A [`Vocabulary`] compiled for matching.
#[derive(Debug, Clone)]
pub struct Classifier {
    header_tokens: Vec<String>,
    total_tokens: Vec<String>,
    subtotal_tokens: Vec<String>,
    noise: RegexSet,
    rate_category: RegexSet,
    tax_payment: RegexSet,
}

impl Classifier {
    pub fn new(vocab: &Vocabulary) -> Result<Self, VocabularyError> {
        Ok(Self {
            header_tokens: tokens(&vocab.header_tokens),
            total_tokens: tokens(&vocab.total_tokens),
            subtotal_tokens: tokens(&vocab.subtotal_tokens),
            noise: pattern_set("noise_patterns", &vocab.noise_patterns)?,
            rate_category: pattern_set("rate_category_patterns", &vocab.rate_category_patterns)?,
            tax_payment: pattern_set("tax_payment_patterns", &vocab.tax_payment_patterns)?,
        })
    }

    /// Assign a role to `line`. `next` is the following line, if any; it only
    /// decides whether a bare trailing number is a price or part of a name.
    pub fn classify(&self, line: &str, next: Option<&str>) -> LineRole {
        let priced = price::split_trailing_price(strip_rate_marker(line));

        if self.noise.is_match(line) || (priced.is_none() && self.rate_category.is_match(line)) {
            return LineRole::Noise;
        }
        if self.is_summary_marker(line) {
            return LineRole::TotalMarker;
        }

        let excluded = self.is_tax_or_payment(line);
        if let Some(p) = priced {
            // "Water 3" above a "¥120" line: the 3 is part of the name.
            let number_is_name = !p.marked && next.is_some_and(|n| self.is_price_only(n));
            if !excluded && has_text(p.head) && !number_is_name {
                return LineRole::PricedItem;
            }
        }
        if self.is_price_only(line) {
            return LineRole::PriceOnly;
        }
        if !excluded && is_name_shaped(line) {
            return LineRole::NameCandidate;
        }
        LineRole::Unknown
    }

    pub fn is_header(&self, line: &str) -> bool {
        let compacted = compact(line);
        self.header_tokens.iter().any(|t| compacted.contains(t.as_str()))
    }

    /// Start of the summary section: a total or subtotal token.
    pub fn is_summary_marker(&self, line: &str) -> bool {
        let compacted = compact(line);
        self.total_tokens
            .iter()
            .chain(&self.subtotal_tokens)
            .any(|t| compacted.contains(t.as_str()))
    }

    /// A total token outside any subtotal token (`SUBTOTAL` is not `TOTAL`).
    pub fn is_total_line(&self, line: &str) -> bool {
        let mut compacted = compact(line);
        for sub in &self.subtotal_tokens {
            compacted = compacted.replace(sub.as_str(), "");
        }
        self.total_tokens.iter().any(|t| compacted.contains(t.as_str()))
    }

    pub fn is_tax_or_payment(&self, text: &str) -> bool {
        self.tax_payment.is_match(text) || self.rate_category.is_match(text)
    }

    pub fn is_price_only(&self, line: &str) -> bool {
        price::price_only(strip_rate_marker(line)).is_some()
    }
}

fn has_text(head: &str) -> bool {
    !head.is_empty() && !re_numeric_shape().is_match(head)
}

fn is_name_shaped(line: &str) -> bool {
    !re_numeric_shape().is_match(line) && line.chars().count() >= MIN_NAME_CHARS
}

fn tokens(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|t| compact(t))
        .filter(|t| !t.is_empty())
        .collect()
}

fn pattern_set(table: &'static str, patterns: &[String]) -> Result<RegexSet, VocabularyError> {
    RegexSetBuilder::new(patterns)
        .case_insensitive(true)
        .build()
        .map_err(|source| VocabularyError::Pattern { table, source })
}
