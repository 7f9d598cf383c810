use std::sync::OnceLock;

use yenslip_core::ParseResult;

use crate::assemble::assemble;
use crate::classify::Classifier;
use crate::normalize::normalize_lines;
use crate::region::detect_region;
use crate::total::resolve_total;
use crate::vocab::{Vocabulary, VocabularyError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Drop an item identical to the one right before it.
    pub dedupe_adjacent: bool,
}

/// Turns the OCR lines of one receipt into items and a total.
///
/// Holds only immutable compiled tables, so one instance can serve any
/// number of threads.
#[derive(Debug, Clone)]
pub struct Extractor {
    classifier: Classifier,
    options: ParseOptions,
}

impl Extractor {
    pub fn new(vocab: &Vocabulary) -> Result<Self, VocabularyError> {
        Ok(Self {
            classifier: Classifier::new(vocab)?,
            options: ParseOptions::default(),
        })
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Shared extractor for the built-in convenience-store vocabulary.
    pub fn default_layout() -> &'static Extractor {
        static DEFAULT: OnceLock<Extractor> = OnceLock::new();
        DEFAULT.get_or_init(|| {
            Extractor::new(&Vocabulary::default()).expect("invalid default vocabulary")
        })
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn extract<S: AsRef<str>>(&self, raw_lines: &[S]) -> ParseResult {
        let lines = normalize_lines(raw_lines);
        let region = detect_region(&self.classifier, &lines);

        let mut items = assemble(&self.classifier, region.slice(&lines));
        if self.options.dedupe_adjacent {
            items.dedup();
        }
        let total = resolve_total(&self.classifier, &lines, region);

        tracing::debug!(
            lines = lines.len(),
            region_start = region.start,
            region_end = region.end,
            items = items.len(),
            total = total.map(|t| t.amount()),
            "receipt parsed"
        );

        ParseResult::new(items, total)
    }
}

/// Parse with the built-in vocabulary.
pub fn parse_receipt_lines<S: AsRef<str>>(raw_lines: &[S]) -> ParseResult {
    Extractor::default_layout().extract(raw_lines)
}
