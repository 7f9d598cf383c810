macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static regex::Regex {
            static R: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
            R.get_or_init(|| regex::Regex::new($pat).expect("invalid regex"))
        }
    };
}

pub mod assemble;
pub mod azure;
pub mod classify;
pub mod extract;
pub mod hash;
pub mod name;
pub mod normalize;
pub mod pipeline;
pub mod price;
pub mod recognizer;
pub mod region;
pub mod total;
pub mod vocab;

pub use azure::{DocumentIntelligenceRecognizer, VisionReadRecognizer};
pub use classify::{Classifier, LineRole};
pub use extract::{parse_receipt_lines, Extractor, ParseOptions};
pub use hash::{sha256_bytes, to_hex};
pub use normalize::normalize_line;
pub use pipeline::{PipelineError, ProcessedReceipt, ReceiptPipeline};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError, Recognition};
pub use region::{detect_region, Region};
pub use vocab::{Vocabulary, VocabularyError};
pub use yenslip_core::{Item, ParseResult, Yen};
