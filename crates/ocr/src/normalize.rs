use unicode_normalization::UnicodeNormalization;

/// The one currency symbol left after normalization.
pub const YEN_SIGN: char = '¥';

const CURRENCY_VARIANTS: &[char] = &['\u{FFE5}', '\u{00A5}'];

/// Canonicalize one raw OCR line.
///
/// NFKC folds full-width ASCII and half-width katakana, every yen sign
/// variant becomes [`YEN_SIGN`], and whitespace runs (tabs and ideographic
/// spaces included) collapse to a single space. Returns `None` when nothing
/// is left. Idempotent.
pub fn normalize_line(raw: &str) -> Option<String> {
    let folded: String = raw
        .nfkc()
        .map(|c| if CURRENCY_VARIANTS.contains(&c) { YEN_SIGN } else { c })
        .collect();
    let line = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    (!line.is_empty()).then_some(line)
}

/// Normalize a batch, dropping lines that end up empty. Order is preserved.
pub fn normalize_lines<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .filter_map(|line| normalize_line(line.as_ref()))
        .collect()
}

/// Whitespace-free, upper-cased form used for token matching.
pub fn compact(line: &str) -> String {
    line.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}
