/// Bullets and ornaments OCR leaves in front of item names.
const DECORATIVE_GLYPHS: &[char] = &[
    '-', '*', '•', '·', '●', '■', '◆', '◇', '◎', '○', '□', '★', '☆', '・', '※', '.', ',',
];

/// Reduced-rate marker; OCR glues it onto the preceding token, so it is
/// stripped even when attached.
pub const REDUCED_RATE_MARKER: char = '軽';

/// Tax annotations printed after a name or amount. Apart from the
/// reduced-rate marker they only count when standing alone.
const RATE_MARKERS: &[char] = &[REDUCED_RATE_MARKER, '内', '外'];

/// Drop one trailing tax/rate annotation character.
pub fn strip_rate_marker(text: &str) -> &str {
    let trimmed = text.trim_end();
    let Some(last) = trimmed.chars().next_back() else {
        return trimmed;
    };
    if !RATE_MARKERS.contains(&last) {
        return trimmed;
    }
    let head = &trimmed[..trimmed.len() - last.len_utf8()];
    let standalone = head
        .chars()
        .next_back()
        .map_or(true, |prev| prev.is_whitespace() || prev.is_ascii_digit() || prev == '円');
    if last == REDUCED_RATE_MARKER || standalone {
        head.trim_end()
    } else {
        trimmed
    }
}

/// Clean the text part of an item row. An empty result means the row had
/// no usable name.
pub fn sanitize_name(text: &str) -> String {
    let body = text.trim_start_matches(|c: char| c.is_whitespace() || DECORATIVE_GLYPHS.contains(&c));
    strip_rate_marker(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_bullets() {
        assert_eq!(sanitize_name("◎ 天然水"), "天然水");
        assert_eq!(sanitize_name("・*Coffee"), "Coffee");
    }

    #[test]
    fn strips_reduced_rate_marker() {
        assert_eq!(sanitize_name("天然水 軽"), "天然水");
        assert_eq!(sanitize_name("おにぎり軽"), "おにぎり");
    }

    #[test]
    fn attached_inclusive_exclusive_markers_stay() {
        assert_eq!(sanitize_name("ご案内"), "ご案内");
        assert_eq!(sanitize_name("Cola 外"), "Cola");
        assert_eq!(sanitize_name("Cola 内"), "Cola");
    }

    #[test]
    fn strips_only_one_marker() {
        assert_eq!(sanitize_name("Tea 軽 軽"), "Tea 軽");
    }

    #[test]
    fn marker_after_price_token() {
        assert_eq!(strip_rate_marker("¥150軽"), "¥150");
        assert_eq!(strip_rate_marker("150 外"), "150");
        assert_eq!(strip_rate_marker("¥150"), "¥150");
    }

    #[test]
    fn collapses_inner_whitespace() {
        assert_eq!(sanitize_name("  Bottled   Water 3 "), "Bottled Water 3");
    }

    #[test]
    fn punctuation_only_is_empty() {
        assert_eq!(sanitize_name("・ ."), "");
        assert_eq!(sanitize_name("軽"), "");
        assert_eq!(sanitize_name(""), "");
    }
}
