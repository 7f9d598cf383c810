//! Trailing and standalone yen amounts.

use crate::normalize::compact;

/// Receipts in this layout never print an amount wider than five digits.
pub const MAX_PRICE_DIGITS: usize = 5;

re!(re_trailing_price, r"(?:¥\s*)?([0-9][0-9,]*)(?:\s*円)?\s*$");
re!(re_price_only, r"^¥?([0-9][0-9,]*)円?$");

/// A price found at the end of a line, plus the text in front of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailingPrice<'a> {
    pub amount: i64,
    /// Everything before the price token, trailing spaces removed.
    pub head: &'a str,
    /// Whether the token carried a `¥` prefix or a `円` suffix.
    pub marked: bool,
}

/// Split `line` into its leading text and a trailing price token.
///
/// The whole digit run must fit the grammar; an over-long run yields `None`
/// rather than a truncated number.
pub fn split_trailing_price(line: &str) -> Option<TrailingPrice<'_>> {
    let caps = re_trailing_price().captures(line)?;
    let token = caps.get(0)?;
    let digits = caps.get(1)?;
    let amount = parse_digits(digits.as_str())?;
    Some(TrailingPrice {
        amount,
        head: line[..token.start()].trim_end(),
        marked: token.as_str().trim() != digits.as_str(),
    })
}

pub fn trailing_price(line: &str) -> Option<i64> {
    split_trailing_price(line).map(|p| p.amount)
}

/// Amount of a line that is nothing but a (possibly `¥`-prefixed) number.
pub fn price_only(line: &str) -> Option<i64> {
    let compacted = compact(line);
    let caps = re_price_only().captures(&compacted)?;
    parse_digits(caps.get(1)?.as_str())
}

fn parse_digits(raw: &str) -> Option<i64> {
    let digits: String = raw.chars().filter(|c| *c != ',').collect();
    if digits.is_empty() || digits.len() > MAX_PRICE_DIGITS {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_and_marked_tokens() {
        let p = split_trailing_price("Coffee ¥200").unwrap();
        assert_eq!((p.amount, p.head, p.marked), (200, "Coffee", true));

        let p = split_trailing_price("Coffee 200").unwrap();
        assert_eq!((p.amount, p.head, p.marked), (200, "Coffee", false));

        let p = split_trailing_price("お茶 150 円").unwrap();
        assert_eq!((p.amount, p.head, p.marked), (150, "お茶", true));
    }

    #[test]
    fn commas_are_removed() {
        assert_eq!(trailing_price("合計 ¥1,234"), Some(1234));
        assert_eq!(price_only("¥12,345"), Some(12345));
    }

    #[test]
    fn too_many_digits_is_no_price() {
        assert_eq!(trailing_price("JAN 4901234567894"), None);
        assert_eq!(trailing_price("¥123,456"), None);
        assert_eq!(price_only("123456"), None);
    }

    #[test]
    fn zero_is_a_price_not_an_absence() {
        assert_eq!(trailing_price("値引 0"), Some(0));
        assert_eq!(price_only("¥0"), Some(0));
    }

    #[test]
    fn no_trailing_digits() {
        assert_eq!(trailing_price("Rice Ball A"), None);
        assert_eq!(trailing_price("¥"), None);
        assert_eq!(trailing_price(""), None);
    }

    #[test]
    fn price_only_requires_whole_line() {
        assert_eq!(price_only("¥ 120"), Some(120));
        assert_eq!(price_only("120円"), Some(120));
        assert_eq!(price_only("Coffee ¥200"), None);
        assert_eq!(price_only("12:30"), None);
    }

    #[test]
    fn head_of_price_only_line_is_empty() {
        let p = split_trailing_price("¥500").unwrap();
        assert_eq!(p.head, "");
        assert_eq!(p.amount, 500);
    }
}
