use yenslip_core::Yen;

use crate::classify::Classifier;
use crate::name::strip_rate_marker;
use crate::price;
use crate::region::Region;

/// How many lines below a bare total label are searched for its amount.
pub const TOTAL_LOOKAHEAD: usize = 3;

/// Find the receipt total: inside the item region first, then anywhere.
pub fn resolve_total<S: AsRef<str>>(classifier: &Classifier, lines: &[S], region: Region) -> Option<Yen> {
    find_total(classifier, region.slice(lines)).or_else(|| {
        tracing::debug!("no total inside region, scanning all lines");
        find_total(classifier, lines)
    })
}

fn find_total<S: AsRef<str>>(classifier: &Classifier, lines: &[S]) -> Option<Yen> {
    let marker = lines
        .iter()
        .position(|l| classifier.is_total_line(l.as_ref()))?;

    lines[marker..]
        .iter()
        .take(1 + TOTAL_LOOKAHEAD)
        .find_map(|l| amount_of(l.as_ref()))
        .map(Yen::new)
}

fn amount_of(line: &str) -> Option<i64> {
    let line = strip_rate_marker(line);
    price::trailing_price(line).or_else(|| price::price_only(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::Vocabulary;

    fn total(lines: &[&str], region: Region) -> Option<i64> {
        let c = Classifier::new(&Vocabulary::default()).unwrap();
        resolve_total(&c, lines, region).map(Yen::amount)
    }

    #[test]
    fn amount_on_marker_line() {
        let lines = ["Coffee ¥200", "合計 ¥1,200"];
        assert_eq!(total(&lines, Region::full(2)), Some(1200));
    }

    #[test]
    fn amount_on_following_line() {
        let lines = ["TOTAL", "¥500"];
        assert_eq!(total(&lines, Region::full(2)), Some(500));
    }

    #[test]
    fn lookahead_is_bounded() {
        let lines = ["TOTAL", "thanks", "see you", "again", "¥500"];
        assert_eq!(total(&lines, Region::full(5)), None);
        let lines = ["TOTAL", "thanks", "see you", "¥500"];
        assert_eq!(total(&lines, Region::full(4)), Some(500));
    }

    #[test]
    fn subtotal_is_not_the_total() {
        let lines = ["小計 ¥900", "外税 ¥72", "合計 ¥972"];
        assert_eq!(total(&lines, Region::full(3)), Some(972));
    }

    #[test]
    fn falls_back_to_whole_sequence() {
        let lines = ["Coffee ¥200", "Tea ¥100", "misc", "TOTAL ¥300"];
        assert_eq!(total(&lines, Region { start: 0, end: 1 }), Some(300));
    }

    #[test]
    fn zero_total_is_kept() {
        assert_eq!(total(&["合計 ¥0"], Region::full(1)), Some(0));
    }

    #[test]
    fn none_when_absent() {
        assert_eq!(total(&["Coffee ¥200"], Region::full(1)), None);
        assert_eq!(total(&[], Region::full(0)), None);
    }
}
