use yenslip_core::Item;

use crate::classify::{Classifier, LineRole};
use crate::name::{sanitize_name, strip_rate_marker};
use crate::price;

/// Single-slot state of the item state machine: a name line still waiting
/// for its price.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembler {
    pending_name: Option<String>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_name(&self) -> Option<&str> {
        self.pending_name.as_deref()
    }

    /// Feed one classified line; returns the item it completes, if any.
    pub fn step(&mut self, role: LineRole, line: &str) -> Option<Item> {
        match role {
            LineRole::NameCandidate => {
                // An unpaired earlier name is abandoned.
                self.pending_name = Some(line.to_string());
                None
            }
            LineRole::PricedItem => {
                let pending = self.pending_name.take();
                let priced = price::split_trailing_price(strip_rate_marker(line))?;
                let mut name = sanitize_name(priced.head);
                if name.is_empty() {
                    name = pending.as_deref().map(sanitize_name).unwrap_or_default();
                }
                Item::new(name, priced.amount).ok()
            }
            LineRole::PriceOnly => {
                let pending = self.pending_name.take()?;
                let amount = price::price_only(strip_rate_marker(line))?;
                Item::new(sanitize_name(&pending), amount).ok()
            }
            LineRole::Noise | LineRole::TotalMarker | LineRole::Unknown => {
                self.pending_name = None;
                None
            }
        }
    }
}

/// Run the state machine over `lines` (already normalized and narrowed to
/// the item region). Items come out in line order.
pub fn assemble<S: AsRef<str>>(classifier: &Classifier, lines: &[S]) -> Vec<Item> {
    let mut assembler = Assembler::new();
    let mut items = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        let next = lines.get(i + 1).map(AsRef::as_ref);
        let role = classifier.classify(line, next);
        tracing::trace!(line, ?role, "classified");
        if let Some(item) = assembler.step(role, line) {
            items.push(item);
        }
    }

    post_filter(classifier, items)
}

/// Drop items whose name still reads as a tax, payment or total line.
fn post_filter(classifier: &Classifier, mut items: Vec<Item>) -> Vec<Item> {
    items.retain(|item| {
        let keep = !classifier.is_tax_or_payment(item.name())
            && !classifier.is_summary_marker(item.name());
        if !keep {
            tracing::debug!(name = item.name(), "dropped tax/payment item");
        }
        keep
    });
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::Vocabulary;

    fn classifier() -> Classifier {
        Classifier::new(&Vocabulary::default()).unwrap()
    }

    fn pairs(items: &[Item]) -> Vec<(&str, i64)> {
        items.iter().map(|i| (i.name(), i.price().amount())).collect()
    }

    #[test]
    fn name_then_price_pairs() {
        let mut a = Assembler::new();
        assert_eq!(a.step(LineRole::NameCandidate, "Coffee"), None);
        assert_eq!(a.pending_name(), Some("Coffee"));
        let item = a.step(LineRole::PriceOnly, "¥200").unwrap();
        assert_eq!((item.name(), item.price().amount()), ("Coffee", 200));
        assert_eq!(a.pending_name(), None);
    }

    #[test]
    fn later_name_replaces_unpaired_one() {
        let mut a = Assembler::new();
        a.step(LineRole::NameCandidate, "Old Name");
        a.step(LineRole::NameCandidate, "New Name");
        let item = a.step(LineRole::PriceOnly, "¥100").unwrap();
        assert_eq!(item.name(), "New Name");
    }

    #[test]
    fn price_without_name_is_dropped() {
        let mut a = Assembler::new();
        assert_eq!(a.step(LineRole::PriceOnly, "¥100"), None);
    }

    #[test]
    fn noise_and_markers_clear_pending() {
        for role in [LineRole::Noise, LineRole::TotalMarker, LineRole::Unknown] {
            let mut a = Assembler::new();
            a.step(LineRole::NameCandidate, "Coffee");
            assert_eq!(a.step(role, "whatever"), None);
            assert_eq!(a.pending_name(), None);
        }
    }

    #[test]
    fn priced_row_with_punctuation_uses_pending_name() {
        let mut a = Assembler::new();
        a.step(LineRole::NameCandidate, "◎天然水 軽");
        let item = a.step(LineRole::PricedItem, "・ ¥108").unwrap();
        assert_eq!((item.name(), item.price().amount()), ("天然水", 108));
    }

    #[test]
    fn priced_row_with_own_name_discards_pending() {
        let mut a = Assembler::new();
        a.step(LineRole::NameCandidate, "Wrapped");
        let item = a.step(LineRole::PricedItem, "Tea ¥150").unwrap();
        assert_eq!(item.name(), "Tea");
        assert_eq!(a.pending_name(), None);
    }

    #[test]
    fn zero_price_is_not_an_item() {
        let mut a = Assembler::new();
        assert_eq!(a.step(LineRole::PricedItem, "値引 0"), None);
        a.step(LineRole::NameCandidate, "Coffee");
        assert_eq!(a.step(LineRole::PriceOnly, "¥0"), None);
    }

    #[test]
    fn assembles_in_line_order_with_duplicates() {
        let lines = ["Coffee ¥200", "Tea", "¥150", "Coffee ¥200"];
        let items = assemble(&classifier(), &lines);
        assert_eq!(pairs(&items), vec![("Coffee", 200), ("Tea", 150), ("Coffee", 200)]);
    }

    #[test]
    fn post_filter_drops_tax_names() {
        let items = vec![
            Item::new("Coffee", 200).unwrap(),
            Item::new("消費税", 16).unwrap(),
            Item::new("小計", 200).unwrap(),
        ];
        let kept = post_filter(&classifier(), items);
        assert_eq!(pairs(&kept), vec![("Coffee", 200)]);
    }
}
