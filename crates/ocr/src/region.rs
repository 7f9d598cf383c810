use crate::classify::Classifier;

/// Lines past the summary marker kept in the region; the total amount is
/// usually printed one or two lines below its label.
pub const FOOTER_SLACK: usize = 2;

/// Inclusive index range into the normalized lines believed to hold the
/// item block. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

impl Region {
    pub fn full(len: usize) -> Self {
        Region { start: 0, end: len.saturating_sub(1) }
    }

    /// The lines this region covers; empty only when `lines` is.
    pub fn slice<'a, S>(&self, lines: &'a [S]) -> &'a [S] {
        let Some(last) = lines.len().checked_sub(1) else {
            return &[];
        };
        let end = self.end.min(last);
        &lines[self.start.min(end)..=end]
    }
}

/// Bracket the item block between the receipt banner and the summary marker.
pub fn detect_region<S: AsRef<str>>(classifier: &Classifier, lines: &[S]) -> Region {
    let Some(last) = lines.len().checked_sub(1) else {
        return Region::full(0);
    };

    let start = lines
        .iter()
        .position(|l| classifier.is_header(l.as_ref()))
        .map_or(0, |i| (i + 1).min(last));

    let end = lines[start..]
        .iter()
        .position(|l| classifier.is_summary_marker(l.as_ref()))
        .map_or(last, |i| (start + i + FOOTER_SLACK).min(last));

    Region { start, end }
}
