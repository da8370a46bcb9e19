// Ordering comparator - numeric priority with a title tie-break

use crate::config::DEFAULT_SENTINEL;
use crate::document::Document;
use std::cmp::Ordering;

/// Which numeric field (or tuple) leads the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Siblings within a group: (`order`, title).
    Order,
    /// Top-level groups: (`groupOrder`, title).
    GroupOrder,
    /// The global reading sequence: (`groupOrder`, `order`, title).
    Navigation,
}

/// Compares documents by declared priority, substituting `sentinel` for
/// missing values. Ties that survive the title comparison are left to the
/// stability of the sort that uses this comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparator {
    sentinel: i64,
}

impl Default for Comparator {
    fn default() -> Self {
        Comparator {
            sentinel: DEFAULT_SENTINEL,
        }
    }
}

impl Comparator {
    pub fn new(sentinel: i64) -> Self {
        Comparator { sentinel }
    }

    pub fn sentinel(&self) -> i64 {
        self.sentinel
    }

    pub fn compare(&self, a: &Document, b: &Document, key: SortKey) -> Ordering {
        let rank = |field: Option<i64>| field.unwrap_or(self.sentinel);
        let numeric = match key {
            SortKey::Order => rank(a.order).cmp(&rank(b.order)),
            SortKey::GroupOrder => rank(a.group_order).cmp(&rank(b.group_order)),
            SortKey::Navigation => (rank(a.group_order), rank(a.order))
                .cmp(&(rank(b.group_order), rank(b.order))),
        };
        numeric.then_with(|| compare_titles(a.sort_title(), b.sort_title()))
    }

    /// Stable in-place sort by `key`.
    pub fn sort(&self, docs: &mut [Document], key: SortKey) {
        docs.sort_by(|a, b| self.compare(a, b, key));
    }

    /// Stable sort of arbitrary items that expose a document view.
    pub fn sort_by_key<T, F>(&self, items: &mut [T], key: SortKey, doc: F)
    where
        F: Fn(&T) -> &Document,
    {
        items.sort_by(|a, b| self.compare(doc(a), doc(b), key));
    }
}

/// Locale-style title comparison. Titles are compared with accents and case
/// folded away first, so "Émile" sorts with the e's. Ties fall back to the
/// case-folded text (unaccented before accented), then lowercase before
/// uppercase, then code points so distinct titles never tie.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    let base = |s: &str| deunicode::deunicode(s).to_lowercase();
    let folded = |s: &str| s.to_lowercase();

    base(a)
        .cmp(&base(b))
        .then_with(|| folded(a).cmp(&folded(b)))
        .then_with(|| {
            a.chars()
                .map(char::is_uppercase)
                .cmp(b.chars().map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}
