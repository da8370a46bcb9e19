// Specials selector - front and end inserts outside the main hierarchy

use crate::classifier::{PathClassifier, PathKind, Position};
use crate::document::{ContentType, Document};
use crate::ordering::{Comparator, SortKey};
use crate::source::{ContentQuery, TYPE_FIELD};

/// Specials at `position`, prose only, ordered by (`order`, title).
/// Returns an empty list when there are none.
pub fn select(
    docs: &[Document],
    position: Position,
    classifier: &PathClassifier,
    comparator: &Comparator,
) -> Vec<Document> {
    let mut selected: Vec<Document> = docs
        .iter()
        .filter(|d| d.content_type == ContentType::Markdown)
        .filter(|d| classifier.classify(&d.path) == PathKind::Special(position))
        .cloned()
        .collect();
    comparator.sort(&mut selected, SortKey::Order);
    selected
}

/// The query that fetches the specials for `position` straight from a
/// content source: everything under `<root>/<specials>/<position>`, prose
/// only, projected onto the fields needed to order and link them.
pub fn specials_query(root: &str, specials_marker: &str, position: Position) -> ContentQuery {
    let root = root.trim_end_matches('/');
    ContentQuery::new()
        .path_prefix(format!("{root}/{specials_marker}/{position}/"))
        .where_eq(TYPE_FIELD, ContentType::Markdown.as_str())
        .select(["path", "title", "order"])
}
