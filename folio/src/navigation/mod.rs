// Navigation index - one reading order with prev/next lookups

use crate::classifier::{PathClassifier, PathKind, UNGROUPED};
use crate::document::Document;
use crate::ordering::{Comparator, SortKey};
use std::collections::HashMap;

/// The flat reading sequence over all navigable documents.
///
/// Specials (including those with an unrecognized position) and group index
/// documents are not navigable. Documents are ordered by
/// (`groupOrder`, `order`, title) where a document without its own
/// `groupOrder` inherits the one declared by its group's index document.
#[derive(Debug, Clone, Default)]
pub struct NavigationIndex {
    ordered: Vec<Document>,
    positions: HashMap<String, usize>,
}

impl NavigationIndex {
    pub fn build(docs: &[Document], classifier: &PathClassifier, comparator: &Comparator) -> Self {
        let mut group_orders: HashMap<String, Option<i64>> = HashMap::new();
        for doc in docs {
            if let PathKind::GroupIndex(id) = classifier.classify(&doc.path) {
                group_orders.insert(id, doc.group_order);
            }
        }

        // (sort view, original)
        let mut entries: Vec<(Document, &Document)> = Vec::new();
        for doc in docs {
            match classifier.classify(&doc.path) {
                PathKind::Special(_) | PathKind::GroupIndex(_) => continue,
                _ if classifier.in_specials_area(&doc.path) => {
                    log::debug!("Skipping {} from navigation: unknown special position", doc.path);
                    continue;
                }
                _ => {}
            }

            let mut view = doc.clone();
            if view.group_order.is_none() {
                let group = classifier.infer_group(&doc.path);
                if group != UNGROUPED {
                    view.group_order = group_orders.get(&group).copied().flatten();
                }
            }
            entries.push((view, doc));
        }

        comparator.sort_by_key(&mut entries, SortKey::Navigation, |(view, _)| view);

        let ordered: Vec<Document> = entries.into_iter().map(|(_, doc)| doc.clone()).collect();
        let mut positions = HashMap::with_capacity(ordered.len());
        for (i, doc) in ordered.iter().enumerate() {
            // duplicate paths: first position wins, like a linear scan
            positions.entry(doc.path.clone()).or_insert(i);
        }

        NavigationIndex { ordered, positions }
    }

    /// The full navigation order.
    pub fn ordered(&self) -> &[Document] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Position of `path` in the reading order.
    pub fn position(&self, path: &str) -> Option<usize> {
        self.positions.get(path).copied()
    }

    pub fn get(&self, path: &str) -> Option<&Document> {
        self.position(path).map(|i| &self.ordered[i])
    }

    /// The document after `path`; `None` at the end or for unknown paths.
    pub fn next(&self, path: &str) -> Option<&Document> {
        self.position(path).and_then(|i| self.ordered.get(i + 1))
    }

    /// The document before `path`; `None` at the start or for unknown paths.
    pub fn prev(&self, path: &str) -> Option<&Document> {
        self.position(path)
            .and_then(|i| i.checked_sub(1))
            .map(|i| &self.ordered[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn build(docs: &[Document]) -> NavigationIndex {
        NavigationIndex::build(
            docs,
            &PathClassifier::new("s", "specials"),
            &Comparator::default(),
        )
    }

    fn paths(index: &NavigationIndex) -> Vec<&str> {
        index.ordered().iter().map(|d| d.path.as_str()).collect()
    }

    fn scenario() -> Vec<Document> {
        vec![
            Document::new("/s/genesis").with_title("Genesis").with_group_order(1),
            Document::new("/s/genesis/christmas").with_title("Christmas").with_order(1),
            Document::new("/s/genesis/bully").with_title("The Bully").with_order(2),
            Document::new("/s/pandemic").with_title("Pandemic").with_group_order(2),
            Document::new("/s/pandemic/weed").with_title("Weed").with_order(1),
        ]
    }

    #[test]
    fn test_scenario_order() {
        let index = build(&scenario());
        assert_eq!(
            paths(&index),
            vec!["/s/genesis/christmas", "/s/genesis/bully", "/s/pandemic/weed"]
        );
    }

    #[test]
    fn test_groups_order_reversed_by_group_order() {
        let mut docs = scenario();
        docs[0].group_order = Some(3);
        let index = build(&docs);
        assert_eq!(
            paths(&index),
            vec!["/s/pandemic/weed", "/s/genesis/christmas", "/s/genesis/bully"]
        );
    }

    #[test]
    fn test_round_trip() {
        let index = build(&scenario());
        let (a, b, c) = ("/s/genesis/christmas", "/s/genesis/bully", "/s/pandemic/weed");
        assert_eq!(index.next(a).map(|d| d.path.as_str()), Some(b));
        assert_eq!(index.prev(b).map(|d| d.path.as_str()), Some(a));
        assert_eq!(index.next(b).map(|d| d.path.as_str()), Some(c));
        assert!(index.next(c).is_none());
        assert!(index.prev(a).is_none());
        assert_eq!(index.get(c).and_then(|d| d.title.as_deref()), Some("Weed"));
    }

    #[test]
    fn test_unknown_path() {
        let index = build(&scenario());
        assert!(index.get("/nope").is_none());
        assert!(index.next("/nope").is_none());
        assert!(index.prev("/nope").is_none());
        // group indexes are not navigable
        assert!(index.get("/s/genesis").is_none());
    }

    #[test]
    fn test_specials_excluded_and_root_last() {
        let mut docs = scenario();
        docs.push(Document::new("/specials/front/dedicated").with_order(0));
        docs.push(Document::new("/specials/middle/odd").with_order(0));
        docs.push(Document::new("/intro").with_title("Intro").with_order(0));
        let index = build(&docs);
        assert_eq!(
            paths(&index),
            vec![
                "/s/genesis/christmas",
                "/s/genesis/bully",
                "/s/pandemic/weed",
                "/intro"
            ]
        );
    }

    #[test]
    fn test_returns_original_documents() {
        let index = build(&scenario());
        // the inherited groupOrder only affects sorting
        assert_eq!(index.get("/s/pandemic/weed").unwrap().group_order, None);
    }

    #[test]
    fn test_empty() {
        let index = build(&[]);
        assert!(index.is_empty());
        assert!(index.next("/a").is_none());
    }
}
