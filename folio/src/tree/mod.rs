// Tree builder - grouped table of contents

use crate::classifier::{PathClassifier, PathKind};
use crate::document::Document;
use crate::ordering::{Comparator, SortKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One top-level section with its ordered chapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// The path segment that identifies the group.
    pub id: String,
    /// The group's own index document, or a synthesized stand-in when no
    /// index document exists.
    #[serde(flatten)]
    pub index: Document,
    /// True when `index` was synthesized.
    #[serde(default)]
    pub placeholder: bool,
    pub children: Vec<Document>,
}

impl Group {
    pub fn path(&self) -> &str {
        &self.index.path
    }

    /// Display title; falls back to the group id.
    pub fn title(&self) -> &str {
        self.index.title.as_deref().unwrap_or(&self.id)
    }
}

/// Builds the grouped view from a flat document set.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    classifier: PathClassifier,
    comparator: Comparator,
}

impl TreeBuilder {
    pub fn new(classifier: PathClassifier, comparator: Comparator) -> Self {
        TreeBuilder {
            classifier,
            comparator,
        }
    }

    /// Bucket, materialize and order the groups. Specials and documents that
    /// are neither group indexes nor leaves are ignored.
    pub fn build(&self, docs: &[Document]) -> Vec<Group> {
        // Phase 1: classify into buckets. Group ids keep first-seen order so
        // equal-ranked groups come out in input order.
        let mut ids: Vec<String> = Vec::new();
        let mut indexes: HashMap<String, &Document> = HashMap::new();
        let mut leaves: HashMap<String, Vec<&Document>> = HashMap::new();

        for doc in docs {
            let kind = self.classifier.classify(&doc.path);
            let Some(id) = kind.group() else { continue };
            if !indexes.contains_key(id) && !leaves.contains_key(id) {
                ids.push(id.to_string());
            }
            match kind {
                PathKind::GroupIndex(ref id) => {
                    if indexes.insert(id.clone(), doc).is_some() {
                        log::debug!("Duplicate index for group '{id}', keeping {}", doc.path);
                    }
                }
                PathKind::Leaf(ref id) => leaves.entry(id.clone()).or_default().push(doc),
                _ => {}
            }
        }

        // Phase 2: materialize.
        let mut groups: Vec<Group> = ids
            .into_iter()
            .map(|id| {
                let mut children: Vec<Document> = leaves
                    .remove(&id)
                    .unwrap_or_default()
                    .into_iter()
                    .cloned()
                    .collect();
                self.comparator.sort(&mut children, SortKey::Order);

                match indexes.get(&id) {
                    Some(index) => Group {
                        id,
                        index: (*index).clone(),
                        placeholder: false,
                        children,
                    },
                    None => {
                        // Only reachable through a leaf, so children is non-empty.
                        let path = children
                            .first()
                            .map(|c| self.classifier.group_path(&c.path, &id))
                            .unwrap_or_default();
                        Group {
                            index: Document::new(path).with_title(id.clone()),
                            id,
                            placeholder: true,
                            children,
                        }
                    }
                }
            })
            .collect();

        self.comparator
            .sort_by_key(&mut groups, SortKey::GroupOrder, |g| &g.index);

        // Outbound groups always carry a title; ordering above still saw the
        // index as written.
        for group in &mut groups {
            if group.index.title.is_none() {
                group.index.title = Some(group.id.clone());
            }
        }
        groups
    }
}
