// Path classifier - where a document sits in the content hierarchy

use crate::config::FolioConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Group name reported for documents that have no group segment.
pub const UNGROUPED: &str = "specials-or-root";

/// Where a special is inserted relative to the main content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Front,
    End,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Front => "front",
            Position::End => "end",
        }
    }

    pub fn parse(segment: &str) -> Option<Self> {
        match segment {
            "front" => Some(Position::Front),
            "end" => Some(Position::End),
            _ => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The classification of a single document path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PathKind {
    Special(Position),
    GroupIndex(String),
    Leaf(String),
    Other,
}

impl PathKind {
    pub fn is_special(&self) -> bool {
        matches!(self, PathKind::Special(_))
    }

    /// The group id for group indexes and leaves.
    pub fn group(&self) -> Option<&str> {
        match self {
            PathKind::GroupIndex(id) | PathKind::Leaf(id) => Some(id),
            _ => None,
        }
    }
}

/// Classifies paths using the configured sections/specials markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathClassifier {
    sections_marker: String,
    specials_marker: String,
}

impl Default for PathClassifier {
    fn default() -> Self {
        PathClassifier::new("sections", "specials")
    }
}

impl PathClassifier {
    pub fn new(sections_marker: impl Into<String>, specials_marker: impl Into<String>) -> Self {
        PathClassifier {
            sections_marker: sections_marker.into(),
            specials_marker: specials_marker.into(),
        }
    }

    pub fn from_config(config: &FolioConfig) -> Self {
        PathClassifier::new(&config.sections_marker, &config.specials_marker)
    }

    pub fn sections_marker(&self) -> &str {
        &self.sections_marker
    }

    pub fn specials_marker(&self) -> &str {
        &self.specials_marker
    }

    /// Classify a path. Total: malformed or unexpected shapes are `Other`.
    ///
    /// The specials marker takes precedence over the sections marker. Nesting
    /// deeper than one level below a group is not supported and yields `Other`.
    pub fn classify(&self, path: &str) -> PathKind {
        let parts = segments(path);

        if let Some(i) = parts.iter().position(|p| *p == self.specials_marker) {
            return match parts.get(i + 1).and_then(|s| Position::parse(s)) {
                Some(position) => PathKind::Special(position),
                None => PathKind::Other,
            };
        }

        let Some(i) = parts.iter().position(|p| *p == self.sections_marker) else {
            return PathKind::Other;
        };
        let Some(group) = parts.get(i + 1) else {
            return PathKind::Other;
        };
        match parts.len() - (i + 2) {
            0 => PathKind::GroupIndex(group.to_string()),
            1 => PathKind::Leaf(group.to_string()),
            _ => PathKind::Other,
        }
    }

    /// Whether the path lies under the specials marker, whatever its position
    /// segment says.
    pub fn in_specials_area(&self, path: &str) -> bool {
        segments(path).contains(&self.specials_marker.as_str())
    }

    /// The segment following the sections marker at any depth, or
    /// [`UNGROUPED`] when there is none.
    pub fn infer_group(&self, path: &str) -> String {
        let parts = segments(path);
        parts
            .iter()
            .position(|p| *p == self.sections_marker)
            .and_then(|i| parts.get(i + 1))
            .map(|g| g.to_string())
            .unwrap_or_else(|| UNGROUPED.to_string())
    }

    /// The path of a group's index document, built from the portion of
    /// `member_path` that precedes the sections marker.
    pub fn group_path(&self, member_path: &str, group: &str) -> String {
        let parts = segments(member_path);
        let base = match parts.iter().position(|p| *p == self.sections_marker) {
            Some(i) => &parts[..i],
            None => &parts[..0],
        };
        let mut out = String::new();
        for seg in base {
            out.push('/');
            out.push_str(seg);
        }
        out.push('/');
        out.push_str(&self.sections_marker);
        out.push('/');
        out.push_str(group);
        out
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_shapes() {
        let c = PathClassifier::default();
        assert_eq!(
            c.classify("/crypto-high/sections/genesis/christmas"),
            PathKind::Leaf("genesis".into())
        );
        assert_eq!(
            c.classify("/crypto-high/sections/genesis"),
            PathKind::GroupIndex("genesis".into())
        );
        assert_eq!(
            c.classify("/crypto-high/specials/front/dedicated"),
            PathKind::Special(Position::Front)
        );
        assert_eq!(
            c.classify("/crypto-high/specials/end/afterward"),
            PathKind::Special(Position::End)
        );
    }

    #[test]
    fn test_classify_other() {
        let c = PathClassifier::default();
        assert_eq!(c.classify("/crypto-high/intro"), PathKind::Other);
        assert_eq!(c.classify("/crypto-high/sections"), PathKind::Other);
        assert_eq!(c.classify("/crypto-high/sections/genesis/a/b"), PathKind::Other);
        assert_eq!(c.classify("/crypto-high/specials/middle/x"), PathKind::Other);
        assert_eq!(c.classify("/crypto-high/specials"), PathKind::Other);
        assert_eq!(c.classify(""), PathKind::Other);
        assert_eq!(c.classify("///"), PathKind::Other);
    }

    #[test]
    fn test_empty_segments_ignored() {
        let c = PathClassifier::default();
        assert_eq!(
            c.classify("//book//sections/genesis//"),
            PathKind::GroupIndex("genesis".into())
        );
    }

    #[test]
    fn test_specials_take_precedence() {
        let c = PathClassifier::default();
        assert_eq!(
            c.classify("/book/specials/end/sections/x"),
            PathKind::Special(Position::End)
        );
        assert!(c.in_specials_area("/book/specials/middle/x"));
        assert!(!c.in_specials_area("/book/sections/g"));
    }

    #[test]
    fn test_custom_markers() {
        let c = PathClassifier::new("s", "extras");
        assert_eq!(c.classify("/s/genesis"), PathKind::GroupIndex("genesis".into()));
        assert_eq!(c.classify("/s/genesis/weed"), PathKind::Leaf("genesis".into()));
        assert_eq!(c.classify("/extras/front/x"), PathKind::Special(Position::Front));
        assert_eq!(c.classify("/sections/genesis"), PathKind::Other);
    }

    #[test]
    fn test_infer_group_and_group_path() {
        let c = PathClassifier::default();
        assert_eq!(c.infer_group("/book/sections/genesis/a/b"), "genesis");
        assert_eq!(c.infer_group("/book/intro"), UNGROUPED);
        assert_eq!(
            c.group_path("/book/sections/genesis/christmas", "genesis"),
            "/book/sections/genesis"
        );
        assert_eq!(c.group_path("/sections/g/x", "g"), "/sections/g");
    }
}
