//! Content sources: the query capability the engine reads documents through.
//!
//! A [`ContentQuery`] describes what to fetch (path prefix, field equality
//! filters, field projection) and any [`ContentSource`] executes it. Two
//! sources ship with the crate: [`MemorySource`] for synthetic document sets
//! and [`IndexedSource`], which indexes a content directory into SQLite.

mod index;
mod memory;

pub use index::IndexedSource;
pub use memory::MemorySource;

use crate::document::ContentType;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the pseudo-field that filters on [`ContentType`].
pub const TYPE_FIELD: &str = "type";

/// A raw record as supplied by a content source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub path: String,
    #[serde(rename = "type", default)]
    pub content_type: ContentType,
    /// Front-matter fields, keyed by their authored names (`groupOrder`, ...).
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl SourceRecord {
    pub fn new(path: impl Into<String>, content_type: ContentType) -> Self {
        SourceRecord {
            path: path.into(),
            content_type,
            fields: Map::new(),
        }
    }

    /// Set a field, builder style.
    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Whether the record satisfies every filter of the query.
    pub fn matches(&self, query: &ContentQuery) -> bool {
        if let Some(prefix) = &query.path_prefix {
            if !self.path.starts_with(prefix.as_str()) {
                return false;
            }
        }
        query.filters.iter().all(|(name, expected)| {
            if name == TYPE_FIELD {
                return expected.as_str() == Some(self.content_type.as_str());
            }
            self.fields.get(name) == Some(expected)
        })
    }

    /// Keep only the projected fields. `path` and the content type always survive.
    pub fn project(mut self, fields: &[String]) -> Self {
        self.fields.retain(|name, _| fields.iter().any(|f| f == name));
        self
    }
}

/// A typed query over a content source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentQuery {
    path_prefix: Option<String>,
    filters: Vec<(String, Value)>,
    fields: Option<Vec<String>>,
}

impl ContentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to documents whose path starts with `prefix`.
    pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    /// Restrict to documents whose field `name` equals `value`.
    /// The field `type` filters on the content type (`markdown` / `data`).
    pub fn where_eq(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((name.into(), value.into()));
        self
    }

    /// Project the result onto the given fields.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Run the query against a source.
    pub fn execute(&self, source: &dyn ContentSource) -> Result<Vec<SourceRecord>> {
        source.execute(self)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.path_prefix.as_deref()
    }

    pub fn filters(&self) -> &[(String, Value)] {
        &self.filters
    }

    pub fn projection(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }
}

/// Anything that can answer a [`ContentQuery`].
///
/// Implementations return records sorted by path and must return an empty
/// vector, not an error, when nothing matches.
pub trait ContentSource: Send + Sync {
    fn execute(&self, query: &ContentQuery) -> Result<Vec<SourceRecord>>;

    /// Re-read the underlying content, if the source caches it.
    fn refresh(&self) -> Result<()> {
        Ok(())
    }
}
