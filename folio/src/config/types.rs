use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the config file inside a content directory.
pub const CONFIG_FILE: &str = "folio.yaml";

/// Numeric priority substituted for an absent `order` / `groupOrder`.
pub const DEFAULT_SENTINEL: i64 = 999;

/// Top-level configuration parsed from folio.yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    /// Path prefix every indexed document must live under (e.g. `/crypto-high`).
    /// Empty means the whole content tree.
    pub root: String,
    /// Path segment that marks the sections container.
    pub sections_marker: String,
    /// Path segment that marks the specials container.
    pub specials_marker: String,
    /// Priority used when `order` or `groupOrder` is missing.
    pub sentinel: i64,
    /// Title shown for documents that do not declare one.
    pub fallback_title: String,
    /// File extensions indexed by the file-backed source.
    pub extensions: Vec<String>,
    /// Location of the SQLite index, relative to the content directory.
    pub index_path: PathBuf,
}

impl Default for FolioConfig {
    fn default() -> Self {
        FolioConfig {
            root: String::new(),
            sections_marker: "sections".to_string(),
            specials_marker: "specials".to_string(),
            sentinel: DEFAULT_SENTINEL,
            fallback_title: "Untitled".to_string(),
            extensions: ["md", "mdc", "yml", "yaml", "json"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            index_path: PathBuf::from("_folio.db"),
        }
    }
}

impl FolioConfig {
    /// The root prefix normalized to `/segment/...` without a trailing slash.
    pub fn root_prefix(&self) -> String {
        let trimmed = self.root.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }

    /// Whether files with this extension are indexed.
    pub fn indexes_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// The config file and the index live next to the content but are not
    /// content. `rel` is relative to the content directory.
    pub fn is_reserved(&self, rel: &Path) -> bool {
        rel == Path::new(CONFIG_FILE) || rel == self.index_path.as_path()
    }
}
