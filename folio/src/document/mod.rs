// Document I/O - read content files with YAML front matter into source records

use crate::error::Result;
use crate::source::SourceRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::OnceLock;

/// Whether a record is prose or a structured data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Markdown,
    Data,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Markdown => "markdown",
            ContentType::Data => "data",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "markdown" => Some(ContentType::Markdown),
            "data" => Some(ContentType::Data),
            _ => None,
        }
    }

    /// Content type implied by a file extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "md" | "mdc" | "markdown" => ContentType::Markdown,
            _ => ContentType::Data,
        }
    }
}

/// A content document as the engine sees it: a unique path plus the optional
/// front-matter fields that drive grouping and ordering.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(rename = "groupOrder", default, skip_serializing_if = "Option::is_none")]
    pub group_order: Option<i64>,
    #[serde(rename = "type", default)]
    pub content_type: ContentType,
}

impl Document {
    /// Create a markdown document with only a path.
    pub fn new(path: impl Into<String>) -> Self {
        Document {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_group_order(mut self, group_order: i64) -> Self {
        self.group_order = Some(group_order);
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Build a document from a raw source record. Missing or mistyped fields
    /// become `None`; this never fails.
    pub fn from_record(record: &SourceRecord) -> Self {
        let fields = &record.fields;
        Document {
            path: record.path.clone(),
            title: string_field(fields, "title"),
            summary: string_field(fields, "summary"),
            cover: string_field(fields, "cover"),
            order: integer_field(&record.path, fields, "order"),
            group_order: integer_field(&record.path, fields, "groupOrder"),
            content_type: record.content_type,
        }
    }

    /// Title used for ordering: the declared title or the empty string.
    pub fn sort_title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }
}

/// Normalized metadata for one page, ready for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(rename = "groupOrder", default, skip_serializing_if = "Option::is_none")]
    pub group_order: Option<i64>,
    pub path: String,
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    match fields.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn integer_field(path: &str, fields: &Map<String, Value>, name: &str) -> Option<i64> {
    let value = fields.get(name)?;
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::Null => return None,
        _ => None,
    };
    if parsed.is_none() {
        log::debug!("Ignoring non-integer '{name}' in {path}: {value}");
    }
    parsed
}

// ── File reading ──────────────────────────────────────────────────

/// Read one content file into a source record.
///
/// `root` is the content directory; the record path is derived from the
/// file's location relative to it (see [`document_path`]).
pub fn read_source_file(root: &Path, file: &Path) -> Result<SourceRecord> {
    let raw = std::fs::read_to_string(file)?;
    let ext = file.extension().and_then(|e| e.to_str()).unwrap_or("");
    let content_type = ContentType::from_extension(ext);
    let rel = file.strip_prefix(root).unwrap_or(file);

    let fields = match content_type {
        ContentType::Markdown => split_front_matter(&raw)
            .map(|(yaml, _)| parse_yaml_mapping(yaml, file))
            .unwrap_or_default(),
        ContentType::Data if ext.eq_ignore_ascii_case("json") => {
            match serde_json::from_str::<Value>(&raw)? {
                Value::Object(map) => map,
                _ => Map::new(),
            }
        }
        ContentType::Data => parse_yaml_mapping(&raw, file),
    };

    Ok(SourceRecord {
        path: document_path(rel),
        content_type,
        fields,
    })
}

/// Split a markdown file into its front-matter YAML and body.
/// Returns `None` when the file has no front-matter block.
pub fn split_front_matter(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start_matches('\u{feff}');
    let rest = input
        .strip_prefix("---\r\n")
        .or_else(|| input.strip_prefix("---\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }
    None
}

fn parse_yaml_mapping(yaml: &str, file: &Path) -> Map<String, Value> {
    let value: serde_yaml::Value = match serde_yaml::from_str(yaml) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Invalid front matter in {}: {e}", file.display());
            return Map::new();
        }
    };
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Derive a document path from a file path relative to the content root.
///
/// `sections/1.genesis/index.md` becomes `/sections/genesis`: the extension is
/// dropped, numeric ordering prefixes are stripped, segments are slugified and
/// a trailing `index` segment collapses onto its directory.
pub fn document_path(rel: &Path) -> String {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    let prefix = PREFIX.get_or_init(|| Regex::new(r"^\d+\.").expect("static regex"));

    let mut segments: Vec<String> = Vec::new();
    let components: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    let last = components.len().saturating_sub(1);

    for (i, raw) in components.iter().enumerate() {
        let name = if i == last {
            Path::new(raw)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| raw.clone())
        } else {
            raw.clone()
        };
        let name = prefix.replace(&name, "");
        let segment = slug::slugify(&*name);
        if segment.is_empty() {
            continue;
        }
        segments.push(segment);
    }

    if segments.last().map(|s| s == "index").unwrap_or(false) {
        segments.pop();
    }

    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_document_path_index_collapses() {
        assert_eq!(
            document_path(&PathBuf::from("crypto-high/sections/genesis/index.md")),
            "/crypto-high/sections/genesis"
        );
        assert_eq!(document_path(&PathBuf::from("index.md")), "/");
    }

    #[test]
    fn test_document_path_strips_numeric_prefix_and_slugifies() {
        assert_eq!(
            document_path(&PathBuf::from("book/2.Sections/The Bully.md")),
            "/book/sections/the-bully"
        );
    }

    #[test]
    fn test_split_front_matter() {
        let (yaml, body) = split_front_matter("---\ntitle: Intro\n---\n# Hello\n").unwrap();
        assert_eq!(yaml, "title: Intro\n");
        assert_eq!(body, "# Hello\n");
        assert!(split_front_matter("# No front matter").is_none());
        assert!(split_front_matter("---\ntitle: unterminated\n").is_none());
    }

    #[test]
    fn test_read_markdown_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("book/sections/genesis/christmas");
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("index.md");
        std::fs::write(&file, "---\ntitle: Christmas\norder: 1\n---\nBody\n").unwrap();

        let record = read_source_file(tmp.path(), &file).unwrap();
        assert_eq!(record.path, "/book/sections/genesis/christmas");
        assert_eq!(record.content_type, ContentType::Markdown);
        assert_eq!(record.fields["title"], "Christmas");
        assert_eq!(record.fields["order"], 1);
    }

    #[test]
    fn test_read_data_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("meta.yml");
        std::fs::write(&file, "title: Settings\norder: 3\n").unwrap();

        let record = read_source_file(tmp.path(), &file).unwrap();
        assert_eq!(record.path, "/meta");
        assert_eq!(record.content_type, ContentType::Data);
        assert_eq!(record.fields["title"], "Settings");
    }

    #[test]
    fn test_from_record_tolerates_bad_fields() {
        let mut fields = Map::new();
        fields.insert("title".into(), Value::String("Weed".into()));
        fields.insert("order".into(), Value::String("two".into()));
        fields.insert("groupOrder".into(), serde_json::json!(2.0));
        let record = SourceRecord {
            path: "/s/pandemic/weed".into(),
            content_type: ContentType::Markdown,
            fields,
        };

        let doc = Document::from_record(&record);
        assert_eq!(doc.title.as_deref(), Some("Weed"));
        assert_eq!(doc.order, None);
        assert_eq!(doc.group_order, Some(2));
        assert_eq!(doc.summary, None);
    }
}
