use super::{ContentQuery, ContentSource, SourceRecord, TYPE_FIELD};
use crate::config::FolioConfig;
use crate::document::{self, ContentType};
use crate::error::{FolioError, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// The SQLite table layer behind [`IndexedSource`].
struct IndexDb {
    conn: Connection,
}

impl IndexDb {
    fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = IndexDb { conn };
        db.initialize_tables()?;
        Ok(db)
    }

    fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = IndexDb { conn };
        db.initialize_tables()?;
        Ok(db)
    }

    fn initialize_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
                path TEXT PRIMARY KEY,
                content_type TEXT NOT NULL,
                file TEXT NOT NULL,
                data_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_type ON documents(content_type);

            CREATE TABLE IF NOT EXISTS index_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    // ── Document Index ───────────────────────────────────────────────

    /// Replace the whole document table with `records` in one transaction.
    fn replace_all(&mut self, records: &[(SourceRecord, String)]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM documents", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO documents (path, content_type, file, data_json)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (record, file) in records {
                let data_json = serde_json::to_string(&record.fields)?;
                stmt.execute(params![
                    record.path,
                    record.content_type.as_str(),
                    file,
                    data_json
                ])?;
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO index_state (key, value) VALUES ('indexed_at', ?1)",
            params![Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn query(&self, query: &ContentQuery) -> Result<Vec<SourceRecord>> {
        let mut sql = String::from("SELECT path, content_type, data_json FROM documents WHERE 1 = 1");
        let mut args: Vec<SqlValue> = Vec::new();

        if let Some(prefix) = query.prefix() {
            // substr is case-sensitive, unlike LIKE
            sql.push_str(" AND substr(path, 1, ?) = ?");
            args.push(SqlValue::Integer(prefix.chars().count() as i64));
            args.push(SqlValue::Text(prefix.to_string()));
        }

        for (name, expected) in query.filters() {
            if name == TYPE_FIELD {
                sql.push_str(" AND content_type = ?");
                args.push(SqlValue::Text(
                    expected.as_str().unwrap_or_default().to_string(),
                ));
                continue;
            }
            args.push(SqlValue::Text(json_path(name)));
            match expected {
                Value::Null => sql.push_str(" AND json_type(data_json, ?) = 'null'"),
                Value::Bool(b) => {
                    sql.push_str(" AND json_extract(data_json, ?) = ?");
                    args.push(SqlValue::Integer(i64::from(*b)));
                }
                Value::Number(n) => {
                    sql.push_str(" AND json_extract(data_json, ?) = ?");
                    args.push(match n.as_i64() {
                        Some(i) => SqlValue::Integer(i),
                        None => SqlValue::Real(n.as_f64().unwrap_or_default()),
                    });
                }
                Value::String(s) => {
                    sql.push_str(" AND json_type(data_json, ?) = 'text'");
                    sql.push_str(" AND json_extract(data_json, ?) = ?");
                    args.push(SqlValue::Text(json_path(name)));
                    args.push(SqlValue::Text(s.clone()));
                }
                Value::Array(_) | Value::Object(_) => {
                    sql.push_str(" AND json_extract(data_json, ?) = json(?)");
                    args.push(SqlValue::Text(expected.to_string()));
                }
            }
        }
        sql.push_str(" ORDER BY path");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (path, content_type, data_json) = row?;
            let fields = match serde_json::from_str::<Value>(&data_json)? {
                Value::Object(map) => map,
                _ => serde_json::Map::new(),
            };
            let record = SourceRecord {
                path,
                content_type: ContentType::parse(&content_type).unwrap_or_default(),
                fields,
            };
            records.push(match query.projection() {
                Some(fields) => record.project(fields),
                None => record,
            });
        }
        Ok(records)
    }

    fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    fn indexed_at(&self) -> Result<Option<String>> {
        let result = self
            .conn
            .query_row(
                "SELECT value FROM index_state WHERE key = 'indexed_at'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(result)
    }
}

/// Build a JSON path for a front-matter field. Quoting keeps keys such as
/// `groupOrder` or `cover-image` intact.
fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', "\\\""))
}

/// A content source backed by files on disk and an SQLite index.
///
/// Opening the source scans the content directory once; call [`rebuild`]
/// to pick up later changes.
///
/// [`rebuild`]: IndexedSource::rebuild
pub struct IndexedSource {
    root: PathBuf,
    config: FolioConfig,
    db: Mutex<IndexDb>,
}

impl IndexedSource {
    /// Open (or create) the index file configured by `index_path` inside
    /// `content_dir` and scan the directory.
    pub fn open(content_dir: &Path, config: &FolioConfig) -> Result<Self> {
        let root = existing_dir(content_dir)?;
        let db = IndexDb::open(&root.join(&config.index_path))?;
        Self::with_db(root, config, db)
    }

    /// Like [`IndexedSource::open`] but keeps the index in memory.
    pub fn open_in_memory(content_dir: &Path, config: &FolioConfig) -> Result<Self> {
        let root = existing_dir(content_dir)?;
        Self::with_db(root, config, IndexDb::open_in_memory()?)
    }

    fn with_db(root: PathBuf, config: &FolioConfig, db: IndexDb) -> Result<Self> {
        let source = IndexedSource {
            root,
            config: config.clone(),
            db: Mutex::new(db),
        };
        source.rebuild()?;
        Ok(source)
    }

    /// The content directory this source indexes.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Rescan the content directory and replace the index. Returns the
    /// number of indexed documents.
    pub fn rebuild(&self) -> Result<usize> {
        let files = self.content_files()?;
        let mut records = Vec::with_capacity(files.len());

        for file in &files {
            match document::read_source_file(&self.root, file) {
                Ok(record) => {
                    let rel = file
                        .strip_prefix(&self.root)
                        .unwrap_or(file)
                        .to_string_lossy()
                        .replace('\\', "/");
                    records.push((record, rel));
                }
                Err(e) => {
                    log::warn!("Failed to read content file {}: {}", file.display(), e);
                }
            }
        }

        // Two files can map onto one document path (`a.md` and `a/index.md`);
        // the later file in path order wins, matching INSERT OR REPLACE.
        self.lock()?.replace_all(&records)?;
        log::info!(
            "Indexed {} documents from {}",
            records.len(),
            self.root.display()
        );
        Ok(records.len())
    }

    /// Number of documents currently in the index.
    pub fn len(&self) -> Result<usize> {
        self.lock()?.count()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// When the index was last rebuilt.
    pub fn indexed_at(&self) -> Result<Option<DateTime<Utc>>> {
        let raw = self.lock()?.indexed_at()?;
        Ok(raw
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }

    fn lock(&self) -> Result<MutexGuard<'_, IndexDb>> {
        self.db
            .lock()
            .map_err(|_| FolioError::Other("index lock poisoned".into()))
    }

    fn content_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for ext in &self.config.extensions {
            let pattern = format!("{}/**/*.{}", self.root.display(), ext);
            let matched = glob::glob(&pattern)
                .map_err(|e| FolioError::Other(format!("Glob error: {e}")))?;
            files.extend(matched.filter_map(|r| r.ok()).filter(|p| !self.is_reserved(p)));
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    /// The config file and the index itself are not content.
    fn is_reserved(&self, path: &Path) -> bool {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        self.config.is_reserved(rel)
    }
}

impl ContentSource for IndexedSource {
    fn execute(&self, query: &ContentQuery) -> Result<Vec<SourceRecord>> {
        self.lock()?
            .query(query)
            .map_err(|e| FolioError::SourceUnavailable(e.to_string()))
    }

    fn refresh(&self) -> Result<()> {
        self.rebuild().map(|_| ())
    }
}

fn existing_dir(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Err(FolioError::Other(format!(
            "Content directory does not exist: {}",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn setup_content() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "book/intro.md", "---\ntitle: Intro\n---\nHello\n");
        write(
            root,
            "book/sections/genesis/index.md",
            "---\ntitle: Genesis\ngroupOrder: 1\n---\n",
        );
        write(
            root,
            "book/sections/genesis/christmas/index.md",
            "---\ntitle: Christmas\norder: 1\nsummary: Fault lines\n---\n",
        );
        write(
            root,
            "book/specials/front/dedicated.md",
            "---\ntitle: Dedicated\norder: 1\n---\n",
        );
        write(root, "book/specials/front/credits.yml", "title: Credits\norder: 2\n");
        write(root, "folio.yaml", "root: /book\n");
        tmp
    }

    #[test]
    fn test_scan_indexes_all_content_files() {
        let tmp = setup_content();
        let source = IndexedSource::open_in_memory(tmp.path(), &FolioConfig::default()).unwrap();
        assert_eq!(source.len().unwrap(), 5);
        assert!(source.indexed_at().unwrap().is_some());
    }

    #[test]
    fn test_open_writes_index_file() {
        let tmp = setup_content();
        let config = FolioConfig::default();
        let source = IndexedSource::open(tmp.path(), &config).unwrap();
        assert!(tmp.path().join(&config.index_path).exists());
        // the index file is never indexed as content
        assert_eq!(source.rebuild().unwrap(), 5);
    }

    #[test]
    fn test_prefix_query() {
        let tmp = setup_content();
        let source = IndexedSource::open_in_memory(tmp.path(), &FolioConfig::default()).unwrap();

        let out = ContentQuery::new()
            .path_prefix("/book/sections")
            .execute(&source)
            .unwrap();
        let paths: Vec<_> = out.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["/book/sections/genesis", "/book/sections/genesis/christmas"]
        );

        let none = ContentQuery::new().path_prefix("/BOOK").execute(&source).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_field_and_type_filters() {
        let tmp = setup_content();
        let source = IndexedSource::open_in_memory(tmp.path(), &FolioConfig::default()).unwrap();

        let ordered_first = ContentQuery::new()
            .where_eq("order", 1)
            .execute(&source)
            .unwrap();
        assert_eq!(ordered_first.len(), 2);

        let markdown_specials = ContentQuery::new()
            .path_prefix("/book/specials/front")
            .where_eq(TYPE_FIELD, "markdown")
            .execute(&source)
            .unwrap();
        assert_eq!(markdown_specials.len(), 1);
        assert_eq!(markdown_specials[0].path, "/book/specials/front/dedicated");

        let by_title = ContentQuery::new()
            .where_eq("title", "Genesis")
            .execute(&source)
            .unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].fields["groupOrder"], 1);
    }

    #[test]
    fn test_projection() {
        let tmp = setup_content();
        let source = IndexedSource::open_in_memory(tmp.path(), &FolioConfig::default()).unwrap();

        let out = ContentQuery::new()
            .path_prefix("/book/sections/genesis/christmas")
            .select(["path", "title"])
            .execute(&source)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].fields.contains_key("title"));
        assert!(!out[0].fields.contains_key("summary"));
        assert!(!out[0].fields.contains_key("order"));
    }

    #[test]
    fn test_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(IndexedSource::open_in_memory(&missing, &FolioConfig::default()).is_err());
    }
}
