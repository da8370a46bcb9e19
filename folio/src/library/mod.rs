use crate::classifier::{PathClassifier, PathKind, Position, UNGROUPED};
use crate::config::{load_config, FolioConfig};
use crate::document::{Document, PageMeta};
use crate::error::{FolioError, Result};
use crate::navigation::NavigationIndex;
use crate::ordering::Comparator;
use crate::source::{ContentQuery, ContentSource, IndexedSource};
use crate::specials;
use crate::tree::{Group, TreeBuilder};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Front-matter fields the library loads for every document.
pub const PAGE_FIELDS: [&str; 6] = ["path", "title", "summary", "cover", "order", "groupOrder"];

/// The loaded document set and everything derived from it.
#[derive(Default)]
struct Snapshot {
    documents: Vec<Document>,
    navigation: NavigationIndex,
    initialized: bool,
    loaded_at: Option<DateTime<Utc>>,
}

/// The main entry point: owns one snapshot of a content source and answers
/// table-of-contents, navigation and specials requests from it.
///
/// Nothing is loaded until [`init`](Library::init) succeeds; until then every
/// view is empty. [`reset`](Library::reset) drops the snapshot.
pub struct Library {
    config: FolioConfig,
    classifier: PathClassifier,
    comparator: Comparator,
    source: Arc<dyn ContentSource>,
    snapshot: Mutex<Snapshot>,
}

impl Library {
    /// Create a library over any content source.
    pub fn new(source: Arc<dyn ContentSource>, config: FolioConfig) -> Self {
        Library {
            classifier: PathClassifier::from_config(&config),
            comparator: Comparator::new(config.sentinel),
            config,
            source,
            snapshot: Mutex::new(Snapshot::default()),
        }
    }

    /// Open a content directory: reads `folio.yaml` (if present), indexes the
    /// files and loads the snapshot.
    pub fn open(content_dir: &Path) -> Result<Self> {
        let config = load_config(content_dir)?;
        Self::open_with_config(content_dir, config)
    }

    pub fn open_with_config(content_dir: &Path, config: FolioConfig) -> Result<Self> {
        let source = IndexedSource::open(content_dir, &config)?;
        let library = Library::new(Arc::new(source), config);
        library.init()?;
        Ok(library)
    }

    pub fn config(&self) -> &FolioConfig {
        &self.config
    }

    pub fn classifier(&self) -> &PathClassifier {
        &self.classifier
    }

    /// The query `init` runs against the source.
    pub fn snapshot_query(&self) -> ContentQuery {
        let root = self.config.root_prefix();
        let query = ContentQuery::new().select(PAGE_FIELDS);
        if root.is_empty() {
            query
        } else {
            query.path_prefix(format!("{root}/"))
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Load the snapshot from the source. A no-op once initialized.
    ///
    /// Concurrent callers wait for the load in flight and then see its
    /// result; only one query reaches the source. On failure the library
    /// stays uninitialized and empty, and a later call retries.
    pub fn init(&self) -> Result<()> {
        let mut snapshot = self.lock();
        if snapshot.initialized {
            return Ok(());
        }

        let records = match self.source.execute(&self.snapshot_query()) {
            Ok(records) => records,
            Err(e) => {
                log::error!("Library init failed: {e}");
                return Err(match e {
                    FolioError::SourceUnavailable(_) => e,
                    other => FolioError::SourceUnavailable(other.to_string()),
                });
            }
        };

        let documents: Vec<Document> = records.iter().map(Document::from_record).collect();
        let navigation = NavigationIndex::build(&documents, &self.classifier, &self.comparator);

        log::info!(
            "Loaded {} documents ({} navigable)",
            documents.len(),
            navigation.len()
        );
        *snapshot = Snapshot {
            documents,
            navigation,
            initialized: true,
            loaded_at: Some(Utc::now()),
        };
        Ok(())
    }

    /// Drop the snapshot. Safe to call any number of times.
    pub fn reset(&self) {
        *self.lock() = Snapshot::default();
    }

    /// Refresh the source, then reset and load again.
    pub fn reload(&self) -> Result<()> {
        self.source.refresh()?;
        self.reset();
        self.init()
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.lock().loaded_at
    }

    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        // Snapshots are replaced wholesale, so a poisoned lock still holds a
        // consistent value.
        self.snapshot.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Views ───────────────────────────────────────────────────────

    /// All loaded documents in source order.
    pub fn documents(&self) -> Vec<Document> {
        self.lock().documents.clone()
    }

    /// Normalized metadata for every loaded document.
    pub fn pages(&self) -> Vec<PageMeta> {
        let snapshot = self.lock();
        let group_orders = self.group_orders(&snapshot.documents);
        snapshot
            .documents
            .iter()
            .map(|d| self.page_meta(d, &group_orders))
            .collect()
    }

    /// Metadata for one document, navigable or not.
    pub fn page(&self, path: &str) -> Option<PageMeta> {
        self.pages().into_iter().find(|p| p.path == path)
    }

    /// Pages whose inferred group is `group`, in source order.
    pub fn by_group(&self, group: &str) -> Vec<PageMeta> {
        self.pages().into_iter().filter(|p| p.group == group).collect()
    }

    /// The grouped table of contents.
    pub fn toc(&self) -> Vec<Group> {
        let snapshot = self.lock();
        TreeBuilder::new(self.classifier.clone(), self.comparator).build(&snapshot.documents)
    }

    /// The reading order used by `next` / `prev`.
    pub fn ordered(&self) -> Vec<Document> {
        self.lock().navigation.ordered().to_vec()
    }

    pub fn get(&self, path: &str) -> Option<Document> {
        self.lock().navigation.get(path).cloned()
    }

    pub fn next(&self, path: &str) -> Option<Document> {
        self.lock().navigation.next(path).cloned()
    }

    pub fn prev(&self, path: &str) -> Option<Document> {
        self.lock().navigation.prev(path).cloned()
    }

    /// Specials for `position`, ordered.
    pub fn specials(&self, position: Position) -> Vec<Document> {
        let snapshot = self.lock();
        specials::select(&snapshot.documents, position, &self.classifier, &self.comparator)
    }

    /// Specials for `position` queried straight from the source, without
    /// touching the snapshot. Works before `init`.
    pub fn fetch_specials(&self, position: Position) -> Result<Vec<Document>> {
        let query = specials::specials_query(
            &self.config.root_prefix(),
            self.classifier.specials_marker(),
            position,
        );
        let docs: Vec<Document> = self
            .source
            .execute(&query)?
            .iter()
            .map(Document::from_record)
            .collect();
        Ok(specials::select(&docs, position, &self.classifier, &self.comparator))
    }

    pub fn classify(&self, path: &str) -> PathKind {
        self.classifier.classify(path)
    }

    /// Document counts and load state.
    pub fn status(&self) -> serde_json::Value {
        let snapshot = self.lock();
        let mut kinds: HashMap<&str, usize> = HashMap::new();
        for doc in &snapshot.documents {
            let kind = match self.classifier.classify(&doc.path) {
                PathKind::Special(_) => "specials",
                PathKind::GroupIndex(_) => "groups",
                PathKind::Leaf(_) => "leaves",
                PathKind::Other => "other",
            };
            *kinds.entry(kind).or_default() += 1;
        }

        serde_json::json!({
            "initialized": snapshot.initialized,
            "loaded_at": snapshot.loaded_at.map(|t| t.to_rfc3339()),
            "root": self.config.root_prefix(),
            "documents": snapshot.documents.len(),
            "navigable": snapshot.navigation.len(),
            "kinds": kinds,
        })
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn group_orders(&self, docs: &[Document]) -> HashMap<String, Option<i64>> {
        let mut orders = HashMap::new();
        for doc in docs {
            if let PathKind::GroupIndex(id) = self.classifier.classify(&doc.path) {
                orders.insert(id, doc.group_order);
            }
        }
        orders
    }

    fn page_meta(&self, doc: &Document, group_orders: &HashMap<String, Option<i64>>) -> PageMeta {
        let group = self.classifier.infer_group(&doc.path);
        let group_order = doc.group_order.or_else(|| {
            if group == UNGROUPED {
                None
            } else {
                group_orders.get(&group).copied().flatten()
            }
        });
        PageMeta {
            title: doc
                .title
                .clone()
                .unwrap_or_else(|| self.config.fallback_title.clone()),
            summary: doc.summary.clone(),
            cover: doc.cover.clone(),
            group,
            order: doc.order,
            group_order,
            path: doc.path.clone(),
        }
    }
}
