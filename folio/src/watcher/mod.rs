use crate::config::FolioConfig;
use crate::error::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

/// Quiet period after the last filesystem event before a batch is emitted.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// One changed content file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// The kind of file change detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

impl ChangeKind {
    fn from_event(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(ChangeKind::Created),
            EventKind::Modify(_) => Some(ChangeKind::Modified),
            EventKind::Remove(_) => Some(ChangeKind::Deleted),
            _ => None,
        }
    }
}

/// Decides which paths under the content directory count as content.
///
/// The config file is excluded even though its extension is indexed: a
/// changed config needs a restart, not a reload.
#[derive(Debug, Clone)]
struct ContentFilter {
    root: PathBuf,
    config: FolioConfig,
}

impl ContentFilter {
    fn new(root: &Path, config: &FolioConfig) -> Self {
        ContentFilter {
            root: root.canonicalize().unwrap_or_else(|_| root.to_path_buf()),
            config: config.clone(),
        }
    }

    fn accepts(&self, path: &Path) -> bool {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        if self.config.is_reserved(rel) {
            if rel == Path::new(crate::config::CONFIG_FILE) {
                log::warn!("{} changed; restart to apply it", rel.display());
            }
            return false;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.config.indexes_extension(ext))
    }
}

/// Watches a content directory and hands out debounced batches of changed
/// content files. Consumers rebuild from scratch (`Library::reload`); nothing
/// is patched incrementally.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    _thread: std::thread::JoinHandle<()>,
    batches: mpsc::Receiver<Vec<WatcherEvent>>,
}

impl FileWatcher {
    /// Start watching `root` recursively.
    pub fn start(root: &Path, config: &FolioConfig) -> Result<Self> {
        let (notify_tx, notify_rx) = mpsc::channel::<notify::Result<Event>>();
        let (batch_tx, batches) = mpsc::channel::<Vec<WatcherEvent>>();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = notify_tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        let filter = ContentFilter::new(root, config);
        let thread = std::thread::spawn(move || {
            let mut pending: Vec<WatcherEvent> = Vec::new();
            loop {
                match notify_rx.recv_timeout(DEBOUNCE) {
                    Ok(Ok(event)) => {
                        let Some(kind) = ChangeKind::from_event(&event.kind) else {
                            continue;
                        };
                        pending.extend(
                            event
                                .paths
                                .into_iter()
                                .filter(|p| filter.accepts(p))
                                .map(|path| WatcherEvent { path, kind }),
                        );
                    }
                    Ok(Err(e)) => log::warn!("File watcher error: {e}"),
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        if !pending.is_empty() && batch_tx.send(coalesce(&mut pending)).is_err() {
                            return;
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        Ok(FileWatcher {
            _watcher: watcher,
            _thread: thread,
            batches,
        })
    }

    /// Block until a batch of changes arrives, merging any further batches
    /// already queued. Returns `None` once the watcher has shut down.
    pub fn wait_for_changes(&self) -> Option<Vec<WatcherEvent>> {
        let mut events = self.batches.recv().ok()?;
        for mut batch in self.batches.try_iter() {
            events.append(&mut batch);
        }
        Some(coalesce(&mut events))
    }
}

/// Drain `pending`, keeping one event per path (the latest).
fn coalesce(pending: &mut Vec<WatcherEvent>) -> Vec<WatcherEvent> {
    let mut out: Vec<WatcherEvent> = Vec::with_capacity(pending.len());
    for event in pending.drain(..).rev() {
        if !out.iter().any(|e| e.path == event.path) {
            out.push(event);
        }
    }
    out.reverse();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(path: &str, kind: ChangeKind) -> WatcherEvent {
        WatcherEvent {
            path: PathBuf::from(path),
            kind,
        }
    }

    #[test]
    fn test_filter_accepts_content_files() {
        let filter = ContentFilter::new(Path::new("/content"), &FolioConfig::default());
        assert!(filter.accepts(Path::new("/content/a/b/index.md")));
        assert!(filter.accepts(Path::new("/content/data.JSON")));
        assert!(filter.accepts(Path::new("/content/specials/front/layout.yml")));
        assert!(!filter.accepts(Path::new("/content/cover.jpg")));
        assert!(!filter.accepts(Path::new("/content/README")));
    }

    #[test]
    fn test_filter_skips_config_and_index() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        let filter = ContentFilter::new(&root, &FolioConfig::default());
        assert!(!filter.accepts(&root.join("folio.yaml")));
        assert!(!filter.accepts(&root.join("_folio.db")));
        // only the top-level config file is reserved
        assert!(filter.accepts(&root.join("book/folio.yaml")));
    }

    #[test]
    fn test_coalesce_keeps_latest_per_path() {
        let mut pending = vec![
            event("/c/a.md", ChangeKind::Created),
            event("/c/b.md", ChangeKind::Modified),
            event("/c/a.md", ChangeKind::Modified),
        ];
        let events = coalesce(&mut pending);
        assert!(pending.is_empty());
        assert_eq!(
            events,
            vec![
                event("/c/b.md", ChangeKind::Modified),
                event("/c/a.md", ChangeKind::Modified),
            ]
        );
    }
}
