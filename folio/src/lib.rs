pub mod classifier;
pub mod config;
pub mod document;
pub mod error;
pub mod library;
pub mod navigation;
pub mod ordering;
pub mod source;
pub mod specials;
pub mod tree;
pub mod watcher;

pub use classifier::{PathClassifier, PathKind, Position};
pub use config::FolioConfig;
pub use document::{ContentType, Document, PageMeta};
pub use error::{FolioError, Result};
pub use library::Library;
pub use navigation::NavigationIndex;
pub use ordering::{Comparator, SortKey};
pub use source::{ContentQuery, ContentSource, IndexedSource, MemorySource, SourceRecord};
pub use tree::{Group, TreeBuilder};
