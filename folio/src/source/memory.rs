use super::{ContentQuery, ContentSource, SourceRecord};
use crate::error::{FolioError, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// An in-memory content source over a fixed set of records.
#[derive(Debug, Default)]
pub struct MemorySource {
    records: Vec<SourceRecord>,
    fail: AtomicBool,
    executions: AtomicUsize,
}

impl MemorySource {
    pub fn new(records: Vec<SourceRecord>) -> Self {
        MemorySource {
            records,
            ..Default::default()
        }
    }

    /// Make subsequent queries fail with `SourceUnavailable` (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of queries executed so far.
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

impl ContentSource for MemorySource {
    fn execute(&self, query: &ContentQuery) -> Result<Vec<SourceRecord>> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(FolioError::SourceUnavailable(
                "memory source set to fail".into(),
            ));
        }

        let mut out: Vec<SourceRecord> = self
            .records
            .iter()
            .filter(|r| r.matches(query))
            .cloned()
            .map(|r| match query.projection() {
                Some(fields) => r.project(fields),
                None => r,
            })
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }
}
