//! In-process backend for tests and ephemeral use.

use super::{NoteStore, StoreResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<Option<String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an arbitrary (possibly malformed) persisted document.
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(document.into())),
            ..Self::default()
        }
    }

    /// Makes every following `load_all` fail with an I/O error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every following `save_all` fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `save_all` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn document(&self) -> Option<String> {
        self.document.lock().clone()
    }
}

impl NoteStore for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn load_all(&self) -> StoreResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("memory store is unreadable").into());
        }
        Ok(self.document.lock().clone())
    }

    fn save_all(&self, document: &str) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("memory store is read-only").into());
        }
        *self.document.lock() = Some(document.to_string());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
