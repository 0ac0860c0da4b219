//! In-memory instrument store for testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::ports::{InstrumentBook, InstrumentStore, StoreError};

/// In-memory implementation of `InstrumentStore`.
///
/// Suitable for testing and development. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryInstrumentStore {
    book: RwLock<InstrumentBook>,
    saved: RwLock<Option<InstrumentBook>>,
    saves: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryInstrumentStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that loads `book`.
    #[must_use]
    pub fn with_book(book: InstrumentBook) -> Self {
        Self {
            book: RwLock::new(book),
            ..Self::default()
        }
    }

    /// Book written by the most recent successful save.
    #[must_use]
    pub fn last_saved(&self) -> Option<InstrumentBook> {
        self.saved.read().clone()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every following save fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl InstrumentStore for InMemoryInstrumentStore {
    async fn load(&self) -> Result<InstrumentBook, StoreError> {
        Ok(self.book.read().clone())
    }

    async fn save(&self, book: &InstrumentBook) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                path: "memory".to_string(),
                message: "store configured to fail".to_string(),
            });
        }
        *self.book.write() = book.clone();
        *self.saved.write() = Some(book.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
