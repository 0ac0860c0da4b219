//! Instrument Store Port (Driven Port)
//!
//! Load/save of the whole instrument book. Saves replace the stored book;
//! the last successful save wins.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::ladder::InstrumentRecord;
use crate::domain::shared::Symbol;

/// All tracked instruments keyed by symbol.
pub type InstrumentBook = BTreeMap<Symbol, InstrumentRecord>;

/// Persistence errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing storage failed.
    #[error("Storage I/O error at '{path}': {message}")]
    Io {
        /// Location of the backing storage.
        path: String,
        /// Error details.
        message: String,
    },

    /// The stored document could not be encoded or decoded.
    #[error("Storage serialization error: {0}")]
    Serialization(String),
}

/// Port for instrument book persistence.
#[async_trait]
pub trait InstrumentStore: Send + Sync {
    /// Load the stored book. An absent store yields an empty book.
    async fn load(&self) -> Result<InstrumentBook, StoreError>;

    /// Replace the stored book.
    async fn save(&self, book: &InstrumentBook) -> Result<(), StoreError>;
}

/// Load the book, degrading any failure to an empty book.
pub async fn load_or_empty<S: InstrumentStore + ?Sized>(store: &S) -> InstrumentBook {
    match store.load().await {
        Ok(book) => book,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load instrument book, starting empty");
            InstrumentBook::new()
        }
    }
}
