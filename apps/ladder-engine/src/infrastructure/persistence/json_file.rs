//! JSON file instrument store.
//!
//! The whole book lives in one JSON document. Saves write a sibling
//! temporary file and rename it over the target, so readers never observe a
//! partially written document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::document::{StoredBook, decode_book, encode_book};
use crate::application::ports::{InstrumentBook, InstrumentStore, StoreError};

/// File-backed implementation of `InstrumentStore`.
#[derive(Debug)]
pub struct JsonFileInstrumentStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileInstrumentStore {
    /// Create a store backed by `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn io_error(path: &Path, error: &std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}

#[async_trait]
impl InstrumentStore for JsonFileInstrumentStore {
    async fn load(&self) -> Result<InstrumentBook, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No instrument file yet, starting empty");
                return Ok(InstrumentBook::new());
            }
            Err(e) => return Err(io_error(&self.path, &e)),
        };
        if contents.trim().is_empty() {
            return Ok(InstrumentBook::new());
        }

        let stored: StoredBook = serde_json::from_str(&contents)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(decode_book(stored))
    }

    async fn save(&self, book: &InstrumentBook) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&encode_book(book))
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, &e))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, json)
            .await
            .map_err(|e| io_error(&temp, &e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, &e))?;
        Ok(())
    }
}
