//! Persistence Adapters
//!
//! Implementations of the `InstrumentStore` port.

mod document;
pub mod in_memory;
pub mod json_file;

pub use document::{StoredBook, StoredInstrument};
pub use in_memory::InMemoryInstrumentStore;
pub use json_file::JsonFileInstrumentStore;
