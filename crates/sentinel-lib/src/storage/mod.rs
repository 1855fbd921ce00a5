//! Document persistence for the history and anomaly stores
//!
//! Stores address whole named documents. Every write replaces the document,
//! so callers hold their own lock across the modify and save steps.

mod file_store;
mod handle;
mod memory_store;

pub use file_store::JsonFileStore;
pub use handle::{DocumentHandle, Instrumentation};
pub use memory_store::MemoryStore;

use serde::{de::DeserializeOwned, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Document holding the global metric sample list
pub const HISTORY_DOCUMENT: &str = "history";

/// Document holding the anomaly record list
pub const ANOMALIES_DOCUMENT: &str = "anomalies";

/// Errors raised by document store backends
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize document '{document}': {source}")]
    Serialization {
        document: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Pluggable backend for named documents
pub trait DocumentStore: Send + Sync {
    /// Read a document; `Ok(None)` when it has never been written
    fn load(&self, document: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace a document
    fn save(&self, document: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Human-readable backend description for logs
    fn describe(&self) -> String;
}

/// Load and deserialize a JSON document
pub fn load_json<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    document: &str,
) -> Result<Option<T>, StorageError> {
    match store.load(document)? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StorageError::Serialization {
                document: document.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Serialize and save a JSON document
pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn DocumentStore,
    document: &str,
    value: &T,
) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec(value).map_err(|source| StorageError::Serialization {
        document: document.to_string(),
        source,
    })?;
    store.save(document, &bytes)
}
