//! In-process document backend

use std::collections::HashMap;
use std::sync::Mutex;

use super::{DocumentStore, StorageError};

/// Keeps documents in memory; contents are lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, document: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let documents = self.documents.lock().unwrap_or_else(|e| e.into_inner());
        Ok(documents.get(document).cloned())
    }

    fn save(&self, document: &str, data: &[u8]) -> Result<(), StorageError> {
        let mut documents = self.documents.lock().unwrap_or_else(|e| e.into_inner());
        documents.insert(document.to_string(), data.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
