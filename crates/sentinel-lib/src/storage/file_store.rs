//! JSON-file document backend
//!
//! One `<document>.json` file per document inside a data directory.
//! Writes go to a temp file that is synced and renamed over the target.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{DocumentStore, StorageError};

/// Stores each document as a JSON file under `dir`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, document: &str) -> PathBuf {
        self.dir.join(format!("{}.json", document))
    }
}

impl DocumentStore for JsonFileStore {
    fn load(&self, document: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(document);
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn save(&self, document: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(document);
        let temp_path = path.with_extension("json.tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(io_err(&temp_path))?;
        file.write_all(data).map_err(io_err(&temp_path))?;
        file.sync_all().map_err(io_err(&temp_path))?;

        fs::rename(&temp_path, &path).map_err(io_err(&path))?;
        debug!(path = %path.display(), bytes = data.len(), "Document saved");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json-files:{}", self.dir.display())
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError {
    let path = path.to_path_buf();
    move |source| StorageError::Io { path, source }
}
