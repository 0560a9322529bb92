//! Single-file JSON document store.
//!
//! Every operation reads the whole document, and every mutation rewrites the
//! whole file. This is only reasonable for small datasets; reusing it for
//! anything larger needs a different storage layout.
//!
//! Readers take the shared side of the lock and writers the exclusive side,
//! so a reader never observes a half-written file produced by this process.
//! The file is overwritten in place without a temp file, so a crash during
//! `persist` can still leave it corrupt.

pub mod document;

pub use document::{Chirp, Document, User, UserView};

use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

#[derive(Debug)]
pub struct DocumentStore {
    path: PathBuf,
    // Guards the file itself; the document is never cached in memory.
    lock: RwLock<()>,
}

impl DocumentStore {
    /// Open the store at `path`, writing an empty document if the file does
    /// not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            path: path.into(),
            lock: RwLock::new(()),
        };
        if !store.path.exists() {
            info!("Creating empty database at {}", store.path.display());
            store.persist(&Document::default())?;
        }
        Ok(store)
    }

    /// Read and parse the whole file. Does not take the lock.
    pub fn load(&self) -> Result<Document> {
        let data = std::fs::read(&self.path)?;
        let document = serde_json::from_slice(&data)?;
        debug!("Loaded {} bytes from {}", data.len(), self.path.display());
        Ok(document)
    }

    /// Serialize the whole document and overwrite the file. Does not take the lock.
    pub fn persist(&self, document: &Document) -> Result<()> {
        let data = serde_json::to_vec(document)?;
        std::fs::write(&self.path, &data)?;
        debug!("Wrote {} bytes to {}", data.len(), self.path.display());
        Ok(())
    }

    /// Run `f` against a consistent snapshot under the shared lock.
    pub fn read<T>(&self, f: impl FnOnce(&Document) -> Result<T>) -> Result<T> {
        // The lock guards no data, so a poisoned lock carries nothing stale.
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        let document = self.load()?;
        f(&document)
    }

    /// Load, mutate and persist under the exclusive lock. The document is
    /// only written back if `f` succeeds.
    pub fn write<T>(&self, f: impl FnOnce(&mut Document) -> Result<T>) -> Result<T> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);
        let mut document = self.load()?;
        let value = f(&mut document)?;
        self.persist(&document)?;
        Ok(value)
    }

    /// Delete the backing file. Used by the debug hard reset at startup.
    pub fn reset(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => {
                info!("Deleted database file {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
