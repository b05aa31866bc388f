// rust/ckpt-core/src/storage/traits.rs

//! Storage abstraction traits.
//!
//! The record codec and the bundled modules reach the filesystem only
//! through these traits, so tests can substitute a backend that fails on
//! demand.

use std::io::{Read, Write};
use std::path::Path;

use crate::error::Result;

/// A handle for reading from storage.
pub trait StorageReader: Read + Send {
    /// Returns the total size of the object in bytes.
    fn size(&self) -> u64;
}

/// A handle for writing to storage.
pub trait StorageWriter: Write + Send {
    /// Finishes the write operation, ensuring all data is persisted.
    ///
    /// After calling `finish`, the writer must not be used again.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing or syncing fails.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// The storage backend trait.
///
/// Object-safe; the client holds it as `Arc<dyn StorageBackend>`.
pub trait StorageBackend: Send + Sync {
    /// Checks if an object exists at the given path.
    fn exists(&self, path: &Path) -> Result<bool>;

    /// Opens an object for reading.
    fn open_read(&self, path: &Path) -> Result<Box<dyn StorageReader>>;

    /// Opens an object for writing, truncating any previous content.
    ///
    /// Parent directories are created if they don't exist.
    fn open_write(&self, path: &Path) -> Result<Box<dyn StorageWriter>>;

    /// Deletes a file.
    fn delete(&self, path: &Path) -> Result<()>;

    /// Lists the entry names directly under `dir`, sorted.
    ///
    /// A missing directory lists as empty.
    fn list(&self, dir: &Path) -> Result<Vec<String>>;

    /// Renames an object from one path to another.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Creates a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> Result<()>;
}
