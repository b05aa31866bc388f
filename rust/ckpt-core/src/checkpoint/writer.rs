// rust/ckpt-core/src/checkpoint/writer.rs

//! Checkpoint record writer.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::error::{CkptError, Result};
use crate::region::Registry;
use crate::storage::StorageBackend;

use super::format::{self, CatalogEntry};

/// Serializes the registry into a checkpoint record.
///
/// A failed write leaves whatever was written so far at the target path;
/// the file is neither rolled back nor deleted.
pub struct RecordWriter {
    storage: Arc<dyn StorageBackend>,
}

impl RecordWriter {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Writes every registered region to `path` and returns the record size.
    ///
    /// The catalog pass and the payload pass both walk the registry in
    /// ascending id order, which is what lets a reader pair catalog entries
    /// with payload bytes.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file cannot be created, written, or
    /// flushed to disk.
    pub fn write(&self, path: &Path, registry: &Registry) -> Result<u64> {
        let mut writer = self.storage.open_write(path)?;
        let write_err = |what: &str, e: std::io::Error| {
            CkptError::storage_with_source(path, format!("failed to write {what}"), e)
        };

        writer
            .write_all(&format::encode_count(registry.len()))
            .map_err(|e| write_err("record header", e))?;

        for region in registry.iter() {
            let entry = CatalogEntry {
                id: region.id(),
                len: region.len(),
            };
            writer
                .write_all(&entry.encode())
                .map_err(|e| write_err("catalog", e))?;
        }

        for region in registry.iter() {
            // SAFETY: regions are valid for reads per the registration
            // contract, and the slice does not outlive this call.
            let bytes = unsafe { region.as_bytes() };
            writer.write_all(bytes).map_err(|e| {
                CkptError::storage_with_source(
                    path,
                    format!("failed to write payload of region {}", region.id()),
                    e,
                )
            })?;
        }

        writer.finish()?;

        let size = format::catalog_end(registry.len()).unwrap_or(0) + registry.total_bytes() as u64;
        tracing::debug!(
            path = %path.display(),
            regions = registry.len(),
            bytes = size,
            "checkpoint record written"
        );
        Ok(size)
    }
}
