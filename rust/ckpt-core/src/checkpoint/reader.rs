// rust/ckpt-core/src/checkpoint/reader.rs

//! Checkpoint record reader.

use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;

use crate::error::{CkptError, Result};
use crate::region::Registry;
use crate::storage::{StorageBackend, StorageReader};

use super::format::{self, CatalogEntry, CATALOG_ENTRY_WIDTH, COUNT_WIDTH};

/// Validates a checkpoint record and restores it into registered regions.
pub struct RecordReader {
    storage: Arc<dyn StorageBackend>,
}

impl RecordReader {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Reads only the header and catalog of the record at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the catalog is
    /// truncated.
    pub fn read_catalog(&self, path: &Path) -> Result<Vec<CatalogEntry>> {
        let mut reader = self.storage.open_read(path)?;
        read_catalog_from(path, reader.as_mut())
    }

    /// Restores the record at `path` into the regions of `registry`.
    ///
    /// The whole catalog is checked first: every entry must name a
    /// registered region with exactly the same length, and the file must be
    /// long enough to hold every payload. Only then are payload bytes copied,
    /// in catalog order, so a mismatched or truncated record never touches
    /// caller memory.
    ///
    /// Registered regions that the catalog does not mention are left as
    /// they are.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a mismatched or truncated record and a
    /// storage error if the file cannot be opened or read.
    pub fn read_validate_and_fill(&self, path: &Path, registry: &Registry) -> Result<()> {
        let mut reader = self.storage.open_read(path)?;
        let catalog = read_catalog_from(path, reader.as_mut())?;

        for (index, entry) in catalog.iter().enumerate() {
            match registry.get(entry.id) {
                None => {
                    return Err(CkptError::validation(
                        path,
                        format!(
                            "catalog entry {index} names region {} which is not protected",
                            entry.id
                        ),
                    ));
                }
                Some(region) if region.len() != entry.len => {
                    return Err(CkptError::validation(
                        path,
                        format!(
                            "region {} is protected with {} bytes but the record holds {} bytes",
                            entry.id,
                            region.len(),
                            entry.len
                        ),
                    ));
                }
                Some(_) => {}
            }
        }

        let expected = format::record_size(&catalog)
            .ok_or_else(|| CkptError::validation(path, "catalog lengths overflow"))?;
        let actual = reader.size();
        if actual < expected {
            return Err(CkptError::validation(
                path,
                format!("record is truncated: expected {expected} bytes, found {actual}"),
            ));
        }
        if actual > expected {
            tracing::warn!(
                path = %path.display(),
                expected,
                actual,
                "checkpoint record has trailing bytes, ignoring them"
            );
        }

        for entry in &catalog {
            let Some(region) = registry.get(entry.id) else {
                continue;
            };
            // SAFETY: regions are valid for writes per the registration
            // contract, and the slice does not outlive this call.
            let target = unsafe { region.as_bytes_mut() };
            reader.read_exact(target).map_err(|e| {
                CkptError::storage_with_source(
                    path,
                    format!("failed to read payload of region {}", entry.id),
                    e,
                )
            })?;
        }

        tracing::debug!(
            path = %path.display(),
            regions = catalog.len(),
            "checkpoint record restored"
        );
        Ok(())
    }
}

fn read_catalog_from(path: &Path, reader: &mut dyn StorageReader) -> Result<Vec<CatalogEntry>> {
    let mut header = [0u8; COUNT_WIDTH];
    read_exact_or_truncated(path, reader, &mut header, "record header")?;
    let count = format::decode_count(header);

    // Reject impossible counts before allocating for them.
    let catalog_end = format::catalog_end(count)
        .ok_or_else(|| CkptError::validation(path, format!("region count {count} overflows")))?;
    if catalog_end > reader.size() {
        return Err(CkptError::validation(
            path,
            format!(
                "record is truncated: catalog of {count} entries needs {catalog_end} bytes, file has {}",
                reader.size()
            ),
        ));
    }

    let mut catalog = Vec::with_capacity(count);
    let mut raw = [0u8; CATALOG_ENTRY_WIDTH];
    for _ in 0..count {
        read_exact_or_truncated(path, reader, &mut raw, "catalog")?;
        catalog.push(CatalogEntry::decode(&raw));
    }
    Ok(catalog)
}

fn read_exact_or_truncated(
    path: &Path,
    reader: &mut dyn StorageReader,
    buf: &mut [u8],
    what: &str,
) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            CkptError::validation(path, format!("record is truncated inside the {what}"))
        } else {
            CkptError::storage_with_source(path, format!("failed to read {what}"), e)
        }
    })
}
