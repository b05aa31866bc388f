// rust/ckpt-core/src/checkpoint/mod.rs

//! Checkpoint record codec.
//!
//! This module turns the region registry into a checkpoint record and back:
//! - [`RecordWriter`] writes the region count, the `(id, length)` catalog
//!   and the raw payloads in one pass over the id-ordered registry
//! - [`RecordReader`] validates the whole catalog against the registry
//!   before copying a single payload byte into caller memory
//!
//! See [`format`] for the byte layout.
//!
//! # Example
//!
//! ```no_run
//! use ckpt_core::checkpoint::{RecordReader, RecordWriter};
//! use ckpt_core::region::Registry;
//! use ckpt_core::storage::{LocalStorage, StorageBackend};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::default());
//! let path = Path::new("/tmp/scratch/state-0-1.dat");
//!
//! let mut counter = [0u64; 4];
//! let mut registry = Registry::new();
//! // SAFETY: `counter` outlives every use of the registry below.
//! unsafe { registry.protect_slice(0, &mut counter) };
//!
//! RecordWriter::new(storage.clone()).write(path, &registry).unwrap();
//! RecordReader::new(storage).read_validate_and_fill(path, &registry).unwrap();
//! ```

pub mod format;
mod reader;
mod writer;

pub use format::CatalogEntry;
pub use reader::RecordReader;
pub use writer::RecordWriter;
