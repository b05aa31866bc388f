// rust/ckpt-core/src/storage/mod.rs

//! Storage abstraction used by the record codec and the in-process modules.
//!
//! # Example
//!
//! ```no_run
//! use ckpt_core::storage::{LocalStorage, StorageBackend};
//! use std::io::Write;
//! use std::path::Path;
//!
//! let storage = LocalStorage::default();
//!
//! let mut writer = storage.open_write(Path::new("/tmp/scratch/example.dat")).unwrap();
//! writer.write_all(b"Hello, world!").unwrap();
//! writer.finish().unwrap();
//! ```

mod local;
mod traits;

pub use local::{LocalStorage, DEFAULT_BUFFER_SIZE};
pub use traits::{StorageBackend, StorageReader, StorageWriter};
