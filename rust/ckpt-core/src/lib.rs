// rust/ckpt-core/src/lib.rs

//! Checkpoint/Restart Client - Core Library
//!
//! This crate lets an application register regions of its own memory,
//! serialize them into per-rank checkpoint records in a fast scratch
//! directory, and restore them later. Persisting, pruning and staging
//! artifacts is delegated either to in-process modules (sync mode) or to an
//! external engine reached over a command channel (async mode).

pub mod config;
pub mod error;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::{ClientConfig, DispatchMode};
pub use error::{CkptError, Result};
pub use storage::{LocalStorage, StorageBackend, StorageReader, StorageWriter};

pub mod command;
pub use command::{CommandDescriptor, CommandKind, Status};

pub mod region;
pub use region::{MemoryRegion, RegionId, Registry};

pub mod checkpoint;
pub use checkpoint::{CatalogEntry, RecordReader, RecordWriter};

pub mod modules;
pub use modules::{Module, ModuleManager, TransferModule, VersioningModule};

pub mod channel;
pub use channel::{local_channel, CommandChannel, EngineEndpoint, LocalChannel};

pub mod dispatch;
pub use dispatch::{ChannelDispatcher, Dispatcher, LocalDispatcher, Submission};

pub mod client;
pub use client::{Client, RecoverMode};
