// rust/ckpt-core/src/error.rs

use std::path::PathBuf;
use thiserror::Error;

use crate::command::{CommandKind, Status};

#[derive(Error, Debug)]
pub enum CkptError {

    #[error("Storage error at '{path}': {message}")]
    Storage {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Usage error: {message}")]
    Usage {
        message: String,
    },

    #[error("Checkpoint record '{path}' rejected: {message}")]
    Validation {
        path: PathBuf,
        message: String,
    },

    #[error("{kind} dispatch failed with status {status}")]
    Dispatch {
        kind: CommandKind,
        status: Status,
    },

    #[error("Command channel for rank {rank}: {message}")]
    Channel {
        rank: i32,
        message: String,
    },

    #[error("Invalid command descriptor: {message}")]
    Descriptor {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, CkptError>;

// Convenience constructors
impl CkptError {

    pub fn storage(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn storage_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    pub fn validation(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn dispatch(kind: CommandKind, status: Status) -> Self {
        Self::Dispatch { kind, status }
    }

    pub fn channel(rank: i32, message: impl Into<String>) -> Self {
        Self::Channel {
            rank,
            message: message.into(),
        }
    }

    pub fn descriptor(message: impl Into<String>) -> Self {
        Self::Descriptor {
            message: message.into(),
        }
    }

    /// Returns true for call-order violations, which leave the client usable.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage { .. })
    }
}
