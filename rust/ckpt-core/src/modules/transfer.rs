// rust/ckpt-core/src/modules/transfer.rs

//! Copies artifacts between the scratch directory and a persistent tier.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::Module;
use crate::command::{parse_artifact_version, CommandDescriptor, CommandKind, Status};
use crate::error::{CkptError, Result};
use crate::storage::StorageBackend;

/// Flushes checkpoints to the persistent tier and stages them back on
/// restart.
///
/// - `CHECKPOINT`: scratch artifact -> `{persistent}/{file}`
/// - `RESTART`: `{persistent}/{file}` -> scratch artifact
/// - `TEST`: success iff some version of the name exists for the rank
///
/// Copies go through a hidden temp file and a rename, so a crash never
/// leaves a half-copied artifact under its final name.
pub struct TransferModule {
    storage: Arc<dyn StorageBackend>,
    persistent: PathBuf,
}

impl TransferModule {
    pub fn new(storage: Arc<dyn StorageBackend>, persistent: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            persistent: persistent.into(),
        }
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
        let file_name = to
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CkptError::storage(to, "destination has no file name"))?;
        let temp_path = to.with_file_name(format!(".{file_name}.tmp"));

        let mut reader = self.storage.open_read(from)?;
        let mut writer = self.storage.open_write(&temp_path)?;
        let copied = io::copy(&mut reader, &mut writer).map_err(|e| {
            CkptError::storage_with_source(
                from,
                format!("failed to copy to {}", temp_path.display()),
                e,
            )
        })?;
        writer.finish()?;

        self.storage.rename(&temp_path, to)?;
        Ok(copied)
    }

    fn flush(&self, cmd: &CommandDescriptor) -> Result<u64> {
        let target = self.persistent.join(cmd.file_name());
        self.copy(cmd.artifact_path(), &target)
    }

    fn fetch(&self, cmd: &CommandDescriptor) -> Result<u64> {
        let source = self.persistent.join(cmd.file_name());
        if !self.storage.exists(&source)? {
            return Err(CkptError::storage(&source, "no such version in the persistent tier"));
        }
        self.copy(&source, cmd.artifact_path())
    }

    fn has_any_version(&self, cmd: &CommandDescriptor) -> Result<bool> {
        let entries = self.storage.list(&self.persistent)?;
        Ok(entries
            .iter()
            .any(|e| parse_artifact_version(e, cmd.name(), cmd.origin_rank()).is_some()))
    }
}

impl Module for TransferModule {
    fn name(&self) -> &str {
        "transfer"
    }

    fn notify(&mut self, cmd: &CommandDescriptor, on_status: &mut dyn FnMut(Status)) {
        let outcome = match cmd.kind() {
            CommandKind::Checkpoint => self.flush(cmd).map(|bytes| {
                tracing::debug!(command = %cmd, bytes, "artifact flushed to persistent tier");
                Status::SUCCESS
            }),
            CommandKind::Restart => self.fetch(cmd).map(|bytes| {
                tracing::debug!(command = %cmd, bytes, "artifact staged from persistent tier");
                Status::SUCCESS
            }),
            CommandKind::Test => self.has_any_version(cmd).map(|found| {
                if found {
                    Status::SUCCESS
                } else {
                    Status::FAILURE
                }
            }),
        };

        match outcome {
            Ok(status) => on_status(status),
            Err(e) => {
                tracing::error!(command = %cmd, error = %e, "transfer failed");
                on_status(Status::FAILURE);
            }
        }
    }
}
