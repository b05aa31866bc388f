// rust/ckpt-core/src/modules/versioning.rs

//! Prunes old versions of a checkpoint.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::Module;
use crate::command::{
    artifact_file_name, parse_artifact_version, CommandDescriptor, CommandKind, Status,
};
use crate::error::Result;
use crate::storage::StorageBackend;

/// Keeps at most `max_versions` versions of each checkpoint name per rank.
///
/// Runs on `CHECKPOINT` only. The scratch directory of the command is always
/// pruned; extra directories (the persistent tier) are pruned alongside it.
/// The version being checkpointed is never deleted, whatever its number.
pub struct VersioningModule {
    storage: Arc<dyn StorageBackend>,
    max_versions: usize,
    extra_dirs: Vec<PathBuf>,
}

impl VersioningModule {
    pub fn new(storage: Arc<dyn StorageBackend>, max_versions: usize) -> Self {
        Self {
            storage,
            max_versions,
            extra_dirs: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extra_dirs.push(dir.into());
        self
    }

    /// Deletes the oldest versions in `dir` and returns how many went.
    fn prune(&self, dir: &Path, cmd: &CommandDescriptor) -> Result<usize> {
        let mut older: Vec<i32> = self
            .storage
            .list(dir)?
            .iter()
            .filter_map(|e| parse_artifact_version(e, cmd.name(), cmd.origin_rank()))
            .filter(|v| *v != cmd.version())
            .collect();

        // The current version takes one slot.
        let keep = self.max_versions.saturating_sub(1);
        if older.len() <= keep {
            return Ok(0);
        }

        older.sort_unstable();
        let to_delete = older.len() - keep;
        for version in older.iter().take(to_delete) {
            let path = dir.join(artifact_file_name(cmd.name(), cmd.origin_rank(), *version));
            self.storage.delete(&path)?;
            tracing::debug!(path = %path.display(), "pruned old checkpoint version");
        }
        Ok(to_delete)
    }
}

impl Module for VersioningModule {
    fn name(&self) -> &str {
        "versioning"
    }

    fn notify(&mut self, cmd: &CommandDescriptor, on_status: &mut dyn FnMut(Status)) {
        if cmd.kind() != CommandKind::Checkpoint || self.max_versions == 0 {
            return;
        }

        let scratch = cmd.artifact_path().parent().map(Path::to_path_buf);
        let mut status = Status::SUCCESS;
        for dir in scratch.iter().chain(self.extra_dirs.iter()) {
            if let Err(e) = self.prune(dir, cmd) {
                tracing::error!(dir = %dir.display(), error = %e, "failed to prune old versions");
                status = Status::FAILURE;
            }
        }
        on_status(status);
    }
}
