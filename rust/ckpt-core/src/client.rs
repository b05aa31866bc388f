// rust/ckpt-core/src/client.rs

//! Checkpoint/restart client.
//!
//! The [`Client`] sequences the public calls:
//!
//! ```text
//! checkpoint:  checkpoint_begin -> checkpoint_write -> checkpoint_end [-> checkpoint_wait]
//! restart:     restart_begin -> recover -> restart_end
//! ```
//!
//! Out-of-order calls (a nested `checkpoint_begin`, waiting or restarting
//! while a checkpoint is open, recovering before `restart_begin`) fail with
//! [`CkptError::Usage`] and leave the client as it was.
//!
//! # Example
//!
//! ```no_run
//! use ckpt_core::{Client, ClientConfig, DispatchMode, RecoverMode};
//!
//! let config = ClientConfig::new("/tmp/scratch", DispatchMode::Sync);
//! let mut client = Client::new(0, config).unwrap();
//!
//! let mut state = vec![0u64; 1024];
//! // SAFETY: `state` outlives the client.
//! unsafe { client.protect_slice(0, &mut state) };
//!
//! client.checkpoint_begin("solver", 1).unwrap();
//! client.checkpoint_write().unwrap();
//! client.checkpoint_end().unwrap();
//!
//! client.restart_begin("solver", 1).unwrap();
//! client.recover(RecoverMode::All).unwrap();
//! client.restart_end().unwrap();
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::channel::CommandChannel;
use crate::checkpoint::{RecordReader, RecordWriter};
use crate::command::{CommandDescriptor, CommandKind, Status};
use crate::config::{ClientConfig, DispatchMode};
use crate::dispatch::{ChannelDispatcher, Dispatcher, LocalDispatcher, Submission};
use crate::error::{CkptError, Result};
use crate::modules::ModuleManager;
use crate::region::{RegionId, Registry};
use crate::storage::{LocalStorage, StorageBackend};

/// Which protected regions a recovery restores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverMode {
    /// Every region in the record.
    All,
    /// Only the listed regions.
    Some(BTreeSet<RegionId>),
    /// Every region except the listed ones.
    Rest(BTreeSet<RegionId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    CheckpointOpen,
}

/// One checkpoint/restart session per process rank.
///
/// The client is single-threaded: it holds raw pointers to caller memory
/// and is neither `Send` nor `Sync`.
pub struct Client {
    rank: i32,
    config: ClientConfig,
    storage: Arc<dyn StorageBackend>,
    registry: Registry,
    writer: RecordWriter,
    reader: RecordReader,
    dispatcher: Box<dyn Dispatcher>,
    current: Option<CommandDescriptor>,
    state: SessionState,
}

impl Client {
    /// Creates a synchronous client with the module chain derived from
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid or selects
    /// asynchronous mode, and a storage error if the scratch directory
    /// cannot be created.
    pub fn new(rank: i32, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(config.buffer_size));
        let modules = ModuleManager::from_config(&config, storage.clone());
        Self::assemble_sync(rank, config, storage, modules)
    }

    /// Creates a synchronous client that dispatches to `modules`.
    ///
    /// # Errors
    ///
    /// Same as [`Client::new`].
    pub fn with_modules(rank: i32, config: ClientConfig, modules: ModuleManager) -> Result<Self> {
        config.validate()?;
        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(config.buffer_size));
        Self::assemble_sync(rank, config, storage, modules)
    }

    /// Creates an asynchronous client that enqueues on `channel`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid, selects
    /// synchronous mode, or `channel` belongs to another rank.
    pub fn with_channel(
        rank: i32,
        config: ClientConfig,
        channel: impl CommandChannel + 'static,
    ) -> Result<Self> {
        config.validate()?;
        if config.mode != DispatchMode::Async {
            return Err(CkptError::config("a command channel requires mode = \"async\""));
        }
        if channel.rank() != rank {
            return Err(CkptError::config(format!(
                "command channel is keyed by rank {}, client rank is {rank}",
                channel.rank()
            )));
        }

        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(config.buffer_size));
        let dispatcher = Box::new(ChannelDispatcher::new(Box::new(channel)));
        Self::assemble(rank, config, storage, dispatcher)
    }

    /// Loads `path`, applies `CKPT_` environment overrides and creates a
    /// synchronous client.
    ///
    /// # Errors
    ///
    /// Any configuration problem is fatal and no client is produced. A file
    /// selecting `mode = "async"` is rejected; use
    /// [`Client::from_config_file_with_channel`] for those.
    pub fn from_config_file(rank: i32, path: impl AsRef<Path>) -> Result<Self> {
        let config = ClientConfig::from_file(path)?.with_env_overrides();
        Self::new(rank, config)
    }

    /// Loads `path`, applies `CKPT_` environment overrides and creates an
    /// asynchronous client that enqueues on `channel`.
    ///
    /// # Errors
    ///
    /// Same as [`Client::with_channel`], plus any problem loading the file.
    pub fn from_config_file_with_channel(
        rank: i32,
        path: impl AsRef<Path>,
        channel: impl CommandChannel + 'static,
    ) -> Result<Self> {
        let config = ClientConfig::from_file(path)?.with_env_overrides();
        Self::with_channel(rank, config, channel)
    }

    fn assemble_sync(
        rank: i32,
        config: ClientConfig,
        storage: Arc<dyn StorageBackend>,
        modules: ModuleManager,
    ) -> Result<Self> {
        if config.mode != DispatchMode::Sync {
            return Err(CkptError::config(
                "mode = \"async\" requires a command channel, use Client::with_channel",
            ));
        }
        let dispatcher = Box::new(LocalDispatcher::new(modules));
        Self::assemble(rank, config, storage, dispatcher)
    }

    fn assemble(
        rank: i32,
        config: ClientConfig,
        storage: Arc<dyn StorageBackend>,
        dispatcher: Box<dyn Dispatcher>,
    ) -> Result<Self> {
        storage.create_dir_all(&config.scratch)?;

        tracing::debug!(
            rank,
            mode = %config.mode,
            scratch = %config.scratch.display(),
            "checkpoint client initialized"
        );

        Ok(Self {
            rank,
            writer: RecordWriter::new(storage.clone()),
            reader: RecordReader::new(storage.clone()),
            storage,
            config,
            registry: Registry::new(),
            dispatcher,
            current: None,
            state: SessionState::Idle,
        })
    }

    pub fn rank(&self) -> i32 {
        self.rank
    }

    pub fn mode(&self) -> DispatchMode {
        self.dispatcher.mode()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn current_descriptor(&self) -> Option<&CommandDescriptor> {
        self.current.as_ref()
    }

    pub fn is_checkpoint_in_progress(&self) -> bool {
        self.state == SessionState::CheckpointOpen
    }

    /// Registers `len` bytes at `ptr` under `id`, replacing any previous
    /// registration of `id`.
    ///
    /// # Safety
    ///
    /// `ptr` must stay valid for reads and writes of `len` bytes while the
    /// region is registered, and nothing else may access it during
    /// [`checkpoint_write`](Client::checkpoint_write) or
    /// [`recover`](Client::recover).
    pub unsafe fn protect(&mut self, id: RegionId, ptr: *mut u8, len: usize) -> bool {
        self.registry.protect(id, ptr, len)
    }

    /// Registers a typed slice under `id`.
    ///
    /// # Safety
    ///
    /// Same contract as [`Client::protect`]; additionally `T` must accept
    /// any bit pattern, since recovery writes raw bytes into it.
    pub unsafe fn protect_slice<T: Copy>(&mut self, id: RegionId, slice: &mut [T]) -> bool {
        self.registry.protect_slice(id, slice)
    }

    /// Removes the registration of `id`. Returns true iff it existed.
    pub fn unprotect(&mut self, id: RegionId) -> bool {
        self.registry.unprotect(id)
    }

    /// Opens checkpoint `name` at `version`.
    ///
    /// # Errors
    ///
    /// Fails if a checkpoint is already open (nesting is not supported) or
    /// the name is invalid. The client is unchanged on failure.
    pub fn checkpoint_begin(&mut self, name: &str, version: i32) -> Result<()> {
        if self.state == SessionState::CheckpointOpen {
            return Err(self.usage("nested checkpoints are not supported"));
        }

        let cmd = CommandDescriptor::build(
            self.rank,
            CommandKind::Checkpoint,
            name,
            version,
            &self.config.scratch,
        )?;
        tracing::debug!(command = %cmd, "checkpoint begin");

        self.current = Some(cmd);
        self.state = SessionState::CheckpointOpen;
        Ok(())
    }

    /// Writes every protected region to the open checkpoint's artifact.
    ///
    /// A failure leaves the checkpoint open, so the caller can retry or
    /// give up with [`checkpoint_abort`](Client::checkpoint_abort).
    pub fn checkpoint_write(&mut self) -> Result<()> {
        let cmd = match (&self.state, &self.current) {
            (SessionState::CheckpointOpen, Some(cmd)) => cmd,
            _ => return Err(self.usage("must call checkpoint_begin() first")),
        };

        self.writer
            .write(cmd.artifact_path(), &self.registry)
            .map(|_| ())
            .map_err(|e| {
                tracing::error!(command = %cmd, error = %e, "cannot write checkpoint file");
                e
            })
    }

    /// Closes the open checkpoint and dispatches it.
    ///
    /// In synchronous mode the modules run before this returns and their
    /// aggregated status decides the result. In asynchronous mode the
    /// descriptor is enqueued and the result comes from
    /// [`checkpoint_wait`](Client::checkpoint_wait).
    ///
    /// # Errors
    ///
    /// Fails if no checkpoint is open, the channel rejects the command, or
    /// the modules report a non-success status. The checkpoint is closed in
    /// every case except the first.
    pub fn checkpoint_end(&mut self) -> Result<()> {
        if self.state != SessionState::CheckpointOpen {
            return Err(self.usage("must call checkpoint_begin() first"));
        }
        self.state = SessionState::Idle;

        let Some(cmd) = self.current.as_ref() else {
            return Err(self.usage("no checkpoint descriptor to dispatch"));
        };

        match self.dispatcher.submit(cmd)? {
            Submission::Completed(status) => check_status(cmd, status),
            Submission::Enqueued => Ok(()),
        }
    }

    /// Closes the open checkpoint without dispatching it.
    ///
    /// Whatever was already written at the artifact path stays there.
    pub fn checkpoint_abort(&mut self) -> Result<()> {
        if self.state != SessionState::CheckpointOpen {
            return Err(self.usage("no checkpoint to abort"));
        }
        self.state = SessionState::Idle;
        if let Some(cmd) = &self.current {
            tracing::warn!(command = %cmd, "checkpoint aborted before dispatch");
        }
        Ok(())
    }

    /// Waits for the engine to finish the last dispatched checkpoint.
    ///
    /// Synchronous mode returns at once: `checkpoint_end` already delivered
    /// the result.
    ///
    /// # Errors
    ///
    /// In asynchronous mode, fails if a checkpoint is still open or the
    /// engine reports a non-success status.
    pub fn checkpoint_wait(&mut self) -> Result<()> {
        if self.dispatcher.mode() == DispatchMode::Sync {
            tracing::info!(
                "waiting for a checkpoint in sync mode is not necessary, \
                 the result is returned by checkpoint_end() directly"
            );
            return Ok(());
        }
        if self.state == SessionState::CheckpointOpen {
            return Err(
                self.usage("need to finalize local checkpoint first by calling checkpoint_end()")
            );
        }

        let status = self.dispatcher.wait_completion()?;
        if status.is_success() {
            Ok(())
        } else {
            tracing::error!(rank = self.rank, %status, "checkpoint failed in the engine");
            Err(CkptError::dispatch(CommandKind::Checkpoint, status))
        }
    }

    /// Probes the persistence side for `name` without moving any artifact,
    /// returning the aggregated status as reported.
    pub fn restart_test(&mut self, name: &str) -> Result<Status> {
        let cmd = CommandDescriptor::build(
            self.rank,
            CommandKind::Test,
            name,
            0,
            &self.config.scratch,
        )?;
        self.dispatcher.run_blocking(&cmd)
    }

    /// Prepares a restart from checkpoint `name` at `version`.
    ///
    /// If the artifact is already in the scratch directory nothing is
    /// dispatched. Otherwise the restart descriptor is run to completion so
    /// the persistence side can stage the artifact.
    ///
    /// # Errors
    ///
    /// Fails while a checkpoint is open, for an invalid name, or when the
    /// dispatch reports a non-success status.
    pub fn restart_begin(&mut self, name: &str, version: i32) -> Result<()> {
        if self.state == SessionState::CheckpointOpen {
            return Err(self.usage("cannot restart while checkpoint in progress"));
        }

        let cmd = CommandDescriptor::build(
            self.rank,
            CommandKind::Restart,
            name,
            version,
            &self.config.scratch,
        )?;
        let cmd = self.current.insert(cmd);

        if self.storage.exists(cmd.artifact_path())? {
            tracing::debug!(command = %cmd, "artifact already staged locally");
            return Ok(());
        }

        let status = self.dispatcher.run_blocking(cmd)?;
        check_status(cmd, status)
    }

    /// Restores protected regions from the current restart artifact.
    ///
    /// # Errors
    ///
    /// Fails for any mode other than [`RecoverMode::All`], when
    /// `restart_begin` has not been called, or when the record is
    /// unreadable or does not match the registered regions. A record that
    /// does not match leaves every region untouched.
    pub fn recover(&mut self, mode: RecoverMode) -> Result<()> {
        if mode != RecoverMode::All {
            return Err(self.usage("only RecoverMode::All is currently supported"));
        }
        let cmd = match &self.current {
            Some(cmd) if cmd.kind() == CommandKind::Restart => cmd,
            _ => return Err(self.usage("must call restart_begin() first")),
        };

        self.reader
            .read_validate_and_fill(cmd.artifact_path(), &self.registry)
            .map_err(|e| {
                tracing::error!(command = %cmd, error = %e, "cannot recover from checkpoint file");
                e
            })
    }

    /// Ends a restart. Kept for symmetry with `restart_begin`, so callers
    /// doing their own file I/O have a place to hook cleanup later.
    pub fn restart_end(&mut self) -> Result<()> {
        Ok(())
    }

    /// Artifact path of the current checkpoint or restart, for callers that
    /// write or read the file themselves instead of protecting memory.
    pub fn route_file(&self) -> Result<PathBuf> {
        match &self.current {
            Some(cmd) => Ok(cmd.artifact_path().to_path_buf()),
            None => Err(self.usage("call checkpoint_begin() or restart_begin() first")),
        }
    }

    fn usage(&self, message: &str) -> CkptError {
        tracing::error!(rank = self.rank, "{message}");
        CkptError::usage(message)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        tracing::debug!(rank = self.rank, "checkpoint client finalized");
    }
}

fn check_status(cmd: &CommandDescriptor, status: Status) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        tracing::error!(command = %cmd, %status, "dispatch reported failure");
        Err(CkptError::dispatch(cmd.kind(), status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::local_channel;
    use crate::checkpoint::format::{CATALOG_ENTRY_WIDTH, COUNT_WIDTH};
    use crate::modules::testing::ScriptedModule;
    use std::sync::Mutex;
    use std::thread;
    use tempfile::TempDir;

    fn sync_config(temp: &TempDir) -> ClientConfig {
        ClientConfig::new(temp.path().join("scratch"), DispatchMode::Sync)
    }

    fn async_config(temp: &TempDir) -> ClientConfig {
        ClientConfig::new(temp.path().join("scratch"), DispatchMode::Async)
    }

    fn recording_client(
        temp: &TempDir,
        statuses: Vec<Status>,
    ) -> (Client, Arc<Mutex<Vec<CommandDescriptor>>>) {
        let module = ScriptedModule::new("recorder", statuses);
        let seen = module.seen.clone();
        let client = Client::with_modules(
            0,
            sync_config(temp),
            ModuleManager::new().with_module(module),
        )
        .unwrap();
        (client, seen)
    }

    #[test]
    fn test_new_creates_scratch() {
        let temp = TempDir::new().unwrap();
        let client = Client::new(3, sync_config(&temp)).unwrap();

        assert!(temp.path().join("scratch").is_dir());
        assert_eq!(client.rank(), 3);
        assert_eq!(client.mode(), DispatchMode::Sync);
        assert!(!client.is_checkpoint_in_progress());
    }

    #[test]
    fn test_new_rejects_async_config() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            Client::new(0, async_config(&temp)),
            Err(CkptError::Config { .. })
        ));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = ClientConfig::default();
        config.buffer_size = 0;
        assert!(matches!(Client::new(0, config), Err(CkptError::Config { .. })));
    }

    #[test]
    fn test_with_channel_checks_mode_and_rank() {
        let temp = TempDir::new().unwrap();

        let (channel, _engine) = local_channel(0);
        assert!(Client::with_channel(0, sync_config(&temp), channel).is_err());

        let (channel, _engine) = local_channel(1);
        assert!(Client::with_channel(0, async_config(&temp), channel).is_err());

        let (channel, _engine) = local_channel(0);
        let client = Client::with_channel(0, async_config(&temp), channel).unwrap();
        assert_eq!(client.mode(), DispatchMode::Async);
    }

    #[test]
    fn test_nested_begin_rejected_and_first_descriptor_kept() {
        let temp = TempDir::new().unwrap();
        let mut client = Client::new(0, sync_config(&temp)).unwrap();

        client.checkpoint_begin("first", 1).unwrap();
        let err = client.checkpoint_begin("second", 2).unwrap_err();

        assert!(err.is_usage());
        assert!(client.is_checkpoint_in_progress());
        let current = client.current_descriptor().unwrap();
        assert_eq!(current.name(), "first");
        assert_eq!(current.version(), 1);
    }

    #[test]
    fn test_invalid_name_keeps_idle() {
        let temp = TempDir::new().unwrap();
        let mut client = Client::new(0, sync_config(&temp)).unwrap();

        assert!(client.checkpoint_begin("", 1).is_err());
        assert!(!client.is_checkpoint_in_progress());
        assert!(client.current_descriptor().is_none());
    }

    #[test]
    fn test_write_requires_begin() {
        let temp = TempDir::new().unwrap();
        let mut client = Client::new(0, sync_config(&temp)).unwrap();

        assert!(client.checkpoint_write().unwrap_err().is_usage());
    }

    #[test]
    fn test_end_requires_begin() {
        let temp = TempDir::new().unwrap();
        let (mut client, seen) = recording_client(&temp, vec![]);

        assert!(client.checkpoint_end().unwrap_err().is_usage());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sync_checkpoint_dispatches_on_end() {
        let temp = TempDir::new().unwrap();
        let (mut client, seen) = recording_client(&temp, vec![Status::SUCCESS]);

        let mut value = [1u8, 2, 3];
        unsafe { client.protect(1, value.as_mut_ptr(), value.len()) };

        client.checkpoint_begin("state", 4).unwrap();
        client.checkpoint_write().unwrap();
        assert!(seen.lock().unwrap().is_empty());
        client.checkpoint_end().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind(), CommandKind::Checkpoint);
        assert_eq!(seen[0].version(), 4);
        assert!(seen[0].artifact_path().exists());
        assert!(!client.is_checkpoint_in_progress());
    }

    #[test]
    fn test_sync_end_reports_module_failure_and_closes() {
        let temp = TempDir::new().unwrap();
        let (mut client, _) = recording_client(&temp, vec![Status::FAILURE]);

        client.checkpoint_begin("state", 1).unwrap();
        let err = client.checkpoint_end().unwrap_err();

        assert!(matches!(
            err,
            CkptError::Dispatch {
                kind: CommandKind::Checkpoint,
                status: Status::FAILURE
            }
        ));
        assert!(!client.is_checkpoint_in_progress());
    }

    #[test]
    fn test_sync_end_reports_negative_module_status() {
        let temp = TempDir::new().unwrap();
        let (mut client, _) = recording_client(&temp, vec![Status::from_code(-1)]);

        client.checkpoint_begin("state", 1).unwrap();
        let err = client.checkpoint_end().unwrap_err();

        assert!(matches!(
            err,
            CkptError::Dispatch { status, .. } if status == Status::from_code(-1)
        ));
        assert_eq!(client.restart_test("state").unwrap(), Status::from_code(-1));
    }

    #[test]
    fn test_failed_write_keeps_checkpoint_open() {
        let temp = TempDir::new().unwrap();
        let (mut client, seen) = recording_client(&temp, vec![Status::SUCCESS]);
        let mut value = [5u8; 4];
        unsafe { client.protect_slice(1, &mut value) };

        // A directory at the artifact path makes the write fail.
        let blocker = temp.path().join("scratch").join("state-0-1.dat");
        std::fs::create_dir_all(&blocker).unwrap();

        client.checkpoint_begin("state", 1).unwrap();
        assert!(matches!(client.checkpoint_write(), Err(CkptError::Storage { .. })));
        assert!(client.is_checkpoint_in_progress());
        assert!(client.checkpoint_begin("other", 2).unwrap_err().is_usage());
        assert_eq!(client.current_descriptor().unwrap().name(), "state");

        std::fs::remove_dir(&blocker).unwrap();
        client.checkpoint_write().unwrap();
        client.checkpoint_end().unwrap();

        assert_eq!(
            std::fs::read(&blocker).unwrap().len(),
            COUNT_WIDTH + CATALOG_ENTRY_WIDTH + value.len()
        );
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_write_can_be_aborted() {
        let temp = TempDir::new().unwrap();
        let (mut client, seen) = recording_client(&temp, vec![Status::SUCCESS]);
        std::fs::create_dir_all(temp.path().join("scratch").join("state-0-1.dat")).unwrap();

        client.checkpoint_begin("state", 1).unwrap();
        assert!(client.checkpoint_write().is_err());
        client.checkpoint_abort().unwrap();

        assert!(!client.is_checkpoint_in_progress());
        assert!(seen.lock().unwrap().is_empty());
        client.checkpoint_begin("state", 2).unwrap();
    }

    #[test]
    fn test_abort_closes_without_dispatch() {
        let temp = TempDir::new().unwrap();
        let (mut client, seen) = recording_client(&temp, vec![]);

        client.checkpoint_begin("state", 1).unwrap();
        client.checkpoint_abort().unwrap();

        assert!(!client.is_checkpoint_in_progress());
        assert!(seen.lock().unwrap().is_empty());
        assert!(client.checkpoint_abort().unwrap_err().is_usage());
    }

    #[test]
    fn test_sync_wait_always_succeeds() {
        let temp = TempDir::new().unwrap();
        let (mut client, _) = recording_client(&temp, vec![Status::FAILURE]);

        client.checkpoint_wait().unwrap();
        client.checkpoint_begin("state", 1).unwrap();
        client.checkpoint_wait().unwrap();
        let _ = client.checkpoint_end();
        client.checkpoint_wait().unwrap();
    }

    #[test]
    fn test_async_wait_while_open_rejected() {
        let temp = TempDir::new().unwrap();
        let (channel, _engine) = local_channel(0);
        let mut client = Client::with_channel(0, async_config(&temp), channel).unwrap();

        client.checkpoint_begin("state", 1).unwrap();
        assert!(client.checkpoint_wait().unwrap_err().is_usage());
        assert!(client.is_checkpoint_in_progress());
    }

    #[test]
    fn test_async_end_enqueues_and_wait_reports_engine_status() {
        let temp = TempDir::new().unwrap();
        let (channel, mut engine) = local_channel(0);
        let mut client = Client::with_channel(0, async_config(&temp), channel).unwrap();

        client.checkpoint_begin("state", 2).unwrap();
        client.checkpoint_write().unwrap();
        client.checkpoint_end().unwrap();

        let cmd = engine.recv().unwrap();
        assert_eq!(cmd.kind(), CommandKind::Checkpoint);
        engine.complete(Status::from_code(9)).unwrap();

        let err = client.checkpoint_wait().unwrap_err();
        assert!(matches!(
            err,
            CkptError::Dispatch { status, .. } if status == Status::from_code(9)
        ));
    }

    #[test]
    fn test_restart_during_checkpoint_rejected() {
        let temp = TempDir::new().unwrap();
        let mut client = Client::new(0, sync_config(&temp)).unwrap();

        client.checkpoint_begin("state", 1).unwrap();
        assert!(client.restart_begin("state", 1).unwrap_err().is_usage());
        assert_eq!(
            client.current_descriptor().unwrap().kind(),
            CommandKind::Checkpoint
        );
    }

    #[test]
    fn test_restart_short_circuits_when_artifact_present() {
        let temp = TempDir::new().unwrap();
        let (mut client, seen) = recording_client(&temp, vec![Status::FAILURE]);

        std::fs::write(temp.path().join("scratch/state-0-1.dat"), 0usize.to_ne_bytes()).unwrap();

        client.restart_begin("state", 1).unwrap();
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_restart_dispatches_when_artifact_absent() {
        let temp = TempDir::new().unwrap();
        let (mut client, seen) = recording_client(&temp, vec![Status::SUCCESS]);
        client.restart_begin("state", 1).unwrap();
        assert_eq!(seen.lock().unwrap()[0].kind(), CommandKind::Restart);

        let (mut failing, _) = recording_client(&temp, vec![Status::FAILURE]);
        let err = failing.restart_begin("state", 2).unwrap_err();
        assert!(matches!(err, CkptError::Dispatch { kind: CommandKind::Restart, .. }));
    }

    #[test]
    fn test_async_restart_waits_for_engine() {
        let temp = TempDir::new().unwrap();
        let (channel, mut engine) = local_channel(0);
        let mut client = Client::with_channel(0, async_config(&temp), channel).unwrap();

        let handle = thread::spawn(move || {
            let cmd = engine.recv().unwrap();
            engine.complete(Status::SUCCESS).unwrap();
            cmd
        });

        client.restart_begin("state", 5).unwrap();
        assert_eq!(handle.join().unwrap().kind(), CommandKind::Restart);
    }

    #[test]
    fn test_recover_requires_restart_begin() {
        let temp = TempDir::new().unwrap();
        let mut client = Client::new(0, sync_config(&temp)).unwrap();

        assert!(client.recover(RecoverMode::All).unwrap_err().is_usage());

        client.checkpoint_begin("state", 1).unwrap();
        assert!(client.recover(RecoverMode::All).unwrap_err().is_usage());
    }

    #[test]
    fn test_recover_unsupported_modes() {
        let temp = TempDir::new().unwrap();
        let mut client = Client::new(0, sync_config(&temp)).unwrap();

        let ids = BTreeSet::from([1]);
        assert!(client.recover(RecoverMode::Some(ids.clone())).unwrap_err().is_usage());
        assert!(client.recover(RecoverMode::Rest(ids)).unwrap_err().is_usage());
    }

    #[test]
    fn test_route_file() {
        let temp = TempDir::new().unwrap();
        let mut client = Client::new(7, sync_config(&temp)).unwrap();

        assert!(client.route_file().unwrap_err().is_usage());

        client.checkpoint_begin("files", 3).unwrap();
        assert_eq!(
            client.route_file().unwrap(),
            temp.path().join("scratch").join("files-7-3.dat")
        );
    }

    #[test]
    fn test_restart_test_returns_raw_status() {
        let temp = TempDir::new().unwrap();
        let (mut client, seen) = recording_client(&temp, vec![Status::from_code(4)]);

        assert_eq!(client.restart_test("state").unwrap(), Status::from_code(4));
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].kind(), CommandKind::Test);
        assert_eq!(seen[0].version(), 0);
        assert!(client.current_descriptor().is_none());
    }

    #[test]
    fn test_unprotect() {
        let temp = TempDir::new().unwrap();
        let mut client = Client::new(0, sync_config(&temp)).unwrap();
        let mut value = [0u32; 2];

        unsafe { client.protect_slice(1, &mut value) };
        assert_eq!(client.registry().get(1).unwrap().len(), 8);
        assert!(client.unprotect(1));
        assert!(!client.unprotect(1));
    }
}
