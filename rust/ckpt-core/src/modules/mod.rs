// rust/ckpt-core/src/modules/mod.rs

//! In-process persistence modules for synchronous dispatch.
//!
//! A [`ModuleManager`] owns an ordered list of [`Module`]s. Dispatching a
//! command calls every module once, in insertion order; each module may
//! report any number of statuses through the callback, and the dispatch
//! result is the most severe of them ([`Status::SUCCESS`] when nobody
//! reports anything).

mod transfer;
mod versioning;

use std::sync::Arc;

use crate::command::{CommandDescriptor, Status};
use crate::config::ClientConfig;
use crate::storage::StorageBackend;

pub use transfer::TransferModule;
pub use versioning::VersioningModule;

/// A persistence or transformation step notified of every command.
pub trait Module: Send {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Handles `cmd`, reporting outcomes through `on_status`.
    ///
    /// Modules that have nothing to do for a command kind should return
    /// without reporting.
    fn notify(&mut self, cmd: &CommandDescriptor, on_status: &mut dyn FnMut(Status));
}

/// Ordered collection of modules.
#[derive(Default)]
pub struct ModuleManager {
    modules: Vec<Box<dyn Module>>,
}

impl ModuleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the default module chain for `config`: transfer to the
    /// persistent tier when one is configured, then version pruning when
    /// `max_versions` is non-zero.
    pub fn from_config(config: &ClientConfig, storage: Arc<dyn StorageBackend>) -> Self {
        let mut manager = Self::new();
        if let Some(persistent) = &config.persistent {
            manager.push(TransferModule::new(storage.clone(), persistent.clone()));
        }
        if config.max_versions > 0 {
            let mut versioning = VersioningModule::new(storage, config.max_versions);
            if let Some(persistent) = &config.persistent {
                versioning = versioning.with_dir(persistent.clone());
            }
            manager.push(versioning);
        }
        manager
    }

    #[must_use]
    pub fn with_module(mut self, module: impl Module + 'static) -> Self {
        self.push(module);
        self
    }

    pub fn push(&mut self, module: impl Module + 'static) {
        self.modules.push(Box::new(module));
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    /// Notifies every module of `cmd` in order.
    pub fn notify_command(&mut self, cmd: &CommandDescriptor, on_status: &mut dyn FnMut(Status)) {
        for module in &mut self.modules {
            tracing::trace!(module = module.name(), command = %cmd, "notifying module");
            module.notify(cmd, on_status);
        }
    }

    /// Notifies every module and returns the most severe reported status.
    pub fn run(&mut self, cmd: &CommandDescriptor) -> Status {
        let mut result = Status::SUCCESS;
        self.notify_command(cmd, &mut |status| result = result.merge(status));
        result
    }
}

impl std::fmt::Debug for ModuleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleManager")
            .field("modules", &self.names())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedModule;
    use super::*;
    use crate::command::CommandKind;
    use crate::config::DispatchMode;
    use crate::storage::LocalStorage;
    use std::path::Path;

    fn command() -> CommandDescriptor {
        CommandDescriptor::build(0, CommandKind::Checkpoint, "m", 1, Path::new("/s")).unwrap()
    }

    #[test]
    fn test_empty_manager_reports_success() {
        let mut manager = ModuleManager::new();
        assert_eq!(manager.run(&command()), Status::SUCCESS);
    }

    #[test]
    fn test_run_takes_most_severe_status() {
        let mut manager = ModuleManager::new()
            .with_module(ScriptedModule::new("a", vec![Status::SUCCESS]))
            .with_module(ScriptedModule::new("b", vec![Status::from_code(5), Status::FAILURE]))
            .with_module(ScriptedModule::new("c", vec![]));

        assert_eq!(manager.run(&command()), Status::from_code(5));
    }

    #[test]
    fn test_run_keeps_negative_status() {
        let mut manager = ModuleManager::new()
            .with_module(ScriptedModule::new("ok", vec![Status::SUCCESS]))
            .with_module(ScriptedModule::new("neg", vec![Status::from_code(-1)]))
            .with_module(ScriptedModule::new("late", vec![Status::SUCCESS]));

        let status = manager.run(&command());
        assert_eq!(status, Status::from_code(-1));
        assert!(!status.is_success());
    }

    #[test]
    fn test_modules_notified_in_order_once() {
        let first = ScriptedModule::new("first", vec![]);
        let second = ScriptedModule::new("second", vec![]);
        let seen_first = first.seen.clone();
        let seen_second = second.seen.clone();

        let mut manager = ModuleManager::new().with_module(first).with_module(second);
        assert_eq!(manager.names(), vec!["first", "second"]);

        manager.run(&command());

        assert_eq!(seen_first.lock().unwrap().len(), 1);
        assert_eq!(seen_second.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_from_config_chain() {
        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::default());

        let bare = ClientConfig::new("/s", DispatchMode::Sync);
        assert!(ModuleManager::from_config(&bare, storage.clone()).is_empty());

        let full = ClientConfig::new("/s", DispatchMode::Sync)
            .with_persistent("/p")
            .with_max_versions(2);
        let manager = ModuleManager::from_config(&full, storage);
        assert_eq!(manager.names(), vec!["transfer", "versioning"]);
    }
}
