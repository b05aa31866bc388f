// rust/ckpt-core/src/dispatch/local.rs

use super::{Dispatcher, Submission};
use crate::command::{CommandDescriptor, Status};
use crate::config::DispatchMode;
use crate::error::Result;
use crate::modules::ModuleManager;

/// Synchronous dispatch through in-process modules.
#[derive(Debug)]
pub struct LocalDispatcher {
    modules: ModuleManager,
}

impl LocalDispatcher {
    pub fn new(modules: ModuleManager) -> Self {
        Self { modules }
    }
}

impl Dispatcher for LocalDispatcher {
    fn mode(&self) -> DispatchMode {
        DispatchMode::Sync
    }

    fn submit(&mut self, cmd: &CommandDescriptor) -> Result<Submission> {
        let status = self.modules.run(cmd);
        tracing::debug!(command = %cmd, %status, "modules finished");
        Ok(Submission::Completed(status))
    }

    /// Nothing is ever outstanding: results come back from `submit`.
    fn wait_completion(&mut self) -> Result<Status> {
        Ok(Status::SUCCESS)
    }
}
