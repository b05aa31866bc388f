// rust/ckpt-core/src/dispatch/remote.rs

use super::{Dispatcher, Submission};
use crate::channel::CommandChannel;
use crate::command::{CommandDescriptor, Status};
use crate::config::DispatchMode;
use crate::error::Result;

/// Asynchronous dispatch to an external engine over a command channel.
pub struct ChannelDispatcher {
    channel: Box<dyn CommandChannel>,
}

impl ChannelDispatcher {
    pub fn new(channel: Box<dyn CommandChannel>) -> Self {
        Self { channel }
    }

    pub fn rank(&self) -> i32 {
        self.channel.rank()
    }
}

impl Dispatcher for ChannelDispatcher {
    fn mode(&self) -> DispatchMode {
        DispatchMode::Async
    }

    fn submit(&mut self, cmd: &CommandDescriptor) -> Result<Submission> {
        self.channel.enqueue(cmd)?;
        Ok(Submission::Enqueued)
    }

    fn wait_completion(&mut self) -> Result<Status> {
        let status = self.channel.wait_completion()?;
        tracing::debug!(rank = self.channel.rank(), %status, "engine reported completion");
        Ok(status)
    }
}
