// rust/ckpt-core/src/dispatch/mod.rs

//! Dispatch strategies.
//!
//! A client picks exactly one [`Dispatcher`] at construction and keeps it:
//! - [`LocalDispatcher`] runs the in-process modules on the calling thread
//!   and returns their aggregated status immediately
//! - [`ChannelDispatcher`] enqueues descriptors on a [`CommandChannel`] and
//!   retrieves the engine's status later with a blocking wait
//!
//! [`CommandChannel`]: crate::channel::CommandChannel

mod local;
mod remote;

use crate::command::{CommandDescriptor, Status};
use crate::config::DispatchMode;
use crate::error::Result;

pub use local::LocalDispatcher;
pub use remote::ChannelDispatcher;

/// What happened to a submitted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Ran to completion during submission.
    Completed(Status),
    /// Handed off; the status arrives through `wait_completion`.
    Enqueued,
}

/// Routes command descriptors to the persistence side.
pub trait Dispatcher {
    fn mode(&self) -> DispatchMode;

    /// Submits `cmd`. Synchronous dispatchers finish the work before
    /// returning; asynchronous ones only enqueue it.
    fn submit(&mut self, cmd: &CommandDescriptor) -> Result<Submission>;

    /// Blocks until the most recently submitted command has a status.
    fn wait_completion(&mut self) -> Result<Status>;

    /// Submits `cmd` and waits for its status.
    fn run_blocking(&mut self, cmd: &CommandDescriptor) -> Result<Status> {
        match self.submit(cmd)? {
            Submission::Completed(status) => Ok(status),
            Submission::Enqueued => self.wait_completion(),
        }
    }
}
