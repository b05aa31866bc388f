// rust/ckpt-core/src/channel.rs

//! Command channel between a client and an out-of-process persistence
//! engine.
//!
//! Logically the channel is an append point for outgoing commands plus a
//! completion slot per outstanding command. [`CommandChannel`] is the
//! client-side boundary; [`local_channel`] builds an in-process pair over
//! crossbeam channels whose engine half ([`EngineEndpoint`]) can run a
//! [`ModuleManager`] on any thread the caller chooses.
//!
//! There is no timeout and no cancellation: once enqueued, a command runs
//! to completion on the engine side, and `wait_completion` blocks until the
//! engine answers.

use crossbeam::channel::{self, Receiver, Sender};

use crate::command::{CommandDescriptor, Status};
use crate::error::{CkptError, Result};
use crate::modules::ModuleManager;

/// Client side of a command channel, keyed by rank.
pub trait CommandChannel {
    /// Rank this channel carries commands for.
    fn rank(&self) -> i32;

    /// Hands `cmd` to the engine without waiting for it to run.
    fn enqueue(&mut self, cmd: &CommandDescriptor) -> Result<()>;

    /// Blocks until the engine reports the status of the most recently
    /// enqueued command.
    fn wait_completion(&mut self) -> Result<Status>;
}

#[derive(Debug)]
struct Envelope {
    seq: u64,
    cmd: CommandDescriptor,
}

#[derive(Debug, Clone, Copy)]
struct Completion {
    seq: u64,
    status: Status,
}

/// Builds a connected in-process channel pair for `rank`.
pub fn local_channel(rank: i32) -> (LocalChannel, EngineEndpoint) {
    let (command_tx, command_rx) = channel::unbounded();
    let (completion_tx, completion_rx) = channel::unbounded();

    let client = LocalChannel {
        rank,
        commands: command_tx,
        completions: completion_rx,
        last_enqueued: 0,
        last_completed: None,
    };
    let engine = EngineEndpoint {
        rank,
        commands: command_rx,
        completions: completion_tx,
        current: None,
    };
    (client, engine)
}

/// Client half of [`local_channel`].
#[derive(Debug)]
pub struct LocalChannel {
    rank: i32,
    commands: Sender<Envelope>,
    completions: Receiver<Completion>,
    /// Sequence number of the newest enqueued command; 0 before the first.
    last_enqueued: u64,
    last_completed: Option<Completion>,
}

impl CommandChannel for LocalChannel {
    fn rank(&self) -> i32 {
        self.rank
    }

    fn enqueue(&mut self, cmd: &CommandDescriptor) -> Result<()> {
        if cmd.origin_rank() != self.rank {
            return Err(CkptError::channel(
                self.rank,
                format!("refusing command from rank {}", cmd.origin_rank()),
            ));
        }

        let seq = self.last_enqueued + 1;
        self.commands
            .send(Envelope {
                seq,
                cmd: cmd.clone(),
            })
            .map_err(|_| CkptError::channel(self.rank, "engine has disconnected"))?;
        self.last_enqueued = seq;

        tracing::debug!(rank = self.rank, seq, command = %cmd, "command enqueued");
        Ok(())
    }

    fn wait_completion(&mut self) -> Result<Status> {
        if self.last_enqueued == 0 {
            return Ok(Status::SUCCESS);
        }

        loop {
            if let Some(done) = self.last_completed {
                if done.seq >= self.last_enqueued {
                    return Ok(done.status);
                }
            }

            let completion = self
                .completions
                .recv()
                .map_err(|_| CkptError::channel(self.rank, "engine hung up before completing"))?;
            self.last_completed = Some(completion);
        }
    }
}

/// Engine half of [`local_channel`].
#[derive(Debug)]
pub struct EngineEndpoint {
    rank: i32,
    commands: Receiver<Envelope>,
    completions: Sender<Completion>,
    current: Option<u64>,
}

impl EngineEndpoint {
    pub fn rank(&self) -> i32 {
        self.rank
    }

    /// Blocks for the next command. Returns `None` once the client side is
    /// gone and every queued command has been received.
    pub fn recv(&mut self) -> Option<CommandDescriptor> {
        let envelope = self.commands.recv().ok()?;
        self.current = Some(envelope.seq);
        Some(envelope.cmd)
    }

    /// Reports the outcome of the command last returned by [`recv`].
    ///
    /// [`recv`]: EngineEndpoint::recv
    ///
    /// # Errors
    ///
    /// Returns an error if there is no command to complete or the client
    /// side is gone.
    pub fn complete(&mut self, status: Status) -> Result<()> {
        let seq = self
            .current
            .take()
            .ok_or_else(|| CkptError::channel(self.rank, "no command awaiting completion"))?;

        self.completions
            .send(Completion { seq, status })
            .map_err(|_| CkptError::channel(self.rank, "client has disconnected"))
    }

    /// Runs every received command through `modules` until the client
    /// hangs up. Returns the number of commands processed.
    pub fn serve(mut self, mut modules: ModuleManager) -> usize {
        let mut processed = 0;
        while let Some(cmd) = self.recv() {
            let status = modules.run(&cmd);
            tracing::debug!(rank = self.rank, command = %cmd, %status, "engine completed command");
            processed += 1;
            if self.complete(status).is_err() {
                break;
            }
        }
        processed
    }
}
