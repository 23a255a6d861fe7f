//! Transfer executor: the external program that copies a folder tree to the
//! remote prefix and prints progress lines while it does.
//!
//! The worker only needs three things from a running transfer: its output one
//! line at a time, its exit status, and a way to kill it. That contract is the
//! [`TransferProcess`] trait; [`CommandExecutor`] implements it on top of a
//! child process (the AWS CLI by default).

mod command;
mod lines;
#[cfg(test)]
pub(crate) mod scripted;

use async_trait::async_trait;

pub use command::CommandExecutor;
pub use lines::LineReader;

use crate::job::Job;
use crate::retry::TransferError;

/// How a transfer process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferExit {
    /// Exit code; `None` if the process was killed by a signal.
    pub code: Option<i32>,
    /// Tail of the process's error output.
    pub stderr: String,
}

impl TransferExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Starts transfers. Shared by all workers.
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    /// Starts copying `job.source` to `job.destination_url()`.
    async fn start(&self, job: &Job) -> Result<Box<dyn TransferProcess>, TransferError>;
}

/// One running transfer, owned by one worker.
#[async_trait]
pub trait TransferProcess: Send {
    /// Next line of standard output; `None` at end of output.
    async fn next_line(&mut self) -> std::io::Result<Option<String>>;

    /// Waits for the process to exit. Call after `next_line` returned `None`.
    async fn wait(&mut self) -> std::io::Result<TransferExit>;

    /// Kills the process and reaps it. Safe to call more than once.
    async fn terminate(&mut self);
}
