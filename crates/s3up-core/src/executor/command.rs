//! Child-process transfer executor (`aws s3 cp <src> <dst> --recursive`).

use async_trait::async_trait;
use std::ffi::OsString;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;

use super::lines::LineReader;
use super::{TransferExecutor, TransferExit, TransferProcess};
use crate::config::ExecutorConfig;
use crate::job::Job;
use crate::retry::TransferError;

/// How much of the executor's stderr is kept for diagnostics.
const STDERR_TAIL_BYTES: usize = 8 * 1024;

/// Runs `<program> <extra_args..> s3 cp <source> <destination> --recursive`.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: OsString,
    extra_args: Vec<OsString>,
}

impl CommandExecutor {
    pub fn new(program: impl Into<OsString>, extra_args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            extra_args,
        }
    }

    pub fn from_config(cfg: &ExecutorConfig) -> Self {
        Self::new(
            &cfg.program,
            cfg.extra_args.iter().map(OsString::from).collect(),
        )
    }

    /// Full argument list (excluding the program) for `job`.
    pub fn args_for(&self, job: &Job) -> Vec<OsString> {
        let mut args = self.extra_args.clone();
        args.push("s3".into());
        args.push("cp".into());
        args.push(job.source.clone().into_os_string());
        args.push(job.destination_url().into());
        args.push("--recursive".into());
        args
    }
}

#[async_trait]
impl TransferExecutor for CommandExecutor {
    async fn start(&self, job: &Job) -> Result<Box<dyn TransferProcess>, TransferError> {
        let mut child = Command::new(&self.program)
            .args(self.args_for(job))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(TransferError::Spawn)?;

        let stdout = child.stdout.take().ok_or_else(|| {
            TransferError::Spawn(std::io::Error::other("child stdout was not captured"))
        })?;
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(drain_tail(err, STDERR_TAIL_BYTES)));

        tracing::debug!(
            job_id = %job.id,
            pid = child.id(),
            destination = %job.destination_url(),
            "transfer executor started"
        );
        Ok(Box::new(ChildTransfer {
            child,
            stdout: LineReader::new(stdout),
            stderr,
        }))
    }
}

struct ChildTransfer {
    child: Child,
    stdout: LineReader<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
}

#[async_trait]
impl TransferProcess for ChildTransfer {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.stdout.next_line().await
    }

    async fn wait(&mut self) -> std::io::Result<TransferExit> {
        let status = self.child.wait().await?;
        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };
        Ok(TransferExit {
            code: status.code(),
            stderr,
        })
    }

    async fn terminate(&mut self) {
        if let Err(e) = self.child.start_kill() {
            tracing::debug!("transfer executor kill: {}", e);
        }
        if let Err(e) = self.child.wait().await {
            tracing::debug!("transfer executor reap: {}", e);
        }
        if let Some(handle) = self.stderr.take() {
            handle.abort();
        }
    }
}

/// Reads `reader` to the end, keeping only the last `limit` bytes.
/// Draining concurrently keeps the child from blocking on a full stderr pipe.
async fn drain_tail<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> String {
    let mut tail: Vec<u8> = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                tail.extend_from_slice(&buf[..n]);
                if tail.len() > limit {
                    let excess = tail.len() - limit;
                    tail.drain(..excess);
                }
            }
        }
    }
    String::from_utf8_lossy(&tail).into_owned()
}
