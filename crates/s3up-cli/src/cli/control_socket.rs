//! Control socket: server (during `s3up upload`) and client (for `s3up cancel`).
//! Protocol: one command line in, one reply line out (`ok` or `not-found`).

use anyhow::{bail, Context, Result};
use s3up_core::control::ControlCommand;
use s3up_core::scheduler::Scheduler;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Ok,
    NotFound,
}

impl Reply {
    fn as_str(self) -> &'static str {
        match self {
            Reply::Ok => "ok",
            Reply::NotFound => "not-found",
        }
    }

    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "ok" => Some(Reply::Ok),
            "not-found" => Some(Reply::NotFound),
            _ => None,
        }
    }
}

/// Binds `path` and spawns a task that applies each command to `scheduler`.
/// Malformed lines are ignored. A stale socket file at `path` is replaced.
pub fn spawn_control_listener(
    scheduler: Scheduler,
    path: impl AsRef<Path>,
) -> Result<JoinHandle<()>> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = std::fs::remove_file(path);
    let listener =
        UnixListener::bind(path).with_context(|| format!("bind {}", path.display()))?;

    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let scheduler = scheduler.clone();
                    tokio::spawn(serve(stream, scheduler));
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

async fn serve(stream: UnixStream, scheduler: Scheduler) {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Some(command) = ControlCommand::parse(&line) else {
            tracing::debug!(line = %line.trim(), "ignoring malformed control line");
            continue;
        };
        tracing::info!(?command, "control command received");
        let reply = match &command {
            ControlCommand::Cancel(id) => {
                if scheduler.cancel(id) {
                    Reply::Ok
                } else {
                    Reply::NotFound
                }
            }
            ControlCommand::CancelAll => {
                scheduler.cancel_all().await;
                Reply::Ok
            }
        };
        let msg = format!("{}\n", reply.as_str());
        if write.write_all(msg.as_bytes()).await.is_err() {
            break;
        }
    }
}

/// Sends one command to the control socket and returns the reply.
pub async fn send_command(socket_path: &Path, command: &ControlCommand) -> Result<Reply> {
    if !socket_path.exists() {
        bail!(
            "no running upload (control socket {} not found)",
            socket_path.display()
        );
    }
    let stream = UnixStream::connect(socket_path)
        .await
        .with_context(|| format!("connect {}", socket_path.display()))?;
    let (read, mut write) = stream.into_split();
    write.write_all(command.to_line().as_bytes()).await?;
    write.shutdown().await?;

    let mut lines = BufReader::new(read).lines();
    let line = lines
        .next_line()
        .await?
        .context("upload process closed the control socket without replying")?;
    Reply::parse(&line).with_context(|| format!("unexpected control reply {:?}", line))
}
