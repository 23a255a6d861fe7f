//! `s3up cancel <folder>` / `s3up cancel --all` – signal a running `s3up upload`.

use anyhow::{bail, Context, Result};
use s3up_core::control::{self, ControlCommand};
use s3up_core::job::JobId;
use std::path::Path;

use crate::cli::control_socket::{self, Reply};

pub async fn run_cancel(folder: Option<&Path>, all: bool) -> Result<()> {
    let command = match (folder, all) {
        (_, true) => ControlCommand::CancelAll,
        (Some(folder), false) => ControlCommand::Cancel(
            JobId::from_source(folder)
                .with_context(|| format!("resolve {}", folder.display()))?,
        ),
        (None, false) => bail!("pass a folder or --all"),
    };

    let socket_path = control::default_control_socket_path()?;
    match control_socket::send_command(&socket_path, &command).await? {
        Reply::Ok => match &command {
            ControlCommand::Cancel(id) => println!("Cancel requested for {id}"),
            ControlCommand::CancelAll => println!("All uploads canceled"),
        },
        Reply::NotFound => match &command {
            ControlCommand::Cancel(id) => bail!("no queued or running upload for {id}"),
            ControlCommand::CancelAll => bail!("upload process did not accept cancel-all"),
        },
    }
    Ok(())
}
