//! Job control over a local socket: cancel one upload or all of them.
//!
//! While `s3up upload` runs it listens on a Unix socket; `s3up cancel` connects
//! and writes one command per line: `cancel <job-id>` or `cancel-all`.
//! Cancellation itself is cooperative: each running job holds a
//! `CancellationToken` that its worker checks at every suspension point.

use std::path::PathBuf;

use crate::job::JobId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Cancel(JobId),
    CancelAll,
}

impl ControlCommand {
    /// Parses one protocol line. Returns `None` for malformed lines.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line == "cancel-all" {
            return Some(ControlCommand::CancelAll);
        }
        let id = line.strip_prefix("cancel ")?.trim();
        if id.is_empty() {
            return None;
        }
        Some(ControlCommand::Cancel(JobId::new(id)))
    }

    /// Wire form, newline-terminated.
    pub fn to_line(&self) -> String {
        match self {
            ControlCommand::Cancel(id) => format!("cancel {}\n", id),
            ControlCommand::CancelAll => "cancel-all\n".to_string(),
        }
    }
}

/// Default path for the control socket (XDG state dir, next to the log file).
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("s3up")?.get_state_home();
    Ok(dir.join("s3up").join("control.sock"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_commands() {
        assert_eq!(
            ControlCommand::parse("cancel /data/My Photos\n"),
            Some(ControlCommand::Cancel(JobId::new("/data/My Photos")))
        );
        assert_eq!(
            ControlCommand::parse("  cancel-all  "),
            Some(ControlCommand::CancelAll)
        );
    }

    #[test]
    fn malformed_lines_are_ignored() {
        assert_eq!(ControlCommand::parse(""), None);
        assert_eq!(ControlCommand::parse("cancel"), None);
        assert_eq!(ControlCommand::parse("cancel   "), None);
        assert_eq!(ControlCommand::parse("pause 1"), None);
    }

    #[test]
    fn line_roundtrip() {
        let cmd = ControlCommand::Cancel(JobId::new("/srv/SS01"));
        assert_eq!(cmd.to_line(), "cancel /srv/SS01\n");
        assert_eq!(ControlCommand::parse(&cmd.to_line()), Some(cmd));
    }
}
