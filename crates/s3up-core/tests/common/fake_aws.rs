//! Stand-in for the AWS CLI: a shell script run through `sh`.
//!
//! The script records its arguments (one per line) and appends one line per
//! invocation to a counter file, then runs the scenario body.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use s3up_core::executor::CommandExecutor;

pub struct FakeAws {
    pub script: PathBuf,
    pub args_file: PathBuf,
    pub calls_file: PathBuf,
}

impl FakeAws {
    /// Writes a script into `dir` that runs `body` after recording the call.
    pub fn new(dir: &Path, body: &str) -> Self {
        let script = dir.join("fake-aws.sh");
        let args_file = dir.join("args.txt");
        let calls_file = dir.join("calls.txt");
        let text = format!(
            "printf '%s\\n' \"$@\" > '{}'\necho call >> '{}'\n{}\n",
            args_file.display(),
            calls_file.display(),
            body
        );
        std::fs::write(&script, text).expect("write fake aws script");
        Self {
            script,
            args_file,
            calls_file,
        }
    }

    /// Executor that runs `sh <script> s3 cp ...`.
    pub fn executor(&self) -> CommandExecutor {
        CommandExecutor::new("sh", vec![OsString::from(&self.script)])
    }

    /// Arguments of the last call, without the script path.
    pub fn last_args(&self) -> Vec<String> {
        std::fs::read_to_string(&self.args_file)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn calls(&self) -> usize {
        std::fs::read_to_string(&self.calls_file)
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }
}
