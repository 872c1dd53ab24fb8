//! Narrow seam between the plumbing parsers and the `git` executable
//!
//! Everything the repository layer knows about git arrives as text through a
//! [`ProcessRunner`]. Production code uses [`SystemRunner`]; tests feed canned
//! output instead.

use crate::error::GitError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Captured result of one process invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub code: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout followed by stderr, like a merged output stream
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Runs a program with arguments in a directory and captures its output
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program args..` inside `dir`.
    ///
    /// A non-zero exit is NOT an error at this level; callers inspect
    /// [`ProcessOutput::code`]. Cancelling `cancel` terminates the child.
    async fn run(
        &self,
        program: &str,
        args: &[String],
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, GitError>;
}

/// Spawns real processes with tokio
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, GitError> {
        let command = display_command(program, args);
        if cancel.is_cancelled() {
            return Err(GitError::Cancelled(command));
        }
        tracing::trace!("Running '{}' in {}", command, dir.display());

        let child = Command::new(program)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| GitError::Spawn {
                command: command.clone(),
                source,
            })?;

        // Dropping the wait future on cancellation drops the child, which kills it
        let output = tokio::select! {
            output = child.wait_with_output() => output.map_err(|source| GitError::Spawn {
                command: command.clone(),
                source,
            })?,
            _ = cancel.cancelled() => {
                tracing::debug!("Cancelled '{}'", command);
                return Err(GitError::Cancelled(command));
            }
        };

        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        })
    }
}

/// Human readable form of a command line, used in logs and errors
pub(crate) fn display_command(program: &str, args: &[String]) -> String {
    let mut command = program.to_string();
    for arg in args {
        command.push(' ');
        if arg.contains(char::is_whitespace) {
            command.push_str(&format!("{arg:?}"));
        } else {
            command.push_str(arg);
        }
    }
    command
}
