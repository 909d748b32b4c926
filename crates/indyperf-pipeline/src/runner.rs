//! External process execution.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Lines of output echoed to the log when a command fails.
const FAILURE_TAIL_LINES: usize = 20;

/// Errors from running an external command.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Non-zero exit for a command that must succeed
    #[error("Command '{command}' exited with code {code}")]
    NonZeroExit { command: String, code: i32 },
}

/// A shell command line plus how to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    /// Short label used in logs.
    pub label: String,
    /// Full command line, interpreted by `sh -c`.
    pub command: String,
    pub work_dir: Option<PathBuf>,
    /// Turn a non-zero exit into [`CommandError::NonZeroExit`].
    pub fail: bool,
    /// File receiving combined stdout and stderr. Failing to write it
    /// does not change the command's result.
    pub log_file: Option<PathBuf>,
}

impl ShellCommand {
    pub fn new(label: &str, command: impl Into<String>) -> Self {
        ShellCommand {
            label: label.to_string(),
            command: command.into(),
            work_dir: None,
            fail: true,
            log_file: None,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Report a non-zero exit instead of failing.
    pub fn allow_failure(mut self) -> Self {
        self.fail = false;
        self
    }

    pub fn log_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }
}

/// Result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; -1 when killed by a signal.
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs external commands for the pipeline.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &ShellCommand) -> Result<CommandOutput, CommandError>;
}

/// Runs commands through `sh -c`, waiting for each to finish.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &ShellCommand) -> Result<CommandOutput, CommandError> {
        let start = Instant::now();
        info!(step = %command.label, "{}", command.command);

        let mut process = Command::new("sh");
        process
            .arg("-c")
            .arg(&command.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.work_dir {
            process.current_dir(dir);
        }

        let output = process
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                command: command.command.clone(),
                source,
            })?;

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);

        if let Some(path) = &command.log_file {
            if let Err(e) = tokio::fs::write(path, &combined).await {
                warn!(step = %command.label, path = ?path, "Cannot write command log: {}", e);
            }
        }

        let result = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        if result.success() {
            debug!(step = %command.label, duration_ms = result.duration_ms, "Command finished");
            return Ok(result);
        }

        let text = String::from_utf8_lossy(&combined);
        let lines: Vec<&str> = text.lines().collect();
        let tail = lines[lines.len().saturating_sub(FAILURE_TAIL_LINES)..].join("\n");
        warn!(
            step = %command.label,
            exit_code = result.exit_code,
            "Error running command: {}\n{}",
            command.command,
            tail
        );

        if command.fail {
            Err(CommandError::NonZeroExit {
                command: command.command.clone(),
                code: result.exit_code,
            })
        } else {
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_command() {
        let result = ShellRunner
            .run(&ShellCommand::new("echo", "echo hello"))
            .await
            .unwrap();
        assert!(result.success());
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_failing_command_with_fail_flag() {
        let err = ShellRunner
            .run(&ShellCommand::new("false", "exit 3"))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::NonZeroExit { code: 3, .. }));
    }

    #[tokio::test]
    async fn test_failing_command_reported() {
        let result = ShellRunner
            .run(&ShellCommand::new("false", "exit 2").allow_failure())
            .await
            .unwrap();
        assert!(!result.success());
        assert_eq!(result.exit_code, 2);
    }

    #[tokio::test]
    async fn test_output_written_to_log_in_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("out.log");
        let command = ShellCommand::new("pwd", "pwd; echo oops >&2")
            .in_dir(dir.path())
            .log_to(&log);

        ShellRunner.run(&command).await.unwrap();

        let contents = std::fs::read_to_string(&log).unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert!(contents.contains(expected.file_name().unwrap().to_str().unwrap()));
        assert!(contents.contains("oops"));
    }

    #[tokio::test]
    async fn test_unwritable_log_keeps_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("missing").join("mvn.log");

        let ok = ShellRunner
            .run(&ShellCommand::new("echo", "echo built").log_to(&log))
            .await
            .unwrap();
        assert!(ok.success());
        assert!(!log.exists());

        let err = ShellRunner
            .run(&ShellCommand::new("false", "exit 4").log_to(&log))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::NonZeroExit { code: 4, .. }));
    }
}
