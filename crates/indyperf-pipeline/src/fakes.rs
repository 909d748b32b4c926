//! In-memory command runner for tests.

use crate::runner::{CommandError, CommandOutput, CommandRunner, ShellCommand};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    exit_codes: HashMap<String, i32>,
    unstartable: HashSet<String>,
    calls: Vec<ShellCommand>,
}

/// Records every command and answers with a scripted exit code per label.
///
/// Labels without a script exit 0. Commands with `fail` set turn a
/// non-zero code into an error, as [`crate::runner::ShellRunner`] does.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    state: Mutex<State>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit with `code` for commands labelled `label`.
    pub fn exit_with(self, label: &str, code: i32) -> Self {
        self.state
            .lock()
            .unwrap()
            .exit_codes
            .insert(label.to_string(), code);
        self
    }

    /// Fail to start commands labelled `label`.
    pub fn unstartable(self, label: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .unstartable
            .insert(label.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ShellCommand> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Labels of every command run, in order.
    pub fn labels(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.label).collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &ShellCommand) -> Result<CommandOutput, CommandError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(command.clone());

        if state.unstartable.contains(&command.label) {
            return Err(CommandError::Spawn {
                command: command.command.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted spawn failure"),
            });
        }

        let code = state.exit_codes.get(&command.label).copied().unwrap_or(0);
        if code != 0 && command.fail {
            return Err(CommandError::NonZeroExit {
                command: command.command.clone(),
                code,
            });
        }

        Ok(CommandOutput {
            exit_code: code,
            duration_ms: 0,
        })
    }
}
