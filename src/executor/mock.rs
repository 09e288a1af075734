// ABOUTME: Scripted command executor for tests
// ABOUTME: Records every call and replies per program name

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{CommandExecutor, CommandOutput, ContainerCommand, ExecError};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub container: String,
    pub command: ContainerCommand,
    pub timeout: Duration,
}

type Hook = Box<dyn Fn(&ContainerCommand) + Send + Sync>;

/// Replies are queued per program; an empty queue yields a clean success.
#[derive(Default)]
pub struct MockExecutor {
    replies: Mutex<HashMap<String, VecDeque<Result<CommandOutput, ExecError>>>>,
    calls: Mutex<Vec<RecordedCall>>,
    hook: Option<Hook>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs before each reply; lets tests sample progress or fire a cancel.
    pub fn with_hook(mut self, hook: impl Fn(&ContainerCommand) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn reply(self, program: &str, reply: Result<CommandOutput, ExecError>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(program.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn reply_stdout(self, program: &str, stdout: &str) -> Self {
        self.reply(
            program,
            Ok(CommandOutput {
                stdout: stdout.to_string(),
                ..Default::default()
            }),
        )
    }

    pub fn reply_stderr(self, program: &str, stderr: &str) -> Self {
        self.reply(
            program,
            Ok(CommandOutput {
                stderr: stderr.to_string(),
                ..Default::default()
            }),
        )
    }

    pub fn fail(self, program: &str, exit_code: i32, stderr: &str) -> Self {
        self.reply(
            program,
            Err(ExecError::Failed {
                exit_code: Some(exit_code),
                stderr: stderr.to_string(),
            }),
        )
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|call| call.command.program)
            .collect()
    }
}

impl CommandExecutor for MockExecutor {
    async fn run_in_container(
        &self,
        container: &str,
        command: &ContainerCommand,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, ExecError> {
        self.calls.lock().unwrap().push(RecordedCall {
            container: container.to_string(),
            command: command.clone(),
            timeout,
        });

        if let Some(hook) = &self.hook {
            hook(command);
        }
        if cancel.is_cancelled() {
            return Err(ExecError::Cancelled);
        }

        self.replies
            .lock()
            .unwrap()
            .get_mut(&command.program)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(CommandOutput::default()))
    }
}
