// ABOUTME: Command executor boundary for running tools inside a named container
// ABOUTME: Commands are argv vectors; secrets travel as environment variables

pub mod docker;

#[cfg(test)]
pub(crate) mod mock;

pub use docker::DockerExecutor;

use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A single tool invocation inside a container. Never interpreted by a shell.
#[derive(Debug, Clone)]
pub struct ContainerCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Forwarded by name; values are read from the executor's environment,
    /// so they never appear on a command line.
    pub env: Vec<(String, String)>,
    /// `pkill -f` pattern used to stop the in-container process on cancel or timeout.
    pub kill_pattern: Option<String>,
}

impl ContainerCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            env: Vec::new(),
            kill_pattern: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.push((key.to_string(), value.into()));
        self
    }

    pub fn kill_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.kill_pattern = Some(pattern.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

#[derive(Debug, Clone)]
pub enum ExecError {
    /// The runtime CLI could not be started at all.
    Spawn(String),
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },
    TimedOut(Duration),
    Cancelled,
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExecError::Spawn(msg) => write!(f, "could not start container runtime: {}", msg),
            ExecError::Failed { exit_code, stderr } => match exit_code {
                Some(code) => write!(f, "exit code {}: {}", code, stderr.trim()),
                None => write!(f, "terminated by signal: {}", stderr.trim()),
            },
            ExecError::TimedOut(after) => write!(f, "timed out after {:?}", after),
            ExecError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for ExecError {}

/// Runs a command inside a running container and waits for it to finish.
///
/// A non-zero exit is reported as [`ExecError::Failed`]. Implementations must
/// stop waiting when `cancel` fires or `timeout` elapses.
#[allow(async_fn_in_trait)]
pub trait CommandExecutor {
    async fn run_in_container(
        &self,
        container: &str,
        command: &ContainerCommand,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, ExecError>;
}
