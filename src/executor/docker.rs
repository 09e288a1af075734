// ABOUTME: Runs container commands through `docker exec` using tokio::process
// ABOUTME: Enforces per-call timeouts and kills the process tree on cancellation

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use super::{CommandExecutor, CommandOutput, ContainerCommand, ExecError};

/// Cap per captured stream; pg_dump/pg_restore write the data itself to a file.
const MAX_OUTPUT_BYTES: u64 = 4 * 1024 * 1024;

const INTERRUPT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DockerExecutor {
    docker: PathBuf,
}

enum Outcome {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

impl DockerExecutor {
    pub fn new(docker: PathBuf) -> Self {
        Self { docker }
    }

    /// Resolve the runtime binary on PATH (or accept an absolute path).
    pub fn locate(binary: &str) -> Result<Self> {
        let docker = which::which(binary).with_context(|| {
            format!(
                "Container runtime '{}' not found on PATH. Install Docker or set docker.binary in the config",
                binary
            )
        })?;
        Ok(Self::new(docker))
    }

    pub fn binary(&self) -> &Path {
        &self.docker
    }

    /// Builds the `docker exec` argv. Env vars are passed by name only.
    pub fn exec_args(container: &str, command: &ContainerCommand) -> Vec<String> {
        let mut args = vec!["exec".to_string()];
        for (key, _) in &command.env {
            args.push("-e".to_string());
            args.push(key.clone());
        }
        args.push(container.to_string());
        args.push(command.program.clone());
        args.extend(command.args.iter().cloned());
        args
    }

    async fn abort(&self, child: &mut Child, container: &str, command: &ContainerCommand) {
        let _ = child.start_kill();
        let _ = child.wait().await;
        if let Some(pattern) = &command.kill_pattern {
            self.interrupt_remote(container, pattern).await;
        }
    }

    /// Best-effort stop of the in-container process. Killing the `docker exec`
    /// client alone leaves it running inside the container.
    async fn interrupt_remote(&self, container: &str, pattern: &str) {
        let result = tokio::time::timeout(
            INTERRUPT_TIMEOUT,
            Command::new(&self.docker)
                .args(["exec", container, "pkill", "-f", "--", pattern])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .status(),
        )
        .await;

        match result {
            Ok(Ok(status)) if status.success() => {
                tracing::info!(container, "Stopped in-container process");
            }
            Ok(Ok(status)) => {
                tracing::warn!(
                    container,
                    exit_code = ?status.code(),
                    "pkill did not stop the in-container process; it may still be running"
                );
            }
            Ok(Err(e)) => tracing::warn!(container, error = %e, "Failed to run pkill in container"),
            Err(_) => tracing::warn!(container, "Timed out stopping in-container process"),
        }
    }
}

impl CommandExecutor for DockerExecutor {
    async fn run_in_container(
        &self,
        container: &str,
        command: &ContainerCommand,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, ExecError> {
        if cancel.is_cancelled() {
            return Err(ExecError::Cancelled);
        }

        tracing::debug!(container, program = %command.program, "Running container command");

        let mut child = Command::new(&self.docker)
            .args(Self::exec_args(container, command))
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecError::Spawn(format!("{}: {}", self.docker.display(), e)))?;

        let stdout_task = tokio::spawn(read_stream(child.stdout.take(), MAX_OUTPUT_BYTES));
        let stderr_task = tokio::spawn(read_stream(child.stderr.take(), MAX_OUTPUT_BYTES));

        let outcome = tokio::select! {
            status = child.wait() => Outcome::Exited(status),
            _ = tokio::time::sleep(timeout) => Outcome::TimedOut,
            _ = cancel.cancelled() => Outcome::Cancelled,
        };

        let status = match outcome {
            Outcome::Exited(status) => status.map_err(|e| ExecError::Spawn(e.to_string()))?,
            Outcome::TimedOut => {
                self.abort(&mut child, container, command).await;
                return Err(ExecError::TimedOut(timeout));
            }
            Outcome::Cancelled => {
                self.abort(&mut child, container, command).await;
                return Err(ExecError::Cancelled);
            }
        };

        let stdout = String::from_utf8_lossy(&stdout_task.await.unwrap_or_default()).into_owned();
        let stderr = String::from_utf8_lossy(&stderr_task.await.unwrap_or_default()).into_owned();

        if !status.success() {
            return Err(ExecError::Failed {
                exit_code: status.code(),
                stderr,
            });
        }

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code: status.code().unwrap_or(0),
        })
    }
}

/// Keep up to `limit` bytes, then drain the rest so the child never sees a
/// closed pipe.
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>, limit: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h).take(limit).read_to_end(&mut buf).await;
        let _ = tokio::io::copy(&mut h, &mut tokio::io::sink()).await;
    }
    buf
}
