// ABOUTME: Narrow typed interface over the PostgreSQL client tools in a container
// ABOUTME: Every identifier and credential is passed as a discrete argument or env var

use tokio_util::sync::CancellationToken;

use super::diagnostics::{classify, is_already_exists};
use crate::clone::SourceDescriptor;
use crate::config::StageTimeouts;
use crate::container::ContainerDescriptor;
use crate::error::{ClonerError, Stage};
use crate::executor::{CommandExecutor, CommandOutput, ContainerCommand, ExecError};

const RESET_SCHEMA_SQL: &str = "DROP SCHEMA IF EXISTS public CASCADE; CREATE SCHEMA public;";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExisted,
}

pub struct PostgresTools<'a, E> {
    executor: &'a E,
    container: &'a ContainerDescriptor,
    timeouts: &'a StageTimeouts,
    cancel: &'a CancellationToken,
}

impl<'a, E: CommandExecutor> PostgresTools<'a, E> {
    pub fn new(
        executor: &'a E,
        container: &'a ContainerDescriptor,
        timeouts: &'a StageTimeouts,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            executor,
            container,
            timeouts,
            cancel,
        }
    }

    pub async fn create_database(&self, database: &str) -> Result<CreateOutcome, ClonerError> {
        let command = self.local_command("createdb").arg(database);

        match self.exec(Stage::CreateDatabase, &command).await {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(ExecError::Failed { stderr, .. }) if is_already_exists(&stderr) => {
                Ok(CreateOutcome::AlreadyExisted)
            }
            Err(e) => Err(exec_failure(Stage::CreateDatabase, e)),
        }
    }

    /// Dump `source` in custom format to `artifact` on the container filesystem.
    pub async fn dump(
        &self,
        source: &SourceDescriptor,
        source_host: &str,
        artifact: &str,
    ) -> Result<(), ClonerError> {
        let command = ContainerCommand::new("pg_dump")
            .args(["-h", source_host])
            .args(["-p".to_string(), source.port.to_string()])
            .args(["-U", source.user.as_str()])
            .args(["-d", source.database.as_str()])
            .args(["-F", "c", "-f", artifact])
            .env("PGPASSWORD", source.password.as_str())
            .env("LC_ALL", "C")
            .kill_pattern(artifact);

        self.run_checked(Stage::Dump, &command).await
    }

    /// Size in bytes of the artifact; a missing file is fatal.
    pub async fn stat_artifact(&self, artifact: &str) -> Result<u64, ClonerError> {
        let command = ContainerCommand::new("stat")
            .args(["-c", "%s", artifact])
            .env("LC_ALL", "C");

        let output = self
            .exec(Stage::VerifyArtifact, &command)
            .await
            .map_err(|e| match e {
                ExecError::Failed { .. } => ClonerError::execution(
                    Stage::VerifyArtifact,
                    format!("dump artifact {} was not created", artifact),
                ),
                other => exec_failure(Stage::VerifyArtifact, other),
            })?;

        output.stdout.trim().parse().map_err(|_| {
            ClonerError::execution(
                Stage::VerifyArtifact,
                format!("unexpected stat output for {}: {}", artifact, output.stdout.trim()),
            )
        })
    }

    /// Number of table-data entries in the dump's table of contents.
    pub async fn count_tables(&self, artifact: &str) -> Result<usize, ClonerError> {
        let command = ContainerCommand::new("pg_restore")
            .args(["--list", artifact])
            .env("LC_ALL", "C");

        let output = self
            .exec(Stage::VerifyArtifact, &command)
            .await
            .map_err(|e| exec_failure(Stage::VerifyArtifact, e))?;

        Ok(count_table_data(&output.stdout))
    }

    /// Drop and recreate the default schema so a restore starts empty.
    pub async fn reset_schema(&self, database: &str) -> Result<(), ClonerError> {
        let command = self
            .local_command("psql")
            .args(["-d", database])
            .args(["-v", "ON_ERROR_STOP=1", "-q", "-c", RESET_SCHEMA_SQL])
            .env("PGOPTIONS", "-c client_min_messages=warning");

        self.run_checked(Stage::ResetSchema, &command).await
    }

    pub async fn restore(&self, database: &str, artifact: &str) -> Result<(), ClonerError> {
        let command = self
            .local_command("pg_restore")
            .args(["-d", database])
            .args([
                "--clean",
                "--if-exists",
                "--no-owner",
                "--no-privileges",
                "--no-comments",
                "--disable-triggers",
                artifact,
            ])
            .kill_pattern(artifact);

        self.run_checked(Stage::Restore, &command).await
    }

    pub async fn remove_artifact(&self, artifact: &str) -> Result<(), ClonerError> {
        let command = ContainerCommand::new("rm").args(["-f", artifact]);

        // Removal must also run after a cancel, so it ignores the job's token.
        self.executor
            .run_in_container(
                &self.container.container_name,
                &command,
                self.timeouts.for_stage(Stage::Cleanup),
                &CancellationToken::new(),
            )
            .await
            .map(|_| ())
            .map_err(|e| ClonerError::Cleanup(format!("could not remove {}: {}", artifact, e)))
    }

    /// A tool connecting to the container's own server with its credentials.
    fn local_command(&self, program: &str) -> ContainerCommand {
        let creds = &self.container.credentials;
        ContainerCommand::new(program)
            .args(["-h", creds.host.as_str()])
            .args(["-p".to_string(), creds.port.to_string()])
            .args(["-U", creds.user.as_str()])
            .env("PGPASSWORD", creds.password.as_str())
            .env("LC_ALL", "C")
    }

    async fn exec(&self, stage: Stage, command: &ContainerCommand) -> Result<CommandOutput, ExecError> {
        self.executor
            .run_in_container(
                &self.container.container_name,
                command,
                self.timeouts.for_stage(stage),
                self.cancel,
            )
            .await
    }

    /// Run a command whose stderr may only carry warnings.
    async fn run_checked(&self, stage: Stage, command: &ContainerCommand) -> Result<(), ClonerError> {
        let output = self
            .exec(stage, command)
            .await
            .map_err(|e| exec_failure(stage, e))?;

        let diagnostics = classify(&output.stderr);
        if diagnostics.is_fatal() {
            return Err(ClonerError::execution(stage, diagnostics.error_summary()));
        }
        for warning in &diagnostics.warnings {
            tracing::warn!(stage = %stage, "{}", warning);
        }
        Ok(())
    }
}

fn exec_failure(stage: Stage, error: ExecError) -> ClonerError {
    match error {
        ExecError::Cancelled => ClonerError::Cancelled(stage),
        ExecError::Failed { exit_code, stderr } => {
            let diagnostics = classify(&stderr);
            let detail = if diagnostics.is_fatal() {
                diagnostics.error_summary()
            } else {
                stderr.trim().to_string()
            };
            match exit_code {
                Some(code) => ClonerError::execution(stage, format!("{} (exit code {})", detail, code)),
                None => ClonerError::execution(stage, format!("{} (terminated by signal)", detail)),
            }
        }
        other => ClonerError::execution(stage, other.to_string()),
    }
}

fn count_table_data(toc: &str) -> usize {
    toc.lines()
        .filter(|line| !line.trim_start().starts_with(';'))
        .filter(|line| line.contains(" TABLE DATA "))
        .count()
}
