// ABOUTME: Drives the clone pipeline: create, dump, verify, reset, restore, clean up
// ABOUTME: Converts every failure into a CloneResult and never leaks passwords

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use super::models::{CloneDetails, CloneResult, DestinationDescriptor, SourceDescriptor};
use super::progress::{JobGuard, JobId, Milestone, ProgressTracker};
use super::validation::validate_request;
use crate::config::{CloneConfig, Config, StageTimeouts};
use crate::connection::redact;
use crate::container::{ContainerDescriptor, ContainerRegistry};
use crate::error::{ClonerError, Stage};
use crate::executor::CommandExecutor;
use crate::postgres::{CreateOutcome, PostgresTools};

const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1"];

pub struct DatabaseCloner<R, E> {
    registry: R,
    executor: E,
    clone: CloneConfig,
    timeouts: StageTimeouts,
    tracker: Arc<ProgressTracker>,
}

struct PipelineReport {
    tables: Option<usize>,
    artifact_bytes: u64,
}

impl<R: ContainerRegistry, E: CommandExecutor> DatabaseCloner<R, E> {
    pub fn new(registry: R, executor: E, config: &Config) -> Self {
        Self::with_tracker(registry, executor, config, Arc::new(ProgressTracker::new()))
    }

    pub fn with_tracker(
        registry: R,
        executor: E,
        config: &Config,
        tracker: Arc<ProgressTracker>,
    ) -> Self {
        Self {
            registry,
            executor,
            clone: config.clone.clone(),
            timeouts: config.timeouts.clone(),
            tracker,
        }
    }

    pub fn tracker(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.tracker)
    }

    pub fn get_progress(&self) -> u8 {
        self.tracker.percent()
    }

    pub fn cancel_clone(&self) {
        self.tracker.cancel();
    }

    pub async fn verify_destination_container(&self, container_name: &str) -> bool {
        match self.registry.resolve(container_name).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!(container = container_name, "Container lookup failed: {:#}", e);
                false
            }
        }
    }

    /// Clone `source` into `destination`. Always returns a result value.
    pub async fn clone_database(
        &self,
        source: &SourceDescriptor,
        destination: &DestinationDescriptor,
    ) -> CloneResult {
        if let Err(e) = validate_request(source, destination) {
            tracing::warn!("Rejected clone request: {}", e);
            return CloneResult::failed(redact(&e.to_string(), &[source.password.as_str()]));
        }

        let job = match self.tracker.begin() {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!("{}", e);
                return CloneResult::failed(e);
            }
        };

        tracing::info!(
            job_id = %job.id(),
            source = %source,
            container = %destination.container_name,
            database = %destination.database,
            "Starting clone"
        );
        let started = Instant::now();

        let container = match self.resolve_container(&destination.container_name).await {
            Ok(container) => container,
            Err(e) => return self.fail(&job, e, &[source.password.as_str()]),
        };
        let secrets = [source.password.as_str(), container.credentials.password.as_str()];

        let outcome = self
            .run_pipeline(&job, &container, source, destination)
            .await
            .and_then(|report| job.finish().map(|()| report));

        match outcome {
            Ok(report) => {
                let details = CloneDetails::measured(report.tables, started.elapsed());
                tracing::info!(
                    job_id = %job.id(),
                    tables = ?report.tables,
                    artifact_bytes = report.artifact_bytes,
                    elapsed = %details.total_time,
                    "Clone completed"
                );
                CloneResult::completed(details)
            }
            Err(e) => self.fail(&job, e, &secrets),
        }
    }

    fn fail(&self, job: &JobGuard<'_>, error: ClonerError, secrets: &[&str]) -> CloneResult {
        job.fail();
        let message = redact(&error.to_string(), secrets);
        tracing::error!(job_id = %job.id(), "{}", message);
        CloneResult::failed(message)
    }

    async fn resolve_container(&self, name: &str) -> Result<ContainerDescriptor, ClonerError> {
        let container = self
            .registry
            .resolve(name)
            .await
            .map_err(|e| ClonerError::execution(Stage::ResolveContainer, format!("{:#}", e)))?
            .ok_or_else(|| ClonerError::ContainerNotFound(name.to_string()))?;

        if !container.running {
            return Err(ClonerError::execution(
                Stage::ResolveContainer,
                format!("container '{}' is not running", name),
            ));
        }
        Ok(container)
    }

    /// Runs every stage, then removes the artifact whatever the outcome.
    async fn run_pipeline(
        &self,
        job: &JobGuard<'_>,
        container: &ContainerDescriptor,
        source: &SourceDescriptor,
        destination: &DestinationDescriptor,
    ) -> Result<PipelineReport, ClonerError> {
        let tools = PostgresTools::new(&self.executor, container, &self.timeouts, job.cancel_token());
        let artifact = artifact_path(&self.clone.artifact_dir, job.id());

        let result = self.run_stages(&tools, job, &artifact, source, destination).await;

        match tools.remove_artifact(&artifact).await {
            Ok(()) => tracing::debug!(artifact = %artifact, "Removed dump artifact"),
            Err(e) => tracing::warn!(artifact = %artifact, "{}", e),
        }

        result
    }

    async fn run_stages(
        &self,
        tools: &PostgresTools<'_, E>,
        job: &JobGuard<'_>,
        artifact: &str,
        source: &SourceDescriptor,
        destination: &DestinationDescriptor,
    ) -> Result<PipelineReport, ClonerError> {
        let database = destination.database.as_str();

        job.checkpoint(Stage::CreateDatabase)?;
        match tools.create_database(database).await? {
            CreateOutcome::Created => tracing::info!(database, "Created destination database"),
            CreateOutcome::AlreadyExisted => {
                tracing::info!(database, "Destination database already exists, reusing it")
            }
        }

        job.checkpoint(Stage::Dump)?;
        job.advance(Milestone::Dumping);
        let source_host = container_visible_host(&source.host, &self.clone.loopback_alias);
        tracing::info!(host = %source_host, artifact, "Dumping source database");
        tools.dump(source, &source_host, artifact).await?;

        job.checkpoint(Stage::VerifyArtifact)?;
        job.advance(Milestone::Dumped);
        let artifact_bytes = tools.stat_artifact(artifact).await?;
        tracing::info!(artifact, artifact_bytes, "Dump artifact verified");

        let tables = match tools.count_tables(artifact).await {
            Ok(count) => Some(count),
            Err(e @ ClonerError::Cancelled(_)) => return Err(e),
            Err(e) => {
                tracing::warn!("Could not read dump table of contents: {}", e);
                None
            }
        };

        job.checkpoint(Stage::ResetSchema)?;
        tracing::info!(database, "Resetting destination schema");
        tools.reset_schema(database).await?;

        job.checkpoint(Stage::Restore)?;
        job.advance(Milestone::Restoring);
        tracing::info!(database, "Restoring dump");
        tools.restore(database, artifact).await?;
        job.checkpoint(Stage::Restore)?;

        Ok(PipelineReport {
            tables,
            artifact_bytes,
        })
    }
}

/// The dump runs inside the destination container, where the caller's
/// loopback address means the container itself.
pub fn container_visible_host(host: &str, loopback_alias: &str) -> String {
    if LOOPBACK_HOSTS.contains(&host) {
        loopback_alias.to_string()
    } else {
        host.to_string()
    }
}

fn artifact_path(dir: &str, job_id: &JobId) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{}/clone_{}_{}.dump", dir.trim_end_matches('/'), millis, job_id)
}
