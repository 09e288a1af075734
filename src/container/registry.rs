// ABOUTME: Docker-backed container registry built on `docker inspect`
// ABOUTME: Maps missing containers to None and runtime failures to errors

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use super::models::{ContainerDescriptor, InspectOutput};
use super::ContainerRegistry;

pub struct DockerRegistry {
    docker: PathBuf,
    timeout: Duration,
}

impl DockerRegistry {
    pub fn new(docker: PathBuf, timeout: Duration) -> Self {
        Self { docker, timeout }
    }
}

impl ContainerRegistry for DockerRegistry {
    async fn resolve(&self, container_name: &str) -> Result<Option<ContainerDescriptor>> {
        tracing::debug!(container = container_name, "Inspecting container");

        let command = tokio::process::Command::new(&self.docker)
            .args(["inspect", "--type", "container", "--", container_name])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, command)
            .await
            .with_context(|| {
                format!(
                    "Timed out after {:?} inspecting container '{}'",
                    self.timeout, container_name
                )
            })?
            .with_context(|| format!("Failed to run {}", self.docker.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_missing_container(&stderr) {
                return Ok(None);
            }
            anyhow::bail!(
                "docker inspect failed for '{}': {}. Is the Docker daemon running?",
                container_name,
                stderr.trim()
            );
        }

        let parsed: Vec<InspectOutput> = serde_json::from_slice(&output.stdout)
            .context("Failed to parse docker inspect output")?;

        Ok(parsed
            .into_iter()
            .next()
            .map(|inspect| inspect.into_descriptor(container_name)))
    }
}

fn is_missing_container(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    lower.contains("no such container") || lower.contains("no such object")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_container_detection() {
        assert!(is_missing_container(
            "Error: No such container: nonexistent-container"
        ));
        assert!(is_missing_container("Error: No such object: ghost"));
        assert!(!is_missing_container(
            "Cannot connect to the Docker daemon at unix:///var/run/docker.sock"
        ));
    }
}
