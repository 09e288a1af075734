// ABOUTME: TOML configuration for docker access, clone paths and stage timeouts
// ABOUTME: Every key is optional; missing values fall back to defaults

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::Stage;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub docker: DockerConfig,
    pub clone: CloneConfig,
    pub timeouts: StageTimeouts,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Container runtime CLI, looked up on PATH when not absolute.
    pub binary: String,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CloneConfig {
    /// Host name a container uses to reach the host's loopback interface.
    pub loopback_alias: String,
    /// Directory inside the destination container where dump artifacts live.
    pub artifact_dir: String,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            loopback_alias: "host.docker.internal".to_string(),
            artifact_dir: "/tmp".to_string(),
        }
    }
}

/// Per-stage timeouts, in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StageTimeouts {
    pub create_database: u64,
    pub dump: u64,
    pub verify: u64,
    pub reset_schema: u64,
    pub restore: u64,
    pub cleanup: u64,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            create_database: 60,
            dump: 3600,
            verify: 30,
            reset_schema: 120,
            restore: 3600,
            cleanup: 30,
        }
    }
}

impl StageTimeouts {
    pub fn for_stage(&self, stage: Stage) -> Duration {
        let secs = match stage {
            Stage::ResolveContainer | Stage::VerifyArtifact => self.verify,
            Stage::CreateDatabase => self.create_database,
            Stage::Dump => self.dump,
            Stage::ResetSchema => self.reset_schema,
            Stage::Restore => self.restore,
            Stage::Cleanup => self.cleanup,
        };
        Duration::from_secs(secs)
    }

    fn validate(&self) -> Result<()> {
        let entries = [
            ("create_database", self.create_database),
            ("dump", self.dump),
            ("verify", self.verify),
            ("reset_schema", self.reset_schema),
            ("restore", self.restore),
            ("cleanup", self.cleanup),
        ];
        for (name, secs) in entries {
            if secs == 0 {
                anyhow::bail!("timeouts.{} must be greater than zero", name);
            }
        }
        Ok(())
    }
}

impl Config {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.docker.binary.trim().is_empty() {
            anyhow::bail!("docker.binary must not be empty");
        }
        if !self.clone.artifact_dir.starts_with('/') {
            anyhow::bail!(
                "clone.artifact_dir must be an absolute path inside the container, got '{}'",
                self.clone.artifact_dir
            );
        }
        self.timeouts.validate()
    }
}
