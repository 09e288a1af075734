// ABOUTME: Custom error types for the cloner
// ABOUTME: Distinguishes validation, lookup, execution and cleanup failures

use std::fmt;

/// Pipeline stage that produced an execution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolveContainer,
    CreateDatabase,
    Dump,
    VerifyArtifact,
    ResetSchema,
    Restore,
    Cleanup,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ResolveContainer => "resolve container",
            Stage::CreateDatabase => "create database",
            Stage::Dump => "dump",
            Stage::VerifyArtifact => "verify artifact",
            Stage::ResetSchema => "reset schema",
            Stage::Restore => "restore",
            Stage::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum ClonerError {
    Validation(String),
    ContainerNotFound(String),
    CloneInProgress,
    Execution { stage: Stage, message: String },
    Cancelled(Stage),
    Cleanup(String),
}

impl ClonerError {
    pub fn execution(stage: Stage, message: impl Into<String>) -> Self {
        ClonerError::Execution {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for ClonerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ClonerError::Validation(msg) => write!(f, "Validation error: {}", msg),
            ClonerError::ContainerNotFound(name) => {
                write!(f, "Destination container '{}' not found", name)
            }
            ClonerError::CloneInProgress => {
                write!(f, "Another clone is already in progress; try again when it finishes")
            }
            ClonerError::Execution { stage, message } => {
                write!(f, "{} failed: {}", capitalize(stage.as_str()), message)
            }
            ClonerError::Cancelled(stage) => {
                write!(f, "Clone cancelled during {} stage", stage)
            }
            ClonerError::Cleanup(msg) => write!(f, "Cleanup error: {}", msg),
        }
    }
}

impl std::error::Error for ClonerError {}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
