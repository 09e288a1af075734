// ABOUTME: Container registry boundary used to locate destination containers
// ABOUTME: Resolves a container name into image, ports and PostgreSQL credentials

pub mod models;
pub mod registry;

#[cfg(test)]
pub(crate) mod mock;

pub use models::{ContainerDescriptor, PortMapping, PostgresCredentials};
pub use registry::DockerRegistry;

use anyhow::Result;

/// Looks up containers by name. Returned credentials are trusted verbatim.
#[allow(async_fn_in_trait)]
pub trait ContainerRegistry {
    /// `Ok(None)` when no container has that name.
    async fn resolve(&self, container_name: &str) -> Result<Option<ContainerDescriptor>>;
}
