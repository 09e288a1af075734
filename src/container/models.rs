// ABOUTME: Data structures describing a PostgreSQL container and its credentials
// ABOUTME: Includes the subset of `docker inspect` JSON needed to build them

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DEFAULT_POSTGRES_PORT: u16 = 5432;
const DEFAULT_POSTGRES_USER: &str = "postgres";

#[derive(Debug, Clone, Serialize)]
pub struct ContainerDescriptor {
    pub container_name: String,
    pub image: String,
    pub ports: PortMapping,
    pub credentials: PostgresCredentials,
    pub running: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PortMapping {
    /// 0 when the port is not published on the host.
    pub host_port: u16,
    pub container_port: u16,
}

/// Credentials as seen from inside the container.
#[derive(Debug, Clone, Serialize)]
pub struct PostgresCredentials {
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub db: String,
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct InspectOutput {
    pub state: InspectState,
    pub config: InspectConfig,
    #[serde(default)]
    pub network_settings: InspectNetwork,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct InspectState {
    pub running: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct InspectConfig {
    pub image: String,
    #[serde(default)]
    pub env: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct InspectNetwork {
    #[serde(default)]
    pub ports: Option<HashMap<String, Option<Vec<PortBinding>>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct PortBinding {
    #[serde(default)]
    pub host_port: String,
}

impl InspectOutput {
    fn env_var(&self, key: &str) -> Option<&str> {
        self.config.env.as_deref().unwrap_or_default().iter().find_map(|entry| {
            entry
                .split_once('=')
                .filter(|(name, _)| *name == key)
                .map(|(_, value)| value)
        })
    }

    pub(crate) fn into_descriptor(self, container_name: &str) -> ContainerDescriptor {
        let container_port = self
            .env_var("PGPORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_POSTGRES_PORT);

        let user = self
            .env_var("POSTGRES_USER")
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_POSTGRES_USER)
            .to_string();
        let password = self.env_var("POSTGRES_PASSWORD").unwrap_or_default().to_string();
        let db = self
            .env_var("POSTGRES_DB")
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| user.clone());

        let host_port = self
            .network_settings
            .ports
            .as_ref()
            .and_then(|ports| ports.get(&format!("{}/tcp", container_port)))
            .and_then(|bindings| bindings.as_ref())
            .and_then(|bindings| bindings.iter().find_map(|b| b.host_port.parse().ok()))
            .unwrap_or(0);

        ContainerDescriptor {
            container_name: container_name.to_string(),
            image: self.config.image,
            ports: PortMapping {
                host_port,
                container_port,
            },
            credentials: PostgresCredentials {
                user,
                password,
                db,
                port: container_port,
                host: "localhost".to_string(),
            },
            running: self.state.running,
        }
    }
}
