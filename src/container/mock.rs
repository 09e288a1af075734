// ABOUTME: In-memory container registry for tests
// ABOUTME: Counts lookups so tests can assert the registry was never consulted

use anyhow::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ContainerDescriptor, ContainerRegistry, PortMapping, PostgresCredentials};

#[derive(Default)]
pub struct MockRegistry {
    containers: HashMap<String, ContainerDescriptor>,
    lookups: AtomicUsize,
}

impl MockRegistry {
    pub fn with_container(name: &str) -> Self {
        let mut registry = Self::default();
        registry.insert(descriptor(name, "destpass"));
        registry
    }

    pub fn insert(&mut self, descriptor: ContainerDescriptor) {
        self.containers
            .insert(descriptor.container_name.clone(), descriptor);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl ContainerRegistry for MockRegistry {
    async fn resolve(&self, container_name: &str) -> Result<Option<ContainerDescriptor>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.containers.get(container_name).cloned())
    }
}

pub fn descriptor(name: &str, password: &str) -> ContainerDescriptor {
    ContainerDescriptor {
        container_name: name.to_string(),
        image: "postgres:16".to_string(),
        ports: PortMapping {
            host_port: 5434,
            container_port: 5432,
        },
        credentials: PostgresCredentials {
            user: "test".to_string(),
            password: password.to_string(),
            db: "postgres".to_string(),
            port: 5432,
            host: "localhost".to_string(),
        },
        running: true,
    }
}
