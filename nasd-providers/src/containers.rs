//! Container engine contract (§6) and a simulated backing implementation
//! presenting a small fixed fleet.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use nasd_core::AppError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, Serialize)]
pub struct Container {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
}

#[derive(Debug, Clone, Serialize)]
pub struct Image {
    pub id: String,
    pub tag: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerNetwork {
    pub name: String,
    pub driver: String,
}

#[async_trait]
pub trait ContainerProvider: Send + Sync {
    async fn list_containers(&self) -> Result<Vec<Container>, AppError>;
    async fn inspect_container(&self, id: &str) -> Result<Container, AppError>;
    async fn list_images(&self) -> Result<Vec<Image>, AppError>;
    async fn list_networks(&self) -> Result<Vec<ContainerNetwork>, AppError>;
    async fn start(&self, id: &str, timeout: Duration) -> Result<(), AppError>;
    async fn stop(&self, id: &str, timeout: Duration) -> Result<(), AppError>;
    async fn restart(&self, id: &str, timeout: Duration) -> Result<(), AppError>;
}

pub struct SimContainerProvider {
    containers: Arc<DashMap<String, Container>>,
}

impl Default for SimContainerProvider {
    fn default() -> Self {
        let containers = DashMap::new();
        for (id, name, image, state) in [
            ("c1", "plex", "plexinc/pms-docker:latest", ContainerState::Running),
            ("c2", "nextcloud", "nextcloud:29", ContainerState::Running),
            ("c3", "pihole", "pihole/pihole:latest", ContainerState::Stopped),
        ] {
            containers.insert(
                id.to_string(),
                Container {
                    id: id.to_string(),
                    name: name.to_string(),
                    image: image.to_string(),
                    state,
                },
            );
        }
        Self {
            containers: Arc::new(containers),
        }
    }
}

impl SimContainerProvider {
    fn transition(&self, id: &str, target: ContainerState) -> Result<(), AppError> {
        let mut entry = self
            .containers
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("container {id} not found")))?;
        entry.state = target;
        Ok(())
    }
}

#[async_trait]
impl ContainerProvider for SimContainerProvider {
    async fn list_containers(&self) -> Result<Vec<Container>, AppError> {
        Ok(self.containers.iter().map(|e| e.value().clone()).collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<Container, AppError> {
        self.containers
            .get(id)
            .map(|e| e.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("container {id} not found")))
    }

    async fn list_images(&self) -> Result<Vec<Image>, AppError> {
        Ok(vec![Image {
            id: "sha256:abc123".to_string(),
            tag: "plexinc/pms-docker:latest".to_string(),
            size_bytes: 1_200_000_000,
        }])
    }

    async fn list_networks(&self) -> Result<Vec<ContainerNetwork>, AppError> {
        Ok(vec![ContainerNetwork {
            name: "bridge".to_string(),
            driver: "bridge".to_string(),
        }])
    }

    async fn start(&self, id: &str, _timeout: Duration) -> Result<(), AppError> {
        self.transition(id, ContainerState::Running)
    }

    async fn stop(&self, id: &str, _timeout: Duration) -> Result<(), AppError> {
        self.transition(id, ContainerState::Stopped)
    }

    async fn restart(&self, id: &str, _timeout: Duration) -> Result<(), AppError> {
        self.transition(id, ContainerState::Stopped)?;
        self.transition(id, ContainerState::Running)
    }
}
