//! Virtualization contract (§6) and a simulated backing implementation.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use nasd_core::AppError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VmState {
    Running,
    ShutOff,
    Paused,
}

#[derive(Debug, Clone, Serialize)]
pub struct VirtualMachine {
    pub name: String,
    pub state: VmState,
    pub autostart: bool,
    pub vcpus: u32,
    pub memory_mb: u64,
}

#[async_trait]
pub trait VirtualizationProvider: Send + Sync {
    async fn list(&self) -> Result<Vec<VirtualMachine>, AppError>;
    async fn inspect(&self, name: &str) -> Result<VirtualMachine, AppError>;
    async fn start(&self, name: &str) -> Result<(), AppError>;
    async fn stop(&self, name: &str) -> Result<(), AppError>;
    async fn set_autostart(&self, name: &str, enabled: bool) -> Result<(), AppError>;
}

pub struct SimVirtualizationProvider {
    vms: Arc<DashMap<String, VirtualMachine>>,
}

impl Default for SimVirtualizationProvider {
    fn default() -> Self {
        let vms = DashMap::new();
        vms.insert(
            "windows-11".to_string(),
            VirtualMachine {
                name: "windows-11".to_string(),
                state: VmState::Running,
                autostart: true,
                vcpus: 4,
                memory_mb: 8192,
            },
        );
        vms.insert(
            "home-assistant".to_string(),
            VirtualMachine {
                name: "home-assistant".to_string(),
                state: VmState::ShutOff,
                autostart: false,
                vcpus: 2,
                memory_mb: 2048,
            },
        );
        Self { vms: Arc::new(vms) }
    }
}

#[async_trait]
impl VirtualizationProvider for SimVirtualizationProvider {
    async fn list(&self) -> Result<Vec<VirtualMachine>, AppError> {
        Ok(self.vms.iter().map(|e| e.value().clone()).collect())
    }

    async fn inspect(&self, name: &str) -> Result<VirtualMachine, AppError> {
        self.vms
            .get(name)
            .map(|e| e.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("vm {name} not found")))
    }

    async fn start(&self, name: &str) -> Result<(), AppError> {
        let mut entry = self
            .vms
            .get_mut(name)
            .ok_or_else(|| AppError::NotFound(format!("vm {name} not found")))?;
        entry.state = VmState::Running;
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<(), AppError> {
        let mut entry = self
            .vms
            .get_mut(name)
            .ok_or_else(|| AppError::NotFound(format!("vm {name} not found")))?;
        entry.state = VmState::ShutOff;
        Ok(())
    }

    async fn set_autostart(&self, name: &str, enabled: bool) -> Result<(), AppError> {
        let mut entry = self
            .vms
            .get_mut(name)
            .ok_or_else(|| AppError::NotFound(format!("vm {name} not found")))?;
        entry.autostart = enabled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_stop_changes_state() {
        let provider = SimVirtualizationProvider::default();
        provider.stop("windows-11").await.unwrap();
        assert_eq!(
            provider.inspect("windows-11").await.unwrap().state,
            VmState::ShutOff
        );
    }

    #[tokio::test]
    async fn autostart_mutation_persists() {
        let provider = SimVirtualizationProvider::default();
        provider.set_autostart("home-assistant", true).await.unwrap();
        assert!(provider.inspect("home-assistant").await.unwrap().autostart);
    }
}
