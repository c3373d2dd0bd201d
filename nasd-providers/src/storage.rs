//! Storage probe contract (§6) and a simulated backing implementation.

use async_trait::async_trait;
use nasd_core::AppError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskState {
    Active,
    Standby,
    Missing,
    DiskInvalid,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArrayDisk {
    pub slot: u32,
    pub identifier: String,
    pub device_name: String,
    pub state: DiskState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResyncAction {
    None,
    Check,
    Rebuild,
    Clear,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArrayStatus {
    pub started: bool,
    pub disks: Vec<ArrayDisk>,
    pub resync_action: ResyncAction,
    pub resync_progress_percent: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SmartHealth {
    Pass,
    Fail,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct SmartReport {
    pub device_name: String,
    pub health: SmartHealth,
    pub temperature_celsius: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceCapacity {
    pub device_name: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    Active,
    Standby,
}

#[derive(Debug, Clone, Serialize)]
pub struct DevicePowerState {
    pub device_name: String,
    pub state: PowerState,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParityHistoryEntry {
    pub started_at: u64,
    pub finished_at: Option<u64>,
    pub action: ResyncAction,
    pub errors: u32,
}

#[async_trait]
pub trait StorageProvider: Send + Sync {
    async fn array_status(&self) -> Result<ArrayStatus, AppError>;
    async fn start_array(&self) -> Result<(), AppError>;
    async fn stop_array(&self) -> Result<(), AppError>;
    async fn smart_reports(&self) -> Result<Vec<SmartReport>, AppError>;
    async fn capacities(&self) -> Result<Vec<DeviceCapacity>, AppError>;
    async fn power_states(&self) -> Result<Vec<DevicePowerState>, AppError>;
    async fn parity_history(&self) -> Result<Vec<ParityHistoryEntry>, AppError>;
    /// The cron-like expression governing the scheduled parity check, if any.
    async fn parity_schedule(&self) -> Result<Option<String>, AppError>;
}

pub struct SimStorageProvider {
    started: std::sync::atomic::AtomicBool,
    disk_count: u32,
}

impl Default for SimStorageProvider {
    fn default() -> Self {
        Self::new(6)
    }
}

impl SimStorageProvider {
    pub fn new(disk_count: u32) -> Self {
        Self {
            started: std::sync::atomic::AtomicBool::new(true),
            disk_count,
        }
    }

    fn disks(&self) -> Vec<ArrayDisk> {
        (0..self.disk_count)
            .map(|slot| ArrayDisk {
                slot,
                identifier: format!("disk-{slot}"),
                device_name: format!("sd{}", (b'b' + slot as u8) as char),
                state: if slot == 0 {
                    DiskState::Standby
                } else {
                    DiskState::Active
                },
            })
            .collect()
    }
}

#[async_trait]
impl StorageProvider for SimStorageProvider {
    async fn array_status(&self) -> Result<ArrayStatus, AppError> {
        Ok(ArrayStatus {
            started: self.started.load(std::sync::atomic::Ordering::SeqCst),
            disks: self.disks(),
            resync_action: ResyncAction::None,
            resync_progress_percent: None,
        })
    }

    async fn start_array(&self) -> Result<(), AppError> {
        self.started.store(true, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    async fn stop_array(&self) -> Result<(), AppError> {
        self.started.store(false, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    async fn smart_reports(&self) -> Result<Vec<SmartReport>, AppError> {
        Ok(self
            .disks()
            .into_iter()
            .map(|d| SmartReport {
                device_name: d.device_name,
                health: SmartHealth::Pass,
                temperature_celsius: Some(32.0),
            })
            .collect())
    }

    async fn capacities(&self) -> Result<Vec<DeviceCapacity>, AppError> {
        Ok(self
            .disks()
            .into_iter()
            .map(|d| DeviceCapacity {
                device_name: d.device_name,
                total_bytes: 8 * 1024 * 1024 * 1024 * 1024,
                used_bytes: 3 * 1024 * 1024 * 1024 * 1024,
            })
            .collect())
    }

    async fn power_states(&self) -> Result<Vec<DevicePowerState>, AppError> {
        Ok(self
            .disks()
            .into_iter()
            .map(|d| DevicePowerState {
                state: match d.state {
                    DiskState::Standby => PowerState::Standby,
                    _ => PowerState::Active,
                },
                device_name: d.device_name,
            })
            .collect())
    }

    async fn parity_history(&self) -> Result<Vec<ParityHistoryEntry>, AppError> {
        Ok(vec![ParityHistoryEntry {
            started_at: 1_700_000_000,
            finished_at: Some(1_700_014_400),
            action: ResyncAction::Check,
            errors: 0,
        }])
    }

    async fn parity_schedule(&self) -> Result<Option<String>, AppError> {
        Ok(Some("0 3 * * 0".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_stop_array_toggles_status() {
        let provider = SimStorageProvider::default();
        provider.stop_array().await.unwrap();
        assert!(!provider.array_status().await.unwrap().started);
        provider.start_array().await.unwrap();
        assert!(provider.array_status().await.unwrap().started);
    }

    #[tokio::test]
    async fn parity_schedule_is_a_cron_expression() {
        let provider = SimStorageProvider::default();
        let schedule = provider.parity_schedule().await.unwrap().unwrap();
        assert!(schedule.parse::<cron::Schedule>().is_ok());
    }
}
