//! System probe contract (§6) and a simulated backing implementation.

use std::time::Instant;

use async_trait::async_trait;
use nasd_core::AppError;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CpuInfo {
    pub model: String,
    pub cores: u32,
    pub threads: u32,
    /// Usage percent delta since the previous sample, per logical thread.
    pub usage_percent: Vec<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryInfo {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub free_bytes: u64,
    pub buffers_bytes: u64,
    pub cached_bytes: u64,
    /// Derived breakdown of `cached_bytes` by workload class (e.g. docker
    /// image layers vs. VM disk images vs. general page cache).
    pub cached_breakdown: Vec<WorkloadCacheShare>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkloadCacheShare {
    pub workload_class: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadAverage {
    pub one_minute: f32,
    pub five_minute: f32,
    pub fifteen_minute: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Uptime {
    pub wall_seconds: u64,
    pub idle_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkInterface {
    pub name: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub link_speed_mbps: Option<u32>,
    pub duplex: Option<String>,
    pub carrier: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorReading {
    pub chip: String,
    pub label: String,
    pub temperature_celsius: Option<f32>,
    pub fan_rpm: Option<u32>,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub critical: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilesystemUsage {
    pub mount_point: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpsStatus {
    pub model: String,
    pub status: String,
    pub battery_charge_percent: u8,
    pub load_percent: u8,
    pub runtime_left_seconds: u32,
    pub on_battery: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GpuInfo {
    pub name: String,
    pub driver_version: String,
    pub utilization_percent: u8,
    pub memory_total_bytes: u64,
    pub memory_used_bytes: u64,
    pub temperature_celsius: f32,
}

#[async_trait]
pub trait SystemProvider: Send + Sync {
    async fn cpu(&self) -> Result<CpuInfo, AppError>;
    async fn memory(&self) -> Result<MemoryInfo, AppError>;
    async fn load_average(&self) -> Result<LoadAverage, AppError>;
    async fn uptime(&self) -> Result<Uptime, AppError>;
    async fn network(&self) -> Result<Vec<NetworkInterface>, AppError>;
    async fn sensors(&self) -> Result<Vec<SensorReading>, AppError>;
    async fn filesystems(&self) -> Result<Vec<FilesystemUsage>, AppError>;
    /// `None` when no UPS is attached to the simulated host — §6 lists this
    /// endpoint alongside the other always-present telemetry, but a real
    /// appliance may have no UPS wired up at all.
    async fn ups(&self) -> Result<Option<UpsStatus>, AppError>;
    async fn gpu(&self) -> Result<Vec<GpuInfo>, AppError>;
}

/// Generates plausible, internally-consistent snapshots without shelling
/// out to any host tool (§4.11 — keeps the daemon's hot path exercisable
/// without a real NAS host).
pub struct SimSystemProvider {
    core_count: u32,
    booted_at: Instant,
}

impl Default for SimSystemProvider {
    fn default() -> Self {
        Self::new(8)
    }
}

impl SimSystemProvider {
    pub fn new(core_count: u32) -> Self {
        Self {
            core_count,
            booted_at: Instant::now(),
        }
    }

    /// Seconds since this simulated probe came up, used to give otherwise
    /// static readings (load, uptime) a natural per-tick drift.
    fn elapsed_seconds(&self) -> u64 {
        self.booted_at.elapsed().as_secs()
    }
}

#[async_trait]
impl SystemProvider for SimSystemProvider {
    async fn cpu(&self) -> Result<CpuInfo, AppError> {
        let threads = self.core_count * 2;
        let tick = self.elapsed_seconds() as f32;
        let usage = (0..threads)
            .map(|i| 5.0 + (i as f32 * 3.7 + tick) % 40.0)
            .collect();
        Ok(CpuInfo {
            model: "Simulated 8-core appliance CPU".to_string(),
            cores: self.core_count,
            threads,
            usage_percent: usage,
        })
    }

    async fn memory(&self) -> Result<MemoryInfo, AppError> {
        let total = 32_u64 * 1024 * 1024 * 1024;
        let cached = total / 4;
        Ok(MemoryInfo {
            total_bytes: total,
            available_bytes: total / 2,
            free_bytes: total / 8,
            buffers_bytes: total / 64,
            cached_bytes: cached,
            cached_breakdown: vec![
                WorkloadCacheShare {
                    workload_class: "docker".to_string(),
                    bytes: cached / 2,
                },
                WorkloadCacheShare {
                    workload_class: "vm-disk".to_string(),
                    bytes: cached / 4,
                },
                WorkloadCacheShare {
                    workload_class: "general".to_string(),
                    bytes: cached / 4,
                },
            ],
        })
    }

    async fn load_average(&self) -> Result<LoadAverage, AppError> {
        Ok(LoadAverage {
            one_minute: 0.42,
            five_minute: 0.37,
            fifteen_minute: 0.31,
        })
    }

    async fn uptime(&self) -> Result<Uptime, AppError> {
        let elapsed = self.elapsed_seconds();
        Ok(Uptime {
            wall_seconds: 432_000 + elapsed,
            idle_seconds: 400_000 + elapsed,
        })
    }

    async fn network(&self) -> Result<Vec<NetworkInterface>, AppError> {
        Ok(vec![NetworkInterface {
            name: "eth0".to_string(),
            rx_bytes: 12_345_678_901,
            tx_bytes: 9_876_543_210,
            rx_packets: 98_765_432,
            tx_packets: 87_654_321,
            link_speed_mbps: Some(1000),
            duplex: Some("full".to_string()),
            carrier: true,
        }])
    }

    async fn sensors(&self) -> Result<Vec<SensorReading>, AppError> {
        Ok(vec![
            SensorReading {
                chip: "cpu".to_string(),
                label: "Package".to_string(),
                temperature_celsius: Some(44.0),
                fan_rpm: None,
                min: None,
                max: Some(90.0),
                critical: Some(100.0),
            },
            SensorReading {
                chip: "chassis".to_string(),
                label: "Fan 1".to_string(),
                temperature_celsius: None,
                fan_rpm: Some(1200),
                min: None,
                max: None,
                critical: None,
            },
        ])
    }

    async fn filesystems(&self) -> Result<Vec<FilesystemUsage>, AppError> {
        Ok(vec![FilesystemUsage {
            mount_point: "/mnt/user".to_string(),
            total_bytes: 16 * 1024 * 1024 * 1024 * 1024,
            used_bytes: 6 * 1024 * 1024 * 1024 * 1024,
            available_bytes: 10 * 1024 * 1024 * 1024 * 1024,
        }])
    }

    async fn ups(&self) -> Result<Option<UpsStatus>, AppError> {
        let tick = self.elapsed_seconds() as f32;
        let charge = 95.0 - (tick % 10.0);
        Ok(Some(UpsStatus {
            model: "Simulated Line-Interactive 1500VA".to_string(),
            status: "online".to_string(),
            battery_charge_percent: charge.round() as u8,
            load_percent: 32,
            runtime_left_seconds: 2_700,
            on_battery: false,
        }))
    }

    async fn gpu(&self) -> Result<Vec<GpuInfo>, AppError> {
        let tick = self.elapsed_seconds() as f32;
        Ok(vec![GpuInfo {
            name: "Simulated GP-100 Transcode".to_string(),
            driver_version: "sim-1.0".to_string(),
            utilization_percent: (8.0 + tick % 20.0).round() as u8,
            memory_total_bytes: 8 * 1024 * 1024 * 1024,
            memory_used_bytes: 512 * 1024 * 1024,
            temperature_celsius: 38.0 + (tick % 6.0),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_cpu_has_one_sample_per_thread() {
        let provider = SimSystemProvider::new(4);
        let cpu = provider.cpu().await.unwrap();
        assert_eq!(cpu.usage_percent.len(), cpu.threads as usize);
    }

    #[tokio::test]
    async fn simulated_memory_breakdown_sums_to_cached() {
        let provider = SimSystemProvider::default();
        let mem = provider.memory().await.unwrap();
        let sum: u64 = mem.cached_breakdown.iter().map(|s| s.bytes).sum();
        assert_eq!(sum, mem.cached_bytes);
    }
}
