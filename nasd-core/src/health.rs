//! Health aggregator (§4.10): registered probes run in parallel with a
//! per-check timeout; each yields pass/warn/fail. Aggregate status is
//! unhealthy (503) if any probe fails, degraded (200) if any warns,
//! otherwise healthy (200) — extending the teacher's binary up/down
//! `HealthIndicator` model to this three-state one.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Pass,
    Warn,
    Fail,
}

/// A named health probe. Implementations check one subsystem (memory
/// footprint, task count, disk capacity, load) and never panic.
pub trait HealthProbe: Send + Sync + 'static {
    fn name(&self) -> &str;
    fn check(&self) -> impl Future<Output = (ProbeStatus, String)> + Send;
}

trait HealthProbeErased: Send + Sync {
    fn name(&self) -> &str;
    fn check(&self) -> Pin<Box<dyn Future<Output = (ProbeStatus, String)> + Send + '_>>;
}

impl<T: HealthProbe> HealthProbeErased for T {
    fn name(&self) -> &str {
        HealthProbe::name(self)
    }
    fn check(&self) -> Pin<Box<dyn Future<Output = (ProbeStatus, String)> + Send + '_>> {
        Box::pin(HealthProbe::check(self))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub name: String,
    pub status: ProbeStatus,
    pub message: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AggregateStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: AggregateStatus,
    pub checks: Vec<ProbeResult>,
    pub uptime_seconds: u64,
}

impl HealthReport {
    /// HTTP status code for this report: 503 if unhealthy, 200 otherwise.
    pub fn status_code(&self) -> u16 {
        match self.status {
            AggregateStatus::Unhealthy => 503,
            AggregateStatus::Healthy | AggregateStatus::Degraded => 200,
        }
    }
}

pub struct HealthAggregator {
    probes: Vec<Box<dyn HealthProbeErased>>,
    probe_timeout: Duration,
    started_at: Instant,
}

impl HealthAggregator {
    pub fn new(probe_timeout: Duration) -> Self {
        Self {
            probes: Vec::new(),
            probe_timeout,
            started_at: Instant::now(),
        }
    }

    pub fn register<P: HealthProbe>(&mut self, probe: P) {
        self.probes.push(Box::new(probe));
    }

    pub async fn aggregate(&self) -> HealthReport {
        let mut futures = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            let timeout = self.probe_timeout;
            futures.push(async move {
                let start = Instant::now();
                let (status, message) = match tokio::time::timeout(timeout, probe.check()).await {
                    Ok(result) => result,
                    Err(_) => (ProbeStatus::Fail, "probe timed out".to_string()),
                };
                ProbeResult {
                    name: probe.name().to_string(),
                    status,
                    message,
                    duration_ms: start.elapsed().as_millis() as u64,
                }
            });
        }

        let checks = futures_util::future::join_all(futures).await;

        let status = if checks.iter().any(|c| c.status == ProbeStatus::Fail) {
            AggregateStatus::Unhealthy
        } else if checks.iter().any(|c| c.status == ProbeStatus::Warn) {
            AggregateStatus::Degraded
        } else {
            AggregateStatus::Healthy
        };

        HealthReport {
            status,
            checks,
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }
}

pub type SharedHealthAggregator = Arc<HealthAggregator>;
