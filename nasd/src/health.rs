//! Health probes registered with the §4.10 aggregator at boot.

use std::future::Future;

use nasd_async::SharedOperationRegistry;
use nasd_core::health::{HealthProbe, ProbeStatus};
use nasd_ratelimit::SharedRateLimiter;

const BACKLOG_WARN_THRESHOLD: usize = 500;
const BACKLOG_FAIL_THRESHOLD: usize = 2000;

pub struct OperationBacklogProbe {
    pub operations: SharedOperationRegistry,
}

impl HealthProbe for OperationBacklogProbe {
    fn name(&self) -> &str {
        "async-operation-backlog"
    }

    fn check(&self) -> impl Future<Output = (ProbeStatus, String)> + Send {
        let count = self.operations.len();
        async move {
            if count >= BACKLOG_FAIL_THRESHOLD {
                (ProbeStatus::Fail, format!("{count} operations resident"))
            } else if count >= BACKLOG_WARN_THRESHOLD {
                (ProbeStatus::Warn, format!("{count} operations resident"))
            } else {
                (ProbeStatus::Pass, format!("{count} operations resident"))
            }
        }
    }
}

pub struct RateLimiterProbe {
    pub limiter: SharedRateLimiter,
}

impl HealthProbe for RateLimiterProbe {
    fn name(&self) -> &str {
        "rate-limiter"
    }

    fn check(&self) -> impl Future<Output = (ProbeStatus, String)> + Send {
        let count = self.limiter.len();
        async move { (ProbeStatus::Pass, format!("{count} active buckets")) }
    }
}
