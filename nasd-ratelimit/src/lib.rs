//! Operation-classed token-bucket rate limiter (§4.3), grounded on the
//! teacher's `r2e-rate-limit` (`refill_and_try_consume`, `ConfiguredBucket`,
//! `InMemoryRateLimiter`) with the class table and path→class mapping of
//! the management daemon's closed operation-class enumeration.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// The closed set of sixteen rate-limit operation classes, each with a
/// default {capacity, window}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    General,
    HealthProbe,
    ExpensiveStorage,
    DestructiveStorage,
    ArrayControl,
    ContainerEnumeration,
    ContainerMutation,
    BulkContainer,
    VmEnumeration,
    VmMutation,
    BulkVm,
    SystemInfo,
    SystemPower,
    Sensor,
    AsyncCreate,
    AsyncList,
    AsyncCancel,
}

impl OperationClass {
    pub fn label(&self) -> &'static str {
        match self {
            OperationClass::General => "general",
            OperationClass::HealthProbe => "health probe",
            OperationClass::ExpensiveStorage => "expensive storage",
            OperationClass::DestructiveStorage => "destructive storage",
            OperationClass::ArrayControl => "array control",
            OperationClass::ContainerEnumeration => "container enumeration",
            OperationClass::ContainerMutation => "container mutation",
            OperationClass::BulkContainer => "bulk container",
            OperationClass::VmEnumeration => "virtual-machine enumeration",
            OperationClass::VmMutation => "virtual-machine mutation",
            OperationClass::BulkVm => "bulk virtual-machine",
            OperationClass::SystemInfo => "system info",
            OperationClass::SystemPower => "system power",
            OperationClass::Sensor => "sensor",
            OperationClass::AsyncCreate => "async create",
            OperationClass::AsyncList => "async list",
            OperationClass::AsyncCancel => "async cancel",
        }
    }

    /// {capacity, window} per the class table.
    pub fn limits(&self) -> (u64, Duration) {
        use OperationClass::*;
        let (capacity, window_secs) = match self {
            General => (60, 60),
            HealthProbe => (120, 60),
            ExpensiveStorage => (1, 60),
            DestructiveStorage => (1, 3600),
            ArrayControl => (2, 60),
            ContainerEnumeration => (30, 60),
            ContainerMutation => (20, 60),
            BulkContainer => (5, 60),
            VmEnumeration => (30, 60),
            VmMutation => (10, 60),
            BulkVm => (3, 60),
            SystemInfo => (60, 60),
            SystemPower => (5, 60),
            Sensor => (30, 60),
            AsyncCreate => (10, 60),
            AsyncList => (60, 60),
            AsyncCancel => (20, 60),
        };
        (capacity, Duration::from_secs(window_secs))
    }

    /// Table-driven, deterministic path → class mapping. Unknown paths
    /// resolve to `General`.
    pub fn classify(method: &str, path: &str) -> OperationClass {
        use OperationClass::*;

        let is_post = method.eq_ignore_ascii_case("POST");
        let is_delete = method.eq_ignore_ascii_case("DELETE");

        match path {
            "/health" | "/metrics" => HealthProbe,
            "/storage/smart" => ExpensiveStorage,
            "/storage/array/start" => DestructiveStorage,
            p if p.starts_with("/storage/array/") => ArrayControl,
            p if p.starts_with("/system/parity/") => ArrayControl,
            "/docker/containers" if is_post => ContainerMutation,
            "/docker/containers" => ContainerEnumeration,
            p if p.starts_with("/docker/containers/bulk/") => BulkContainer,
            p if p.starts_with("/docker/containers/") => ContainerMutation,
            "/docker/images" | "/docker/networks" | "/docker/info" => ContainerEnumeration,
            "/vms" => VmEnumeration,
            p if p.starts_with("/vms/") && p.contains("/bulk") => BulkVm,
            p if p.starts_with("/vms/") => VmMutation,
            p if p.starts_with("/system/power/") => SystemPower,
            "/system/execute" => SystemPower,
            "/system/temperature" => Sensor,
            p if p.starts_with("/system/") => SystemInfo,
            "/operations" if is_post => AsyncCreate,
            "/operations" => AsyncList,
            p if p.starts_with("/operations/") && is_delete => AsyncCancel,
            p if p.starts_with("/operations/") => AsyncList,
            _ => General,
        }
    }
}

struct Bucket {
    tokens: f64,
    capacity: f64,
    window: Duration,
    last_refill: Instant,
}

#[inline]
fn refill_and_try_consume(bucket: &mut Bucket) -> bool {
    let now = Instant::now();
    let elapsed = now.duration_since(bucket.last_refill);
    let refill = (elapsed.as_secs_f64() / bucket.window.as_secs_f64()) * bucket.capacity;
    bucket.tokens = (bucket.tokens + refill).min(bucket.capacity);
    bucket.last_refill = now;

    if bucket.tokens >= 1.0 {
        bucket.tokens -= 1.0;
        true
    } else {
        false
    }
}

/// Seconds until at least one token becomes available, given the bucket's
/// current (post-refill) state. Used as the `retry_after_seconds` advisory.
fn retry_after(bucket: &Bucket) -> u64 {
    let deficit = 1.0 - bucket.tokens;
    if deficit <= 0.0 {
        return 0;
    }
    let secs = deficit * bucket.window.as_secs_f64() / bucket.capacity;
    secs.ceil().max(1.0) as u64
}

pub struct Denied {
    pub class: &'static str,
    pub retry_after_seconds: u64,
}

/// Per (client, class) token-bucket limiter.
pub struct RateLimiter {
    buckets: DashMap<(String, OperationClass), Bucket>,
    idle_threshold: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}

impl RateLimiter {
    pub fn new(idle_threshold: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            idle_threshold,
        }
    }

    /// Atomic allow/deny decision for `(client, class)`.
    pub fn allow(&self, client: &str, class: OperationClass) -> Result<(), Denied> {
        let (capacity, window) = class.limits();
        let mut entry = self
            .buckets
            .entry((client.to_string(), class))
            .or_insert_with(|| Bucket {
                tokens: capacity as f64,
                capacity: capacity as f64,
                window,
                last_refill: Instant::now(),
            });

        let bucket = entry.value_mut();
        if refill_and_try_consume(bucket) {
            Ok(())
        } else {
            Err(Denied {
                class: class.label(),
                retry_after_seconds: retry_after(bucket),
            })
        }
    }

    /// Remove buckets whose last refill predates the idle threshold.
    pub fn sweep_idle(&self) {
        let now = Instant::now();
        let threshold = self.idle_threshold;
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last_refill) < threshold);
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

pub type SharedRateLimiter = Arc<RateLimiter>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_paths() {
        assert_eq!(
            OperationClass::classify("GET", "/storage/smart").label(),
            "expensive storage"
        );
        assert_eq!(
            OperationClass::classify("POST", "/storage/array/start").label(),
            "destructive storage"
        );
        assert_eq!(
            OperationClass::classify("POST", "/docker/containers/bulk/stop").label(),
            "bulk container"
        );
    }

    #[test]
    fn unknown_path_is_general() {
        assert_eq!(
            OperationClass::classify("GET", "/something/weird"),
            OperationClass::General
        );
    }

    #[test]
    fn allows_up_to_capacity_then_denies() {
        let limiter = RateLimiter::default();
        // destructive storage: capacity 1 per hour
        assert!(limiter
            .allow("user-1", OperationClass::DestructiveStorage)
            .is_ok());
        let denied = limiter
            .allow("user-1", OperationClass::DestructiveStorage)
            .unwrap_err();
        assert_eq!(denied.class, "destructive storage");
        assert!(denied.retry_after_seconds > 0 && denied.retry_after_seconds <= 3600);
    }

    #[test]
    fn buckets_are_independent_per_client() {
        let limiter = RateLimiter::default();
        assert!(limiter
            .allow("user-1", OperationClass::DestructiveStorage)
            .is_ok());
        assert!(limiter
            .allow("user-2", OperationClass::DestructiveStorage)
            .is_ok());
    }

    #[test]
    fn refill_is_monotone_and_clamped_to_capacity() {
        let mut bucket = Bucket {
            tokens: 0.0,
            capacity: 5.0,
            window: Duration::from_millis(50),
            last_refill: Instant::now() - Duration::from_secs(10),
        };
        assert!(refill_and_try_consume(&mut bucket));
        assert!(bucket.tokens <= bucket.capacity);
    }
}
