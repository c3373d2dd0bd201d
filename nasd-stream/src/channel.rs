//! Channel catalogue: each named channel is backed by a snapshot-producing
//! function and a cadence policy (§4.5).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use nasd_core::AppError;

pub type SnapshotFuture = Pin<Box<dyn Future<Output = Result<serde_json::Value, AppError>> + Send>>;
pub type SnapshotFn = Arc<dyn Fn() -> SnapshotFuture + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ChannelPolicy {
    pub name: String,
    /// `None` means the channel is push-only (event-driven, e.g. container
    /// lifecycle events) rather than polled on a tick.
    pub cadence: Option<Duration>,
    /// Suppress emission when the serialized snapshot's fingerprint is
    /// unchanged from the previous tick for this subscription.
    pub suppress_duplicate_fingerprints: bool,
}

impl ChannelPolicy {
    pub fn polled(name: impl Into<String>, cadence: Duration) -> Self {
        Self {
            name: name.into(),
            cadence: Some(cadence),
            suppress_duplicate_fingerprints: true,
        }
    }

    pub fn push_only(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cadence: None,
            suppress_duplicate_fingerprints: false,
        }
    }
}

#[derive(Clone)]
pub struct ChannelRegistry {
    channels: Arc<DashMap<String, (ChannelPolicy, SnapshotFn)>>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
        }
    }

    pub fn register(&self, policy: ChannelPolicy, snapshot: SnapshotFn) {
        self.channels.insert(policy.name.clone(), (policy, snapshot));
    }

    pub fn get(&self, name: &str) -> Option<(ChannelPolicy, SnapshotFn)> {
        self.channels.get(name).map(|e| e.value().clone())
    }
}
