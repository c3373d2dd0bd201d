//! Per-connection, per-channel subscription state (§3 Subscription entity).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Fingerprint a serialized snapshot for duplicate suppression. Plain
/// `DefaultHasher` is sufficient here — fingerprints are compared only
/// against the immediately preceding tick of the same subscription, never
/// persisted or compared across processes.
pub fn fingerprint(serialized: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    serialized.hash(&mut hasher);
    hasher.finish()
}

pub struct SubscriptionState {
    pub channel: String,
    pub params: serde_json::Value,
    next_sequence: AtomicU64,
    last_fingerprint: Mutex<Option<u64>>,
}

impl SubscriptionState {
    pub fn new(channel: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            channel: channel.into(),
            params,
            next_sequence: AtomicU64::new(1),
            last_fingerprint: Mutex::new(None),
        }
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::SeqCst)
    }

    /// Returns `true` if the fingerprint differs from the previously
    /// recorded one (and records it), i.e. whether this tick should emit.
    pub fn advance_fingerprint(&self, fp: u64) -> bool {
        let mut last = self.last_fingerprint.lock().unwrap();
        let changed = *last != Some(fp);
        *last = Some(fp);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_increments_monotonically() {
        let sub = SubscriptionState::new("system.stats", serde_json::json!({}));
        assert_eq!(sub.next_sequence(), 1);
        assert_eq!(sub.next_sequence(), 2);
        assert_eq!(sub.next_sequence(), 3);
    }

    #[test]
    fn duplicate_fingerprint_is_detected() {
        let sub = SubscriptionState::new("storage.status", serde_json::json!({}));
        assert!(sub.advance_fingerprint(fingerprint("a")));
        assert!(!sub.advance_fingerprint(fingerprint("a")));
        assert!(sub.advance_fingerprint(fingerprint("b")));
    }
}
