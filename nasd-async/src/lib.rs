//! Async long-running-operation registry (§4.4). Mirrors the teacher's
//! `r2e-scheduler::SchedulerHandle` cancellation-token pattern and
//! `r2e-core`'s registry-of-handles shape, generalized to a full
//! pending→running→{succeeded,failed,cancelled} state machine with a
//! single mutator lock per operation and terminal-state write-once
//! semantics.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use nasd_core::clock::unix_now_secs;
use nasd_core::ids::new_id;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_RETENTION_SECONDS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl OperationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperationState::Succeeded | OperationState::Failed | OperationState::Cancelled
        )
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AsyncOperation {
    pub id: String,
    pub class: String,
    pub state: OperationState,
    pub progress_percent: u8,
    pub created_at: u64,
    pub started_at: Option<u64>,
    pub finished_at: Option<u64>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    #[serde(skip)]
    cancel: CancellationToken,
}

impl AsyncOperation {
    fn new(id: String, class: String) -> Self {
        Self {
            id,
            class,
            state: OperationState::Pending,
            progress_percent: 0,
            created_at: unix_now_secs(),
            started_at: None,
            finished_at: None,
            result: None,
            error: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Registry of in-flight and recently-finished async operations. One
/// `DashMap` entry per operation id; each entry's value is mutated only
/// while holding that entry's shard lock (`get_mut`), so no two mutations
/// to the same operation interleave.
pub struct OperationRegistry {
    operations: DashMap<String, AsyncOperation>,
    retention: Duration,
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_RETENTION_SECONDS))
    }
}

impl OperationRegistry {
    pub fn new(retention: Duration) -> Self {
        Self {
            operations: DashMap::new(),
            retention,
        }
    }

    /// Create a new operation in `Pending` state, returning its id and a
    /// cancellation token the caller's task should select on.
    pub fn create(&self, class: impl Into<String>) -> (String, CancellationToken) {
        let id = new_id();
        let op = AsyncOperation::new(id.clone(), class.into());
        let token = op.cancellation_token();
        self.operations.insert(id.clone(), op);
        (id, token)
    }

    /// Transition `Pending` -> `Running`. No-op if already running or
    /// terminal.
    pub fn start(&self, id: &str) {
        if let Some(mut op) = self.operations.get_mut(id) {
            if op.state == OperationState::Pending {
                op.state = OperationState::Running;
                op.started_at = Some(unix_now_secs());
            }
        }
    }

    /// Update progress, clamped to `[current, 100]` so regressions are
    /// silently dropped rather than rejected — progress is advisory and a
    /// late-arriving update from a stale report should never move a bar
    /// backwards.
    pub fn update_progress(&self, id: &str, percent: u8) {
        if let Some(mut op) = self.operations.get_mut(id) {
            if op.state.is_terminal() {
                return;
            }
            let percent = percent.min(100);
            if percent > op.progress_percent {
                op.progress_percent = percent;
            }
        }
    }

    pub fn finish_success(&self, id: &str, result: serde_json::Value) {
        if let Some(mut op) = self.operations.get_mut(id) {
            if op.state.is_terminal() {
                return;
            }
            op.state = OperationState::Succeeded;
            op.progress_percent = 100;
            op.result = Some(result);
            op.finished_at = Some(unix_now_secs());
        }
    }

    pub fn finish_failure(&self, id: &str, error: impl Into<String>) {
        if let Some(mut op) = self.operations.get_mut(id) {
            if op.state.is_terminal() {
                return;
            }
            op.state = OperationState::Failed;
            op.error = Some(error.into());
            op.finished_at = Some(unix_now_secs());
        }
    }

    /// Cancel an operation. Legal from `Pending` or `Running` only; the
    /// cancellation token is signalled either way so a task that raced
    /// past the terminal check still observes it, but the recorded state
    /// never overwrites an already-terminal operation.
    pub fn cancel(&self, id: &str) -> bool {
        if let Some(mut op) = self.operations.get_mut(id) {
            op.cancel.cancel();
            if !op.state.is_terminal() {
                op.state = OperationState::Cancelled;
                op.finished_at = Some(unix_now_secs());
                return true;
            }
        }
        false
    }

    pub fn get(&self, id: &str) -> Option<AsyncOperation> {
        self.operations.get(id).map(|e| e.clone())
    }

    /// List operations, optionally filtered by class and/or state, sorted
    /// by creation time descending (newest first), ties broken by id so
    /// ordering is deterministic.
    pub fn list(
        &self,
        class: Option<&str>,
        state: Option<OperationState>,
    ) -> Vec<AsyncOperation> {
        let mut items: Vec<AsyncOperation> = self
            .operations
            .iter()
            .map(|e| e.value().clone())
            .filter(|op| class.map_or(true, |c| op.class == c))
            .filter(|op| state.map_or(true, |s| op.state == s))
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        items
    }

    /// Purge terminal operations whose `finished_at` predates the
    /// retention window. Intended to run on an interval from the daemon's
    /// background sweeper alongside the rate limiter's idle sweep.
    pub fn sweep_expired(&self) {
        let now = unix_now_secs();
        let retention = self.retention.as_secs();
        self.operations.retain(|_, op| match op.finished_at {
            Some(finished_at) => now.saturating_sub(finished_at) < retention,
            None => true,
        });
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

pub type SharedOperationRegistry = Arc<OperationRegistry>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions_through_states() {
        let registry = OperationRegistry::default();
        let (id, _token) = registry.create("storage.scrub");
        assert_eq!(registry.get(&id).unwrap().state, OperationState::Pending);

        registry.start(&id);
        assert_eq!(registry.get(&id).unwrap().state, OperationState::Running);

        registry.update_progress(&id, 40);
        assert_eq!(registry.get(&id).unwrap().progress_percent, 40);

        registry.finish_success(&id, serde_json::json!({"ok": true}));
        let op = registry.get(&id).unwrap();
        assert_eq!(op.state, OperationState::Succeeded);
        assert_eq!(op.progress_percent, 100);
        assert!(op.finished_at.is_some());
    }

    #[test]
    fn progress_never_regresses() {
        let registry = OperationRegistry::default();
        let (id, _token) = registry.create("storage.scrub");
        registry.start(&id);
        registry.update_progress(&id, 50);
        registry.update_progress(&id, 20);
        assert_eq!(registry.get(&id).unwrap().progress_percent, 50);
    }

    #[test]
    fn terminal_state_is_write_once() {
        let registry = OperationRegistry::default();
        let (id, _token) = registry.create("storage.scrub");
        registry.start(&id);
        registry.finish_success(&id, serde_json::json!(null));
        registry.finish_failure(&id, "too late");
        let op = registry.get(&id).unwrap();
        assert_eq!(op.state, OperationState::Succeeded);
        assert!(op.error.is_none());
    }

    #[test]
    fn cancel_is_only_legal_from_non_terminal_states() {
        let registry = OperationRegistry::default();
        let (id, token) = registry.create("vm.migrate");
        assert!(registry.cancel(&id));
        assert!(token.is_cancelled());
        assert_eq!(registry.get(&id).unwrap().state, OperationState::Cancelled);

        let (id2, _) = registry.create("vm.migrate");
        registry.start(&id2);
        registry.finish_success(&id2, serde_json::json!(null));
        assert!(!registry.cancel(&id2));
        assert_eq!(registry.get(&id2).unwrap().state, OperationState::Succeeded);
    }

    #[test]
    fn list_filters_by_class_and_state_sorted_descending() {
        let registry = OperationRegistry::default();
        let (id1, _) = registry.create("storage.scrub");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let (id2, _) = registry.create("vm.migrate");
        registry.start(&id2);

        let all = registry.list(None, None);
        assert_eq!(all[0].id, id2);
        assert_eq!(all[1].id, id1);

        let running = registry.list(None, Some(OperationState::Running));
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].id, id2);

        let scrubs = registry.list(Some("storage.scrub"), None);
        assert_eq!(scrubs.len(), 1);
        assert_eq!(scrubs[0].id, id1);
    }

    #[test]
    fn sweep_expired_purges_old_terminal_operations_only() {
        let registry = OperationRegistry::new(Duration::from_secs(0));
        let (id, _) = registry.create("storage.scrub");
        registry.finish_success(&id, serde_json::json!(null));
        std::thread::sleep(std::time::Duration::from_millis(1100));
        registry.sweep_expired();
        assert!(registry.get(&id).is_none());

        let (pending_id, _) = registry.create("vm.migrate");
        registry.sweep_expired();
        assert!(registry.get(&pending_id).is_some());
    }
}
