//! Notification store (§6, detailed in §4.12): in-memory create/list/
//! mark-read/clear, grounded the same way as the async registry — one
//! `DashMap` entry per notification, mutated only through its own shard
//! lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use nasd_core::clock::unix_now_secs;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    pub created_at: u64,
    pub read: bool,
}

pub struct NotificationStore {
    notifications: DashMap<u64, Notification>,
    next_id: AtomicU64,
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationStore {
    pub fn new() -> Self {
        Self {
            notifications: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn create(
        &self,
        level: NotificationLevel,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Notification {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let notification = Notification {
            id,
            level,
            title: title.into(),
            message: message.into(),
            created_at: unix_now_secs(),
            read: false,
        };
        self.notifications.insert(id, notification.clone());
        notification
    }

    /// Newest first, matching the streaming hub's dashboard ordering
    /// convention elsewhere in this repo.
    pub fn list(&self) -> Vec<Notification> {
        let mut items: Vec<Notification> = self
            .notifications
            .iter()
            .map(|e| e.value().clone())
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        items
    }

    pub fn mark_read(&self, id: u64) -> bool {
        if let Some(mut entry) = self.notifications.get_mut(&id) {
            entry.read = true;
            true
        } else {
            false
        }
    }

    pub fn clear(&self) {
        self.notifications.clear();
    }
}

pub type SharedNotificationStore = Arc<NotificationStore>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_list_newest_first() {
        let store = NotificationStore::new();
        store.create(NotificationLevel::Info, "a", "first");
        store.create(NotificationLevel::Warning, "b", "second");
        let items = store.list();
        assert_eq!(items[0].title, "b");
        assert_eq!(items[1].title, "a");
    }

    #[test]
    fn mark_read_flips_flag() {
        let store = NotificationStore::new();
        let n = store.create(NotificationLevel::Error, "disk", "smart failure");
        assert!(store.mark_read(n.id));
        assert!(store.list()[0].read);
    }

    #[test]
    fn clear_empties_store() {
        let store = NotificationStore::new();
        store.create(NotificationLevel::Info, "a", "b");
        store.clear();
        assert!(store.list().is_empty());
    }
}
