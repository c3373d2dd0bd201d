//! Principal store: bidirectional index credential <-> principal, guarded
//! by `DashMap`'s per-shard locks the way the teacher's stores are (held
//! only for the map operation itself; callers never hold it across await
//! points).

use std::sync::Arc;

use dashmap::DashMap;
use nasd_core::clock::unix_now_secs;
use nasd_core::permissions::Role;

use crate::principal::{generate_api_key, Principal};

pub struct PrincipalStore {
    by_id: DashMap<String, Arc<Principal>>,
    by_credential: DashMap<String, String>,
}

impl Default for PrincipalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PrincipalStore {
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
            by_credential: DashMap::new(),
        }
    }

    /// Boot a store with a single default administrator, returning its
    /// generated API key.
    pub fn with_default_administrator(id: impl Into<String>) -> (Self, String) {
        let store = Self::new();
        let credential = generate_api_key();
        let principal = Principal::new(id, "administrator", Role::Administrator, credential.clone());
        store.insert(principal);
        (store, credential)
    }

    /// Insert or replace a principal. Enforces credential uniqueness by
    /// removing any stale index entry for principals reusing the same id.
    pub fn insert(&self, principal: Principal) {
        if let Some(existing) = self.by_id.get(&principal.id) {
            if existing.credential != principal.credential {
                self.by_credential.remove(&existing.credential);
            }
        }
        self.by_credential
            .insert(principal.credential.clone(), principal.id.clone());
        self.by_id.insert(principal.id.clone(), Arc::new(principal));
    }

    pub fn get_by_id(&self, id: &str) -> Option<Arc<Principal>> {
        self.by_id.get(id).map(|e| e.clone())
    }

    /// Resolve a credential to an enabled principal, stamping last-used.
    pub fn authenticate_credential(&self, credential: &str) -> Option<Arc<Principal>> {
        let id = self.by_credential.get(credential)?.clone();
        let principal = self.by_id.get(&id)?.clone();
        if !principal.enabled {
            return None;
        }
        self.touch(&id);
        self.by_id.get(&id).map(|e| e.clone())
    }

    fn touch(&self, id: &str) {
        if let Some(mut entry) = self.by_id.get_mut(id) {
            let mut updated = (**entry).clone();
            updated.last_used_at = Some(unix_now_secs());
            *entry = Arc::new(updated);
        }
    }

    pub fn list(&self) -> Vec<Arc<Principal>> {
        self.by_id.iter().map(|e| e.value().clone()).collect()
    }

    pub fn disable(&self, id: &str) -> bool {
        if let Some(mut entry) = self.by_id.get_mut(id) {
            let mut updated = (**entry).clone();
            updated.enabled = false;
            *entry = Arc::new(updated);
            true
        } else {
            false
        }
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Principal>> {
        let (_, principal) = self.by_id.remove(id)?;
        self.by_credential.remove(&principal.credential);
        Some(principal)
    }

    /// Regenerate a principal's credential, returning the new one.
    pub fn regenerate_key(&self, id: &str) -> Option<String> {
        let mut entry = self.by_id.get_mut(id)?;
        let old_credential = entry.credential.clone();
        let new_credential = generate_api_key();
        let mut updated = (**entry).clone();
        updated.credential = new_credential.clone();
        *entry = Arc::new(updated);
        drop(entry);
        self.by_credential.remove(&old_credential);
        self.by_credential
            .insert(new_credential.clone(), id.to_string());
        Some(new_credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_administrator_authenticates() {
        let (store, key) = PrincipalStore::with_default_administrator("root");
        let p = store.authenticate_credential(&key).unwrap();
        assert_eq!(p.role, Role::Administrator);
    }

    #[test]
    fn disabled_principal_cannot_authenticate() {
        let (store, key) = PrincipalStore::with_default_administrator("root");
        store.disable("root");
        assert!(store.authenticate_credential(&key).is_none());
    }

    #[test]
    fn regenerate_key_invalidates_old_credential() {
        let (store, old_key) = PrincipalStore::with_default_administrator("root");
        let new_key = store.regenerate_key("root").unwrap();
        assert!(store.authenticate_credential(&old_key).is_none());
        assert!(store.authenticate_credential(&new_key).is_some());
    }

    #[test]
    fn unknown_credential_resolves_to_none() {
        let (store, _) = PrincipalStore::with_default_administrator("root");
        assert!(store.authenticate_credential("uma_nonexistent").is_none());
    }
}
