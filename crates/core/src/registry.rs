//! In-memory registry of post-completion actions.
//!
//! Holds the pending map (id -> action) and the active set (ids currently
//! executing) behind a single lock, so moving an id from one to the other is
//! atomic and an id is never in both.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Normalize an item id (info hash) to the form used as a registry key.
pub fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

/// Where a completed download should be moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveAction {
    /// Remote store name, including the trailing separator (e.g. `remote1:`).
    pub target_store: String,
    /// Path inside the store.
    pub target_path: String,
}

impl MoveAction {
    pub fn new(target_store: impl Into<String>, target_path: impl Into<String>) -> Self {
        Self {
            target_store: target_store.into(),
            target_path: target_path.into(),
        }
    }

    /// `<store><path>`, as reported in outcome events.
    pub fn target_descriptor(&self) -> String {
        format!("{}{}", self.target_store, self.target_path)
    }
}

/// A registered action waiting for its item to finish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingAction {
    pub id: String,
    pub action: MoveAction,
    pub registered_at: DateTime<Utc>,
}

impl PendingAction {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.registered_at
    }
}

/// Result of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// New entry.
    Inserted,
    /// An entry for the id existed and was overwritten.
    Replaced,
    /// The id is executing right now; nothing was registered.
    Busy,
}

/// Point-in-time copy of the registry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistrySnapshot {
    pub pending: Vec<PendingAction>,
    pub active: Vec<String>,
}

#[derive(Debug, Default)]
struct RegistryState {
    pending: HashMap<String, PendingAction>,
    active: HashSet<String>,
}

/// Pending actions and the active set.
#[derive(Debug, Default)]
pub struct PendingActionRegistry {
    state: Mutex<RegistryState>,
}

impl PendingActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action` for `id`, stamped with the current time.
    pub async fn register(&self, id: &str, action: MoveAction) -> RegisterOutcome {
        self.register_at(id, action, Utc::now()).await
    }

    /// Register `action` for `id` with an explicit timestamp.
    pub async fn register_at(
        &self,
        id: &str,
        action: MoveAction,
        registered_at: DateTime<Utc>,
    ) -> RegisterOutcome {
        let id = normalize_id(id);
        let mut state = self.state.lock().await;

        if state.active.contains(&id) {
            return RegisterOutcome::Busy;
        }

        let entry = PendingAction {
            id: id.clone(),
            action,
            registered_at,
        };
        match state.pending.insert(id, entry) {
            Some(_) => RegisterOutcome::Replaced,
            None => RegisterOutcome::Inserted,
        }
    }

    /// Move `id` from pending to active and return its action.
    ///
    /// Returns `None` when the id is not pending (absent, already taken).
    pub async fn take(&self, id: &str) -> Option<PendingAction> {
        let id = normalize_id(id);
        let mut state = self.state.lock().await;

        if state.active.contains(&id) {
            return None;
        }
        let entry = state.pending.remove(&id)?;
        state.active.insert(id);
        Some(entry)
    }

    /// Clear the active marker for `id`. Returns whether it was set.
    pub async fn release(&self, id: &str) -> bool {
        self.state.lock().await.active.remove(&normalize_id(id))
    }

    /// Remove and return every pending entry whose age is at least `ttl`.
    pub async fn purge_stale(&self, now: DateTime<Utc>, ttl: Duration) -> Vec<PendingAction> {
        let mut state = self.state.lock().await;

        let stale: Vec<String> = state
            .pending
            .values()
            .filter(|entry| entry.age(now) >= ttl)
            .map(|entry| entry.id.clone())
            .collect();

        stale
            .iter()
            .filter_map(|id| state.pending.remove(id))
            .collect()
    }

    /// Ids with a pending action, sorted.
    pub async fn pending_ids(&self) -> Vec<String> {
        let state = self.state.lock().await;
        let mut ids: Vec<String> = state.pending.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Whether there are no pending actions.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.pending.is_empty()
    }

    pub async fn is_active(&self, id: &str) -> bool {
        self.state.lock().await.active.contains(&normalize_id(id))
    }

    pub async fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.lock().await;

        let mut pending: Vec<PendingAction> = state.pending.values().cloned().collect();
        pending.sort_by(|a, b| a.registered_at.cmp(&b.registered_at));
        let mut active: Vec<String> = state.active.iter().cloned().collect();
        active.sort();

        RegistrySnapshot { pending, active }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action() -> MoveAction {
        MoveAction::new("remote1:", "/movies/")
    }

    #[test]
    fn test_target_descriptor() {
        assert_eq!(action().target_descriptor(), "remote1:/movies/");
    }

    #[tokio::test]
    async fn test_register_and_overwrite() {
        let registry = PendingActionRegistry::new();

        assert_eq!(
            registry.register("ABC", action()).await,
            RegisterOutcome::Inserted
        );
        assert_eq!(
            registry
                .register("abc", MoveAction::new("remote2:", "/tv/"))
                .await,
            RegisterOutcome::Replaced
        );

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.pending.len(), 1);
        assert_eq!(snapshot.pending[0].id, "abc");
        assert_eq!(snapshot.pending[0].action.target_store, "remote2:");
    }

    #[tokio::test]
    async fn test_take_moves_to_active_once() {
        let registry = PendingActionRegistry::new();
        registry.register("abc", action()).await;

        let taken = registry.take("abc").await.unwrap();
        assert_eq!(taken.action, action());
        assert!(registry.take("abc").await.is_none());

        let snapshot = registry.snapshot().await;
        assert!(snapshot.pending.is_empty());
        assert_eq!(snapshot.active, vec!["abc".to_string()]);
    }

    #[tokio::test]
    async fn test_take_absent_returns_none() {
        let registry = PendingActionRegistry::new();
        assert!(registry.take("missing").await.is_none());
        assert!(registry.snapshot().await.active.is_empty());
    }

    #[tokio::test]
    async fn test_register_while_active_is_busy() {
        let registry = PendingActionRegistry::new();
        registry.register("abc", action()).await;
        registry.take("abc").await.unwrap();

        assert_eq!(registry.register("abc", action()).await, RegisterOutcome::Busy);
        assert!(registry.is_empty().await);

        assert!(registry.release("abc").await);
        assert!(!registry.release("abc").await);
        assert_eq!(
            registry.register("abc", action()).await,
            RegisterOutcome::Inserted
        );
    }

    #[tokio::test]
    async fn test_purge_stale_boundary() {
        let registry = PendingActionRegistry::new();
        let now = Utc::now();
        let ttl = Duration::hours(24);

        registry.register_at("exact", action(), now - ttl).await;
        registry
            .register_at("almost", action(), now - ttl + Duration::seconds(1))
            .await;
        registry.register_at("fresh", action(), now).await;

        let purged = registry.purge_stale(now, ttl).await;
        assert_eq!(purged.len(), 1);
        assert_eq!(purged[0].id, "exact");
        assert_eq!(
            registry.pending_ids().await,
            vec!["almost".to_string(), "fresh".to_string()]
        );
    }

    #[tokio::test]
    async fn test_id_never_pending_and_active() {
        let registry = std::sync::Arc::new(PendingActionRegistry::new());
        let mut handles = Vec::new();

        for i in 0..50 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let id = format!("id{}", i % 5);
                registry.register(&id, action()).await;
                let taken = registry.take(&id).await.is_some();

                let snapshot = registry.snapshot().await;
                for pending in &snapshot.pending {
                    assert!(!snapshot.active.contains(&pending.id));
                }

                if taken {
                    registry.release(&id).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = registry.snapshot().await;
        for pending in &snapshot.pending {
            assert!(!snapshot.active.contains(&pending.id));
        }
        assert!(snapshot.active.is_empty());
    }
}
