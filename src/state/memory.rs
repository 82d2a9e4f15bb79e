//! state::memory
//!
//! In-memory state store for tests and local development.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{StateError, StateStore};
use crate::core::types::ClusterState;

/// Holds the state record in process memory with the same load/save
/// contract as the Secret-backed store: `load` of an empty store returns
/// the default state.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<Option<ClusterState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with the given state.
    pub fn with_state(state: ClusterState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> ClusterState {
        let guard = self.state.lock().unwrap_or_else(|err| err.into_inner());
        guard.clone().unwrap_or_default()
    }

    async fn save(&self, state: &ClusterState) -> Result<(), StateError> {
        let mut guard = self.state.lock().unwrap_or_else(|err| err.into_inner());
        *guard = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::GitServerInfo;

    #[tokio::test]
    async fn empty_store_loads_default_state() {
        let store = MemoryStateStore::new();
        assert_eq!(store.load().await, ClusterState::default());
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let store = MemoryStateStore::new();
        let state = ClusterState {
            git_server: GitServerInfo {
                internal_server: true,
                git_username: "airlift-git-user".into(),
                push_credential: "s3cret".into(),
                ..Default::default()
            },
            ..Default::default()
        };

        store.save(&state).await.unwrap();
        assert_eq!(store.load().await, state);
    }

    #[tokio::test]
    async fn save_overwrites_wholesale() {
        let store = MemoryStateStore::with_state(ClusterState {
            distro: "k3s".into(),
            ..Default::default()
        });

        store.save(&ClusterState::default()).await.unwrap();
        assert_eq!(store.load().await, ClusterState::default());
    }
}
