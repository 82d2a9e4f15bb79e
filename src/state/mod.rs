//! state
//!
//! The cluster state record: a single Secret-shaped document holding the
//! git service configuration everything else derives from.
//!
//! # Design
//!
//! [`StateStore`] abstracts the storage backend. The production
//! implementation ([`SecretStateStore`]) keeps the record in a Kubernetes
//! Secret at a fixed name and namespace; [`MemoryStateStore`] backs tests
//! and local development.
//!
//! # Load semantics
//!
//! `load` never fails: an absent record and a retrieval error alike produce
//! `ClusterState::default()`, and callers must treat every field as
//! possibly-default. The two cases are logged at different levels so a
//! permission failure is visible in the logs rather than silently read as
//! "uninitialized cluster." `save` failures are surfaced.

pub mod memory;
pub mod secret;

pub use memory::MemoryStateStore;
pub use secret::SecretStateStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::ClusterState;

/// Errors from persisting the cluster state record.
#[derive(Debug, Error)]
pub enum StateError {
    /// The state could not be encoded to JSON.
    #[error("unable to encode the cluster state: {0}")]
    Encode(#[from] serde_json::Error),

    /// The state record could not be written to the backend.
    #[error("unable to persist the state secret: {0}")]
    Persist(#[from] kube::Error),
}

/// Storage backend for the cluster state record.
///
/// Exactly one persisted record is the source of truth; `save` overwrites
/// it wholesale (no merge, no versioning) and `load` fetches it fresh on
/// every call (no cache).
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Fetch the current state, or the default state if the record is
    /// absent or unreadable.
    async fn load(&self) -> ClusterState;

    /// Persist the given state, replacing whatever was stored before.
    async fn save(&self, state: &ClusterState) -> Result<(), StateError>;
}
