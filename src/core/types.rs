//! core::types
//!
//! The cluster state data model persisted in the state secret.
//!
//! # Zero values
//!
//! [`ClusterState`] is fetched through a store whose load path collapses
//! every retrieval failure into `ClusterState::default()`, so consumers must
//! treat every field as possibly-default. Serde defaults mirror that: a
//! payload with missing fields decodes rather than erroring.

use serde::{Deserialize, Serialize};

/// Location and credentials of the git service repositories are mirrored
/// into.
///
/// When `internal_server` is true the service runs inside the cluster:
/// `git_address` and `git_port` are ignored and connectivity goes through a
/// tunnel (mirror path) or cluster DNS (admission path). When false,
/// `git_address` is required and `git_port == 0` means "no port suffix."
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GitServerInfo {
    pub internal_server: bool,
    pub git_address: String,
    pub git_port: u16,
    /// Account owning mirrored repositories; embedded in rewritten URLs.
    pub git_username: String,
    /// Push credential for the mirror account.
    pub push_credential: String,
}

// Keeps the push credential out of debug output.
impl std::fmt::Debug for GitServerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitServerInfo")
            .field("internal_server", &self.internal_server)
            .field("git_address", &self.git_address)
            .field("git_port", &self.git_port)
            .field("git_username", &self.git_username)
            .field("push_credential", &"<redacted>")
            .finish()
    }
}

/// The single cluster-resident configuration record.
///
/// Created at cluster initialization, persisted wholesale under a fixed
/// name, and fetched fresh on every read. Only `git_server` matters to the
/// mirror and the agent; the remaining fields ride along for the rest of
/// the toolchain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterState {
    pub distro: String,
    pub storage_class: String,
    pub git_server: GitServerInfo,
}
