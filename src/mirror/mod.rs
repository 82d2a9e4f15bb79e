//! mirror
//!
//! Push replication of local repository checkouts into the git service.
//!
//! # Batch model
//!
//! A batch is a root directory holding one checkout per repository.
//! Checkouts are processed strictly sequentially in sorted order; the
//! first failure aborts the remaining batch. When the git service is
//! internal, a single [`Tunnel`] is opened for the whole batch and held
//! until every checkout is pushed.
//!
//! # Per-checkout contract
//!
//! Each checkout must carry the pre-existing `online-upstream` remote. The
//! mirror derives the target URL from it, creates the transient
//! `offline-downstream` remote, removes ref duplicates that would make the
//! transport refuse the push, pushes the three fixed refspecs, and puts
//! the removed refs back whether or not the push succeeded.

pub mod progress;
pub mod refs;

pub use progress::{LogProgress, MirrorProgress};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::config;
use crate::core::types::GitServerInfo;
use crate::gitserver::{resolve_base_url, rewrite_url, InternalEndpoint};
use crate::state::StateStore;
use crate::tunnel::{Tunnel, TunnelError};

/// Name of the pre-existing remote pointing at the original upstream.
pub const ONLINE_REMOTE: &str = "online-upstream";

/// Name of the transient remote pointing at the mirror. Created per push
/// and left in place afterwards.
pub const OFFLINE_REMOTE: &str = "offline-downstream";

/// Refspecs pushed for every checkout. A refspec that matches nothing is
/// ignored by the transport.
pub const PUSH_REFSPECS: [&str; 3] = [
    "refs/heads/*:refs/heads/*",
    "refs/remotes/online-upstream/*:refs/heads/*",
    "refs/tags/*:refs/tags/*",
];

/// Errors from mirroring a batch of checkouts.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// The checkout root could not be enumerated.
    #[error("unable to list checkouts under {path}: {source}")]
    ListCheckouts {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tunnel into the in-cluster git service failed.
    #[error(transparent)]
    Tunnel(#[from] TunnelError),

    /// Not a valid git repository, or unreadable.
    #[error("unable to open {path} as a git repository: {message}")]
    RepoOpen { path: PathBuf, message: String },

    /// The pre-existing upstream remote is missing from a checkout.
    #[error("checkout {repo} has no 'online-upstream' remote")]
    RemoteNotFound { repo: String },

    /// The mirror remote could not be created; a leftover remote from a
    /// prior run lands here too.
    #[error("unable to create the 'offline-downstream' remote in {repo}: {message}")]
    RemoteCreate { repo: String, message: String },

    /// Colliding refs could not be removed ahead of the push.
    #[error("unable to reconcile refs in {repo}: {message}")]
    RefReconciliation { repo: String, message: String },

    /// The push was refused or the transport failed.
    #[error("unable to push {repo} to the git service: {message}")]
    Push { repo: String, message: String },

    /// The blocking git task died before completing.
    #[error("mirror task for {repo} was aborted")]
    Task { repo: String },
}

/// Pushes a directory of checkouts to the configured git service.
pub struct RepoMirror {
    client: kube::Client,
    store: Arc<dyn StateStore>,
    progress: Arc<dyn MirrorProgress>,
}

impl RepoMirror {
    pub fn new(client: kube::Client, store: Arc<dyn StateStore>) -> Self {
        Self {
            client,
            store,
            progress: Arc::new(LogProgress),
        }
    }

    /// Replace the progress sink.
    pub fn with_progress(mut self, progress: Arc<dyn MirrorProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Push every checkout under `root`, sequentially, failing fast.
    pub async fn push_directory(&self, root: &Path) -> Result<(), MirrorError> {
        let state = self.store.load().await;
        let info = state.git_server;

        // One tunnel per batch, held until the last checkout is pushed.
        // Dropping it on any exit path tears the forwarding down.
        let mut tunnel = None;
        let base_url = if info.internal_server {
            let live = Tunnel::connect(
                self.client.clone(),
                config::NAMESPACE,
                config::GIT_SERVICE_NAME,
                config::GIT_SERVICE_PORT,
            )
            .await?;
            let url = resolve_base_url(&info, InternalEndpoint::Tunnel(&live.endpoint()));
            tunnel = Some(live);
            url
        } else {
            resolve_base_url(&info, InternalEndpoint::ClusterService)
        };

        let checkouts = list_checkout_dirs(root)?;
        self.progress.batch_started(checkouts.len());

        for path in checkouts {
            let name = checkout_name(&path);
            self.progress.checkout_started(&name);

            let base_url = base_url.clone();
            let info = info.clone();
            tokio::task::spawn_blocking(move || push_checkout(&path, &base_url, &info))
                .await
                .map_err(|_| MirrorError::Task { repo: name.clone() })??;

            self.progress.checkout_pushed(&name);
        }

        self.progress.batch_finished();

        if let Some(tunnel) = tunnel {
            tunnel.close();
        }
        Ok(())
    }
}

/// Push one checkout to the git service rooted at `base_url`.
///
/// Blocking; run it off the async runtime. The checkout's ref namespace is
/// unchanged net of this call: refs removed to unblock the push are
/// restored on success and failure alike.
pub fn push_checkout(path: &Path, base_url: &str, info: &GitServerInfo) -> Result<(), MirrorError> {
    let repo_name = checkout_name(path);

    let repo = git2::Repository::open(path).map_err(|err| MirrorError::RepoOpen {
        path: path.to_path_buf(),
        message: err.message().to_string(),
    })?;

    let upstream_url = {
        let online = repo
            .find_remote(ONLINE_REMOTE)
            .map_err(|_| MirrorError::RemoteNotFound {
                repo: repo_name.clone(),
            })?;
        match online.url() {
            Some(url) => url.to_string(),
            None => {
                return Err(MirrorError::RemoteNotFound {
                    repo: repo_name,
                })
            }
        }
    };

    let target_url = rewrite_url(base_url, &upstream_url, &info.git_username);
    debug!("mirroring {repo_name}: {upstream_url} -> {target_url}");

    repo.remote(OFFLINE_REMOTE, &target_url)
        .map_err(|err| MirrorError::RemoteCreate {
            repo: repo_name.clone(),
            message: err.message().to_string(),
        })?;

    let removed =
        refs::remove_colliding_refs(&repo).map_err(|err| MirrorError::RefReconciliation {
            repo: repo_name.clone(),
            message: err.message().to_string(),
        })?;

    let outcome = push_refs(&repo, &repo_name, info);

    // The removed refs go back regardless of the push outcome; later steps
    // may still need them. A failed restore is reported but cannot revert
    // a push that already landed.
    if let Err(err) = refs::restore_refs(&repo, &removed) {
        warn!(
            "unable to restore {} removed ref(s) in {repo_name}: {}",
            removed.len(),
            err.message()
        );
    }

    outcome
}

fn push_refs(
    repo: &git2::Repository,
    repo_name: &str,
    info: &GitServerInfo,
) -> Result<(), MirrorError> {
    let push_error = |err: git2::Error| MirrorError::Push {
        repo: repo_name.to_string(),
        message: err.message().to_string(),
    };

    let mut remote = repo.find_remote(OFFLINE_REMOTE).map_err(push_error)?;

    let mut rejected: Vec<String> = Vec::new();
    {
        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(|_url, _username_from_url, _allowed| {
            git2::Cred::userpass_plaintext(config::GIT_PUSH_USER, &info.push_credential)
        });
        // A refspec that matches nothing produces no updates here; an
        // up-to-date push succeeds with none either.
        callbacks.push_update_reference(|refname, status| {
            if let Some(message) = status {
                rejected.push(format!("{refname}: {message}"));
            }
            Ok(())
        });

        let mut options = git2::PushOptions::new();
        options.remote_callbacks(callbacks);

        remote
            .push(&PUSH_REFSPECS, Some(&mut options))
            .map_err(push_error)?;
    }

    if !rejected.is_empty() {
        return Err(MirrorError::Push {
            repo: repo_name.to_string(),
            message: rejected.join("; "),
        });
    }
    Ok(())
}

/// Immediate subdirectories of the batch root, sorted for a stable
/// processing order.
fn list_checkout_dirs(root: &Path) -> Result<Vec<PathBuf>, MirrorError> {
    let list_error = |source: std::io::Error| MirrorError::ListCheckouts {
        path: root.to_path_buf(),
        source,
    };

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root).map_err(list_error)? {
        let entry = entry.map_err(list_error)?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn checkout_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refspecs_are_fixed() {
        assert_eq!(
            PUSH_REFSPECS,
            [
                "refs/heads/*:refs/heads/*",
                "refs/remotes/online-upstream/*:refs/heads/*",
                "refs/tags/*:refs/tags/*",
            ]
        );
    }

    #[test]
    fn tracking_refspec_matches_online_remote_name() {
        assert_eq!(
            PUSH_REFSPECS[1],
            format!("refs/remotes/{ONLINE_REMOTE}/*:refs/heads/*")
        );
    }

    #[test]
    fn checkout_dirs_sorted_and_files_ignored() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("zeta")).unwrap();
        std::fs::create_dir(root.path().join("alpha")).unwrap();
        std::fs::write(root.path().join("stray-file"), b"ignored").unwrap();

        let dirs = list_checkout_dirs(root.path()).unwrap();
        let names: Vec<_> = dirs.iter().map(|path| checkout_name(path)).collect();
        assert_eq!(names, ["alpha", "zeta"]);
    }

    #[test]
    fn empty_root_is_an_empty_batch() {
        let root = tempfile::tempdir().unwrap();
        assert!(list_checkout_dirs(root.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = list_checkout_dirs(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, MirrorError::ListCheckouts { .. }));
    }
}
