//! mirror::refs
//!
//! Ref-collision reconciliation around a push.
//!
//! The push maps both `refs/heads/*` and the online remote's tracking
//! namespace onto `refs/heads/*` at the destination. A branch name present
//! under both (the usual leftover of a detached-HEAD checkout created
//! during packaging) gives the transport two sources for one destination
//! ref, and the push is refused. The literal branch copy is removed before
//! the push — the tracking ref is what the upstream actually served — and
//! put back afterwards.

use std::collections::HashSet;

use super::ONLINE_REMOTE;

const HEADS_PREFIX: &str = "refs/heads/";

/// A ref removed ahead of a push, with enough context to put it back.
#[derive(Debug, Clone)]
pub struct SavedRef {
    pub name: String,
    pub target: git2::Oid,
}

/// Remove literal branch refs whose name also exists under the online
/// remote's tracking namespace, returning them for later restoration.
pub fn remove_colliding_refs(repo: &git2::Repository) -> Result<Vec<SavedRef>, git2::Error> {
    let tracking_prefix = format!("refs/remotes/{ONLINE_REMOTE}/");

    let mut tracked = HashSet::new();
    let mut heads = Vec::new();

    for reference in repo.references()? {
        let reference = reference?;
        // Symbolic refs (HEAD) and non-UTF8 names take no part.
        let Some(name) = reference.name() else { continue };
        if let Some(branch) = name.strip_prefix(&tracking_prefix) {
            tracked.insert(branch.to_string());
        } else if let Some(branch) = name.strip_prefix(HEADS_PREFIX) {
            if let Some(target) = reference.target() {
                heads.push((name.to_string(), branch.to_string(), target));
            }
        }
    }

    let mut removed = Vec::new();
    for (name, branch, target) in heads {
        if !tracked.contains(&branch) {
            continue;
        }
        repo.find_reference(&name)?.delete()?;
        removed.push(SavedRef { name, target });
    }

    Ok(removed)
}

/// Put back every ref removed by [`remove_colliding_refs`], overwriting
/// whatever the push may have left at those names.
pub fn restore_refs(repo: &git2::Repository, saved: &[SavedRef]) -> Result<(), git2::Error> {
    for entry in saved {
        repo.reference(
            &entry.name,
            entry.target,
            true,
            "airlift: restore ref removed for mirror push",
        )?;
    }
    Ok(())
}
