//! gitserver::rewrite
//!
//! The URL rewrite policy.
//!
//! A repository's identity is its trailing `owner/name` path, independent
//! of the host and scheme it was fetched from. Rewriting roots that
//! identity at the mirror's base URL under the mirror account, flattening
//! `owner/name` into a single repository name so two owners' same-named
//! repositories cannot collide.
//!
//! # Idempotence
//!
//! A URL that already targets the base is returned unchanged, so
//! `rewrite_url(base, rewrite_url(base, u, user), user)` equals
//! `rewrite_url(base, u, user)` for every `u`. The mirror and the
//! admission webhook both rely on this: a resource resubmitted after
//! mutation keeps its URL stable.

/// Map an upstream repository URL onto the mirror.
///
/// Returns `original_url` unchanged when it already targets `base_url`, or
/// when no repository identity can be extracted from it (the subsequent
/// push then fails loudly rather than mis-routing).
pub fn rewrite_url(base_url: &str, original_url: &str, username: &str) -> String {
    let base = base_url.trim_end_matches('/');

    if original_url == base || original_url.starts_with(&format!("{base}/")) {
        return original_url.to_string();
    }

    match repo_identity(original_url) {
        Some((owner, name)) => format!("{base}/{username}/{owner}-{name}.git"),
        None => original_url.to_string(),
    }
}

/// Extract the trailing `owner/name` identity from a repository URL.
///
/// Recognizes `https://host/.../owner/name[.git]`, the `http` and `ssh`
/// scheme forms, and scp-style `git@host:owner/name[.git]`. Deeper paths
/// (forge subgroups) contribute only their final two segments.
fn repo_identity(url: &str) -> Option<(String, String)> {
    let path = if let Some(rest) = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .or_else(|| url.strip_prefix("ssh://"))
    {
        rest.split_once('/')?.1
    } else if let Some((prefix, rest)) = url.split_once(':') {
        // scp-style: user@host:path. Anything with a slash before the
        // colon is not a host prefix.
        if prefix.contains('@') && !prefix.contains('/') {
            rest
        } else {
            return None;
        }
    } else {
        return None;
    };

    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let mut segments = path.rsplit('/');
    let name = segments.next()?;
    let owner = segments.next()?;

    if owner.is_empty() || name.is_empty() {
        return None;
    }

    Some((owner.to_string(), name.to_string()))
}
