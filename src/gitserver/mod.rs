//! gitserver
//!
//! Where a repository lives once it is mirrored: base URL resolution from
//! the cluster state, and the rewrite policy mapping upstream repository
//! URLs onto the mirror. The mirror and the admission webhook both go
//! through these two functions, so they always agree on the target of a
//! given repository.

pub mod resolve;
pub mod rewrite;

pub use resolve::{resolve_base_url, InternalEndpoint};
pub use rewrite::rewrite_url;
