//! Airlift - mirror git repositories into air-gapped Kubernetes clusters.
//!
//! Airlift keeps GitOps working without internet egress. Repositories that
//! manifests reference on external hosts are pushed into a cluster-local
//! (or designated) git service, and a mutating admission webhook rewrites
//! each GitOps resource on the way in so reconciliation controllers talk
//! to the mirror instead of the original host.
//!
//! # Architecture
//!
//! - [`core`] - Shared configuration constants and the cluster state model
//! - [`state`] - The cluster state record (load/save through a Secret)
//! - [`gitserver`] - Base URL resolution and the URL rewrite policy
//! - [`tunnel`] - Batch-scoped port-forward into the in-cluster git service
//! - [`mirror`] - Push replication of local checkouts into the git service
//! - [`agent`] - The mutating admission webhook
//!
//! # Correctness Invariants
//!
//! 1. The mirror and the agent derive every target URL from the same state
//!    record through the same rewrite policy, so they never disagree about
//!    where a repository lives.
//! 2. A mirror push leaves the checkout's ref namespace unchanged net of
//!    the operation, on success and failure alike.
//! 3. The tunnel is released on every exit path of a mirror batch.

pub mod agent;
pub mod core;
pub mod gitserver;
pub mod mirror;
pub mod state;
pub mod tunnel;
