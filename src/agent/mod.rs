//! agent
//!
//! The mutating admission webhook.
//!
//! GitOps resources submitted to the cluster reference repositories on
//! external hosts. The agent intercepts them at admission time and
//! rewrites the repository URL and credential reference so reconciliation
//! controllers talk to the mirror instead. Handlers are stateless apart
//! from an independent state read per request, so any number of them can
//! run concurrently.

pub mod mutate;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::StateStore;

/// Shared state for webhook handlers.
#[derive(Clone)]
pub struct AgentState {
    /// Cluster state store, consulted once per admission request.
    pub store: Arc<dyn StateStore>,
}

impl AgentState {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }
}

/// Build the webhook router.
///
/// - `POST /mutate/gitrepositories` - rewrite a GitOps repository resource
/// - `GET /healthz` - liveness probe
pub fn agent_router(state: AgentState) -> Router {
    Router::new()
        .route(
            "/mutate/gitrepositories",
            post(mutate::mutate_git_repository),
        )
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}
