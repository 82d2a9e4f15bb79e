//! core::config
//!
//! Fixed names and addresses shared by the mirror and the agent. These are
//! contract values: the state secret, the managed credential secret, and the
//! in-cluster git service all live at well-known coordinates so every
//! component resolves them identically without coordination.

/// Namespace everything airlift-managed lives in.
pub const NAMESPACE: &str = "airlift";

/// Name of the Secret holding the cluster state record.
pub const STATE_SECRET_NAME: &str = "airlift-state";

/// Data key inside the state secret holding the JSON payload.
pub const STATE_DATA_KEY: &str = "state";

/// Name of the managed credential secret the admission webhook points
/// GitOps resources at.
pub const GIT_SECRET_NAME: &str = "airlift-git-push";

/// Label key/value applied to every record airlift writes.
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY: &str = "airlift";

/// Field manager name used for server-side apply.
pub const FIELD_MANAGER: &str = "airlift";

/// Service name and HTTP port of the in-cluster git service.
pub const GIT_SERVICE_NAME: &str = "airlift-gitea-http";
pub const GIT_SERVICE_PORT: u16 = 3000;

/// Base URL of the in-cluster git service, resolvable from inside the
/// cluster without a forwarded connection.
pub const IN_CLUSTER_GIT_URL: &str =
    "http://airlift-gitea-http.airlift.svc.cluster.local:3000";

/// Account the mirror authenticates as when pushing.
pub const GIT_PUSH_USER: &str = "airlift-git-user";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_cluster_url_matches_service_coordinates() {
        assert_eq!(
            IN_CLUSTER_GIT_URL,
            format!("http://{GIT_SERVICE_NAME}.{NAMESPACE}.svc.cluster.local:{GIT_SERVICE_PORT}")
        );
    }
}
