//! gitserver::resolve
//!
//! Base URL resolution for the git service.

use crate::core::config;
use crate::core::types::GitServerInfo;

/// How an internal git service is reached.
///
/// Ignored for external servers, which carry their own address.
#[derive(Debug, Clone, Copy)]
pub enum InternalEndpoint<'a> {
    /// The fixed in-cluster service address, resolvable from inside the
    /// cluster without a forwarded connection. The admission path uses
    /// this; it never opens a tunnel.
    ClusterService,
    /// A live tunnel endpoint (`"host:port"`) owned by the caller. The
    /// mirror path uses this.
    Tunnel(&'a str),
}

/// Compute the base URL of the git service.
///
/// External servers yield `git_address`, with `:git_port` appended only
/// when the port is non-zero. Internal servers yield the caller's chosen
/// reachability mode.
pub fn resolve_base_url(info: &GitServerInfo, internal: InternalEndpoint<'_>) -> String {
    if info.internal_server {
        return match internal {
            InternalEndpoint::ClusterService => config::IN_CLUSTER_GIT_URL.to_string(),
            InternalEndpoint::Tunnel(endpoint) => format!("http://{endpoint}"),
        };
    }

    if info.git_port != 0 {
        format!("{}:{}", info.git_address, info.git_port)
    } else {
        info.git_address.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn external(address: &str, port: u16) -> GitServerInfo {
        GitServerInfo {
            internal_server: false,
            git_address: address.into(),
            git_port: port,
            ..Default::default()
        }
    }

    #[test]
    fn external_without_port_is_the_address() {
        let info = external("https://git.example.com", 0);
        assert_eq!(
            resolve_base_url(&info, InternalEndpoint::ClusterService),
            "https://git.example.com"
        );
    }

    #[test]
    fn external_with_port_appends_suffix() {
        let info = external("https://git.example.com", 8443);
        assert_eq!(
            resolve_base_url(&info, InternalEndpoint::ClusterService),
            "https://git.example.com:8443"
        );
    }

    #[test]
    fn internal_admission_path_uses_cluster_dns() {
        let info = GitServerInfo {
            internal_server: true,
            ..Default::default()
        };
        assert_eq!(
            resolve_base_url(&info, InternalEndpoint::ClusterService),
            "http://airlift-gitea-http.airlift.svc.cluster.local:3000"
        );
    }

    #[test]
    fn internal_mirror_path_uses_tunnel_endpoint() {
        let info = GitServerInfo {
            internal_server: true,
            // An internal server ignores whatever address was provided.
            git_address: "https://ignored.example.com".into(),
            git_port: 443,
            ..Default::default()
        };
        assert_eq!(
            resolve_base_url(&info, InternalEndpoint::Tunnel("127.0.0.1:9000")),
            "http://127.0.0.1:9000"
        );
    }
}
