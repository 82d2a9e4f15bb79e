//! tunnel
//!
//! Batch-scoped forwarded connection into an in-cluster service.
//!
//! A [`Tunnel`] binds an ephemeral loopback listener and bridges every
//! accepted connection to a ready pod behind the named service over the
//! Kubernetes port-forward subprotocol. Exactly one tunnel is opened per
//! mirror batch and held for its whole lifetime; dropping the tunnel tears
//! the forwarding down, so release happens on every exit path including
//! early errors.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use k8s_openapi::api::core::v1::{Pod, Service};
use kube::api::{Api, ListParams};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Errors from establishing a tunnel.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// The target service could not be fetched.
    #[error("unable to look up service {namespace}/{name}: {source}")]
    ServiceLookup {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    /// The target service has no pod selector to resolve.
    #[error("service {namespace}/{name} has no selector")]
    NoSelector { namespace: String, name: String },

    /// No pod behind the service is ready to accept a connection.
    #[error("no ready pod behind service {namespace}/{name}")]
    NoReadyPod { namespace: String, name: String },

    /// The local forwarding socket could not be bound.
    #[error("unable to bind a local forwarding socket: {0}")]
    Bind(#[from] std::io::Error),

    /// Any other Kubernetes API failure.
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

/// A live forwarded connection. Closed on drop.
pub struct Tunnel {
    local_addr: SocketAddr,
    forwarder: JoinHandle<()>,
}

impl Tunnel {
    /// Open a tunnel to `port` of the named service.
    pub async fn connect(
        client: kube::Client,
        namespace: &str,
        service: &str,
        port: u16,
    ) -> Result<Self, TunnelError> {
        let services: Api<Service> = Api::namespaced(client.clone(), namespace);
        let svc = services
            .get(service)
            .await
            .map_err(|source| TunnelError::ServiceLookup {
                namespace: namespace.to_string(),
                name: service.to_string(),
                source,
            })?;

        let selector = svc
            .spec
            .and_then(|spec| spec.selector)
            .filter(|selector| !selector.is_empty())
            .ok_or_else(|| TunnelError::NoSelector {
                namespace: namespace.to_string(),
                name: service.to_string(),
            })?;

        let pods: Api<Pod> = Api::namespaced(client, namespace);
        let params = ListParams::default().labels(&selector_string(&selector));
        let pod_name = pods
            .list(&params)
            .await?
            .items
            .into_iter()
            .filter(|pod| is_pod_ready(pod))
            .find_map(|pod| pod.metadata.name)
            .ok_or_else(|| TunnelError::NoReadyPod {
                namespace: namespace.to_string(),
                name: service.to_string(),
            })?;

        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let local_addr = listener.local_addr()?;

        info!(
            "tunnel open: {local_addr} -> {namespace}/{pod_name}:{port}"
        );
        let forwarder = tokio::spawn(forward_connections(listener, pods, pod_name, port));

        Ok(Self {
            local_addr,
            forwarder,
        })
    }

    /// Local `"host:port"` endpoint of the tunnel.
    pub fn endpoint(&self) -> String {
        format!("127.0.0.1:{}", self.local_addr.port())
    }

    /// Tear the tunnel down. Dropping the tunnel has the same effect.
    pub fn close(self) {}
}

impl Drop for Tunnel {
    fn drop(&mut self) {
        debug!("tunnel closed: {}", self.local_addr);
        self.forwarder.abort();
    }
}

/// Accept loop: each inbound connection gets its own port-forward to the
/// target pod.
async fn forward_connections(listener: TcpListener, pods: Api<Pod>, pod_name: String, port: u16) {
    loop {
        let connection = match listener.accept().await {
            Ok((connection, _)) => connection,
            Err(err) => {
                warn!("tunnel accept failed: {err}");
                break;
            }
        };

        let pods = pods.clone();
        let pod_name = pod_name.clone();
        tokio::spawn(async move {
            if let Err(err) = forward_one(connection, pods, &pod_name, port).await {
                warn!("forwarded connection to {pod_name}:{port} failed: {err}");
            }
        });
    }
}

async fn forward_one(
    mut connection: TcpStream,
    pods: Api<Pod>,
    pod_name: &str,
    port: u16,
) -> Result<(), kube::Error> {
    let mut forwarder = pods.portforward(pod_name, &[port]).await?;
    if let Some(mut upstream) = forwarder.take_stream(port) {
        if let Err(err) = tokio::io::copy_bidirectional(&mut connection, &mut upstream).await {
            debug!("forwarded stream ended: {err}");
        }
    }
    Ok(())
}

fn selector_string(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn is_pod_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .any(|condition| condition.type_ == "Ready" && condition.status == "True")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{PodCondition, PodStatus};

    #[test]
    fn selector_string_joins_pairs() {
        let mut selector = BTreeMap::new();
        selector.insert("app".to_string(), "gitea".to_string());
        selector.insert("tier".to_string(), "web".to_string());
        assert_eq!(selector_string(&selector), "app=gitea,tier=web");
    }

    fn pod_with_ready(status: &str) -> Pod {
        Pod {
            status: Some(PodStatus {
                conditions: Some(vec![PodCondition {
                    type_: "Ready".to_string(),
                    status: status.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn ready_condition_required() {
        assert!(is_pod_ready(&pod_with_ready("True")));
        assert!(!is_pod_ready(&pod_with_ready("False")));
        assert!(!is_pod_ready(&Pod::default()));
    }
}
