//! state::secret
//!
//! Secret-backed state store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::{Api, Patch, PatchParams};
use tracing::{debug, warn};

use super::{StateError, StateStore};
use crate::core::config;
use crate::core::types::ClusterState;

/// Keeps the cluster state in the `airlift/airlift-state` Secret.
pub struct SecretStateStore {
    secrets: Api<Secret>,
}

impl SecretStateStore {
    pub fn new(client: kube::Client) -> Self {
        Self {
            secrets: Api::namespaced(client, config::NAMESPACE),
        }
    }
}

#[async_trait]
impl StateStore for SecretStateStore {
    async fn load(&self) -> ClusterState {
        match self.secrets.get(config::STATE_SECRET_NAME).await {
            Ok(secret) => decode_state(&secret),
            Err(kube::Error::Api(response)) if response.code == 404 => {
                debug!("state secret not found, using the default state");
                ClusterState::default()
            }
            Err(err) => {
                warn!("unable to fetch the state secret, using the default state: {err}");
                ClusterState::default()
            }
        }
    }

    async fn save(&self, state: &ClusterState) -> Result<(), StateError> {
        let secret = build_state_secret(state)?;
        let params = PatchParams::apply(config::FIELD_MANAGER).force();
        self.secrets
            .patch(config::STATE_SECRET_NAME, &params, &Patch::Apply(&secret))
            .await?;
        Ok(())
    }
}

/// Build the full-replacement Secret for a state record.
fn build_state_secret(state: &ClusterState) -> Result<Secret, StateError> {
    let payload = serde_json::to_vec(state)?;

    let mut data = BTreeMap::new();
    data.insert(config::STATE_DATA_KEY.to_string(), ByteString(payload));

    let mut labels = BTreeMap::new();
    labels.insert(
        config::MANAGED_BY_LABEL.to_string(),
        config::MANAGED_BY.to_string(),
    );

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(config::STATE_SECRET_NAME.to_string()),
            namespace: Some(config::NAMESPACE.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(data),
        ..Default::default()
    })
}

/// Decode the state payload, falling back to the default state on any
/// malformed or missing content.
fn decode_state(secret: &Secret) -> ClusterState {
    let payload = secret
        .data
        .as_ref()
        .and_then(|data| data.get(config::STATE_DATA_KEY));

    let Some(payload) = payload else {
        warn!(
            "state secret has no '{}' key, using the default state",
            config::STATE_DATA_KEY
        );
        return ClusterState::default();
    };

    match serde_json::from_slice(&payload.0) {
        Ok(state) => state,
        Err(err) => {
            warn!("state secret payload is not valid JSON, using the default state: {err}");
            ClusterState::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::GitServerInfo;

    fn sample_state() -> ClusterState {
        ClusterState {
            distro: "k3s".into(),
            storage_class: "local-path".into(),
            git_server: GitServerInfo {
                internal_server: false,
                git_address: "https://git.example.com".into(),
                git_port: 8443,
                git_username: "mirror".into(),
                push_credential: "s3cret".into(),
            },
        }
    }

    #[test]
    fn secret_has_fixed_coordinates() {
        let secret = build_state_secret(&sample_state()).unwrap();

        assert_eq!(secret.metadata.name.as_deref(), Some("airlift-state"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("airlift"));
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));

        let labels = secret.metadata.labels.unwrap();
        assert_eq!(
            labels.get("app.kubernetes.io/managed-by").map(String::as_str),
            Some("airlift")
        );
    }

    #[test]
    fn secret_roundtrips_through_decode() {
        let state = sample_state();
        let secret = build_state_secret(&state).unwrap();
        assert_eq!(decode_state(&secret), state);
    }

    #[test]
    fn missing_payload_key_decodes_to_default() {
        let mut secret = build_state_secret(&sample_state()).unwrap();
        secret.data = None;
        assert_eq!(decode_state(&secret), ClusterState::default());
    }

    #[test]
    fn garbage_payload_decodes_to_default() {
        let mut secret = build_state_secret(&sample_state()).unwrap();
        secret
            .data
            .as_mut()
            .unwrap()
            .insert("state".into(), ByteString(b"not json".to_vec()));
        assert_eq!(decode_state(&secret), ClusterState::default());
    }
}
