//! agent::mutate
//!
//! The GitOps repository mutation handler.
//!
//! Only `spec.url` and `spec.secretRef.name` are read; every other field
//! passes through unexamined, so new fields in the resource schema never
//! break admission. A body that cannot be decoded produces an error
//! response — a malformed resource is never silently allowed through
//! unmodified.

use axum::extract::State;
use axum::Json;
use json_patch::{AddOperation, Patch, PatchOperation, ReplaceOperation};
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use kube::core::DynamicObject;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::AgentState;
use crate::core::config;
use crate::gitserver::{resolve_base_url, rewrite_url, InternalEndpoint};

/// The narrow slice of a GitOps repository resource this webhook reads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoSpec {
    url: String,
    #[serde(default)]
    secret_ref: Option<SecretRef>,
}

#[derive(Debug, Deserialize)]
struct SecretRef {
    #[serde(default)]
    name: String,
}

/// Handle an admission review for a GitOps repository resource.
///
/// Create and Update are mutated identically; every other operation is
/// allowed untouched.
pub async fn mutate_git_repository(
    State(state): State<AgentState>,
    Json(review): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let request: AdmissionRequest<DynamicObject> = match review.try_into() {
        Ok(request) => request,
        Err(err) => {
            warn!("invalid admission review: {err}");
            return Json(AdmissionResponse::invalid(err.to_string()).into_review());
        }
    };

    let response = AdmissionResponse::from(&request);

    if !matches!(request.operation, Operation::Create | Operation::Update) {
        return Json(response.into_review());
    }

    // An independent fresh read per request; the admission path resolves
    // the in-cluster address and never opens a tunnel.
    let cluster_state = state.store.load().await;
    let base_url = resolve_base_url(&cluster_state.git_server, InternalEndpoint::ClusterService);

    let response = match mutate(
        response,
        &request,
        &base_url,
        &cluster_state.git_server.git_username,
    ) {
        Ok(response) => response,
        Err(reason) => {
            warn!("git repository admission failed: {reason}");
            AdmissionResponse::from(&request).deny(reason)
        }
    };
    Json(response.into_review())
}

fn mutate(
    response: AdmissionResponse,
    request: &AdmissionRequest<DynamicObject>,
    base_url: &str,
    username: &str,
) -> Result<AdmissionResponse, String> {
    let object = request
        .object
        .as_ref()
        .ok_or_else(|| "admission request has no object".to_string())?;
    let spec = object
        .data
        .get("spec")
        .cloned()
        .ok_or_else(|| "resource has no spec".to_string())?;
    let spec: RepoSpec = serde_json::from_value(spec)
        .map_err(|err| format!("unable to decode the git repository spec: {err}"))?;

    let target_url = rewrite_url(base_url, &spec.url, username);
    info!("rewriting git repository url {} -> {target_url}", spec.url);

    let mut patches = vec![PatchOperation::Replace(ReplaceOperation {
        path: "/spec/url".to_string(),
        value: json!(target_url),
    })];

    // Point the credential at the managed push secret: replace a
    // user-supplied reference, add one where none exists.
    match spec.secret_ref {
        Some(secret_ref) if !secret_ref.name.is_empty() => {
            patches.push(PatchOperation::Replace(ReplaceOperation {
                path: "/spec/secretRef/name".to_string(),
                value: json!(config::GIT_SECRET_NAME),
            }));
        }
        _ => {
            patches.push(PatchOperation::Add(AddOperation {
                path: "/spec/secretRef".to_string(),
                value: json!({ "name": config::GIT_SECRET_NAME }),
            }));
        }
    }

    response
        .with_patch(Patch(patches))
        .map_err(|err| format!("unable to serialize the admission patch: {err}"))
}
