//! Validating admission endpoint and its router

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use indexmap::IndexMap;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use kube::core::DynamicObject;
use kube::ResourceExt;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::apis::core::v1beta1::{CloudProfile, ControllerRegistration, Shoot};
use crate::apis::{all_crds, ApiKind};
use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::validation::{validate_object, ValidationContext};
use crate::versioning::PolicyChecker;
use crate::webhook::profiles::ProfileCache;

/// Shared state of the webhook handlers
#[derive(Debug, Clone)]
pub struct WebhookState {
    pub profiles: Arc<ProfileCache>,
    pub metrics: Metrics,
    pub policy: PolicyChecker,
    /// Admitted ControllerRegistrations by name, for primary ownership checks
    pub registrations: Arc<RwLock<IndexMap<String, ControllerRegistration>>>,
    ready: Arc<AtomicBool>,
}

impl WebhookState {
    pub fn new(profiles: Arc<ProfileCache>, metrics: Metrics, policy: PolicyChecker) -> Self {
        Self {
            profiles,
            metrics,
            policy,
            registrations: Arc::default(),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Build the webhook router
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/validate", post(validate))
        .route("/crds", get(list_crds))
        .route("/metrics", get(metrics))
        .route("/healthz", get(health_check))
        .route("/readyz", get(readiness_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn operation_name(operation: &Operation) -> &'static str {
    match operation {
        Operation::Create => "CREATE",
        Operation::Update => "UPDATE",
        Operation::Delete => "DELETE",
        Operation::Connect => "CONNECT",
    }
}

async fn validate(
    State(state): State<WebhookState>,
    Json(review): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let request: AdmissionRequest<DynamicObject> = match review.try_into() {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Malformed admission review");
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    let started = Instant::now();
    let kind = request.kind.kind.clone();
    let operation = operation_name(&request.operation);
    let response = admit(&state, &request);
    state
        .metrics
        .observe_admission(&kind, operation, response.allowed, started.elapsed());

    Json(response.into_review())
}

/// Decide one admission request
pub fn admit(state: &WebhookState, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
    let response = AdmissionResponse::from(request);
    let name = request.name.as_str();

    if !matches!(request.operation, Operation::Create | Operation::Update) {
        return response;
    }

    let kind = match ApiKind::from_group_kind(&request.kind.group, &request.kind.kind) {
        Ok(kind) if kind.version() == request.kind.version => kind,
        _ => {
            warn!(
                group = %request.kind.group,
                version = %request.kind.version,
                kind = %request.kind.kind,
                "Admitting unsupported kind without validation"
            );
            return response;
        }
    };

    match review_object(state, kind, request) {
        Ok(None) => {
            debug!(%kind, name, "Admitted");
            response
        }
        Ok(Some(message)) => {
            info!(%kind, name, %message, "Denied");
            response.deny(message)
        }
        Err(e) => {
            warn!(%kind, name, error = %e, "Could not decode object");
            response.deny(e.to_string())
        }
    }
}

/// Validate the object of a request, returns the denial message if any
fn review_object(
    state: &WebhookState,
    kind: ApiKind,
    request: &AdmissionRequest<DynamicObject>,
) -> Result<Option<String>> {
    let object = request
        .object
        .as_ref()
        .ok_or_else(|| Error::AdmissionReview("request carries no object".into()))?;
    let object = serde_json::to_value(object)?;
    let old = match (&request.operation, &request.old_object) {
        (Operation::Update, Some(old)) => Some(serde_json::to_value(old)?),
        _ => None,
    };

    let profile = match kind {
        ApiKind::Shoot => {
            let shoot: Shoot = serde_json::from_value(object.clone())?;
            let profile = shoot.cloud_profile_name().and_then(|name| state.profiles.get(name));
            if profile.is_none() {
                debug!(shoot = ?shoot.cloud_profile_name(), "Cloud profile not cached, skipping version checks");
            }
            profile
        }
        _ => None,
    };

    let registrations: Vec<ControllerRegistration> = match kind {
        ApiKind::ControllerRegistration => state.registrations.read().values().cloned().collect(),
        _ => Vec::new(),
    };

    let mut ctx = ValidationContext::new(Utc::now())
        .with_policy(state.policy.clone())
        .with_registrations(&registrations);
    if let Some(profile) = profile.as_deref() {
        ctx = ctx.with_cloud_profile(profile);
    }

    let errors = validate_object(kind, &object, old.as_ref(), &ctx)?;
    if !errors.is_empty() {
        return Ok(Some(format!("{} {:?} is invalid: {}", kind.kind(), request.name, errors)));
    }

    if request.dry_run {
        return Ok(None);
    }
    match kind {
        ApiKind::CloudProfile => {
            let profile: CloudProfile = serde_json::from_value(object)?;
            state.profiles.insert(profile);
            state.metrics.cloud_profiles_cached.set(state.profiles.len() as i64);
        }
        ApiKind::ControllerRegistration => {
            let registration: ControllerRegistration = serde_json::from_value(object)?;
            debug!(registration = %registration.name_any(), "Caching controller registration");
            state.registrations.write().insert(registration.name_any(), registration);
        }
        _ => {}
    }
    Ok(None)
}

async fn list_crds() -> impl IntoResponse {
    match all_crds() {
        Ok(crds) => (StatusCode::OK, Json(serde_json::json!({ "items": crds }))).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn metrics(State(state): State<WebhookState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readiness_check(State(state): State<WebhookState>) -> impl IntoResponse {
    if state.is_ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn state() -> WebhookState {
        let state = WebhookState::new(
            Arc::new(ProfileCache::new()),
            Metrics::new().unwrap(),
            PolicyChecker::default(),
        );
        state.set_ready(true);
        state
    }

    fn review(operation: &str, kind: (&str, &str, &str), object: Value, old: Option<Value>) -> Value {
        let (group, version, kind) = kind;
        json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
                "kind": {"group": group, "version": version, "kind": kind},
                "resource": {"group": group, "version": version, "resource": "projects"},
                "name": object["metadata"]["name"],
                "operation": operation,
                "userInfo": {"username": "admin"},
                "object": object,
                "oldObject": old,
                "dryRun": false
            }
        })
    }

    fn project(name: &str, namespace: &str) -> Value {
        json!({
            "apiVersion": "core.gardener.cloud/v1beta1",
            "kind": "Project",
            "metadata": {"name": name},
            "spec": {"namespace": namespace}
        })
    }

    async fn post_review(state: WebhookState, body: Value) -> Value {
        let response = router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/validate")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const PROJECT: (&str, &str, &str) = ("core.gardener.cloud", "v1beta1", "Project");

    #[tokio::test]
    async fn test_valid_project_is_allowed() {
        let reply = post_review(state(), review("CREATE", PROJECT, project("dev", "garden-dev"), None)).await;
        assert_eq!(reply["response"]["uid"], "705ab4f5-6393-11e8-b7cc-42010a800002");
        assert_eq!(reply["response"]["allowed"], true);
    }

    #[tokio::test]
    async fn test_invalid_project_is_denied() {
        let state = state();
        let reply = post_review(
            state.clone(),
            review("CREATE", PROJECT, project("much-too-long", "garden-x"), None),
        )
        .await;
        assert_eq!(reply["response"]["allowed"], false);
        let message = reply["response"]["status"]["message"].as_str().unwrap();
        assert!(message.contains("metadata.name"), "{}", message);

        let denied = state
            .metrics
            .admission_requests
            .with_label_values(&["Project", "CREATE", "false"])
            .get();
        assert_eq!(denied, 1);
    }

    #[tokio::test]
    async fn test_immutable_namespace_on_update() {
        let reply = post_review(
            state(),
            review(
                "UPDATE",
                PROJECT,
                project("dev", "garden-other"),
                Some(project("dev", "garden-dev")),
            ),
        )
        .await;
        assert_eq!(reply["response"]["allowed"], false);
    }

    #[tokio::test]
    async fn test_unsupported_kind_and_delete_are_allowed() {
        let reply = post_review(
            state(),
            review("CREATE", ("apps", "v1", "Deployment"), project("x", "y"), None),
        )
        .await;
        assert_eq!(reply["response"]["allowed"], true);

        let reply = post_review(
            state(),
            review("DELETE", PROJECT, project("much-too-long", "garden-x"), None),
        )
        .await;
        assert_eq!(reply["response"]["allowed"], true);
    }

    #[tokio::test]
    async fn test_admitted_cloud_profile_is_cached() {
        let state = state();
        let profile = json!({
            "apiVersion": "core.gardener.cloud/v1beta1",
            "kind": "CloudProfile",
            "metadata": {"name": "aws"},
            "spec": {
                "type": "aws",
                "kubernetes": {"versions": [{"version": "1.30.2"}]},
                "machineImages": [{"name": "gardenlinux", "versions": [{"version": "1443.3.0"}]}],
                "machineTypes": [{"name": "m5.large", "cpu": "2", "gpu": "0", "memory": "8Gi"}],
                "regions": [{"name": "eu-west-1"}]
            }
        });
        let reply = post_review(
            state.clone(),
            review("CREATE", ("core.gardener.cloud", "v1beta1", "CloudProfile"), profile, None),
        )
        .await;
        assert_eq!(reply["response"]["allowed"], true, "{}", reply);
        assert!(state.profiles.get("aws").is_some());
    }

    #[tokio::test]
    async fn test_second_primary_registration_is_denied() {
        const REGISTRATION: (&str, &str, &str) = ("core.gardener.cloud", "v1beta1", "ControllerRegistration");
        let registration = |name: &str| {
            json!({
                "apiVersion": "core.gardener.cloud/v1beta1",
                "kind": "ControllerRegistration",
                "metadata": {"name": name},
                "spec": {"resources": [{"kind": "Infrastructure", "type": "aws"}]}
            })
        };

        let state = state();
        let reply = post_review(state.clone(), review("CREATE", REGISTRATION, registration("provider-aws"), None)).await;
        assert_eq!(reply["response"]["allowed"], true, "{}", reply);
        assert!(state.registrations.read().contains_key("provider-aws"));

        // Updating the owner itself is fine
        let reply = post_review(
            state.clone(),
            review(
                "UPDATE",
                REGISTRATION,
                registration("provider-aws"),
                Some(registration("provider-aws")),
            ),
        )
        .await;
        assert_eq!(reply["response"]["allowed"], true, "{}", reply);

        let reply = post_review(state.clone(), review("CREATE", REGISTRATION, registration("provider-aws-2"), None)).await;
        assert_eq!(reply["response"]["allowed"], false);
        let message = reply["response"]["status"]["message"].as_str().unwrap();
        assert!(message.contains("spec.resources[0].primary"), "{}", message);
        assert!(!state.registrations.read().contains_key("provider-aws-2"));
    }

    #[tokio::test]
    async fn test_probes_and_metrics() {
        let state = state();
        let app = router(state.clone());
        for (uri, status) in [("/healthz", StatusCode::OK), ("/readyz", StatusCode::OK), ("/metrics", StatusCode::OK)] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), status, "{}", uri);
        }

        state.set_ready(false);
        let response = app
            .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_crds_endpoint() {
        let response = router(state())
            .oneshot(Request::builder().uri("/crds").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["items"].as_array().unwrap().len(), ApiKind::ALL.len());
    }
}
