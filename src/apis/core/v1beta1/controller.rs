//! ControllerRegistration and ControllerInstallation CRDs
//!
//! A ControllerRegistration announces an extension controller and the
//! extension resources (kind/type pairs) it is responsible for. A
//! ControllerInstallation binds a registration and a deployment to a seed.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::apis::common::{raw_extension_schema, Condition, LocalObjectReference, ObjectReference};

// =============================================================================
// ControllerRegistration CRD
// =============================================================================

/// ControllerRegistration represents a registration of an external controller.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "core.gardener.cloud",
    version = "v1beta1",
    kind = "ControllerRegistration",
    plural = "controllerregistrations",
    shortname = "ctrlreg",
    derive = "Default",
    printcolumn = r#"{"name": "Resources", "type": "string", "jsonPath": ".spec.resources[*].kind"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ControllerRegistrationSpec {
    /// Resources is a list of combinations of kinds and their types the controller is responsible for
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ControllerResource>,

    /// Deployment contains information for how this controller is deployed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<ControllerRegistrationDeployment>,
}

/// Extension resource handled by a controller
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ControllerResource {
    /// Kind of the extension resource, e.g. `Infrastructure`
    pub kind: String,

    /// Type of the extension resource, e.g. `aws`
    #[serde(rename = "type")]
    pub type_: String,

    /// Whether the extension is enabled for all shoots by default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_enabled: Option<bool>,

    /// Timeout for the reconciliation of the resource, e.g. `3m`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconcile_timeout: Option<String>,

    /// Whether this controller is the primary one for the kind/type, defaults to true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,

    /// Lifecycle strategies relative to the kube-apiserver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<ControllerResourceLifecycle>,

    /// Whether the extension supports workerless shoots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workerless_supported: Option<bool>,
}

impl ControllerResource {
    /// Whether this registration is primary for its kind/type
    pub fn is_primary(&self) -> bool {
        self.primary.unwrap_or(true)
    }
}

/// Lifecycle strategies of an extension resource
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ControllerResourceLifecycle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconcile: Option<ControllerResourceLifecycleStrategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<ControllerResourceLifecycleStrategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrate: Option<ControllerResourceLifecycleStrategy>,
}

/// Ordering of an extension relative to the kube-apiserver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ControllerResourceLifecycleStrategy {
    BeforeKubeAPIServer,
    AfterKubeAPIServer,
}

/// How the controller is deployed
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ControllerRegistrationDeployment {
    /// Policy controlling when the controller is deployed, defaults to `OnDemand`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<ControllerDeploymentPolicy>,

    /// Seeds the controller is deployed to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_selector: Option<LabelSelector>,

    /// References to ControllerDeployments; at most one is supported
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deployment_refs: Vec<LocalObjectReference>,
}

/// Deployment policy of a controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ControllerDeploymentPolicy {
    #[default]
    OnDemand,
    Always,
    AlwaysExceptNoShoots,
}

// =============================================================================
// ControllerInstallation CRD
// =============================================================================

/// ControllerInstallation represents an installation request for an external controller.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "core.gardener.cloud",
    version = "v1beta1",
    kind = "ControllerInstallation",
    plural = "controllerinstallations",
    shortname = "ctrlinst",
    status = "ControllerInstallationStatus",
    derive = "Default",
    printcolumn = r#"{"name": "Registration", "type": "string", "jsonPath": ".spec.registrationRef.name"}"#,
    printcolumn = r#"{"name": "Seed", "type": "string", "jsonPath": ".spec.seedRef.name"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ControllerInstallationSpec {
    /// Reference to a ControllerRegistration resource
    pub registration_ref: ObjectReference,

    /// Reference to a Seed resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_ref: Option<ObjectReference>,

    /// Reference to a ControllerDeployment resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_ref: Option<ObjectReference>,
}

/// Observed status of a ControllerInstallation
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ControllerInstallationStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Provider-specific status of the installation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub provider_status: Option<serde_json::Value>,
}

/// Condition types reported on ControllerInstallations
pub mod condition_types {
    pub const VALID: &str = "Valid";
    pub const INSTALLED: &str = "Installed";
    pub const HEALTHY: &str = "Healthy";
    pub const PROGRESSING: &str = "Progressing";
}
