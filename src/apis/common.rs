//! Types shared across the Gardener API groups
//!
//! Conditions, last operations and errors, object references, taints and
//! tolerations, credentials rotation status and a few schema helpers used by
//! `providerConfig`-style fields that carry arbitrary extension payloads.

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Well-known annotations and labels
// =============================================================================

/// Annotation used to request an operation on an object
pub const ANNOTATION_OPERATION: &str = "gardener.cloud/operation";

/// Label carrying the project name on namespaces and projects
pub const LABEL_PROJECT_NAME: &str = "project.gardener.cloud/name";

/// Namespace prefix of project namespaces
pub const PROJECT_NAMESPACE_PREFIX: &str = "garden-";

/// Namespace of the `garden` project
pub const GARDEN_NAMESPACE: &str = "garden";

// =============================================================================
// Schema Helpers
// =============================================================================

/// Schema for embedded extension payloads (`RawExtension` in Kubernetes terms).
///
/// The structural schema must allow any fields, otherwise the API server
/// prunes the payload on admission.
pub fn raw_extension_schema(_: &mut SchemaGenerator) -> Schema {
    let mut schema = SchemaObject {
        instance_type: Some(InstanceType::Object.into()),
        ..Default::default()
    };
    schema.extensions.insert(
        "x-kubernetes-preserve-unknown-fields".to_string(),
        serde_json::Value::Bool(true),
    );
    Schema::Object(schema)
}

// =============================================================================
// Conditions
// =============================================================================

/// Status of a condition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
    Progressing,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionStatus::True => write!(f, "True"),
            ConditionStatus::False => write!(f, "False"),
            ConditionStatus::Unknown => write!(f, "Unknown"),
            ConditionStatus::Progressing => write!(f, "Progressing"),
        }
    }
}

/// Well-defined error codes attached to conditions and last errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ErrorCode {
    #[serde(rename = "ERR_INFRA_UNAUTHENTICATED")]
    InfraUnauthenticated,
    #[serde(rename = "ERR_INFRA_UNAUTHORIZED")]
    InfraUnauthorized,
    #[serde(rename = "ERR_INFRA_QUOTA_EXCEEDED")]
    InfraQuotaExceeded,
    #[serde(rename = "ERR_INFRA_RATE_LIMITS_EXCEEDED")]
    InfraRateLimitsExceeded,
    #[serde(rename = "ERR_INFRA_DEPENDENCIES")]
    InfraDependencies,
    #[serde(rename = "ERR_RETRYABLE_INFRA_DEPENDENCIES")]
    RetryableInfraDependencies,
    #[serde(rename = "ERR_INFRA_RESOURCES_DEPLETED")]
    InfraResourcesDepleted,
    #[serde(rename = "ERR_CLEANUP_CLUSTER_RESOURCES")]
    CleanupClusterResources,
    #[serde(rename = "ERR_CONFIGURATION_PROBLEM")]
    ConfigurationProblem,
    #[serde(rename = "ERR_RETRYABLE_CONFIGURATION_PROBLEM")]
    RetryableConfigurationProblem,
    #[serde(rename = "ERR_PROBLEMATIC_WEBHOOK")]
    ProblematicWebhook,
}

impl ErrorCode {
    /// Codes that indicate a problem only the end user can fix
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ErrorCode::InfraUnauthenticated
                | ErrorCode::InfraUnauthorized
                | ErrorCode::InfraDependencies
                | ErrorCode::InfraQuotaExceeded
                | ErrorCode::CleanupClusterResources
                | ErrorCode::ConfigurationProblem
                | ErrorCode::ProblematicWebhook
        )
    }
}

/// Condition holds the information about the state of a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of the condition
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition, one of True, False, Unknown, Progressing
    pub status: ConditionStatus,

    /// Last time the condition transitioned from one status to another
    #[schemars(with = "String")]
    pub last_transition_time: DateTime<Utc>,

    /// Last time the condition was updated
    #[schemars(with = "String")]
    pub last_update_time: DateTime<Utc>,

    /// The reason for the condition's last transition
    #[serde(default)]
    pub reason: String,

    /// A human readable message indicating details about the transition
    #[serde(default)]
    pub message: String,

    /// Well-defined error codes in case the condition reports a problem
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codes: Vec<ErrorCode>,
}

// =============================================================================
// Last Operation / Last Error
// =============================================================================

/// Type of the last operation performed on an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum LastOperationType {
    Create,
    Reconcile,
    Delete,
    Migrate,
    Restore,
}

impl std::fmt::Display for LastOperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LastOperationType::Create => write!(f, "Create"),
            LastOperationType::Reconcile => write!(f, "Reconcile"),
            LastOperationType::Delete => write!(f, "Delete"),
            LastOperationType::Migrate => write!(f, "Migrate"),
            LastOperationType::Restore => write!(f, "Restore"),
        }
    }
}

/// State of the last operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum LastOperationState {
    Processing,
    Succeeded,
    Error,
    Failed,
    Pending,
    Aborted,
}

impl std::fmt::Display for LastOperationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LastOperationState::Processing => write!(f, "Processing"),
            LastOperationState::Succeeded => write!(f, "Succeeded"),
            LastOperationState::Error => write!(f, "Error"),
            LastOperationState::Failed => write!(f, "Failed"),
            LastOperationState::Pending => write!(f, "Pending"),
            LastOperationState::Aborted => write!(f, "Aborted"),
        }
    }
}

/// LastOperation indicates the type and the state of the last operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LastOperation {
    /// A human readable message indicating details about the last operation
    pub description: String,

    /// Last time the operation state transitioned from one to another
    #[schemars(with = "String")]
    pub last_update_time: DateTime<Utc>,

    /// The progress in percentage (0-100) of the last operation
    pub progress: i32,

    /// Status of the last operation
    pub state: LastOperationState,

    /// Type of the last operation
    #[serde(rename = "type")]
    pub type_: LastOperationType,
}

impl LastOperation {
    /// Whether the operation finished and does not need another attempt
    pub fn is_succeeded(&self) -> bool {
        self.state == LastOperationState::Succeeded
    }

    /// Whether the operation failed terminally
    pub fn is_failed(&self) -> bool {
        self.state == LastOperationState::Failed
    }
}

/// LastError indicates the last occurred error for an operation on a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LastError {
    /// A human readable message indicating details about the last error
    pub description: String,

    /// ID of the task which caused this last error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Well-defined error codes of the last error(s)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codes: Vec<ErrorCode>,

    /// Last time the error was reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub last_update_time: Option<DateTime<Utc>>,
}

/// Gardener holds the information about the Gardener version that operated a resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Gardener {
    /// Docker container id of the Gardener which last acted on a resource
    pub id: String,

    /// Hostname (pod name) of the Gardener which last acted on a resource
    pub name: String,

    /// Version of the Gardener which last acted on a resource
    pub version: String,
}

// =============================================================================
// References
// =============================================================================

/// Reference to an object in the same namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocalObjectReference {
    /// Name of the referent
    pub name: String,
}

/// Reference to an arbitrary object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    /// API version of the referent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Kind of the referent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Name of the referent
    pub name: String,

    /// Namespace of the referent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Resource version of the referent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

/// Reference to a secret, optionally in another namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Reference to an object of a given kind and API version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrossVersionObjectReference {
    pub kind: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

/// Named reference to a resource, used to make resources available to extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamedResourceReference {
    pub name: String,
    pub resource_ref: CrossVersionObjectReference,
}

/// An API group and kind pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupKind {
    #[serde(default)]
    pub group: String,
    pub kind: String,
}

// =============================================================================
// Taints & Tolerations
// =============================================================================

/// Taint on a seed; shoots must tolerate it to be scheduled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Taint {
    /// Taint key to be applied to a seed
    pub key: String,

    /// Taint value corresponding to the taint key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Toleration of a seed taint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Toleration {
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Toleration {
    /// A toleration without value tolerates every value of the key
    pub fn tolerates(&self, taint: &Taint) -> bool {
        self.key == taint.key && (self.value.is_none() || self.value == taint.value)
    }
}

/// Check whether every taint is tolerated by at least one toleration
pub fn tolerates_all(taints: &[Taint], tolerations: &[Toleration]) -> bool {
    taints
        .iter()
        .all(|taint| tolerations.iter().any(|t| t.tolerates(taint)))
}

// =============================================================================
// Maintenance
// =============================================================================

/// Time window in `HHMMSS+ZZZZ` format in which maintenance may happen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceTimeWindow {
    /// Beginning of the time window, e.g. `220000+0100`
    pub begin: String,

    /// End of the time window, e.g. `220000+0100`
    pub end: String,
}

// =============================================================================
// Credentials Rotation
// =============================================================================

/// Phase of a two-phase credentials rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CredentialsRotationPhase {
    Preparing,
    Prepared,
    Completing,
    Completed,
}

impl std::fmt::Display for CredentialsRotationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialsRotationPhase::Preparing => write!(f, "Preparing"),
            CredentialsRotationPhase::Prepared => write!(f, "Prepared"),
            CredentialsRotationPhase::Completing => write!(f, "Completing"),
            CredentialsRotationPhase::Completed => write!(f, "Completed"),
        }
    }
}

/// Status of a rotation that introduces new credentials before revoking old ones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TwoPhaseRotation {
    /// Current phase of the rotation
    pub phase: CredentialsRotationPhase,

    /// Most recent time when the rotation was successfully completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub last_completion_time: Option<DateTime<Utc>>,

    /// Most recent time when the rotation was initiated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub last_initiation_time: Option<DateTime<Utc>>,

    /// Time when the preparation phase finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub last_initiation_finished_time: Option<DateTime<Utc>>,

    /// Time when the completion phase was triggered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub last_completion_triggered_time: Option<DateTime<Utc>>,
}

/// Status of a rotation that replaces credentials in one step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SinglePhaseRotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub last_initiation_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub last_completion_time: Option<DateTime<Utc>>,
}

/// Information about the different credential rotations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsRotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_authorities: Option<TwoPhaseRotation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_key: Option<TwoPhaseRotation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etcd_encryption_key: Option<TwoPhaseRotation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<SinglePhaseRotation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_keypair: Option<SinglePhaseRotation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observability: Option<SinglePhaseRotation>,
}

// =============================================================================
// Label Selectors
// =============================================================================

/// Evaluate a Kubernetes label selector against a label set.
///
/// An empty selector matches everything.
pub fn label_selector_matches(selector: &LabelSelector, labels: &BTreeMap<String, String>) -> bool {
    let labels_match = selector
        .match_labels
        .as_ref()
        .map(|required| required.iter().all(|(k, v)| labels.get(k) == Some(v)))
        .unwrap_or(true);
    if !labels_match {
        return false;
    }

    selector
        .match_expressions
        .as_ref()
        .map(|exprs| {
            exprs.iter().all(|expr| {
                let values = expr.values.as_deref().unwrap_or_default();
                let actual = labels.get(&expr.key);
                match expr.operator.as_str() {
                    "In" => actual.is_some_and(|v| values.contains(v)),
                    "NotIn" => actual.map_or(true, |v| !values.contains(v)),
                    "Exists" => actual.is_some(),
                    "DoesNotExist" => actual.is_none(),
                    _ => false,
                }
            })
        })
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_toleration_without_value_tolerates_any_value() {
        let taint = Taint {
            key: "seed.gardener.cloud/protected".into(),
            value: Some("x".into()),
        };
        let toleration = Toleration {
            key: "seed.gardener.cloud/protected".into(),
            value: None,
        };
        assert!(toleration.tolerates(&taint));
        assert!(tolerates_all(&[taint.clone()], &[toleration]));
        assert!(!tolerates_all(&[taint], &[]));
        assert!(tolerates_all(&[], &[]));
    }

    #[test]
    fn test_label_selector_expressions() {
        let selector = LabelSelector {
            match_labels: Some(labels(&[("env", "prod")])),
            match_expressions: Some(vec![
                LabelSelectorRequirement {
                    key: "tier".into(),
                    operator: "In".into(),
                    values: Some(vec!["a".into(), "b".into()]),
                },
                LabelSelectorRequirement {
                    key: "legacy".into(),
                    operator: "DoesNotExist".into(),
                    values: None,
                },
            ]),
        };

        assert!(label_selector_matches(
            &selector,
            &labels(&[("env", "prod"), ("tier", "a")])
        ));
        assert!(!label_selector_matches(
            &selector,
            &labels(&[("env", "prod"), ("tier", "c")])
        ));
        assert!(!label_selector_matches(
            &selector,
            &labels(&[("env", "prod"), ("tier", "a"), ("legacy", "true")])
        ));
        assert!(label_selector_matches(&LabelSelector::default(), &BTreeMap::new()));
    }

    #[test]
    fn test_error_code_wire_format() {
        let json = serde_json::to_string(&ErrorCode::InfraQuotaExceeded).unwrap();
        assert_eq!(json, "\"ERR_INFRA_QUOTA_EXCEEDED\"");
        assert!(ErrorCode::InfraUnauthorized.is_user_error());
        assert!(!ErrorCode::RetryableInfraDependencies.is_user_error());
    }
}
