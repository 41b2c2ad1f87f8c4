//! `resources.gardener.cloud/v1alpha1`
//!
//! A ManagedResource bundles Kubernetes manifests stored in secrets. The
//! gardener-resource-manager applies them to the target cluster and reports
//! their health; this crate only carries the schema.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::apis::common::{Condition, GroupKind, LocalObjectReference};

/// Annotation that makes the resource manager ignore an object
pub const ANNOTATION_IGNORE: &str = "resources.gardener.cloud/ignore";

/// ManagedResource describes a list of managed resources.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "resources.gardener.cloud",
    version = "v1alpha1",
    kind = "ManagedResource",
    plural = "managedresources",
    shortname = "mr",
    namespaced,
    status = "ManagedResourceStatus",
    derive = "Default",
    printcolumn = r#"{"name": "Class", "type": "string", "jsonPath": ".spec.class"}"#,
    printcolumn = r#"{"name": "Applied", "type": "string", "jsonPath": ".status.conditions[?(@.type==\"ResourcesApplied\")].status"}"#,
    printcolumn = r#"{"name": "Healthy", "type": "string", "jsonPath": ".status.conditions[?(@.type==\"ResourcesHealthy\")].status"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ManagedResourceSpec {
    /// Secret reference of the target cluster's kubeconfig; the source cluster is used when empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref_target: Option<LocalObjectReference>,

    /// Secrets holding the manifests
    pub secret_refs: Vec<LocalObjectReference>,

    /// Class of the resource manager responsible for this object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    /// Labels injected into every object
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inject_labels: BTreeMap<String, String>,

    /// Whether existing labels on objects are overwritten
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_overwrite_labels: Option<bool>,

    /// Whether existing annotations on objects are overwritten
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_overwrite_annotations: Option<bool>,

    /// Whether objects survive the deletion of the ManagedResource, defaults to false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_objects: Option<bool>,

    /// Groups of kinds treated as the same object
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equivalences: Vec<Vec<GroupKind>>,

    /// Whether PVCs of deleted StatefulSets are removed, defaults to false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_persistent_volume_claims: Option<bool>,
}

/// Observed status of a ManagedResource
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedResourceStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(default)]
    pub observed_generation: i64,

    /// Objects currently managed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ObjectReferenceStatus>,

    /// Checksum of the referenced secrets' data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets_data_checksum: Option<String>,
}

/// Reference to a managed object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReferenceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Labels of the object in the target cluster
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Annotations of the object in the target cluster
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Condition types reported on ManagedResources
pub mod condition_types {
    pub const RESOURCES_APPLIED: &str = "ResourcesApplied";
    pub const RESOURCES_HEALTHY: &str = "ResourcesHealthy";
    pub const RESOURCES_PROGRESSING: &str = "ResourcesProgressing";
}

impl ManagedResource {
    /// Whether the resource manager skips this object
    pub fn is_ignored(&self) -> bool {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(ANNOTATION_IGNORE))
            .is_some_and(|v| v == "true")
    }

    /// Whether objects are kept on deletion
    pub fn keeps_objects(&self) -> bool {
        self.spec.keep_objects.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_ignored() {
        let mut mr = ManagedResource::new("mr", ManagedResourceSpec::default());
        assert!(!mr.is_ignored());
        assert!(!mr.keeps_objects());

        mr.metadata.annotations = Some(BTreeMap::from([(
            ANNOTATION_IGNORE.to_string(),
            "true".to_string(),
        )]));
        assert!(mr.is_ignored());
    }
}
