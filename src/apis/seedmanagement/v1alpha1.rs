//! `seedmanagement.gardener.cloud/v1alpha1`
//!
//! ManagedSeed turns an existing Shoot into a Seed by deploying a gardenlet
//! into it. ManagedSeedSet maintains a number of identical shoot/managed-seed
//! pairs created from templates. Gardenlet describes a gardenlet deployed into
//! an unmanaged seed cluster.

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::apis::common::{raw_extension_schema, Condition};
use crate::apis::core::v1::OciRepository;
use crate::apis::core::v1beta1::shoot::ShootSpec;

// =============================================================================
// ManagedSeed CRD
// =============================================================================

/// ManagedSeed represents a Shoot that is registered as Seed.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "seedmanagement.gardener.cloud",
    version = "v1alpha1",
    kind = "ManagedSeed",
    plural = "managedseeds",
    shortname = "ms",
    namespaced,
    status = "ManagedSeedStatus",
    derive = "Default",
    printcolumn = r#"{"name": "Shoot", "type": "string", "jsonPath": ".spec.shoot.name"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ManagedSeedSpec {
    /// Shoot that will be registered as Seed. This field is immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shoot: Option<ShootReference>,

    /// Gardenlet deployed into the shoot
    #[serde(default)]
    pub gardenlet: GardenletConfig,
}

/// Reference to a Shoot in the same namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShootReference {
    pub name: String,
}

/// Gardenlet configuration of a ManagedSeed
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GardenletConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<GardenletDeployment>,

    /// GardenletConfiguration resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub config: Option<serde_json::Value>,

    /// Mechanism used to bootstrap the gardenlet's garden credentials, defaults to `Token`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<Bootstrap>,

    /// Whether the parent gardenlet's deployment and config are merged in, defaults to true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_with_parent: Option<bool>,
}

/// Bootstrap mechanism
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Bootstrap {
    #[default]
    Token,
    ServiceAccount,
    None,
}

/// Deployment parameters of a gardenlet
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GardenletDeployment {
    /// Number of gardenlet replicas, defaults to 2
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_count: Option<i32>,

    /// Number of old replica sets retained, defaults to 2
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_history_limit: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pod_labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pod_annotations: BTreeMap<String, String>,
}

/// Container image of the gardenlet
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// `Always`, `Never` or `IfNotPresent`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_policy: Option<String>,
}

/// Observed status of a ManagedSeed
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedSeedStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(default)]
    pub observed_generation: i64,
}

/// Condition types reported on ManagedSeeds
pub mod condition_types {
    pub const SHOOT_RECONCILED: &str = "ShootReconciled";
    pub const SEED_REGISTERED: &str = "SeedRegistered";
}

// =============================================================================
// ManagedSeedSet CRD
// =============================================================================

/// ManagedSeedSet represents a set of identical ManagedSeeds.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "seedmanagement.gardener.cloud",
    version = "v1alpha1",
    kind = "ManagedSeedSet",
    plural = "managedseedsets",
    shortname = "mss",
    namespaced,
    status = "ManagedSeedSetStatus",
    scale = r#"{"specReplicasPath":".spec.replicas", "statusReplicasPath":".status.replicas"}"#,
    derive = "Default",
    printcolumn = r#"{"name": "Replicas", "type": "integer", "jsonPath": ".spec.replicas"}"#,
    printcolumn = r#"{"name": "Ready", "type": "integer", "jsonPath": ".status.readyReplicas"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ManagedSeedSetSpec {
    /// Desired number of replicas, defaults to 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Label query over ManagedSeeds that should match the replica count.
    /// It must match the template's labels. This field is immutable.
    pub selector: LabelSelector,

    /// Template of the ManagedSeeds created by this set
    pub template: ManagedSeedTemplate,

    /// Template of the Shoots created by this set
    pub shoot_template: ShootTemplate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_strategy: Option<UpdateStrategy>,

    /// Number of old revisions retained, defaults to 10
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_history_limit: Option<i32>,
}

/// Template of a ManagedSeed
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedSeedTemplate {
    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: ManagedSeedSpec,
}

/// Template of a Shoot
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShootTemplate {
    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: ShootSpec,
}

/// Update strategy of a ManagedSeedSet
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStrategy {
    /// Type of the strategy, defaults to `RollingUpdate`
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolling_update: Option<RollingUpdateStrategy>,
}

/// Rolling update parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RollingUpdateStrategy {
    /// Ordinal at which the set is partitioned, defaults to 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<i32>,
}

/// Observed status of a ManagedSeedSet
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedSeedSetStatus {
    #[serde(default)]
    pub observed_generation: i64,

    #[serde(default)]
    pub replicas: i32,

    #[serde(default)]
    pub ready_replicas: i32,

    /// Ordinal of the next replica to be created
    #[serde(default)]
    pub next_replica_number: i32,

    #[serde(default)]
    pub current_replicas: i32,

    #[serde(default)]
    pub updated_replicas: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_revision: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_revision: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collision_count: Option<i32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Replicas that are not yet ready
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_replicas: Vec<PendingReplica>,
}

/// A replica that is not ready
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingReplica {
    pub name: String,

    pub reason: PendingReplicaReason,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub since: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<i32>,
}

/// Why a replica is pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PendingReplicaReason {
    ShootReconciling,
    ShootDeleting,
    ShootReconcileFailed,
    ShootDeleteFailed,
    ManagedSeedPreparing,
    ManagedSeedDeleting,
    SeedNotReady,
    ShootNotHealthy,
}

impl ManagedSeedSet {
    /// Desired number of replicas
    pub fn desired_replicas(&self) -> i32 {
        self.spec.replicas.unwrap_or(1)
    }
}

// =============================================================================
// Gardenlet CRD
// =============================================================================

/// Gardenlet represents a gardenlet deployed into an unmanaged seed cluster.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "seedmanagement.gardener.cloud",
    version = "v1alpha1",
    kind = "Gardenlet",
    plural = "gardenlets",
    namespaced,
    status = "GardenletStatus",
    derive = "Default",
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GardenletSpec {
    /// Deployment parameters of the gardenlet
    #[serde(default)]
    pub deployment: GardenletSelfDeployment,

    /// GardenletConfiguration resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub config: Option<serde_json::Value>,
}

/// Deployment of a self-managed gardenlet
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GardenletSelfDeployment {
    #[serde(flatten)]
    pub deployment: GardenletDeployment,

    /// Helm chart of the gardenlet
    #[serde(default)]
    pub helm: GardenletHelm,
}

/// Helm chart reference of a gardenlet
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GardenletHelm {
    pub oci_repository: OciRepository,
}

/// Observed status of a Gardenlet
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GardenletStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(default)]
    pub observed_generation: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_managed_seed_set_defaults() {
        let set = ManagedSeedSet::new("set", ManagedSeedSetSpec::default());
        assert_eq!(set.desired_replicas(), 1);
    }

    #[test]
    fn test_gardenlet_flattened_deployment() {
        let gardenlet: Gardenlet = serde_json::from_value(serde_json::json!({
            "apiVersion": "seedmanagement.gardener.cloud/v1alpha1",
            "kind": "Gardenlet",
            "metadata": {"name": "local", "namespace": "garden"},
            "spec": {
                "deployment": {
                    "replicaCount": 1,
                    "helm": {"ociRepository": {"ref": "registry.example.com/gardenlet:v1.100.0"}}
                }
            }
        }))
        .unwrap();
        assert_eq!(gardenlet.spec.deployment.deployment.replica_count, Some(1));
        assert!(gardenlet.spec.deployment.helm.oci_repository.ref_.is_some());
    }
}
