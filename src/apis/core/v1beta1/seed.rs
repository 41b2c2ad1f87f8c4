//! Seed CRD
//!
//! A Seed is a cluster that hosts the control planes of Shoots.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::apis::common::{
    raw_extension_schema, Condition, Gardener, LastOperation, ObjectReference, SecretReference,
    Taint,
};

use super::shoot::IpFamily;

/// Taint key that reserves a seed for shoots in the `garden` namespace
pub const SEED_TAINT_PROTECTED: &str = "seed.gardener.cloud/protected";

/// Taints a seed may carry
pub const KNOWN_SEED_TAINTS: [&str; 1] = [SEED_TAINT_PROTECTED];

// =============================================================================
// Seed CRD
// =============================================================================

/// Seed represents a cluster that hosts the control planes of Shoots.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "core.gardener.cloud",
    version = "v1beta1",
    kind = "Seed",
    plural = "seeds",
    status = "SeedStatus",
    derive = "Default",
    printcolumn = r#"{"name": "Provider", "type": "string", "jsonPath": ".spec.provider.type"}"#,
    printcolumn = r#"{"name": "Region", "type": "string", "jsonPath": ".spec.provider.region"}"#,
    printcolumn = r#"{"name": "Version", "type": "string", "jsonPath": ".status.gardener.version"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SeedSpec {
    /// Backup holds the object store configuration for the backups of shoot etcds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<SeedBackup>,

    /// DNS contains DNS-relevant information about this seed cluster
    #[serde(default)]
    pub dns: SeedDns,

    /// Networks defines the pod, service and worker network of the Seed cluster
    pub networks: SeedNetworks,

    /// Provider defines the provider type and region for this Seed cluster
    pub provider: SeedProvider,

    /// Settings contains certain settings for this seed cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SeedSettings>,

    /// Taints describes taints on the seed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,

    /// Volume contains settings for persistentvolumes created in the seed cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<SeedVolume>,

    /// Ingress configures Seed ingress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress: Option<Ingress>,
}

// =============================================================================
// Sub-Types
// =============================================================================

/// Backup configuration of a Seed
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeedBackup {
    /// Provider of the backup bucket
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub provider_config: Option<serde_json::Value>,

    /// Region of the object store, defaults to the Seed's region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Reference to the credentials used to access the object store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_ref: Option<ObjectReference>,
}

/// DNS settings of a Seed
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeedDns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<SeedDnsProvider>,
}

/// DNS provider used for the Seed's ingress domain
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeedDnsProvider {
    #[serde(rename = "type")]
    pub type_: String,

    pub secret_ref: SecretReference,
}

/// Networks of the Seed
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeedNetworks {
    /// CIDR of the node network. This field is immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<String>,

    /// CIDR of the pod network. This field is immutable.
    pub pods: String,

    /// CIDR of the service network. This field is immutable.
    pub services: String,

    /// Default networks of shoots scheduled on this seed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shoot_defaults: Option<ShootNetworks>,

    /// CIDRs blocked for egress traffic of shoot control planes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block_cidrs: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_families: Vec<IpFamily>,
}

/// Default shoot networks
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShootNetworks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pods: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<String>,
}

/// Provider of the Seed
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeedProvider {
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub provider_config: Option<serde_json::Value>,

    pub region: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
}

/// Settings of a Seed
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeedSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excess_capacity_reservation: Option<ExcessCapacityReservation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling: Option<SeedSchedulingSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer_services: Option<LoadBalancerServices>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_pod_autoscaler: Option<VerticalPodAutoscalerSetting>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_watchdog: Option<DependencyWatchdog>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology_aware_routing: Option<TopologyAwareRouting>,
}

/// Excess capacity reservation for shoot control planes
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExcessCapacityReservation {
    /// Whether excess capacity reservation is enabled, defaults to true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Scheduling settings of a Seed
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeedSchedulingSettings {
    /// Whether the scheduler considers this seed, defaults to true
    pub visible: bool,
}

impl Default for SeedSchedulingSettings {
    fn default() -> Self {
        Self { visible: true }
    }
}

/// Load balancer service settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerServices {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// `Cluster` or `Local`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_traffic_policy: Option<String>,
}

/// Vertical pod autoscaler settings.
///
/// Disabling VPA without deploying a replacement makes reconciliation fail.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerticalPodAutoscalerSetting {
    pub enabled: bool,
}

impl Default for VerticalPodAutoscalerSetting {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Dependency watchdog settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependencyWatchdog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weeder: Option<WatchdogComponent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prober: Option<WatchdogComponent>,
}

/// A dependency watchdog component
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WatchdogComponent {
    pub enabled: bool,
}

/// Topology-aware routing settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopologyAwareRouting {
    pub enabled: bool,
}

/// Volume settings of a Seed
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeedVolume {
    /// Minimum size of persistent volumes, e.g. `20Gi`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<SeedVolumeProvider>,
}

/// Storage class purpose mapping
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeedVolumeProvider {
    pub purpose: String,
    pub name: String,
}

/// Ingress settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ingress {
    /// Ingress domain of the Seed. This field is immutable.
    pub domain: String,

    pub controller: IngressController,
}

/// Ingress controller settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressController {
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub provider_config: Option<serde_json::Value>,
}

// =============================================================================
// Status
// =============================================================================

/// Observed status of a Seed
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeedStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gardener: Option<Gardener>,

    /// Kubernetes version of the seed cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(default)]
    pub observed_generation: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_identity: Option<String>,

    /// Total resources of the seed, e.g. `shoots: 250`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub capacity: BTreeMap<String, String>,

    /// Resources available for scheduling
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub allocatable: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<LastOperation>,
}

/// Condition types reported on Seeds
pub mod condition_types {
    pub const GARDENLET_READY: &str = "GardenletReady";
    pub const BACKUP_BUCKETS_READY: &str = "BackupBucketsReady";
    pub const EXTENSIONS_READY: &str = "ExtensionsReady";
    pub const SEED_SYSTEM_COMPONENTS_HEALTHY: &str = "SeedSystemComponentsHealthy";
}

// =============================================================================
// Helpers
// =============================================================================

impl Seed {
    /// Whether the seed only accepts shoots from the `garden` namespace
    pub fn is_protected(&self) -> bool {
        self.spec.taints.iter().any(|t| t.key == SEED_TAINT_PROTECTED)
    }

    /// Whether the scheduler considers this seed
    pub fn is_visible(&self) -> bool {
        self.spec
            .settings
            .as_ref()
            .and_then(|s| s.scheduling.as_ref())
            .map(|s| s.visible)
            .unwrap_or(true)
    }

    /// Whether VPA is managed by Gardener in this seed
    pub fn is_vpa_enabled(&self) -> bool {
        self.spec
            .settings
            .as_ref()
            .and_then(|s| s.vertical_pod_autoscaler.as_ref())
            .map(|v| v.enabled)
            .unwrap_or(true)
    }
}
