//! `operator.gardener.cloud/v1alpha1`
//!
//! The Garden describes the runtime cluster that hosts Gardener's own control
//! plane and the virtual garden cluster served on top of it.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::apis::common::{
    raw_extension_schema, Condition, CredentialsRotation, Gardener, LastOperation,
    MaintenanceTimeWindow, SecretReference,
};
use crate::apis::core::v1beta1::shoot::{FailureToleranceType, IpFamily};

// =============================================================================
// Garden CRD
// =============================================================================

/// Garden describes a list of gardens.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "operator.gardener.cloud",
    version = "v1alpha1",
    kind = "Garden",
    plural = "gardens",
    status = "GardenStatus",
    derive = "Default",
    printcolumn = r#"{"name": "K8S Version", "type": "string", "jsonPath": ".spec.virtualCluster.kubernetes.version"}"#,
    printcolumn = r#"{"name": "Gardener Version", "type": "string", "jsonPath": ".status.gardener.version"}"#,
    printcolumn = r#"{"name": "Last Operation", "type": "string", "jsonPath": ".status.lastOperation.state"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GardenSpec {
    /// DNS contains specifications of DNS providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsManagement>,

    /// Extensions contain type and provider information for Garden extensions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<GardenExtension>,

    /// RuntimeCluster contains configuration for the runtime cluster
    pub runtime_cluster: RuntimeCluster,

    /// VirtualCluster contains configuration for the virtual cluster
    pub virtual_cluster: VirtualCluster,
}

// =============================================================================
// Sub-Types
// =============================================================================

/// DNS providers of the garden
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DnsManagement {
    #[serde(default)]
    pub providers: Vec<GardenDnsProvider>,
}

/// DNS provider of the garden
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GardenDnsProvider {
    /// Name of the provider, referenced by domains
    pub name: String,

    #[serde(rename = "type")]
    pub type_: String,

    pub secret_ref: SecretReference,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub provider_config: Option<serde_json::Value>,
}

/// Extension of the garden
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GardenExtension {
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub provider_config: Option<serde_json::Value>,
}

/// Domain with optional DNS provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DnsDomain {
    pub name: String,

    /// Name of the DNS provider managing records of this domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Runtime cluster configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeCluster {
    /// Ingress configuration of the runtime cluster
    pub ingress: RuntimeIngress,

    /// Networking configuration of the runtime cluster
    pub networking: RuntimeNetworking,

    /// Provider information of the runtime cluster
    pub provider: RuntimeProvider,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<RuntimeSettings>,
}

/// Ingress of the runtime cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeIngress {
    /// Ingress domains of the runtime cluster
    #[serde(default)]
    pub domains: Vec<DnsDomain>,

    pub controller: IngressControllerRef,
}

/// Ingress controller of the runtime cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressControllerRef {
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub provider_config: Option<serde_json::Value>,
}

/// Networking of the runtime cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeNetworking {
    /// CIDRs of the node network. This field is immutable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<String>,

    /// CIDRs of the pod network. This field is immutable.
    #[serde(default)]
    pub pods: Vec<String>,

    /// CIDRs of the service network. This field is immutable.
    #[serde(default)]
    pub services: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block_cidrs: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_families: Vec<IpFamily>,
}

/// Provider information of the runtime cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeProvider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
}

/// Settings of the runtime cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_pod_autoscaler: Option<RuntimeVerticalPodAutoscaler>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology_aware_routing: Option<RuntimeTopologyAwareRouting>,
}

/// VPA settings of the runtime cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVerticalPodAutoscaler {
    /// Whether Gardener deploys VPA into the runtime cluster, defaults to true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Topology-aware routing in the runtime cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeTopologyAwareRouting {
    pub enabled: bool,
}

/// Virtual cluster configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirtualCluster {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane: Option<VirtualControlPlane>,

    /// DNS of the virtual cluster
    pub dns: VirtualDns,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gardener: Option<GardenerConfig>,

    /// Kubernetes version and component configuration of the virtual cluster
    pub kubernetes: VirtualKubernetes,

    /// Maintenance time window of the virtual cluster
    pub maintenance: VirtualMaintenance,

    /// Networking of the virtual cluster
    pub networking: VirtualNetworking,
}

/// Control plane of the virtual cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirtualControlPlane {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_availability: Option<VirtualHighAvailability>,
}

/// High availability of the virtual control plane
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirtualHighAvailability {
    /// Failure tolerance, defaults to `zone` when the runtime cluster has multiple zones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_tolerance: Option<FailureToleranceType>,
}

/// DNS of the virtual cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirtualDns {
    /// Domains of the virtual garden; new domains may only be appended
    #[serde(default)]
    pub domains: Vec<DnsDomain>,
}

/// Configuration of Gardener components in the virtual cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GardenerConfig {
    /// Identity of the garden cluster. This field is immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_identity: Option<String>,

    #[serde(default, rename = "gardenerAPIServer", skip_serializing_if = "Option::is_none")]
    pub api_server: Option<ComponentFeatureGates>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gardener_controller_manager: Option<ComponentFeatureGates>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gardener_scheduler: Option<ComponentFeatureGates>,
}

/// Feature gate configuration of a component
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentFeatureGates {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_gates: BTreeMap<String, bool>,
}

/// Kubernetes settings of the virtual cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirtualKubernetes {
    /// Semantic Kubernetes version of the virtual cluster
    pub version: String,

    #[serde(default, rename = "kubeAPIServer", skip_serializing_if = "Option::is_none")]
    pub kube_api_server: Option<ComponentFeatureGates>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_controller_manager: Option<ComponentFeatureGates>,
}

/// Maintenance of the virtual cluster
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMaintenance {
    pub time_window: MaintenanceTimeWindow,
}

impl Default for VirtualMaintenance {
    fn default() -> Self {
        Self {
            time_window: MaintenanceTimeWindow {
                begin: "220000+0000".to_string(),
                end: "230000+0000".to_string(),
            },
        }
    }
}

/// Networking of the virtual cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworking {
    /// CIDRs of the service network. This field is immutable.
    #[serde(default)]
    pub services: Vec<String>,
}

// =============================================================================
// Status
// =============================================================================

/// Observed status of a Garden
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GardenStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<GardenCredentials>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gardener: Option<Gardener>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<LastOperation>,

    #[serde(default)]
    pub observed_generation: i64,

    /// Resources that are encrypted at rest in the virtual cluster's etcd
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub encrypted_resources: Vec<String>,
}

/// Credentials status of a Garden
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GardenCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<CredentialsRotation>,
}

/// Condition types reported on Gardens
pub mod condition_types {
    pub const RUNTIME_COMPONENTS_HEALTHY: &str = "RuntimeComponentsHealthy";
    pub const VIRTUAL_COMPONENTS_HEALTHY: &str = "VirtualComponentsHealthy";
    pub const VIRTUAL_GARDEN_API_SERVER_AVAILABLE: &str = "VirtualGardenAPIServerAvailable";
    pub const OBSERVABILITY_COMPONENTS_HEALTHY: &str = "ObservabilityComponentsHealthy";
}

impl Garden {
    /// Primary domain of the virtual cluster
    pub fn primary_domain(&self) -> Option<&str> {
        self.spec
            .virtual_cluster
            .dns
            .domains
            .first()
            .map(|d| d.name.as_str())
    }

    /// Credentials rotation status, created on demand
    pub fn rotation_mut(&mut self) -> &mut CredentialsRotation {
        self.status
            .get_or_insert_with(GardenStatus::default)
            .credentials
            .get_or_insert_with(GardenCredentials::default)
            .rotation
            .get_or_insert_with(CredentialsRotation::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_garden() {
        let garden: Garden = serde_yaml::from_str(
            r#"
apiVersion: operator.gardener.cloud/v1alpha1
kind: Garden
metadata:
  name: garden
spec:
  runtimeCluster:
    ingress:
      domains:
        - name: ingress.runtime.example.com
      controller:
        kind: nginx
    networking:
      pods: [10.1.0.0/16]
      services: [10.2.0.0/16]
    provider:
      zones: [a, b, c]
  virtualCluster:
    dns:
      domains:
        - name: virtual-garden.example.com
    kubernetes:
      version: 1.30.1
    maintenance:
      timeWindow:
        begin: 220000+0100
        end: 230000+0100
    networking:
      services: [100.64.0.0/13]
"#,
        )
        .unwrap();
        assert_eq!(garden.primary_domain(), Some("virtual-garden.example.com"));
        assert_eq!(garden.spec.runtime_cluster.provider.zones.len(), 3);
        assert_eq!(garden.spec.virtual_cluster.kubernetes.version, "1.30.1");
    }
}
