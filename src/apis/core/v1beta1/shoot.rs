//! Shoot CRD
//!
//! A Shoot is an end-user managed Kubernetes cluster. The spec holds the
//! desired cluster (provider, networking, workers, maintenance, hibernation)
//! and the status reports what the gardenlet observed.

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::apis::common::{
    raw_extension_schema, Condition, CredentialsRotation, Gardener, LastError, LastOperation,
    MaintenanceTimeWindow, NamedResourceReference, Toleration, ANNOTATION_OPERATION,
    GARDEN_NAMESPACE, PROJECT_NAMESPACE_PREFIX,
};

// =============================================================================
// Shoot CRD
// =============================================================================

/// Shoot represents a Shoot cluster created and managed by Gardener.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "core.gardener.cloud",
    version = "v1beta1",
    kind = "Shoot",
    plural = "shoots",
    namespaced,
    status = "ShootStatus",
    derive = "Default",
    printcolumn = r#"{"name": "Cloud Profile", "type": "string", "jsonPath": ".spec.cloudProfileName"}"#,
    printcolumn = r#"{"name": "Version", "type": "string", "jsonPath": ".spec.kubernetes.version"}"#,
    printcolumn = r#"{"name": "Seed", "type": "string", "jsonPath": ".spec.seedName"}"#,
    printcolumn = r#"{"name": "Hibernated", "type": "boolean", "jsonPath": ".status.isHibernated"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ShootSpec {
    /// Addons contains information about enabled/disabled addons and their configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addons: Option<Addons>,

    /// Name of the CloudProfile. Deprecated in favor of `cloudProfile`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_profile_name: Option<String>,

    /// Reference to a CloudProfile or NamespacedCloudProfile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_profile: Option<CloudProfileReference>,

    /// Information about control plane components
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane: Option<ControlPlane>,

    /// Name of the CredentialsBinding used to access the infrastructure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_binding_name: Option<String>,

    /// DNS contains information about the DNS settings of the Shoot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<Dns>,

    /// Extensions contain type and provider information for Shoot extensions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<Extension>,

    /// Name of the ExposureClass handling the control plane endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure_class_name: Option<String>,

    /// Hibernation contains information whether the Shoot is suspended or not
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hibernation: Option<Hibernation>,

    /// Kubernetes contains the version and configuration settings of the control plane components
    pub kubernetes: Kubernetes,

    /// Networking contains information about cluster networking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networking: Option<Networking>,

    /// Maintenance contains information about the time window for maintenance operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<Maintenance>,

    /// Provider contains all provider-specific and provider-relevant information
    pub provider: Provider,

    /// Purpose is the purpose class for this cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<ShootPurpose>,

    /// Region is a name of a region. This field is immutable.
    pub region: String,

    /// Resources holds a list of named resource references for extensions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<NamedResourceReference>,

    /// Name of the SecretBinding. Deprecated in favor of `credentialsBindingName`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_binding_name: Option<String>,

    /// Name of the Seed that hosts this Shoot's control plane
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_name: Option<String>,

    /// Optional selector restricting the Seeds the Shoot can be scheduled to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_selector: Option<SeedSelector>,

    /// Configuration of system components
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_components: Option<SystemComponents>,

    /// Tolerations of seed taints
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,
}

// =============================================================================
// Sub-Types
// =============================================================================

/// Reference to a cloud profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileReference {
    /// Kind of the referenced profile, `CloudProfile` or `NamespacedCloudProfile`
    #[serde(default = "default_cloud_profile_kind")]
    pub kind: String,

    pub name: String,
}

/// Addons of the Shoot
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Addons {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_dashboard: Option<KubernetesDashboard>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nginx_ingress: Option<NginxIngress>,
}

/// Kubernetes dashboard addon
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesDashboard {
    pub enabled: bool,

    /// Authentication mode for the dashboard, defaults to `token`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication_mode: Option<String>,
}

/// Nginx ingress addon
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NginxIngress {
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub load_balancer_source_ranges: Vec<String>,
}

/// Control plane settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlane {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_availability: Option<HighAvailability>,
}

/// High availability configuration of the control plane
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HighAvailability {
    pub failure_tolerance: FailureTolerance,
}

/// Failure tolerance of a highly available control plane
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FailureTolerance {
    #[serde(rename = "type")]
    pub type_: FailureToleranceType,
}

/// Failure tolerance type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FailureToleranceType {
    Node,
    Zone,
}

/// DNS settings of the Shoot
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dns {
    /// External domain of the Shoot. This field is immutable once set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// DNS providers used for the Shoot
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<DnsProvider>,
}

/// DNS provider of a Shoot
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DnsProvider {
    /// Whether this is the primary provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,

    /// Name of a secret containing the provider credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,

    /// Type of the DNS provider
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
}

/// Extension of a Shoot
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    /// Type of the extension resource
    #[serde(rename = "type")]
    pub type_: String,

    /// Extension-specific configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub provider_config: Option<serde_json::Value>,

    /// Disables a globally enabled extension for this Shoot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

/// Hibernation settings of the Shoot
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Hibernation {
    /// Whether the Shoot needs to be hibernated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Schedules determining the hibernation/wake-up times
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schedules: Vec<HibernationSchedule>,
}

/// Hibernation schedule in cron format
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HibernationSchedule {
    /// Cron spec at which the Shoot will be hibernated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    /// Cron spec at which the Shoot will be woken up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,

    /// Time location of the schedule, defaults to UTC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Kubernetes version and component configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Kubernetes {
    /// Semantic Kubernetes version to use for the Shoot cluster.
    /// Defaults to the highest supported minor and patch version of the profile.
    #[serde(default)]
    pub version: String,

    /// Whether static token kubeconfig secret will be created. Defaults to false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_static_token_kubeconfig: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_api_server: Option<KubeApiServerConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_controller_manager: Option<KubeControllerManagerConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_proxy: Option<KubeProxyConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubelet: Option<KubeletConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_pod_autoscaler: Option<VerticalPodAutoscaler>,
}

/// Configuration of the kube-apiserver
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubeApiServerConfig {
    /// Sets the `--anonymous-auth` flag of the kube-apiserver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_anonymous_authentication: Option<bool>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_gates: BTreeMap<String, bool>,

    /// OpenID Connect settings of the kube-apiserver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oidc_config: Option<OidcConfig>,

    /// Maximum number of mutating and non-mutating requests in flight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<ApiServerRequests>,
}

/// OpenID Connect configuration of the kube-apiserver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OidcConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups_claim: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups_prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "issuerURL")]
    pub issuer_url: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub required_claims: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signing_algs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_claim: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_prefix: Option<String>,
}

/// Request limits of the kube-apiserver
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiServerRequests {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_non_mutating_inflight: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_mutating_inflight: Option<i32>,
}

/// Configuration of the kube-controller-manager
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubeControllerManagerConfig {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_gates: BTreeMap<String, bool>,

    /// Mask size of the node CIDR, defaults to 24
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_cidr_mask_size: Option<i32>,
}

/// Configuration of kube-proxy
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubeProxyConfig {
    /// Proxy mode, `IPTables` or `IPVS`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Whether kube-proxy should be deployed, defaults to true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Configuration of the kubelet
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubeletConfig {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_gates: BTreeMap<String, bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pods: Option<i32>,
}

/// Vertical pod autoscaler settings of the Shoot
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerticalPodAutoscaler {
    pub enabled: bool,
}

/// Networking of the Shoot
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    /// Type identifies the type of the networking plugin. This field is immutable.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub provider_config: Option<serde_json::Value>,

    /// CIDR of the pod network. This field is immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pods: Option<String>,

    /// CIDR of the entire node network. This field is mutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<String>,

    /// CIDR of the service network. This field is immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<String>,

    /// IP families of the cluster, defaults to `[IPv4]`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_families: Vec<IpFamily>,
}

/// IP family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum IpFamily {
    IPv4,
    IPv6,
}

/// Maintenance settings of the Shoot
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Maintenance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_update: Option<MaintenanceAutoUpdate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<MaintenanceTimeWindow>,

    /// Whether spec updates are only rolled out during the time window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confine_spec_updates: Option<bool>,
}

/// Which versions are updated automatically during maintenance
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceAutoUpdate {
    /// Whether the patch Kubernetes version may be automatically updated, defaults to true
    pub kubernetes_version: bool,

    /// Whether the machine image version may be automatically updated, defaults to true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_image_version: Option<bool>,
}

impl Default for MaintenanceAutoUpdate {
    fn default() -> Self {
        Self {
            kubernetes_version: true,
            machine_image_version: Some(true),
        }
    }
}

/// Provider settings of the Shoot
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    /// Type of the provider. This field is immutable.
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub control_plane_config: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub infrastructure_config: Option<serde_json::Value>,

    /// Worker pools of the Shoot
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workers: Vec<Worker>,
}

/// Worker pool of the Shoot
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    /// Name of the worker pool
    pub name: String,

    /// Machine type and image of the pool
    pub machine: Machine,

    /// Minimum number of machines
    pub minimum: i32,

    /// Maximum number of machines
    pub maximum: i32,

    /// Maximum number of machines created above the desired number during an update, defaults to 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_surge: Option<IntOrString>,

    /// Maximum number of machines unavailable during an update, defaults to 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unavailable: Option<IntOrString>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Volume>,

    /// Availability zones of the pool
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub provider_config: Option<serde_json::Value>,
}

/// Machine of a worker pool
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    /// Machine type from the cloud profile
    #[serde(rename = "type")]
    pub type_: String,

    /// Machine image; defaults to the latest supported image of the profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ShootMachineImage>,

    /// CPU architecture, defaults to `amd64`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
}

/// Machine image of a worker pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShootMachineImage {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Root volume of the machines of a pool
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    /// Size of the volume, e.g. `50Gi`
    #[serde(rename = "size")]
    pub volume_size: String,
}

/// Purpose class of the cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ShootPurpose {
    #[default]
    Evaluation,
    Testing,
    Development,
    Production,
    Infrastructure,
}

impl std::fmt::Display for ShootPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShootPurpose::Evaluation => write!(f, "evaluation"),
            ShootPurpose::Testing => write!(f, "testing"),
            ShootPurpose::Development => write!(f, "development"),
            ShootPurpose::Production => write!(f, "production"),
            ShootPurpose::Infrastructure => write!(f, "infrastructure"),
        }
    }
}

/// Seed selection constraints
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeedSelector {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,

    /// Provider types of eligible seeds; `*` allows any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provider_types: Vec<String>,
}

/// System components of the Shoot
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemComponents {
    #[serde(default, rename = "coreDNS", skip_serializing_if = "Option::is_none")]
    pub core_dns: Option<CoreDns>,

    #[serde(default, rename = "nodeLocalDNS", skip_serializing_if = "Option::is_none")]
    pub node_local_dns: Option<NodeLocalDns>,
}

/// CoreDNS settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoreDns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoscaling: Option<CoreDnsAutoscaling>,
}

/// CoreDNS autoscaling settings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoreDnsAutoscaling {
    pub mode: CoreDnsAutoscalingMode,
}

/// CoreDNS autoscaling mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CoreDnsAutoscalingMode {
    #[default]
    Horizontal,
    ClusterProportional,
}

/// Node-local DNS cache settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeLocalDns {
    pub enabled: bool,
}

// =============================================================================
// Status
// =============================================================================

/// Most recently observed status of the Shoot cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShootStatus {
    /// Conditions represent the latest available observations of a Shoot's state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Constraints represent conditions which block operations on the Shoot
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<ShootCredentials>,

    /// Information about the Gardener which last acted on the Shoot
    #[serde(default)]
    pub gardener: Gardener,

    /// Whether the Shoot is currently hibernated
    #[serde(default)]
    pub is_hibernated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_operation: Option<LastOperation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub last_errors: Vec<LastError>,

    /// Information about the last maintenance operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_maintenance: Option<LastMaintenance>,

    /// Most recent generation observed for this Shoot
    #[serde(default)]
    pub observed_generation: i64,

    /// Start time of the current retry cycle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub retry_cycle_start_time: Option<DateTime<Utc>>,

    /// Name of the Seed the Shoot is currently scheduled to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_name: Option<String>,

    /// Namespace of the Shoot's control plane in the Seed
    #[serde(default, rename = "technicalID")]
    pub technical_id: String,

    /// Unique identifier of the Shoot
    #[serde(default)]
    pub uid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_identity: Option<String>,

    /// Resources that are encrypted at rest in etcd
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub encrypted_resources: Vec<String>,
}

/// Credentials status of the Shoot
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShootCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<CredentialsRotation>,
}

/// Information about the last maintenance operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LastMaintenance {
    /// Human-readable summary of what was changed
    pub description: String,

    /// Time when the maintenance was triggered
    #[schemars(with = "String")]
    pub triggered_time: DateTime<Utc>,

    /// Outcome of the maintenance
    pub state: MaintenanceState,

    /// Reason why the maintenance failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Outcome of a maintenance operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum MaintenanceState {
    Processing,
    Succeeded,
    Failed,
}

// =============================================================================
// Helpers
// =============================================================================

/// Condition types reported on Shoots
pub mod condition_types {
    pub const API_SERVER_AVAILABLE: &str = "APIServerAvailable";
    pub const CONTROL_PLANE_HEALTHY: &str = "ControlPlaneHealthy";
    pub const OBSERVABILITY_COMPONENTS_HEALTHY: &str = "ObservabilityComponentsHealthy";
    pub const EVERY_NODE_READY: &str = "EveryNodeReady";
    pub const SYSTEM_COMPONENTS_HEALTHY: &str = "SystemComponentsHealthy";

    /// Conditions that make up the Shoot health
    pub const HEALTH: [&str; 5] = [
        API_SERVER_AVAILABLE,
        CONTROL_PLANE_HEALTHY,
        OBSERVABILITY_COMPONENTS_HEALTHY,
        EVERY_NODE_READY,
        SYSTEM_COMPONENTS_HEALTHY,
    ];
}

impl Shoot {
    /// Name of the project owning this Shoot, derived from its namespace
    pub fn project_name(&self) -> Option<String> {
        let namespace = self.namespace()?;
        if namespace == GARDEN_NAMESPACE {
            return Some(GARDEN_NAMESPACE.to_string());
        }
        namespace
            .strip_prefix(PROJECT_NAMESPACE_PREFIX)
            .map(str::to_string)
    }

    /// Namespace of the Shoot's control plane in its seed, `shoot--<project>--<name>`
    pub fn technical_id(&self) -> Option<String> {
        let project = self.project_name()?;
        Some(format!("shoot--{}--{}", project, self.name_any()))
    }

    /// Whether the Shoot is hibernated according to its status
    pub fn is_hibernated(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.is_hibernated)
    }

    /// Whether hibernation is requested in the spec
    pub fn is_hibernation_enabled(&self) -> bool {
        self.spec
            .hibernation
            .as_ref()
            .and_then(|h| h.enabled)
            .unwrap_or(false)
    }

    /// Whether the Shoot runs without worker pools
    pub fn is_workerless(&self) -> bool {
        self.spec.provider.workers.is_empty()
    }

    /// Name of the cloud profile, preferring the `cloudProfile` reference
    pub fn cloud_profile_name(&self) -> Option<&str> {
        self.spec
            .cloud_profile
            .as_ref()
            .map(|r| r.name.as_str())
            .or(self.spec.cloud_profile_name.as_deref())
    }

    /// Value of the `gardener.cloud/operation` annotation, if any
    pub fn operation_annotation(&self) -> Option<&str> {
        self.annotations().get(ANNOTATION_OPERATION).map(String::as_str)
    }

    /// Effective purpose of the Shoot
    pub fn purpose(&self) -> ShootPurpose {
        self.spec.purpose.unwrap_or_default()
    }

    /// Credentials rotation status, created on demand
    pub fn rotation_mut(&mut self) -> &mut CredentialsRotation {
        self.status
            .get_or_insert_with(ShootStatus::default)
            .credentials
            .get_or_insert_with(ShootCredentials::default)
            .rotation
            .get_or_insert_with(CredentialsRotation::default)
    }
}

fn default_cloud_profile_kind() -> String {
    "CloudProfile".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shoot(namespace: &str, name: &str) -> Shoot {
        let mut shoot = Shoot::new(name, ShootSpec::default());
        shoot.metadata.namespace = Some(namespace.to_string());
        shoot
    }

    #[test]
    fn test_project_name_and_technical_id() {
        let s = shoot("garden-dev", "crazy-botany");
        assert_eq!(s.project_name().as_deref(), Some("dev"));
        assert_eq!(s.technical_id().as_deref(), Some("shoot--dev--crazy-botany"));

        let s = shoot("garden", "infra");
        assert_eq!(s.project_name().as_deref(), Some("garden"));

        let s = shoot("default", "x");
        assert_eq!(s.project_name(), None);
    }

    #[test]
    fn test_deserialize_wire_format() {
        let yaml = r#"
apiVersion: core.gardener.cloud/v1beta1
kind: Shoot
metadata:
  name: crazy-botany
  namespace: garden-dev
spec:
  cloudProfileName: aws
  region: eu-west-1
  secretBindingName: my-provider-account
  kubernetes:
    version: "1.30.2"
  networking:
    type: calico
    nodes: 10.250.0.0/16
  maintenance:
    autoUpdate:
      kubernetesVersion: true
    timeWindow:
      begin: "220000+0100"
      end: "230000+0100"
  provider:
    type: aws
    workers:
      - name: cpu-worker
        minimum: 2
        maximum: 5
        maxSurge: 1
        machine:
          type: m5.large
          image:
            name: gardenlinux
            version: "1443.3.0"
status:
  isHibernated: false
  technicalID: shoot--dev--crazy-botany
  observedGeneration: 3
"#;
        let shoot: Shoot = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(shoot.cloud_profile_name(), Some("aws"));
        assert_eq!(shoot.spec.kubernetes.version, "1.30.2");
        assert_eq!(shoot.spec.provider.workers[0].minimum, 2);
        assert_eq!(
            shoot.spec.provider.workers[0].max_surge,
            Some(IntOrString::Int(1))
        );
        let status = shoot.status.unwrap();
        assert_eq!(status.technical_id, "shoot--dev--crazy-botany");
        assert_eq!(status.observed_generation, 3);
    }

    #[test]
    fn test_cloud_profile_reference_preferred() {
        let mut s = shoot("garden-dev", "a");
        s.spec.cloud_profile_name = Some("old".into());
        s.spec.cloud_profile = Some(CloudProfileReference {
            kind: "CloudProfile".into(),
            name: "new".into(),
        });
        assert_eq!(s.cloud_profile_name(), Some("new"));
    }
}
