//! CloudProfile CRD
//!
//! A CloudProfile describes what an infrastructure provider offers: Kubernetes
//! versions, machine images, machine and volume types, and regions. Versions
//! carry a classification and an optional expiration date that drive the
//! maintenance behavior of Shoots.

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::apis::common::raw_extension_schema;

// =============================================================================
// CloudProfile CRD
// =============================================================================

/// CloudProfile represents certain properties about a provider environment.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "core.gardener.cloud",
    version = "v1beta1",
    kind = "CloudProfile",
    plural = "cloudprofiles",
    derive = "Default",
    printcolumn = r#"{"name": "Type", "type": "string", "jsonPath": ".spec.type"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileSpec {
    /// PEM-encoded CA bundle used for TLS to the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<String>,

    /// Kubernetes contains constraints regarding allowed values of the Kubernetes version
    pub kubernetes: KubernetesSettings,

    /// Machine images offered by the provider
    #[serde(default)]
    pub machine_images: Vec<MachineImage>,

    /// Machine types offered by the provider
    #[serde(default)]
    pub machine_types: Vec<MachineType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub provider_config: Option<serde_json::Value>,

    /// Regions offered by the provider
    #[serde(default)]
    pub regions: Vec<Region>,

    /// Type is the name of the provider
    #[serde(rename = "type")]
    pub type_: String,

    /// Volume types offered by the provider
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_types: Vec<VolumeType>,
}

// =============================================================================
// Versions
// =============================================================================

/// Kubernetes version constraints
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesSettings {
    /// Versions is the list of allowed Kubernetes versions with optional expiration dates
    #[serde(default)]
    pub versions: Vec<ExpirableVersion>,
}

/// Classification of a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum VersionClassification {
    /// Not yet usable; only appears as a lifecycle stage
    Unavailable,
    /// Recently released, opt-in only
    Preview,
    /// Recommended version
    Supported,
    /// Still usable but will expire
    Deprecated,
    /// Past its expiration date
    Expired,
}

impl std::fmt::Display for VersionClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionClassification::Unavailable => write!(f, "unavailable"),
            VersionClassification::Preview => write!(f, "preview"),
            VersionClassification::Supported => write!(f, "supported"),
            VersionClassification::Deprecated => write!(f, "deprecated"),
            VersionClassification::Expired => write!(f, "expired"),
        }
    }
}

/// A stage in the lifecycle of a version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleStage {
    pub classification: VersionClassification,

    /// Time from which the stage applies; a stage without start time applies immediately
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub start_time: Option<DateTime<Utc>>,
}

/// Version with an optional expiration date
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpirableVersion {
    /// Version is the version identifier
    pub version: String,

    /// Expiration date of the version; shoots using it are force-updated afterwards
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub expiration_date: Option<DateTime<Utc>>,

    /// Classification of the version, defaults to `supported`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<VersionClassification>,

    /// Lifecycle stages of the version; mutually exclusive with `classification`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lifecycle: Vec<LifecycleStage>,
}

impl ExpirableVersion {
    /// A version classified explicitly, without lifecycle
    pub fn classified(version: &str, classification: VersionClassification) -> Self {
        Self {
            version: version.to_string(),
            classification: Some(classification),
            ..Default::default()
        }
    }
}

// =============================================================================
// Machine Images
// =============================================================================

/// Strategy for automatic machine image updates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MachineImageUpdateStrategy {
    Patch,
    Minor,
    #[default]
    Major,
}

/// Machine image offered by the provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineImage {
    pub name: String,

    /// Versions of the image
    #[serde(default)]
    pub versions: Vec<MachineImageVersion>,

    /// Scope of automatic updates for this image, defaults to `major`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_strategy: Option<MachineImageUpdateStrategy>,
}

/// Version of a machine image
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineImageVersion {
    #[serde(flatten)]
    pub expirable: ExpirableVersion,

    /// Container runtimes supported by the image
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cri: Vec<Cri>,

    /// CPU architectures of the image, defaults to `[amd64]`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub architectures: Vec<String>,

    /// Constraint on the kubelet version, e.g. `>= 1.26`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubelet_version_constraint: Option<String>,
}

/// Container runtime interface
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Cri {
    pub name: String,
}

// =============================================================================
// Machine & Volume Types, Regions
// =============================================================================

/// Machine type offered by the provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineType {
    pub name: String,
    pub cpu: String,
    pub gpu: String,
    pub memory: String,

    /// Whether the machine type may be used for new pools, defaults to true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
}

/// Volume type offered by the provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VolumeType {
    pub name: String,
    pub class: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<String>,
}

/// Region offered by the provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<AvailabilityZone>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Availability zone of a region
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityZone {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable_machine_types: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable_volume_types: Vec<String>,
}

// =============================================================================
// Helpers
// =============================================================================

impl CloudProfile {
    /// Kubernetes versions offered by this profile
    pub fn kubernetes_versions(&self) -> &[ExpirableVersion] {
        &self.spec.kubernetes.versions
    }

    /// Look up a machine image by name
    pub fn machine_image(&self, name: &str) -> Option<&MachineImage> {
        self.spec.machine_images.iter().find(|i| i.name == name)
    }

    /// Whether the profile offers the given region
    pub fn has_region(&self, name: &str) -> bool {
        self.spec.regions.iter().any(|r| r.name == name)
    }

    /// Whether the profile offers the given machine type
    pub fn has_machine_type(&self, name: &str) -> bool {
        self.spec.machine_types.iter().any(|m| m.name == name)
    }
}

impl MachineImage {
    /// Versions of the image as plain expirable versions
    pub fn expirable_versions(&self) -> Vec<ExpirableVersion> {
        self.versions.iter().map(|v| v.expirable.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_versions() {
        let yaml = r#"
apiVersion: core.gardener.cloud/v1beta1
kind: CloudProfile
metadata:
  name: aws
spec:
  type: aws
  kubernetes:
    versions:
      - version: 1.31.1
        classification: preview
      - version: 1.30.4
      - version: 1.29.8
        classification: deprecated
        expirationDate: "2026-03-01T23:59:59Z"
  machineImages:
    - name: gardenlinux
      updateStrategy: minor
      versions:
        - version: 1443.3.0
          cri:
            - name: containerd
          architectures: [amd64, arm64]
  machineTypes:
    - name: m5.large
      cpu: "2"
      gpu: "0"
      memory: 8Gi
  regions:
    - name: eu-west-1
      zones:
        - name: eu-west-1a
"#;
        let profile: CloudProfile = serde_yaml::from_str(yaml).unwrap();
        let versions = profile.kubernetes_versions();
        assert_eq!(versions.len(), 3);
        assert_eq!(
            versions[0].classification,
            Some(VersionClassification::Preview)
        );
        assert_eq!(versions[1].classification, None);
        assert!(versions[2].expiration_date.is_some());

        let image = profile.machine_image("gardenlinux").unwrap();
        assert_eq!(
            image.update_strategy,
            Some(MachineImageUpdateStrategy::Minor)
        );
        assert_eq!(image.versions[0].expirable.version, "1443.3.0");
        assert!(profile.has_region("eu-west-1"));
        assert!(profile.has_machine_type("m5.large"));
        assert!(!profile.has_machine_type("m5.xlarge"));
    }
}
