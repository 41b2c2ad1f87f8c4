//! `core.gardener.cloud/v1`
//!
//! ControllerDeployment describes how an extension controller is deployed,
//! either from an inline Helm chart or from an OCI repository.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ClusterResourceScope;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::apis::common::raw_extension_schema;
use crate::apis::schema::{top_level_resource, ResourceInfo};

/// Identity of the ControllerDeployment resource
pub const CONTROLLER_DEPLOYMENT: ResourceInfo = ResourceInfo {
    group: "core.gardener.cloud",
    version: "v1",
    kind: "ControllerDeployment",
    plural: "controllerdeployments",
    short_names: &["ctrldeploy"],
    namespaced: false,
};

/// ControllerDeployment contains information about how this controller is deployed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerDeployment {
    #[serde(default = "controller_deployment_api_version")]
    pub api_version: String,

    #[serde(default = "controller_deployment_kind")]
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(flatten)]
    pub data: ControllerDeploymentData,
}

/// Fields of a ControllerDeployment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ControllerDeploymentData {
    /// Helm deployment configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm: Option<HelmControllerDeployment>,

    /// Whether a kubeconfig for the garden cluster is injected into the deployment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inject_garden_kubeconfig: Option<bool>,
}

/// Helm chart based deployment; exactly one of `rawChart` or `ociRepository` is set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HelmControllerDeployment {
    /// Base64-encoded, gzipped tar archive of the Helm chart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_chart: Option<String>,

    /// Values passed to the chart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "raw_extension_schema")]
    pub values: Option<serde_json::Value>,

    /// OCI repository holding the chart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oci_repository: Option<OciRepository>,
}

/// Location of an OCI artifact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OciRepository {
    /// Full reference, e.g. `registry.example.com/charts/ext:v1.2.3`
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub ref_: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl OciRepository {
    /// Resolved artifact reference, preferring `ref`, then `repository@digest`, then `repository:tag`
    pub fn artifact_ref(&self) -> Option<String> {
        if let Some(r) = &self.ref_ {
            return Some(r.clone());
        }
        let repository = self.repository.as_ref()?;
        match (&self.digest, &self.tag) {
            (Some(digest), _) => Some(format!("{}@{}", repository, digest)),
            (None, Some(tag)) => Some(format!("{}:{}", repository, tag)),
            (None, None) => None,
        }
    }
}

top_level_resource!(ControllerDeployment, CONTROLLER_DEPLOYMENT, ClusterResourceScope);

impl ControllerDeployment {
    /// Create a deployment with the given name
    pub fn new(name: &str, data: ControllerDeploymentData) -> Self {
        Self {
            api_version: CONTROLLER_DEPLOYMENT.api_version(),
            kind: CONTROLLER_DEPLOYMENT.kind.to_string(),
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            data,
        }
    }
}

fn controller_deployment_api_version() -> String {
    CONTROLLER_DEPLOYMENT.api_version()
}

fn controller_deployment_kind() -> String {
    CONTROLLER_DEPLOYMENT.kind.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_ref() {
        let oci = OciRepository {
            repository: Some("europe-docker.pkg.dev/gardener/charts/ext".into()),
            tag: Some("v1.2.3".into()),
            ..Default::default()
        };
        assert_eq!(
            oci.artifact_ref().as_deref(),
            Some("europe-docker.pkg.dev/gardener/charts/ext:v1.2.3")
        );

        let pinned = OciRepository {
            digest: Some("sha256:abc".into()),
            ..oci.clone()
        };
        assert_eq!(
            pinned.artifact_ref().as_deref(),
            Some("europe-docker.pkg.dev/gardener/charts/ext@sha256:abc")
        );

        assert_eq!(OciRepository::default().artifact_ref(), None);
    }

    #[test]
    fn test_helm_values_roundtrip_as_free_form() {
        let deployment: ControllerDeployment = serde_yaml::from_str(
            r#"
apiVersion: core.gardener.cloud/v1
kind: ControllerDeployment
metadata:
  name: provider-aws
helm:
  ociRepository:
    ref: registry.example.com/provider-aws:v1.0.0
  values:
    replicaCount: 2
    image:
      tag: v1.0.0
"#,
        )
        .unwrap();
        let helm = deployment.data.helm.unwrap();
        assert_eq!(helm.values.unwrap()["image"]["tag"], "v1.0.0");
    }
}
