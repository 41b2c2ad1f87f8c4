//! `security.gardener.cloud/v1alpha1`
//!
//! CredentialsBinding binds a Secret or a WorkloadIdentity to the namespace of
//! a project. Like SecretBinding, its fields live at the top level.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::NamespaceResourceScope;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::apis::common::ObjectReference;
use crate::apis::core::v1beta1::BindingProvider;
use crate::apis::schema::{top_level_resource, ResourceInfo};

/// Identity of the CredentialsBinding resource
pub const CREDENTIALS_BINDING: ResourceInfo = ResourceInfo {
    group: "security.gardener.cloud",
    version: "v1alpha1",
    kind: "CredentialsBinding",
    plural: "credentialsbindings",
    short_names: &["cb"],
    namespaced: true,
};

/// Kinds a CredentialsBinding may reference
pub const SUPPORTED_CREDENTIALS_KINDS: [(&str, &str); 2] = [
    ("v1", "Secret"),
    ("security.gardener.cloud/v1alpha1", "WorkloadIdentity"),
];

/// CredentialsBinding represents a binding to credentials in the same or another namespace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsBinding {
    #[serde(default = "credentials_binding_api_version")]
    pub api_version: String,

    #[serde(default = "credentials_binding_kind")]
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(flatten)]
    pub data: CredentialsBindingData,
}

/// Fields of a CredentialsBinding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsBindingData {
    /// Provider of the credentials. This field is immutable.
    pub provider: BindingProvider,

    /// Reference to a Secret or WorkloadIdentity. This field is immutable.
    pub credentials_ref: ObjectReference,

    /// Quotas referenced by this binding
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quotas: Vec<ObjectReference>,
}

top_level_resource!(CredentialsBinding, CREDENTIALS_BINDING, NamespaceResourceScope);

impl CredentialsBinding {
    /// Create a binding in a namespace
    pub fn new(name: &str, namespace: &str, data: CredentialsBindingData) -> Self {
        Self {
            api_version: CREDENTIALS_BINDING.api_version(),
            kind: CREDENTIALS_BINDING.kind.to_string(),
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            data,
        }
    }

    /// Whether the referenced credentials are of a supported kind
    pub fn references_supported_kind(&self) -> bool {
        let r = &self.data.credentials_ref;
        SUPPORTED_CREDENTIALS_KINDS.iter().any(|(api_version, kind)| {
            r.api_version.as_deref() == Some(*api_version) && r.kind.as_deref() == Some(*kind)
        })
    }
}

fn credentials_binding_api_version() -> String {
    CREDENTIALS_BINDING.api_version()
}

fn credentials_binding_kind() -> String {
    CREDENTIALS_BINDING.kind.to_string()
}
