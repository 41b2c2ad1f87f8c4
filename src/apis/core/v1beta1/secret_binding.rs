//! SecretBinding resource
//!
//! Binds a secret holding infrastructure credentials to the namespace of a
//! project, optionally limited by quotas. The fields live at the top level of
//! the object.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::NamespaceResourceScope;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::apis::common::{ObjectReference, SecretReference};
use crate::apis::schema::{top_level_resource, ResourceInfo};

/// Identity of the SecretBinding resource
pub const SECRET_BINDING: ResourceInfo = ResourceInfo {
    group: "core.gardener.cloud",
    version: "v1beta1",
    kind: "SecretBinding",
    plural: "secretbindings",
    short_names: &["sb"],
    namespaced: true,
};

/// SecretBinding represents a binding to a secret in the same or another namespace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretBinding {
    #[serde(default = "secret_binding_api_version")]
    pub api_version: String,

    #[serde(default = "secret_binding_kind")]
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(flatten)]
    pub data: SecretBindingData,
}

/// Fields of a SecretBinding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretBindingData {
    /// Reference to a secret object in the same or another namespace. This field is immutable.
    pub secret_ref: SecretReference,

    /// Quotas referenced by this binding
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quotas: Vec<ObjectReference>,

    /// Provider of the secret. This field is immutable once set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<BindingProvider>,
}

/// Provider of a binding
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BindingProvider {
    /// Provider type, e.g. `aws`
    #[serde(rename = "type")]
    pub type_: String,
}

top_level_resource!(SecretBinding, SECRET_BINDING, NamespaceResourceScope);

impl SecretBinding {
    /// Create a binding in a namespace
    pub fn new(name: &str, namespace: &str, data: SecretBindingData) -> Self {
        Self {
            api_version: SECRET_BINDING.api_version(),
            kind: SECRET_BINDING.kind.to_string(),
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            data,
        }
    }
}

fn secret_binding_api_version() -> String {
    SECRET_BINDING.api_version()
}

fn secret_binding_kind() -> String {
    SECRET_BINDING.kind.to_string()
}
