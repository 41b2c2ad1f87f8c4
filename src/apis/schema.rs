//! CRDs for resources that carry their fields at the top level
//!
//! `SecretBinding`, `CredentialsBinding` and the `core.gardener.cloud/v1`
//! `ControllerDeployment` have no `spec`. The `CustomResource` derive cannot
//! express them, so they implement `kube::Resource` through
//! [`top_level_resource!`] and build their CRD from the schema of their body
//! type.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::core::schema::StructuralSchemaRewriter;
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde_json::json;

use crate::error::Result;

/// Static identity of a top-level-fields resource
#[derive(Debug, Clone, Copy)]
pub struct ResourceInfo {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub plural: &'static str,
    pub short_names: &'static [&'static str],
    pub namespaced: bool,
}

impl ResourceInfo {
    /// `group/version`
    pub fn api_version(&self) -> String {
        format!("{}/{}", self.group, self.version)
    }
}

/// Implement `kube::Resource` for a struct with `metadata`, `api_version` and
/// `kind` fields whose identity is described by a [`ResourceInfo`] constant.
macro_rules! top_level_resource {
    ($ty:ty, $info:expr, $scope:ty) => {
        impl kube::Resource for $ty {
            type DynamicType = ();
            type Scope = $scope;

            fn kind(_: &()) -> std::borrow::Cow<'_, str> {
                $info.kind.into()
            }

            fn group(_: &()) -> std::borrow::Cow<'_, str> {
                $info.group.into()
            }

            fn version(_: &()) -> std::borrow::Cow<'_, str> {
                $info.version.into()
            }

            fn plural(_: &()) -> std::borrow::Cow<'_, str> {
                $info.plural.into()
            }

            fn meta(&self) -> &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                &self.metadata
            }

            fn meta_mut(
                &mut self,
            ) -> &mut k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                &mut self.metadata
            }
        }
    };
}

pub(crate) use top_level_resource;

/// Build the CRD of a top-level-fields resource from the schema of its body.
///
/// The body's properties are merged with `apiVersion`, `kind` and `metadata`
/// at the root of the structural schema.
pub fn top_level_crd<T: JsonSchema>(info: &ResourceInfo) -> Result<CustomResourceDefinition> {
    let generator = SchemaSettings::openapi3()
        .with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        })
        .with_visitor(StructuralSchemaRewriter)
        .into_generator();
    let root = generator.into_root_schema_for::<T>();

    let mut schema = serde_json::to_value(&root.schema)?;
    if let Some(object) = schema.as_object_mut() {
        object.remove("title");
        let properties = object
            .entry("properties")
            .or_insert_with(|| json!({}));
        if let Some(properties) = properties.as_object_mut() {
            properties.insert("apiVersion".into(), json!({"type": "string"}));
            properties.insert("kind".into(), json!({"type": "string"}));
            properties.insert("metadata".into(), json!({"type": "object"}));
        }
    }

    let crd = json!({
        "apiVersion": "apiextensions.k8s.io/v1",
        "kind": "CustomResourceDefinition",
        "metadata": {
            "name": format!("{}.{}", info.plural, info.group),
        },
        "spec": {
            "group": info.group,
            "names": {
                "kind": info.kind,
                "listKind": format!("{}List", info.kind),
                "plural": info.plural,
                "singular": info.kind.to_ascii_lowercase(),
                "shortNames": info.short_names,
            },
            "scope": if info.namespaced { "Namespaced" } else { "Cluster" },
            "versions": [{
                "name": info.version,
                "served": true,
                "storage": true,
                "schema": { "openAPIV3Schema": schema },
                "subresources": {},
            }],
        },
    });

    Ok(serde_json::from_value(crd)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, JsonSchema)]
    #[serde(rename_all = "camelCase")]
    struct Body {
        secret_ref: String,
        #[serde(default)]
        quotas: Vec<String>,
    }

    const INFO: ResourceInfo = ResourceInfo {
        group: "example.gardener.cloud",
        version: "v1alpha1",
        kind: "Thing",
        plural: "things",
        short_names: &["th"],
        namespaced: true,
    };

    #[test]
    fn test_top_level_crd_merges_root_properties() {
        let crd = top_level_crd::<Body>(&INFO).unwrap();
        assert_eq!(crd.metadata.name.as_deref(), Some("things.example.gardener.cloud"));
        assert_eq!(crd.spec.scope, "Namespaced");
        assert_eq!(crd.spec.names.short_names, Some(vec!["th".to_string()]));

        let schema = crd.spec.versions[0]
            .schema
            .as_ref()
            .and_then(|s| s.open_api_v3_schema.as_ref())
            .unwrap();
        let props = schema.properties.as_ref().unwrap();
        for key in ["apiVersion", "kind", "metadata", "secretRef", "quotas"] {
            assert!(props.contains_key(key), "missing {key}");
        }
        assert_eq!(INFO.api_version(), "example.gardener.cloud/v1alpha1");
    }
}
