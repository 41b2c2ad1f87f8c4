//! `settings.gardener.cloud/v1alpha1`
//!
//! OpenID Connect presets inject an OIDC configuration into the kube-apiserver
//! of newly created Shoots that match their selectors and do not configure
//! OIDC themselves.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::apis::common::label_selector_matches;
use crate::apis::core::v1beta1::shoot::{OidcConfig, Shoot};

// =============================================================================
// CRDs
// =============================================================================

/// OpenIDConnectPreset applies an OIDC configuration to Shoots in its namespace.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "settings.gardener.cloud",
    version = "v1alpha1",
    kind = "OpenIDConnectPreset",
    plural = "openidconnectpresets",
    shortname = "oidc",
    namespaced,
    derive = "Default",
    printcolumn = r#"{"name": "Issuer", "type": "string", "jsonPath": ".spec.server.issuerURL"}"#,
    printcolumn = r#"{"name": "Weight", "type": "integer", "jsonPath": ".spec.weight"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OpenIDConnectPresetSpec {
    /// kube-apiserver side of the configuration
    pub server: KubeApiServerOpenIdConnect,

    /// Client side of the configuration, rendered into generated kubeconfigs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<OpenIdConnectClientAuthentication>,

    /// Shoots this preset applies to; all Shoots when empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shoot_selector: Option<LabelSelector>,

    /// Weight in the range 1-100 used to choose between matching presets
    pub weight: i32,
}

/// ClusterOpenIDConnectPreset applies an OIDC configuration to Shoots across projects.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "settings.gardener.cloud",
    version = "v1alpha1",
    kind = "ClusterOpenIDConnectPreset",
    plural = "clusteropenidconnectpresets",
    shortname = "coidc",
    derive = "Default",
    printcolumn = r#"{"name": "Issuer", "type": "string", "jsonPath": ".spec.server.issuerURL"}"#,
    printcolumn = r#"{"name": "Weight", "type": "integer", "jsonPath": ".spec.weight"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOpenIDConnectPresetSpec {
    #[serde(flatten)]
    pub preset: OpenIDConnectPresetSpec,

    /// Projects this preset applies to; all projects when empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_selector: Option<LabelSelector>,
}

// =============================================================================
// Sub-Types
// =============================================================================

/// OIDC settings of the kube-apiserver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubeApiServerOpenIdConnect {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<String>,

    #[serde(rename = "clientID")]
    pub client_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups_claim: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups_prefix: Option<String>,

    /// URL of the provider; only `https` is accepted
    #[serde(rename = "issuerURL")]
    pub issuer_url: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub required_claims: BTreeMap<String, String>,

    /// Accepted signing algorithms, defaults to `RS256`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signing_algs: Vec<String>,

    /// Claim used as user name, defaults to `sub`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_claim: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_prefix: Option<String>,
}

/// OIDC client settings for generated kubeconfigs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenIdConnectClientAuthentication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_configs: BTreeMap<String, String>,
}

impl From<&KubeApiServerOpenIdConnect> for OidcConfig {
    fn from(server: &KubeApiServerOpenIdConnect) -> Self {
        OidcConfig {
            ca_bundle: server.ca_bundle.clone(),
            client_id: Some(server.client_id.clone()),
            groups_claim: server.groups_claim.clone(),
            groups_prefix: server.groups_prefix.clone(),
            issuer_url: Some(server.issuer_url.clone()),
            required_claims: server.required_claims.clone(),
            signing_algs: server.signing_algs.clone(),
            username_claim: server.username_claim.clone(),
            username_prefix: server.username_prefix.clone(),
        }
    }
}

// =============================================================================
// Preset Selection
// =============================================================================

/// Pick the preset for a Shoot.
///
/// Shoots that already configure OIDC get nothing. Namespaced presets win over
/// cluster presets. Within a group the highest weight wins; ties go to the
/// lexicographically smallest name.
pub fn select_preset<'a>(
    shoot: &Shoot,
    presets: &'a [OpenIDConnectPreset],
    cluster_presets: &'a [ClusterOpenIDConnectPreset],
    project_labels: &BTreeMap<String, String>,
) -> Option<&'a OpenIDConnectPresetSpec> {
    let has_oidc = shoot
        .spec
        .kubernetes
        .kube_api_server
        .as_ref()
        .is_some_and(|api| api.oidc_config.is_some());
    if has_oidc {
        return None;
    }

    let shoot_labels = shoot.metadata.labels.clone().unwrap_or_default();
    let applies = |spec: &OpenIDConnectPresetSpec| {
        spec.shoot_selector
            .as_ref()
            .map_or(true, |s| label_selector_matches(s, &shoot_labels))
    };

    let namespaced = presets
        .iter()
        .filter(|p| applies(&p.spec))
        .map(|p| (p.metadata.name.as_deref().unwrap_or_default(), &p.spec));
    if let Some(spec) = best(namespaced) {
        return Some(spec);
    }

    let cluster = cluster_presets
        .iter()
        .filter(|p| {
            p.spec
                .project_selector
                .as_ref()
                .map_or(true, |s| label_selector_matches(s, project_labels))
        })
        .filter(|p| applies(&p.spec.preset))
        .map(|p| (p.metadata.name.as_deref().unwrap_or_default(), &p.spec.preset));
    best(cluster)
}

fn best<'a>(
    candidates: impl Iterator<Item = (&'a str, &'a OpenIDConnectPresetSpec)>,
) -> Option<&'a OpenIDConnectPresetSpec> {
    candidates
        .min_by(|(name_a, a), (name_b, b)| b.weight.cmp(&a.weight).then(name_a.cmp(name_b)))
        .map(|(_, spec)| spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::core::v1beta1::shoot::{KubeApiServerConfig, ShootSpec};

    fn preset(name: &str, weight: i32, issuer: &str) -> OpenIDConnectPreset {
        OpenIDConnectPreset::new(
            name,
            OpenIDConnectPresetSpec {
                server: KubeApiServerOpenIdConnect {
                    client_id: "gardener".into(),
                    issuer_url: issuer.into(),
                    ..Default::default()
                },
                weight,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_highest_weight_then_name() {
        let shoot = Shoot::new("s", ShootSpec::default());
        let presets = vec![
            preset("b", 10, "https://b"),
            preset("a", 10, "https://a"),
            preset("c", 5, "https://c"),
        ];
        let chosen = select_preset(&shoot, &presets, &[], &BTreeMap::new()).unwrap();
        assert_eq!(chosen.server.issuer_url, "https://a");
    }

    #[test]
    fn test_namespaced_wins_over_cluster() {
        let shoot = Shoot::new("s", ShootSpec::default());
        let cluster = ClusterOpenIDConnectPreset::new(
            "global",
            ClusterOpenIDConnectPresetSpec {
                preset: preset("global", 100, "https://global").spec,
                project_selector: None,
            },
        );
        let presets = vec![preset("local", 1, "https://local")];

        let chosen = select_preset(&shoot, &presets, std::slice::from_ref(&cluster), &BTreeMap::new());
        assert_eq!(chosen.unwrap().server.issuer_url, "https://local");

        let chosen = select_preset(&shoot, &[], std::slice::from_ref(&cluster), &BTreeMap::new());
        assert_eq!(chosen.unwrap().server.issuer_url, "https://global");
    }

    #[test]
    fn test_shoot_with_oidc_is_left_alone() {
        let mut shoot = Shoot::new("s", ShootSpec::default());
        shoot.spec.kubernetes.kube_api_server = Some(KubeApiServerConfig {
            oidc_config: Some(OidcConfig::default()),
            ..Default::default()
        });
        let presets = vec![preset("a", 10, "https://a")];
        assert!(select_preset(&shoot, &presets, &[], &BTreeMap::new()).is_none());
    }

    #[test]
    fn test_converts_into_shoot_oidc_config() {
        let oidc = OidcConfig::from(&preset("a", 1, "https://issuer").spec.server);
        assert_eq!(oidc.issuer_url.as_deref(), Some("https://issuer"));
        assert_eq!(oidc.client_id.as_deref(), Some("gardener"));
    }
}
