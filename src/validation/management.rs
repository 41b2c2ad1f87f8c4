//! Validation of seed management, operations, resources and settings objects

use std::collections::BTreeMap;

use crate::apis::common::label_selector_matches;
use crate::apis::operations::v1alpha1::Bastion;
use crate::apis::resources::v1alpha1::ManagedResource;
use crate::apis::seedmanagement::v1alpha1::{
    Gardenlet, GardenletDeployment, ManagedSeed, ManagedSeedSet,
};
use crate::apis::settings::v1alpha1::{
    ClusterOpenIDConnectPreset, OpenIDConnectPreset, OpenIDConnectPresetSpec,
};
use crate::validation::helpers::{
    is_https_url, validate_cidr, validate_immutable, validate_immutable_once_set, validate_required,
    validate_unique,
};
use crate::validation::{ErrorList, FieldError, FieldPath, Validate, ValidationContext};

/// Allowed range of preset weights
pub const PRESET_WEIGHT_RANGE: std::ops::RangeInclusive<i32> = 1..=100;

fn validate_gardenlet_deployment(
    deployment: &GardenletDeployment,
    min_replicas: i32,
    path: &FieldPath,
    errors: &mut ErrorList,
) {
    if let Some(replicas) = deployment.replica_count {
        if replicas < min_replicas {
            errors.push(FieldError::invalid(
                &path.child("replicaCount"),
                replicas,
                &format!("must be greater than or equal to {}", min_replicas),
            ));
        }
    }
    if let Some(limit) = deployment.revision_history_limit {
        if limit < 0 {
            errors.push(FieldError::invalid(
                &path.child("revisionHistoryLimit"),
                limit,
                "must be greater than or equal to 0",
            ));
        }
    }
}

// =============================================================================
// Seed management
// =============================================================================

impl Validate for ManagedSeed {
    fn validate(&self, _ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let spec = FieldPath::new("spec");
        match &self.spec.shoot {
            Some(shoot) => validate_required(&shoot.name, &spec.child("shoot").child("name"), &mut errors),
            None => errors.push(FieldError::required(&spec.child("shoot"), "")),
        }
        if let Some(deployment) = &self.spec.gardenlet.deployment {
            validate_gardenlet_deployment(
                deployment,
                0,
                &spec.child("gardenlet").child("deployment"),
                &mut errors,
            );
        }
        errors
    }

    fn validate_update(&self, old: &Self, ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = self.validate(ctx);
        validate_immutable(&self.spec.shoot, &old.spec.shoot, &FieldPath::new("spec").child("shoot"), &mut errors);
        errors
    }
}

impl Validate for ManagedSeedSet {
    fn validate(&self, _ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let spec = FieldPath::new("spec");

        if let Some(replicas) = self.spec.replicas {
            if replicas < 0 {
                errors.push(FieldError::invalid(&spec.child("replicas"), replicas, "must be greater than or equal to 0"));
            }
        }

        let selector = &self.spec.selector;
        let selector_empty = selector.match_labels.as_ref().map_or(true, BTreeMap::is_empty)
            && selector.match_expressions.as_ref().map_or(true, Vec::is_empty);
        if selector_empty {
            errors.push(FieldError::invalid(&spec.child("selector"), "{}", "empty selector is not valid"));
        } else {
            let no_labels = BTreeMap::new();
            for (field, labels) in [
                ("template", self.spec.template.metadata.labels.as_ref()),
                ("shootTemplate", self.spec.shoot_template.metadata.labels.as_ref()),
            ] {
                if !label_selector_matches(selector, labels.unwrap_or(&no_labels)) {
                    errors.push(FieldError::invalid(
                        &spec.child(field).child("metadata").child("labels"),
                        format!("{:?}", labels.unwrap_or(&no_labels)),
                        "selector does not match template labels",
                    ));
                }
            }
        }

        if let Some(deployment) = &self.spec.template.spec.gardenlet.deployment {
            validate_gardenlet_deployment(
                deployment,
                0,
                &spec.child("template").child("spec").child("gardenlet").child("deployment"),
                &mut errors,
            );
        }
        if let Some(partition) = self
            .spec
            .update_strategy
            .as_ref()
            .and_then(|s| s.rolling_update.as_ref())
            .and_then(|r| r.partition)
        {
            if partition < 0 {
                errors.push(FieldError::invalid(
                    &spec.child("updateStrategy").child("rollingUpdate").child("partition"),
                    partition,
                    "must be greater than or equal to 0",
                ));
            }
        }
        errors
    }

    fn validate_update(&self, old: &Self, ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = self.validate(ctx);
        validate_immutable(
            &self.spec.selector,
            &old.spec.selector,
            &FieldPath::new("spec").child("selector"),
            &mut errors,
        );
        errors
    }
}

impl Validate for Gardenlet {
    fn validate(&self, _ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let deployment = FieldPath::new("spec").child("deployment");
        validate_gardenlet_deployment(&self.spec.deployment.deployment, 1, &deployment, &mut errors);
        if self.spec.deployment.helm.oci_repository.artifact_ref().is_none() {
            errors.push(FieldError::required(
                &deployment.child("helm").child("ociRepository"),
                "ref or repository with tag or digest must be set",
            ));
        }
        errors
    }
}

// =============================================================================
// Operations & resources
// =============================================================================

impl Validate for Bastion {
    fn validate(&self, _ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let spec = FieldPath::new("spec");
        validate_required(&self.spec.shoot_ref.name, &spec.child("shootRef").child("name"), &mut errors);
        validate_required(&self.spec.ssh_public_key, &spec.child("sshPublicKey"), &mut errors);
        let ingress = spec.child("ingress");
        for (i, policy) in self.spec.ingress.iter().enumerate() {
            validate_cidr(&policy.ip_block.cidr, &ingress.index(i).child("ipBlock").child("cidr"), &mut errors);
        }
        errors
    }

    fn validate_update(&self, old: &Self, ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = self.validate(ctx);
        let spec = FieldPath::new("spec");
        validate_immutable(&self.spec.shoot_ref, &old.spec.shoot_ref, &spec.child("shootRef"), &mut errors);
        validate_immutable_once_set(&self.spec.seed_name, &old.spec.seed_name, &spec.child("seedName"), &mut errors);
        validate_immutable_once_set(
            &self.spec.provider_type,
            &old.spec.provider_type,
            &spec.child("providerType"),
            &mut errors,
        );
        errors
    }
}

impl Validate for ManagedResource {
    fn validate(&self, _ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let refs = FieldPath::new("spec").child("secretRefs");
        for (i, secret) in self.spec.secret_refs.iter().enumerate() {
            validate_required(&secret.name, &refs.index(i).child("name"), &mut errors);
        }
        validate_unique(
            self.spec.secret_refs.iter().map(|r| r.name.as_str()),
            |i| refs.index(i).child("name"),
            &mut errors,
        );
        errors
    }
}

// =============================================================================
// Settings
// =============================================================================

fn validate_preset_spec(spec: &OpenIDConnectPresetSpec, path: &FieldPath, errors: &mut ErrorList) {
    let server = path.child("server");
    validate_required(&spec.server.client_id, &server.child("clientID"), errors);
    if spec.server.issuer_url.is_empty() {
        errors.push(FieldError::required(&server.child("issuerURL"), ""));
    } else if !is_https_url(&spec.server.issuer_url) {
        errors.push(FieldError::invalid(
            &server.child("issuerURL"),
            &spec.server.issuer_url,
            "must be an https URL without query or fragment",
        ));
    }
    for (field, value) in [
        ("usernameClaim", &spec.server.username_claim),
        ("groupsClaim", &spec.server.groups_claim),
    ] {
        if value.as_deref().is_some_and(str::is_empty) {
            errors.push(FieldError::invalid(&server.child(field), "", "must not be empty when set"));
        }
    }
    if !PRESET_WEIGHT_RANGE.contains(&spec.weight) {
        errors.push(FieldError::invalid(
            &path.child("weight"),
            spec.weight,
            "must be between 1 and 100",
        ));
    }
}

impl Validate for OpenIDConnectPreset {
    fn validate(&self, _ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        validate_preset_spec(&self.spec, &FieldPath::new("spec"), &mut errors);
        errors
    }
}

impl Validate for ClusterOpenIDConnectPreset {
    fn validate(&self, _ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        validate_preset_spec(&self.spec.preset, &FieldPath::new("spec"), &mut errors);
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::common::LocalObjectReference;
    use crate::apis::operations::v1alpha1::{BastionIngressPolicy, BastionSpec, IpBlock};
    use crate::apis::resources::v1alpha1::ManagedResourceSpec;
    use crate::apis::seedmanagement::v1alpha1::{
        GardenletSpec, ManagedSeedSetSpec, ManagedSeedSpec, ShootReference,
    };
    use crate::apis::settings::v1alpha1::KubeApiServerOpenIdConnect;
    use chrono::{TimeZone, Utc};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;

    fn ctx() -> ValidationContext<'static> {
        ValidationContext::new(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_managed_seed_shoot_required_and_immutable() {
        let empty = ManagedSeed::new("ms", ManagedSeedSpec::default());
        assert!(empty.validate(&ctx()).has_field("spec.shoot"));

        let mut old = empty.clone();
        old.spec.shoot = Some(ShootReference { name: "infra".into() });
        assert!(old.validate(&ctx()).is_empty());

        let mut new = old.clone();
        new.spec.shoot = Some(ShootReference { name: "other".into() });
        assert!(new.validate_update(&old, &ctx()).has_field("spec.shoot"));
    }

    #[test]
    fn test_managed_seed_set_selector() {
        let labels: BTreeMap<String, String> = [("app".to_string(), "seed".to_string())].into();
        let mut set = ManagedSeedSet::new(
            "set",
            ManagedSeedSetSpec {
                replicas: Some(-1),
                selector: LabelSelector {
                    match_labels: Some(labels.clone()),
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        set.spec.template.metadata.labels = Some(labels);

        let errors = set.validate(&ctx());
        assert!(errors.has_field("spec.replicas"));
        assert!(!errors.has_field("spec.template.metadata.labels"));
        assert!(errors.has_field("spec.shootTemplate.metadata.labels"));
    }

    #[test]
    fn test_gardenlet_replicas() {
        let mut gardenlet = Gardenlet::new("local", GardenletSpec::default());
        gardenlet.spec.deployment.deployment.replica_count = Some(0);
        gardenlet.spec.deployment.helm.oci_repository.ref_ =
            Some("europe-docker.pkg.dev/gardener/charts/gardenlet:v1.100.0".into());
        let errors = gardenlet.validate(&ctx());
        assert!(errors.has_field("spec.deployment.replicaCount"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_bastion() {
        let mut bastion = Bastion::new(
            "cli-abc",
            BastionSpec {
                shoot_ref: LocalObjectReference { name: "crazy-botany".into() },
                ssh_public_key: "c3NoLXJzYSAuLi4=".into(),
                ingress: vec![BastionIngressPolicy {
                    ip_block: IpBlock { cidr: "1.2.3.4/32".into() },
                }],
                ..Default::default()
            },
        );
        assert!(bastion.validate(&ctx()).is_empty());

        bastion.spec.ingress[0].ip_block.cidr = "1.2.3.4".into();
        assert!(bastion.validate(&ctx()).has_field("spec.ingress[0].ipBlock.cidr"));
    }

    #[test]
    fn test_managed_resource_secret_refs() {
        let mr = ManagedResource::new(
            "mr",
            ManagedResourceSpec {
                secret_refs: vec![
                    LocalObjectReference { name: "a".into() },
                    LocalObjectReference { name: "a".into() },
                    LocalObjectReference { name: String::new() },
                ],
                ..Default::default()
            },
        );
        let errors = mr.validate(&ctx());
        assert!(errors.has_field("spec.secretRefs[1].name"));
        assert!(errors.has_field("spec.secretRefs[2].name"));
    }

    #[test]
    fn test_oidc_preset() {
        let preset = |issuer: &str, client: &str, weight: i32| {
            OpenIDConnectPreset::new(
                "preset",
                OpenIDConnectPresetSpec {
                    server: KubeApiServerOpenIdConnect {
                        issuer_url: issuer.into(),
                        client_id: client.into(),
                        ..Default::default()
                    },
                    weight,
                    ..Default::default()
                },
            )
        };
        assert!(preset("https://idp.example.com", "gardener", 50).validate(&ctx()).is_empty());

        let errors = preset("http://idp.example.com", "", 0).validate(&ctx());
        assert!(errors.has_field("spec.server.issuerURL"));
        assert!(errors.has_field("spec.server.clientID"));
        assert!(errors.has_field("spec.weight"));
    }
}
