//! Validation of projects, quotas, bindings, cloud profiles and extension
//! controller objects

use kube::ResourceExt;
use std::collections::BTreeMap;

use crate::apis::core::v1::ControllerDeployment;
use crate::apis::core::v1beta1::{
    CloudProfile, ControllerInstallation, ControllerRegistration, Project, Quota, SecretBinding,
    EXTENSION_ROLE_PREFIX, KNOWN_MEMBER_ROLES,
};
use crate::apis::security::v1alpha1::{CredentialsBinding, SUPPORTED_CREDENTIALS_KINDS};
use crate::validation::helpers::{
    parse_quantity, validate_dns_label, validate_immutable, validate_immutable_once_set,
    validate_required, validate_unique,
};
use crate::validation::{ErrorList, FieldError, FieldPath, Validate, ValidationContext};
use crate::versioning::Severity;

/// Upper bound of project names
pub const MAX_PROJECT_NAME_LENGTH: usize = 10;

/// Extension kinds a controller may register for
pub const EXTENSION_KINDS: [&str; 11] = [
    "BackupBucket",
    "BackupEntry",
    "Bastion",
    "ContainerRuntime",
    "ControlPlane",
    "DNSRecord",
    "Extension",
    "Infrastructure",
    "Network",
    "OperatingSystemConfig",
    "Worker",
];

// =============================================================================
// Project & Quota
// =============================================================================

impl Validate for Project {
    fn validate(&self, _ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let name = self.name_any();
        let name_path = FieldPath::new("metadata").child("name");
        validate_dns_label(&name, &name_path, &mut errors);
        if name.len() > MAX_PROJECT_NAME_LENGTH {
            errors.push(FieldError::too_long(&name_path, &name, MAX_PROJECT_NAME_LENGTH));
        }

        let members = FieldPath::new("spec").child("members");
        validate_unique(
            self.spec.members.iter().map(|m| m.subject.name.as_str()),
            |i| members.index(i).child("name"),
            &mut errors,
        );
        for (i, member) in self.spec.members.iter().enumerate() {
            let path = members.index(i);
            validate_required(&member.subject.name, &path.child("name"), &mut errors);
            validate_required(&member.subject.kind, &path.child("kind"), &mut errors);
            for (j, role) in member.all_roles().enumerate() {
                let known = KNOWN_MEMBER_ROLES.contains(&role)
                    || role
                        .strip_prefix(EXTENSION_ROLE_PREFIX)
                        .is_some_and(|r| !r.is_empty());
                if !known {
                    let role_path = if j == 0 {
                        path.child("role")
                    } else {
                        path.child("roles").index(j - 1)
                    };
                    errors.push(FieldError::not_supported(&role_path, role, &KNOWN_MEMBER_ROLES));
                }
            }
        }

        errors
    }

    fn validate_update(&self, old: &Self, ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = self.validate(ctx);
        validate_immutable_once_set(
            &self.spec.namespace,
            &old.spec.namespace,
            &FieldPath::new("spec").child("namespace"),
            &mut errors,
        );
        errors
    }
}

impl Validate for Quota {
    fn validate(&self, _ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let spec = FieldPath::new("spec");
        if let Some(days) = self.spec.cluster_lifetime_days {
            if days < 1 {
                errors.push(FieldError::invalid(
                    &spec.child("clusterLifetimeDays"),
                    days,
                    "must be a positive number of days",
                ));
            }
        }
        let metrics = spec.child("metrics");
        for (key, value) in &self.spec.metrics {
            match parse_quantity(value) {
                Ok(q) if q < 0.0 => {
                    errors.push(FieldError::invalid(&metrics.key(key), value, "must be non-negative"))
                }
                Ok(_) => {}
                Err(e) => errors.push(FieldError::invalid(&metrics.key(key), value, &e)),
            }
        }
        match self.spec.scope.kind.as_deref() {
            Some("Project") | Some("Secret") => {}
            other => errors.push(FieldError::not_supported(
                &spec.child("scope").child("kind"),
                other.unwrap_or_default(),
                &["Project", "Secret"],
            )),
        }
        errors
    }

    fn validate_update(&self, old: &Self, ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = self.validate(ctx);
        validate_immutable(
            &self.spec.scope,
            &old.spec.scope,
            &FieldPath::new("spec").child("scope"),
            &mut errors,
        );
        errors
    }
}

// =============================================================================
// Bindings
// =============================================================================

impl Validate for SecretBinding {
    fn validate(&self, _ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        match &self.data.provider {
            Some(provider) => validate_required(&provider.type_, &FieldPath::new("provider").child("type"), &mut errors),
            None => errors.push(FieldError::required(&FieldPath::new("provider"), "")),
        }
        validate_required(&self.data.secret_ref.name, &FieldPath::new("secretRef").child("name"), &mut errors);
        errors
    }

    fn validate_update(&self, old: &Self, ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = self.validate(ctx);
        validate_immutable(&self.data.secret_ref, &old.data.secret_ref, &FieldPath::new("secretRef"), &mut errors);
        validate_immutable_once_set(&self.data.provider, &old.data.provider, &FieldPath::new("provider"), &mut errors);
        errors
    }
}

impl Validate for CredentialsBinding {
    fn validate(&self, _ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        validate_required(&self.data.provider.type_, &FieldPath::new("provider").child("type"), &mut errors);

        let credentials = FieldPath::new("credentialsRef");
        validate_required(&self.data.credentials_ref.name, &credentials.child("name"), &mut errors);
        if !self.references_supported_kind() {
            let kinds: Vec<&str> = SUPPORTED_CREDENTIALS_KINDS.iter().map(|(_, kind)| *kind).collect();
            errors.push(FieldError::not_supported(
                &credentials.child("kind"),
                self.data.credentials_ref.kind.as_deref().unwrap_or_default(),
                &kinds,
            ));
        }
        errors
    }

    fn validate_update(&self, old: &Self, ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = self.validate(ctx);
        validate_immutable(
            &self.data.credentials_ref,
            &old.data.credentials_ref,
            &FieldPath::new("credentialsRef"),
            &mut errors,
        );
        validate_immutable(&self.data.provider, &old.data.provider, &FieldPath::new("provider"), &mut errors);
        errors
    }
}

// =============================================================================
// CloudProfile
// =============================================================================

impl Validate for CloudProfile {
    fn validate(&self, ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let spec = FieldPath::new("spec");
        validate_required(&self.spec.type_, &spec.child("type"), &mut errors);

        let checker = ctx.policy.clone().unwrap_or_default();
        let versions = spec.child("kubernetes").child("versions");
        if self.spec.kubernetes.versions.is_empty() {
            errors.push(FieldError::required(&versions, "at least one version must be offered"));
        }
        let index_of = |version: &str, list: &[String]| list.iter().position(|v| v == version);

        let offered: Vec<String> = self.spec.kubernetes.versions.iter().map(|v| v.version.clone()).collect();
        for finding in checker.check(&self.spec.kubernetes.versions, ctx.now) {
            if finding.severity == Severity::Error {
                let path = match index_of(&finding.version, &offered) {
                    Some(i) => versions.index(i),
                    None => versions.clone(),
                };
                errors.push(FieldError::invalid(&path, &finding.version, &finding.message));
            }
        }

        let images = spec.child("machineImages");
        validate_unique(
            self.spec.machine_images.iter().map(|i| i.name.as_str()),
            |i| images.index(i).child("name"),
            &mut errors,
        );
        for (i, image) in self.spec.machine_images.iter().enumerate() {
            let image_versions = images.index(i).child("versions");
            if image.versions.is_empty() {
                errors.push(FieldError::required(&image_versions, "at least one version must be offered"));
            }
            let offered: Vec<String> = image.versions.iter().map(|v| v.expirable.version.clone()).collect();
            for finding in checker.check(&image.expirable_versions(), ctx.now) {
                if finding.severity == Severity::Error {
                    let path = match index_of(&finding.version, &offered) {
                        Some(j) => image_versions.index(j),
                        None => image_versions.clone(),
                    };
                    errors.push(FieldError::invalid(&path, &finding.version, &finding.message));
                }
            }
        }

        let machine_types = spec.child("machineTypes");
        validate_unique(
            self.spec.machine_types.iter().map(|m| m.name.as_str()),
            |i| machine_types.index(i).child("name"),
            &mut errors,
        );
        let regions = spec.child("regions");
        if self.spec.regions.is_empty() {
            errors.push(FieldError::required(&regions, "at least one region must be offered"));
        }
        validate_unique(
            self.spec.regions.iter().map(|r| r.name.as_str()),
            |i| regions.index(i).child("name"),
            &mut errors,
        );

        errors
    }
}

// =============================================================================
// Extension controllers
// =============================================================================

impl Validate for ControllerRegistration {
    fn validate(&self, ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let resources = FieldPath::new("spec").child("resources");
        let mut seen: BTreeMap<(&str, &str), usize> = BTreeMap::new();

        for (i, resource) in self.spec.resources.iter().enumerate() {
            let path = resources.index(i);
            if !EXTENSION_KINDS.contains(&resource.kind.as_str()) {
                errors.push(FieldError::not_supported(&path.child("kind"), &resource.kind, &EXTENSION_KINDS));
            }
            validate_required(&resource.type_, &path.child("type"), &mut errors);
            if seen.insert((resource.kind.as_str(), resource.type_.as_str()), i).is_some() {
                errors.push(FieldError::duplicate(
                    &path,
                    format!("{}/{}", resource.kind, resource.type_),
                ));
            }
            if resource.kind != "Extension" {
                if resource.global_enabled.is_some() {
                    errors.push(FieldError::forbidden(
                        &path.child("globallyEnabled"),
                        "only allowed for kind Extension",
                    ));
                }
                if resource.lifecycle.is_some() {
                    errors.push(FieldError::forbidden(&path.child("lifecycle"), "only allowed for kind Extension"));
                }
            }
        }

        errors.append(validate_primary_registrations(self, ctx.registrations));
        errors
    }
}

/// Check that `registration` claims no kind/type another registration is
/// already primary for
pub fn validate_primary_registrations(
    registration: &ControllerRegistration,
    others: &[ControllerRegistration],
) -> ErrorList {
    let mut errors = ErrorList::new();
    let name = registration.name_any();
    let mut primaries: BTreeMap<(&str, &str), String> = BTreeMap::new();
    for other in others.iter().filter(|other| other.name_any() != name) {
        for resource in other.spec.resources.iter().filter(|r| r.is_primary()) {
            primaries.insert((resource.kind.as_str(), resource.type_.as_str()), other.name_any());
        }
    }

    let resources = FieldPath::new("spec").child("resources");
    for (i, resource) in registration.spec.resources.iter().enumerate() {
        if !resource.is_primary() {
            continue;
        }
        if let Some(owner) = primaries.get(&(resource.kind.as_str(), resource.type_.as_str())) {
            errors.push(FieldError::forbidden(
                &resources.index(i).child("primary"),
                &format!("{} is already primary for {}/{}", owner, resource.kind, resource.type_),
            ));
        }
    }
    errors
}

impl Validate for ControllerInstallation {
    fn validate(&self, _ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let spec = FieldPath::new("spec");
        validate_required(
            &self.spec.registration_ref.name,
            &spec.child("registrationRef").child("name"),
            &mut errors,
        );
        match &self.spec.seed_ref {
            Some(seed) => validate_required(&seed.name, &spec.child("seedRef").child("name"), &mut errors),
            None => errors.push(FieldError::required(&spec.child("seedRef"), "")),
        }
        if let Some(deployment) = &self.spec.deployment_ref {
            validate_required(&deployment.name, &spec.child("deploymentRef").child("name"), &mut errors);
        }
        errors
    }

    fn validate_update(&self, old: &Self, ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = self.validate(ctx);
        let spec = FieldPath::new("spec");
        validate_immutable(
            &self.spec.registration_ref.name,
            &old.spec.registration_ref.name,
            &spec.child("registrationRef").child("name"),
            &mut errors,
        );
        validate_immutable(
            &self.spec.seed_ref.as_ref().map(|r| &r.name),
            &old.spec.seed_ref.as_ref().map(|r| &r.name),
            &spec.child("seedRef").child("name"),
            &mut errors,
        );
        errors
    }
}

impl Validate for ControllerDeployment {
    fn validate(&self, _ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let helm_path = FieldPath::new("helm");
        let Some(helm) = &self.data.helm else {
            errors.push(FieldError::required(&helm_path, "a deployment type must be configured"));
            return errors;
        };
        match (&helm.raw_chart, &helm.oci_repository) {
            (Some(_), Some(_)) => errors.push(FieldError::forbidden(
                &helm_path,
                "rawChart and ociRepository are mutually exclusive",
            )),
            (None, None) => errors.push(FieldError::required(
                &helm_path,
                "either rawChart or ociRepository must be set",
            )),
            (Some(chart), None) if chart.is_empty() => {
                errors.push(FieldError::required(&helm_path.child("rawChart"), ""))
            }
            (None, Some(oci)) => {
                let oci_path = helm_path.child("ociRepository");
                if oci.artifact_ref().is_none() {
                    errors.push(FieldError::required(&oci_path, "ref or repository with tag or digest must be set"));
                }
                if oci.ref_.is_some() && (oci.repository.is_some() || oci.tag.is_some() || oci.digest.is_some()) {
                    errors.push(FieldError::forbidden(
                        &oci_path.child("ref"),
                        "ref is mutually exclusive with repository, tag and digest",
                    ));
                }
            }
            (Some(_), None) => {}
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::common::{ObjectReference, SecretReference};
    use crate::apis::core::v1::{ControllerDeploymentData, HelmControllerDeployment, OciRepository};
    use crate::apis::core::v1beta1::{
        BindingProvider, CloudProfileSpec, ControllerRegistrationSpec, ControllerResource,
        ExpirableVersion, KubernetesSettings, ProjectMember, ProjectSpec, QuotaSpec, Region,
        SecretBindingData, Subject, VersionClassification,
    };
    use crate::apis::security::v1alpha1::CredentialsBindingData;
    use chrono::{TimeZone, Utc};

    fn ctx() -> ValidationContext<'static> {
        ValidationContext::new(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
    }

    fn member(name: &str, role: &str) -> ProjectMember {
        ProjectMember {
            subject: Subject {
                kind: "User".into(),
                name: name.into(),
                namespace: None,
                api_group: Some("rbac.authorization.k8s.io".into()),
            },
            role: role.into(),
            roles: vec![],
        }
    }

    #[test]
    fn test_project() {
        let mut project = Project::new("dev", ProjectSpec::default());
        project.spec.members = vec![member("alice", "admin"), member("bob", "extension:dns")];
        assert!(project.validate(&ctx()).is_empty());

        let mut bad = Project::new("development", ProjectSpec::default());
        bad.spec.members = vec![member("alice", "superuser"), member("alice", "viewer")];
        let errors = bad.validate(&ctx());
        assert!(errors.has_field("metadata.name"));
        assert!(errors.has_field("spec.members[0].role"));
        assert!(errors.has_field("spec.members[1].name"));
    }

    #[test]
    fn test_project_namespace_immutable() {
        let mut old = Project::new("dev", ProjectSpec::default());
        old.spec.namespace = Some("garden-dev".into());
        let mut new = old.clone();
        new.spec.namespace = Some("garden-other".into());
        assert!(new.validate_update(&old, &ctx()).has_field("spec.namespace"));
    }

    #[test]
    fn test_quota_metrics() {
        let mut quota = Quota::new(
            "trial",
            QuotaSpec {
                scope: ObjectReference {
                    kind: Some("Project".into()),
                    name: "dev".into(),
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        quota.spec.metrics.insert("cpu".into(), "200".into());
        quota.spec.metrics.insert("memory".into(), "4000Gi".into());
        assert!(quota.validate(&ctx()).is_empty());

        quota.spec.metrics.insert("gpu".into(), "-1".into());
        quota.spec.metrics.insert("loadbalancer".into(), "many".into());
        let errors = quota.validate(&ctx());
        assert!(errors.has_field("spec.metrics[gpu]"));
        assert!(errors.has_field("spec.metrics[loadbalancer]"));
    }

    #[test]
    fn test_bindings() {
        let binding = SecretBinding::new(
            "account",
            "garden-dev",
            SecretBindingData {
                secret_ref: SecretReference {
                    name: "account-secret".into(),
                    namespace: None,
                },
                quotas: vec![],
                provider: None,
            },
        );
        assert!(binding.validate(&ctx()).has_field("provider"));

        let credentials = CredentialsBinding::new(
            "account",
            "garden-dev",
            CredentialsBindingData {
                provider: BindingProvider { type_: "aws".into() },
                credentials_ref: ObjectReference {
                    api_version: Some("v1".into()),
                    kind: Some("ConfigMap".into()),
                    name: "x".into(),
                    ..Default::default()
                },
                quotas: vec![],
            },
        );
        assert!(credentials.validate(&ctx()).has_field("credentialsRef.kind"));

        let mut old = credentials.clone();
        old.data.credentials_ref.kind = Some("Secret".into());
        let mut new = old.clone();
        new.data.credentials_ref.name = "y".into();
        assert!(new.validate_update(&old, &ctx()).has_field("credentialsRef"));
    }

    #[test]
    fn test_cloud_profile_findings_become_field_errors() {
        let profile = CloudProfile::new(
            "aws",
            CloudProfileSpec {
                type_: "aws".into(),
                kubernetes: KubernetesSettings {
                    versions: vec![
                        ExpirableVersion::classified("1.30.1", VersionClassification::Supported),
                        ExpirableVersion::classified("1.30.1", VersionClassification::Supported),
                    ],
                },
                regions: vec![Region {
                    name: "eu-west-1".into(),
                    ..Default::default()
                }],
                ..Default::default()
            },
        );
        let errors = profile.validate(&ctx());
        assert!(errors.iter().any(|e| e.field.starts_with("spec.kubernetes.versions")), "{}", errors);
    }

    #[test]
    fn test_controller_registration() {
        let resource = |kind: &str, type_: &str| ControllerResource {
            kind: kind.into(),
            type_: type_.into(),
            ..Default::default()
        };
        let registration = ControllerRegistration::new(
            "provider-aws",
            ControllerRegistrationSpec {
                resources: vec![
                    resource("Infrastructure", "aws"),
                    resource("Infrastructure", "aws"),
                    resource("Gizmo", "aws"),
                ],
                deployment: None,
            },
        );
        let errors = registration.validate(&ctx());
        assert!(errors.has_field("spec.resources[1]"));
        assert!(errors.has_field("spec.resources[2].kind"));

        let a = ControllerRegistration::new(
            "a",
            ControllerRegistrationSpec {
                resources: vec![resource("Worker", "aws")],
                deployment: None,
            },
        );
        let mut b = a.clone();
        b.metadata.name = Some("b".into());
        let admitted = [a.clone()];
        let errors = b.validate(&ctx().with_registrations(&admitted));
        assert!(errors.has_field("spec.resources[0].primary"), "{}", errors);

        // Re-validating a registration against itself is not a conflict
        assert!(a.validate(&ctx().with_registrations(&admitted)).is_empty());

        let mut c = a.clone();
        c.metadata.name = Some("c".into());
        c.spec.resources[0].primary = Some(false);
        assert!(c.validate(&ctx().with_registrations(&admitted)).is_empty());
        assert!(validate_primary_registrations(&c, &admitted).is_empty());
    }

    #[test]
    fn test_controller_deployment_exactly_one_source() {
        let deployment = |raw: Option<&str>, oci: Option<OciRepository>| {
            ControllerDeployment::new(
                "provider-aws",
                ControllerDeploymentData {
                    helm: Some(HelmControllerDeployment {
                        raw_chart: raw.map(String::from),
                        values: None,
                        oci_repository: oci,
                    }),
                    inject_garden_kubeconfig: None,
                },
            )
        };
        let oci = OciRepository {
            repository: Some("europe-docker.pkg.dev/gardener/charts/provider-aws".into()),
            tag: Some("v1.0.0".into()),
            ..Default::default()
        };

        assert!(deployment(Some("H4sI"), None).validate(&ctx()).is_empty());
        assert!(deployment(None, Some(oci.clone())).validate(&ctx()).is_empty());
        assert!(deployment(Some("H4sI"), Some(oci)).validate(&ctx()).has_field("helm"));
        assert!(deployment(None, None).validate(&ctx()).has_field("helm"));
        assert!(deployment(None, Some(OciRepository::default()))
            .validate(&ctx())
            .has_field("helm.ociRepository"));
    }
}
