//! Static validation of Gardener API objects
//!
//! Every kind implements [`Validate`]. Checks never stop at the first problem:
//! all findings are collected into an [`ErrorList`] of field errors rendered
//! the way the Kubernetes API server renders them, e.g.
//! `spec.kubernetes.version: Unsupported value: "1.31.0"`.
//!
//! # Modules
//!
//! - [`field`]: field paths and field errors
//! - [`helpers`]: reusable checks (DNS names, CIDRs, cron schedules, immutability)
//! - [`shoot`]: Shoot
//! - [`seed`]: Seed and Garden
//! - [`core`]: Project, Quota, bindings, CloudProfile and controller objects
//! - [`management`]: seed management, Bastion, ManagedResource and presets

pub mod core;
pub mod field;
pub mod helpers;
pub mod management;
pub mod seed;
pub mod shoot;

pub use field::{ErrorList, FieldError, FieldErrorType, FieldPath};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::apis::core::v1beta1::{CloudProfile, ControllerRegistration};
use crate::apis::ApiKind;
use crate::error::Result;
use crate::versioning::PolicyChecker;

/// Inputs a check may need beyond the object itself
#[derive(Debug, Clone)]
pub struct ValidationContext<'a> {
    /// Cloud profile referenced by the object, enables version checks
    pub cloud_profile: Option<&'a CloudProfile>,
    /// Reference time for expiration dates
    pub now: DateTime<Utc>,
    /// Deprecation policy applied to CloudProfiles, the default when unset
    pub policy: Option<PolicyChecker>,
    /// Registrations already admitted, a new one must not claim their primary resources
    pub registrations: &'a [ControllerRegistration],
}

impl<'a> ValidationContext<'a> {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            cloud_profile: None,
            now,
            policy: None,
            registrations: &[],
        }
    }

    pub fn with_cloud_profile(mut self, profile: &'a CloudProfile) -> Self {
        self.cloud_profile = Some(profile);
        self
    }

    pub fn with_policy(mut self, policy: PolicyChecker) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_registrations(mut self, registrations: &'a [ControllerRegistration]) -> Self {
        self.registrations = registrations;
        self
    }
}

/// Static validation of an API object
pub trait Validate {
    /// Checks applied on creation
    fn validate(&self, ctx: &ValidationContext<'_>) -> ErrorList;

    /// Checks applied when `old` is replaced by `self`
    fn validate_update(&self, old: &Self, ctx: &ValidationContext<'_>) -> ErrorList {
        let _ = old;
        self.validate(ctx)
    }
}

fn run<K>(
    object: &serde_json::Value,
    old: Option<&serde_json::Value>,
    ctx: &ValidationContext<'_>,
) -> Result<ErrorList>
where
    K: Validate + DeserializeOwned,
{
    let new: K = serde_json::from_value(object.clone())?;
    Ok(match old {
        Some(old) => {
            let old: K = serde_json::from_value(old.clone())?;
            new.validate_update(&old, ctx)
        }
        None => new.validate(ctx),
    })
}

/// Validate a serialized object of the given kind
///
/// Returns an error only if the object cannot be decoded into its typed
/// representation; validation findings are returned in the list.
pub fn validate_object(
    kind: ApiKind,
    object: &serde_json::Value,
    old: Option<&serde_json::Value>,
    ctx: &ValidationContext<'_>,
) -> Result<ErrorList> {
    use crate::apis::core::{v1, v1beta1};
    use crate::apis::{operations, operator, resources, security, seedmanagement, settings};

    let errors = match kind {
        ApiKind::Shoot => run::<v1beta1::Shoot>(object, old, ctx)?,
        ApiKind::Seed => run::<v1beta1::Seed>(object, old, ctx)?,
        ApiKind::CloudProfile => run::<v1beta1::CloudProfile>(object, old, ctx)?,
        ApiKind::ControllerRegistration => run::<v1beta1::ControllerRegistration>(object, old, ctx)?,
        ApiKind::ControllerInstallation => run::<v1beta1::ControllerInstallation>(object, old, ctx)?,
        ApiKind::ControllerDeployment => run::<v1::ControllerDeployment>(object, old, ctx)?,
        ApiKind::Project => run::<v1beta1::Project>(object, old, ctx)?,
        ApiKind::Quota => run::<v1beta1::Quota>(object, old, ctx)?,
        ApiKind::SecretBinding => run::<v1beta1::SecretBinding>(object, old, ctx)?,
        ApiKind::Garden => run::<operator::v1alpha1::Garden>(object, old, ctx)?,
        ApiKind::ManagedSeed => run::<seedmanagement::v1alpha1::ManagedSeed>(object, old, ctx)?,
        ApiKind::ManagedSeedSet => run::<seedmanagement::v1alpha1::ManagedSeedSet>(object, old, ctx)?,
        ApiKind::Gardenlet => run::<seedmanagement::v1alpha1::Gardenlet>(object, old, ctx)?,
        ApiKind::Bastion => run::<operations::v1alpha1::Bastion>(object, old, ctx)?,
        ApiKind::ManagedResource => run::<resources::v1alpha1::ManagedResource>(object, old, ctx)?,
        ApiKind::CredentialsBinding => run::<security::v1alpha1::CredentialsBinding>(object, old, ctx)?,
        ApiKind::OpenIDConnectPreset => run::<settings::v1alpha1::OpenIDConnectPreset>(object, old, ctx)?,
        ApiKind::ClusterOpenIDConnectPreset => {
            run::<settings::v1alpha1::ClusterOpenIDConnectPreset>(object, old, ctx)?
        }
    };

    debug!(%kind, update = old.is_some(), errors = errors.len(), "Validated object");
    Ok(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use serde_json::json;

    fn ctx() -> ValidationContext<'static> {
        ValidationContext::new(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
    }

    fn project(name: &str, namespace: &str) -> serde_json::Value {
        json!({
            "apiVersion": "core.gardener.cloud/v1beta1",
            "kind": "Project",
            "metadata": {"name": name},
            "spec": {"namespace": namespace}
        })
    }

    #[test]
    fn test_validate_object_create() {
        let errors = validate_object(ApiKind::Project, &project("dev", "garden-dev"), None, &ctx()).unwrap();
        assert!(errors.is_empty(), "{}", errors);

        let errors =
            validate_object(ApiKind::Project, &project("much-too-long", "garden-x"), None, &ctx()).unwrap();
        assert!(errors.has_field("metadata.name"));
    }

    #[test]
    fn test_validate_object_update() {
        let old = project("dev", "garden-dev");
        let new = project("dev", "garden-other");
        let errors = validate_object(ApiKind::Project, &new, Some(&old), &ctx()).unwrap();
        assert!(errors.has_field("spec.namespace"));
    }

    #[test]
    fn test_validate_object_top_level_kind() {
        let binding = json!({
            "apiVersion": "core.gardener.cloud/v1beta1",
            "kind": "SecretBinding",
            "metadata": {"name": "aws", "namespace": "garden-dev"},
            "secretRef": {"name": "aws-credentials"},
            "provider": {"type": "aws"}
        });
        let errors = validate_object(ApiKind::SecretBinding, &binding, None, &ctx()).unwrap();
        assert!(errors.is_empty(), "{}", errors);
    }

    #[test]
    fn test_validate_object_malformed() {
        let malformed = json!({
            "apiVersion": "core.gardener.cloud/v1beta1",
            "kind": "Project",
            "metadata": {"name": "dev"},
            "spec": {"members": "not-a-list"}
        });
        assert_matches!(
            validate_object(ApiKind::Project, &malformed, None, &ctx()),
            Err(Error::JsonParse(_))
        );
    }
}
