//! Typed Gardener API objects
//!
//! One module per API group, one submodule per version. [`ApiKind`] is the
//! registry of every kind this crate knows, and [`all_crds`] renders their
//! CustomResourceDefinitions.
//!
//! # Groups
//!
//! - [`core`]: Shoot, Seed, CloudProfile, Project, Quota, SecretBinding and
//!   the extension controller objects
//! - [`operator`]: Garden
//! - [`seedmanagement`]: ManagedSeed, ManagedSeedSet, Gardenlet
//! - [`operations`]: Bastion
//! - [`resources`]: ManagedResource
//! - [`security`]: CredentialsBinding
//! - [`settings`]: OpenID Connect presets

pub mod common;
pub mod core;
pub mod operations;
pub mod operator;
pub mod resources;
pub mod schema;
pub mod security;
pub mod seedmanagement;
pub mod settings;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{CustomResourceExt, Resource};

use crate::error::{Error, Result};

/// Every kind served by the Gardener API groups of this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApiKind {
    Shoot,
    Seed,
    CloudProfile,
    ControllerRegistration,
    ControllerInstallation,
    ControllerDeployment,
    Project,
    Quota,
    SecretBinding,
    Garden,
    ManagedSeed,
    ManagedSeedSet,
    Gardenlet,
    Bastion,
    ManagedResource,
    CredentialsBinding,
    OpenIDConnectPreset,
    ClusterOpenIDConnectPreset,
}

impl ApiKind {
    pub const ALL: [ApiKind; 18] = [
        ApiKind::Shoot,
        ApiKind::Seed,
        ApiKind::CloudProfile,
        ApiKind::ControllerRegistration,
        ApiKind::ControllerInstallation,
        ApiKind::ControllerDeployment,
        ApiKind::Project,
        ApiKind::Quota,
        ApiKind::SecretBinding,
        ApiKind::Garden,
        ApiKind::ManagedSeed,
        ApiKind::ManagedSeedSet,
        ApiKind::Gardenlet,
        ApiKind::Bastion,
        ApiKind::ManagedResource,
        ApiKind::CredentialsBinding,
        ApiKind::OpenIDConnectPreset,
        ApiKind::ClusterOpenIDConnectPreset,
    ];

    /// Resolve a group and kind to a supported kind
    pub fn from_group_kind(group: &str, kind: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.group() == group && k.kind() == kind)
            .ok_or_else(|| Error::UnsupportedKind {
                group: group.to_string(),
                kind: kind.to_string(),
            })
    }

    /// Resolve an `apiVersion` and kind, as found on serialized objects
    pub fn from_api_version(api_version: &str, kind: &str) -> Result<Self> {
        let (group, version) = api_version.split_once('/').unwrap_or(("", api_version));
        let found = Self::from_group_kind(group, kind)?;
        if found.version() != version {
            return Err(Error::UnsupportedKind {
                group: api_version.to_string(),
                kind: kind.to_string(),
            });
        }
        Ok(found)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiKind::Shoot => "Shoot",
            ApiKind::Seed => "Seed",
            ApiKind::CloudProfile => "CloudProfile",
            ApiKind::ControllerRegistration => "ControllerRegistration",
            ApiKind::ControllerInstallation => "ControllerInstallation",
            ApiKind::ControllerDeployment => "ControllerDeployment",
            ApiKind::Project => "Project",
            ApiKind::Quota => "Quota",
            ApiKind::SecretBinding => "SecretBinding",
            ApiKind::Garden => "Garden",
            ApiKind::ManagedSeed => "ManagedSeed",
            ApiKind::ManagedSeedSet => "ManagedSeedSet",
            ApiKind::Gardenlet => "Gardenlet",
            ApiKind::Bastion => "Bastion",
            ApiKind::ManagedResource => "ManagedResource",
            ApiKind::CredentialsBinding => "CredentialsBinding",
            ApiKind::OpenIDConnectPreset => "OpenIDConnectPreset",
            ApiKind::ClusterOpenIDConnectPreset => "ClusterOpenIDConnectPreset",
        }
    }

    pub fn group(&self) -> &'static str {
        match self {
            ApiKind::Shoot
            | ApiKind::Seed
            | ApiKind::CloudProfile
            | ApiKind::ControllerRegistration
            | ApiKind::ControllerInstallation
            | ApiKind::ControllerDeployment
            | ApiKind::Project
            | ApiKind::Quota
            | ApiKind::SecretBinding => "core.gardener.cloud",
            ApiKind::Garden => "operator.gardener.cloud",
            ApiKind::ManagedSeed | ApiKind::ManagedSeedSet | ApiKind::Gardenlet => {
                "seedmanagement.gardener.cloud"
            }
            ApiKind::Bastion => "operations.gardener.cloud",
            ApiKind::ManagedResource => "resources.gardener.cloud",
            ApiKind::CredentialsBinding => "security.gardener.cloud",
            ApiKind::OpenIDConnectPreset | ApiKind::ClusterOpenIDConnectPreset => {
                "settings.gardener.cloud"
            }
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            ApiKind::ControllerDeployment => "v1",
            ApiKind::Shoot
            | ApiKind::Seed
            | ApiKind::CloudProfile
            | ApiKind::ControllerRegistration
            | ApiKind::ControllerInstallation
            | ApiKind::Project
            | ApiKind::Quota
            | ApiKind::SecretBinding => "v1beta1",
            _ => "v1alpha1",
        }
    }

    pub fn api_version(&self) -> String {
        format!("{}/{}", self.group(), self.version())
    }

    /// Plural resource name
    pub fn plural(&self) -> String {
        use self::core::{v1, v1beta1};
        match self {
            ApiKind::Shoot => v1beta1::Shoot::plural(&()).into_owned(),
            ApiKind::Seed => v1beta1::Seed::plural(&()).into_owned(),
            ApiKind::CloudProfile => v1beta1::CloudProfile::plural(&()).into_owned(),
            ApiKind::ControllerRegistration => {
                v1beta1::ControllerRegistration::plural(&()).into_owned()
            }
            ApiKind::ControllerInstallation => {
                v1beta1::ControllerInstallation::plural(&()).into_owned()
            }
            ApiKind::ControllerDeployment => v1::CONTROLLER_DEPLOYMENT.plural.to_string(),
            ApiKind::Project => v1beta1::Project::plural(&()).into_owned(),
            ApiKind::Quota => v1beta1::Quota::plural(&()).into_owned(),
            ApiKind::SecretBinding => v1beta1::SECRET_BINDING.plural.to_string(),
            ApiKind::Garden => operator::v1alpha1::Garden::plural(&()).into_owned(),
            ApiKind::ManagedSeed => seedmanagement::v1alpha1::ManagedSeed::plural(&()).into_owned(),
            ApiKind::ManagedSeedSet => {
                seedmanagement::v1alpha1::ManagedSeedSet::plural(&()).into_owned()
            }
            ApiKind::Gardenlet => seedmanagement::v1alpha1::Gardenlet::plural(&()).into_owned(),
            ApiKind::Bastion => operations::v1alpha1::Bastion::plural(&()).into_owned(),
            ApiKind::ManagedResource => {
                resources::v1alpha1::ManagedResource::plural(&()).into_owned()
            }
            ApiKind::CredentialsBinding => security::v1alpha1::CREDENTIALS_BINDING.plural.to_string(),
            ApiKind::OpenIDConnectPreset => {
                settings::v1alpha1::OpenIDConnectPreset::plural(&()).into_owned()
            }
            ApiKind::ClusterOpenIDConnectPreset => {
                settings::v1alpha1::ClusterOpenIDConnectPreset::plural(&()).into_owned()
            }
        }
    }

    /// Name of the CRD, `<plural>.<group>`
    pub fn crd_name(&self) -> String {
        format!("{}.{}", self.plural(), self.group())
    }

    /// Whether objects of this kind live in a namespace
    pub fn is_namespaced(&self) -> bool {
        !matches!(
            self,
            ApiKind::Seed
                | ApiKind::CloudProfile
                | ApiKind::ControllerRegistration
                | ApiKind::ControllerInstallation
                | ApiKind::ControllerDeployment
                | ApiKind::Project
                | ApiKind::Garden
                | ApiKind::ClusterOpenIDConnectPreset
        )
    }

    /// Render the CustomResourceDefinition of this kind
    pub fn crd(&self) -> Result<CustomResourceDefinition> {
        use self::core::{v1, v1beta1};
        use schema::top_level_crd;
        Ok(match self {
            ApiKind::Shoot => v1beta1::Shoot::crd(),
            ApiKind::Seed => v1beta1::Seed::crd(),
            ApiKind::CloudProfile => v1beta1::CloudProfile::crd(),
            ApiKind::ControllerRegistration => v1beta1::ControllerRegistration::crd(),
            ApiKind::ControllerInstallation => v1beta1::ControllerInstallation::crd(),
            ApiKind::ControllerDeployment => {
                top_level_crd::<v1::ControllerDeploymentData>(&v1::CONTROLLER_DEPLOYMENT)?
            }
            ApiKind::Project => v1beta1::Project::crd(),
            ApiKind::Quota => v1beta1::Quota::crd(),
            ApiKind::SecretBinding => {
                top_level_crd::<v1beta1::SecretBindingData>(&v1beta1::SECRET_BINDING)?
            }
            ApiKind::Garden => operator::v1alpha1::Garden::crd(),
            ApiKind::ManagedSeed => seedmanagement::v1alpha1::ManagedSeed::crd(),
            ApiKind::ManagedSeedSet => seedmanagement::v1alpha1::ManagedSeedSet::crd(),
            ApiKind::Gardenlet => seedmanagement::v1alpha1::Gardenlet::crd(),
            ApiKind::Bastion => operations::v1alpha1::Bastion::crd(),
            ApiKind::ManagedResource => resources::v1alpha1::ManagedResource::crd(),
            ApiKind::CredentialsBinding => top_level_crd::<security::v1alpha1::CredentialsBindingData>(
                &security::v1alpha1::CREDENTIALS_BINDING,
            )?,
            ApiKind::OpenIDConnectPreset => settings::v1alpha1::OpenIDConnectPreset::crd(),
            ApiKind::ClusterOpenIDConnectPreset => {
                settings::v1alpha1::ClusterOpenIDConnectPreset::crd()
            }
        })
    }
}

impl std::fmt::Display for ApiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.kind(), self.group())
    }
}

/// CustomResourceDefinitions of every kind in this crate
pub fn all_crds() -> Result<Vec<CustomResourceDefinition>> {
    ApiKind::ALL.iter().map(ApiKind::crd).collect()
}
