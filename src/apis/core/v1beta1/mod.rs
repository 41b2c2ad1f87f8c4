//! `core.gardener.cloud/v1beta1`

pub mod cloud_profile;
pub mod controller;
pub mod project;
pub mod secret_binding;
pub mod seed;
pub mod shoot;

pub use cloud_profile::*;
pub use controller::{
    ControllerDeploymentPolicy, ControllerInstallation, ControllerInstallationSpec,
    ControllerInstallationStatus, ControllerRegistration, ControllerRegistrationDeployment,
    ControllerRegistrationSpec, ControllerResource, ControllerResourceLifecycle,
    ControllerResourceLifecycleStrategy,
};
pub use project::{
    Project, ProjectMember, ProjectPhase, ProjectSpec, ProjectStatus, ProjectTolerations, Quota,
    QuotaSpec, Subject, EXTENSION_ROLE_PREFIX, KNOWN_MEMBER_ROLES,
};
pub use secret_binding::{BindingProvider, SecretBinding, SecretBindingData, SECRET_BINDING};
pub use seed::{
    DependencyWatchdog, ExcessCapacityReservation, Ingress, IngressController, LoadBalancerServices,
    Seed, SeedBackup, SeedDns, SeedDnsProvider, SeedNetworks, SeedProvider, SeedSchedulingSettings,
    SeedSettings, SeedSpec, SeedStatus, SeedVolume, SeedVolumeProvider, ShootNetworks,
    TopologyAwareRouting, VerticalPodAutoscalerSetting, WatchdogComponent, KNOWN_SEED_TAINTS,
    SEED_TAINT_PROTECTED,
};
pub use shoot::*;
