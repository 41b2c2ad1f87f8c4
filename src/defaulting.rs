//! Documented defaults
//!
//! Defaults are applied before validation. Applying them twice changes
//! nothing. Shoot versions given as `major.minor` are completed to the
//! highest supported patch of the referenced CloudProfile.

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::apis::ApiKind;
use crate::apis::core::v1beta1::{
    CloudProfile, CoreDns, CoreDnsAutoscaling, CoreDnsAutoscalingMode, DependencyWatchdog,
    ExcessCapacityReservation, IpFamily, Maintenance, MaintenanceAutoUpdate, Project, Seed,
    SeedSchedulingSettings, SeedSettings, Shoot, ShootMachineImage, ShootPurpose, SystemComponents,
    TopologyAwareRouting, VerticalPodAutoscalerSetting, WatchdogComponent, Worker,
};
use crate::apis::operator::v1alpha1::{Garden, RuntimeSettings, RuntimeVerticalPodAutoscaler};
use crate::apis::resources::v1alpha1::ManagedResource;
use crate::apis::seedmanagement::v1alpha1::{Gardenlet, GardenletDeployment, ManagedSeed};
use crate::error::Result;
use crate::maintenance::TimeWindow;
use crate::versioning::{latest_supported, resolve_partial, Version};

/// Default replicas and revision history of a gardenlet deployment
pub const DEFAULT_GARDENLET_REPLICAS: i32 = 2;
pub const DEFAULT_GARDENLET_REVISION_HISTORY_LIMIT: i32 = 2;

/// Default machine architecture
pub const DEFAULT_ARCHITECTURE: &str = "amd64";

/// Inputs that defaults may depend on
#[derive(Debug, Clone, Copy)]
pub struct DefaultingContext<'a> {
    /// Profile used to complete Kubernetes and machine image versions
    pub cloud_profile: Option<&'a CloudProfile>,
    pub now: DateTime<Utc>,
}

impl<'a> DefaultingContext<'a> {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            cloud_profile: None,
            now,
        }
    }

    pub fn with_cloud_profile(mut self, profile: &'a CloudProfile) -> Self {
        self.cloud_profile = Some(profile);
        self
    }
}

/// Objects with documented defaults
pub trait Defaulter {
    fn apply_defaults(&mut self, ctx: &DefaultingContext<'_>);
}

// =============================================================================
// Shoot
// =============================================================================

impl Defaulter for Shoot {
    fn apply_defaults(&mut self, ctx: &DefaultingContext<'_>) {
        let seed = self.uid().unwrap_or_else(|| self.name_any());
        let spec = &mut self.spec;

        spec.purpose.get_or_insert(ShootPurpose::Evaluation);

        let maintenance = spec.maintenance.get_or_insert_with(Maintenance::default);
        let auto_update = maintenance
            .auto_update
            .get_or_insert_with(MaintenanceAutoUpdate::default);
        auto_update.machine_image_version.get_or_insert(true);
        maintenance
            .time_window
            .get_or_insert_with(|| TimeWindow::default_for(&seed).to_api());

        spec.kubernetes.enable_static_token_kubeconfig.get_or_insert(false);

        if let Some(networking) = spec.networking.as_mut() {
            if networking.ip_families.is_empty() {
                networking.ip_families.push(IpFamily::IPv4);
            }
        }

        let core_dns = spec
            .system_components
            .get_or_insert_with(SystemComponents::default)
            .core_dns
            .get_or_insert_with(CoreDns::default);
        core_dns.autoscaling.get_or_insert(CoreDnsAutoscaling {
            mode: CoreDnsAutoscalingMode::Horizontal,
        });

        for worker in &mut spec.provider.workers {
            default_worker(worker);
        }

        if let Some(profile) = ctx.cloud_profile {
            default_kubernetes_version(&mut spec.kubernetes.version, profile, ctx.now);
            for worker in &mut spec.provider.workers {
                default_machine_image(worker, profile, ctx.now);
            }
        }
    }
}

fn default_worker(worker: &mut Worker) {
    worker.max_surge.get_or_insert(IntOrString::Int(1));
    worker.max_unavailable.get_or_insert(IntOrString::Int(0));
    worker
        .machine
        .architecture
        .get_or_insert_with(|| DEFAULT_ARCHITECTURE.to_string());
}

fn default_kubernetes_version(version: &mut String, profile: &CloudProfile, now: DateTime<Utc>) {
    let versions = profile.kubernetes_versions();
    let resolved = if version.is_empty() {
        latest_supported(versions, now)
    } else {
        match Version::parse(version) {
            Ok(requested) if requested.is_partial() => resolve_partial(versions, &requested, now),
            _ => None,
        }
    };
    if let Some(resolved) = resolved {
        debug!(from = %version, to = %resolved, "Completed Kubernetes version");
        *version = resolved.to_string();
    }
}

fn default_machine_image(worker: &mut Worker, profile: &CloudProfile, now: DateTime<Utc>) {
    let architecture = worker
        .machine
        .architecture
        .clone()
        .unwrap_or_else(|| DEFAULT_ARCHITECTURE.to_string());
    let versions_for = |name: &str| {
        profile.machine_image(name).map(|image| {
            image
                .versions
                .iter()
                .filter(|v| {
                    (v.architectures.is_empty() && architecture == DEFAULT_ARCHITECTURE)
                        || v.architectures.contains(&architecture)
                })
                .map(|v| v.expirable.clone())
                .collect::<Vec<_>>()
        })
    };

    if worker.machine.image.is_none() {
        let first = profile.spec.machine_images.iter().find_map(|image| {
            let versions = versions_for(&image.name)?;
            latest_supported(&versions, now).map(|v| (image.name.clone(), v))
        });
        if let Some((name, version)) = first {
            worker.machine.image = Some(ShootMachineImage {
                name,
                version: Some(version.to_string()),
            });
        }
        return;
    }

    let Some(image) = worker.machine.image.as_mut() else {
        return;
    };
    let Some(versions) = versions_for(&image.name) else {
        return;
    };
    let resolved = match image.version.as_deref() {
        None => latest_supported(&versions, now),
        Some(v) => match Version::parse(v) {
            Ok(requested) if requested.is_partial() => resolve_partial(&versions, &requested, now),
            _ => None,
        },
    };
    if let Some(resolved) = resolved {
        image.version = Some(resolved.to_string());
    }
}

// =============================================================================
// Seed, Project, Garden
// =============================================================================

impl Defaulter for Seed {
    fn apply_defaults(&mut self, _ctx: &DefaultingContext<'_>) {
        let settings = self.spec.settings.get_or_insert_with(SeedSettings::default);
        settings
            .scheduling
            .get_or_insert_with(SeedSchedulingSettings::default);
        settings
            .excess_capacity_reservation
            .get_or_insert_with(ExcessCapacityReservation::default)
            .enabled
            .get_or_insert(true);
        settings
            .vertical_pod_autoscaler
            .get_or_insert_with(VerticalPodAutoscalerSetting::default);
        let watchdog = settings
            .dependency_watchdog
            .get_or_insert_with(DependencyWatchdog::default);
        watchdog.weeder.get_or_insert(WatchdogComponent { enabled: true });
        watchdog.prober.get_or_insert(WatchdogComponent { enabled: true });
        settings
            .topology_aware_routing
            .get_or_insert_with(TopologyAwareRouting::default);
    }
}

impl Defaulter for Project {
    fn apply_defaults(&mut self, _ctx: &DefaultingContext<'_>) {
        if self.spec.namespace.is_none() {
            self.spec.namespace = Some(self.namespace_name());
        }
    }
}

impl Defaulter for Garden {
    fn apply_defaults(&mut self, _ctx: &DefaultingContext<'_>) {
        let seed = self.uid().unwrap_or_else(|| self.name_any());
        self.spec
            .runtime_cluster
            .settings
            .get_or_insert_with(RuntimeSettings::default)
            .vertical_pod_autoscaler
            .get_or_insert_with(RuntimeVerticalPodAutoscaler::default)
            .enabled
            .get_or_insert(true);

        let window = &mut self.spec.virtual_cluster.maintenance.time_window;
        if window.begin.is_empty() && window.end.is_empty() {
            *window = TimeWindow::default_for(&seed).to_api();
        }
    }
}

// =============================================================================
// Seed management, resources
// =============================================================================

fn default_gardenlet_deployment(deployment: &mut GardenletDeployment) {
    deployment.replica_count.get_or_insert(DEFAULT_GARDENLET_REPLICAS);
    deployment
        .revision_history_limit
        .get_or_insert(DEFAULT_GARDENLET_REVISION_HISTORY_LIMIT);
}

impl Defaulter for ManagedSeed {
    fn apply_defaults(&mut self, _ctx: &DefaultingContext<'_>) {
        default_gardenlet_deployment(
            self.spec
                .gardenlet
                .deployment
                .get_or_insert_with(GardenletDeployment::default),
        );
    }
}

impl Defaulter for Gardenlet {
    fn apply_defaults(&mut self, _ctx: &DefaultingContext<'_>) {
        default_gardenlet_deployment(&mut self.spec.deployment.deployment);
    }
}

impl Defaulter for ManagedResource {
    fn apply_defaults(&mut self, _ctx: &DefaultingContext<'_>) {
        self.spec.keep_objects.get_or_insert(false);
        self.spec.delete_persistent_volume_claims.get_or_insert(false);
    }
}

/// Apply defaults to an object of `kind`. Kinds without documented defaults
/// are returned unchanged.
pub fn default_object(
    kind: ApiKind,
    object: serde_json::Value,
    ctx: &DefaultingContext<'_>,
) -> Result<serde_json::Value> {
    fn apply<K: Defaulter + DeserializeOwned + Serialize>(
        object: serde_json::Value,
        ctx: &DefaultingContext<'_>,
    ) -> Result<serde_json::Value> {
        let mut typed: K = serde_json::from_value(object)?;
        typed.apply_defaults(ctx);
        Ok(serde_json::to_value(typed)?)
    }

    match kind {
        ApiKind::Shoot => apply::<Shoot>(object, ctx),
        ApiKind::Seed => apply::<Seed>(object, ctx),
        ApiKind::Project => apply::<Project>(object, ctx),
        ApiKind::Garden => apply::<Garden>(object, ctx),
        ApiKind::ManagedSeed => apply::<ManagedSeed>(object, ctx),
        ApiKind::Gardenlet => apply::<Gardenlet>(object, ctx),
        ApiKind::ManagedResource => apply::<ManagedResource>(object, ctx),
        _ => {
            debug!(%kind, "No defaults for kind");
            Ok(object)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::core::v1beta1::{
        CloudProfileSpec, ExpirableVersion, KubernetesSettings, MachineImage, MachineImageVersion,
        Networking, ProjectSpec, SeedSpec, ShootSpec, VersionClassification,
    };
    use crate::apis::seedmanagement::v1alpha1::ManagedSeedSpec;
    use chrono::TimeZone;

    fn ctx() -> DefaultingContext<'static> {
        DefaultingContext::new(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
    }

    fn profile() -> CloudProfile {
        let image = |v: &str, arch: &[&str]| MachineImageVersion {
            expirable: ExpirableVersion::classified(v, VersionClassification::Supported),
            architectures: arch.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        };
        CloudProfile::new(
            "aws",
            CloudProfileSpec {
                kubernetes: KubernetesSettings {
                    versions: vec![
                        ExpirableVersion::classified("1.30.1", VersionClassification::Supported),
                        ExpirableVersion::classified("1.30.2", VersionClassification::Supported),
                        ExpirableVersion::classified("1.31.0", VersionClassification::Preview),
                    ],
                },
                machine_images: vec![MachineImage {
                    name: "gardenlinux".into(),
                    versions: vec![image("1443.2.0", &[]), image("1443.3.0", &["arm64"])],
                    update_strategy: None,
                }],
                ..Default::default()
            },
        )
    }

    fn worker(name: &str) -> Worker {
        Worker {
            name: name.into(),
            minimum: 1,
            maximum: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_shoot_defaults() {
        let mut shoot = Shoot::new("crazy-botany", ShootSpec::default());
        shoot.spec.networking = Some(Networking::default());
        shoot.spec.provider.workers.push(worker("cpu"));
        shoot.apply_defaults(&ctx());

        assert_eq!(shoot.spec.purpose, Some(ShootPurpose::Evaluation));
        let maintenance = shoot.spec.maintenance.as_ref().unwrap();
        let auto_update = maintenance.auto_update.as_ref().unwrap();
        assert!(auto_update.kubernetes_version);
        assert_eq!(auto_update.machine_image_version, Some(true));
        assert!(TimeWindow::from_api(maintenance.time_window.as_ref().unwrap()).is_ok());
        assert_eq!(shoot.spec.kubernetes.enable_static_token_kubeconfig, Some(false));
        assert_eq!(shoot.spec.networking.as_ref().unwrap().ip_families, vec![IpFamily::IPv4]);

        let w = &shoot.spec.provider.workers[0];
        assert_eq!(w.max_surge, Some(IntOrString::Int(1)));
        assert_eq!(w.max_unavailable, Some(IntOrString::Int(0)));
        assert_eq!(w.machine.architecture.as_deref(), Some("amd64"));

        let mode = shoot.spec.system_components.as_ref().unwrap().core_dns.as_ref().unwrap();
        assert_eq!(mode.autoscaling.as_ref().unwrap().mode, CoreDnsAutoscalingMode::Horizontal);
    }

    #[test]
    fn test_shoot_versions_completed_from_profile() {
        let profile = profile();
        let mut shoot = Shoot::new("a", ShootSpec::default());
        shoot.spec.kubernetes.version = "1.30".into();
        shoot.spec.provider.workers.push(worker("cpu"));
        let mut arm = worker("arm");
        arm.machine.architecture = Some("arm64".into());
        shoot.spec.provider.workers.push(arm);

        shoot.apply_defaults(&ctx().with_cloud_profile(&profile));
        assert_eq!(shoot.spec.kubernetes.version, "1.30.2");

        let image = |i: usize| shoot.spec.provider.workers[i].machine.image.clone().unwrap();
        assert_eq!(image(0).version.as_deref(), Some("1443.2.0"));
        assert_eq!(image(1).version.as_deref(), Some("1443.3.0"));
    }

    #[test]
    fn test_defaults_are_idempotent() {
        let profile = profile();
        let ctx = ctx().with_cloud_profile(&profile);
        let mut shoot = Shoot::new("a", ShootSpec::default());
        shoot.spec.provider.workers.push(worker("cpu"));
        shoot.apply_defaults(&ctx);
        let once = serde_json::to_value(&shoot).unwrap();
        shoot.apply_defaults(&ctx);
        assert_eq!(serde_json::to_value(&shoot).unwrap(), once);
    }

    #[test]
    fn test_seed_and_project_defaults() {
        let mut seed = Seed::new("aws-eu1", SeedSpec::default());
        seed.apply_defaults(&ctx());
        assert!(seed.is_visible());
        assert!(seed.is_vpa_enabled());
        let settings = seed.spec.settings.unwrap();
        assert_eq!(settings.excess_capacity_reservation.unwrap().enabled, Some(true));
        assert!(settings.dependency_watchdog.unwrap().prober.unwrap().enabled);
        assert!(!settings.topology_aware_routing.unwrap().enabled);

        let mut project = Project::new("dev", ProjectSpec::default());
        project.apply_defaults(&ctx());
        assert_eq!(project.spec.namespace.as_deref(), Some("garden-dev"));
    }

    #[test]
    fn test_gardenlet_and_managed_resource_defaults() {
        let mut ms = ManagedSeed::new("ms", ManagedSeedSpec::default());
        ms.apply_defaults(&ctx());
        let deployment = ms.spec.gardenlet.deployment.unwrap();
        assert_eq!(deployment.replica_count, Some(2));
        assert_eq!(deployment.revision_history_limit, Some(2));

        let mut mr = ManagedResource::new("mr", Default::default());
        mr.apply_defaults(&ctx());
        assert!(!mr.keeps_objects());
        assert_eq!(mr.spec.delete_persistent_volume_claims, Some(false));
    }

    #[test]
    fn test_default_object_by_kind() {
        let project = serde_json::json!({
            "apiVersion": "core.gardener.cloud/v1beta1",
            "kind": "Project",
            "metadata": {"name": "dev"},
            "spec": {}
        });
        let defaulted = default_object(ApiKind::Project, project, &ctx()).unwrap();
        assert_eq!(defaulted["spec"]["namespace"], "garden-dev");

        let quota = serde_json::json!({"kind": "Quota", "spec": {"scope": "anything"}});
        let unchanged = default_object(ApiKind::Quota, quota.clone(), &ctx()).unwrap();
        assert_eq!(unchanged, quota);
    }
}
