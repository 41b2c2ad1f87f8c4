//! Shoot validation

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;

use crate::apis::core::v1beta1::{Shoot, Worker};
use crate::validation::helpers::{
    parse_cron, validate_cidr, validate_dns_label, validate_immutable, validate_immutable_once_set,
    validate_no_overlap, validate_required, validate_time_window, validate_unique,
};
use crate::validation::{ErrorList, FieldError, FieldPath, Validate, ValidationContext};
use crate::versioning::{check_shoot_create, check_shoot_update, Version};

/// Upper bound of project name plus shoot name
pub const MAX_SHOOT_AND_PROJECT_NAME_LENGTH: usize = 21;

/// Upper bound of worker pool names
pub const MAX_WORKER_NAME_LENGTH: usize = 15;

fn is_zero(value: &IntOrString) -> bool {
    match value {
        IntOrString::Int(i) => *i == 0,
        IntOrString::String(s) => s.trim_end_matches('%').trim() == "0",
    }
}

impl Validate for Shoot {
    fn validate(&self, ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let meta = FieldPath::new("metadata");
        let spec = FieldPath::new("spec");
        let name = self.name_any();

        validate_dns_label(&name, &meta.child("name"), &mut errors);
        if let Some(project) = self.project_name() {
            if project.len() + name.len() > MAX_SHOOT_AND_PROJECT_NAME_LENGTH {
                errors.push(FieldError::too_long(
                    &meta.child("name"),
                    &name,
                    MAX_SHOOT_AND_PROJECT_NAME_LENGTH - project.len(),
                ));
            }
        }

        validate_required(&self.spec.region, &spec.child("region"), &mut errors);
        let provider = spec.child("provider");
        validate_required(&self.spec.provider.type_, &provider.child("type"), &mut errors);
        if self.cloud_profile_name().is_none() {
            errors.push(FieldError::required(&spec.child("cloudProfileName"), "a cloud profile must be referenced"));
        }
        if self.spec.kubernetes.version.is_empty() {
            errors.push(FieldError::required(&spec.child("kubernetes").child("version"), ""));
        }

        let workers = provider.child("workers");
        validate_unique(
            self.spec.provider.workers.iter().map(|w| w.name.as_str()),
            |i| workers.index(i).child("name"),
            &mut errors,
        );
        for (i, worker) in self.spec.provider.workers.iter().enumerate() {
            validate_worker(worker, &workers.index(i), &mut errors);
        }

        if let Some(window) = self.spec.maintenance.as_ref().and_then(|m| m.time_window.as_ref()) {
            validate_time_window(window, &spec.child("maintenance").child("timeWindow"), &mut errors);
        }

        if let Some(hibernation) = &self.spec.hibernation {
            let schedules = spec.child("hibernation").child("schedules");
            for (i, schedule) in hibernation.schedules.iter().enumerate() {
                let path = schedules.index(i);
                if schedule.start.is_none() && schedule.end.is_none() {
                    errors.push(FieldError::required(&path, "either start or end must be set"));
                }
                for (field, cron) in [("start", &schedule.start), ("end", &schedule.end)] {
                    if let Some(cron) = cron {
                        if let Err(e) = parse_cron(cron) {
                            errors.push(FieldError::invalid(&path.child(field), cron, &e));
                        }
                    }
                }
            }
        }

        if let Some(networking) = &self.spec.networking {
            let path = spec.child("networking");
            let mut cidrs = Vec::new();
            for (field, value) in [
                ("pods", &networking.pods),
                ("nodes", &networking.nodes),
                ("services", &networking.services),
            ] {
                if let Some(value) = value {
                    let field_path = path.child(field);
                    if let Some(cidr) = validate_cidr(value, &field_path, &mut errors) {
                        cidrs.push((field_path, cidr));
                    }
                }
            }
            validate_no_overlap(&cidrs, &mut errors);
        }

        if let Some(profile) = ctx.cloud_profile {
            let version = &self.spec.kubernetes.version;
            if !version.is_empty() {
                if let Err(e) = check_shoot_create(profile.kubernetes_versions(), version, ctx.now) {
                    errors.push(FieldError::invalid(
                        &spec.child("kubernetes").child("version"),
                        version,
                        &e.to_string(),
                    ));
                }
            }
        }

        errors
    }

    fn validate_update(&self, old: &Self, ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let spec = FieldPath::new("spec");

        validate_immutable(&self.spec.region, &old.spec.region, &spec.child("region"), &mut errors);
        validate_immutable(
            &self.spec.provider.type_,
            &old.spec.provider.type_,
            &spec.child("provider").child("type"),
            &mut errors,
        );

        let networking = spec.child("networking");
        let new_net = self.spec.networking.clone().unwrap_or_default();
        let old_net = old.spec.networking.clone().unwrap_or_default();
        validate_immutable_once_set(&new_net.type_, &old_net.type_, &networking.child("type"), &mut errors);
        validate_immutable_once_set(&new_net.pods, &old_net.pods, &networking.child("pods"), &mut errors);
        validate_immutable_once_set(&new_net.nodes, &old_net.nodes, &networking.child("nodes"), &mut errors);
        validate_immutable_once_set(
            &new_net.services,
            &old_net.services,
            &networking.child("services"),
            &mut errors,
        );

        let new_domain = self.spec.dns.as_ref().and_then(|d| d.domain.clone());
        let old_domain = old.spec.dns.as_ref().and_then(|d| d.domain.clone());
        validate_immutable_once_set(&new_domain, &old_domain, &spec.child("dns").child("domain"), &mut errors);

        if old.spec.secret_binding_name.is_some() && self.spec.secret_binding_name.is_none() {
            errors.push(FieldError::forbidden(
                &spec.child("secretBindingName"),
                "field cannot be unset",
            ));
        }

        if let Some(profile) = ctx.cloud_profile {
            let path = spec.child("kubernetes").child("version");
            if let Err(e) = check_shoot_update(
                profile.kubernetes_versions(),
                &old.spec.kubernetes.version,
                &self.spec.kubernetes.version,
                ctx.now,
            ) {
                errors.push(FieldError::forbidden(&path, &e.to_string()));
            }
            validate_image_updates(self, old, ctx, &mut errors);
        }

        // Create-time checks other than the version policy still apply
        let unchanged_version = ValidationContext {
            cloud_profile: None,
            now: ctx.now,
            policy: ctx.policy.clone(),
            registrations: ctx.registrations,
        };
        errors.append(self.validate(&unchanged_version));
        errors
    }
}

fn validate_worker(worker: &Worker, path: &FieldPath, errors: &mut ErrorList) {
    let name = path.child("name");
    validate_dns_label(&worker.name, &name, errors);
    if worker.name.len() > MAX_WORKER_NAME_LENGTH {
        errors.push(FieldError::too_long(&name, &worker.name, MAX_WORKER_NAME_LENGTH));
    }
    if worker.minimum < 0 {
        errors.push(FieldError::invalid(&path.child("minimum"), worker.minimum, "must be greater than or equal to 0"));
    }
    if worker.minimum > worker.maximum {
        errors.push(FieldError::forbidden(
            &path.child("maximum"),
            "maximum must be greater than or equal to minimum",
        ));
    }
    if worker.machine.type_.is_empty() {
        errors.push(FieldError::required(&path.child("machine").child("type"), ""));
    }

    let surge_zero = worker.max_surge.as_ref().is_some_and(is_zero);
    let unavailable_zero = worker.max_unavailable.as_ref().map_or(true, is_zero);
    if surge_zero && unavailable_zero {
        errors.push(FieldError::forbidden(
            &path.child("maxUnavailable"),
            "maxSurge and maxUnavailable cannot both be zero",
        ));
    }
}

/// Machine image versions may only change to usable, newer versions
fn validate_image_updates(new: &Shoot, old: &Shoot, ctx: &ValidationContext<'_>, errors: &mut ErrorList) {
    let Some(profile) = ctx.cloud_profile else {
        return;
    };
    let workers = FieldPath::new("spec").child("provider").child("workers");
    for (i, worker) in new.spec.provider.workers.iter().enumerate() {
        let Some(image) = &worker.machine.image else {
            continue;
        };
        let Some(version) = &image.version else {
            continue;
        };
        let previous = old
            .spec
            .provider
            .workers
            .iter()
            .find(|w| w.name == worker.name)
            .and_then(|w| w.machine.image.as_ref())
            .filter(|img| img.name == image.name)
            .and_then(|img| img.version.clone());
        if previous.as_deref() == Some(version.as_str()) {
            continue;
        }

        let image_path = workers.index(i).child("machine").child("image");
        let path = image_path.child("version");
        let Some(offered) = profile.machine_image(&image.name) else {
            let names: Vec<&str> = profile.spec.machine_images.iter().map(|m| m.name.as_str()).collect();
            errors.push(FieldError::not_supported(&image_path.child("name"), &image.name, &names));
            continue;
        };
        if let Err(e) = check_shoot_create(&offered.expirable_versions(), version, ctx.now) {
            errors.push(FieldError::invalid(&path, version, &e.to_string()));
            continue;
        }
        if let Some(previous) = previous {
            if let (Ok(from), Ok(to)) = (Version::parse(&previous), Version::parse(version)) {
                if to < from {
                    errors.push(FieldError::forbidden(
                        &path,
                        &format!("machine image version cannot be downgraded from {} to {}", from, to),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::common::MaintenanceTimeWindow;
    use crate::apis::core::v1beta1::{
        CloudProfile, CloudProfileSpec, Dns, ExpirableVersion, Hibernation, HibernationSchedule,
        KubernetesSettings, Machine, Maintenance, Networking, ShootSpec, VersionClassification,
    };
    use chrono::{DateTime, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn ctx() -> ValidationContext<'static> {
        ValidationContext::new(now())
    }

    fn worker(name: &str) -> Worker {
        Worker {
            name: name.into(),
            machine: Machine {
                type_: "m5.large".into(),
                ..Default::default()
            },
            minimum: 1,
            maximum: 3,
            ..Default::default()
        }
    }

    fn valid_shoot() -> Shoot {
        let mut shoot = Shoot::new("crazy-botany", ShootSpec::default());
        shoot.metadata.namespace = Some("garden-dev".into());
        shoot.spec.cloud_profile_name = Some("aws".into());
        shoot.spec.region = "eu-west-1".into();
        shoot.spec.provider.type_ = "aws".into();
        shoot.spec.kubernetes.version = "1.30.2".into();
        shoot.spec.secret_binding_name = Some("account".into());
        shoot.spec.networking = Some(Networking {
            type_: Some("calico".into()),
            nodes: Some("10.250.0.0/16".into()),
            ..Default::default()
        });
        shoot.spec.provider.workers.push(worker("cpu-worker"));
        shoot
    }

    fn profile(versions: &[(&str, VersionClassification)]) -> CloudProfile {
        CloudProfile::new(
            "aws",
            CloudProfileSpec {
                kubernetes: KubernetesSettings {
                    versions: versions
                        .iter()
                        .map(|(v, c)| ExpirableVersion::classified(v, *c))
                        .collect(),
                },
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_valid_shoot() {
        let errors = valid_shoot().validate(&ctx());
        assert!(errors.is_empty(), "{}", errors);
    }

    #[test]
    fn test_name_length_includes_project() {
        let mut shoot = valid_shoot();
        shoot.metadata.name = Some("a-very-long-name-12".into());
        let errors = shoot.validate(&ctx());
        assert!(errors.has_field("metadata.name"), "{}", errors);
    }

    #[test]
    fn test_worker_rules() {
        let mut shoot = valid_shoot();
        let mut bad = worker("cpu-worker");
        bad.minimum = 4;
        bad.max_surge = Some(IntOrString::Int(0));
        bad.max_unavailable = Some(IntOrString::String("0%".into()));
        shoot.spec.provider.workers.push(bad);
        shoot.spec.provider.workers.push(worker("a-worker-name-too-long"));

        let errors = shoot.validate(&ctx());
        assert!(errors.has_field("spec.provider.workers[1].name"));
        assert!(errors.has_field("spec.provider.workers[1].maximum"));
        assert!(errors.has_field("spec.provider.workers[1].maxUnavailable"));
        assert!(errors.has_field("spec.provider.workers[2].name"));
    }

    #[test]
    fn test_networking_and_schedules() {
        let mut shoot = valid_shoot();
        shoot.spec.networking = Some(Networking {
            pods: Some("100.96.0.0/11".into()),
            services: Some("100.96.0.0/13".into()),
            nodes: Some("10.250.0.0/333".into()),
            ..Default::default()
        });
        shoot.spec.hibernation = Some(Hibernation {
            enabled: None,
            schedules: vec![
                HibernationSchedule::default(),
                HibernationSchedule {
                    start: Some("00 17 * * 1".into()),
                    end: Some("00 08 * *".into()),
                    location: None,
                },
            ],
        });
        shoot.spec.maintenance = Some(Maintenance {
            time_window: Some(MaintenanceTimeWindow {
                begin: "220000+0000".into(),
                end: "220500+0000".into(),
            }),
            ..Default::default()
        });

        let errors = shoot.validate(&ctx());
        assert!(errors.has_field("spec.networking.nodes"));
        assert!(errors.has_field("spec.networking.pods"));
        assert!(errors.has_field("spec.hibernation.schedules[0]"));
        assert!(errors.has_field("spec.hibernation.schedules[1].end"));
        assert!(!errors.has_field("spec.hibernation.schedules[1].start"));
        assert!(errors.has_field("spec.maintenance.timeWindow"));
    }

    #[test]
    fn test_version_checked_against_profile() {
        let profile = profile(&[("1.30.2", VersionClassification::Expired)]);
        let ctx = ctx().with_cloud_profile(&profile);
        let errors = valid_shoot().validate(&ctx);
        assert!(errors.has_field("spec.kubernetes.version"), "{}", errors);
    }

    #[test]
    fn test_update_immutability() {
        let old = valid_shoot();
        let mut new = old.clone();
        new.spec.region = "eu-central-1".into();
        new.spec.networking.as_mut().unwrap().nodes = Some("10.251.0.0/16".into());
        new.spec.secret_binding_name = None;
        new.spec.dns = Some(Dns {
            domain: Some("x.example.com".into()),
            ..Default::default()
        });

        let errors = new.validate_update(&old, &ctx());
        assert!(errors.has_field("spec.region"));
        assert!(errors.has_field("spec.networking.nodes"));
        assert!(errors.has_field("spec.secretBindingName"));
        // setting the domain the first time is allowed
        assert!(!errors.has_field("spec.dns.domain"));
    }

    #[test]
    fn test_update_version_rules() {
        let profile = profile(&[
            ("1.29.5", VersionClassification::Supported),
            ("1.30.2", VersionClassification::Supported),
            ("1.31.0", VersionClassification::Supported),
            ("1.32.0", VersionClassification::Supported),
        ]);
        let ctx = ctx().with_cloud_profile(&profile);
        let old = valid_shoot();

        let mut new = old.clone();
        new.spec.kubernetes.version = "1.29.5".into();
        assert!(new.validate_update(&old, &ctx).has_field("spec.kubernetes.version"));

        new.spec.kubernetes.version = "1.32.0".into();
        assert!(new.validate_update(&old, &ctx).has_field("spec.kubernetes.version"));

        new.spec.kubernetes.version = "1.31.0".into();
        let errors = new.validate_update(&old, &ctx);
        assert!(errors.is_empty(), "{}", errors);
    }
}
