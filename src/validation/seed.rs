//! Seed and Garden validation

use crate::apis::core::v1beta1::{Seed, KNOWN_SEED_TAINTS};
use crate::apis::operator::v1alpha1::Garden;
use crate::validation::helpers::{
    validate_cidr, validate_dns_subdomain, validate_no_overlap, validate_required,
    validate_time_window, validate_unique,
};
use crate::validation::{ErrorList, FieldError, FieldPath, Validate, ValidationContext};
use crate::versioning::Version;

impl Validate for Seed {
    fn validate(&self, _ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let spec = FieldPath::new("spec");

        let provider = spec.child("provider");
        validate_required(&self.spec.provider.type_, &provider.child("type"), &mut errors);
        validate_required(&self.spec.provider.region, &provider.child("region"), &mut errors);

        if let Some(ingress) = &self.spec.ingress {
            validate_dns_subdomain(&ingress.domain, &spec.child("ingress").child("domain"), &mut errors);
            validate_required(
                &ingress.controller.kind,
                &spec.child("ingress").child("controller").child("kind"),
                &mut errors,
            );
        }

        let networks = spec.child("networks");
        let mut cidrs = Vec::new();
        let mut check = |value: &str, path: FieldPath, errors: &mut ErrorList| {
            if let Some(cidr) = validate_cidr(value, &path, errors) {
                cidrs.push((path, cidr));
            }
        };
        check(&self.spec.networks.pods, networks.child("pods"), &mut errors);
        check(&self.spec.networks.services, networks.child("services"), &mut errors);
        if let Some(nodes) = &self.spec.networks.nodes {
            check(nodes, networks.child("nodes"), &mut errors);
        }
        validate_no_overlap(&cidrs, &mut errors);

        if let Some(defaults) = &self.spec.networks.shoot_defaults {
            let path = networks.child("shootDefaults");
            for (field, value) in [("pods", &defaults.pods), ("services", &defaults.services)] {
                if let Some(value) = value {
                    validate_cidr(value, &path.child(field), &mut errors);
                }
            }
        }
        for (i, block) in self.spec.networks.block_cidrs.iter().enumerate() {
            validate_cidr(block, &networks.child("blockCIDRs").index(i), &mut errors);
        }

        let taints = spec.child("taints");
        validate_unique(
            self.spec.taints.iter().map(|t| t.key.as_str()),
            |i| taints.index(i).child("key"),
            &mut errors,
        );
        for (i, taint) in self.spec.taints.iter().enumerate() {
            if !KNOWN_SEED_TAINTS.contains(&taint.key.as_str()) {
                errors.push(FieldError::not_supported(
                    &taints.index(i).child("key"),
                    &taint.key,
                    &KNOWN_SEED_TAINTS,
                ));
            }
        }

        if let Some(backup) = &self.spec.backup {
            validate_required(&backup.provider, &spec.child("backup").child("provider"), &mut errors);
        }

        errors
    }

    fn validate_update(&self, old: &Self, ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = self.validate(ctx);
        let networks = FieldPath::new("spec").child("networks");
        for (field, new, old) in [
            ("pods", &self.spec.networks.pods, &old.spec.networks.pods),
            ("services", &self.spec.networks.services, &old.spec.networks.services),
        ] {
            if new != old {
                errors.push(FieldError::invalid(&networks.child(field), new, "field is immutable"));
            }
        }
        if old.spec.backup.is_some() && self.spec.backup.is_none() {
            errors.push(FieldError::forbidden(
                &FieldPath::new("spec").child("backup"),
                "backup cannot be removed once configured",
            ));
        }
        errors
    }
}

impl Validate for Garden {
    fn validate(&self, _ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = ErrorList::new();
        let spec = FieldPath::new("spec");

        let runtime_networking = spec.child("runtimeCluster").child("networking");
        for (field, values) in [
            ("pods", &self.spec.runtime_cluster.networking.pods),
            ("services", &self.spec.runtime_cluster.networking.services),
        ] {
            let path = runtime_networking.child(field);
            if values.is_empty() {
                errors.push(FieldError::required(&path, ""));
            }
            for (i, value) in values.iter().enumerate() {
                validate_cidr(value, &path.index(i), &mut errors);
            }
        }

        let virtual_cluster = spec.child("virtualCluster");
        let domains = virtual_cluster.child("dns").child("domains");
        if self.spec.virtual_cluster.dns.domains.is_empty() {
            errors.push(FieldError::required(&domains, "at least one domain is required"));
        }
        validate_unique(
            self.spec.virtual_cluster.dns.domains.iter().map(|d| d.name.as_str()),
            |i| domains.index(i).child("name"),
            &mut errors,
        );
        for (i, domain) in self.spec.virtual_cluster.dns.domains.iter().enumerate() {
            validate_dns_subdomain(&domain.name, &domains.index(i).child("name"), &mut errors);
        }

        let version = &self.spec.virtual_cluster.kubernetes.version;
        let version_path = virtual_cluster.child("kubernetes").child("version");
        match Version::parse(version) {
            Ok(v) if v.is_partial() => {
                errors.push(FieldError::invalid(&version_path, version, "must be a full version"))
            }
            Ok(_) => {}
            Err(e) => errors.push(FieldError::invalid(&version_path, version, &e.to_string())),
        }

        validate_time_window(
            &self.spec.virtual_cluster.maintenance.time_window,
            &virtual_cluster.child("maintenance").child("timeWindow"),
            &mut errors,
        );

        errors
    }

    fn validate_update(&self, old: &Self, ctx: &ValidationContext<'_>) -> ErrorList {
        let mut errors = self.validate(ctx);
        let old_domains = &old.spec.virtual_cluster.dns.domains;
        let new_domains = &self.spec.virtual_cluster.dns.domains;
        let kept = old_domains.len() <= new_domains.len()
            && old_domains
                .iter()
                .zip(new_domains)
                .all(|(o, n)| o.name == n.name);
        if !kept {
            errors.push(FieldError::forbidden(
                &FieldPath::new("spec").child("virtualCluster").child("dns").child("domains"),
                "domains cannot be removed or reordered, new domains may only be appended",
            ));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::common::Taint;
    use crate::apis::core::v1beta1::{SeedBackup, SeedNetworks, SeedProvider, SeedSpec};
    use crate::apis::operator::v1alpha1::{DnsDomain, GardenSpec};
    use chrono::{TimeZone, Utc};

    fn ctx() -> ValidationContext<'static> {
        ValidationContext::new(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
    }

    fn seed() -> Seed {
        Seed::new(
            "aws-eu1",
            SeedSpec {
                provider: SeedProvider {
                    type_: "aws".into(),
                    region: "eu-west-1".into(),
                    ..Default::default()
                },
                networks: SeedNetworks {
                    pods: "100.64.0.0/12".into(),
                    services: "100.80.0.0/13".into(),
                    nodes: Some("10.250.0.0/16".into()),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
    }

    fn garden() -> Garden {
        let mut spec = GardenSpec::default();
        spec.runtime_cluster.networking.pods = vec!["10.1.0.0/16".into()];
        spec.runtime_cluster.networking.services = vec!["10.2.0.0/16".into()];
        spec.virtual_cluster.dns.domains = vec![DnsDomain {
            name: "virtual.example.com".into(),
            provider: None,
        }];
        spec.virtual_cluster.kubernetes.version = "1.30.2".into();
        Garden::new("garden", spec)
    }

    #[test]
    fn test_valid_seed() {
        let errors = seed().validate(&ctx());
        assert!(errors.is_empty(), "{}", errors);
    }

    #[test]
    fn test_seed_networks_and_taints() {
        let mut s = seed();
        s.spec.networks.services = "100.64.0.0/13".into();
        s.spec.taints.push(Taint {
            key: "seed.gardener.cloud/unknown".into(),
            value: None,
        });
        s.spec.backup = Some(SeedBackup::default());

        let errors = s.validate(&ctx());
        assert!(errors.has_field("spec.networks.pods"));
        assert!(errors.has_field("spec.taints[0].key"));
        assert!(errors.has_field("spec.backup.provider"));
    }

    #[test]
    fn test_seed_update() {
        let old = seed();
        let mut new = old.clone();
        new.spec.networks.pods = "100.96.0.0/12".into();
        assert!(new.validate_update(&old, &ctx()).has_field("spec.networks.pods"));
    }

    #[test]
    fn test_garden() {
        let errors = garden().validate(&ctx());
        assert!(errors.is_empty(), "{}", errors);

        let mut g = garden();
        g.spec.runtime_cluster.networking.pods.clear();
        g.spec.virtual_cluster.kubernetes.version = "1.30".into();
        g.spec.virtual_cluster.dns.domains.push(DnsDomain {
            name: "virtual.example.com".into(),
            provider: None,
        });
        let errors = g.validate(&ctx());
        assert!(errors.has_field("spec.runtimeCluster.networking.pods"));
        assert!(errors.has_field("spec.virtualCluster.kubernetes.version"));
        assert!(errors.has_field("spec.virtualCluster.dns.domains[1].name"));
    }

    #[test]
    fn test_garden_domains_append_only() {
        let old = garden();
        let mut new = old.clone();
        new.spec.virtual_cluster.dns.domains.push(DnsDomain {
            name: "second.example.com".into(),
            provider: None,
        });
        assert!(new.validate_update(&old, &ctx()).is_empty());
        assert!(!old.validate_update(&new, &ctx()).is_empty());
    }
}
