//! Update target selection
//!
//! Auto-updates only move to supported versions within the allowed scope.
//! Forced updates replace an expired version and accept deprecated targets
//! when nothing supported qualifies.

use chrono::{DateTime, Utc};

use crate::apis::core::v1beta1::{ExpirableVersion, MachineImageUpdateStrategy, VersionClassification};
use crate::error::{Error, Result};
use crate::versioning::{classify_all, ClassifiedVersion, Version};

/// How far an automatic update may move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateScope {
    /// Same major and minor
    Patch,
    /// Same major
    Minor,
    /// Anything newer
    Major,
}

impl UpdateScope {
    /// Whether `candidate` is within this scope of `current`
    pub fn allows(&self, current: &Version, candidate: &Version) -> bool {
        match self {
            UpdateScope::Patch => current.same_minor(candidate),
            UpdateScope::Minor => current.major == candidate.major,
            UpdateScope::Major => true,
        }
    }
}

impl From<MachineImageUpdateStrategy> for UpdateScope {
    fn from(strategy: MachineImageUpdateStrategy) -> Self {
        match strategy {
            MachineImageUpdateStrategy::Patch => UpdateScope::Patch,
            MachineImageUpdateStrategy::Minor => UpdateScope::Minor,
            MachineImageUpdateStrategy::Major => UpdateScope::Major,
        }
    }
}

/// Highest supported version above `current` within `scope`
pub fn auto_update_target(
    versions: &[ExpirableVersion],
    current: &Version,
    scope: UpdateScope,
    now: DateTime<Utc>,
) -> Option<Version> {
    classify_all(versions, now)
        .into_iter()
        .filter(|c| c.classification == VersionClassification::Supported)
        .filter(|c| c.version > *current && scope.allows(current, &c.version))
        .map(|c| c.version)
        .max()
}

/// Highest candidate, supported first, then deprecated
fn best_candidate<'a>(candidates: impl Iterator<Item = &'a ClassifiedVersion> + Clone) -> Option<Version> {
    let highest_with = |classification: VersionClassification| {
        candidates
            .clone()
            .filter(|c| c.classification == classification)
            .map(|c| c.version)
            .max()
    };
    highest_with(VersionClassification::Supported)
        .or_else(|| highest_with(VersionClassification::Deprecated))
}

/// Target of a forced Kubernetes update away from an expired version.
///
/// The same minor is tried first; when it has nothing usable, the next minor
/// is used.
pub fn force_update_target(
    versions: &[ExpirableVersion],
    current: &Version,
    now: DateTime<Utc>,
) -> Result<Version> {
    let classified = classify_all(versions, now);
    let eligible = |c: &&ClassifiedVersion| c.is_force_update_candidate() && c.version > *current;

    let same_minor = classified
        .iter()
        .filter(eligible)
        .filter(|c| c.version.same_minor(current));
    if let Some(target) = best_candidate(same_minor) {
        return Ok(target);
    }

    let next_minor = classified
        .iter()
        .filter(eligible)
        .filter(|c| c.version.major == current.major && c.version.minor == current.minor + 1);
    best_candidate(next_minor).ok_or_else(|| Error::NoQualifyingVersion {
        current: current.to_string(),
        reason: format!(
            "no supported or deprecated version in {}.{} or {}.{}",
            current.major,
            current.minor,
            current.major,
            current.minor + 1
        ),
    })
}

/// Target of a forced machine image update away from an expired version.
///
/// Candidates within `scope` are preferred; when none qualifies any newer
/// usable version is taken.
pub fn force_update_image_target(
    versions: &[ExpirableVersion],
    current: &Version,
    scope: UpdateScope,
    now: DateTime<Utc>,
) -> Result<Version> {
    let classified = classify_all(versions, now);
    let eligible = |c: &&ClassifiedVersion| c.is_force_update_candidate() && c.version > *current;

    let in_scope = classified
        .iter()
        .filter(eligible)
        .filter(|c| scope.allows(current, &c.version));
    if let Some(target) = best_candidate(in_scope) {
        return Ok(target);
    }

    best_candidate(classified.iter().filter(eligible)).ok_or_else(|| Error::NoQualifyingVersion {
        current: current.to_string(),
        reason: "no newer supported or deprecated image version".to_string(),
    })
}

/// Resolve a partial version (`1.30`) to the highest supported patch, else the
/// highest deprecated one. Concrete versions resolve to themselves if offered.
pub fn resolve_partial(
    versions: &[ExpirableVersion],
    requested: &Version,
    now: DateTime<Utc>,
) -> Option<Version> {
    let classified = classify_all(versions, now);
    if !requested.is_partial() {
        return classified
            .iter()
            .find(|c| c.version == *requested)
            .map(|c| c.version);
    }
    best_candidate(classified.iter().filter(|c| requested.matches(&c.version)))
}

/// Highest supported version of the profile, used as default for new Shoots
pub fn latest_supported(versions: &[ExpirableVersion], now: DateTime<Utc>) -> Option<Version> {
    classify_all(versions, now)
        .into_iter()
        .filter(|c| c.classification == VersionClassification::Supported)
        .map(|c| c.version)
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use crate::apis::core::v1beta1::VersionClassification::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn versions(entries: &[(&str, VersionClassification)]) -> Vec<ExpirableVersion> {
        entries
            .iter()
            .map(|(v, c)| ExpirableVersion::classified(v, *c))
            .collect()
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_auto_update_respects_scope_and_classification() {
        let offered = versions(&[
            ("1.29.1", Supported),
            ("1.29.2", Supported),
            ("1.29.3", Preview),
            ("1.30.0", Supported),
            ("2.0.0", Supported),
        ]);
        assert_eq!(
            auto_update_target(&offered, &v("1.29.1"), UpdateScope::Patch, now()),
            Some(v("1.29.2"))
        );
        assert_eq!(
            auto_update_target(&offered, &v("1.29.1"), UpdateScope::Minor, now()),
            Some(v("1.30.0"))
        );
        assert_eq!(
            auto_update_target(&offered, &v("1.29.1"), UpdateScope::Major, now()),
            Some(v("2.0.0"))
        );
        assert_eq!(auto_update_target(&offered, &v("2.0.0"), UpdateScope::Major, now()), None);
    }

    #[test]
    fn test_deprecated_is_never_an_auto_update_target() {
        let offered = versions(&[("1.29.1", Supported), ("1.29.2", Deprecated)]);
        assert_eq!(auto_update_target(&offered, &v("1.29.1"), UpdateScope::Patch, now()), None);
    }

    #[test]
    fn test_force_update_prefers_same_minor() {
        let offered = versions(&[
            ("1.28.1", Expired),
            ("1.28.2", Deprecated),
            ("1.28.3", Preview),
            ("1.29.0", Supported),
        ]);
        assert_eq!(force_update_target(&offered, &v("1.28.1"), now()).unwrap(), v("1.28.2"));
    }

    #[test]
    fn test_force_update_falls_back_to_next_minor() {
        let offered = versions(&[
            ("1.28.1", Expired),
            ("1.29.0", Deprecated),
            ("1.29.4", Supported),
            ("1.29.5", Preview),
            ("1.30.0", Supported),
        ]);
        assert_eq!(force_update_target(&offered, &v("1.28.1"), now()).unwrap(), v("1.29.4"));

        let stuck = versions(&[("1.28.1", Expired), ("1.30.0", Supported)]);
        assert_matches!(
            force_update_target(&stuck, &v("1.28.1"), now()),
            Err(Error::NoQualifyingVersion { .. })
        );
    }

    #[test]
    fn test_force_update_image_leaves_scope_when_needed() {
        let offered = versions(&[("1443.1.0", Expired), ("1592.0.0", Supported)]);
        assert_eq!(
            force_update_image_target(&offered, &v("1443.1.0"), UpdateScope::Patch, now()).unwrap(),
            v("1592.0.0")
        );
    }

    #[test]
    fn test_resolve_partial() {
        let offered = versions(&[
            ("1.30.1", Supported),
            ("1.30.2", Supported),
            ("1.30.3", Preview),
            ("1.31.0", Deprecated),
        ]);
        assert_eq!(resolve_partial(&offered, &v("1.30"), now()), Some(v("1.30.2")));
        assert_eq!(resolve_partial(&offered, &v("1.31"), now()), Some(v("1.31.0")));
        assert_eq!(resolve_partial(&offered, &v("1.32"), now()), None);
        assert_eq!(resolve_partial(&offered, &v("1.30.3"), now()), Some(v("1.30.3")));
        assert_eq!(latest_supported(&offered, now()), Some(v("1.30.2")));
    }
}
