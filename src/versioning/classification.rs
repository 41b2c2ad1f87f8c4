//! Effective classification of offered versions

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::apis::core::v1beta1::{ExpirableVersion, VersionClassification};
use crate::versioning::Version;

/// Classification of a version at a point in time.
///
/// An expiration date in the past always wins. Lifecycle stages come next:
/// the last stage that has started applies, and a version whose first stage
/// has not started yet is unavailable. Without lifecycle the explicit
/// classification applies, defaulting to supported.
pub fn effective_classification(version: &ExpirableVersion, now: DateTime<Utc>) -> VersionClassification {
    if version.expiration_date.is_some_and(|expires| expires <= now) {
        return VersionClassification::Expired;
    }

    if !version.lifecycle.is_empty() {
        return version
            .lifecycle
            .iter()
            .filter(|stage| stage.start_time.map_or(true, |start| start <= now))
            .last()
            .map(|stage| stage.classification)
            .unwrap_or(VersionClassification::Unavailable);
    }

    version
        .classification
        .unwrap_or(VersionClassification::Supported)
}

/// A parsed version together with its effective classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedVersion {
    pub version: Version,
    pub classification: VersionClassification,
}

impl ClassifiedVersion {
    /// Usable for clusters: neither expired nor unavailable
    pub fn is_usable(&self) -> bool {
        !matches!(
            self.classification,
            VersionClassification::Expired | VersionClassification::Unavailable
        )
    }

    /// Candidate for a forced update: usable and not preview
    pub fn is_force_update_candidate(&self) -> bool {
        matches!(
            self.classification,
            VersionClassification::Supported | VersionClassification::Deprecated
        )
    }
}

/// Parse and classify all versions, sorted ascending.
///
/// Entries that do not parse are skipped with a warning; [`PolicyChecker`]
/// reports them as errors.
///
/// [`PolicyChecker`]: crate::versioning::PolicyChecker
pub fn classify_all(versions: &[ExpirableVersion], now: DateTime<Utc>) -> Vec<ClassifiedVersion> {
    let mut classified: Vec<ClassifiedVersion> = versions
        .iter()
        .filter_map(|v| match Version::parse(&v.version) {
            Ok(version) => Some(ClassifiedVersion {
                version,
                classification: effective_classification(v, now),
            }),
            Err(e) => {
                warn!(version = %v.version, error = %e, "Skipping unparseable version");
                None
            }
        })
        .collect();
    classified.sort_by(|a, b| a.version.cmp(&b.version));
    classified
}

/// Effective classification of a concrete version string in a list of offered versions
pub fn classification_of(
    versions: &[ExpirableVersion],
    version: &Version,
    now: DateTime<Utc>,
) -> Option<VersionClassification> {
    versions
        .iter()
        .find(|v| Version::parse(&v.version).is_ok_and(|parsed| parsed == *version))
        .map(|v| effective_classification(v, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::core::v1beta1::LifecycleStage;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn stage(classification: VersionClassification, offset_days: Option<i64>) -> LifecycleStage {
        LifecycleStage {
            classification,
            start_time: offset_days.map(|d| now() + Duration::days(d)),
        }
    }

    #[test]
    fn test_expiration_date_wins() {
        let mut v = ExpirableVersion::classified("1.28.0", VersionClassification::Supported);
        v.expiration_date = Some(now());
        assert_eq!(effective_classification(&v, now()), VersionClassification::Expired);

        v.expiration_date = Some(now() + Duration::seconds(1));
        assert_eq!(effective_classification(&v, now()), VersionClassification::Supported);
    }

    #[test]
    fn test_default_is_supported() {
        let v = ExpirableVersion {
            version: "1.29.0".into(),
            ..Default::default()
        };
        assert_eq!(effective_classification(&v, now()), VersionClassification::Supported);
    }

    #[test]
    fn test_lifecycle_stages() {
        let v = ExpirableVersion {
            version: "1.30.0".into(),
            lifecycle: vec![
                stage(VersionClassification::Preview, None),
                stage(VersionClassification::Supported, Some(-10)),
                stage(VersionClassification::Deprecated, Some(30)),
                stage(VersionClassification::Expired, Some(120)),
            ],
            ..Default::default()
        };
        assert_eq!(effective_classification(&v, now()), VersionClassification::Supported);
        assert_eq!(
            effective_classification(&v, now() + Duration::days(31)),
            VersionClassification::Deprecated
        );
        assert_eq!(
            effective_classification(&v, now() + Duration::days(120)),
            VersionClassification::Expired
        );

        let future = ExpirableVersion {
            version: "1.31.0".into(),
            lifecycle: vec![stage(VersionClassification::Preview, Some(5))],
            ..Default::default()
        };
        assert_eq!(effective_classification(&future, now()), VersionClassification::Unavailable);
    }

    #[test]
    fn test_classify_all_sorts_and_skips_garbage() {
        let versions = vec![
            ExpirableVersion::classified("1.30.1", VersionClassification::Preview),
            ExpirableVersion::classified("not-a-version", VersionClassification::Supported),
            ExpirableVersion::classified("1.29.9", VersionClassification::Supported),
        ];
        let classified = classify_all(&versions, now());
        assert_eq!(classified.len(), 2);
        assert_eq!(classified[0].version, Version::new(1, 29, 9));
        assert_eq!(
            classification_of(&versions, &Version::new(1, 30, 1), now()),
            Some(VersionClassification::Preview)
        );
        assert_eq!(classification_of(&versions, &Version::new(1, 30, 2), now()), None);
    }
}
