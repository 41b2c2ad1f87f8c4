//! Version policy checks
//!
//! [`PolicyChecker`] lints the versions a CloudProfile offers. The
//! `check_shoot_*` functions enforce which versions a Shoot may create with or
//! move to.

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::apis::core::v1beta1::{ExpirableVersion, LifecycleStage, VersionClassification};
use crate::versioning::{classification_of, classify_all, effective_classification, resolve_partial, Version};

// =============================================================================
// Findings
// =============================================================================

/// Severity of a policy finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Something wrong with the offered versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyFinding {
    pub severity: Severity,
    pub version: String,
    pub message: String,
}

impl PolicyFinding {
    fn error(version: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            version: version.to_string(),
            message: message.into(),
        }
    }

    fn warning(version: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            version: version.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for PolicyFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.version, self.message)
    }
}

// =============================================================================
// Policy Checker
// =============================================================================

/// Lints a list of offered versions
#[derive(Debug, Clone)]
pub struct PolicyChecker {
    /// Minimum time between deprecation and expiration of the last patch of a minor
    pub min_minor_deprecation: Duration,
    /// Minimum time between deprecation and expiration of any other patch
    pub min_patch_deprecation: Duration,
}

impl Default for PolicyChecker {
    fn default() -> Self {
        Self {
            min_minor_deprecation: Duration::days(120),
            min_patch_deprecation: Duration::days(14),
        }
    }
}

impl PolicyChecker {
    pub fn new(min_minor_deprecation_days: i64, min_patch_deprecation_days: i64) -> Self {
        Self {
            min_minor_deprecation: Duration::days(min_minor_deprecation_days),
            min_patch_deprecation: Duration::days(min_patch_deprecation_days),
        }
    }

    /// Check the versions at time `now`. Findings are ordered errors first.
    pub fn check(&self, versions: &[ExpirableVersion], now: DateTime<Utc>) -> Vec<PolicyFinding> {
        let mut findings = Vec::new();
        let mut seen: BTreeMap<Version, &str> = BTreeMap::new();
        // minor line -> highest patch, in the order minors first appear
        let mut minors: IndexMap<(u64, u64), Version> = IndexMap::new();

        for entry in versions {
            let parsed = match Version::parse(&entry.version) {
                Ok(v) if !v.is_partial() => v,
                Ok(_) => {
                    findings.push(PolicyFinding::error(&entry.version, "offered versions need a patch number"));
                    continue;
                }
                Err(e) => {
                    findings.push(PolicyFinding::error(&entry.version, e.to_string()));
                    continue;
                }
            };

            if let Some(first) = seen.insert(parsed, &entry.version) {
                findings.push(PolicyFinding::error(
                    &entry.version,
                    format!("duplicate of {}", first),
                ));
            }
            minors
                .entry(parsed.minor_line())
                .and_modify(|highest| *highest = (*highest).max(parsed))
                .or_insert(parsed);

            self.check_entry(entry, &mut findings);
        }

        self.check_deprecation_windows(versions, &minors, &mut findings);
        self.check_minor_usability(versions, now, &mut findings);

        findings.sort_by(|a, b| b.severity.cmp(&a.severity));
        findings
    }

    fn check_entry(&self, entry: &ExpirableVersion, findings: &mut Vec<PolicyFinding>) {
        if entry.classification.is_some() && !entry.lifecycle.is_empty() {
            findings.push(PolicyFinding::error(
                &entry.version,
                "classification and lifecycle are mutually exclusive",
            ));
        }

        let mut previous: Option<&LifecycleStage> = None;
        for stage in &entry.lifecycle {
            if let Some(prev) = previous {
                if stage.classification <= prev.classification {
                    findings.push(PolicyFinding::error(
                        &entry.version,
                        format!(
                            "lifecycle stage {} cannot follow {}",
                            stage.classification, prev.classification
                        ),
                    ));
                }
                let out_of_time = match (prev.start_time, stage.start_time) {
                    (Some(a), Some(b)) => b < a,
                    (Some(_), None) => true,
                    _ => false,
                };
                if out_of_time {
                    findings.push(PolicyFinding::error(
                        &entry.version,
                        format!("lifecycle stage {} starts before its predecessor", stage.classification),
                    ));
                }
            }
            previous = Some(stage);
        }

        let declares_deprecated = entry.classification == Some(VersionClassification::Deprecated)
            || entry
                .lifecycle
                .iter()
                .any(|s| s.classification == VersionClassification::Deprecated);
        let expires = entry.expiration_date.is_some()
            || entry
                .lifecycle
                .iter()
                .any(|s| s.classification == VersionClassification::Expired && s.start_time.is_some());
        if declares_deprecated && !expires {
            findings.push(PolicyFinding::warning(
                &entry.version,
                "deprecated version without expiration date",
            ));
        }
    }

    fn check_deprecation_windows(
        &self,
        versions: &[ExpirableVersion],
        minors: &IndexMap<(u64, u64), Version>,
        findings: &mut Vec<PolicyFinding>,
    ) {
        for entry in versions {
            let Ok(parsed) = Version::parse(&entry.version) else {
                continue;
            };
            let Some(window) = deprecation_window(entry) else {
                continue;
            };
            let last_of_minor = minors.get(&parsed.minor_line()) == Some(&parsed);
            let (minimum, what) = if last_of_minor {
                (self.min_minor_deprecation, "minor")
            } else {
                (self.min_patch_deprecation, "patch")
            };
            if window < minimum {
                findings.push(PolicyFinding::warning(
                    &entry.version,
                    format!(
                        "{} deprecation window of {} days is shorter than {} days",
                        what,
                        window.num_days(),
                        minimum.num_days()
                    ),
                ));
            }
        }
    }

    fn check_minor_usability(
        &self,
        versions: &[ExpirableVersion],
        now: DateTime<Utc>,
        findings: &mut Vec<PolicyFinding>,
    ) {
        let classified = classify_all(versions, now);
        let mut by_minor: IndexMap<(u64, u64), Vec<VersionClassification>> = IndexMap::new();
        for c in &classified {
            by_minor
                .entry(c.version.minor_line())
                .or_default()
                .push(c.classification);
        }

        for (index, ((major, minor), classifications)) in by_minor.iter().enumerate() {
            let has_usable = classifications.iter().any(|c| {
                matches!(c, VersionClassification::Supported | VersionClassification::Deprecated)
            });
            let newer_preview = by_minor
                .values()
                .skip(index + 1)
                .any(|newer| newer.contains(&VersionClassification::Preview));
            if !has_usable && newer_preview {
                findings.push(PolicyFinding::warning(
                    &format!("{}.{}", major, minor),
                    "minor has no supported or deprecated patch while a newer minor is in preview",
                ));
            }
        }
    }
}

/// Time between the start of the deprecated stage and expiration, when both are known
fn deprecation_window(entry: &ExpirableVersion) -> Option<Duration> {
    let deprecated_at = entry
        .lifecycle
        .iter()
        .find(|s| s.classification == VersionClassification::Deprecated)?
        .start_time?;
    let expires_at = entry.expiration_date.or_else(|| {
        entry
            .lifecycle
            .iter()
            .find(|s| s.classification == VersionClassification::Expired)
            .and_then(|s| s.start_time)
    })?;
    Some(expires_at - deprecated_at)
}

// =============================================================================
// Shoot Version Constraints
// =============================================================================

/// Reason a Shoot may not use a version
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionViolation {
    #[error("version {0} cannot be parsed")]
    Unparseable(String),

    #[error("version {0} is not offered by the cloud profile")]
    NotOffered(String),

    #[error("version {0} is expired")]
    Expired(String),

    #[error("version {0} is not available yet")]
    Unavailable(String),

    #[error("downgrade from {from} to {to} is not allowed")]
    Downgrade { from: String, to: String },

    #[error("update from {from} to {to} skips a minor version")]
    SkipsMinor { from: String, to: String },

    #[error("update from {from} to {to} changes the major version")]
    MajorUpdate { from: String, to: String },
}

fn usable(versions: &[ExpirableVersion], requested: &str, now: DateTime<Utc>) -> Result<Version, VersionViolation> {
    let parsed = Version::parse(requested).map_err(|_| VersionViolation::Unparseable(requested.to_string()))?;
    let concrete = if parsed.is_partial() {
        resolve_partial(versions, &parsed, now).ok_or_else(|| VersionViolation::NotOffered(requested.to_string()))?
    } else {
        parsed
    };
    match classification_of(versions, &concrete, now) {
        None => Err(VersionViolation::NotOffered(requested.to_string())),
        Some(VersionClassification::Expired) => Err(VersionViolation::Expired(requested.to_string())),
        Some(VersionClassification::Unavailable) => {
            Err(VersionViolation::Unavailable(requested.to_string()))
        }
        Some(_) => Ok(concrete),
    }
}

/// Version constraints for a new Shoot
pub fn check_shoot_create(
    versions: &[ExpirableVersion],
    version: &str,
    now: DateTime<Utc>,
) -> Result<(), VersionViolation> {
    usable(versions, version, now).map(|_| ())
}

/// Version constraints for a Shoot update.
///
/// An unchanged version is always accepted, even when it has expired since.
pub fn check_shoot_update(
    versions: &[ExpirableVersion],
    old: &str,
    new: &str,
    now: DateTime<Utc>,
) -> Result<(), VersionViolation> {
    if old == new {
        return Ok(());
    }
    let current = Version::parse(old).map_err(|_| VersionViolation::Unparseable(old.to_string()))?;
    let target = usable(versions, new, now)?;
    if target < current {
        return Err(VersionViolation::Downgrade {
            from: old.to_string(),
            to: new.to_string(),
        });
    }
    if target.major != current.major {
        return Err(VersionViolation::MajorUpdate {
            from: old.to_string(),
            to: new.to_string(),
        });
    }
    if target.minor > current.minor + 1 {
        return Err(VersionViolation::SkipsMinor {
            from: old.to_string(),
            to: new.to_string(),
        });
    }
    Ok(())
}

/// Summary of offered versions by effective classification
pub fn summarize(versions: &[ExpirableVersion], now: DateTime<Utc>) -> IndexMap<String, VersionClassification> {
    versions
        .iter()
        .map(|v| (v.version.clone(), effective_classification(v, now)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn classified(v: &str, c: VersionClassification) -> ExpirableVersion {
        ExpirableVersion::classified(v, c)
    }

    fn has(findings: &[PolicyFinding], version: &str, fragment: &str) -> bool {
        findings
            .iter()
            .any(|f| f.version == version && f.message.contains(fragment))
    }

    #[test]
    fn test_duplicates_and_garbage() {
        let versions = vec![
            classified("1.29.0", VersionClassification::Supported),
            classified("v1.29.0", VersionClassification::Supported),
            classified("1.30", VersionClassification::Supported),
            classified("bogus", VersionClassification::Supported),
        ];
        let findings = PolicyChecker::default().check(&versions, now());
        assert!(has(&findings, "v1.29.0", "duplicate of 1.29.0"));
        assert!(has(&findings, "1.30", "patch number"));
        assert!(findings.iter().any(|f| f.version == "bogus" && f.severity == Severity::Error));
    }

    #[test]
    fn test_classification_and_lifecycle_exclusive() {
        let mut v = classified("1.29.0", VersionClassification::Supported);
        v.lifecycle = vec![LifecycleStage {
            classification: VersionClassification::Preview,
            start_time: None,
        }];
        let findings = PolicyChecker::default().check(&[v], now());
        assert!(has(&findings, "1.29.0", "mutually exclusive"));
    }

    #[test]
    fn test_lifecycle_order() {
        let v = ExpirableVersion {
            version: "1.29.0".into(),
            lifecycle: vec![
                LifecycleStage {
                    classification: VersionClassification::Supported,
                    start_time: Some(now()),
                },
                LifecycleStage {
                    classification: VersionClassification::Preview,
                    start_time: Some(now() - Duration::days(1)),
                },
            ],
            ..Default::default()
        };
        let findings = PolicyChecker::default().check(&[v], now());
        assert!(has(&findings, "1.29.0", "preview cannot follow supported"));
        assert!(has(&findings, "1.29.0", "starts before"));
    }

    #[test]
    fn test_deprecated_without_expiration() {
        let findings = PolicyChecker::default().check(
            &[
                classified("1.28.5", VersionClassification::Deprecated),
                classified("1.29.0", VersionClassification::Supported),
            ],
            now(),
        );
        assert!(has(&findings, "1.28.5", "without expiration"));
        assert!(findings.iter().all(|f| f.severity == Severity::Warning));
    }

    #[test]
    fn test_short_deprecation_windows() {
        let staged = |version: &str, deprecated_days: i64, expired_days: i64| ExpirableVersion {
            version: version.into(),
            lifecycle: vec![
                LifecycleStage {
                    classification: VersionClassification::Supported,
                    start_time: None,
                },
                LifecycleStage {
                    classification: VersionClassification::Deprecated,
                    start_time: Some(now() + Duration::days(deprecated_days)),
                },
                LifecycleStage {
                    classification: VersionClassification::Expired,
                    start_time: Some(now() + Duration::days(expired_days)),
                },
            ],
            ..Default::default()
        };
        let versions = vec![staged("1.28.1", 0, 7), staged("1.28.2", 0, 60)];
        let findings = PolicyChecker::default().check(&versions, now());
        assert!(has(&findings, "1.28.1", "patch deprecation window of 7 days"));
        assert!(has(&findings, "1.28.2", "minor deprecation window of 60 days"));

        let relaxed = PolicyChecker::new(30, 7);
        assert!(relaxed.check(&versions, now()).is_empty());
    }

    #[test]
    fn test_minor_without_usable_patch() {
        let versions = vec![
            classified("1.29.0", VersionClassification::Preview),
            classified("1.30.0", VersionClassification::Preview),
        ];
        let findings = PolicyChecker::default().check(&versions, now());
        assert!(has(&findings, "1.29", "no supported or deprecated patch"));
    }

    #[test]
    fn test_expired_minor_before_preview_minor() {
        let mut old = classified("1.29.0", VersionClassification::Deprecated);
        old.expiration_date = Some(now() - Duration::days(30));
        let versions = vec![
            old,
            classified("1.30.0", VersionClassification::Supported),
            classified("1.30.1", VersionClassification::Preview),
        ];
        let findings = PolicyChecker::default().check(&versions, now());
        assert!(has(&findings, "1.29", "no supported or deprecated patch"));
        assert!(!has(&findings, "1.30", "no supported or deprecated patch"));
    }

    #[test]
    fn test_summarize_keeps_offered_order() {
        let mut expired = classified("1.28.0", VersionClassification::Supported);
        expired.expiration_date = Some(now() - Duration::days(1));
        let summary = summarize(
            &[classified("1.30.0", VersionClassification::Preview), expired],
            now(),
        );
        let entries: Vec<_> = summary.iter().map(|(v, c)| (v.as_str(), *c)).collect();
        assert_eq!(
            entries,
            vec![
                ("1.30.0", VersionClassification::Preview),
                ("1.28.0", VersionClassification::Expired),
            ]
        );
    }

    #[test]
    fn test_shoot_create_constraints() {
        let offered = vec![
            classified("1.28.9", VersionClassification::Expired),
            classified("1.29.3", VersionClassification::Supported),
            classified("1.30.0", VersionClassification::Preview),
        ];
        assert!(check_shoot_create(&offered, "1.29.3", now()).is_ok());
        assert!(check_shoot_create(&offered, "1.30.0", now()).is_ok());
        assert!(check_shoot_create(&offered, "1.29", now()).is_ok());
        assert_eq!(
            check_shoot_create(&offered, "1.28.9", now()),
            Err(VersionViolation::Expired("1.28.9".into()))
        );
        assert_eq!(
            check_shoot_create(&offered, "1.31.0", now()),
            Err(VersionViolation::NotOffered("1.31.0".into()))
        );
    }

    #[test]
    fn test_shoot_update_constraints() {
        let offered = vec![
            classified("1.27.0", VersionClassification::Supported),
            classified("1.28.9", VersionClassification::Expired),
            classified("1.29.3", VersionClassification::Supported),
            classified("1.30.0", VersionClassification::Supported),
        ];
        assert!(check_shoot_update(&offered, "1.28.9", "1.28.9", now()).is_ok());
        assert!(check_shoot_update(&offered, "1.28.9", "1.29.3", now()).is_ok());
        assert!(matches!(
            check_shoot_update(&offered, "1.29.3", "1.27.0", now()),
            Err(VersionViolation::Downgrade { .. })
        ));
        assert!(matches!(
            check_shoot_update(&offered, "1.28.9", "1.30.0", now()),
            Err(VersionViolation::SkipsMinor { .. })
        ));
        assert!(matches!(
            check_shoot_update(&offered, "1.27.0", "1.28.9", now()),
            Err(VersionViolation::Expired(_))
        ));
    }

    #[test]
    fn test_shoot_update_unparseable_old_and_major() {
        let offered = vec![
            classified("1.30.0", VersionClassification::Supported),
            classified("2.0.0", VersionClassification::Supported),
        ];
        assert_eq!(
            check_shoot_update(&offered, "latest", "1.30.0", now()),
            Err(VersionViolation::Unparseable("latest".into()))
        );
        assert_eq!(
            check_shoot_update(&offered, "1.30.0", "2.0.0", now()),
            Err(VersionViolation::MajorUpdate {
                from: "1.30.0".into(),
                to: "2.0.0".into()
            })
        );
    }
}
