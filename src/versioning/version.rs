//! Kubernetes and machine image version numbers
//!
//! Versions are `[v]MAJOR.MINOR[.PATCH]`. A version without patch is
//! *partial*; Shoots may request one and have it resolved against the cloud
//! profile.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A parsed version number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: Option<u64>,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch: Some(patch),
        }
    }

    /// Parse a version string
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidVersion(s.to_string());
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let number = |part: &str| -> Result<u64> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse::<u64>().map_err(|_| invalid())
        };

        let parts: Vec<&str> = trimmed.split('.').collect();
        let (major, minor, patch) = match parts.as_slice() {
            [major, minor] => (major, minor, None),
            [major, minor, patch] => (major, minor, Some(number(*patch)?)),
            _ => return Err(invalid()),
        };
        if major.len() > 1 && major.starts_with('0') {
            return Err(invalid());
        }
        Ok(Self {
            major: number(*major)?,
            minor: number(*minor)?,
            patch,
        })
    }

    /// Whether the version lacks a patch number
    pub fn is_partial(&self) -> bool {
        self.patch.is_none()
    }

    /// `(major, minor)` of the version
    pub fn minor_line(&self) -> (u64, u64) {
        (self.major, self.minor)
    }

    /// Whether `other` is in the same minor line
    pub fn same_minor(&self, other: &Version) -> bool {
        self.minor_line() == other.minor_line()
    }

    /// Whether a partial version matches a concrete one; concrete versions match only themselves
    pub fn matches(&self, concrete: &Version) -> bool {
        match self.patch {
            None => self.same_minor(concrete),
            Some(_) => self == concrete,
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.unwrap_or(0).cmp(&other.patch.unwrap_or(0)))
            .then(self.patch.is_some().cmp(&other.patch.is_some()))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.patch {
            Some(patch) => write!(f, "{}.{}.{}", self.major, self.minor, patch),
            None => write!(f, "{}.{}", self.major, self.minor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse() {
        assert_eq!(Version::parse("1.29.3").unwrap(), Version::new(1, 29, 3));
        assert_eq!(Version::parse("v1.30.0").unwrap(), Version::new(1, 30, 0));
        let partial = Version::parse("1.30").unwrap();
        assert!(partial.is_partial());
        assert_eq!(partial.to_string(), "1.30");

        for bad in ["", "1", "1.a", "1.2.3.4", "01.2.3", "latest"] {
            assert_matches!(Version::parse(bad), Err(Error::InvalidVersion(_)), "{bad}");
        }
    }

    #[test]
    fn test_ordering_is_semantic() {
        let mut versions: Vec<Version> = ["1.9.0", "1.10.2", "1.10.10", "2.0.0", "1.10.3"]
            .iter()
            .map(|v| v.parse().unwrap())
            .collect();
        versions.sort();
        let sorted: Vec<String> = versions.iter().map(ToString::to_string).collect();
        assert_eq!(sorted, ["1.9.0", "1.10.2", "1.10.3", "1.10.10", "2.0.0"]);
    }

    #[test]
    fn test_partial_matches_minor_line() {
        let partial = Version::parse("1.30").unwrap();
        assert!(partial.matches(&Version::new(1, 30, 5)));
        assert!(!partial.matches(&Version::new(1, 31, 0)));
        assert!(!Version::new(1, 30, 4).matches(&Version::new(1, 30, 5)));
    }
}
