//! Configuration file
//!
//! All sections are optional; missing values fall back to their defaults.
//!
//! ```yaml
//! webhook:
//!   bindAddress: 0.0.0.0:9443
//!   cloudProfiles: [profiles/aws.yaml]
//! versioning:
//!   minMinorDeprecationDays: 120
//!   minPatchDeprecationDays: 14
//! maintenance:
//!   ignoreWindow: false
//! docs:
//!   output: docs/api-reference.md
//!   lintPattern: docs/**/*.md
//! ```

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::{Error, Result};
use crate::versioning::PolicyChecker;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub webhook: WebhookConfig,
    pub versioning: VersioningConfig,
    pub maintenance: MaintenanceConfig,
    pub docs: DocsConfig,
    pub install: InstallConfig,
}

impl Config {
    /// Read a YAML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&raw)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Read the file if one is given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

/// Admission webhook server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WebhookConfig {
    /// Listen address
    pub bind_address: String,
    /// CloudProfile manifests loaded into the profile cache on startup
    pub cloud_profiles: Vec<PathBuf>,
    /// Largest accepted AdmissionReview body
    pub max_body_bytes: usize,
    /// Time given to in-flight requests on shutdown
    pub shutdown_grace_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9443".into(),
            cloud_profiles: Vec::new(),
            max_body_bytes: 3 * 1024 * 1024,
            shutdown_grace_secs: 10,
        }
    }
}

impl WebhookConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address
            .parse()
            .map_err(|e| Error::Configuration(format!("Invalid webhook bind address {}: {}", self.bind_address, e)))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Version policy applied to CloudProfiles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VersioningConfig {
    pub min_minor_deprecation_days: i64,
    pub min_patch_deprecation_days: i64,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            min_minor_deprecation_days: 120,
            min_patch_deprecation_days: 14,
        }
    }
}

impl VersioningConfig {
    pub fn checker(&self) -> PolicyChecker {
        PolicyChecker::new(self.min_minor_deprecation_days, self.min_patch_deprecation_days)
    }
}

/// Maintenance planning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaintenanceConfig {
    /// Plan updates even outside the maintenance time window
    pub ignore_window: bool,
    /// Print the plan without writing the updated Shoot
    pub dry_run: bool,
}

/// API reference generation and lint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocsConfig {
    pub output: PathBuf,
    pub lint_pattern: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("docs/api-reference.md"),
            lint_pattern: "docs/**/*.md".into(),
        }
    }
}

/// CRD installation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstallConfig {
    /// Field manager of the server-side apply
    pub field_manager: String,
    /// How long to wait for each CRD to become established
    pub establish_timeout_secs: u64,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            field_manager: "gardener-api".into(),
            establish_timeout_secs: 60,
        }
    }
}

impl InstallConfig {
    pub fn establish_timeout(&self) -> Duration {
        Duration::from_secs(self.establish_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.webhook.socket_addr().unwrap().port(), 9443);
        assert_eq!(config.versioning.min_minor_deprecation_days, 120);
        assert!(!config.maintenance.ignore_window);
        assert_eq!(config.install.establish_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "webhook:\n  bindAddress: 127.0.0.1:8443\nversioning:\n  minPatchDeprecationDays: 7\n"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.webhook.bind_address, "127.0.0.1:8443");
        assert_eq!(config.webhook.shutdown_grace_secs, 10);
        assert_eq!(config.versioning.min_minor_deprecation_days, 120);
        assert_eq!(config.versioning.checker().min_patch_deprecation, chrono::Duration::days(7));
        assert_eq!(config.docs.lint_pattern, "docs/**/*.md");
    }

    #[test]
    fn test_invalid_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "webhook: [not, a, map]").unwrap();
        assert_matches!(Config::from_file(file.path()), Err(Error::YamlParse(_)));

        let config = WebhookConfig {
            bind_address: "nowhere".into(),
            ..Default::default()
        };
        assert_matches!(config.socket_addr(), Err(Error::Configuration(_)));
    }
}
