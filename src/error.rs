//! Error types for the Gardener API crate
//!
//! Provides structured error types for API object handling, version policy,
//! maintenance planning, validation, documentation tooling and the admission
//! webhook.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Unsupported kind: {group}/{kind}")]
    UnsupportedKind { group: String, kind: String },

    #[error("CRD {name} did not become established within {timeout:?}")]
    CrdNotEstablished { name: String, timeout: Duration },

    // =========================================================================
    // Version Errors
    // =========================================================================
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Version {version} not offered by cloud profile {profile}")]
    VersionNotOffered { version: String, profile: String },

    #[error("No qualifying version to update {current} to: {reason}")]
    NoQualifyingVersion { current: String, reason: String },

    // =========================================================================
    // Maintenance Errors
    // =========================================================================
    #[error("Invalid maintenance time window: {0}")]
    InvalidTimeWindow(String),

    #[error("Maintenance failed for {shoot}: {reason}")]
    MaintenanceFailed { shoot: String, reason: String },

    // =========================================================================
    // Lifecycle Errors
    // =========================================================================
    #[error("Unknown operation annotation: {0}")]
    UnknownOperation(String),

    #[error("Credentials rotation {rotation} cannot {action} in phase {phase}")]
    RotationTransition {
        rotation: String,
        action: String,
        phase: String,
    },

    #[error("Operation {operation} forbidden: {reason}")]
    OperationForbidden { operation: String, reason: String },

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation failed: {0}")]
    Validation(#[from] crate::validation::ErrorList),

    // =========================================================================
    // Documentation Errors
    // =========================================================================
    #[error("Documentation lint found {count} problem(s)")]
    DocsLint { count: usize },

    #[error("Invalid glob pattern: {0}")]
    GlobPattern(#[from] glob::PatternError),

    // =========================================================================
    // Webhook Errors
    // =========================================================================
    #[error("Admission review malformed: {0}")]
    AdmissionReview(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Action to take on error when processing an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Requeue with exponential backoff
    RequeueWithBackoff,
    /// Requeue after specific duration
    RequeueAfter(Duration),
    /// Don't requeue, wait for changes
    NoRequeue,
}

impl Error {
    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // Transient errors - retry with backoff
            Error::Kube(_) | Error::Io(_) | Error::Server(_) => ErrorAction::RequeueWithBackoff,

            // CRD registration is eventually consistent
            Error::CrdNotEstablished { .. } => ErrorAction::RequeueAfter(Duration::from_secs(10)),

            // Cloud profile may be updated by an operator
            Error::NoQualifyingVersion { .. } | Error::MaintenanceFailed { .. } => {
                ErrorAction::RequeueAfter(Duration::from_secs(3600))
            }

            // User input errors - don't retry automatically
            Error::Configuration(_)
            | Error::InvalidVersion(_)
            | Error::VersionNotOffered { .. }
            | Error::InvalidTimeWindow(_)
            | Error::UnknownOperation(_)
            | Error::RotationTransition { .. }
            | Error::OperationForbidden { .. }
            | Error::Validation(_)
            | Error::UnsupportedKind { .. }
            | Error::AdmissionReview(_)
            | Error::JsonParse(_)
            | Error::YamlParse(_)
            | Error::GlobPattern(_)
            | Error::DocsLint { .. } => ErrorAction::NoRequeue,

            // All other errors - retry with backoff
            _ => ErrorAction::RequeueWithBackoff,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), ErrorAction::NoRequeue)
    }

    /// Check if this error is transient
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Kube(_) | Error::Io(_) | Error::Server(_))
    }
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_actions() {
        let err = Error::NoQualifyingVersion {
            current: "1.27.3".into(),
            reason: "no newer minor".into(),
        };
        assert_eq!(
            err.action(),
            ErrorAction::RequeueAfter(Duration::from_secs(3600))
        );

        let err = Error::Configuration("bad config".into());
        assert_eq!(err.action(), ErrorAction::NoRequeue);

        let err = Error::CrdNotEstablished {
            name: "shoots.core.gardener.cloud".into(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(
            err.action(),
            ErrorAction::RequeueAfter(Duration::from_secs(10))
        );
    }

    #[test]
    fn test_error_retryable() {
        let transient = Error::Server("connection reset".into());
        assert!(transient.is_retryable());
        assert!(transient.is_transient());

        let invalid = Error::InvalidVersion("1.x".into());
        assert!(!invalid.is_retryable());
        assert!(!invalid.is_transient());
    }
}
