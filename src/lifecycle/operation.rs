//! The `gardener.cloud/operation` annotation

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Operation requested through the `gardener.cloud/operation` annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationAnnotation {
    Reconcile,
    Retry,
    Maintain,
    Restore,
    Migrate,
    RenewKubeconfig,
    RotateCredentialsStart,
    RotateCredentialsComplete,
    RotateCaStart,
    RotateCaComplete,
    RotateServiceAccountKeyStart,
    RotateServiceAccountKeyComplete,
    RotateEtcdEncryptionKeyStart,
    RotateEtcdEncryptionKeyComplete,
    RotateObservabilityCredentials,
    RotateSshKeypair,
}

impl OperationAnnotation {
    pub const ALL: [OperationAnnotation; 16] = [
        OperationAnnotation::Reconcile,
        OperationAnnotation::Retry,
        OperationAnnotation::Maintain,
        OperationAnnotation::Restore,
        OperationAnnotation::Migrate,
        OperationAnnotation::RenewKubeconfig,
        OperationAnnotation::RotateCredentialsStart,
        OperationAnnotation::RotateCredentialsComplete,
        OperationAnnotation::RotateCaStart,
        OperationAnnotation::RotateCaComplete,
        OperationAnnotation::RotateServiceAccountKeyStart,
        OperationAnnotation::RotateServiceAccountKeyComplete,
        OperationAnnotation::RotateEtcdEncryptionKeyStart,
        OperationAnnotation::RotateEtcdEncryptionKeyComplete,
        OperationAnnotation::RotateObservabilityCredentials,
        OperationAnnotation::RotateSshKeypair,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationAnnotation::Reconcile => "reconcile",
            OperationAnnotation::Retry => "retry",
            OperationAnnotation::Maintain => "maintain",
            OperationAnnotation::Restore => "restore",
            OperationAnnotation::Migrate => "migrate",
            OperationAnnotation::RenewKubeconfig => "renew-kubeconfig",
            OperationAnnotation::RotateCredentialsStart => "rotate-credentials-start",
            OperationAnnotation::RotateCredentialsComplete => "rotate-credentials-complete",
            OperationAnnotation::RotateCaStart => "rotate-ca-start",
            OperationAnnotation::RotateCaComplete => "rotate-ca-complete",
            OperationAnnotation::RotateServiceAccountKeyStart => "rotate-serviceaccount-key-start",
            OperationAnnotation::RotateServiceAccountKeyComplete => {
                "rotate-serviceaccount-key-complete"
            }
            OperationAnnotation::RotateEtcdEncryptionKeyStart => "rotate-etcd-encryption-key-start",
            OperationAnnotation::RotateEtcdEncryptionKeyComplete => {
                "rotate-etcd-encryption-key-complete"
            }
            OperationAnnotation::RotateObservabilityCredentials => {
                "rotate-observability-credentials"
            }
            OperationAnnotation::RotateSshKeypair => "rotate-ssh-keypair",
        }
    }

    /// Whether the operation acts on a credentials rotation
    pub fn is_rotation(&self) -> bool {
        self.as_str().starts_with("rotate-")
    }

    /// Whether the operation completes a two-phase credentials rotation
    pub fn is_rotation_completion(&self) -> bool {
        self.is_rotation() && self.as_str().ends_with("-complete")
    }
}

impl FromStr for OperationAnnotation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| Error::UnknownOperation(s.to_string()))
    }
}

impl fmt::Display for OperationAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
