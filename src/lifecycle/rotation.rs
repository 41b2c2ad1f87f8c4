//! Credentials rotation phases
//!
//! Two-phase rotations run `Preparing -> Prepared -> Completing -> Completed`.
//! The operation annotation drives the user-visible transitions (start and
//! complete); the reconciler reports the intermediate ones.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::apis::common::{
    CredentialsRotation, CredentialsRotationPhase, SinglePhaseRotation, TwoPhaseRotation,
};
use crate::apis::core::v1beta1::Shoot;
use crate::error::{Error, Result};
use crate::lifecycle::OperationAnnotation;

/// Rotations that introduce new credentials before revoking the old ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoPhaseKind {
    CertificateAuthorities,
    ServiceAccountKey,
    EtcdEncryptionKey,
}

impl TwoPhaseKind {
    pub const ALL: [TwoPhaseKind; 3] = [
        TwoPhaseKind::CertificateAuthorities,
        TwoPhaseKind::ServiceAccountKey,
        TwoPhaseKind::EtcdEncryptionKey,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TwoPhaseKind::CertificateAuthorities => "certificateAuthorities",
            TwoPhaseKind::ServiceAccountKey => "serviceAccountKey",
            TwoPhaseKind::EtcdEncryptionKey => "etcdEncryptionKey",
        }
    }

    fn slot<'a>(&self, rotation: &'a mut CredentialsRotation) -> &'a mut Option<TwoPhaseRotation> {
        match self {
            TwoPhaseKind::CertificateAuthorities => &mut rotation.certificate_authorities,
            TwoPhaseKind::ServiceAccountKey => &mut rotation.service_account_key,
            TwoPhaseKind::EtcdEncryptionKey => &mut rotation.etcd_encryption_key,
        }
    }

    fn get<'a>(&self, rotation: &'a CredentialsRotation) -> Option<&'a TwoPhaseRotation> {
        match self {
            TwoPhaseKind::CertificateAuthorities => rotation.certificate_authorities.as_ref(),
            TwoPhaseKind::ServiceAccountKey => rotation.service_account_key.as_ref(),
            TwoPhaseKind::EtcdEncryptionKey => rotation.etcd_encryption_key.as_ref(),
        }
    }
}

fn phase_name(rotation: Option<&TwoPhaseRotation>) -> String {
    rotation
        .map(|r| r.phase.to_string())
        .unwrap_or_else(|| "<none>".to_string())
}

fn transition_error(kind: TwoPhaseKind, action: &str, rotation: Option<&TwoPhaseRotation>) -> Error {
    Error::RotationTransition {
        rotation: kind.as_str().to_string(),
        action: action.to_string(),
        phase: phase_name(rotation),
    }
}

/// Whether a rotation may be started: none ran yet, or the last one completed
pub fn can_start(rotation: Option<&TwoPhaseRotation>) -> bool {
    rotation.map_or(true, |r| r.phase == CredentialsRotationPhase::Completed)
}

/// Whether a rotation may be completed
pub fn can_complete(rotation: Option<&TwoPhaseRotation>) -> bool {
    rotation.is_some_and(|r| r.phase == CredentialsRotationPhase::Prepared)
}

/// Enter `Preparing`
pub fn start(
    kind: TwoPhaseKind,
    rotation: &mut CredentialsRotation,
    now: DateTime<Utc>,
) -> Result<()> {
    let slot = kind.slot(rotation);
    if !can_start(slot.as_ref()) {
        return Err(transition_error(kind, "start", slot.as_ref()));
    }
    let previous_completion = slot.as_ref().and_then(|r| r.last_completion_time);
    *slot = Some(TwoPhaseRotation {
        phase: CredentialsRotationPhase::Preparing,
        last_completion_time: previous_completion,
        last_initiation_time: Some(now),
        last_initiation_finished_time: None,
        last_completion_triggered_time: None,
    });
    Ok(())
}

/// `Preparing -> Prepared`, reported once new credentials are distributed
pub fn mark_prepared(
    kind: TwoPhaseKind,
    rotation: &mut CredentialsRotation,
    now: DateTime<Utc>,
) -> Result<()> {
    advance(kind, rotation, CredentialsRotationPhase::Preparing, "finish preparation", |r| {
        r.phase = CredentialsRotationPhase::Prepared;
        r.last_initiation_finished_time = Some(now);
    })
}

/// `Prepared -> Completing`
pub fn complete(
    kind: TwoPhaseKind,
    rotation: &mut CredentialsRotation,
    now: DateTime<Utc>,
) -> Result<()> {
    advance(kind, rotation, CredentialsRotationPhase::Prepared, "complete", |r| {
        r.phase = CredentialsRotationPhase::Completing;
        r.last_completion_triggered_time = Some(now);
    })
}

/// `Completing -> Completed`, reported once the old credentials are revoked
pub fn mark_completed(
    kind: TwoPhaseKind,
    rotation: &mut CredentialsRotation,
    now: DateTime<Utc>,
) -> Result<()> {
    advance(kind, rotation, CredentialsRotationPhase::Completing, "finish completion", |r| {
        r.phase = CredentialsRotationPhase::Completed;
        r.last_completion_time = Some(now);
    })
}

fn advance(
    kind: TwoPhaseKind,
    rotation: &mut CredentialsRotation,
    from: CredentialsRotationPhase,
    action: &str,
    update: impl FnOnce(&mut TwoPhaseRotation),
) -> Result<()> {
    let slot = kind.slot(rotation);
    match slot.as_mut() {
        Some(r) if r.phase == from => {
            update(r);
            Ok(())
        }
        other => Err(transition_error(kind, action, other.as_deref())),
    }
}

/// Record the start of a single-phase rotation
pub fn start_single_phase(slot: &mut Option<SinglePhaseRotation>, now: DateTime<Utc>) {
    slot.get_or_insert_with(SinglePhaseRotation::default)
        .last_initiation_time = Some(now);
}

/// Record the completion of a single-phase rotation
pub fn complete_single_phase(slot: &mut Option<SinglePhaseRotation>, now: DateTime<Utc>) {
    slot.get_or_insert_with(SinglePhaseRotation::default)
        .last_completion_time = Some(now);
}

/// Apply a rotation operation annotation to a Shoot's status.
///
/// All involved rotations are checked before any is changed, so a rejected
/// `rotate-credentials-*` leaves the status untouched.
pub fn apply_rotation_operation(
    shoot: &mut Shoot,
    operation: OperationAnnotation,
    now: DateTime<Utc>,
) -> Result<()> {
    if !operation.is_rotation() {
        return Ok(());
    }
    // Completing only removes old credentials and may finish while hibernated
    if !operation.is_rotation_completion() && (shoot.is_hibernated() || shoot.is_hibernation_enabled()) {
        return Err(Error::OperationForbidden {
            operation: operation.to_string(),
            reason: "the Shoot is hibernated or about to be".to_string(),
        });
    }
    if operation == OperationAnnotation::RotateSshKeypair && shoot.is_workerless() {
        return Err(Error::OperationForbidden {
            operation: operation.to_string(),
            reason: "workerless Shoots have no SSH keypair".to_string(),
        });
    }

    let rotation = shoot.rotation_mut();
    let (kinds, starting): (&[TwoPhaseKind], bool) = match operation {
        OperationAnnotation::RotateCredentialsStart => (&TwoPhaseKind::ALL, true),
        OperationAnnotation::RotateCredentialsComplete => (&TwoPhaseKind::ALL, false),
        OperationAnnotation::RotateCaStart => (&[TwoPhaseKind::CertificateAuthorities], true),
        OperationAnnotation::RotateCaComplete => (&[TwoPhaseKind::CertificateAuthorities], false),
        OperationAnnotation::RotateServiceAccountKeyStart => {
            (&[TwoPhaseKind::ServiceAccountKey], true)
        }
        OperationAnnotation::RotateServiceAccountKeyComplete => {
            (&[TwoPhaseKind::ServiceAccountKey], false)
        }
        OperationAnnotation::RotateEtcdEncryptionKeyStart => {
            (&[TwoPhaseKind::EtcdEncryptionKey], true)
        }
        OperationAnnotation::RotateEtcdEncryptionKeyComplete => {
            (&[TwoPhaseKind::EtcdEncryptionKey], false)
        }
        OperationAnnotation::RotateObservabilityCredentials => {
            start_single_phase(&mut rotation.observability, now);
            return Ok(());
        }
        OperationAnnotation::RotateSshKeypair => {
            start_single_phase(&mut rotation.ssh_keypair, now);
            return Ok(());
        }
        _ => return Ok(()),
    };

    for kind in kinds {
        let current = kind.get(rotation);
        let allowed = if starting { can_start(current) } else { can_complete(current) };
        if !allowed {
            let action = if starting { "start" } else { "complete" };
            return Err(transition_error(*kind, action, current));
        }
    }

    for kind in kinds {
        if starting {
            start(*kind, rotation, now)?;
        } else {
            complete(*kind, rotation, now)?;
        }
    }

    // the ssh keypair and observability credentials are rotated along with the rest
    if operation == OperationAnnotation::RotateCredentialsStart {
        start_single_phase(&mut rotation.observability, now);
        if !shoot.is_workerless() {
            start_single_phase(&mut shoot.rotation_mut().ssh_keypair, now);
        }
    }

    debug!(shoot = %shoot.metadata.name.as_deref().unwrap_or_default(), %operation, "Applied rotation operation");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::core::v1beta1::{Hibernation, ShootSpec, ShootStatus, Worker};
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    fn shoot() -> Shoot {
        let mut shoot = Shoot::new("s", ShootSpec::default());
        shoot.spec.provider.workers.push(Worker {
            name: "pool".into(),
            ..Default::default()
        });
        shoot
    }

    #[test]
    fn test_two_phase_lifecycle() {
        let mut rotation = CredentialsRotation::default();
        let kind = TwoPhaseKind::CertificateAuthorities;

        start(kind, &mut rotation, now()).unwrap();
        assert_matches!(
            complete(kind, &mut rotation, now()),
            Err(Error::RotationTransition { .. })
        );
        mark_prepared(kind, &mut rotation, now()).unwrap();
        complete(kind, &mut rotation, now() + Duration::days(1)).unwrap();
        mark_completed(kind, &mut rotation, now() + Duration::days(1)).unwrap();

        let ca = rotation.certificate_authorities.as_ref().unwrap();
        assert_eq!(ca.phase, CredentialsRotationPhase::Completed);
        assert_eq!(ca.last_initiation_time, Some(now()));
        assert_eq!(ca.last_completion_time, Some(now() + Duration::days(1)));

        // a completed rotation may start again and keeps its last completion time
        start(kind, &mut rotation, now() + Duration::days(2)).unwrap();
        let ca = rotation.certificate_authorities.as_ref().unwrap();
        assert_eq!(ca.phase, CredentialsRotationPhase::Preparing);
        assert_eq!(ca.last_completion_time, Some(now() + Duration::days(1)));
    }

    #[test]
    fn test_start_all_is_atomic() {
        let mut shoot = shoot();
        start(TwoPhaseKind::ServiceAccountKey, shoot.rotation_mut(), now()).unwrap();

        let result = apply_rotation_operation(
            &mut shoot,
            OperationAnnotation::RotateCredentialsStart,
            now(),
        );
        assert_matches!(result, Err(Error::RotationTransition { rotation, .. }) if rotation == "serviceAccountKey");
        assert!(shoot.rotation_mut().certificate_authorities.is_none());
    }

    #[test]
    fn test_start_all_records_single_phase() {
        let mut shoot = shoot();
        apply_rotation_operation(&mut shoot, OperationAnnotation::RotateCredentialsStart, now())
            .unwrap();
        let rotation = shoot.rotation_mut();
        for kind in TwoPhaseKind::ALL {
            assert_eq!(kind.get(rotation).unwrap().phase, CredentialsRotationPhase::Preparing);
        }
        assert_eq!(rotation.ssh_keypair.as_ref().unwrap().last_initiation_time, Some(now()));
        assert!(rotation.observability.is_some());
    }

    #[test]
    fn test_hibernated_shoot_is_rejected() {
        let mut shoot = shoot();
        shoot.spec.hibernation = Some(Hibernation {
            enabled: Some(true),
            schedules: vec![],
        });
        assert_matches!(
            apply_rotation_operation(&mut shoot, OperationAnnotation::RotateCaStart, now()),
            Err(Error::OperationForbidden { .. })
        );

        let mut shoot = self::shoot();
        shoot.status = Some(ShootStatus {
            is_hibernated: true,
            ..Default::default()
        });
        assert_matches!(
            apply_rotation_operation(&mut shoot, OperationAnnotation::RotateSshKeypair, now()),
            Err(Error::OperationForbidden { .. })
        );
    }

    #[test]
    fn test_hibernated_shoot_may_complete() {
        let mut shoot = shoot();
        let kind = TwoPhaseKind::CertificateAuthorities;
        start(kind, shoot.rotation_mut(), now()).unwrap();
        mark_prepared(kind, shoot.rotation_mut(), now()).unwrap();
        shoot.spec.hibernation = Some(Hibernation {
            enabled: Some(true),
            schedules: vec![],
        });

        assert_matches!(
            apply_rotation_operation(&mut shoot, OperationAnnotation::RotateServiceAccountKeyStart, now()),
            Err(Error::OperationForbidden { .. })
        );
        apply_rotation_operation(&mut shoot, OperationAnnotation::RotateCaComplete, now()).unwrap();
        let ca = kind.get(shoot.rotation_mut()).unwrap();
        assert_eq!(ca.phase, CredentialsRotationPhase::Completing);
    }

    #[test]
    fn test_ssh_keypair_needs_workers() {
        let mut shoot = Shoot::new("s", ShootSpec::default());
        assert_matches!(
            apply_rotation_operation(&mut shoot, OperationAnnotation::RotateSshKeypair, now()),
            Err(Error::OperationForbidden { .. })
        );
    }
}
