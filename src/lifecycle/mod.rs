//! Object lifecycle bookkeeping
//!
//! - Generation tracking: whether an object needs another reconciliation
//! - [`OperationAnnotation`]: operations requested through annotations
//! - [`rotation`]: credentials rotation phase transitions

pub mod operation;
pub mod rotation;

pub use operation::OperationAnnotation;
pub use rotation::{apply_rotation_operation, TwoPhaseKind};

use kube::ResourceExt;

use crate::apis::common::{LastOperation, ANNOTATION_OPERATION};
use crate::error::Result;

/// Whether an object needs to be reconciled.
///
/// True when the spec changed since it was last observed, or when the last
/// operation did not succeed.
pub fn needs_reconcile(
    generation: Option<i64>,
    observed_generation: i64,
    last_operation: Option<&LastOperation>,
) -> bool {
    if generation.unwrap_or_default() > observed_generation {
        return true;
    }
    !last_operation.is_some_and(LastOperation::is_succeeded)
}

/// Parse the operation annotation of any object
pub fn operation_of<K: ResourceExt>(obj: &K) -> Result<Option<OperationAnnotation>> {
    obj.annotations()
        .get(ANNOTATION_OPERATION)
        .map(|value| value.parse::<OperationAnnotation>())
        .transpose()
}

/// Remove the operation annotation once it has been acted upon
pub fn clear_operation<K: ResourceExt>(obj: &mut K) -> Option<String> {
    obj.annotations_mut().remove(ANNOTATION_OPERATION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::common::{LastOperationState, LastOperationType};
    use crate::apis::core::v1beta1::{Shoot, ShootSpec};
    use chrono::Utc;

    fn last_op(state: LastOperationState) -> LastOperation {
        LastOperation {
            description: String::new(),
            last_update_time: Utc::now(),
            progress: 100,
            state,
            type_: LastOperationType::Reconcile,
        }
    }

    #[test]
    fn test_needs_reconcile() {
        let ok = last_op(LastOperationState::Succeeded);
        assert!(!needs_reconcile(Some(3), 3, Some(&ok)));
        assert!(needs_reconcile(Some(4), 3, Some(&ok)));
        assert!(needs_reconcile(Some(3), 3, None));
        assert!(needs_reconcile(Some(3), 3, Some(&last_op(LastOperationState::Error))));
    }

    #[test]
    fn test_operation_annotation_roundtrip() {
        let mut shoot = Shoot::new("s", ShootSpec::default());
        assert_eq!(operation_of(&shoot).unwrap(), None);

        shoot
            .annotations_mut()
            .insert(ANNOTATION_OPERATION.into(), "maintain".into());
        assert_eq!(operation_of(&shoot).unwrap(), Some(OperationAnnotation::Maintain));
        assert_eq!(clear_operation(&mut shoot).as_deref(), Some("maintain"));

        shoot
            .annotations_mut()
            .insert(ANNOTATION_OPERATION.into(), "bogus".into());
        assert!(operation_of(&shoot).is_err());
    }
}
