//! Condition bookkeeping for status objects
//!
//! Conditions are upserted by type. `lastUpdateTime` moves on every update,
//! `lastTransitionTime` only when the status changes.

use chrono::{DateTime, Utc};

use crate::apis::common::{Condition, ConditionStatus, ErrorCode};
use crate::apis::core::v1beta1::{ControllerInstallationStatus, SeedStatus, ShootStatus};
use crate::apis::operations::v1alpha1::BastionStatus;
use crate::apis::operator::v1alpha1::GardenStatus;
use crate::apis::resources::v1alpha1::ManagedResourceStatus;
use crate::apis::seedmanagement::v1alpha1::{
    GardenletStatus, ManagedSeedSetStatus, ManagedSeedStatus,
};

// =============================================================================
// Free Functions
// =============================================================================

/// Find a condition by type
pub fn get_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Insert or update a condition.
///
/// The transition time of an existing condition is kept unless its status
/// changes.
pub fn set_condition(conditions: &mut Vec<Condition>, mut new: Condition, now: DateTime<Utc>) {
    new.last_update_time = now;
    match conditions.iter_mut().find(|c| c.type_ == new.type_) {
        Some(existing) => {
            new.last_transition_time = if existing.status == new.status {
                existing.last_transition_time
            } else {
                now
            };
            *existing = new;
        }
        None => {
            new.last_transition_time = now;
            conditions.push(new);
        }
    }
}

/// Remove a condition; returns whether one was present
pub fn remove_condition(conditions: &mut Vec<Condition>, type_: &str) -> bool {
    let before = conditions.len();
    conditions.retain(|c| c.type_ != type_);
    conditions.len() != before
}

/// Whether the condition exists with status `True`
pub fn is_true(conditions: &[Condition], type_: &str) -> bool {
    get_condition(conditions, type_).is_some_and(|c| c.status == ConditionStatus::True)
}

/// Whether every listed condition exists and is `True`
pub fn all_healthy(conditions: &[Condition], types: &[&str]) -> bool {
    types.iter().all(|t| is_true(conditions, t))
}

// =============================================================================
// Builder
// =============================================================================

/// Builds a condition, starting from an existing one when present
#[derive(Debug, Clone)]
pub struct ConditionBuilder {
    condition: Condition,
}

impl ConditionBuilder {
    /// Start a new `Unknown` condition of the given type
    pub fn new(type_: impl Into<String>) -> Self {
        let epoch = DateTime::<Utc>::default();
        Self {
            condition: Condition {
                type_: type_.into(),
                status: ConditionStatus::Unknown,
                last_transition_time: epoch,
                last_update_time: epoch,
                reason: "ConditionInitialized".to_string(),
                message: "The condition has been initialized but its semantic check has not been performed yet.".to_string(),
                codes: Vec::new(),
            },
        }
    }

    /// Start from the current state of a condition in the list, if any
    pub fn from_existing(conditions: &[Condition], type_: &str) -> Self {
        match get_condition(conditions, type_) {
            Some(existing) => Self {
                condition: existing.clone(),
            },
            None => Self::new(type_),
        }
    }

    pub fn status(mut self, status: ConditionStatus) -> Self {
        self.condition.status = status;
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.condition.reason = reason.into();
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.condition.message = message.into();
        self
    }

    pub fn codes(mut self, codes: Vec<ErrorCode>) -> Self {
        self.condition.codes = codes;
        self
    }

    pub fn build(self) -> Condition {
        self.condition
    }

    /// Upsert the built condition into the list
    pub fn apply(self, conditions: &mut Vec<Condition>, now: DateTime<Utc>) {
        set_condition(conditions, self.condition, now);
    }
}

// =============================================================================
// HasConditions
// =============================================================================

/// Status objects that carry a list of conditions
pub trait HasConditions {
    fn conditions(&self) -> &[Condition];

    fn conditions_mut(&mut self) -> &mut Vec<Condition>;

    fn condition(&self, type_: &str) -> Option<&Condition> {
        get_condition(self.conditions(), type_)
    }

    fn set_condition(&mut self, condition: Condition, now: DateTime<Utc>) {
        set_condition(self.conditions_mut(), condition, now);
    }

    fn is_condition_true(&self, type_: &str) -> bool {
        is_true(self.conditions(), type_)
    }
}

macro_rules! impl_has_conditions {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl HasConditions for $ty {
                fn conditions(&self) -> &[Condition] {
                    &self.conditions
                }

                fn conditions_mut(&mut self) -> &mut Vec<Condition> {
                    &mut self.conditions
                }
            }
        )+
    };
}

impl_has_conditions!(
    ShootStatus,
    SeedStatus,
    GardenStatus,
    ManagedSeedStatus,
    ManagedSeedSetStatus,
    GardenletStatus,
    ControllerInstallationStatus,
    ManagedResourceStatus,
    BastionStatus,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::core::v1beta1::shoot::condition_types;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_set_condition_tracks_transitions() {
        let mut conditions = Vec::new();
        let ready = ConditionBuilder::new("Ready").status(ConditionStatus::True);
        ready.clone().apply(&mut conditions, t0());
        assert_eq!(conditions[0].last_transition_time, t0());

        // same status: only the update time moves
        let later = t0() + Duration::minutes(5);
        ready.apply(&mut conditions, later);
        assert_eq!(conditions[0].last_transition_time, t0());
        assert_eq!(conditions[0].last_update_time, later);

        let latest = t0() + Duration::minutes(10);
        ConditionBuilder::from_existing(&conditions, "Ready")
            .status(ConditionStatus::False)
            .reason("Down")
            .apply(&mut conditions, latest);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].last_transition_time, latest);
        assert_eq!(conditions[0].reason, "Down");
    }

    #[test]
    fn test_all_healthy() {
        let mut status = ShootStatus::default();
        for t in condition_types::HEALTH {
            status.set_condition(
                ConditionBuilder::new(t).status(ConditionStatus::True).build(),
                t0(),
            );
        }
        assert!(all_healthy(status.conditions(), &condition_types::HEALTH));

        status.set_condition(
            ConditionBuilder::new(condition_types::EVERY_NODE_READY)
                .status(ConditionStatus::Progressing)
                .build(),
            t0(),
        );
        assert!(!all_healthy(status.conditions(), &condition_types::HEALTH));
        assert!(status.is_condition_true(condition_types::API_SERVER_AVAILABLE));
    }

    #[test]
    fn test_remove_condition() {
        let mut conditions = Vec::new();
        ConditionBuilder::new("A").apply(&mut conditions, t0());
        assert!(remove_condition(&mut conditions, "A"));
        assert!(!remove_condition(&mut conditions, "A"));
        assert!(get_condition(&conditions, "A").is_none());
    }
}
