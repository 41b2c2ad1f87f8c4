//! Maintenance planning for Shoots
//!
//! During its maintenance window (or when annotated with
//! `gardener.cloud/operation=maintain`) a Shoot gets:
//!
//! - a patch update of its Kubernetes version, if auto-update is enabled
//! - a forced update when its Kubernetes version has expired
//! - machine image updates per worker pool, scoped by the image's update
//!   strategy, and forced updates of expired images

use chrono::{DateTime, Utc};
use kube::ResourceExt;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::apis::core::v1beta1::{
    CloudProfile, LastMaintenance, MaintenanceAutoUpdate, MaintenanceState, Shoot, ShootStatus,
    VersionClassification, Worker,
};
use crate::error::{Error, Result};
use crate::lifecycle::{clear_operation, operation_of, OperationAnnotation};
use crate::maintenance::TimeWindow;
use crate::versioning::{
    auto_update_target, classification_of, force_update_image_target, force_update_target,
    UpdateScope, Version,
};

const DEFAULT_ARCHITECTURE: &str = "amd64";

// =============================================================================
// Plan
// =============================================================================

/// Why a version changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateReason {
    /// Automatic update to a newer supported version
    AutoUpdate,
    /// The current version expired
    ForceUpdate,
}

impl fmt::Display for UpdateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateReason::AutoUpdate => write!(f, "automatic update"),
            UpdateReason::ForceUpdate => write!(f, "current version expired"),
        }
    }
}

/// A version change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionUpdate {
    pub from: String,
    pub to: String,
    pub reason: UpdateReason,
}

/// A machine image change of one worker pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerImageUpdate {
    pub worker: String,
    pub image: String,
    #[serde(flatten)]
    pub update: VersionUpdate,
}

/// What maintenance would change on a Shoot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenancePlan {
    /// Whether the Shoot is due for maintenance (in its window or explicitly requested)
    pub due: bool,
    /// Whether maintenance was requested through the operation annotation
    pub requested: bool,
    pub kubernetes: Option<VersionUpdate>,
    pub machine_images: Vec<WorkerImageUpdate>,
    /// Updates that were required but could not be planned
    pub failures: Vec<String>,
}

impl MaintenancePlan {
    /// Whether the plan changes nothing and reports nothing
    pub fn is_empty(&self) -> bool {
        self.kubernetes.is_none() && self.machine_images.is_empty() && self.failures.is_empty()
    }

    /// Human readable summary of the changes
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(k) = &self.kubernetes {
            parts.push(format!(
                "Control Plane: Updated Kubernetes version from \"{}\" to \"{}\". Reason: {}",
                k.from, k.to, k.reason
            ));
        }
        for w in &self.machine_images {
            parts.push(format!(
                "Worker pool \"{}\": Updated machine image \"{}\" from \"{}\" to \"{}\". Reason: {}",
                w.worker, w.image, w.update.from, w.update.to, w.update.reason
            ));
        }
        if parts.is_empty() {
            "All maintenance operations were skipped".to_string()
        } else {
            parts.join(", ")
        }
    }

    /// Fail when some required update could not be planned
    pub fn ensure_succeeded(&self, shoot: &str) -> Result<()> {
        if self.failures.is_empty() {
            return Ok(());
        }
        Err(Error::MaintenanceFailed {
            shoot: shoot.to_string(),
            reason: self.failures.join("; "),
        })
    }
}

// =============================================================================
// Planner
// =============================================================================

/// Plans and applies Shoot maintenance
#[derive(Debug, Clone, Copy)]
pub struct MaintenancePlanner {
    now: DateTime<Utc>,
    ignore_window: bool,
}

impl MaintenancePlanner {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            ignore_window: false,
        }
    }

    /// Treat every Shoot as due, as if it carried the maintain annotation
    pub fn ignore_window(mut self, ignore: bool) -> Self {
        self.ignore_window = ignore;
        self
    }

    /// Maintenance window of a Shoot, falling back to the default window
    pub fn window_of(shoot: &Shoot) -> Result<TimeWindow> {
        match shoot
            .spec
            .maintenance
            .as_ref()
            .and_then(|m| m.time_window.as_ref())
        {
            Some(window) => TimeWindow::from_api(window),
            None => {
                let uid = shoot.uid().unwrap_or_else(|| shoot.name_any());
                Ok(TimeWindow::default_for(&uid))
            }
        }
    }

    /// Compute what maintenance would change.
    ///
    /// A Shoot that is not due gets an empty plan.
    pub fn plan(&self, shoot: &Shoot, profile: &CloudProfile) -> Result<MaintenancePlan> {
        let requested = operation_of(shoot).ok().flatten() == Some(OperationAnnotation::Maintain);
        let window = Self::window_of(shoot)?;
        let due = requested || self.ignore_window || window.contains(self.now);

        let mut plan = MaintenancePlan {
            due,
            requested,
            ..Default::default()
        };
        if !due {
            debug!(shoot = %shoot.name_any(), %window, "Outside maintenance window");
            return Ok(plan);
        }

        let auto_update = shoot
            .spec
            .maintenance
            .as_ref()
            .and_then(|m| m.auto_update.clone())
            .unwrap_or_default();

        match self.plan_kubernetes(shoot, profile, &auto_update) {
            Ok(update) => plan.kubernetes = update,
            Err(e) => plan.failures.push(format!("Control Plane: {}", e)),
        }

        for worker in &shoot.spec.provider.workers {
            match self.plan_worker(worker, profile, &auto_update) {
                Ok(Some(update)) => plan.machine_images.push(update),
                Ok(None) => {}
                Err(e) => plan
                    .failures
                    .push(format!("Worker pool \"{}\": {}", worker.name, e)),
            }
        }

        Ok(plan)
    }

    fn plan_kubernetes(
        &self,
        shoot: &Shoot,
        profile: &CloudProfile,
        auto_update: &MaintenanceAutoUpdate,
    ) -> Result<Option<VersionUpdate>> {
        let versions = profile.kubernetes_versions();
        let current = Version::parse(&shoot.spec.kubernetes.version)?;

        let expired = classification_of(versions, &current, self.now)
            .map_or(true, |c| c == VersionClassification::Expired);
        if expired {
            let target = force_update_target(versions, &current, self.now)?;
            return Ok(Some(VersionUpdate {
                from: current.to_string(),
                to: target.to_string(),
                reason: UpdateReason::ForceUpdate,
            }));
        }

        if !auto_update.kubernetes_version {
            return Ok(None);
        }
        Ok(auto_update_target(versions, &current, UpdateScope::Patch, self.now).map(|target| {
            VersionUpdate {
                from: current.to_string(),
                to: target.to_string(),
                reason: UpdateReason::AutoUpdate,
            }
        }))
    }

    fn plan_worker(
        &self,
        worker: &Worker,
        profile: &CloudProfile,
        auto_update: &MaintenanceAutoUpdate,
    ) -> Result<Option<WorkerImageUpdate>> {
        let Some(image) = &worker.machine.image else {
            return Ok(None);
        };
        let Some(version) = &image.version else {
            return Ok(None);
        };
        let offered = profile.machine_image(&image.name).ok_or_else(|| Error::VersionNotOffered {
            version: format!("{}@{}", image.name, version),
            profile: profile.name_any(),
        })?;

        let architecture = worker
            .machine
            .architecture
            .as_deref()
            .unwrap_or(DEFAULT_ARCHITECTURE);
        let versions: Vec<_> = offered
            .versions
            .iter()
            .filter(|v| {
                if v.architectures.is_empty() {
                    architecture == DEFAULT_ARCHITECTURE
                } else {
                    v.architectures.iter().any(|a| a == architecture)
                }
            })
            .map(|v| v.expirable.clone())
            .collect();
        let scope = UpdateScope::from(offered.update_strategy.unwrap_or_default());
        let current = Version::parse(version)?;

        let expired = classification_of(&versions, &current, self.now)
            .map_or(true, |c| c == VersionClassification::Expired);
        let update = if expired {
            let target = force_update_image_target(&versions, &current, scope, self.now)?;
            Some((target, UpdateReason::ForceUpdate))
        } else if auto_update.machine_image_version.unwrap_or(true) {
            auto_update_target(&versions, &current, scope, self.now)
                .map(|target| (target, UpdateReason::AutoUpdate))
        } else {
            None
        };

        Ok(update.map(|(target, reason)| WorkerImageUpdate {
            worker: worker.name.clone(),
            image: image.name.clone(),
            update: VersionUpdate {
                from: version.clone(),
                to: target.to_string(),
                reason,
            },
        }))
    }

    /// Apply a plan to the Shoot and record the outcome in `status.lastMaintenance`.
    ///
    /// Returns whether the Shoot was changed.
    pub fn apply(&self, shoot: &mut Shoot, plan: &MaintenancePlan) -> bool {
        if !plan.due {
            return false;
        }
        let name = shoot.name_any();
        if plan.requested {
            clear_operation(shoot);
        }
        // A requested run is recorded even when it changes nothing
        if plan.is_empty() && !plan.requested {
            return false;
        }

        if let Some(update) = &plan.kubernetes {
            info!(shoot = %name, from = %update.from, to = %update.to, reason = ?update.reason, "Updating Kubernetes version");
            shoot.spec.kubernetes.version = update.to.clone();
        }
        for update in &plan.machine_images {
            let image = shoot
                .spec
                .provider
                .workers
                .iter_mut()
                .find(|w| w.name == update.worker)
                .and_then(|w| w.machine.image.as_mut());
            if let Some(image) = image {
                info!(shoot = %name, worker = %update.worker, from = %update.update.from, to = %update.update.to, "Updating machine image version");
                image.version = Some(update.update.to.clone());
            }
        }

        let (state, failure_reason) = if plan.failures.is_empty() {
            (MaintenanceState::Succeeded, None)
        } else {
            warn!(shoot = %name, failures = ?plan.failures, "Maintenance incomplete");
            (MaintenanceState::Failed, Some(plan.failures.join("; ")))
        };
        shoot
            .status
            .get_or_insert_with(ShootStatus::default)
            .last_maintenance = Some(LastMaintenance {
            description: plan.describe(),
            triggered_time: self.now,
            state,
            failure_reason,
        });
        true
    }
}
