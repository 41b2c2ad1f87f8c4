//! Shoot maintenance
//!
//! - [`time_window`]: `HHMMSS+ZZZZ` windows and the default window
//! - [`planner`]: Kubernetes and machine image updates during maintenance

pub mod planner;
pub mod time_window;

pub use planner::{MaintenancePlan, MaintenancePlanner, UpdateReason, VersionUpdate, WorkerImageUpdate};
pub use time_window::{TimeOfDay, TimeWindow, MAX_WINDOW_SECS, MIN_WINDOW_SECS};
