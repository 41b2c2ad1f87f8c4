//! Kubernetes and machine image version policy
//!
//! Versions offered by a CloudProfile move through the classifications
//! `preview`, `supported`, `deprecated` and `expired`:
//!
//! - preview versions are opt-in and never chosen automatically
//! - supported versions are recommended and are auto-update targets
//! - deprecated versions remain usable but are no auto-update targets
//! - expired versions cannot be used for new clusters; existing clusters are
//!   force-updated during their next maintenance
//!
//! # Modules
//!
//! - [`version`]: version numbers and ordering
//! - [`classification`]: effective classification at a point in time
//! - [`selection`]: auto-update, force-update and partial version resolution
//! - [`policy`]: cloud profile lint and Shoot version constraints

pub mod classification;
pub mod policy;
pub mod selection;
pub mod version;

pub use classification::{classification_of, classify_all, effective_classification, ClassifiedVersion};
pub use policy::{
    check_shoot_create, check_shoot_update, summarize, PolicyChecker, PolicyFinding, Severity,
    VersionViolation,
};
pub use selection::{
    auto_update_target, force_update_image_target, force_update_target, latest_supported,
    resolve_partial, UpdateScope,
};
pub use version::Version;
