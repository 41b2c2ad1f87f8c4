//! Gardener API
//!
//! Typed Gardener API objects for kube-rs, together with the behavior their
//! field documentation describes: defaults, validation, version
//! classification and maintenance updates.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                            gardener-api CLI                                 │
//! │   crds │ install │ default │ validate │ classify │ maintain │ docs │ serve  │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────────┐  │
//! │  │    Admission    │  │   CRD Install   │  │     API Reference Docs      │  │
//! │  │    Webhook      │  │  (server-side   │  │   (generator + anchor lint) │  │
//! │  │    (axum)       │  │    apply)       │  │                             │  │
//! │  └────────┬────────┘  └────────┬────────┘  └─────────────┬───────────────┘  │
//! │           └────────────────────┼─────────────────────────┘                  │
//! ├────────────────────────────────┼────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌────────────┴──┐  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ Validation  │  │  Defaulting   │  │ Maintenance  │  │   Versioning    │  │
//! │  └─────────────┘  └───────────────┘  └──────────────┘  └─────────────────┘  │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │              API types (8 group/versions) │ conditions │ lifecycle          │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`apis`]: typed CustomResources and the CRD registry
//! - [`conditions`]: condition bookkeeping on status objects
//! - [`lifecycle`]: generations, operation annotations, credentials rotation
//! - [`versioning`]: version classification and update selection
//! - [`maintenance`]: maintenance windows and update planning
//! - [`defaulting`]: documented defaults
//! - [`validation`]: create and update validation
//! - [`docs`]: API reference generation and lint
//! - [`webhook`]: validating admission server
//! - [`install`]: CRD installation
//! - [`config`]: configuration file
//! - [`metrics`]: Prometheus metrics
//! - [`error`]: error types and handling

pub mod apis;
pub mod conditions;
pub mod config;
pub mod defaulting;
pub mod docs;
pub mod error;
pub mod install;
pub mod lifecycle;
pub mod maintenance;
pub mod metrics;
pub mod validation;
pub mod versioning;
pub mod webhook;

// Re-export commonly used types
pub use apis::{all_crds, ApiKind};

pub use conditions::{get_condition, set_condition, ConditionBuilder, HasConditions};

pub use config::Config;

pub use defaulting::{default_object, Defaulter, DefaultingContext};

pub use docs::{lint_reference, ReferenceGenerator};

pub use error::{Error, ErrorAction, Result};

pub use lifecycle::{needs_reconcile, OperationAnnotation};

pub use maintenance::{MaintenancePlan, MaintenancePlanner, TimeWindow};

pub use validation::{validate_object, ErrorList, FieldError, FieldPath, Validate, ValidationContext};

pub use versioning::{PolicyChecker, UpdateScope, Version};

pub use webhook::WebhookServer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
