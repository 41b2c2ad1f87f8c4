//! Validating admission webhook
//!
//! Serves `POST /validate` for AdmissionReviews of every kind in
//! [`crate::apis::ApiKind`], plus `/healthz`, `/readyz`, `/metrics` and
//! `/crds`. TLS is expected to be terminated in front of the server.

pub mod admission;
pub mod profiles;
pub mod server;

pub use admission::{admit, router, WebhookState};
pub use profiles::ProfileCache;
pub use server::WebhookServer;
