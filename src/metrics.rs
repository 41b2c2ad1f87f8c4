//! Prometheus metrics of the admission webhook
//!
//! - `gardener_api_admission_requests_total{kind, operation, allowed}`
//! - `gardener_api_admission_duration_seconds{kind}`
//! - `gardener_api_cloud_profiles_cached`

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::time::Duration;

use crate::error::Result;

const NAMESPACE: &str = "gardener_api";

const DURATION_BUCKETS: &[f64] = &[0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0];

/// Metrics registry of one webhook server
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub admission_requests: IntCounterVec,
    pub admission_duration: HistogramVec,
    pub cloud_profiles_cached: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let admission_requests = IntCounterVec::new(
            Opts::new("admission_requests_total", "Admission requests handled")
                .namespace(NAMESPACE),
            &["kind", "operation", "allowed"],
        )?;
        let admission_duration = HistogramVec::new(
            HistogramOpts::new("admission_duration_seconds", "Time spent validating an admission request")
                .namespace(NAMESPACE)
                .buckets(DURATION_BUCKETS.to_vec()),
            &["kind"],
        )?;
        let cloud_profiles_cached = IntGauge::with_opts(
            Opts::new("cloud_profiles_cached", "CloudProfiles held in the webhook cache").namespace(NAMESPACE),
        )?;

        registry.register(Box::new(admission_requests.clone()))?;
        registry.register(Box::new(admission_duration.clone()))?;
        registry.register(Box::new(cloud_profiles_cached.clone()))?;

        Ok(Self {
            registry,
            admission_requests,
            admission_duration,
            cloud_profiles_cached,
        })
    }

    /// Record the outcome of one admission request
    pub fn observe_admission(&self, kind: &str, operation: &str, allowed: bool, elapsed: Duration) {
        self.admission_requests
            .with_label_values(&[kind, operation, if allowed { "true" } else { "false" }])
            .inc();
        self.admission_duration
            .with_label_values(&[kind])
            .observe(elapsed.as_secs_f64());
    }

    /// Text exposition format
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}
