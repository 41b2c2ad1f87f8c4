//! Webhook server lifecycle

use axum::extract::DefaultBodyLimit;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{VersioningConfig, WebhookConfig};
use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::webhook::admission::{router, WebhookState};
use crate::webhook::profiles::ProfileCache;

/// Validating admission webhook for the Gardener API groups
#[derive(Debug)]
pub struct WebhookServer {
    addr: SocketAddr,
    config: WebhookConfig,
    state: WebhookState,
}

impl WebhookServer {
    /// Create the server and preload the configured cloud profiles
    pub fn new(config: WebhookConfig, versioning: &VersioningConfig) -> Result<Self> {
        let addr = config.socket_addr()?;
        let profiles = Arc::new(ProfileCache::new());
        for path in &config.cloud_profiles {
            profiles.load_file(path)?;
        }

        let metrics = Metrics::new()?;
        metrics.cloud_profiles_cached.set(profiles.len() as i64);

        let state = WebhookState::new(profiles, metrics, versioning.checker());
        Ok(Self { addr, config, state })
    }

    pub fn state(&self) -> &WebhookState {
        &self.state
    }

    /// Serve until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| Error::Server(format!("Failed to bind webhook server to {}: {}", self.addr, e)))?;

        info!(
            addr = %self.addr,
            profiles = self.state.profiles.len(),
            "Webhook server listening"
        );
        self.state.set_ready(true);

        let state = self.state.clone();
        let grace = self.config.shutdown_grace();
        let signal = shutdown.clone();
        let app = router(self.state).layer(DefaultBodyLimit::max(self.config.max_body_bytes));
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            signal.cancelled().await;
            state.set_ready(false);
            info!("Webhook server shutting down");
        });

        tokio::select! {
            result = server => {
                result.map_err(|e| Error::Server(format!("Webhook server error: {}", e)))?;
            }
            _ = async {
                shutdown.cancelled().await;
                tokio::time::sleep(grace).await;
            } => {
                warn!(grace_secs = grace.as_secs(), "In-flight requests did not finish in time");
            }
        }

        info!("Webhook server stopped");
        Ok(())
    }
}
