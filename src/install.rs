//! Installing the CustomResourceDefinitions into a cluster
//!
//! CRDs are applied with server-side apply. Transient API failures are
//! retried with exponential backoff, then every CRD is awaited until the API
//! server reports it `Established`.

use backoff::ExponentialBackoff;
use futures::future::try_join_all;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::wait::{await_condition, conditions};
use kube::{Client, ResourceExt};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::apis::all_crds;
use crate::config::InstallConfig;
use crate::error::{Error, Result};

/// Render CRDs as a multi-document YAML stream
pub fn render_crds_yaml(crds: &[CustomResourceDefinition]) -> Result<String> {
    let mut out = String::new();
    for crd in crds {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(crd)?);
    }
    Ok(out)
}

/// Whether an API call is worth retrying
pub fn is_transient_kube_error(error: &kube::Error) -> bool {
    match error {
        kube::Error::Api(response) => response.code == 429 || response.code >= 500,
        kube::Error::HyperError(_) | kube::Error::Service(_) => true,
        _ => false,
    }
}

pub struct CrdInstaller {
    api: Api<CustomResourceDefinition>,
    config: InstallConfig,
    max_retry: Duration,
}

impl CrdInstaller {
    pub fn new(client: Client, config: InstallConfig) -> Self {
        Self {
            api: Api::all(client),
            config,
            max_retry: Duration::from_secs(60),
        }
    }

    /// Apply every CRD of this crate and wait until all are established
    pub async fn install_all(&self) -> Result<Vec<String>> {
        let crds = all_crds()?;
        let mut names = Vec::with_capacity(crds.len());
        for crd in &crds {
            self.apply(crd).await?;
            names.push(crd.name_any());
        }
        try_join_all(names.iter().map(|name| self.await_established(name))).await?;
        info!(count = names.len(), "Installed CRDs");
        Ok(names)
    }

    /// Server-side apply one CRD
    pub async fn apply(&self, crd: &CustomResourceDefinition) -> Result<()> {
        let name = crd.name_any();
        let params = PatchParams::apply(&self.config.field_manager).force();
        let policy = ExponentialBackoff {
            max_elapsed_time: Some(self.max_retry),
            ..Default::default()
        };

        backoff::future::retry(policy, || async {
            self.api
                .patch(&name, &params, &Patch::Apply(crd))
                .await
                .map_err(|e| {
                    if is_transient_kube_error(&e) {
                        warn!(crd = %name, error = %e, "Applying CRD failed, retrying");
                        backoff::Error::transient(Error::Kube(e))
                    } else {
                        backoff::Error::permanent(Error::Kube(e))
                    }
                })
        })
        .await?;

        debug!(crd = %name, "Applied CRD");
        Ok(())
    }

    /// Wait until the CRD is established or the configured timeout passes
    pub async fn await_established(&self, name: &str) -> Result<()> {
        let timeout = self.config.establish_timeout();
        let established = await_condition(self.api.clone(), name, conditions::is_crd_established());
        match tokio::time::timeout(timeout, established).await {
            Ok(Ok(_)) => {
                debug!(crd = name, "CRD established");
                Ok(())
            }
            Ok(Err(e)) => Err(Error::Internal(format!("Watching CRD {}: {}", name, e))),
            Err(_) => Err(Error::CrdNotEstablished {
                name: name.to_string(),
                timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: "boom".into(),
            reason: "InternalError".into(),
            code,
        })
    }

    #[test]
    fn test_transient_errors() {
        assert!(is_transient_kube_error(&api_error(500)));
        assert!(is_transient_kube_error(&api_error(429)));
        assert!(!is_transient_kube_error(&api_error(422)));
        assert!(!is_transient_kube_error(&api_error(403)));
    }

    #[test]
    fn test_render_crds_yaml() {
        let crds = all_crds().unwrap();
        let yaml = render_crds_yaml(&crds).unwrap();
        assert_eq!(yaml.matches("---\n").count(), crds.len());
        assert!(yaml.contains("name: shoots.core.gardener.cloud"));

        let docs: Vec<CustomResourceDefinition> = serde_yaml::Deserializer::from_str(&yaml)
            .map(|doc| serde::Deserialize::deserialize(doc).unwrap())
            .collect();
        assert_eq!(docs.len(), crds.len());
    }
}
