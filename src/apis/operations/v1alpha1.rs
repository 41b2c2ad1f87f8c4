//! `operations.gardener.cloud/v1alpha1`
//!
//! Bastion hosts give temporary SSH access to the worker nodes of a Shoot.
//! The client keeps the bastion alive by refreshing the heartbeat annotation;
//! once the expiration timestamp passes it is garbage collected.

use chrono::{DateTime, Duration, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::apis::common::{Condition, LocalObjectReference};

/// Value of the operation annotation that refreshes the bastion heartbeat
pub const OPERATION_KEEPALIVE: &str = "keepalive";

/// Lifetime extension granted by each heartbeat
pub const HEARTBEAT_TIMEOUT_SECS: i64 = 3600;

// =============================================================================
// CRD
// =============================================================================

/// Bastion holds details about an SSH bastion for a shoot cluster.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "operations.gardener.cloud",
    version = "v1alpha1",
    kind = "Bastion",
    plural = "bastions",
    namespaced,
    status = "BastionStatus",
    derive = "Default",
    printcolumn = r#"{"name": "Shoot", "type": "string", "jsonPath": ".spec.shootRef.name"}"#,
    printcolumn = r#"{"name": "Expires", "type": "date", "jsonPath": ".status.expirationTimestamp"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BastionSpec {
    /// Target shoot, must be in the same namespace. This field is immutable.
    pub shoot_ref: LocalObjectReference,

    /// Name of the seed the shoot is scheduled to. This field is immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_name: Option<String>,

    /// Provider type of the shoot. This field is immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,

    /// Public key of the user's SSH keypair. This field is immutable.
    #[serde(rename = "sshPublicKey")]
    pub ssh_public_key: String,

    /// Source ranges allowed to reach the bastion. This field is immutable.
    pub ingress: Vec<BastionIngressPolicy>,
}

// =============================================================================
// Sub-Types
// =============================================================================

/// Ingress rule of a bastion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BastionIngressPolicy {
    #[serde(rename = "ipBlock")]
    pub ip_block: IpBlock,
}

/// A CIDR range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IpBlock {
    pub cidr: String,
}

// =============================================================================
// Status
// =============================================================================

/// Observed status of a Bastion
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BastionStatus {
    /// Endpoint the user connects to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress: Option<LoadBalancerIngress>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Time of the last heartbeat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub last_heartbeat_timestamp: Option<DateTime<Utc>>,

    /// Time after which the bastion is deleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub expiration_timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// Load balancer endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerIngress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

/// Condition types reported on bastions
pub mod condition_types {
    pub const READY: &str = "BastionReady";
}

// =============================================================================
// Helpers
// =============================================================================

impl Bastion {
    /// Whether the bastion has outlived its expiration timestamp
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.expiration_timestamp)
            .is_some_and(|expires| expires <= now)
    }

    /// Record a heartbeat and push the expiration timestamp forward
    pub fn record_heartbeat(&mut self, now: DateTime<Utc>) {
        let status = self.status.get_or_insert_with(Default::default);
        status.last_heartbeat_timestamp = Some(now);
        status.expiration_timestamp = Some(now + Duration::seconds(HEARTBEAT_TIMEOUT_SECS));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_heartbeat_extends_expiration() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut bastion = Bastion::new("b", BastionSpec::default());
        assert!(!bastion.is_expired(now));

        bastion.record_heartbeat(now);
        assert!(!bastion.is_expired(now + Duration::minutes(59)));
        assert!(bastion.is_expired(now + Duration::hours(1)));
    }

    #[test]
    fn test_wire_format() {
        let bastion: Bastion = serde_json::from_value(serde_json::json!({
            "apiVersion": "operations.gardener.cloud/v1alpha1",
            "kind": "Bastion",
            "metadata": {"name": "cli-abc", "namespace": "garden-dev"},
            "spec": {
                "shootRef": {"name": "my-shoot"},
                "sshPublicKey": "c3NoLXJzYSBB",
                "ingress": [{"ipBlock": {"cidr": "1.2.3.4/32"}}]
            }
        }))
        .unwrap();
        assert_eq!(bastion.spec.ingress[0].ip_block.cidr, "1.2.3.4/32");
    }
}
