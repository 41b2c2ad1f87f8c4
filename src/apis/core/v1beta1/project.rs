//! Project and Quota CRDs

use chrono::{DateTime, Utc};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::apis::common::{ObjectReference, Toleration, PROJECT_NAMESPACE_PREFIX};

/// Roles a project member may hold
pub const KNOWN_MEMBER_ROLES: [&str; 5] = ["owner", "admin", "viewer", "uam", "serviceaccountmanager"];

/// Prefix of extension roles, e.g. `extension:dns`
pub const EXTENSION_ROLE_PREFIX: &str = "extension:";

// =============================================================================
// Project CRD
// =============================================================================

/// Project holds certain properties about a Gardener project.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "core.gardener.cloud",
    version = "v1beta1",
    kind = "Project",
    plural = "projects",
    status = "ProjectStatus",
    derive = "Default",
    printcolumn = r#"{"name": "Namespace", "type": "string", "jsonPath": ".spec.namespace"}"#,
    printcolumn = r#"{"name": "Status", "type": "string", "jsonPath": ".status.phase"}"#,
    printcolumn = r#"{"name": "Owner", "type": "string", "jsonPath": ".spec.owner.name"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    /// Subject who originally created this project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Subject>,

    /// Human-readable description of what the project is used for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Owner of the project; also added as member with the `owner` role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Subject>,

    /// Human-readable explanation of the project's purpose
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    /// Members of the project
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<ProjectMember>,

    /// Namespace of the project, defaults to `garden-<name>`. This field is immutable once set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Default and whitelisted tolerations for shoots of this project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerations: Option<ProjectTolerations>,
}

/// RBAC subject
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// `User`, `Group` or `ServiceAccount`
    pub kind: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_group: Option<String>,
}

/// Member of a project
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    #[serde(flatten)]
    pub subject: Subject,

    /// Primary role of the member
    pub role: String,

    /// Additional roles of the member
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl ProjectMember {
    /// Primary and additional roles
    pub fn all_roles(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.role.as_str()).chain(self.roles.iter().map(String::as_str))
    }
}

/// Tolerations configured on project level
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTolerations {
    /// Tolerations added to every shoot of the project
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defaults: Vec<Toleration>,

    /// Tolerations shoots of the project may use
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub whitelist: Vec<Toleration>,
}

/// Phase of a project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ProjectPhase {
    #[default]
    Pending,
    Ready,
    Terminating,
    Failed,
}

/// Observed status of a project
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatus {
    #[serde(default)]
    pub observed_generation: i64,

    #[serde(default)]
    pub phase: ProjectPhase,

    /// Time since when the project is considered stale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub stale_since_timestamp: Option<DateTime<Utc>>,

    /// Time after which a stale project is deleted automatically
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub stale_auto_delete_timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub last_activity_timestamp: Option<DateTime<Utc>>,
}

impl Project {
    /// Namespace of the project, falling back to the `garden-<name>` convention
    pub fn namespace_name(&self) -> String {
        self.spec
            .namespace
            .clone()
            .unwrap_or_else(|| format!("{}{}", PROJECT_NAMESPACE_PREFIX, self.name_any()))
    }
}

// =============================================================================
// Quota CRD
// =============================================================================

/// Quota limits the resources consumed by shoots that reference it.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "core.gardener.cloud",
    version = "v1beta1",
    kind = "Quota",
    plural = "quotas",
    shortname = "squota",
    namespaced,
    derive = "Default",
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct QuotaSpec {
    /// Lifetime of a shoot in days; shoots are deleted after it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_lifetime_days: Option<i32>,

    /// Maximum resource quantities, e.g. `cpu: "200"`
    #[serde(default)]
    pub metrics: BTreeMap<String, String>,

    /// Scope of the quota, a project or a secret
    pub scope: ObjectReference,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_namespace_default() {
        let project = Project::new("dev", ProjectSpec::default());
        assert_eq!(project.namespace_name(), "garden-dev");

        let mut project = Project::new("dev", ProjectSpec::default());
        project.spec.namespace = Some("custom".into());
        assert_eq!(project.namespace_name(), "custom");
    }

    #[test]
    fn test_member_flattened_subject() {
        let member: ProjectMember = serde_json::from_value(serde_json::json!({
            "apiGroup": "rbac.authorization.k8s.io",
            "kind": "User",
            "name": "alice@example.com",
            "role": "admin",
            "roles": ["viewer", "extension:dns"]
        }))
        .unwrap();
        assert_eq!(member.subject.kind, "User");
        let roles: Vec<_> = member.all_roles().collect();
        assert_eq!(roles, vec!["admin", "viewer", "extension:dns"]);
    }
}
