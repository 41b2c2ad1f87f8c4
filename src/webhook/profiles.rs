//! CloudProfiles known to the webhook
//!
//! Shoot validation needs the profile the Shoot references. Profiles are
//! loaded from manifests on startup and refreshed whenever a CloudProfile
//! passes admission.

use indexmap::IndexMap;
use kube::ResourceExt;
use parking_lot::RwLock;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::apis::core::v1beta1::CloudProfile;
use crate::error::Result;

#[derive(Debug, Default)]
pub struct ProfileCache {
    profiles: RwLock<IndexMap<String, Arc<CloudProfile>>>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a profile, keyed by name
    pub fn insert(&self, profile: CloudProfile) {
        let name = profile.name_any();
        debug!(profile = %name, "Caching cloud profile");
        self.profiles.write().insert(name, Arc::new(profile));
    }

    pub fn get(&self, name: &str) -> Option<Arc<CloudProfile>> {
        self.profiles.read().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Arc<CloudProfile>> {
        self.profiles.write().shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.profiles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.read().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.profiles.read().keys().cloned().collect()
    }

    /// Load every CloudProfile document of a YAML file, returns how many were loaded
    pub fn load_file(&self, path: &Path) -> Result<usize> {
        let raw = std::fs::read_to_string(path)?;
        let mut loaded = 0;
        for document in serde_yaml::Deserializer::from_str(&raw) {
            let value = serde_yaml::Value::deserialize(document)?;
            if value.is_null() {
                continue;
            }
            let profile: CloudProfile = serde_yaml::from_value(value)?;
            self.insert(profile);
            loaded += 1;
        }
        info!(path = %path.display(), loaded, "Loaded cloud profiles");
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PROFILES: &str = r#"
apiVersion: core.gardener.cloud/v1beta1
kind: CloudProfile
metadata:
  name: aws
spec:
  type: aws
  kubernetes:
    versions:
    - version: 1.30.2
  machineImages: []
  machineTypes: []
  regions: []
---
apiVersion: core.gardener.cloud/v1beta1
kind: CloudProfile
metadata:
  name: gcp
spec:
  type: gcp
  kubernetes:
    versions:
    - version: 1.29.5
  machineImages: []
  machineTypes: []
  regions: []
"#;

    #[test]
    fn test_load_multi_document_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PROFILES.as_bytes()).unwrap();

        let cache = ProfileCache::new();
        assert_eq!(cache.load_file(file.path()).unwrap(), 2);
        assert_eq!(cache.names(), vec!["aws", "gcp"]);
        assert_eq!(cache.get("aws").unwrap().kubernetes_versions()[0].version, "1.30.2");

        cache.remove("aws");
        assert!(cache.get("aws").is_none());
        assert_eq!(cache.len(), 1);
    }
}
