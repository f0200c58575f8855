//! Resource sources for capi-tree
//!
//! This module provides the ResourceSource trait, the seam where a live
//! cluster client would plug in, and SnapshotSource, which serves resources
//! from a JSON snapshot file.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::error::{Result, ResultExt, TreeError};

#[cfg(test)]
use mockall::automock;

/// API group and plural name of a custom resource type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceType {
    pub group: String,
    pub plural: String,
}

impl ResourceType {
    pub fn new(group: impl Into<String>, plural: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            plural: plural.into(),
        }
    }

    /// The Cluster API `clusters` type
    pub fn clusters() -> Self {
        Self::new("cluster.x-k8s.io", "clusters")
    }
}

/// Trait for fetching resource types and their instances
///
/// This trait allows for mocking in tests and alternative implementations
/// (e.g., a live API client, recorded snapshots).
#[cfg_attr(test, automock)]
pub trait ResourceSource {
    /// Every custom resource type known to the source, in a stable order
    fn resource_types(&self) -> Result<Vec<ResourceType>>;

    /// Raw instances of one type.
    ///
    /// A type with nothing deployed yields an empty list, not an error.
    fn list_instances(&self, resource_type: &ResourceType) -> Result<Vec<Value>>;
}

/// On-disk snapshot layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub resource_types: Vec<ResourceType>,
    /// Instances keyed by plural name
    #[serde(default)]
    pub resources: BTreeMap<String, Vec<Value>>,
}

/// Source backed by a [`Snapshot`]
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    snapshot: Snapshot,
}

impl SnapshotSource {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    /// Parse a snapshot from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        Ok(Self::new(snapshot))
    }

    /// Load a snapshot file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TreeError::SnapshotNotFound {
                path: path.to_path_buf(),
            });
        }
        let json = std::fs::read_to_string(path)
            .map_err(TreeError::from)
            .context(format!("reading {}", path.display()))?;
        Self::from_json(&json).context(format!("parsing {}", path.display()))
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

impl ResourceSource for SnapshotSource {
    fn resource_types(&self) -> Result<Vec<ResourceType>> {
        Ok(self.snapshot.resource_types.clone())
    }

    fn list_instances(&self, resource_type: &ResourceType) -> Result<Vec<Value>> {
        Ok(self
            .snapshot
            .resources
            .get(&resource_type.plural)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_json() -> String {
        json!({
            "resourceTypes": [
                {"group": "cluster.x-k8s.io", "plural": "clusters"},
                {"group": "cluster.x-k8s.io", "plural": "machines"},
            ],
            "resources": {
                "clusters": [{"kind": "Cluster", "metadata": {"name": "c", "uid": "u"}}],
            },
        })
        .to_string()
    }

    #[test]
    fn test_snapshot_types_in_order() {
        let source = SnapshotSource::from_json(&sample_json()).unwrap();
        let types = source.resource_types().unwrap();
        assert_eq!(types[0], ResourceType::clusters());
        assert_eq!(types[1].plural, "machines");
    }

    #[test]
    fn test_missing_type_is_empty() {
        let source = SnapshotSource::from_json(&sample_json()).unwrap();
        let machines = ResourceType::new("cluster.x-k8s.io", "machines");
        assert!(source.list_instances(&machines).unwrap().is_empty());
        assert_eq!(source.list_instances(&ResourceType::clusters()).unwrap().len(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, sample_json()).unwrap();
        let source = SnapshotSource::load(&path).unwrap();
        assert_eq!(source.snapshot().resource_types.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = SnapshotSource::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, TreeError::SnapshotNotFound { .. }));
    }

    #[test]
    fn test_load_unreadable_path() {
        // A directory exists but cannot be read as a file.
        let dir = TempDir::new().unwrap();
        let err = SnapshotSource::load(dir.path()).unwrap_err();
        assert!(matches!(err.root_cause(), TreeError::Io(_)));
        assert!(err
            .to_string()
            .starts_with(&format!("reading {}: ", dir.path().display())));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = SnapshotSource::load(&path).unwrap_err();
        assert!(matches!(err.root_cause(), TreeError::Json(_)));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_mock_source() {
        let mut mock = MockResourceSource::new();
        mock.expect_resource_types()
            .returning(|| Ok(vec![ResourceType::clusters()]));
        mock.expect_list_instances()
            .returning(|_| Ok(vec![json!({"kind": "Cluster"})]));
        assert_eq!(mock.resource_types().unwrap().len(), 1);
        assert_eq!(mock.list_instances(&ResourceType::clusters()).unwrap().len(), 1);
    }
}
