//! Core data models for capi-tree
//!
//! This module contains the resource node that flows through every phase,
//! the category labels it settles into, and the tree emitted at the end.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::core::error::{Result, ResultExt, TreeError};

/// Label marking a resource as part of the control plane
pub const CONTROL_PLANE_LABEL: &str = "cluster.x-k8s.io/control-plane";

/// Label naming the cluster a resource belongs to
pub const CLUSTER_NAME_LABEL: &str = "cluster.x-k8s.io/cluster-name";

/// Kind of the resource at the top of every tree
pub const CLUSTER_KIND: &str = "Cluster";

/// Kinds that belong to cluster infrastructure without being referenced
pub const RESOURCE_SET_KINDS: [&str; 2] = ["ClusterResourceSet", "ClusterResourceSetBinding"];

/// Grouping bucket of a resource in the visualization tree.
///
/// `Root` is the marker carried by the cluster itself; it is distinct from
/// "not settled yet", which is represented as `None` on [`ResourceNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    ControlPlane,
    ClusterInfra,
    Workers,
    Root,
}

impl Category {
    /// Id of the synthetic grouping node for this category
    pub fn bucket_id(&self) -> Option<&'static str> {
        match self {
            Category::ControlPlane => Some("controlPlane"),
            Category::ClusterInfra => Some("clusterInfra"),
            Category::Workers => Some("workers"),
            Category::Root => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ControlPlane => "controlPlane",
            Category::ClusterInfra => "clusterInfra",
            Category::Workers => "workers",
            Category::Root => "root",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference fields that link one resource to another, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefField {
    #[serde(rename = "configRef")]
    ConfigRef,
    #[serde(rename = "infrastructureRef")]
    InfrastructureRef,
    #[serde(rename = "controlPlaneRef")]
    ControlPlaneRef,
}

impl RefField {
    /// All fields in the order they are searched
    pub const ALL: [RefField; 3] = [
        RefField::ConfigRef,
        RefField::InfrastructureRef,
        RefField::ControlPlaneRef,
    ];

    /// Field name as it appears in resource payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            RefField::ConfigRef => "configRef",
            RefField::InfrastructureRef => "infrastructureRef",
            RefField::ControlPlaneRef => "controlPlaneRef",
        }
    }
}

impl fmt::Display for RefField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner pointer recorded in a resource's metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: String,
    pub name: String,
    #[serde(rename = "uid", alias = "id")]
    pub id: String,
}

impl OwnerRef {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.kind, self.name, self.id)
    }
}

/// One custom resource of the snapshot.
///
/// Ingestion fills in everything up to `parent_id`; the later phases write
/// `ref_pointer`/`ref_kind` and then `category`, strictly in that order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNode {
    pub id: String,
    pub name: String,
    pub kind: String,
    /// `kind/name`, unique per snapshot
    pub key: String,
    pub group: String,
    pub plural: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_refs: Option<Vec<OwnerRef>>,
    #[serde(skip)]
    pub payload: Value,
    pub parent_id: Option<String>,
    /// Id of the node whose payload references this one
    pub ref_pointer: Option<String>,
    pub ref_kind: Option<RefField>,
    pub category: Option<Category>,
}

impl ResourceNode {
    /// Create a node with no owners, labels, payload or parent
    pub fn new(id: impl Into<String>, kind: impl Into<String>, name: impl Into<String>) -> Self {
        let kind = kind.into();
        let name = name.into();
        Self {
            id: id.into(),
            key: format!("{}/{}", kind, name),
            name,
            kind,
            group: String::new(),
            plural: String::new(),
            provider: String::new(),
            labels: None,
            owner_refs: None,
            payload: Value::Null,
            parent_id: None,
            ref_pointer: None,
            ref_kind: None,
            category: None,
        }
    }

    /// Set the API group; the provider is derived from it
    pub fn with_group(mut self, group: impl Into<String>, plural: impl Into<String>) -> Self {
        self.group = group.into();
        self.plural = plural.into();
        self.provider = provider_of(&self.group).to_string();
        self
    }

    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_owners(mut self, owners: Vec<OwnerRef>) -> Self {
        self.owner_refs = Some(owners);
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Label value, if the node carries that label
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
    }

    pub fn has_label(&self, key: &str) -> bool {
        self.label(key).is_some()
    }

    /// Owner pointers, empty when the node has none
    pub fn owners(&self) -> &[OwnerRef] {
        self.owner_refs.as_deref().unwrap_or(&[])
    }

    pub fn is_cluster(&self) -> bool {
        self.kind == CLUSTER_KIND
    }

    pub fn is_resource_set(&self) -> bool {
        RESOURCE_SET_KINDS.contains(&self.kind.as_str())
    }

    /// Assign the category unless one is already set.
    ///
    /// Returns true when the category was written.
    pub fn settle(&mut self, category: Category) -> bool {
        if self.category.is_some() {
            return false;
        }
        self.category = Some(category);
        true
    }
}

/// Provider name of an API group: everything before the first dot.
///
/// Groups without a dot have no provider.
pub fn provider_of(group: &str) -> &str {
    match group.find('.') {
        Some(idx) => &group[..idx],
        None => "",
    }
}

/// A node of the rooted output tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub group: String,
    pub provider: String,
    pub category: Option<Category>,
    /// Synthetic grouping nodes can be folded by the display layer
    pub collapsable: bool,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Total number of nodes in this subtree, itself included
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Direct child with the given id
    pub fn child(&self, id: &str) -> Option<&TreeNode> {
        self.children.iter().find(|c| c.id == id)
    }

    /// Depth-first search for a node by id
    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.id == id {
                return Some(node);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Ids in depth-first pre-order
    pub fn ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node.id.as_str());
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

impl Drop for TreeNode {
    // Unlink descendants onto a work list so deep chains drop without recursion.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Configuration loaded from a JSON file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TreeConfig {
    /// Label that marks control-plane resources
    #[serde(default = "default_control_plane_label")]
    pub control_plane_label: String,
    /// Label naming the owning cluster, used when scoping a snapshot
    #[serde(default = "default_cluster_name_label")]
    pub cluster_name_label: String,
    /// Keep resources whose name starts with the cluster name
    #[serde(default = "default_true")]
    pub scope_by_name_prefix: bool,
}

fn default_control_plane_label() -> String {
    CONTROL_PLANE_LABEL.to_string()
}

fn default_cluster_name_label() -> String {
    CLUSTER_NAME_LABEL.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            control_plane_label: default_control_plane_label(),
            cluster_name_label: default_cluster_name_label(),
            scope_by_name_prefix: true,
        }
    }
}

impl TreeConfig {
    /// Parse a configuration from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let config: TreeConfig = serde_json::from_str(json)
            .map_err(|e| TreeError::invalid_config(e.to_string()))?;
        if config.control_plane_label.is_empty() {
            return Err(TreeError::invalid_config("controlPlaneLabel must not be empty"));
        }
        if config.cluster_name_label.is_empty() {
            return Err(TreeError::invalid_config("clusterNameLabel must not be empty"));
        }
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(TreeError::from)
            .context(format!("reading {}", path.display()))?;
        Self::from_json(&json)
    }
}
