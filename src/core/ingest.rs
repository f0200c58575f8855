//! Ingestion: raw resources to scoped, parented nodes
//!
//! Pulls every instance of every resource type out of a [`ResourceSource`],
//! keeps the ones that belong to the requested cluster and finalizes each
//! node's parent id.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, trace};

use crate::core::error::{Result, ResultExt, TreeError};
use crate::core::models::{OwnerRef, ResourceNode, TreeConfig, CLUSTER_KIND};
use crate::core::owners::resolve_parent;
use crate::core::source::{ResourceSource, ResourceType};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResource {
    kind: Option<String>,
    metadata: Option<RawMetadata>,
    #[serde(default)]
    spec: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetadata {
    uid: Option<String>,
    name: Option<String>,
    #[serde(default)]
    labels: Option<BTreeMap<String, String>>,
    #[serde(default)]
    owner_references: Option<Vec<OwnerRef>>,
}

/// The cluster a tree is built for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterIdentity {
    pub name: String,
    pub uid: String,
}

/// Convert one raw resource object into a node without a parent.
pub fn node_from_raw(raw: Value, resource_type: &ResourceType) -> Result<ResourceNode> {
    let plural = resource_type.plural.as_str();
    let raw: RawResource = serde_json::from_value(raw)
        .map_err(|e| TreeError::invalid_resource(plural, e.to_string()))?;

    let kind = raw
        .kind
        .ok_or_else(|| TreeError::invalid_resource(plural, "missing kind"))?;
    let metadata = raw
        .metadata
        .ok_or_else(|| TreeError::invalid_resource(plural, "missing metadata"))?;
    let name = metadata
        .name
        .ok_or_else(|| TreeError::invalid_resource(plural, "missing metadata.name"))?;
    let uid = metadata.uid.ok_or_else(|| {
        TreeError::invalid_resource(plural, format!("{kind}/{name}: missing metadata.uid"))
    })?;

    let mut node = ResourceNode::new(uid, kind, name)
        .with_group(resource_type.group.as_str(), plural)
        .with_payload(raw.spec);
    if let Some(labels) = metadata.labels {
        node = node.with_labels(labels);
    }
    node.owner_refs = metadata.owner_references;
    Ok(node)
}

/// Fetch every instance of every type the source knows about.
pub fn collect_nodes(source: &dyn ResourceSource) -> Result<Vec<ResourceNode>> {
    let mut nodes = Vec::new();
    for resource_type in source.resource_types()? {
        let instances = source
            .list_instances(&resource_type)
            .context(format!("listing {}", resource_type.plural))?;
        trace!(plural = %resource_type.plural, count = instances.len(), "listed instances");
        for raw in instances {
            nodes.push(node_from_raw(raw, &resource_type)?);
        }
    }
    Ok(nodes)
}

/// Look up the cluster by name among the `clusters` instances.
pub fn find_cluster(source: &dyn ResourceSource, name: &str) -> Result<ClusterIdentity> {
    let clusters_type = ResourceType::clusters();
    let mut matches = Vec::new();
    for raw in source.list_instances(&clusters_type)? {
        let node = node_from_raw(raw, &clusters_type)?;
        if node.name == name && node.kind == CLUSTER_KIND {
            matches.push(node.id);
        }
    }
    match matches.len() {
        0 => Err(TreeError::ClusterNotFound {
            name: name.to_string(),
        }),
        1 => Ok(ClusterIdentity {
            name: name.to_string(),
            uid: matches.remove(0),
        }),
        count => Err(TreeError::DuplicateCluster {
            name: name.to_string(),
            count,
        }),
    }
}

fn belongs_to(node: &ResourceNode, cluster: &ClusterIdentity, config: &TreeConfig) -> bool {
    node.label(&config.cluster_name_label) == Some(cluster.name.as_str())
        || node.owners().iter().any(|o| o.id == cluster.uid)
        || (config.scope_by_name_prefix && node.name.starts_with(&cluster.name))
        || node.is_resource_set()
}

/// Keep only the resources of one cluster.
///
/// ClusterResourceSets are not labelled per cluster; the cluster's
/// ClusterResourceSetBinding says which of them apply. Without a binding no
/// resource-set kinds are kept at all.
pub fn scope_to_cluster(
    nodes: Vec<ResourceNode>,
    cluster: &ClusterIdentity,
    config: &TreeConfig,
) -> Vec<ResourceNode> {
    let binding = nodes.iter().find(|n| {
        n.kind == "ClusterResourceSetBinding"
            && n
                .owners()
                .iter()
                .any(|o| o.kind == CLUSTER_KIND && o.name == cluster.name)
    });

    let bound = binding.map(|b| {
        let set_names: HashSet<String> = b
            .payload
            .get("bindings")
            .and_then(Value::as_array)
            .map(|bindings| {
                bindings
                    .iter()
                    .filter_map(|e| e.get("clusterResourceSetName").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        (b.name.clone(), set_names)
    });

    let total = nodes.len();
    let scoped: Vec<ResourceNode> = nodes
        .into_iter()
        .filter(|n| belongs_to(n, cluster, config))
        .filter(|n| {
            if !n.is_resource_set() {
                return true;
            }
            match &bound {
                Some((binding_name, set_names)) => match n.kind.as_str() {
                    "ClusterResourceSet" => set_names.contains(&n.name),
                    _ => &n.name == binding_name,
                },
                None => false,
            }
        })
        .collect();

    debug!(
        cluster = %cluster.name,
        kept = scoped.len(),
        dropped = total - scoped.len(),
        binding = bound.as_ref().map(|(name, _)| name.as_str()),
        "scoped resources to cluster"
    );
    scoped
}

/// Finalize parent ids: the cluster is the root, ownerless nodes hang off
/// the cluster, everything else goes through owner resolution.
pub fn assign_parents(nodes: &mut [ResourceNode], cluster_uid: &str) -> Result<()> {
    for node in nodes.iter_mut() {
        node.parent_id = if node.id == cluster_uid {
            None
        } else if node.owners().is_empty() {
            Some(cluster_uid.to_string())
        } else {
            resolve_parent(node)?
        };
    }
    Ok(())
}

/// Everything the tree phases need for one cluster.
pub fn ingest(
    source: &dyn ResourceSource,
    cluster_name: &str,
    config: &TreeConfig,
) -> Result<Vec<ResourceNode>> {
    let cluster = find_cluster(source, cluster_name)?;
    let nodes = collect_nodes(source)?;
    let mut nodes = scope_to_cluster(nodes, &cluster, config);
    assign_parents(&mut nodes, &cluster.uid)?;
    Ok(nodes)
}
