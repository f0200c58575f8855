//! Category propagation
//!
//! Categories spread along back-pointers until nothing changes:
//!
//! - controlPlane is transitive: anything referenced by a control-plane
//!   resource, or referenced through a `controlPlaneRef`, is control plane.
//! - clusterInfra travels a single hop: only what the Cluster itself points
//!   at through `infrastructureRef`, plus the ClusterResourceSet kinds.
//! - Whatever is still unresolved at the end belongs to the workers.
//!
//! Categories are write-once, so every productive pass settles at least one
//! more node and the loop ends after at most `n + 1` passes.

use std::collections::HashMap;
use tracing::{debug, trace};

use crate::core::error::{Result, TreeError};
use crate::core::models::{Category, RefField, ResourceNode};

/// Outcome of a propagation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropagationStats {
    /// Full passes over the node list, the final unproductive one included
    pub passes: usize,
    /// Nodes settled by the propagation rules
    pub propagated: usize,
    /// Nodes that fell through to the workers default
    pub defaulted: usize,
}

/// What a referrer contributes to the node it references
#[derive(Clone, Copy)]
struct Referrer {
    category: Option<Category>,
    is_cluster: bool,
}

fn rule_for(node: &ResourceNode, referrer: Option<Referrer>) -> Option<Category> {
    match referrer {
        Some(referrer) => {
            if referrer.category == Some(Category::ControlPlane)
                || node.ref_kind == Some(RefField::ControlPlaneRef)
            {
                Some(Category::ControlPlane)
            } else if referrer.is_cluster && node.ref_kind == Some(RefField::InfrastructureRef) {
                Some(Category::ClusterInfra)
            } else {
                None
            }
        }
        None if node.is_resource_set() => Some(Category::ClusterInfra),
        None => None,
    }
}

/// Settle every node's category.
///
/// Running this again over already settled nodes changes nothing.
pub fn propagate_categories(nodes: &mut [ResourceNode]) -> Result<PropagationStats> {
    let positions: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    // Resolve back-pointers to positions once, so the loop below only deals
    // in indices.
    let mut referrers = Vec::with_capacity(nodes.len());
    for node in nodes.iter() {
        let referrer = match node.ref_pointer.as_deref() {
            Some(id) => match positions.get(id) {
                Some(&idx) => Some(idx),
                None => {
                    return Err(TreeError::DanglingReference {
                        source_key: id.to_string(),
                        field: node.ref_kind.map(|f| f.as_str()).unwrap_or("").to_string(),
                        target: node.key.clone(),
                    })
                }
            },
            None => None,
        };
        referrers.push(referrer);
    }
    drop(positions);

    let mut stats = PropagationStats::default();
    loop {
        stats.passes += 1;
        let mut changed = false;

        for i in 0..nodes.len() {
            if nodes[i].category.is_some() {
                continue;
            }
            let referrer = referrers[i].map(|r| Referrer {
                category: nodes[r].category,
                is_cluster: nodes[r].is_cluster(),
            });
            if let Some(category) = rule_for(&nodes[i], referrer) {
                nodes[i].settle(category);
                stats.propagated += 1;
                changed = true;
                trace!(key = %nodes[i].key, %category, pass = stats.passes, "settled category");
            }
        }

        if !changed {
            break;
        }
    }

    for node in nodes.iter_mut() {
        if node.settle(Category::Workers) {
            stats.defaulted += 1;
        }
    }

    debug!(
        passes = stats.passes,
        propagated = stats.propagated,
        defaulted = stats.defaulted,
        "categories settled"
    );
    Ok(stats)
}
