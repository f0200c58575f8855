//! Cross-reference linking
//!
//! Cluster API resources point at each other through `configRef`,
//! `infrastructureRef` and `controlPlaneRef` records buried in their specs.
//! The linker finds those records and stores, on the referenced node, a
//! back-pointer to the node that references it. It also seeds the categories
//! that are known before propagation starts.

use std::collections::HashMap;
use tracing::{debug, trace, warn};

use crate::core::error::{Result, TreeError};
use crate::core::locator::locate_reference;
use crate::core::models::{Category, RefField, ResourceNode, TreeConfig};

/// Index from `kind/name` key to position in the node list
pub fn key_index(nodes: &[ResourceNode]) -> Result<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        if index.insert(node.key.clone(), i).is_some() {
            return Err(TreeError::DuplicateKey {
                key: node.key.clone(),
            });
        }
    }
    Ok(index)
}

/// Pre-assign the categories that do not depend on references.
///
/// The control-plane label wins over the cluster kind.
pub fn seed_categories(nodes: &mut [ResourceNode], config: &TreeConfig) {
    for node in nodes.iter_mut() {
        if node.has_label(&config.control_plane_label) {
            node.settle(Category::ControlPlane);
        } else if node.is_cluster() {
            node.settle(Category::Root);
        } else {
            continue;
        }
        trace!(key = %node.key, category = ?node.category, "seeded category");
    }
}

/// Key of the object a reference record points at
fn reference_key(source: &ResourceNode, field: RefField, reference: &serde_json::Value) -> Result<String> {
    let kind = reference.get("kind").and_then(|v| v.as_str());
    let name = reference.get("name").and_then(|v| v.as_str());
    match (kind, name) {
        (Some(kind), Some(name)) => Ok(format!("{}/{}", kind, name)),
        _ => Err(TreeError::MalformedReference {
            source_key: source.key.clone(),
            field: field.as_str().to_string(),
        }),
    }
}

/// Seed categories, then record a back-pointer on every referenced node.
///
/// When two sources reference the same target, the one processed last
/// keeps the back-pointer.
pub fn link_references(nodes: &mut [ResourceNode], config: &TreeConfig) -> Result<()> {
    let index = key_index(nodes)?;
    seed_categories(nodes, config);

    for source_idx in 0..nodes.len() {
        for field in RefField::ALL {
            let target_key = {
                let source = &nodes[source_idx];
                match locate_reference(&source.payload, field.as_str()) {
                    Some(reference) => reference_key(source, field, reference)?,
                    None => continue,
                }
            };

            let target_idx = match index.get(&target_key) {
                Some(&idx) => idx,
                None => {
                    return Err(TreeError::DanglingReference {
                        source_key: nodes[source_idx].key.clone(),
                        field: field.as_str().to_string(),
                        target: target_key,
                    })
                }
            };

            let source_id = nodes[source_idx].id.clone();
            let target = &mut nodes[target_idx];
            // TODO: merge back-pointers from several sources instead of keeping the last one
            if let Some(previous) = target.ref_pointer.as_deref() {
                if previous != source_id {
                    warn!(
                        target = %target.key,
                        previous = %previous,
                        previous_field = ?target.ref_kind,
                        replacement = %source_id,
                        field = %field,
                        "back-pointer overwritten by a later reference"
                    );
                }
            }
            target.ref_pointer = Some(source_id);
            target.ref_kind = Some(field);
            debug!(
                source = %nodes[source_idx].key,
                field = %field,
                target = %target_key,
                "linked reference"
            );
        }
    }
    Ok(())
}
