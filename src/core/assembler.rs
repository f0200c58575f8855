//! Tree assembly
//!
//! Turns the flat, settled node list into the rooted tree. Direct children
//! of the cluster are moved under one of three synthetic grouping nodes
//! according to their category; everything else keeps its owner as parent.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::core::error::{Result, TreeError};
use crate::core::models::{Category, ResourceNode, TreeNode};

/// Synthetic grouping nodes in the order they are attached to the root
pub const BUCKETS: [(Category, &str); 3] = [
    (Category::ClusterInfra, "ClusterInfrastructure"),
    (Category::ControlPlane, "ControlPlane"),
    (Category::Workers, "Workers"),
];

/// Flat entry of the assembly arena
struct Slot {
    node: TreeNode,
    parent: Option<String>,
}

impl Slot {
    fn from_resource(resource: ResourceNode) -> Self {
        Slot {
            parent: resource.parent_id,
            node: TreeNode {
                id: resource.id,
                name: resource.name,
                kind: resource.kind,
                group: resource.group,
                provider: resource.provider,
                category: resource.category,
                collapsable: false,
                children: Vec::new(),
            },
        }
    }

    fn bucket(category: Category, kind: &str, root_id: &str) -> Option<Self> {
        let id = category.bucket_id()?;
        Some(Slot {
            parent: Some(root_id.to_string()),
            node: TreeNode {
                id: id.to_string(),
                name: String::new(),
                kind: kind.to_string(),
                group: String::new(),
                provider: String::new(),
                category: Some(category),
                collapsable: true,
                children: Vec::new(),
            },
        })
    }
}

/// Id of the single node without a parent
fn find_root(nodes: &[ResourceNode]) -> Result<String> {
    let roots: Vec<&ResourceNode> = nodes.iter().filter(|n| n.parent_id.is_none()).collect();
    match roots.as_slice() {
        [] => Err(TreeError::MissingRoot),
        [root] => Ok(root.id.clone()),
        many => Err(TreeError::MultipleRoots {
            ids: many.iter().map(|n| n.id.clone()).collect(),
        }),
    }
}

/// Re-parent the root's direct children onto their category buckets.
pub fn bucket_root_children(nodes: &mut [ResourceNode], root_id: &str) -> Result<usize> {
    let mut moved = 0;
    for node in nodes.iter_mut() {
        if node.parent_id.as_deref() != Some(root_id) {
            continue;
        }
        let category = node.category.ok_or_else(|| TreeError::Unsettled {
            key: node.key.clone(),
        })?;
        if let Some(bucket) = category.bucket_id() {
            node.parent_id = Some(bucket.to_string());
            moved += 1;
        }
    }
    Ok(moved)
}

/// Build the rooted tree from settled nodes.
pub fn assemble_tree(mut nodes: Vec<ResourceNode>) -> Result<TreeNode> {
    let root_id = find_root(&nodes)?;
    if let Some(node) = nodes.iter().find(|n| n.category.is_none()) {
        return Err(TreeError::Unsettled {
            key: node.key.clone(),
        });
    }
    let moved = bucket_root_children(&mut nodes, &root_id)?;

    let mut slots: Vec<Slot> = nodes.into_iter().map(Slot::from_resource).collect();
    slots.extend(
        BUCKETS
            .iter()
            .filter_map(|&(category, kind)| Slot::bucket(category, kind, &root_id)),
    );

    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(slots.len());
    for (i, slot) in slots.iter().enumerate() {
        if positions.insert(slot.node.id.as_str(), i).is_some() {
            return Err(TreeError::DuplicateId {
                id: slot.node.id.clone(),
            });
        }
    }

    // Children lists in snapshot order.
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); slots.len()];
    let mut root_idx = None;
    for (i, slot) in slots.iter().enumerate() {
        match slot.parent.as_deref() {
            None => root_idx = Some(i),
            Some(parent) => match positions.get(parent) {
                Some(&p) => children[p].push(i),
                None => {
                    return Err(TreeError::DanglingParent {
                        key: format!("{}/{}", slot.node.kind, slot.node.name),
                        parent_id: parent.to_string(),
                    })
                }
            },
        }
    }
    drop(positions);
    let root_idx = root_idx.ok_or(TreeError::MissingRoot)?;

    let total = slots.len();
    let mut arena: Vec<Option<TreeNode>> = slots.into_iter().map(|s| Some(s.node)).collect();
    let tree = build_subtree(root_idx, &children, &mut arena).ok_or(TreeError::MissingRoot)?;

    let dropped = arena.iter().flatten().count();
    if dropped > 0 {
        warn!(
            dropped,
            ids = ?arena.iter().flatten().map(|n| n.id.as_str()).collect::<Vec<_>>(),
            "nodes unreachable from the root were left out of the tree"
        );
    }
    debug!(nodes = total - dropped, moved, "tree assembled");
    Ok(tree)
}

/// Move the node at `idx` and its descendants out of the arena.
///
/// Post-order walk with an explicit stack; a node is finished once all of
/// its children are, so ownership chains of any depth are assembled without
/// recursion.
fn build_subtree(
    idx: usize,
    children: &[Vec<usize>],
    arena: &mut [Option<TreeNode>],
) -> Option<TreeNode> {
    let mut finished: Vec<Option<TreeNode>> = Vec::new();
    finished.resize_with(arena.len(), || None);

    let mut stack = vec![(idx, false)];
    while let Some((current, visited)) = stack.pop() {
        if visited {
            // Every slot has one parent, so it is reached at most once from the root.
            let Some(mut node) = arena[current].take() else {
                continue;
            };
            node.children = children[current]
                .iter()
                .filter_map(|&child| finished[child].take())
                .collect();
            finished[current] = Some(node);
        } else {
            stack.push((current, true));
            stack.extend(children[current].iter().rev().map(|&child| (child, false)));
        }
    }
    finished[idx].take()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settled(id: &str, kind: &str, parent: Option<&str>, category: Category) -> ResourceNode {
        let mut node = ResourceNode::new(id, kind, id.to_lowercase());
        node.parent_id = parent.map(str::to_string);
        node.category = Some(category);
        node
    }

    #[test]
    fn test_buckets_always_present() {
        let tree = assemble_tree(vec![settled("C", "Cluster", None, Category::Root)]).unwrap();
        assert_eq!(tree.id, "C");
        let ids: Vec<_> = tree.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["clusterInfra", "controlPlane", "workers"]);
        for bucket in &tree.children {
            assert!(bucket.collapsable);
            assert!(bucket.name.is_empty());
            assert!(bucket.provider.is_empty());
            assert!(bucket.children.is_empty());
        }
        assert_eq!(tree.child("workers").unwrap().kind, "Workers");
        assert_eq!(tree.child("clusterInfra").unwrap().kind, "ClusterInfrastructure");
    }

    #[test]
    fn test_root_children_move_to_buckets() {
        let tree = assemble_tree(vec![
            settled("C", "Cluster", None, Category::Root),
            settled("I", "DockerCluster", Some("C"), Category::ClusterInfra),
            settled("K", "KubeadmControlPlane", Some("C"), Category::ControlPlane),
            settled("MD", "MachineDeployment", Some("C"), Category::Workers),
            settled("MS", "MachineSet", Some("MD"), Category::Workers),
        ])
        .unwrap();

        assert_eq!(tree.child("clusterInfra").unwrap().children[0].id, "I");
        assert_eq!(tree.child("controlPlane").unwrap().children[0].id, "K");
        let workers = tree.child("workers").unwrap();
        assert_eq!(workers.children[0].id, "MD");
        assert_eq!(workers.children[0].children[0].id, "MS");
        assert_eq!(tree.node_count(), 8);
    }

    #[test]
    fn test_nested_nodes_keep_their_parent() {
        // A control-plane node below a worker stays where its owner is.
        let tree = assemble_tree(vec![
            settled("C", "Cluster", None, Category::Root),
            settled("MD", "MachineDeployment", Some("C"), Category::Workers),
            settled("X", "Thing", Some("MD"), Category::ControlPlane),
        ])
        .unwrap();
        assert_eq!(tree.find("MD").unwrap().children[0].id, "X");
        assert!(tree.child("controlPlane").unwrap().children.is_empty());
    }

    #[test]
    fn test_root_category_child_stays_on_root() {
        let tree = assemble_tree(vec![
            settled("C", "Cluster", None, Category::Root),
            settled("C2", "Cluster", Some("C"), Category::Root),
        ])
        .unwrap();
        let ids: Vec<_> = tree.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["C2", "clusterInfra", "controlPlane", "workers"]);
    }

    #[test]
    fn test_children_keep_snapshot_order() {
        let tree = assemble_tree(vec![
            settled("C", "Cluster", None, Category::Root),
            settled("MD", "MachineDeployment", Some("C"), Category::Workers),
            settled("Z", "Machine", Some("MD"), Category::Workers),
            settled("A", "Machine", Some("MD"), Category::Workers),
            settled("M", "Machine", Some("MD"), Category::Workers),
        ])
        .unwrap();
        let ids: Vec<_> = tree.find("MD").unwrap().children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["Z", "A", "M"]);
    }

    #[test]
    fn test_every_node_appears_once() {
        let nodes = vec![
            settled("C", "Cluster", None, Category::Root),
            settled("K", "KubeadmControlPlane", Some("C"), Category::ControlPlane),
            settled("M1", "Machine", Some("K"), Category::ControlPlane),
            settled("M2", "Machine", Some("K"), Category::ControlPlane),
            settled("D1", "DockerMachine", Some("M1"), Category::ControlPlane),
        ];
        let tree = assemble_tree(nodes).unwrap();
        let mut ids = tree.ids();
        ids.sort();
        let mut expected = vec!["C", "K", "M1", "M2", "D1", "clusterInfra", "controlPlane", "workers"];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_deep_ownership_chain() {
        const DEPTH: usize = 10_000;
        let mut nodes = vec![settled("C", "Cluster", None, Category::Root)];
        for i in 0..DEPTH {
            let parent = if i == 0 { "C".to_string() } else { format!("N{}", i - 1) };
            nodes.push(settled(&format!("N{i}"), "Machine", Some(parent.as_str()), Category::Workers));
        }

        let tree = assemble_tree(nodes).unwrap();
        assert_eq!(tree.node_count(), DEPTH + 4);
        let ids = tree.ids();
        assert_eq!(&ids[..3], &["C", "clusterInfra", "controlPlane"]);
        assert_eq!(ids[4], "N0");
        assert_eq!(ids[ids.len() - 1], format!("N{}", DEPTH - 1));

        let mut deepest = tree.child("workers").unwrap();
        let mut depth = 0;
        while let Some(next) = deepest.children.first() {
            deepest = next;
            depth += 1;
        }
        assert_eq!(depth, DEPTH);
        assert_eq!(deepest.id, format!("N{}", DEPTH - 1));
    }

    #[test]
    fn test_dangling_parent() {
        let err = assemble_tree(vec![
            settled("C", "Cluster", None, Category::Root),
            settled("M", "Machine", Some("gone"), Category::Workers),
        ])
        .unwrap_err();
        match err {
            TreeError::DanglingParent { key, parent_id } => {
                assert_eq!(key, "Machine/m");
                assert_eq!(parent_id, "gone");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_root_errors() {
        assert!(matches!(assemble_tree(vec![]), Err(TreeError::MissingRoot)));
        assert!(matches!(
            assemble_tree(vec![
                settled("A", "Cluster", None, Category::Root),
                settled("B", "Cluster", None, Category::Root),
            ]),
            Err(TreeError::MultipleRoots { .. })
        ));
    }

    #[test]
    fn test_duplicate_id() {
        assert!(matches!(
            assemble_tree(vec![
                settled("C", "Cluster", None, Category::Root),
                settled("X", "Machine", Some("C"), Category::Workers),
                settled("X", "Secret", Some("C"), Category::Workers),
            ]),
            Err(TreeError::DuplicateId { .. })
        ));
    }

    #[test]
    fn test_synthetic_id_collision() {
        assert!(matches!(
            assemble_tree(vec![
                settled("C", "Cluster", None, Category::Root),
                settled("workers", "Machine", Some("C"), Category::Workers),
            ]),
            Err(TreeError::DuplicateId { .. })
        ));
    }

    #[test]
    fn test_unsettled() {
        let mut node = settled("M", "Machine", Some("C"), Category::Workers);
        node.category = None;
        assert!(matches!(
            assemble_tree(vec![settled("C", "Cluster", None, Category::Root), node]),
            Err(TreeError::Unsettled { .. })
        ));
    }

    #[test]
    fn test_parent_cycle_is_dropped() {
        let tree = assemble_tree(vec![
            settled("C", "Cluster", None, Category::Root),
            settled("A", "Thing", Some("B"), Category::Workers),
            settled("B", "Thing", Some("A"), Category::Workers),
        ])
        .unwrap();
        assert!(tree.find("A").is_none());
        assert_eq!(tree.node_count(), 4);
    }
}
