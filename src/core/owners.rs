//! Owner disambiguation
//!
//! Most resources have a single owner. A handful of kinds are routinely
//! owned by two resources at once (an infrastructure machine owned by both
//! its Machine and the KubeadmControlPlane, for instance); for those kinds a
//! static table says which owner is the real parent.

use lazy_static::lazy_static;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::core::error::{Result, TreeError};
use crate::core::models::{OwnerRef, ResourceNode};

/// Which owner wins for a multi-owner kind, and which owners may sit next to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRule {
    pub expected: &'static str,
    pub redundant: &'static [&'static str],
}

impl OwnerRule {
    /// The full set of owner kinds this rule accepts
    pub fn accepted_kinds(&self) -> BTreeSet<&'static str> {
        let mut kinds: BTreeSet<&'static str> = self.redundant.iter().copied().collect();
        kinds.insert(self.expected);
        kinds
    }
}

lazy_static! {
    static ref OWNER_RULES: HashMap<&'static str, OwnerRule> = {
        let machine_rule = OwnerRule {
            expected: "Machine",
            redundant: &["KubeadmControlPlane"],
        };
        let mut rules = HashMap::new();
        rules.insert("AzureMachine", machine_rule.clone());
        rules.insert("DockerMachine", machine_rule.clone());
        rules.insert("KubeadmConfig", machine_rule);
        rules.insert(
            "ClusterResourceSetBinding",
            OwnerRule {
                expected: "ClusterResourceSet",
                redundant: &["Cluster"],
            },
        );
        rules
    };
}

/// Disambiguation rule for a kind, if there is one
pub fn owner_rule(kind: &str) -> Option<&'static OwnerRule> {
    OWNER_RULES.get(kind)
}

/// Reduce a node's owners to the id of its effective parent.
///
/// Callers only invoke this for nodes that have at least one owner; a node
/// with none yields `None`.
pub fn resolve_parent(node: &ResourceNode) -> Result<Option<String>> {
    let owners = node.owners();
    match owners {
        [] => Ok(None),
        [only] => Ok(Some(only.id.clone())),
        _ => resolve_multiple(node, owners).map(Some),
    }
}

fn resolve_multiple(node: &ResourceNode, owners: &[OwnerRef]) -> Result<String> {
    if let Some(rule) = owner_rule(&node.kind) {
        let present: BTreeSet<&str> = owners.iter().map(|o| o.kind.as_str()).collect();
        if present == rule.accepted_kinds() {
            let mut expected = owners.iter().filter(|o| o.kind == rule.expected);
            if let (Some(parent), None) = (expected.next(), expected.next()) {
                debug!(
                    key = %node.key,
                    parent = %parent,
                    "resolved multiple owners"
                );
                return Ok(parent.id.clone());
            }
        }
    }

    warn!(
        key = %node.key,
        owners = ?owners.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "cannot resolve multiple owners"
    );
    Err(TreeError::AmbiguousOwnership {
        kind: node.kind.clone(),
        name: node.name.clone(),
        owners: owners.iter().map(ToString::to_string).collect(),
    })
}
