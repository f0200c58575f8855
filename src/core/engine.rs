//! TreeEngine - runs the tree phases in order
//!
//! Linking, propagation and assembly each depend on the completed state of
//! the phase before, so the engine runs them strictly one after another over
//! a single owned node list.

use tracing::{debug, info_span};

use crate::core::assembler::assemble_tree;
use crate::core::categories::{propagate_categories, PropagationStats};
use crate::core::error::{Result, ResultExt};
use crate::core::ingest::ingest;
use crate::core::linker::link_references;
use crate::core::models::{ResourceNode, TreeConfig, TreeNode};
use crate::core::source::ResourceSource;

/// Builds cluster trees with one configuration
#[derive(Debug, Clone, Default)]
pub struct TreeEngine {
    config: TreeConfig,
}

impl TreeEngine {
    pub fn new(config: TreeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Link references and settle categories, returning the flat node list.
    pub fn settle(&self, mut nodes: Vec<ResourceNode>) -> Result<(Vec<ResourceNode>, PropagationStats)> {
        link_references(&mut nodes, &self.config).context("linking references")?;
        let stats = propagate_categories(&mut nodes).context("propagating categories")?;
        Ok((nodes, stats))
    }

    /// Run every phase over already ingested nodes.
    pub fn build(&self, nodes: Vec<ResourceNode>) -> Result<TreeNode> {
        let _span = info_span!("build_tree", nodes = nodes.len()).entered();
        let (nodes, stats) = self.settle(nodes)?;
        debug!(passes = stats.passes, "settled");
        assemble_tree(nodes).context("assembling tree")
    }

    /// Ingest one cluster from a source, then settle it.
    pub fn settle_cluster(
        &self,
        source: &dyn ResourceSource,
        cluster_name: &str,
    ) -> Result<Vec<ResourceNode>> {
        let _span = info_span!("settle_cluster", cluster = cluster_name).entered();
        let nodes = ingest(source, cluster_name, &self.config)?;
        let (nodes, _) = self.settle(nodes)?;
        Ok(nodes)
    }

    /// Ingest one cluster from a source and build its tree.
    pub fn build_cluster(&self, source: &dyn ResourceSource, cluster_name: &str) -> Result<TreeNode> {
        let _span = info_span!("build_cluster", cluster = cluster_name).entered();
        let nodes = ingest(source, cluster_name, &self.config)?;
        self.build(nodes)
    }
}
