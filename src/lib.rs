//! capi-tree - Cluster API resource tree builder
//!
//! This library turns a flat snapshot of Cluster API custom resources into a
//! single-rooted, categorized tree for visualization. It is designed to be
//! consumed by:
//! - The CLI binary (src/bin/capi-tree.rs)
//! - A display or HTTP layer that serializes [`TreeNode`] as JSON
//!
//! # Architecture
//!
//! This crate follows the "Library-First" pattern:
//! - **lib.rs** (this file): Pure logic, no CLI concerns
//! - **bin/capi-tree.rs**: Thin wrapper that calls the library
//!
//! A build runs these phases strictly in order:
//!
//! 1. ingestion ([`core::ingest`]): raw resources, cluster scoping, parent ids
//!    through owner disambiguation ([`core::owners`])
//! 2. linking ([`core::linker`]): seeded categories and reference back-pointers
//! 3. propagation ([`core::categories`]): fixed-point category settlement
//! 4. assembly ([`core::assembler`]): the rooted tree with grouping nodes

pub mod core;
pub mod logging;

pub use crate::core::{
    assemble_tree, link_references, locate_reference, propagate_categories, resolve_parent,
    Category, OwnerRef, RefField, ResourceNode, ResourceSource, ResourceType, Result, Snapshot,
    SnapshotSource, TreeConfig, TreeEngine, TreeError, TreeNode,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the tree for nodes that already carry their parent ids.
pub fn build_tree(nodes: Vec<ResourceNode>, config: &TreeConfig) -> Result<TreeNode> {
    TreeEngine::new(config.clone()).build(nodes)
}

/// Ingest one cluster from a source and build its tree.
pub fn construct_cluster_tree(
    source: &dyn ResourceSource,
    cluster_name: &str,
    config: &TreeConfig,
) -> Result<TreeNode> {
    TreeEngine::new(config.clone()).build_cluster(source, cluster_name)
}
