//! Core module for capi-tree
//!
//! # Architecture
//!
//! - `models`: Core data structures (ResourceNode, Category, TreeNode, TreeConfig)
//! - `error`: Error types using thiserror
//! - `locator`: Reference field lookup inside payloads
//! - `owners`: Multi-owner disambiguation
//! - `linker`: Category seeding and cross-reference back-pointers
//! - `categories`: Fixed-point category propagation
//! - `assembler`: Rooted tree with synthetic grouping nodes
//! - `source`: ResourceSource trait + SnapshotSource
//! - `ingest`: Raw resources to scoped, parented nodes
//! - `engine`: Phase orchestration

pub mod assembler;
pub mod categories;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod linker;
pub mod locator;
pub mod models;
pub mod owners;
pub mod source;

// Re-export commonly used types
pub use assembler::{assemble_tree, BUCKETS};
pub use categories::{propagate_categories, PropagationStats};
pub use engine::TreeEngine;
pub use error::{Result, ResultExt, TreeError};
pub use ingest::{ingest, ClusterIdentity};
pub use linker::link_references;
pub use locator::locate_reference;
pub use models::{Category, OwnerRef, RefField, ResourceNode, TreeConfig, TreeNode};
pub use owners::{owner_rule, resolve_parent, OwnerRule};
pub use source::{ResourceSource, ResourceType, Snapshot, SnapshotSource};
