//! Error types for capi-tree
//!
//! Every failure in a tree build is fatal for that build: the whole
//! construction is aborted and the error is handed back to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tree building operations
pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors that can occur while turning a resource snapshot into a tree
#[derive(Error, Debug)]
pub enum TreeError {
    /// Several owners whose kinds match no known disambiguation pattern
    #[error("Cannot resolve multiple owners for {kind} '{name}': [{}]", .owners.join(", "))]
    AmbiguousOwnership {
        kind: String,
        name: String,
        /// Every owner as `Kind/name (uid)`
        owners: Vec<String>,
    },

    /// A cross-reference names an object that is not in the snapshot
    #[error("{source_key}: {field} points at '{target}', which is not in the snapshot")]
    DanglingReference {
        source_key: String,
        field: String,
        target: String,
    },

    /// A reference field was found but does not carry a string kind and name
    #[error("{source_key}: {field} does not name a kind and a name")]
    MalformedReference { source_key: String, field: String },

    /// A parent id that does not resolve during assembly
    #[error("{key}: parent '{parent_id}' is not part of the tree")]
    DanglingParent { key: String, parent_id: String },

    /// Two nodes share one id
    #[error("Duplicate resource id: {id}")]
    DuplicateId { id: String },

    /// Two nodes share one kind/name key
    #[error("Duplicate resource key: {key}")]
    DuplicateKey { key: String },

    /// No node without a parent
    #[error("No root node: every resource has a parent")]
    MissingRoot,

    /// More than one node without a parent
    #[error("Multiple root nodes: {}", .ids.join(", "))]
    MultipleRoots { ids: Vec<String> },

    /// A node reached assembly without a category
    #[error("{key}: category was never settled")]
    Unsettled { key: String },

    /// The requested cluster does not exist
    #[error("Cluster not found: {name}")]
    ClusterNotFound { name: String },

    /// The requested cluster name matches several clusters
    #[error("Cluster name '{name}' matches {count} clusters")]
    DuplicateCluster { name: String, count: usize },

    /// A raw resource object is missing required metadata
    #[error("Invalid {plural} resource: {message}")]
    InvalidResource { plural: String, message: String },

    /// Snapshot file not found
    #[error("Snapshot not found: {}", .path.display())]
    SnapshotNotFound { path: PathBuf },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TreeError>,
    },
}

impl TreeError {
    /// Wrap an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TreeError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        TreeError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid resource error
    pub fn invalid_resource(plural: impl Into<String>, message: impl Into<String>) -> Self {
        TreeError::InvalidResource {
            plural: plural.into(),
            message: message.into(),
        }
    }

    /// Strip any context wrappers and return the underlying error
    pub fn root_cause(&self) -> &TreeError {
        match self {
            TreeError::WithContext { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(ctx))
    }
}
