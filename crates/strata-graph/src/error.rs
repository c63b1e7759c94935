//! Error types for commit-graph operations.

use strata_types::ObjectId;

/// Errors that can occur during graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// An operation was given the NULL id where a real commit id is
    /// required.
    #[error("null id passed to {operation}")]
    NullId { operation: &'static str },

    /// A commit required by the operation is not recorded in the graph.
    #[error("commit not found in graph: {0}")]
    NotFound(ObjectId),

    /// Storage backend failure.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Convenience alias for graph results.
pub type GraphResult<T> = Result<T, GraphError>;
