use strata_store::StoreError;
use strata_types::ObjectId;

/// Errors from diff computation and patching.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A tree or feature referenced by the diff is missing from the store.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// A change entry is inconsistent (e.g. no side to apply).
    #[error("malformed change for {path}: {reason}")]
    MalformedChange { path: String, reason: String },

    /// Object store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
