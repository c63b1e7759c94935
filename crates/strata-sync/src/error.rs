use thiserror::Error;

use strata_diff::DiffError;
use strata_graph::GraphError;
use strata_refs::RefError;
use strata_repo::RepoError;
use strata_store::StoreError;
use strata_types::ObjectId;

/// Errors and synchronization outcomes of sparse replication.
///
/// [`NothingToPush`](SyncError::NothingToPush) and
/// [`RemoteHasChanges`](SyncError::RemoteHasChanges) are the
/// non-exceptional outcomes of the push pre-check — distinct status codes
/// callers match on, not bugs.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote already has everything the local ref points to.
    #[error("nothing to push")]
    NothingToPush,

    /// The remote holds history the local repository does not; pushing
    /// would lose it.
    #[error("the remote has changes the local repository does not")]
    RemoteHasChanges,

    /// A depth limit was supplied for a sparse fetch.
    #[error("a sparse clone cannot be shallow")]
    SparseShallow,

    /// The repository config carries no `sparse.filter` key.
    #[error("no filter found for sparse clone")]
    MissingFilter,

    /// Sparse clones work only against local filesystem repositories.
    #[error("sparse clone works only against file system repositories: {location}")]
    NonLocalRepository { location: String },

    /// The sparse filter file could not be understood.
    #[error("invalid sparse filter: {0}")]
    InvalidFilter(String),

    /// A commit's projection was expected to exist but does not.
    #[error("missing commit mapping for {0}")]
    MissingMapping(ObjectId),

    /// The remote could not produce a requested object.
    #[error("object not found on remote: {0}")]
    ObjectNotFound(ObjectId),

    /// A commit id resolved to a non-commit object.
    #[error("expected a commit object: {0}")]
    NotACommit(ObjectId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Ref(#[from] RefError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for replication results.
pub type SyncResult<T> = Result<T, SyncError>;
