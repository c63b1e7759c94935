use thiserror::Error;

use strata_graph::GraphError;
use strata_refs::RefError;
use strata_store::StoreError;

/// Errors from repository-level operations.
#[derive(Debug, Error)]
pub enum RepoError {
    /// A config or filter file line could not be parsed.
    #[error("malformed config at line {line}: {text:?}")]
    MalformedConfig { line: usize, text: String },

    /// The repository location is not a `file://` URL.
    #[error("repository location is not a local file path: {location}")]
    RemoteLocation { location: String },

    /// A hook asked for a command the registry does not know.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A user hook vetoed the surrounding operation.
    #[error("cannot run operation: {0}")]
    CannotRunOperation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Ref(#[from] RefError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for repository results.
pub type RepoResult<T> = Result<T, RepoError>;
