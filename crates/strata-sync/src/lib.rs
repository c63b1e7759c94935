//! Sparse (mapped) replication between strata repositories.
//!
//! A **sparse clone** holds only the objects that pass its stored
//! [`RepositoryFilter`]. Replication against a full remote therefore
//! rewrites history: every remote commit is projected through the filter
//! into a local counterpart, and a bidirectional original↔projection
//! mapping is kept in the commit-graph database so both directions of the
//! protocol can translate between the two histories.
//!
//! [`SparseReplicator`] orchestrates fetch and push over a
//! [`SparseProtocol`] — the seam a concrete transport implements.
//! [`LocalRemote`] is the filesystem variant, replicating against a
//! remote repository opened in the same process.

pub mod error;
pub mod filter;
pub mod local;
pub mod protocol;
pub mod replicate;
pub mod types;

pub use error::{SyncError, SyncResult};
pub use filter::RepositoryFilter;
pub use local::LocalRemote;
pub use protocol::SparseProtocol;
pub use replicate::{SparseReplicator, PLACEHOLDER_COMMIT_MESSAGE, SPARSE_FILTER_KEY};
pub use types::NamedRef;
