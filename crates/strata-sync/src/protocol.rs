//! The protocol seam a concrete sparse transport implements.

use strata_store::{Commit, StoredObject};
use strata_types::ObjectId;

use crate::error::SyncResult;
use crate::filter::RepositoryFilter;
use crate::types::NamedRef;

/// The operations a sparse replication transport provides.
///
/// The replicator drives these against the remote side of a fetch or
/// push; the wire encoding behind them is the implementation's concern.
/// Protocol variants are instances of this trait — [`LocalRemote`] for
/// repositories on the local filesystem, with network transports layered
/// the same way.
///
/// [`LocalRemote`]: crate::local::LocalRemote
pub trait SparseProtocol: Send + Sync {
    /// Parent ids of a commit in the remote history.
    fn get_parents(&self, commit: &ObjectId) -> SyncResult<Vec<ObjectId>>;

    /// Fetch an object from the remote object store.
    fn get_object(&self, id: &ObjectId) -> SyncResult<Option<StoredObject>>;

    /// The changes `commit` introduces relative to its mainline parent,
    /// restricted to entries matching `filter`.
    ///
    /// The result reports, via
    /// [`was_filtered`](strata_diff::FilteredChanges::was_filtered),
    /// whether any entry was suppressed.
    fn get_filtered_changes(
        &self,
        commit: &Commit,
        filter: &RepositoryFilter,
    ) -> SyncResult<strata_diff::FilteredChanges>;

    /// Resolve a refspec to the remote ref it names, if present.
    fn get_remote_ref(&self, refspec: &str) -> SyncResult<Option<NamedRef>>;

    /// Point the remote ref named by `refspec` at `commit`, or delete it.
    fn update_remote_ref(
        &self,
        refspec: &str,
        commit: ObjectId,
        delete: bool,
    ) -> SyncResult<NamedRef>;

    /// Transmit one local commit to the remote, reconstructing its full
    /// form there and installing the reverse mapping locally.
    fn push_sparse_commit(&self, commit: &ObjectId) -> SyncResult<()>;

    /// Pre-push actions. The default does nothing.
    fn begin_push(&self) -> SyncResult<()> {
        Ok(())
    }

    /// Post-push actions. The default points the remote ref at the newly
    /// pushed commit; `original_remote_value` (NULL when the ref was
    /// absent) lets an implementation re-verify the remote did not move
    /// during the push.
    fn end_push(
        &self,
        refspec: &str,
        new_commit: ObjectId,
        original_remote_value: ObjectId,
    ) -> SyncResult<()> {
        let _ = original_remote_value;
        self.update_remote_ref(refspec, new_commit, false)?;
        Ok(())
    }
}
