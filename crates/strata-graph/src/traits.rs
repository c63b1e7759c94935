use strata_types::ObjectId;

use crate::error::GraphResult;

/// Property key marking a commit as a sparse projection (value `"true"`).
///
/// A projection carries this flag when the filter suppressed at least one
/// change of its original, so its tree is missing data the original has.
pub const SPARSE_FLAG: &str = "sparse";

/// Storage for the commit ancestry graph and the sparse commit mapping.
///
/// The graph db records, for each known commit, its parent list and
/// string-keyed properties. For sparse replication it also records the
/// original↔projection commit mapping: `mapping(a) = b` means commit `a`'s
/// projection is commit `b`. An unmapped commit — and the NULL id — map to
/// NULL.
pub trait GraphDatabase: Send + Sync {
    /// Record a commit and its parent list. Re-recording is a no-op.
    fn put(&self, commit: ObjectId, parents: Vec<ObjectId>) -> GraphResult<()>;

    /// The parent list of a commit. Unknown commits have no parents.
    fn parents(&self, commit: &ObjectId) -> GraphResult<Vec<ObjectId>>;

    /// Whether a commit is recorded in the graph.
    fn exists(&self, commit: &ObjectId) -> GraphResult<bool>;

    /// Set a string property on a commit.
    fn set_property(&self, commit: &ObjectId, key: &str, value: &str) -> GraphResult<()>;

    /// Read a string property of a commit.
    fn get_property(&self, commit: &ObjectId, key: &str) -> GraphResult<Option<String>>;

    /// Install the commit mapping `a ↔ b` in both directions at once.
    ///
    /// Used when a projection is first built. Neither id may be NULL.
    fn map(&self, a: ObjectId, b: ObjectId) -> GraphResult<()>;

    /// Record one-directionally that `original`'s projection is
    /// `projection`, leaving `projection`'s own reverse mapping untouched.
    ///
    /// Used when a commit's projection collapses into an existing
    /// projection (an empty filtered diff): several originals then share
    /// one projection, and only the projection's first original keeps the
    /// reverse link.
    fn alias(&self, original: ObjectId, projection: ObjectId) -> GraphResult<()>;

    /// The mapped counterpart of a commit: NULL when unmapped, and
    /// `mapping(NULL) = NULL`.
    fn mapping(&self, commit: &ObjectId) -> GraphResult<ObjectId>;

    /// Whether a commit carries the [`SPARSE_FLAG`] property.
    fn is_sparse(&self, commit: &ObjectId) -> GraphResult<bool> {
        Ok(self.get_property(commit, SPARSE_FLAG)?.as_deref() == Some("true"))
    }
}
