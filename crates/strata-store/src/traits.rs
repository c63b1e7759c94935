use strata_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Commit, Feature, FeatureType, ObjectKind, StoredObject, Tree};

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written; the same content always produces
///   the same id.
/// - Writes are idempotent.
/// - Concurrent reads are always safe.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Read an object by its content-addressed id.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    fn get(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its content-addressed id.
    ///
    /// If the object already exists this is a no-op.
    fn put(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    /// Check whether an object exists in the store.
    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Read an object that must exist and be a commit.
    fn get_commit(&self, id: &ObjectId) -> StoreResult<Commit> {
        let obj = self.get(id)?.ok_or(StoreError::NotFound(*id))?;
        Commit::from_stored_object(&obj)
    }

    /// Read an object that must exist and be a tree.
    fn get_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        let obj = self.get(id)?.ok_or(StoreError::NotFound(*id))?;
        Tree::from_stored_object(&obj)
    }

    /// Read an object that must exist and be a feature.
    fn get_feature(&self, id: &ObjectId) -> StoreResult<Feature> {
        let obj = self.get(id)?.ok_or(StoreError::NotFound(*id))?;
        Feature::from_stored_object(&obj)
    }

    /// Read an object that must exist and be a feature type.
    fn get_feature_type(&self, id: &ObjectId) -> StoreResult<FeatureType> {
        let obj = self.get(id)?.ok_or(StoreError::NotFound(*id))?;
        FeatureType::from_stored_object(&obj)
    }

    /// Write a commit.
    fn put_commit(&self, commit: &Commit) -> StoreResult<ObjectId> {
        self.put(&commit.to_stored_object()?)
    }

    /// Write a tree.
    fn put_tree(&self, tree: &Tree) -> StoreResult<ObjectId> {
        self.put(&tree.to_stored_object()?)
    }

    /// The kind of a stored object, or `None` if absent.
    fn kind_of(&self, id: &ObjectId) -> StoreResult<Option<ObjectKind>> {
        Ok(self.get(id)?.map(|obj| obj.kind))
    }
}
