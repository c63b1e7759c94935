//! Content-addressed object storage for strata.
//!
//! Every piece of versioned data — commits, trees, features, feature
//! types, tags — is stored as an immutable object identified by the
//! domain-separated hash of its canonical encoding.
//!
//! # Object Types
//!
//! - [`Commit`] — tree id, ordered parent ids, author/committer, message
//! - [`Tree`] — sorted named entries referencing features and subtrees
//! - [`Feature`] — a typed geospatial feature's attribute values
//! - [`FeatureType`] — the schema a feature conforms to
//! - [`TagObject`] — an annotated, immutable pointer to a commit
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees
//!    this).
//! 2. Writes are idempotent: the same content always maps to the same id.
//! 3. The store never interprets object contents beyond the kind tag.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use object::{
    empty_tree_id, AttributeValue, Commit, EntryKind, Feature, FeatureType, ObjectKind,
    PropertyDescriptor, Signature, StoredObject, TagObject, Tree, TreeEntry,
};
pub use traits::ObjectStore;
