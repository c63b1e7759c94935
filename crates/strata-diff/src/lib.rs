//! Tree-level diff computation and patching for strata.
//!
//! [`diff_trees`] compares two feature trees and produces the list of
//! feature-level changes between them, recursing through subtrees and
//! reporting full slash-delimited paths. [`apply_changes`] goes the other
//! way: it patches a base tree with a list of changes, writes the new
//! trees to the object store, and returns the new root tree id.
//!
//! [`FilteredChanges`] carries a diff that has passed through a repository
//! filter, remembering whether anything was suppressed on the way.

pub mod apply;
pub mod change;
pub mod error;
pub mod filtered;
pub mod tree_diff;

pub use apply::apply_changes;
pub use change::{ChangeType, DiffEntry, EntryRef};
pub use error::{DiffError, DiffResult};
pub use filtered::FilteredChanges;
pub use tree_diff::diff_trees;
