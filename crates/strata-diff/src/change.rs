//! Diff entry types.

use strata_store::{EntryKind, TreeEntry};
use strata_types::ObjectId;

/// The kind of change a [`DiffEntry`] describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

/// One side of a diff entry: what a path pointed to in one tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryRef {
    /// Content-addressed id of the referenced object.
    pub id: ObjectId,
    /// Id of the feature type the entry conforms to.
    pub metadata: ObjectId,
    pub kind: EntryKind,
}

impl EntryRef {
    pub fn from_entry(entry: &TreeEntry) -> Self {
        Self {
            id: entry.id,
            metadata: entry.metadata,
            kind: entry.kind,
        }
    }
}

/// A single change introduced between two trees.
///
/// `path` is the full slash-delimited path of the feature. At least one of
/// `old` and `new` is present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffEntry {
    pub path: String,
    pub old: Option<EntryRef>,
    pub new: Option<EntryRef>,
}

impl DiffEntry {
    pub fn added(path: impl Into<String>, new: EntryRef) -> Self {
        Self {
            path: path.into(),
            old: None,
            new: Some(new),
        }
    }

    pub fn removed(path: impl Into<String>, old: EntryRef) -> Self {
        Self {
            path: path.into(),
            old: Some(old),
            new: None,
        }
    }

    pub fn modified(path: impl Into<String>, old: EntryRef, new: EntryRef) -> Self {
        Self {
            path: path.into(),
            old: Some(old),
            new: Some(new),
        }
    }

    /// The kind of change this entry describes.
    pub fn change_type(&self) -> ChangeType {
        match (&self.old, &self.new) {
            (None, Some(_)) => ChangeType::Added,
            (Some(_), None) => ChangeType::Removed,
            _ => ChangeType::Modified,
        }
    }

    /// The last component of the entry's path.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}
