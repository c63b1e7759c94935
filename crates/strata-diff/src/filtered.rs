//! A diff that has passed through a repository filter.

use crate::change::DiffEntry;

/// The changes of a commit restricted to entries matching a repository
/// filter, remembering whether anything was suppressed.
///
/// Produced by a replication protocol's `get_filtered_changes`; consumed
/// by the replicator, which applies the surviving entries to a base tree.
#[derive(Clone, Debug, Default)]
pub struct FilteredChanges {
    entries: Vec<DiffEntry>,
    filtered: bool,
}

impl FilteredChanges {
    /// Wrap the surviving entries; `filtered` reports whether any entry of
    /// the original diff was suppressed.
    pub fn new(entries: Vec<DiffEntry>, filtered: bool) -> Self {
        Self { entries, filtered }
    }

    /// Whether the filter suppressed at least one entry.
    pub fn was_filtered(&self) -> bool {
        self.filtered
    }

    /// The surviving entries.
    pub fn entries(&self) -> &[DiffEntry] {
        &self.entries
    }

    /// Returns `true` if no entries survived.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of surviving entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl IntoIterator for FilteredChanges {
    type Item = DiffEntry;
    type IntoIter = std::vec::IntoIter<DiffEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
