//! Recursive tree diff: compare two trees and produce the feature-level
//! changes between them.

use std::collections::BTreeSet;

use strata_store::{empty_tree_id, EntryKind, ObjectStore, Tree};
use strata_types::ObjectId;

use crate::change::{DiffEntry, EntryRef};
use crate::error::{DiffError, DiffResult};

/// Compare two trees and produce the list of feature-level changes.
///
/// Both trees are read from `store`; subtree entries are recursed into and
/// never reported themselves, so every [`DiffEntry`] names a feature by
/// its full slash-delimited path. Identical subtree ids short-circuit.
pub fn diff_trees(
    store: &dyn ObjectStore,
    old_tree: &ObjectId,
    new_tree: &ObjectId,
) -> DiffResult<Vec<DiffEntry>> {
    let mut changes = Vec::new();
    if old_tree == new_tree {
        return Ok(changes);
    }
    let old = load_tree(store, old_tree)?;
    let new = load_tree(store, new_tree)?;
    diff_level(store, "", &old, &new, &mut changes)?;
    Ok(changes)
}

/// Load a tree, resolving the distinguished empty-tree id even when the
/// empty tree was never physically written.
pub(crate) fn load_tree(store: &dyn ObjectStore, id: &ObjectId) -> DiffResult<Tree> {
    match store.get(id)? {
        Some(obj) => Ok(Tree::from_stored_object(&obj)?),
        None if *id == empty_tree_id() => Ok(Tree::empty()),
        None => Err(DiffError::ObjectNotFound(*id)),
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

fn diff_level(
    store: &dyn ObjectStore,
    prefix: &str,
    old: &Tree,
    new: &Tree,
    changes: &mut Vec<DiffEntry>,
) -> DiffResult<()> {
    let names: BTreeSet<&str> = old
        .entries
        .iter()
        .chain(new.entries.iter())
        .map(|e| e.name.as_str())
        .collect();

    for name in names {
        let path = join(prefix, name);
        match (old.get(name), new.get(name)) {
            (Some(o), Some(n)) => {
                if o.id == n.id && o.metadata == n.metadata {
                    continue;
                }
                match (o.kind, n.kind) {
                    (EntryKind::Tree, EntryKind::Tree) => {
                        let old_sub = load_tree(store, &o.id)?;
                        let new_sub = load_tree(store, &n.id)?;
                        diff_level(store, &path, &old_sub, &new_sub, changes)?;
                    }
                    (EntryKind::Feature, EntryKind::Feature) => {
                        changes.push(DiffEntry::modified(
                            path,
                            EntryRef::from_entry(o),
                            EntryRef::from_entry(n),
                        ));
                    }
                    // An entry changed kind: report it as remove + add.
                    _ => {
                        remove_recursively(store, &path, o, changes)?;
                        add_recursively(store, &path, n, changes)?;
                    }
                }
            }
            (Some(o), None) => remove_recursively(store, &path, o, changes)?,
            (None, Some(n)) => add_recursively(store, &path, n, changes)?,
            (None, None) => unreachable!("name came from one of the trees"),
        }
    }
    Ok(())
}

fn add_recursively(
    store: &dyn ObjectStore,
    path: &str,
    entry: &strata_store::TreeEntry,
    changes: &mut Vec<DiffEntry>,
) -> DiffResult<()> {
    match entry.kind {
        EntryKind::Feature => {
            changes.push(DiffEntry::added(path, EntryRef::from_entry(entry)));
            Ok(())
        }
        EntryKind::Tree => {
            let sub = load_tree(store, &entry.id)?;
            for child in &sub.entries {
                add_recursively(store, &join(path, &child.name), child, changes)?;
            }
            Ok(())
        }
    }
}

fn remove_recursively(
    store: &dyn ObjectStore,
    path: &str,
    entry: &strata_store::TreeEntry,
    changes: &mut Vec<DiffEntry>,
) -> DiffResult<()> {
    match entry.kind {
        EntryKind::Feature => {
            changes.push(DiffEntry::removed(path, EntryRef::from_entry(entry)));
            Ok(())
        }
        EntryKind::Tree => {
            let sub = load_tree(store, &entry.id)?;
            for child in &sub.entries {
                remove_recursively(store, &join(path, &child.name), child, changes)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeType;
    use strata_store::{empty_tree_id, InMemoryObjectStore, Tree, TreeEntry};
    use strata_types::ContentHasher;

    fn oid(data: &[u8]) -> ObjectId {
        ContentHasher::FEATURE.hash(data)
    }

    fn meta() -> ObjectId {
        ContentHasher::FEATURE_TYPE.hash(b"roads")
    }

    /// Write a tree whose "roads" subtree holds the given feature entries.
    fn roads_tree(store: &InMemoryObjectStore, features: &[(&str, ObjectId)]) -> ObjectId {
        let entries = features
            .iter()
            .map(|(name, id)| TreeEntry::feature(*name, *id, meta()))
            .collect();
        let sub_id = store.put_tree(&Tree::new(entries)).unwrap();
        store
            .put_tree(&Tree::new(vec![TreeEntry::subtree("roads", sub_id, meta())]))
            .unwrap()
    }

    #[test]
    fn identical_trees_have_no_changes() {
        let store = InMemoryObjectStore::new();
        let tree = roads_tree(&store, &[("road.1", oid(b"r1"))]);
        assert!(diff_trees(&store, &tree, &tree).unwrap().is_empty());
    }

    #[test]
    fn addition_from_empty_tree() {
        let store = InMemoryObjectStore::new();
        let empty = store.put_tree(&Tree::empty()).unwrap();
        assert_eq!(empty, empty_tree_id());
        let new = roads_tree(&store, &[("road.1", oid(b"r1")), ("road.2", oid(b"r2"))]);

        let changes = diff_trees(&store, &empty, &new).unwrap();
        assert_eq!(changes.len(), 2);
        assert!(changes
            .iter()
            .all(|c| c.change_type() == ChangeType::Added));
        assert_eq!(changes[0].path, "roads/road.1");
        assert_eq!(changes[1].path, "roads/road.2");
    }

    #[test]
    fn removal_to_empty_tree() {
        let store = InMemoryObjectStore::new();
        let empty = store.put_tree(&Tree::empty()).unwrap();
        let old = roads_tree(&store, &[("road.1", oid(b"r1"))]);

        let changes = diff_trees(&store, &old, &empty).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type(), ChangeType::Removed);
        assert_eq!(changes[0].path, "roads/road.1");
    }

    #[test]
    fn modification_reports_both_sides() {
        let store = InMemoryObjectStore::new();
        let old = roads_tree(&store, &[("road.1", oid(b"before"))]);
        let new = roads_tree(&store, &[("road.1", oid(b"after"))]);

        let changes = diff_trees(&store, &old, &new).unwrap();
        assert_eq!(changes.len(), 1);
        let change = &changes[0];
        assert_eq!(change.change_type(), ChangeType::Modified);
        assert_eq!(change.old.unwrap().id, oid(b"before"));
        assert_eq!(change.new.unwrap().id, oid(b"after"));
    }

    #[test]
    fn mixed_changes_across_subtrees() {
        let store = InMemoryObjectStore::new();

        let roads_old = store
            .put_tree(&Tree::new(vec![
                TreeEntry::feature("road.1", oid(b"r1"), meta()),
                TreeEntry::feature("road.2", oid(b"r2"), meta()),
            ]))
            .unwrap();
        let rivers_old = store
            .put_tree(&Tree::new(vec![TreeEntry::feature(
                "river.1",
                oid(b"w1"),
                meta(),
            )]))
            .unwrap();
        let old = store
            .put_tree(&Tree::new(vec![
                TreeEntry::subtree("roads", roads_old, meta()),
                TreeEntry::subtree("rivers", rivers_old, meta()),
            ]))
            .unwrap();

        let roads_new = store
            .put_tree(&Tree::new(vec![
                TreeEntry::feature("road.1", oid(b"r1 modified"), meta()),
            ]))
            .unwrap();
        let new = store
            .put_tree(&Tree::new(vec![
                TreeEntry::subtree("roads", roads_new, meta()),
                TreeEntry::subtree("rivers", rivers_old, meta()),
            ]))
            .unwrap();

        let changes = diff_trees(&store, &old, &new).unwrap();
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().any(
            |c| c.path == "roads/road.1" && c.change_type() == ChangeType::Modified
        ));
        assert!(changes.iter().any(
            |c| c.path == "roads/road.2" && c.change_type() == ChangeType::Removed
        ));
        assert!(!changes.iter().any(|c| c.path.starts_with("rivers")));
    }

    #[test]
    fn missing_tree_object_is_an_error() {
        let store = InMemoryObjectStore::new();
        let present = store.put_tree(&Tree::empty()).unwrap();
        let absent = oid(b"never written");
        assert!(matches!(
            diff_trees(&store, &present, &absent),
            Err(DiffError::ObjectNotFound(_))
        ));
    }
}
