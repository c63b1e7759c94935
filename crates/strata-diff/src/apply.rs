//! Patch a base tree with a list of changes.

use std::collections::BTreeMap;

use strata_store::{EntryKind, ObjectStore, Tree, TreeEntry};
use strata_types::ObjectId;

use crate::change::{ChangeType, DiffEntry, EntryRef};
use crate::error::{DiffError, DiffResult};

/// Apply `changes` to the tree rooted at `base_tree`, writing every new
/// tree to `store` and returning the new root tree id.
///
/// Additions and modifications require the change's `new` side; removals
/// drop the path. Directories emptied by removals disappear from their
/// parent; directories introduced by additions inherit the metadata id of
/// their first feature.
pub fn apply_changes(
    store: &dyn ObjectStore,
    base_tree: &ObjectId,
    changes: &[DiffEntry],
) -> DiffResult<ObjectId> {
    let base = crate::tree_diff::load_tree(store, base_tree)?;

    let mut features: BTreeMap<String, EntryRef> = BTreeMap::new();
    let mut dir_metadata: BTreeMap<String, ObjectId> = BTreeMap::new();
    flatten(store, "", &base, &mut features, &mut dir_metadata)?;

    for change in changes {
        match change.change_type() {
            ChangeType::Removed => {
                features.remove(&change.path);
            }
            ChangeType::Added | ChangeType::Modified => {
                let new = change.new.ok_or_else(|| DiffError::MalformedChange {
                    path: change.path.clone(),
                    reason: "add/modify change has no new side".into(),
                })?;
                features.insert(change.path.clone(), new);
            }
        }
    }

    let items: Vec<(String, EntryRef)> = features.into_iter().collect();
    build_level(store, "", &items, &dir_metadata)
}

/// Collect every feature (by full path) and every directory's metadata id.
fn flatten(
    store: &dyn ObjectStore,
    prefix: &str,
    tree: &Tree,
    features: &mut BTreeMap<String, EntryRef>,
    dir_metadata: &mut BTreeMap<String, ObjectId>,
) -> DiffResult<()> {
    for entry in &tree.entries {
        let path = join(prefix, &entry.name);
        match entry.kind {
            EntryKind::Feature => {
                features.insert(path, EntryRef::from_entry(entry));
            }
            EntryKind::Tree => {
                dir_metadata.insert(path.clone(), entry.metadata);
                let obj = store
                    .get(&entry.id)?
                    .ok_or(DiffError::ObjectNotFound(entry.id))?;
                let sub = Tree::from_stored_object(&obj)?;
                flatten(store, &path, &sub, features, dir_metadata)?;
            }
        }
    }
    Ok(())
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Build and write the tree for one directory level; `items` hold paths
/// relative to that directory.
fn build_level(
    store: &dyn ObjectStore,
    dir_path: &str,
    items: &[(String, EntryRef)],
    dir_metadata: &BTreeMap<String, ObjectId>,
) -> DiffResult<ObjectId> {
    let mut leaves: Vec<(&str, EntryRef)> = Vec::new();
    let mut subdirs: BTreeMap<&str, Vec<(String, EntryRef)>> = BTreeMap::new();

    for (path, entry) in items {
        match path.split_once('/') {
            None => leaves.push((path, *entry)),
            Some((dir, rest)) => subdirs
                .entry(dir)
                .or_default()
                .push((rest.to_string(), *entry)),
        }
    }

    let mut entries: Vec<TreeEntry> = leaves
        .into_iter()
        .map(|(name, entry)| TreeEntry::new(name, entry.kind, entry.id, entry.metadata))
        .collect();

    for (dir, children) in subdirs {
        let full_dir = join(dir_path, dir);
        let sub_id = build_level(store, &full_dir, &children, dir_metadata)?;
        let metadata = dir_metadata
            .get(&full_dir)
            .copied()
            .or_else(|| children.first().map(|(_, e)| e.metadata))
            .unwrap_or_else(ObjectId::null);
        entries.push(TreeEntry::subtree(dir, sub_id, metadata));
    }

    Ok(store.put_tree(&Tree::new(entries))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree_diff::diff_trees;
    use strata_store::{empty_tree_id, InMemoryObjectStore};
    use strata_types::ContentHasher;

    fn oid(data: &[u8]) -> ObjectId {
        ContentHasher::FEATURE.hash(data)
    }

    fn meta() -> ObjectId {
        ContentHasher::FEATURE_TYPE.hash(b"roads")
    }

    fn feature_ref(data: &[u8]) -> EntryRef {
        EntryRef {
            id: oid(data),
            metadata: meta(),
            kind: EntryKind::Feature,
        }
    }

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
    fn add_feature_to_empty_tree() {
        let store = InMemoryObjectStore::new();
        let empty = store.put_tree(&Tree::empty()).unwrap();

        let changes = vec![DiffEntry::added("roads/road.1", feature_ref(b"r1"))];
        let root = apply_changes(&store, &empty, &changes).unwrap();

        let tree = store.get_tree(&root).unwrap();
        let roads = tree.get("roads").unwrap();
        assert_eq!(roads.kind, EntryKind::Tree);
        assert_eq!(roads.metadata, meta());
        let sub = store.get_tree(&roads.id).unwrap();
        assert_eq!(sub.get("road.1").unwrap().id, oid(b"r1"));
    }

    #[test]
    fn modify_feature_keeps_siblings() {
        let store = InMemoryObjectStore::new();
        let base = roads_tree(&store, &[("road.1", oid(b"r1")), ("road.2", oid(b"r2"))]);

        let changes = vec![DiffEntry::modified(
            "roads/road.1",
            feature_ref(b"r1"),
            feature_ref(b"r1 v2"),
        )];
        let root = apply_changes(&store, &base, &changes).unwrap();

        let expected = roads_tree(&store, &[("road.1", oid(b"r1 v2")), ("road.2", oid(b"r2"))]);
        assert_eq!(root, expected);
    }

    #[test]
    fn removing_last_feature_drops_the_directory() {
        let store = InMemoryObjectStore::new();
        let base = roads_tree(&store, &[("road.1", oid(b"r1"))]);

        let changes = vec![DiffEntry::removed("roads/road.1", feature_ref(b"r1"))];
        let root = apply_changes(&store, &base, &changes).unwrap();
        assert_eq!(root, empty_tree_id());
    }

    #[test]
    fn patching_with_empty_diff_reproduces_the_base() {
        let store = InMemoryObjectStore::new();
        let base = roads_tree(&store, &[("road.1", oid(b"r1"))]);
        let root = apply_changes(&store, &base, &[]).unwrap();
        assert_eq!(root, base);
    }

    #[test]
    fn diff_then_apply_reproduces_target_tree() {
        let store = InMemoryObjectStore::new();
        let base = roads_tree(&store, &[("road.1", oid(b"r1")), ("road.2", oid(b"r2"))]);
        let target = roads_tree(
            &store,
            &[("road.1", oid(b"r1 modified")), ("road.3", oid(b"r3"))],
        );

        let changes = diff_trees(&store, &base, &target).unwrap();
        let rebuilt = apply_changes(&store, &base, &changes).unwrap();
        assert_eq!(rebuilt, target);
    }

    #[test]
    fn add_without_new_side_is_malformed() {
        let store = InMemoryObjectStore::new();
        let empty = store.put_tree(&Tree::empty()).unwrap();
        let bad = DiffEntry {
            path: "roads/road.1".into(),
            old: None,
            new: None,
        };
        assert!(matches!(
            apply_changes(&store, &empty, &[bad]),
            Err(DiffError::MalformedChange { .. })
        ));
    }
}
