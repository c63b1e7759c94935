//! The filesystem protocol variant: replication against a full remote
//! repository opened in the same process.

use tracing::debug;

use strata_diff::{apply_changes, diff_trees, DiffEntry, FilteredChanges};
use strata_repo::Repository;
use strata_store::{empty_tree_id, Commit, EntryKind, ObjectStore, StoredObject};
use strata_types::ObjectId;

use crate::error::SyncResult;
use crate::filter::RepositoryFilter;
use crate::protocol::SparseProtocol;
use crate::types::NamedRef;

/// [`SparseProtocol`] over a remote repository on the local filesystem.
///
/// Holds handles to both sides: the remote it reads from and writes to,
/// and the sparse local repository whose mapping it maintains when
/// pushing.
pub struct LocalRemote {
    local: Repository,
    remote: Repository,
}

impl LocalRemote {
    pub fn new(local: Repository, remote: Repository) -> Self {
        Self { local, remote }
    }

    /// Whether a change passes the filter, loading the feature's
    /// attributes from the remote when the rule needs them.
    fn change_matches(&self, filter: &RepositoryFilter, change: &DiffEntry) -> SyncResult<bool> {
        if !filter.needs_attributes(&change.path) {
            return Ok(filter.matches(&change.path, None));
        }
        let side = change.new.or(change.old);
        let feature = match side {
            Some(entry) if entry.kind == EntryKind::Feature => {
                Some(self.remote.objects().get_feature(&entry.id)?)
            }
            _ => None,
        };
        Ok(filter.matches(&change.path, feature.as_ref()))
    }

    /// The root tree a commit's changes are computed against: its
    /// mainline parent's tree, or the empty tree for roots.
    fn base_tree_of(store: &dyn ObjectStore, commit: &Commit) -> SyncResult<ObjectId> {
        Ok(match commit.mainline_parent() {
            Some(parent) => store.get_commit(&parent)?.tree,
            None => empty_tree_id(),
        })
    }
}

impl SparseProtocol for LocalRemote {
    fn get_parents(&self, commit: &ObjectId) -> SyncResult<Vec<ObjectId>> {
        Ok(self.remote.graph().parents(commit)?)
    }

    fn get_object(&self, id: &ObjectId) -> SyncResult<Option<StoredObject>> {
        Ok(self.remote.objects().get(id)?)
    }

    fn get_filtered_changes(
        &self,
        commit: &Commit,
        filter: &RepositoryFilter,
    ) -> SyncResult<FilteredChanges> {
        let store = self.remote.objects();
        let base_tree = Self::base_tree_of(store, commit)?;
        let all = diff_trees(store, &base_tree, &commit.tree)?;

        let mut kept = Vec::with_capacity(all.len());
        let mut filtered = false;
        for change in all {
            if self.change_matches(filter, &change)? {
                // Surviving changes carry their objects across to the
                // sparse clone.
                if let Some(new) = &change.new {
                    if let Some(obj) = store.get(&new.id)? {
                        self.local.objects().put(&obj)?;
                    }
                    if !new.metadata.is_null() {
                        if let Some(obj) = store.get(&new.metadata)? {
                            self.local.objects().put(&obj)?;
                        }
                    }
                }
                kept.push(change);
            } else {
                filtered = true;
            }
        }
        Ok(FilteredChanges::new(kept, filtered))
    }

    fn get_remote_ref(&self, refspec: &str) -> SyncResult<Option<NamedRef>> {
        Ok(self
            .remote
            .resolve_ref(refspec)?
            .map(|id| NamedRef::new(refspec, id)))
    }

    fn update_remote_ref(
        &self,
        refspec: &str,
        commit: ObjectId,
        delete: bool,
    ) -> SyncResult<NamedRef> {
        if delete {
            self.remote.refs().remove(refspec)?;
        } else {
            self.remote.refs().put_ref(refspec, commit)?;
        }
        Ok(NamedRef::new(refspec, commit))
    }

    /// Reconstruct one sparse commit in its full form on the remote.
    ///
    /// The sparse commit's changes are replayed onto the tree of the
    /// remote commit its mainline parent maps to, the referenced objects
    /// are copied across, and the new remote commit is linked to the
    /// local one through the mapping.
    fn push_sparse_commit(&self, commit: &ObjectId) -> SyncResult<()> {
        let local_store = self.local.objects();
        let sparse = local_store.get_commit(commit)?;

        let local_base = Self::base_tree_of(local_store, &sparse)?;
        let changes = diff_trees(local_store, &local_base, &sparse.tree)?;

        // Copy the objects the changes reference.
        for change in &changes {
            if let Some(new) = &change.new {
                if let Some(obj) = local_store.get(&new.id)? {
                    self.remote.objects().put(&obj)?;
                }
                if !new.metadata.is_null() {
                    if let Some(obj) = local_store.get(&new.metadata)? {
                        self.remote.objects().put(&obj)?;
                    }
                }
            }
        }

        let graph = self.local.graph();
        let remote_base = match sparse.mainline_parent() {
            Some(parent) => {
                let mapped = graph.mapping(&parent)?;
                if mapped.is_null() {
                    empty_tree_id()
                } else {
                    self.remote.objects().get_commit(&mapped)?.tree
                }
            }
            None => empty_tree_id(),
        };
        let remote_tree = apply_changes(self.remote.objects(), &remote_base, &changes)?;

        let mut remote_parents = Vec::with_capacity(sparse.parents.len());
        for parent in &sparse.parents {
            let mapped = graph.mapping(parent)?;
            if !mapped.is_null() {
                remote_parents.push(mapped);
            }
        }

        let full = Commit {
            tree: remote_tree,
            parents: remote_parents,
            author: sparse.author.clone(),
            committer: sparse.committer.clone(),
            message: sparse.message.clone(),
        };
        let remote_id = self.remote.objects().put_commit(&full)?;
        self.remote.graph().put(remote_id, full.parents.clone())?;

        graph.map(*commit, remote_id)?;
        debug!(
            local = %commit.short_hex(),
            remote = %remote_id.short_hex(),
            "pushed sparse commit"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replicate::{SparseReplicator, PLACEHOLDER_COMMIT_MESSAGE};
    use std::sync::Arc;

    use strata_diff::EntryRef;
    use strata_graph::{GraphDatabase, InMemoryGraphDatabase};
    use strata_refs::{InMemoryRefDatabase, RefDatabase};
    use strata_repo::RepositoryConfig;
    use strata_store::{
        AttributeValue, Feature, FeatureType, InMemoryObjectStore, PropertyDescriptor, Signature,
    };
    use strata_types::ContentHasher;

    const MASTER: &str = "refs/heads/master";

    fn sig() -> Signature {
        Signature::new("Jane Mapper", "jane@example.com", 1_700_000_000_000)
    }

    fn road(lanes: i64) -> Feature {
        Feature::new(vec![
            ("name".to_string(), AttributeValue::Text("Main St".into())),
            ("lanes".to_string(), AttributeValue::Int(lanes)),
        ])
    }

    fn building(zone: &str) -> Feature {
        Feature::new(vec![(
            "zone".to_string(),
            AttributeValue::Text(zone.into()),
        )])
    }

    /// Write a feature and its feature type, returning an added-entry
    /// change for it.
    fn add(repo: &Repository, path: &str, feature: &Feature) -> DiffEntry {
        let store = repo.objects();
        let type_name = path.split('/').next().unwrap();
        let ftype = FeatureType::new(
            type_name,
            vec![PropertyDescriptor {
                name: "name".into(),
                value_kind: "text".into(),
            }],
        );
        let metadata = store.put(&ftype.to_stored_object().unwrap()).unwrap();
        let id = store.put(&feature.to_stored_object().unwrap()).unwrap();
        DiffEntry::added(
            path,
            EntryRef {
                id,
                metadata,
                kind: EntryKind::Feature,
            },
        )
    }

    /// Commit `changes` on top of `parents`, recording the commit in the
    /// repository's graph.
    fn commit_with(
        repo: &Repository,
        parents: Vec<ObjectId>,
        changes: &[DiffEntry],
        message: &str,
    ) -> ObjectId {
        let store = repo.objects();
        let base = match parents.first() {
            Some(parent) => store.get_commit(parent).unwrap().tree,
            None => empty_tree_id(),
        };
        let tree = apply_changes(store, &base, changes).unwrap();
        let commit = Commit {
            tree,
            parents: parents.clone(),
            author: sig(),
            committer: sig(),
            message: message.into(),
        };
        let id = store.put_commit(&commit).unwrap();
        repo.graph().put(id, parents).unwrap();
        id
    }

    /// A sparse local repository (with its raw store handle), a full
    /// remote, and a replicator filtering to the given INI rules.
    fn sparse_pair(
        filter_ini: &str,
    ) -> (
        Repository,
        Arc<InMemoryObjectStore>,
        Repository,
        SparseReplicator<LocalRemote>,
    ) {
        let local_store = Arc::new(InMemoryObjectStore::new());
        let local = Repository::new(
            local_store.clone(),
            Arc::new(InMemoryGraphDatabase::new()),
            Arc::new(InMemoryRefDatabase::new()),
            RepositoryConfig::new(),
            "file:///sparse",
        );
        let remote = Repository::in_memory("file:///full");
        let protocol = LocalRemote::new(local.clone(), remote.clone());
        let replicator = SparseReplicator::with_filter(
            local.clone(),
            protocol,
            RepositoryFilter::from_ini(filter_ini).unwrap(),
        );
        (local, local_store, remote, replicator)
    }

    /// The remote history of scenario S3: r0 adds a matching road, r1
    /// modifies it, r2 touches only non-matching buildings.
    fn s3_history(remote: &Repository) -> (ObjectId, ObjectId, ObjectId) {
        let r0 = commit_with(remote, vec![], &[add(remote, "roads/road.1", &road(2))], "add road");
        let r1 = commit_with(
            remote,
            vec![r0],
            &[add(remote, "roads/road.1", &road(4))],
            "widen road",
        );
        let r2 = commit_with(
            remote,
            vec![r1],
            &[add(remote, "buildings/b.1", &building("residential"))],
            "add building",
        );
        remote.refs().put_ref(MASTER, r2).unwrap();
        (r0, r1, r2)
    }

    // ---- Fetch ----

    #[test]
    fn fetch_projects_history_with_tip_placeholder() {
        let (local, _, remote, replicator) = sparse_pair("[roads]\ntype = all\n");
        let (r0, r1, r2) = s3_history(&remote);

        replicator
            .fetch(&NamedRef::new(MASTER, r2), None)
            .unwrap();

        let graph = local.graph();
        let p0 = graph.mapping(&r0).unwrap();
        let p1 = graph.mapping(&r1).unwrap();
        let p2 = graph.mapping(&r2).unwrap();
        assert!(!p0.is_null() && !p1.is_null() && !p2.is_null());

        // The mapping is installed in both directions.
        assert_eq!(graph.mapping(&p0).unwrap(), r0);
        assert_eq!(graph.mapping(&p1).unwrap(), r1);
        assert_eq!(graph.mapping(&p2).unwrap(), r2);

        // The originals' ancestry is recorded locally.
        assert_eq!(graph.parents(&r2).unwrap(), vec![r1]);

        // The tip's changes were all filtered away: its projection is a
        // placeholder over its parent's tree.
        let store = local.objects();
        let p1_commit = store.get_commit(&p1).unwrap();
        let p2_commit = store.get_commit(&p2).unwrap();
        assert_eq!(p2_commit.tree, p1_commit.tree);
        assert_eq!(p2_commit.message, PLACEHOLDER_COMMIT_MESSAGE);
        assert_eq!(p2_commit.parents, vec![p1]);
        assert!(graph.is_sparse(&p2).unwrap());
        assert!(!graph.is_sparse(&p1).unwrap());

        // The projected tree holds the road but no buildings.
        let root = store.get_tree(&p1_commit.tree).unwrap();
        assert!(root.get("roads").is_some());
        assert!(root.get("buildings").is_none());
    }

    #[test]
    fn fetch_of_matching_tip_needs_no_placeholder() {
        let (local, _, remote, replicator) = sparse_pair("[roads]\ntype = all\n");
        let (r0, r1, r2) = s3_history(&remote);

        replicator
            .fetch(&NamedRef::new(MASTER, r1), None)
            .unwrap();

        let graph = local.graph();
        let p1 = graph.mapping(&r1).unwrap();
        assert!(!graph.mapping(&r0).unwrap().is_null());
        assert!(graph.mapping(&r2).unwrap().is_null());

        let p1_commit = local.objects().get_commit(&p1).unwrap();
        assert_eq!(p1_commit.message, "widen road");
        assert!(!graph.is_sparse(&p1).unwrap());
    }

    #[test]
    fn empty_middle_commit_collapses_into_parent_projection() {
        let (local, _, remote, replicator) = sparse_pair("[roads]\ntype = all\n");
        let r0 = commit_with(&remote, vec![], &[add(&remote, "roads/road.1", &road(2))], "add road");
        let r1 = commit_with(
            &remote,
            vec![r0],
            &[add(&remote, "buildings/b.1", &building("residential"))],
            "add building",
        );
        let r2 = commit_with(
            &remote,
            vec![r1],
            &[add(&remote, "roads/road.1", &road(4))],
            "widen road",
        );
        remote.refs().put_ref(MASTER, r2).unwrap();

        replicator
            .fetch(&NamedRef::new(MASTER, r2), None)
            .unwrap();

        let graph = local.graph();
        let p0 = graph.mapping(&r0).unwrap();
        // The empty middle commit produced no projection of its own: it
        // aliases its mainline parent's, which is now marked sparse.
        assert_eq!(graph.mapping(&r1).unwrap(), p0);
        assert_eq!(graph.mapping(&p0).unwrap(), r0);
        assert!(graph.is_sparse(&p0).unwrap());

        // The tip's projection chains to p0, not to a phantom of r1.
        let p2 = graph.mapping(&r2).unwrap();
        let p2_commit = local.objects().get_commit(&p2).unwrap();
        assert_eq!(p2_commit.parents, vec![p0]);
        assert_eq!(p2_commit.message, "widen road");
    }

    #[test]
    fn partially_filtered_commit_is_marked_sparse() {
        let (local, _, remote, replicator) = sparse_pair("[roads]\ntype = all\n");
        let r0 = commit_with(
            &remote,
            vec![],
            &[
                add(&remote, "roads/road.1", &road(2)),
                add(&remote, "buildings/b.1", &building("residential")),
            ],
            "seed both layers",
        );
        remote.refs().put_ref(MASTER, r0).unwrap();

        replicator
            .fetch(&NamedRef::new(MASTER, r0), None)
            .unwrap();

        let graph = local.graph();
        let p0 = graph.mapping(&r0).unwrap();
        assert!(graph.is_sparse(&p0).unwrap());

        let tree = local
            .objects()
            .get_tree(&local.objects().get_commit(&p0).unwrap().tree)
            .unwrap();
        assert!(tree.get("roads").is_some());
        assert!(tree.get("buildings").is_none());
    }

    #[test]
    fn attribute_filter_keeps_only_matching_features() {
        let (local, _, remote, replicator) =
            sparse_pair("[roads]\ntype = attribute\nfilter = lanes=2\n");
        let r0 = commit_with(
            &remote,
            vec![],
            &[
                add(&remote, "roads/road.1", &road(2)),
                add(&remote, "roads/road.2", &road(4)),
            ],
            "two roads",
        );
        remote.refs().put_ref(MASTER, r0).unwrap();

        replicator
            .fetch(&NamedRef::new(MASTER, r0), None)
            .unwrap();

        let graph = local.graph();
        let p0 = graph.mapping(&r0).unwrap();
        assert!(graph.is_sparse(&p0).unwrap());

        let store = local.objects();
        let root = store.get_tree(&store.get_commit(&p0).unwrap().tree).unwrap();
        let roads = store.get_tree(&root.get("roads").unwrap().id).unwrap();
        assert!(roads.get("road.1").is_some());
        assert!(roads.get("road.2").is_none());
    }

    #[test]
    fn refetch_with_no_remote_changes_writes_nothing() {
        let (_, local_store, remote, replicator) = sparse_pair("[roads]\ntype = all\n");
        let (_, _, r2) = s3_history(&remote);

        replicator
            .fetch(&NamedRef::new(MASTER, r2), None)
            .unwrap();
        let writes_after_first = local_store.write_count();

        replicator
            .fetch(&NamedRef::new(MASTER, r2), None)
            .unwrap();
        assert_eq!(local_store.write_count(), writes_after_first);
    }

    #[test]
    fn incremental_fetch_processes_only_new_commits() {
        let (local, _, remote, replicator) = sparse_pair("[roads]\ntype = all\n");
        let r0 = commit_with(&remote, vec![], &[add(&remote, "roads/road.1", &road(2))], "add road");
        remote.refs().put_ref(MASTER, r0).unwrap();
        replicator
            .fetch(&NamedRef::new(MASTER, r0), None)
            .unwrap();
        let p0 = local.graph().mapping(&r0).unwrap();

        let r1 = commit_with(
            &remote,
            vec![r0],
            &[add(&remote, "roads/road.2", &road(4))],
            "second road",
        );
        remote.refs().put_ref(MASTER, r1).unwrap();
        replicator
            .fetch(&NamedRef::new(MASTER, r1), None)
            .unwrap();

        let graph = local.graph();
        // The old projection is untouched; the new one chains onto it.
        assert_eq!(graph.mapping(&r0).unwrap(), p0);
        let p1 = graph.mapping(&r1).unwrap();
        assert_eq!(
            local.objects().get_commit(&p1).unwrap().parents,
            vec![p0]
        );
    }

    // ---- Push ----

    /// Fetch the roads history, then commit a new road locally on top of
    /// the fetched tip. Returns (r1, p1, l2).
    fn fetched_clone_with_local_commit(
        local: &Repository,
        remote: &Repository,
        replicator: &SparseReplicator<LocalRemote>,
    ) -> (ObjectId, ObjectId, ObjectId) {
        let r0 = commit_with(remote, vec![], &[add(remote, "roads/road.1", &road(2))], "add road");
        let r1 = commit_with(
            remote,
            vec![r0],
            &[add(remote, "roads/road.1", &road(4))],
            "widen road",
        );
        remote.refs().put_ref(MASTER, r1).unwrap();
        replicator
            .fetch(&NamedRef::new(MASTER, r1), None)
            .unwrap();

        let p1 = local.graph().mapping(&r1).unwrap();
        let l2 = commit_with(
            local,
            vec![p1],
            &[add(local, "roads/road.9", &road(2))],
            "local road",
        );
        (r1, p1, l2)
    }

    #[test]
    fn push_fast_forward_updates_remote_ref_and_mapping() {
        let (local, _, remote, replicator) = sparse_pair("[roads]\ntype = all\n");
        let (r1, _, l2) = fetched_clone_with_local_commit(&local, &remote, &replicator);

        replicator.push(&NamedRef::new(MASTER, l2)).unwrap();

        let graph = local.graph();
        let pushed = graph.mapping(&l2).unwrap();
        assert!(!pushed.is_null());
        assert_eq!(graph.mapping(&pushed).unwrap(), l2);

        // The remote ref now points at the reconstructed commit, whose
        // parent is the original remote tip.
        assert_eq!(remote.refs().get_ref(MASTER).unwrap(), Some(pushed));
        let full = remote.objects().get_commit(&pushed).unwrap();
        assert_eq!(full.parents, vec![r1]);
        assert_eq!(full.message, "local road");

        // The reconstructed tree carries the new road on top of the full
        // remote state.
        let root = remote.objects().get_tree(&full.tree).unwrap();
        let roads = remote
            .objects()
            .get_tree(&root.get("roads").unwrap().id)
            .unwrap();
        assert!(roads.get("road.1").is_some());
        assert!(roads.get("road.9").is_some());
    }

    #[test]
    fn push_of_unchanged_tip_is_nothing_to_push() {
        let (local, _, remote, replicator) = sparse_pair("[roads]\ntype = all\n");
        let r0 = commit_with(&remote, vec![], &[add(&remote, "roads/road.1", &road(2))], "add road");
        remote.refs().put_ref(MASTER, r0).unwrap();
        replicator
            .fetch(&NamedRef::new(MASTER, r0), None)
            .unwrap();
        let p0 = local.graph().mapping(&r0).unwrap();

        let err = replicator.push(&NamedRef::new(MASTER, p0)).unwrap_err();
        assert!(matches!(err, crate::error::SyncError::NothingToPush));
    }

    #[test]
    fn push_of_diverged_history_transmits_nothing() {
        let (local, _, remote, replicator) = sparse_pair("[roads]\ntype = all\n");
        fetched_clone_with_local_commit(&local, &remote, &replicator);
        let before = remote.refs().get_ref(MASTER).unwrap();

        // A root commit unrelated to the fetched history.
        let stray = commit_with(
            &local,
            vec![],
            &[add(&local, "roads/road.5", &road(2))],
            "unrelated root",
        );

        let err = replicator.push(&NamedRef::new(MASTER, stray)).unwrap_err();
        assert!(matches!(err, crate::error::SyncError::RemoteHasChanges));
        assert!(local.graph().mapping(&stray).unwrap().is_null());
        assert_eq!(remote.refs().get_ref(MASTER).unwrap(), before);
    }

    #[test]
    fn push_to_absent_remote_ref_creates_it() {
        let (local, _, remote, replicator) = sparse_pair("[roads]\ntype = all\n");
        let (_, _, l2) = fetched_clone_with_local_commit(&local, &remote, &replicator);

        replicator
            .push_to(&NamedRef::new(MASTER, l2), "refs/heads/topic")
            .unwrap();

        let pushed = local.graph().mapping(&l2).unwrap();
        assert_eq!(
            remote.refs().get_ref("refs/heads/topic").unwrap(),
            Some(pushed)
        );
        // The original master ref is untouched.
        assert_ne!(remote.refs().get_ref(MASTER).unwrap(), Some(pushed));
    }
}
