//! The sparse replicator: filtered fetch and push orchestration.

use tracing::{debug, info};

use strata_diff::apply_changes;
use strata_graph::{
    common_ancestor, CommitNode, CommitTraverser, Evaluation, SPARSE_FLAG,
};
use strata_repo::Repository;
use strata_store::{empty_tree_id, Commit, ObjectKind};
use strata_types::ObjectId;

use crate::error::{SyncError, SyncResult};
use crate::filter::RepositoryFilter;
use crate::protocol::SparseProtocol;
use crate::types::NamedRef;

/// Message of the projection forced into existence at the tip of a fetch
/// whose filtered diff is empty, so the fetched ref has a commit to point
/// at.
pub const PLACEHOLDER_COMMIT_MESSAGE: &str = "Placeholder Sparse Commit";

/// Config key naming the sparse filter file, relative to the repository
/// root.
pub const SPARSE_FILTER_KEY: &str = "sparse.filter";

/// Synchronizes commits between a sparse local repository and a full
/// remote, in either direction.
///
/// Fetch projects each remote commit through the repository filter into a
/// local counterpart and records the original↔projection mapping; push
/// walks unmapped local commits and hands each to the protocol's
/// [`push_sparse_commit`](SparseProtocol::push_sparse_commit).
pub struct SparseReplicator<P: SparseProtocol> {
    local: Repository,
    protocol: P,
    filter: RepositoryFilter,
}

impl<P: SparseProtocol> std::fmt::Debug for SparseReplicator<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparseReplicator").finish_non_exhaustive()
    }
}

impl<P: SparseProtocol> SparseReplicator<P> {
    /// Open a replicator for a sparse clone, loading its filter.
    ///
    /// The repository config must name the filter file under
    /// [`SPARSE_FILTER_KEY`]; the path is resolved against the repository
    /// root, so the repository must live on the local filesystem.
    pub fn new(local: Repository, protocol: P) -> SyncResult<Self> {
        let filter_file = local
            .config_get(SPARSE_FILTER_KEY)
            .ok_or(SyncError::MissingFilter)?;
        let root = local
            .root_dir()
            .map_err(|_| SyncError::NonLocalRepository {
                location: local.location().to_string(),
            })?;
        let filter = RepositoryFilter::load(&root.join(filter_file))?;
        Ok(Self::with_filter(local, protocol, filter))
    }

    /// Open a replicator with an already-constructed filter.
    pub fn with_filter(local: Repository, protocol: P, filter: RepositoryFilter) -> Self {
        Self {
            local,
            protocol,
            filter,
        }
    }

    /// The filter this sparse clone is defined by.
    pub fn filter(&self) -> &RepositoryFilter {
        &self.filter
    }

    /// Fetch all new commits reachable from `remote_ref`, projecting each
    /// through the filter.
    ///
    /// `depth` must be `None`: a sparse clone cannot be shallow.
    pub fn fetch(&self, remote_ref: &NamedRef, depth: Option<u32>) -> SyncResult<()> {
        if depth.is_some() {
            return Err(SyncError::SparseShallow);
        }
        info!(name = %remote_ref.name, tip = %remote_ref.id.short_hex(), "sparse fetch");

        let graph = self.local.graph();
        let mut gatherer = CommitTraverser::new(
            |node: &CommitNode| -> SyncResult<Evaluation> {
                Ok(if graph.exists(&node.id)? {
                    Evaluation::ExcludeAndPrune
                } else {
                    Evaluation::IncludeAndContinue
                })
            },
            |id: &ObjectId| self.protocol.get_parents(id),
            |id: &ObjectId| Ok(graph.exists(id)?),
        );
        gatherer.traverse(remote_ref.id)?;

        let needed = gatherer.commits;
        let count = needed.len();
        for (index, commit_id) in needed.into_iter().enumerate() {
            // The tip is allowed an empty projection so the fetched ref
            // has a commit to point at.
            let allow_empty = index + 1 == count;
            self.fetch_sparse_commit(commit_id, allow_empty)?;
        }

        info!(commits = count, "sparse fetch complete");
        Ok(())
    }

    /// Project one remote commit into the local repository.
    ///
    /// The commit's filtered changes are applied on top of the tree of its
    /// mainline parent's projection; the resulting commit is linked to the
    /// original through the commit mapping. An empty filtered diff
    /// collapses the commit into its mainline parent's projection —
    /// unless `allow_empty` forces a placeholder.
    fn fetch_sparse_commit(&self, commit_id: ObjectId, allow_empty: bool) -> SyncResult<()> {
        let object = self
            .protocol
            .get_object(&commit_id)?
            .ok_or(SyncError::ObjectNotFound(commit_id))?;
        if object.kind != ObjectKind::Commit {
            return Err(SyncError::NotACommit(commit_id));
        }
        let commit = Commit::from_stored_object(&object)?;

        let changes = self.protocol.get_filtered_changes(&commit, &self.filter)?;

        let graph = self.local.graph();
        graph.put(commit_id, commit.parents.clone())?;

        let mut base_tree = empty_tree_id();
        if let Some(mainline) = commit.mainline_parent() {
            let mapped_parent = graph.mapping(&mainline)?;
            if !mapped_parent.is_null() {
                // Until a projection of its own is built, this commit
                // projects to the last sparse commit in its ancestry.
                graph.alias(commit_id, mapped_parent)?;
                base_tree = self.local.objects().get_commit(&mapped_parent)?.tree;
            }
        }

        if !changes.is_empty() {
            let was_filtered = changes.was_filtered();
            let new_tree = apply_changes(self.local.objects(), &base_tree, changes.entries())?;
            let projected = Commit {
                tree: new_tree,
                parents: self.mapped_parents(&commit)?,
                author: commit.author.clone(),
                committer: commit.committer.clone(),
                message: commit.message.clone(),
            };
            let projected_id = self.local.objects().put_commit(&projected)?;
            graph.put(projected_id, projected.parents.clone())?;
            if was_filtered {
                graph.set_property(&projected_id, SPARSE_FLAG, "true")?;
            }
            graph.map(commit_id, projected_id)?;
            debug!(
                original = %commit_id.short_hex(),
                projection = %projected_id.short_hex(),
                "projected commit"
            );
        } else if allow_empty {
            let projected = Commit {
                tree: base_tree,
                parents: self.mapped_parents(&commit)?,
                author: commit.author.clone(),
                committer: commit.committer.clone(),
                message: PLACEHOLDER_COMMIT_MESSAGE.to_string(),
            };
            let projected_id = self.local.objects().put_commit(&projected)?;
            graph.put(projected_id, projected.parents.clone())?;
            graph.set_property(&projected_id, SPARSE_FLAG, "true")?;
            graph.map(commit_id, projected_id)?;
            debug!(
                original = %commit_id.short_hex(),
                projection = %projected_id.short_hex(),
                "placeholder projection"
            );
        } else {
            // Nothing survived the filter: the commit's projection stays
            // its mainline parent's, which is now missing this commit's
            // changes.
            let projection = graph.mapping(&commit_id)?;
            if projection.is_null() {
                return Err(SyncError::MissingMapping(commit_id));
            }
            graph.set_property(&projection, SPARSE_FLAG, "true")?;
        }

        Ok(())
    }

    /// The projections of a commit's parents, dropping parents that have
    /// none.
    fn mapped_parents(&self, commit: &Commit) -> SyncResult<Vec<ObjectId>> {
        let graph = self.local.graph();
        let mut parents = Vec::new();
        for parent in &commit.parents {
            let mapped = graph.mapping(parent)?;
            if !mapped.is_null() {
                parents.push(mapped);
            }
        }
        Ok(parents)
    }

    /// Push all new commits reachable from `local_ref` to the remote ref
    /// of the same name.
    pub fn push(&self, local_ref: &NamedRef) -> SyncResult<()> {
        self.push_to(local_ref, &local_ref.name)
    }

    /// Push all new commits reachable from `local_ref` to `refspec`.
    pub fn push_to(&self, local_ref: &NamedRef, refspec: &str) -> SyncResult<()> {
        let remote_ref = self.protocol.get_remote_ref(refspec)?;
        self.check_push(local_ref, remote_ref.as_ref())?;
        self.protocol.begin_push()?;
        info!(name = %local_ref.name, refspec, "sparse push");

        let graph = self.local.graph();
        let mut gatherer = CommitTraverser::new(
            |node: &CommitNode| -> SyncResult<Evaluation> {
                // A mapped commit has already been pushed.
                Ok(if !graph.mapping(&node.id)?.is_null() {
                    Evaluation::ExcludeAndPrune
                } else {
                    Evaluation::IncludeAndContinue
                })
            },
            |id: &ObjectId| Ok(graph.parents(id)?),
            |id: &ObjectId| Ok(!graph.mapping(id)?.is_null()),
        );
        gatherer.traverse(local_ref.id)?;

        let count = gatherer.commits.len();
        for commit_id in &gatherer.commits {
            self.protocol.push_sparse_commit(commit_id)?;
        }

        let new_commit = graph.mapping(&local_ref.id)?;
        let original_remote_value = remote_ref
            .map(|r| r.id)
            .unwrap_or_else(ObjectId::null);
        self.protocol
            .end_push(refspec, new_commit, original_remote_value)?;

        info!(commits = count, "sparse push complete");
        Ok(())
    }

    /// Decide whether pushing `local_ref` over `remote_ref` is safe.
    ///
    /// The remote ref's commit is translated through the mapping into the
    /// local history; the push proceeds only when that translation is a
    /// strict ancestor of the local tip (a fast-forward).
    fn check_push(&self, local_ref: &NamedRef, remote_ref: Option<&NamedRef>) -> SyncResult<()> {
        let Some(remote) = remote_ref else {
            return Ok(());
        };
        let graph = self.local.graph();
        let mapped = graph.mapping(&remote.id)?;
        if mapped == local_ref.id {
            return Err(SyncError::NothingToPush);
        }
        if !self.local.objects().exists(&mapped)? {
            return Err(SyncError::RemoteHasChanges);
        }
        match common_ancestor(graph, &mapped, &local_ref.id)? {
            None => Err(SyncError::RemoteHasChanges),
            Some(ancestor) if ancestor == local_ref.id => Err(SyncError::NothingToPush),
            Some(ancestor) if ancestor != mapped => Err(SyncError::RemoteHasChanges),
            Some(_) => Ok(()),
        }
    }
}
