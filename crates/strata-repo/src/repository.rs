//! The repository: storage backends, configuration, and location.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use strata_graph::{GraphDatabase, InMemoryGraphDatabase};
use strata_refs::{InMemoryRefDatabase, RefDatabase, RefValue};
use strata_store::{InMemoryObjectStore, ObjectStore};
use strata_types::ObjectId;

use crate::config::RepositoryConfig;
use crate::error::{RepoError, RepoResult};

/// URL scheme of repositories on the local filesystem.
const FILE_SCHEME: &str = "file://";

/// One versioned dataset: object store, commit graph, refs, config, and
/// the location it lives at.
///
/// `Repository` is a cheap handle — the backends are shared behind `Arc`s
/// and cloning the repository clones the handles, not the data.
#[derive(Clone)]
pub struct Repository {
    objects: Arc<dyn ObjectStore>,
    graph: Arc<dyn GraphDatabase>,
    refs: Arc<dyn RefDatabase>,
    config: Arc<RwLock<RepositoryConfig>>,
    location: String,
}

impl Repository {
    /// Assemble a repository from its backends.
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        graph: Arc<dyn GraphDatabase>,
        refs: Arc<dyn RefDatabase>,
        config: RepositoryConfig,
        location: impl Into<String>,
    ) -> Self {
        Self {
            objects,
            graph,
            refs,
            config: Arc::new(RwLock::new(config)),
            location: location.into(),
        }
    }

    /// A repository backed entirely by in-memory stores, for tests and
    /// embedding.
    pub fn in_memory(location: impl Into<String>) -> Self {
        Self::new(
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryGraphDatabase::new()),
            Arc::new(InMemoryRefDatabase::new()),
            RepositoryConfig::new(),
            location,
        )
    }

    /// The content-addressed object store.
    pub fn objects(&self) -> &dyn ObjectStore {
        self.objects.as_ref()
    }

    /// The commit-graph database.
    pub fn graph(&self) -> &dyn GraphDatabase {
        self.graph.as_ref()
    }

    /// The reference database.
    pub fn refs(&self) -> &dyn RefDatabase {
        self.refs.as_ref()
    }

    /// Shared handle to the reference database.
    pub fn refs_handle(&self) -> Arc<dyn RefDatabase> {
        self.refs.clone()
    }

    /// The repository's location URL (e.g. `file:///data/osm`).
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The repository root directory, for local repositories.
    ///
    /// Fails with [`RepoError::RemoteLocation`] when the location is not a
    /// `file://` URL.
    pub fn root_dir(&self) -> RepoResult<PathBuf> {
        match self.location.strip_prefix(FILE_SCHEME) {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Err(RepoError::RemoteLocation {
                location: self.location.clone(),
            }),
        }
    }

    /// Read a config value by dotted key.
    pub fn config_get(&self, key: &str) -> Option<String> {
        self.config
            .read()
            .expect("lock poisoned")
            .get(key)
            .map(str::to_string)
    }

    /// Set a config value by dotted key.
    pub fn config_set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.config
            .write()
            .expect("lock poisoned")
            .set(key, value);
    }

    /// Resolve a ref name to a commit id, following at most one symbolic
    /// indirection.
    ///
    /// Returns `Ok(None)` for absent refs and for symbolic refs whose
    /// target is dangling.
    pub fn resolve_ref(&self, name: &str) -> RepoResult<Option<ObjectId>> {
        match self.refs.get(name)? {
            None => Ok(None),
            Some(RefValue::Id(id)) => Ok(Some(id)),
            Some(RefValue::Symbolic(target)) => match self.refs.get(&target)? {
                Some(RefValue::Id(id)) => Ok(Some(id)),
                _ => Ok(None),
            },
        }
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("location", &self.location)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_refs::HEAD;
    use strata_types::ContentHasher;

    fn oid(data: &[u8]) -> ObjectId {
        ContentHasher::COMMIT.hash(data)
    }

    #[test]
    fn root_dir_of_local_repository() {
        let repo = Repository::in_memory("file:///data/osm");
        assert_eq!(repo.root_dir().unwrap(), PathBuf::from("/data/osm"));
    }

    #[test]
    fn root_dir_rejects_non_file_locations() {
        let repo = Repository::in_memory("http://example.com/osm");
        assert!(matches!(
            repo.root_dir(),
            Err(RepoError::RemoteLocation { .. })
        ));
    }

    #[test]
    fn config_roundtrip() {
        let repo = Repository::in_memory("file:///r");
        assert_eq!(repo.config_get("sparse.filter"), None);
        repo.config_set("sparse.filter", "filter.ini");
        assert_eq!(
            repo.config_get("sparse.filter"),
            Some("filter.ini".to_string())
        );
    }

    #[test]
    fn resolve_direct_and_symbolic_refs() {
        let repo = Repository::in_memory("file:///r");
        let tip = oid(b"tip");
        repo.refs().put_ref("refs/heads/main", tip).unwrap();
        repo.refs().put_sym_ref(HEAD, "refs/heads/main").unwrap();

        assert_eq!(repo.resolve_ref("refs/heads/main").unwrap(), Some(tip));
        assert_eq!(repo.resolve_ref(HEAD).unwrap(), Some(tip));
        assert_eq!(repo.resolve_ref("refs/heads/ghost").unwrap(), None);
    }

    #[test]
    fn dangling_symbolic_ref_resolves_to_none() {
        let repo = Repository::in_memory("file:///r");
        repo.refs().put_sym_ref(HEAD, "refs/heads/unborn").unwrap();
        assert_eq!(repo.resolve_ref(HEAD).unwrap(), None);
    }
}
