//! The bridge user hooks call into.
//!
//! Hooks run against two surfaces: a [`CommandRegistry`] of named
//! operations built at startup (hooks look commands up by name only), and
//! a [`RepositoryApi`] read facade over the repository. A hook vetoes the
//! surrounding operation by returning the error built with
//! [`RepositoryApi::veto`], which bubbles out unchanged.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use strata_store::{EntryKind, Feature, ObjectStore};
use strata_types::ObjectId;

use crate::error::{RepoError, RepoResult};
use crate::repository::Repository;

/// String parameter map handed to a command by a hook.
pub type CommandParams = BTreeMap<String, String>;

type CommandFn = Box<dyn Fn(&Repository, &CommandParams) -> RepoResult<String> + Send + Sync>;

/// Named operations hooks may invoke.
///
/// Built once at startup; lookup is by name only.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandFn>,
}

impl CommandRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command under `name`, replacing any previous builder.
    pub fn register<F>(&mut self, name: impl Into<String>, command: F)
    where
        F: Fn(&Repository, &CommandParams) -> RepoResult<String> + Send + Sync + 'static,
    {
        self.commands.insert(name.into(), Box::new(command));
    }

    /// Whether a command is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Sorted names of every registered command.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run the command registered under `name`.
    pub fn run(
        &self,
        repository: &Repository,
        name: &str,
        params: &CommandParams,
    ) -> RepoResult<String> {
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| RepoError::UnknownCommand(name.to_string()))?;
        debug!(command = name, "running hook command");
        command(repository, params)
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}

/// Read facade over a repository for hook scripts.
pub struct RepositoryApi<'a> {
    repository: &'a Repository,
}

impl<'a> RepositoryApi<'a> {
    pub fn new(repository: &'a Repository) -> Self {
        Self { repository }
    }

    /// The veto error a hook raises to stop the surrounding operation.
    pub fn veto(message: impl Into<String>) -> RepoError {
        RepoError::CannotRunOperation(message.into())
    }

    /// The feature at `path` in the tree of `commit`, or `None` if the
    /// path does not resolve to a feature.
    pub fn feature_at(&self, commit: &ObjectId, path: &str) -> RepoResult<Option<Feature>> {
        let store = self.repository.objects();
        let commit = store.get_commit(commit)?;
        let mut tree = store.get_tree(&commit.tree)?;

        let mut components = path.split('/').peekable();
        while let Some(component) = components.next() {
            let Some(entry) = tree.get(component) else {
                return Ok(None);
            };
            match (entry.kind, components.peek().is_some()) {
                (EntryKind::Tree, true) => tree = store.get_tree(&entry.id)?,
                (EntryKind::Feature, false) => {
                    return Ok(Some(store.get_feature(&entry.id)?));
                }
                _ => return Ok(None),
            }
        }
        Ok(None)
    }

    /// The feature at `path` in the commit a ref resolves to, or `None`
    /// when the ref is dangling or the path does not resolve.
    pub fn feature_at_ref(&self, ref_name: &str, path: &str) -> RepoResult<Option<Feature>> {
        match self.repository.resolve_ref(ref_name)? {
            None => Ok(None),
            Some(commit) => self.feature_at(&commit, path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_refs::{RefDatabase, HEAD};
    use strata_store::{AttributeValue, Commit, Signature, Tree, TreeEntry};
    use strata_types::ContentHasher;

    fn sig() -> Signature {
        Signature::new("Jane", "jane@example.com", 0)
    }

    /// A repository whose HEAD commit holds roads/road.1.
    fn seeded_repo() -> (Repository, ObjectId) {
        let repo = Repository::in_memory("file:///r");
        let store = repo.objects();

        let feature = Feature::new(vec![
            ("name".to_string(), AttributeValue::Text("Main St".into())),
            ("lanes".to_string(), AttributeValue::Int(2)),
        ]);
        let feature_id = store.put(&feature.to_stored_object().unwrap()).unwrap();

        let meta = ContentHasher::FEATURE_TYPE.hash(b"roads");
        let roads = store
            .put_tree(&Tree::new(vec![TreeEntry::feature(
                "road.1", feature_id, meta,
            )]))
            .unwrap();
        let root = store
            .put_tree(&Tree::new(vec![TreeEntry::subtree("roads", roads, meta)]))
            .unwrap();

        let commit = Commit {
            tree: root,
            parents: vec![],
            author: sig(),
            committer: sig(),
            message: "add road".into(),
        };
        let commit_id = store.put_commit(&commit).unwrap();

        repo.refs().put_ref("refs/heads/main", commit_id).unwrap();
        repo.refs().put_sym_ref(HEAD, "refs/heads/main").unwrap();
        (repo, commit_id)
    }

    #[test]
    fn feature_lookup_by_commit_and_path() {
        let (repo, commit_id) = seeded_repo();
        let api = RepositoryApi::new(&repo);

        let feature = api.feature_at(&commit_id, "roads/road.1").unwrap().unwrap();
        assert_eq!(feature.get("lanes"), Some(&AttributeValue::Int(2)));

        assert!(api.feature_at(&commit_id, "roads/road.9").unwrap().is_none());
        assert!(api.feature_at(&commit_id, "rivers/r.1").unwrap().is_none());
        // A subtree path is not a feature.
        assert!(api.feature_at(&commit_id, "roads").unwrap().is_none());
    }

    #[test]
    fn feature_lookup_through_head() {
        let (repo, _) = seeded_repo();
        let api = RepositoryApi::new(&repo);

        let feature = api.feature_at_ref(HEAD, "roads/road.1").unwrap().unwrap();
        assert_eq!(
            feature.get("name"),
            Some(&AttributeValue::Text("Main St".into()))
        );
        assert!(api
            .feature_at_ref("refs/heads/ghost", "roads/road.1")
            .unwrap()
            .is_none());
    }

    #[test]
    fn registry_dispatches_by_name() {
        let (repo, _) = seeded_repo();
        let mut registry = CommandRegistry::new();
        registry.register("echo", |_repo, params: &CommandParams| {
            Ok(params.get("message").cloned().unwrap_or_default())
        });

        let mut params = CommandParams::new();
        params.insert("message".into(), "hello".into());
        assert_eq!(registry.run(&repo, "echo", &params).unwrap(), "hello");
        assert!(registry.contains("echo"));
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[test]
    fn unknown_command_is_an_error() {
        let (repo, _) = seeded_repo();
        let registry = CommandRegistry::new();
        let err = registry.run(&repo, "nope", &CommandParams::new()).unwrap_err();
        assert!(matches!(err, RepoError::UnknownCommand(_)));
    }

    #[test]
    fn veto_bubbles_out_unchanged() {
        let (repo, _) = seeded_repo();
        let mut registry = CommandRegistry::new();
        registry.register("guarded", |_repo, _params: &CommandParams| {
            Err(RepositoryApi::veto("unreviewed data"))
        });

        let err = registry
            .run(&repo, "guarded", &CommandParams::new())
            .unwrap_err();
        assert!(matches!(err, RepoError::CannotRunOperation(_)));
        assert_eq!(err.to_string(), "cannot run operation: unreviewed data");
    }
}
