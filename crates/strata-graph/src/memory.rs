//! In-memory commit-graph database for testing and ephemeral use.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use strata_types::ObjectId;

use crate::error::{GraphError, GraphResult};
use crate::traits::GraphDatabase;

/// An in-memory implementation of [`GraphDatabase`].
///
/// Parent lists, properties, and the commit mapping live in `HashMap`s
/// behind `RwLock`s. Data is lost when the database is dropped.
#[derive(Default)]
pub struct InMemoryGraphDatabase {
    parents: RwLock<HashMap<ObjectId, Vec<ObjectId>>>,
    properties: RwLock<HashMap<ObjectId, HashMap<String, String>>>,
    mappings: RwLock<HashMap<ObjectId, ObjectId>>,
}

impl InMemoryGraphDatabase {
    /// Create a new empty graph database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of commits recorded.
    pub fn len(&self) -> usize {
        self.parents.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no commits are recorded.
    pub fn is_empty(&self) -> bool {
        self.parents.read().expect("lock poisoned").is_empty()
    }
}

impl GraphDatabase for InMemoryGraphDatabase {
    fn put(&self, commit: ObjectId, parents: Vec<ObjectId>) -> GraphResult<()> {
        if commit.is_null() {
            return Err(GraphError::NullId { operation: "put" });
        }
        let mut map = self.parents.write().expect("lock poisoned");
        if map.insert(commit, parents).is_none() {
            debug!(commit = %commit.short_hex(), "recorded commit in graph");
        }
        Ok(())
    }

    fn parents(&self, commit: &ObjectId) -> GraphResult<Vec<ObjectId>> {
        let map = self.parents.read().expect("lock poisoned");
        Ok(map.get(commit).cloned().unwrap_or_default())
    }

    fn exists(&self, commit: &ObjectId) -> GraphResult<bool> {
        let map = self.parents.read().expect("lock poisoned");
        Ok(map.contains_key(commit))
    }

    fn set_property(&self, commit: &ObjectId, key: &str, value: &str) -> GraphResult<()> {
        if commit.is_null() {
            return Err(GraphError::NullId {
                operation: "set_property",
            });
        }
        let mut props = self.properties.write().expect("lock poisoned");
        props
            .entry(*commit)
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_property(&self, commit: &ObjectId, key: &str) -> GraphResult<Option<String>> {
        let props = self.properties.read().expect("lock poisoned");
        Ok(props
            .get(commit)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn map(&self, a: ObjectId, b: ObjectId) -> GraphResult<()> {
        if a.is_null() || b.is_null() {
            return Err(GraphError::NullId { operation: "map" });
        }
        let mut mappings = self.mappings.write().expect("lock poisoned");
        mappings.insert(a, b);
        mappings.insert(b, a);
        Ok(())
    }

    fn alias(&self, original: ObjectId, projection: ObjectId) -> GraphResult<()> {
        if original.is_null() || projection.is_null() {
            return Err(GraphError::NullId { operation: "alias" });
        }
        let mut mappings = self.mappings.write().expect("lock poisoned");
        mappings.insert(original, projection);
        Ok(())
    }

    fn mapping(&self, commit: &ObjectId) -> GraphResult<ObjectId> {
        if commit.is_null() {
            return Ok(ObjectId::null());
        }
        let mappings = self.mappings.read().expect("lock poisoned");
        Ok(mappings.get(commit).copied().unwrap_or_else(ObjectId::null))
    }
}

impl std::fmt::Debug for InMemoryGraphDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryGraphDatabase")
            .field("commit_count", &self.len())
            .finish()
    }
}
