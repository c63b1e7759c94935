//! The [`RefDatabase`] trait defining the reference storage contract.
//!
//! A ref database is a flat mapping from slash-delimited names to
//! [`RefValue`]s. Backends (in-memory, filesystem, database) implement the
//! primary methods; the typed direct/symbolic accessors are provided on
//! top of them, so decorators that override [`get`](RefDatabase::get)
//! inherit consistent behavior everywhere.

use std::collections::BTreeMap;

use strata_types::ObjectId;

use crate::error::{RefError, RefResult};
use crate::types::RefValue;

/// Storage backend for named references.
///
/// Implementations must be thread-safe (`Send + Sync`). The database holds
/// a single advisory lock: callers bracket multi-step compound updates with
/// [`lock`](RefDatabase::lock) / [`unlock`](RefDatabase::unlock).
pub trait RefDatabase: Send + Sync {
    /// Acquire the database lock, waiting up to the backend's timeout.
    ///
    /// Fails with [`RefError::LockTimeout`] if the lock cannot be acquired
    /// in time.
    fn lock(&self) -> RefResult<()>;

    /// Release the database lock.
    fn unlock(&self) -> RefResult<()>;

    /// Initialize backend storage. Idempotent.
    fn create(&self) -> RefResult<()>;

    /// Read a ref by name. Returns `Ok(None)` if the ref does not exist.
    fn get(&self, name: &str) -> RefResult<Option<RefValue>>;

    /// Write (create or update) a ref.
    fn put(&self, name: &str, value: RefValue) -> RefResult<()>;

    /// Remove a ref, returning its prior value.
    fn remove(&self, name: &str) -> RefResult<Option<RefValue>>;

    /// All refs whose name starts with `prefix`, keyed by full name.
    ///
    /// Pass `""` to list every ref.
    fn get_all(&self, prefix: &str) -> RefResult<BTreeMap<String, RefValue>>;

    /// Remove every ref whose name starts with `prefix`; returns the
    /// removed entries keyed by full name.
    fn remove_all(&self, prefix: &str) -> RefResult<BTreeMap<String, RefValue>>;

    /// Read a direct ref's object id.
    ///
    /// Returns `Ok(None)` when absent and [`RefError::UnexpectedSymbolic`]
    /// when the name holds a symbolic ref.
    fn get_ref(&self, name: &str) -> RefResult<Option<ObjectId>> {
        match self.get(name)? {
            None => Ok(None),
            Some(RefValue::Id(id)) => Ok(Some(id)),
            Some(RefValue::Symbolic(_)) => Err(RefError::UnexpectedSymbolic {
                name: name.to_string(),
            }),
        }
    }

    /// Read a symbolic ref's target name.
    ///
    /// Returns `Ok(None)` when absent and [`RefError::UnexpectedDirect`]
    /// when the name holds a direct ref.
    fn get_sym_ref(&self, name: &str) -> RefResult<Option<String>> {
        match self.get(name)? {
            None => Ok(None),
            Some(RefValue::Symbolic(target)) => Ok(Some(target)),
            Some(RefValue::Id(_)) => Err(RefError::UnexpectedDirect {
                name: name.to_string(),
            }),
        }
    }

    /// Write a direct ref.
    fn put_ref(&self, name: &str, id: ObjectId) -> RefResult<()> {
        self.put(name, RefValue::Id(id))
    }

    /// Write a symbolic ref.
    fn put_sym_ref(&self, name: &str, target: &str) -> RefResult<()> {
        self.put(name, RefValue::Symbolic(target.to_string()))
    }
}
