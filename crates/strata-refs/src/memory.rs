//! In-memory reference database for testing and ephemeral use.
//!
//! [`InMemoryRefDatabase`] keeps all refs in a `BTreeMap` behind a
//! `RwLock`, storing the serialized string form (40-hex for direct refs,
//! `ref: <target>` for symbolic refs). The advisory database lock is a
//! `Mutex` + `Condvar` pair with a configurable acquisition timeout.

use std::collections::BTreeMap;
use std::sync::{Condvar, Mutex, RwLock};
use std::time::Duration;

use crate::error::{RefError, RefResult};
use crate::names::validate_ref_name;
use crate::traits::RefDatabase;
use crate::types::RefValue;

/// Default time to wait for the advisory lock before timing out.
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// An in-memory implementation of [`RefDatabase`].
///
/// Data is lost when the database is dropped.
pub struct InMemoryRefDatabase {
    refs: RwLock<BTreeMap<String, String>>,
    locked: Mutex<bool>,
    lock_released: Condvar,
    lock_timeout: Duration,
}

impl InMemoryRefDatabase {
    /// Create a new empty ref database with the default lock timeout.
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Create a new empty ref database with a custom lock timeout.
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            refs: RwLock::new(BTreeMap::new()),
            locked: Mutex::new(false),
            lock_released: Condvar::new(),
            lock_timeout,
        }
    }

    /// Number of refs currently stored.
    pub fn len(&self) -> usize {
        self.refs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no refs are stored.
    pub fn is_empty(&self) -> bool {
        self.refs.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryRefDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl RefDatabase for InMemoryRefDatabase {
    fn lock(&self) -> RefResult<()> {
        let mut locked = self.locked.lock().expect("lock poisoned");
        let deadline = std::time::Instant::now() + self.lock_timeout;
        while *locked {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return Err(RefError::LockTimeout);
            }
            let (guard, result) = self
                .lock_released
                .wait_timeout(locked, remaining)
                .expect("lock poisoned");
            locked = guard;
            if result.timed_out() && *locked {
                return Err(RefError::LockTimeout);
            }
        }
        *locked = true;
        Ok(())
    }

    fn unlock(&self) -> RefResult<()> {
        let mut locked = self.locked.lock().expect("lock poisoned");
        *locked = false;
        self.lock_released.notify_one();
        Ok(())
    }

    fn create(&self) -> RefResult<()> {
        Ok(())
    }

    fn get(&self, name: &str) -> RefResult<Option<RefValue>> {
        let refs = self.refs.read().expect("lock poisoned");
        match refs.get(name) {
            None => Ok(None),
            Some(raw) => Ok(Some(RefValue::decode(name, raw)?)),
        }
    }

    fn put(&self, name: &str, value: RefValue) -> RefResult<()> {
        validate_ref_name(name)?;
        let mut refs = self.refs.write().expect("lock poisoned");
        refs.insert(name.to_string(), value.encode());
        Ok(())
    }

    fn remove(&self, name: &str) -> RefResult<Option<RefValue>> {
        let mut refs = self.refs.write().expect("lock poisoned");
        match refs.remove(name) {
            None => Ok(None),
            Some(raw) => Ok(Some(RefValue::decode(name, &raw)?)),
        }
    }

    fn get_all(&self, prefix: &str) -> RefResult<BTreeMap<String, RefValue>> {
        let refs = self.refs.read().expect("lock poisoned");
        let mut result = BTreeMap::new();
        for (name, raw) in refs.range(prefix.to_string()..) {
            if !name.starts_with(prefix) {
                break;
            }
            result.insert(name.clone(), RefValue::decode(name, raw)?);
        }
        Ok(result)
    }

    fn remove_all(&self, prefix: &str) -> RefResult<BTreeMap<String, RefValue>> {
        let mut refs = self.refs.write().expect("lock poisoned");
        let names: Vec<String> = refs
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(name, _)| name.clone())
            .collect();
        let mut removed = BTreeMap::new();
        for name in names {
            if let Some(raw) = refs.remove(&name) {
                let value = RefValue::decode(&name, &raw)?;
                removed.insert(name, value);
            }
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for InMemoryRefDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRefDatabase")
            .field("ref_count", &self.len())
            .finish()
    }
}
