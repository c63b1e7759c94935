//! Transaction-scoped reference namespacing.
//!
//! [`TransactionRefDatabase`] is a [`RefDatabase`] decorator for one open
//! transaction. It creates a private namespace under
//! `transactions/<transaction id>/` and maps every query and storage
//! method into that namespace, so that commands executed inside the
//! transaction are handed this database and do their work without ever
//! noticing they are running inside a transaction.
//!
//! Namespace layout for transaction `T`:
//!
//! - `transactions/<T>/` — the **live** namespace; every write during the
//!   transaction lands here.
//! - `transactions/<T>/orig/` — a snapshot of the user refs as they were
//!   at transaction begin, consulted when a read misses the live
//!   namespace.
//!
//! [`create`](TransactionRefDatabase::create) must be called once before
//! the decorator is used, and [`close`](TransactionRefDatabase::close)
//! once after, to set up and tear down the namespace.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use strata_types::ObjectId;

use crate::error::RefResult;
use crate::traits::RefDatabase;
use crate::types::{RefValue, HEAD, REFS_PREFIX, STAGE_HEAD, TRANSACTIONS_PREFIX, WORK_HEAD};

/// A [`RefDatabase`] decorator scoped to a single transaction.
pub struct TransactionRefDatabase {
    refdb: Arc<dyn RefDatabase>,
    tx_prefix: String,
    tx_orig_prefix: String,
}

impl TransactionRefDatabase {
    /// Create a decorator over `refdb` for the transaction `transaction_id`.
    pub fn new(refdb: Arc<dyn RefDatabase>, transaction_id: Uuid) -> Self {
        let tx_prefix = format!("{TRANSACTIONS_PREFIX}{transaction_id}/");
        let tx_orig_prefix = format!("{tx_prefix}orig/");
        Self {
            refdb,
            tx_prefix,
            tx_orig_prefix,
        }
    }

    fn to_internal(&self, name: &str) -> String {
        format!("{}{name}", self.tx_prefix)
    }

    fn to_orig_internal(&self, name: &str) -> String {
        format!("{}{name}", self.tx_orig_prefix)
    }

    /// Strip the transaction prefixes from an internal name.
    ///
    /// The orig prefix nests under the live prefix, so it is checked first.
    fn to_external(&self, name: &str) -> String {
        if let Some(rest) = name.strip_prefix(&self.tx_orig_prefix) {
            return rest.to_string();
        }
        if let Some(rest) = name.strip_prefix(&self.tx_prefix) {
            return rest.to_string();
        }
        name.to_string()
    }

    /// Strip the live prefix from a symbolic target so the external view
    /// shows only user-visible names.
    fn to_external_value(&self, value: RefValue) -> RefValue {
        match value {
            RefValue::Symbolic(target) => {
                let target = match target.strip_prefix(&self.tx_prefix) {
                    Some(stripped) => stripped.to_string(),
                    None => target,
                };
                RefValue::Symbolic(target)
            }
            direct => direct,
        }
    }

    fn externalize(&self, entries: BTreeMap<String, RefValue>) -> BTreeMap<String, RefValue> {
        entries
            .into_iter()
            .map(|(name, value)| (self.to_external(&name), self.to_external_value(value)))
            .collect()
    }
}

impl RefDatabase for TransactionRefDatabase {
    fn lock(&self) -> RefResult<()> {
        self.refdb.lock()
    }

    fn unlock(&self) -> RefResult<()> {
        self.refdb.unlock()
    }

    /// Set up the transaction namespace: snapshot the three heads into the
    /// live namespace, and every ref under `refs/` into both the live and
    /// the orig namespaces. Absent heads are not copied.
    fn create(&self) -> RefResult<()> {
        self.refdb.create()?;

        for head in [HEAD, WORK_HEAD, STAGE_HEAD] {
            if let Some(value) = self.refdb.get(head)? {
                self.refdb.put(&self.to_internal(head), value)?;
            }
        }

        let user_refs = self.refdb.get_all(REFS_PREFIX)?;
        for (name, value) in user_refs {
            self.refdb.put(&self.to_internal(&name), value.clone())?;
            self.refdb.put(&self.to_orig_internal(&name), value)?;
        }

        debug!(namespace = %self.tx_prefix, "created transaction ref namespace");
        Ok(())
    }

    /// Read from the live namespace, falling back to the orig snapshot for
    /// refs the transaction has not overwritten.
    fn get(&self, name: &str) -> RefResult<Option<RefValue>> {
        let value = match self.refdb.get(&self.to_internal(name))? {
            Some(value) => Some(value),
            None => self.refdb.get(&self.to_orig_internal(name))?,
        };
        Ok(value.map(|v| self.to_external_value(v)))
    }

    /// Write to the live namespace only. The orig snapshot is never touched.
    fn put(&self, name: &str, value: RefValue) -> RefResult<()> {
        self.refdb.put(&self.to_internal(name), value)
    }

    /// Remove from the live namespace only, returning the prior live value.
    ///
    /// A ref removed here reappears from the orig snapshot on read; true
    /// deletion is recorded by higher layers at transaction end.
    fn remove(&self, name: &str) -> RefResult<Option<RefValue>> {
        let removed = self.refdb.remove(&self.to_internal(name))?;
        Ok(removed.map(|v| self.to_external_value(v)))
    }

    /// The orig snapshot overlaid with the live namespace; live entries
    /// shadow orig entries. Keys and symbolic targets are externalized.
    fn get_all(&self, prefix: &str) -> RefResult<BTreeMap<String, RefValue>> {
        let orig = self
            .refdb
            .get_all(&format!("{}{prefix}", self.tx_orig_prefix))?;
        let mut composite = self.externalize(orig);

        let live = self.refdb.get_all(&format!("{}{prefix}", self.tx_prefix))?;
        for (name, value) in live {
            // The orig snapshot nests under the live prefix; skip it here.
            if name.starts_with(&self.tx_orig_prefix) {
                continue;
            }
            composite.insert(self.to_external(&name), self.to_external_value(value));
        }

        Ok(composite)
    }

    /// Remove a subtree of the live namespace only.
    fn remove_all(&self, prefix: &str) -> RefResult<BTreeMap<String, RefValue>> {
        let live = self.refdb.get_all(&self.to_internal(prefix))?;
        let mut removed = BTreeMap::new();
        for (name, _) in live {
            if name.starts_with(&self.tx_orig_prefix) {
                continue;
            }
            if let Some(value) = self.refdb.remove(&name)? {
                removed.insert(self.to_external(&name), self.to_external_value(value));
            }
        }
        Ok(removed)
    }
}

impl TransactionRefDatabase {
    /// Tear down the namespace: releases every reference recorded for this
    /// transaction without touching the rest of the database.
    pub fn close(&self) -> RefResult<()> {
        self.refdb.remove_all(&self.tx_prefix)?;
        debug!(namespace = %self.tx_prefix, "closed transaction ref namespace");
        Ok(())
    }

    /// The live namespace prefix (`transactions/<uuid>/`).
    pub fn namespace(&self) -> &str {
        &self.tx_prefix
    }

    /// The refs written or snapshotted into the live namespace, keyed by
    /// external name. The orig snapshot is excluded.
    fn live_entries(&self) -> RefResult<BTreeMap<String, RefValue>> {
        let live = self.refdb.get_all(&self.tx_prefix)?;
        let mut entries = BTreeMap::new();
        for (name, value) in live {
            if name.starts_with(&self.tx_orig_prefix) {
                continue;
            }
            entries.insert(self.to_external(&name), self.to_external_value(value));
        }
        Ok(entries)
    }
}

/// The lifecycle state of a [`Transaction`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionStatus {
    Open,
    Committed,
    Aborted,
}

/// An open transaction over a shared ref database.
///
/// Beginning a transaction snapshots the live ref namespace into a private
/// subtree; commands then run against the transaction's
/// [`TransactionRefDatabase`]. [`commit`](Transaction::commit) publishes
/// the transaction's refs back to the shared database under the database
/// lock; [`abort`](Transaction::abort) discards them. Both consume the
/// transaction.
pub struct Transaction {
    id: Uuid,
    view: TransactionRefDatabase,
}

impl Transaction {
    /// Begin a new transaction: allocate a fresh id and snapshot the live
    /// refs into its namespace.
    pub fn begin(refdb: Arc<dyn RefDatabase>) -> RefResult<Self> {
        let id = Uuid::new_v4();
        let view = TransactionRefDatabase::new(refdb, id);
        view.create()?;
        Ok(Self { id, view })
    }

    /// The transaction's unique id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The transaction-scoped ref database handed to commands.
    pub fn ref_database(&self) -> &TransactionRefDatabase {
        &self.view
    }

    /// Publish the transaction's refs to the shared database, then tear
    /// down the namespace.
    ///
    /// The whole update runs under the database lock so concurrent readers
    /// never observe a partial commit.
    pub fn commit(self) -> RefResult<TransactionStatus> {
        let entries = self.view.live_entries()?;
        self.view.refdb.lock()?;
        let result = (|| {
            for (name, value) in entries {
                self.view.refdb.put(&name, value)?;
            }
            self.view.close()
        })();
        self.view.refdb.unlock()?;
        result?;
        debug!(transaction = %self.id, "transaction committed");
        Ok(TransactionStatus::Committed)
    }

    /// Discard the transaction's refs and tear down the namespace.
    pub fn abort(self) -> RefResult<TransactionStatus> {
        self.view.close()?;
        debug!(transaction = %self.id, "transaction aborted");
        Ok(TransactionStatus::Aborted)
    }
}
