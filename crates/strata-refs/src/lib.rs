//! Reference management for strata.
//!
//! References are named pointers into the commit graph: branch heads under
//! `refs/heads/`, tags under `refs/tags/`, remote tracking refs under
//! `refs/remotes/`, and the three well-known heads (`HEAD`, `WORK_HEAD`,
//! `STAGE_HEAD`). A reference is either **direct** (holding an object id)
//! or **symbolic** (naming another reference).
//!
//! # Architecture
//!
//! - [`traits::RefDatabase`] — the flat name→value storage contract
//! - [`memory::InMemoryRefDatabase`] — `RwLock`-backed implementation for
//!   tests and embedding
//! - [`transaction::TransactionRefDatabase`] — a decorator that confines a
//!   transaction's reads and writes to `transactions/<uuid>/`, so commands
//!   running inside a transaction never notice it
//! - [`transaction::Transaction`] — the begin / commit / abort lifecycle
//!   over that decorator
//! - [`names`] — ref-name validation

pub mod error;
pub mod memory;
pub mod names;
pub mod traits;
pub mod transaction;
pub mod types;

pub use error::{RefError, RefResult};
pub use memory::InMemoryRefDatabase;
pub use names::validate_ref_name;
pub use traits::RefDatabase;
pub use transaction::{Transaction, TransactionRefDatabase};
pub use types::{RefValue, HEAD, REFS_PREFIX, STAGE_HEAD, TRANSACTIONS_PREFIX, WORK_HEAD};
