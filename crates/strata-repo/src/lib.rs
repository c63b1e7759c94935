//! Repository assembly for strata.
//!
//! A [`Repository`] bundles the storage backends one versioned dataset
//! lives in — the content-addressed object store, the commit-graph
//! database, and the reference database — together with its
//! [`RepositoryConfig`] and its location URL.
//!
//! The [`hooks`] module is the bridge user hooks call into: a command
//! registry looked up by name, a small read facade over the repository,
//! and the distinguished veto error a hook raises to stop the surrounding
//! operation.

pub mod config;
pub mod error;
pub mod hooks;
pub mod ini;
pub mod repository;

pub use config::RepositoryConfig;
pub use error::{RepoError, RepoResult};
pub use hooks::{CommandParams, CommandRegistry, RepositoryApi};
pub use repository::Repository;
