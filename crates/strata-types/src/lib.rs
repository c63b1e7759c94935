//! Foundation types for strata.
//!
//! This crate provides the identifier and hashing primitives used throughout
//! the strata system. Every other strata crate depends on `strata-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] — 160-bit content-addressed identifier with a
//!   distinguished NULL value
//! - [`ContentHasher`] — domain-separated BLAKE3 hasher producing
//!   [`ObjectId`]s

pub mod error;
pub mod hasher;
pub mod object;

pub use error::TypeError;
pub use hasher::ContentHasher;
pub use object::ObjectId;
