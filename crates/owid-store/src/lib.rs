//! # OWID Store
//!
//! Persistence for OWID signers: the abstract [`Store`] contract, the
//! concurrent in-memory [`SignerCache`] every implementation sits behind,
//! and the concrete backends.
//!
//! ## Backends
//!
//! - [`MemoryStore`] - volatile; the contract's reference implementation
//!   and the test double
//! - [`FileStore`] - one JSON document on disk
//! - [`SqliteStore`] - SQLite with versioned migrations
//!
//! Cloud table stores implement the same [`Store`] trait out of tree.
//!
//! ## Cache semantics
//!
//! Every backend refreshes by building a complete signer map off-lock and
//! swapping it in atomically, so readers always observe either the
//! pre-refresh or the post-refresh snapshot. A failed reload leaves the
//! previous snapshot in place. On a cache miss, `get_signer` refreshes
//! and retries exactly once before concluding the signer does not exist.

pub mod base;
pub mod error;
pub mod file;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use base::SignerCache;
pub use error::{Result, StoreError};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{SignerMap, Store};
