//! Store trait: the abstract interface for signer persistence.
//!
//! This trait allows the rest of the system to be storage-agnostic.
//! Implementations include SQLite, a JSON file, and in-memory (for
//! tests); cloud table stores implement the same contract out of tree.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use owid_core::{Keys, Signer};

use crate::error::Result;

/// A complete snapshot of the known signers, keyed by domain.
///
/// The map is read-only to every holder. It is only ever replaced
/// wholesale by a refresh; it is never mutated in place.
pub type SignerMap = Arc<HashMap<String, Arc<Signer>>>;

/// Async interface for signer persistence.
///
/// Every implementation keeps a concurrent in-memory cache in front of
/// its backing storage. Readers of the cache are guaranteed a snapshot
/// that existed at some point in the program's history, never a torn
/// view.
#[async_trait]
pub trait Store: Send + Sync {
    /// The signer for the domain, or `None`.
    ///
    /// On a cache miss the implementation refreshes and retries exactly
    /// once before concluding the signer does not exist. This heals the
    /// window between another process adding a signer and this cache
    /// learning about it.
    async fn get_signer(&self, domain: &str) -> Result<Option<Arc<Signer>>>;

    /// A snapshot of all known signers keyed on domain.
    async fn get_signers(&self) -> Result<SignerMap>;

    /// Persist a new signer. A domain that is already registered is
    /// rejected.
    async fn add_signer(&self, signer: Signer) -> Result<()>;

    /// Append a new key to an existing signer's history. Old keys are
    /// retained forever so historical OWIDs remain verifiable.
    async fn add_keys(&self, domain: &str, keys: Keys) -> Result<()>;

    /// Reload the cache from the backing store atomically. On failure
    /// the previous snapshot remains visible.
    async fn refresh(&self) -> Result<()>;
}
