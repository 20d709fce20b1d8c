//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing and embedding. It has the same cache
//! semantics as the persistent backends but keeps the backing records in
//! a volatile map.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use owid_core::{Keys, Signer};

use crate::base::SignerCache;
use crate::error::{Result, StoreError};
use crate::traits::{SignerMap, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped.
pub struct MemoryStore {
    /// Backing records, the volatile stand-in for persistent storage.
    records: Mutex<HashMap<String, Signer>>,

    /// Cache refreshed from the records.
    cache: SignerCache,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            cache: SignerCache::new(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_signer(&self, domain: &str) -> Result<Option<Arc<Signer>>> {
        if let Some(signer) = self.cache.get(domain) {
            return Ok(Some(signer));
        }
        self.refresh().await?;
        Ok(self.cache.get(domain))
    }

    async fn get_signers(&self) -> Result<SignerMap> {
        Ok(self.cache.snapshot())
    }

    async fn add_signer(&self, signer: Signer) -> Result<()> {
        {
            let mut records = self.records.lock().unwrap();
            if records.contains_key(&signer.domain) {
                return Err(StoreError::DuplicateSigner(signer.domain.clone()));
            }
            records.insert(signer.domain.clone(), signer);
        }
        self.refresh().await
    }

    async fn add_keys(&self, domain: &str, keys: Keys) -> Result<()> {
        {
            let mut records = self.records.lock().unwrap();
            let signer = records
                .get_mut(domain)
                .ok_or_else(|| StoreError::UnknownSigner(domain.to_string()))?;
            signer.keys.push(keys);
        }
        self.refresh().await
    }

    async fn refresh(&self) -> Result<()> {
        let records = self.records.lock().unwrap().clone();
        self.cache.replace(records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signer(domain: &str) -> Signer {
        Signer::new(
            domain,
            "Test Signer",
            format!("https://{domain}/terms"),
            Keys::generate().unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let store = MemoryStore::new();
        store.add_signer(test_signer("a.test")).await.unwrap();

        let signer = store.get_signer("a.test").await.unwrap().unwrap();
        assert_eq!(signer.domain, "a.test");
        assert!(store.get_signer("missing.test").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_rejected() {
        let store = MemoryStore::new();
        store.add_signer(test_signer("a.test")).await.unwrap();

        let result = store.add_signer(test_signer("a.test")).await;
        assert!(matches!(result, Err(StoreError::DuplicateSigner(d)) if d == "a.test"));
        assert_eq!(store.get_signers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_keys_rotates() {
        let store = MemoryStore::new();
        store.add_signer(test_signer("a.test")).await.unwrap();

        let new_keys = Keys::generate().unwrap();
        store.add_keys("a.test", new_keys.clone()).await.unwrap();

        let signer = store.get_signer("a.test").await.unwrap().unwrap();
        assert_eq!(signer.keys.len(), 2);
        // Sorted newest first by the cache; the fresh key is current.
        assert_eq!(signer.current_keys().unwrap(), &new_keys);
    }

    #[tokio::test]
    async fn test_add_keys_unknown_domain() {
        let store = MemoryStore::new();
        let result = store.add_keys("missing.test", Keys::generate().unwrap()).await;
        assert!(matches!(result, Err(StoreError::UnknownSigner(_))));
    }

    #[tokio::test]
    async fn test_signing_via_cached_signer() {
        let store = MemoryStore::new();
        store.add_signer(test_signer("a.test")).await.unwrap();

        let signer = store.get_signer("a.test").await.unwrap().unwrap();
        let owid = signer.create_and_sign("hello").unwrap();
        assert!(signer.verify(&owid).unwrap());
    }
}
