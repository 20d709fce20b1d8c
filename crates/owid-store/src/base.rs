//! Shared in-memory signer cache used by every store implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use owid_core::Signer;

use crate::traits::SignerMap;

/// Concurrent cache of signers keyed by domain.
///
/// Readers always observe a complete snapshot: [`SignerCache::replace`]
/// builds the new map off-lock and swaps the pointer under the mutex, so
/// a reader holds either the pre-refresh or the post-refresh map, never
/// a partially populated one.
pub struct SignerCache {
    signers: Mutex<SignerMap>,
}

impl SignerCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            signers: Mutex::new(Arc::new(HashMap::new())),
        }
    }

    /// The signer for the domain in the current snapshot.
    pub fn get(&self, domain: &str) -> Option<Arc<Signer>> {
        self.snapshot().get(domain).cloned()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> SignerMap {
        self.signers.lock().unwrap().clone()
    }

    /// Replace the snapshot with a freshly loaded signer set.
    ///
    /// Every signer's keys are sorted newest first before the map
    /// becomes reachable to readers.
    pub fn replace(&self, signers: HashMap<String, Signer>) {
        let map: HashMap<String, Arc<Signer>> = signers
            .into_iter()
            .map(|(domain, mut signer)| {
                signer.sort_keys();
                (domain, Arc::new(signer))
            })
            .collect();
        let map = Arc::new(map);
        *self.signers.lock().unwrap() = map;
    }
}

impl Default for SignerCache {
    fn default() -> Self {
        Self::new()
    }
}
