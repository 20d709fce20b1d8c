//! JSON-file implementation of the Store trait.
//!
//! The whole signer set is one JSON document keyed by domain, suited to
//! single-node deployments. Writes take a load-modify-save round trip
//! under the store's write lock.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use owid_core::{Keys, Signer};

use crate::base::SignerCache;
use crate::error::{Result, StoreError};
use crate::traits::{SignerMap, Store};

/// One signer as persisted in the JSON document.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignerRecord {
    domain: String,
    name: String,
    terms_url: String,
    keys: Vec<KeysRecord>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeysRecord {
    private_key: String,
    public_key: String,
    created: DateTime<Utc>,
}

impl SignerRecord {
    fn from_signer(signer: &Signer) -> Self {
        Self {
            domain: signer.domain.clone(),
            name: signer.name.clone(),
            terms_url: signer.terms_url.clone(),
            keys: signer
                .keys
                .iter()
                .map(|k| KeysRecord {
                    private_key: k.private_key.clone(),
                    public_key: k.public_key.clone(),
                    created: k.created,
                })
                .collect(),
        }
    }

    fn into_signer(self) -> Signer {
        Signer::from_parts(
            self.domain,
            self.name,
            self.terms_url,
            self.keys
                .into_iter()
                .map(|k| Keys::from_pems(k.private_key, k.public_key, k.created))
                .collect(),
        )
    }
}

/// File-backed store implementation.
pub struct FileStore {
    path: PathBuf,

    /// Serializes the load-modify-save round trip of writes.
    write_lock: Mutex<()>,

    cache: SignerCache,
}

impl FileStore {
    /// Open the store at the given path, creating an empty document if
    /// the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            fs::write(&path, "{}")?;
        }
        let store = Self {
            path,
            write_lock: Mutex::new(()),
            cache: SignerCache::new(),
        };
        store.reload_cache()?;
        Ok(store)
    }

    fn load_records(&self) -> Result<HashMap<String, SignerRecord>> {
        let data = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn save_records(&self, records: &HashMap<String, SignerRecord>) -> Result<()> {
        let data = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, data)?;
        Ok(())
    }

    fn reload_cache(&self) -> Result<()> {
        let records = self.load_records()?;
        let signers: HashMap<String, Signer> = records
            .into_iter()
            .map(|(domain, record)| (domain, record.into_signer()))
            .collect();
        tracing::debug!(
            signers = signers.len(),
            path = %self.path.display(),
            "signer cache refreshed"
        );
        self.cache.replace(signers);
        Ok(())
    }
}

#[async_trait]
impl Store for FileStore {
    async fn get_signer(&self, domain: &str) -> Result<Option<Arc<Signer>>> {
        if let Some(signer) = self.cache.get(domain) {
            return Ok(Some(signer));
        }
        self.reload_cache()?;
        Ok(self.cache.get(domain))
    }

    async fn get_signers(&self) -> Result<SignerMap> {
        Ok(self.cache.snapshot())
    }

    async fn add_signer(&self, signer: Signer) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        let mut records = self.load_records()?;
        if records.contains_key(&signer.domain) {
            return Err(StoreError::DuplicateSigner(signer.domain.clone()));
        }
        tracing::info!(domain = %signer.domain, "signer registered");
        records.insert(signer.domain.clone(), SignerRecord::from_signer(&signer));
        self.save_records(&records)?;
        self.reload_cache()
    }

    async fn add_keys(&self, domain: &str, keys: Keys) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        let mut records = self.load_records()?;
        let record = records
            .get_mut(domain)
            .ok_or_else(|| StoreError::UnknownSigner(domain.to_string()))?;
        tracing::info!(domain, "signer key added");
        record.keys.push(KeysRecord {
            private_key: keys.private_key,
            public_key: keys.public_key,
            created: keys.created,
        });
        self.save_records(&records)?;
        self.reload_cache()
    }

    async fn refresh(&self) -> Result<()> {
        self.reload_cache()
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
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signers.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.add_signer(test_signer("a.test")).await.unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        let signer = store.get_signer("a.test").await.unwrap().unwrap();
        assert_eq!(signer.domain, "a.test");

        // Keys survive the round trip intact and still sign.
        let owid = signer.create_and_sign("hello").unwrap();
        assert!(signer.verify(&owid).unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("signers.json")).unwrap();

        store.add_signer(test_signer("a.test")).await.unwrap();
        assert!(matches!(
            store.add_signer(test_signer("a.test")).await,
            Err(StoreError::DuplicateSigner(_))
        ));
    }

    #[tokio::test]
    async fn test_rotation_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signers.json");
        let store = FileStore::open(&path).unwrap();

        store.add_signer(test_signer("a.test")).await.unwrap();
        let old = store.get_signer("a.test").await.unwrap().unwrap();
        let old_owid = old.create_and_sign("before").unwrap();

        store
            .add_keys("a.test", Keys::generate().unwrap())
            .await
            .unwrap();

        let rotated = store.get_signer("a.test").await.unwrap().unwrap();
        assert_eq!(rotated.keys.len(), 2);
        assert!(rotated.verify(&old_owid).unwrap());
        let new_owid = rotated.create_and_sign("after").unwrap();
        assert!(rotated.verify(&new_owid).unwrap());
    }

    #[tokio::test]
    async fn test_failed_reload_preserves_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signers.json");
        let store = FileStore::open(&path).unwrap();
        store.add_signer(test_signer("a.test")).await.unwrap();

        fs::write(&path, "not valid json").unwrap();
        assert!(store.refresh().await.is_err());

        // Stale reads are preferred to losing the working set.
        assert!(store.get_signers().await.unwrap().contains_key("a.test"));
    }

    #[tokio::test]
    async fn test_open_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signers.json");
        let store = FileStore::open(&path).unwrap();
        assert!(path.exists());
        assert!(store.get_signers().await.unwrap().is_empty());
    }
}
