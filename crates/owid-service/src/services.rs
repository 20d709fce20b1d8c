//! Service wiring: configuration, storage and access control, plus the
//! operations the HTTP handlers are thin wrappers over.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;

use owid_core::{Keys, Owid, Signer};
use owid_store::Store;

use crate::access::Access;
use crate::config::Configuration;
use crate::error::ServiceError;

/// References all the collaborators needed by the OWID operations:
/// configuration defaults, persistent storage for signer data, and the
/// access service that gates key rotation.
pub struct Services {
    config: Configuration,
    store: Arc<dyn Store>,
    access: Arc<dyn Access>,
}

impl Services {
    pub fn new(config: Configuration, store: Arc<dyn Store>, access: Arc<dyn Access>) -> Self {
        Self {
            config,
            store,
            access,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn access(&self) -> &dyn Access {
        self.access.as_ref()
    }

    /// The signer for the request host.
    pub async fn signer_for_host(&self, host: &str) -> Result<Arc<Signer>, ServiceError> {
        self.store
            .get_signer(host)
            .await?
            .ok_or_else(|| ServiceError::UnknownDomain(host.to_string()))
    }

    /// Register the host as a signer with one freshly generated key.
    ///
    /// Validation failures and already-registered domains are rejected
    /// and nothing is stored.
    pub async fn register(
        &self,
        host: &str,
        name: &str,
        terms_url: &str,
    ) -> Result<Arc<Signer>, ServiceError> {
        if self.store.get_signer(host).await?.is_some() {
            return Err(ServiceError::AlreadyRegistered(host.to_string()));
        }
        let keys = Keys::generate()?;
        let signer = Signer::new(host, name, terms_url, keys)?;
        self.store.add_signer(signer).await?;
        self.signer_for_host(host).await
    }

    /// Append a fresh key to the host's signer.
    ///
    /// The store is refreshed so the new key takes effect immediately,
    /// and the key is read back to confirm it is usable before success
    /// is reported.
    pub async fn rotate_keys(&self, host: &str) -> Result<(), ServiceError> {
        let signer = self.signer_for_host(host).await?;
        let keys = Keys::generate()?;
        self.store.add_keys(&signer.domain, keys.clone()).await?;
        self.store.refresh().await?;

        let refreshed = self.signer_for_host(&signer.domain).await?;
        if !refreshed.keys.iter().any(|k| k == &keys) {
            return Err(ServiceError::Internal(format!(
                "new key for '{}' not found after refresh",
                signer.domain
            )));
        }
        Ok(())
    }

    /// Verify a base64 OWID against base64 target data, using the stored
    /// signer for the OWID's own domain.
    pub async fn verify(&self, owid_b64: &str, data_b64: &str) -> Result<bool, ServiceError> {
        let mut owid = Owid::from_base64(owid_b64)?;
        let data = BASE64
            .decode(data_b64)
            .map_err(|e| ServiceError::BadRequest(format!("data base64: {e}")))?;
        owid.target = Some(Bytes::from(data));

        let signer = self
            .store
            .get_signer(&owid.domain)
            .await?
            .ok_or_else(|| ServiceError::UnknownDomain(owid.domain.clone()))?;
        Ok(signer.verify(&owid)?)
    }
}
