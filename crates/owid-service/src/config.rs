//! Configuration for the OWID services.
//!
//! Configuration is read from a JSON file when one is provided, and the
//! `OWID_*` environment variables override or stand in for it. Exactly
//! one storage backend is selected.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use owid_store::{FileStore, SqliteStore, Store};

use crate::error::ServiceError;

/// Settings shared by every OWID handler and service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    /// Path of the JSON document store, when file storage is selected.
    pub owid_file: Option<String>,

    /// Path of the SQLite database, when SQLite storage is selected.
    pub owid_sqlite: Option<String>,

    /// Emit verbose information while handling requests.
    pub debug: bool,

    /// Scheme used to reach other signers ("http" or "https").
    pub scheme: Option<String>,
}

impl Configuration {
    /// Read configuration from the JSON file provided, then apply any
    /// environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let data =
            fs::read_to_string(path).map_err(|e| ServiceError::Config(e.to_string()))?;
        let mut config: Configuration =
            serde_json::from_str(&data).map_err(|e| ServiceError::Config(e.to_string()))?;
        config.apply_env();
        Ok(config)
    }

    /// Build configuration from environment variables alone.
    pub fn from_env() -> Self {
        let mut config = Configuration::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("OWID_FILE") {
            self.owid_file = Some(v);
        }
        if let Ok(v) = std::env::var("OWID_SQLITE") {
            self.owid_sqlite = Some(v);
        }
        if let Ok(v) = std::env::var("OWID_SCHEME") {
            self.scheme = Some(v);
        }
        if let Ok(v) = std::env::var("OWID_DEBUG") {
            self.debug = v == "true" || v == "1";
        }
    }

    /// The scheme used when fetching public signer documents.
    pub fn scheme(&self) -> &str {
        self.scheme.as_deref().unwrap_or("https")
    }
}

/// Build the storage backend selected by the configuration.
pub fn new_store(config: &Configuration) -> Result<Arc<dyn Store>, ServiceError> {
    if let Some(path) = &config.owid_sqlite {
        tracing::info!(path = %path, "using SQLite storage");
        return Ok(Arc::new(SqliteStore::open(path)?));
    }
    if let Some(path) = &config.owid_file {
        tracing::info!(path = %path, "using local file storage");
        return Ok(Arc::new(FileStore::open(path)?));
    }
    Err(ServiceError::NoStoreConfigured)
}
