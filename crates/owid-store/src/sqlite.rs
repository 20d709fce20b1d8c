//! SQLite implementation of the Store trait.
//!
//! Signers live in two tables matching the persisted layout contract:
//! one row per signer keyed by domain, and a key-history table keyed by
//! `(domain, created)`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use owid_core::{Keys, Signer};

use crate::base::SignerCache;
use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{SignerMap, Store};

/// SQLite-based store implementation.
///
/// The connection is shared behind a mutex; the same lock serializes the
/// check-then-insert sections of writes.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    cache: SignerCache,
}

impl SqliteStore {
    /// Open a SQLite database at the given path, creating the file and
    /// running migrations as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory SQLite database. Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            cache: SignerCache::new(),
        };
        store.reload_cache()?;
        Ok(store)
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().unwrap();
        f(&conn)
    }

    fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().unwrap();
        f(&mut conn)
    }

    fn reload_cache(&self) -> Result<()> {
        let signers = self.with_conn(load_signers)?;
        tracing::debug!(signers = signers.len(), "signer cache refreshed");
        self.cache.replace(signers);
        Ok(())
    }
}

fn load_signers(conn: &Connection) -> Result<HashMap<String, Signer>> {
    let mut signers = HashMap::new();

    let mut stmt = conn.prepare("SELECT domain, name, terms_url FROM signers")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;
    for row in rows {
        let (domain, name, terms_url) = row?;
        signers.insert(
            domain.clone(),
            Signer::from_parts(domain, name, terms_url, Vec::new()),
        );
    }

    let mut stmt =
        conn.prepare("SELECT domain, created, private_key, public_key FROM signer_keys")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;
    for row in rows {
        let (domain, created, private_key, public_key) = row?;
        let created = parse_created(&created)?;
        let signer = signers.get_mut(&domain).ok_or_else(|| {
            StoreError::InvalidData(format!("key row for unknown signer '{domain}'"))
        })?;
        signer
            .keys
            .push(Keys::from_pems(private_key, public_key, created));
    }

    Ok(signers)
}

fn parse_created(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("created '{raw}': {e}")))
}

#[async_trait]
impl Store for SqliteStore {
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
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let exists: bool = tx
                .query_row(
                    "SELECT COUNT(*) FROM signers WHERE domain = ?1",
                    params![signer.domain],
                    |row| row.get::<_, i64>(0),
                )
                .map(|n| n > 0)?;
            if exists {
                return Err(StoreError::DuplicateSigner(signer.domain.clone()));
            }
            tx.execute(
                "INSERT INTO signers (domain, name, terms_url) VALUES (?1, ?2, ?3)",
                params![signer.domain, signer.name, signer.terms_url],
            )?;
            for keys in &signer.keys {
                tx.execute(
                    "INSERT INTO signer_keys (domain, created, private_key, public_key)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        signer.domain,
                        keys.created.to_rfc3339(),
                        keys.private_key,
                        keys.public_key
                    ],
                )?;
            }
            tx.commit()?;
            tracing::info!(domain = %signer.domain, "signer registered");
            Ok(())
        })?;
        self.reload_cache()
    }

    async fn add_keys(&self, domain: &str, keys: Keys) -> Result<()> {
        self.with_conn(|conn| {
            let exists: bool = conn
                .query_row(
                    "SELECT COUNT(*) FROM signers WHERE domain = ?1",
                    params![domain],
                    |row| row.get::<_, i64>(0),
                )
                .map(|n| n > 0)?;
            if !exists {
                return Err(StoreError::UnknownSigner(domain.to_string()));
            }
            conn.execute(
                "INSERT INTO signer_keys (domain, created, private_key, public_key)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    domain,
                    keys.created.to_rfc3339(),
                    keys.private_key,
                    keys.public_key
                ],
            )?;
            tracing::info!(domain, "signer key added");
            Ok(())
        })?;
        self.reload_cache()
    }

    async fn refresh(&self) -> Result<()> {
        self.reload_cache()
    }
}
