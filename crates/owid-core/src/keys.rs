//! Key records: the (private, public, created) triple held by a signer,
//! and the ordering used when trying keys against an OWID.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::Crypto;
use crate::error::CoreError;
use crate::owid::Owid;

/// The public half of a signer's key pair at a point in time.
///
/// This is the record published to external verifiers in the public
/// signer document.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKey {
    /// The public key in SPKI PEM format.
    pub public_key: String,

    /// When the key pair was created.
    pub created: DateTime<Utc>,

    #[serde(skip)]
    verify: OnceLock<Crypto>,
}

impl PublicKey {
    pub fn new(public_key: String, created: DateTime<Utc>) -> Self {
        Self {
            public_key,
            created,
            verify: OnceLock::new(),
        }
    }

    /// The verify-only crypto handle for this key, built on first use.
    pub fn verify_crypto(&self) -> Result<&Crypto, CoreError> {
        if let Some(c) = self.verify.get() {
            return Ok(c);
        }
        let c = Crypto::verify_only(&self.public_key)?;
        Ok(self.verify.get_or_init(|| c))
    }

    /// Check the OWID's signature against this key.
    pub fn verify_owid(&self, owid: &Owid) -> Result<bool, CoreError> {
        owid.verify_with_crypto(self.verify_crypto()?)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key && self.created == other.created
    }
}

impl Eq for PublicKey {}

/// A signer's key pair at a point in time.
///
/// The two crypto handles are a memoization cache, not part of the
/// persisted value: equality covers only the three persisted fields and
/// the handles are rebuilt lazily after deserialization.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keys {
    /// The private key in PKCS#8 PEM format.
    pub private_key: String,

    /// The public key in SPKI PEM format.
    pub public_key: String,

    /// When the key pair was created.
    pub created: DateTime<Utc>,

    #[serde(skip)]
    sign: OnceLock<Crypto>,

    #[serde(skip)]
    verify: OnceLock<Crypto>,
}

impl Keys {
    /// Generate a fresh P-256 key pair stamped with the current instant.
    pub fn generate() -> Result<Self, CoreError> {
        let crypto = Crypto::generate();
        Ok(Self {
            private_key: crypto.private_key_pem()?,
            public_key: crypto.public_key_pem()?,
            created: Utc::now(),
            sign: OnceLock::new(),
            verify: OnceLock::new(),
        })
    }

    /// Rehydrate a key record from previously persisted fields.
    pub fn from_pems(private_key: String, public_key: String, created: DateTime<Utc>) -> Self {
        Self {
            private_key,
            public_key,
            created,
            sign: OnceLock::new(),
            verify: OnceLock::new(),
        }
    }

    /// The sign-only crypto handle for this key, built on first use.
    pub fn sign_crypto(&self) -> Result<&Crypto, CoreError> {
        if let Some(c) = self.sign.get() {
            return Ok(c);
        }
        let c = Crypto::sign_only(&self.private_key)?;
        Ok(self.sign.get_or_init(|| c))
    }

    /// The verify-only crypto handle for this key, built on first use.
    pub fn verify_crypto(&self) -> Result<&Crypto, CoreError> {
        if let Some(c) = self.verify.get() {
            return Ok(c);
        }
        let c = Crypto::verify_only(&self.public_key)?;
        Ok(self.verify.get_or_init(|| c))
    }

    /// Check the OWID's signature against this key.
    pub fn verify_owid(&self, owid: &Owid) -> Result<bool, CoreError> {
        owid.verify_with_crypto(self.verify_crypto()?)
    }

    /// Project to the publishable half of the record.
    pub fn to_public_key(&self) -> PublicKey {
        PublicKey::new(self.public_key.clone(), self.created)
    }
}

impl PartialEq for Keys {
    fn eq(&self, other: &Self) -> bool {
        self.private_key == other.private_key
            && self.public_key == other.public_key
            && self.created == other.created
    }
}

impl Eq for Keys {}

impl fmt::Debug for Keys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keys")
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

/// The subset of `keys` created at or before `t`, ordered newest first so
/// the key most likely to have produced a signature near `t` is tried
/// first. Keys created after `t` cannot have produced the signature and
/// are excluded.
pub fn order_for_verify(keys: &[Keys], t: DateTime<Utc>) -> Vec<&Keys> {
    let mut eligible: Vec<&Keys> = keys.iter().filter(|k| k.created <= t).collect();
    eligible.sort_by(|a, b| b.created.cmp(&a.created));
    eligible
}
