//! Signers: domain identities holding an ordered key history, and the
//! public projection shared with external verifiers.

use std::sync::OnceLock;

use bytes::Bytes;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::CoreError;
use crate::io;
use crate::keys::{order_for_verify, Keys, PublicKey};
use crate::owid::{Owid, OWID_VERSION_1};

/// The minimum length of the organization name for the signer.
pub const MIN_NAME_LENGTH: usize = 5;

/// The maximum length of the organization name for the signer.
pub const MAX_NAME_LENGTH: usize = 40;

/// The maximum length of the terms URL for the signer.
pub const MAX_TERMS_URL_LENGTH: usize = 250;

/// Default backward tolerance, in minutes, applied when selecting keys
/// eligible to verify an OWID. The window absorbs the minute quantization
/// of OWID timestamps and clock skew around key rotation; keys created
/// after `timestamp + tolerance` are never tried.
pub const VERIFY_TOLERANCE_MINUTES: i64 = 60;

/// A registered domain with the authority to produce OWIDs bearing it.
///
/// Keys are held newest first after [`Signer::sort_keys`], so the first
/// entry is the current signing key. The signer deliberately implements
/// neither `Serialize` nor `Deserialize`: only the explicit
/// [`PublicSigner`] projection may cross a serialization boundary, which
/// keeps private keys out of any marshalled output.
#[derive(Debug, Clone)]
pub struct Signer {
    /// The registered domain name and key field.
    pub domain: String,

    /// The common name of the signer.
    pub name: String,

    /// URL with the terms associated with the signed data.
    pub terms_url: String,

    /// The private and public keys associated with the signer.
    pub keys: Vec<Keys>,

    /// Index of the most recently created key, resolved on first use.
    current: OnceLock<usize>,
}

impl Signer {
    /// Create a new signer, validating the registration fields.
    pub fn new(
        domain: impl Into<String>,
        name: impl Into<String>,
        terms_url: impl Into<String>,
        keys: Keys,
    ) -> Result<Self, CoreError> {
        let domain = domain.into();
        let name = name.into();
        let terms_url = terms_url.into();

        if domain.is_empty() {
            return Err(CoreError::DomainRequired);
        }
        let name_chars = name.chars().count();
        if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&name_chars) {
            return Err(CoreError::NameLength(name_chars));
        }
        if terms_url.len() > MAX_TERMS_URL_LENGTH {
            return Err(CoreError::TermsUrlLength(terms_url.len()));
        }
        if Url::parse(&terms_url).is_err() {
            return Err(CoreError::TermsUrlInvalid);
        }

        Ok(Self {
            domain,
            name,
            terms_url,
            keys: vec![keys],
            current: OnceLock::new(),
        })
    }

    /// Assemble a signer from previously persisted fields without
    /// re-validating them.
    pub fn from_parts(
        domain: impl Into<String>,
        name: impl Into<String>,
        terms_url: impl Into<String>,
        keys: Vec<Keys>,
    ) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
            terms_url: terms_url.into(),
            keys,
            current: OnceLock::new(),
        }
    }

    /// Sort the keys in descending order of creation so the current key
    /// is first. Resets the cached current-key reference.
    pub fn sort_keys(&mut self) {
        self.keys.sort_by(|a, b| b.created.cmp(&a.created));
        self.current = OnceLock::new();
    }

    /// The key with the most recent creation time, used for signing.
    ///
    /// The lookup does not assume any order to the keys and is cached
    /// after the first call.
    pub fn current_keys(&self) -> Result<&Keys, CoreError> {
        if let Some(&i) = self.current.get() {
            return Ok(&self.keys[i]);
        }
        let i = self
            .keys
            .iter()
            .enumerate()
            .max_by_key(|(_, k)| k.created)
            .map(|(i, _)| i)
            .ok_or_else(|| CoreError::NoKeys(self.domain.clone()))?;
        Ok(&self.keys[*self.current.get_or_init(|| i)])
    }

    /// A new unsigned OWID for this signer's domain, stamped with the
    /// current UTC minute and carrying the target bytes.
    pub fn new_owid(&self, target: impl Into<Bytes>) -> Result<Owid, CoreError> {
        Ok(Owid {
            version: OWID_VERSION_1,
            domain: self.domain.clone(),
            timestamp: io::minutes_since_epoch(Utc::now())?,
            signature: None,
            target: Some(target.into()),
        })
    }

    /// Sign the OWID, updating its version, domain, timestamp and
    /// signature fields. Signing an already-signed OWID refreshes the
    /// timestamp and replaces the signature.
    pub fn sign(&self, owid: &mut Owid) -> Result<(), CoreError> {
        let keys = self.current_keys()?;
        owid.version = OWID_VERSION_1;
        owid.domain = self.domain.clone();
        owid.timestamp = io::minutes_since_epoch(Utc::now())?;
        owid.sign_with(keys.sign_crypto()?)
    }

    /// Create and sign an OWID for the target bytes provided.
    pub fn create_and_sign(&self, target: impl Into<Bytes>) -> Result<Owid, CoreError> {
        let mut owid = self.new_owid(target)?;
        self.sign(&mut owid)?;
        Ok(owid)
    }

    /// Verify the OWID against this signer's key history using the
    /// default tolerance window.
    ///
    /// All eligible keys are tried, newest first, before verification is
    /// complete. Returns `Ok(false)` when no key matches.
    pub fn verify(&self, owid: &Owid) -> Result<bool, CoreError> {
        self.verify_with_tolerance(owid, Duration::minutes(VERIFY_TOLERANCE_MINUTES))
    }

    /// Verify the OWID with an explicit tolerance window.
    pub fn verify_with_tolerance(
        &self,
        owid: &Owid,
        tolerance: Duration,
    ) -> Result<bool, CoreError> {
        verify_domains(&self.domain, owid)?;
        let deadline = owid.time() + tolerance;
        for keys in order_for_verify(&self.keys, deadline) {
            if keys.verify_owid(owid)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The public key information for every key in the history, in the
    /// same order as the keys.
    pub fn public_keys(&self) -> Vec<PublicKey> {
        self.keys.iter().map(Keys::to_public_key).collect()
    }

    /// The public-key-only projection of this signer.
    pub fn public_signer(&self) -> PublicSigner {
        PublicSigner {
            domain: self.domain.clone(),
            name: self.name.clone(),
            terms_url: self.terms_url.clone(),
            public_keys: self.public_keys(),
        }
    }
}

/// A signer in a form that can be marshalled for providing public key
/// information to other parties.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSigner {
    /// The registered domain name and key field.
    pub domain: String,

    /// The common name of the signer.
    pub name: String,

    /// URL with the terms associated with the signed data.
    pub terms_url: String,

    /// The public keys associated with the signer.
    pub public_keys: Vec<PublicKey>,
}

impl PublicSigner {
    /// Verify the OWID against the published keys using the default
    /// tolerance window. Same algorithm as [`Signer::verify`], through
    /// verify-only handles.
    pub fn verify(&self, owid: &Owid) -> Result<bool, CoreError> {
        self.verify_with_tolerance(owid, Duration::minutes(VERIFY_TOLERANCE_MINUTES))
    }

    /// Verify the OWID with an explicit tolerance window.
    pub fn verify_with_tolerance(
        &self,
        owid: &Owid,
        tolerance: Duration,
    ) -> Result<bool, CoreError> {
        verify_domains(&self.domain, owid)?;
        let deadline = owid.time() + tolerance;
        let mut eligible: Vec<&PublicKey> = self
            .public_keys
            .iter()
            .filter(|k| k.created <= deadline)
            .collect();
        eligible.sort_by(|a, b| b.created.cmp(&a.created));
        for key in eligible {
            if key.verify_owid(owid)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Check that the signer and OWID domains match, case-insensitively.
fn verify_domains(signer: &str, owid: &Owid) -> Result<(), CoreError> {
    if !signer.eq_ignore_ascii_case(&owid.domain) {
        return Err(CoreError::DomainMismatch {
            signer: signer.to_string(),
            owid: owid.domain.clone(),
        });
    }
    Ok(())
}
