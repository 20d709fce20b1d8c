//! Error types for the OWID core.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Core errors that can occur while building, serializing or verifying
/// OWIDs and signers.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed OWID: {0}")]
    MalformedOwid(String),

    #[error("OWID version '{0}' not supported")]
    UnsupportedVersion(u8),

    #[error("signature length '{0}' not compatible with '{expected}' OWID signature length", expected = crate::io::SIGNATURE_LENGTH)]
    SignatureLength(usize),

    #[error("string contains an embedded null")]
    EmbeddedNull,

    #[error("timestamp '{0}' is before the 2020 epoch or beyond the encodable range")]
    TimestampRange(DateTime<Utc>),

    #[error("OWID has no target data to sign or verify")]
    MissingTarget,

    #[error("can't use signer '{signer}' with OWID '{owid}'")]
    DomainMismatch { signer: String, owid: String },

    #[error("signer for domain '{0}' contains no keys")]
    NoKeys(String),

    #[error("this crypto handle cannot generate signatures")]
    SignUnavailable,

    #[error("this crypto handle cannot verify signatures")]
    VerifyUnavailable,

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("signer domain needed")]
    DomainRequired,

    #[error("name must be between {min} and {max} characters", min = crate::signer::MIN_NAME_LENGTH, max = crate::signer::MAX_NAME_LENGTH)]
    NameLength(usize),

    #[error("terms URL maximum length {max}", max = crate::signer::MAX_TERMS_URL_LENGTH)]
    TermsUrlLength(usize),

    #[error("terms URL is invalid")]
    TermsUrlInvalid,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Structural validation failures for an OWID value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("OWID is missing a signature")]
    MissingSignature,

    #[error("OWID is missing a domain")]
    MissingDomain,

    #[error("OWID version '{0}' is not valid")]
    UnsupportedVersion(u8),
}
