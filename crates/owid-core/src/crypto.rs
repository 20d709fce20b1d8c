//! ECDSA P-256 signing and verification behind direction-aware handles.
//!
//! A [`Crypto`] holds an optional signing key and an optional verifying
//! key. A handle built from a public key alone refuses to sign; one built
//! from a private key alone refuses to verify.

use std::fmt;

use p256::ecdsa::signature::{Signer as _, Verifier as _};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rand_core::OsRng;

use crate::error::CoreError;
use crate::io::SIGNATURE_LENGTH;

/// A 64-byte OWID signature: big-endian `r` and `s` scalars, each
/// left-padded to 32 bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct OwidSignature(pub [u8; SIGNATURE_LENGTH]);

impl OwidSignature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    /// Create from a slice, rejecting any length other than 64.
    pub fn from_slice(v: &[u8]) -> Result<Self, CoreError> {
        let bytes: [u8; SIGNATURE_LENGTH] = v
            .try_into()
            .map_err(|_| CoreError::SignatureLength(v.len()))?;
        Ok(Self(bytes))
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for OwidSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwidSig({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for OwidSignature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; SIGNATURE_LENGTH]> for OwidSignature {
    fn from(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }
}

/// A crypto handle over the NIST P-256 curve.
///
/// Signing hashes the input with SHA-256 and signs the digest with ECDSA.
/// Verification does the inverse. Either half may be absent.
#[derive(Clone)]
pub struct Crypto {
    signing: Option<SigningKey>,
    verifying: Option<VerifyingKey>,
}

impl Crypto {
    /// Generate a fresh key pair usable for both signing and verifying.
    pub fn generate() -> Self {
        let signing = SigningKey::random(&mut OsRng);
        let verifying = VerifyingKey::from(&signing);
        Self {
            signing: Some(signing),
            verifying: Some(verifying),
        }
    }

    /// Build a sign-only handle from a PEM-encoded private key.
    ///
    /// Accepts PKCS#8, falling back to SEC1.
    pub fn sign_only(private_pem: &str) -> Result<Self, CoreError> {
        Ok(Self {
            signing: Some(parse_private_pem(private_pem)?),
            verifying: None,
        })
    }

    /// Build a verify-only handle from an SPKI PEM public key.
    pub fn verify_only(public_pem: &str) -> Result<Self, CoreError> {
        let verifying = VerifyingKey::from_public_key_pem(public_pem)
            .map_err(|e| CoreError::InvalidPublicKey(e.to_string()))?;
        Ok(Self {
            signing: None,
            verifying: Some(verifying),
        })
    }

    /// Sign the input bytes, returning the fixed-width r ∥ s signature.
    pub fn sign(&self, data: &[u8]) -> Result<OwidSignature, CoreError> {
        let key = self.signing.as_ref().ok_or(CoreError::SignUnavailable)?;
        let signature: Signature = key.sign(data);
        let mut out = [0u8; SIGNATURE_LENGTH];
        out.copy_from_slice(&signature.to_bytes());
        Ok(OwidSignature(out))
    }

    /// Verify a signature over the input bytes.
    ///
    /// A non-matching signature, including one whose scalars fall outside
    /// the curve order, returns `Ok(false)`. Only a handle without a
    /// verifying key is an error.
    pub fn verify(&self, data: &[u8], signature: &OwidSignature) -> Result<bool, CoreError> {
        let key = self.verifying.as_ref().ok_or(CoreError::VerifyUnavailable)?;
        let Ok(sig) = Signature::from_slice(&signature.0) else {
            return Ok(false);
        };
        Ok(key.verify(data, &sig).is_ok())
    }

    /// Export the private key as PKCS#8 PEM.
    pub fn private_key_pem(&self) -> Result<String, CoreError> {
        let key = self.signing.as_ref().ok_or(CoreError::SignUnavailable)?;
        let pem = key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CoreError::InvalidPrivateKey(e.to_string()))?;
        Ok(pem.to_string())
    }

    /// Export the public key as SPKI PEM, the form published to external
    /// verifiers.
    pub fn public_key_pem(&self) -> Result<String, CoreError> {
        let key = self.verifying.as_ref().ok_or(CoreError::VerifyUnavailable)?;
        key.to_public_key_pem(LineEnding::LF)
            .map_err(|e| CoreError::InvalidPublicKey(e.to_string()))
    }
}

impl fmt::Debug for Crypto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Crypto(sign: {}, verify: {})",
            self.signing.is_some(),
            self.verifying.is_some()
        )
    }
}

fn parse_private_pem(pem: &str) -> Result<SigningKey, CoreError> {
    if let Ok(key) = SigningKey::from_pkcs8_pem(pem) {
        return Ok(key);
    }
    p256::SecretKey::from_sec1_pem(pem)
        .map(SigningKey::from)
        .map_err(|e| CoreError::InvalidPrivateKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let crypto = Crypto::generate();
        let signature = crypto.sign(b"hello world").unwrap();
        assert!(crypto.verify(b"hello world", &signature).unwrap());
    }

    #[test]
    fn test_tampered_data_fails() {
        let crypto = Crypto::generate();
        let signature = crypto.sign(b"hello world").unwrap();
        assert!(!crypto.verify(b"hello worlD", &signature).unwrap());
    }

    #[test]
    fn test_tampered_signature_fails() {
        let crypto = Crypto::generate();
        let mut signature = crypto.sign(b"hello world").unwrap();
        signature.0[0] ^= 0xff;
        assert!(!crypto.verify(b"hello world", &signature).unwrap());
    }

    #[test]
    fn test_pem_roundtrip() {
        let crypto = Crypto::generate();
        let signature = crypto.sign(b"data").unwrap();

        let signer = Crypto::sign_only(&crypto.private_key_pem().unwrap()).unwrap();
        let verifier = Crypto::verify_only(&crypto.public_key_pem().unwrap()).unwrap();

        let again = signer.sign(b"data").unwrap();
        assert!(verifier.verify(b"data", &signature).unwrap());
        assert!(verifier.verify(b"data", &again).unwrap());
    }

    #[test]
    fn test_sign_only_cannot_verify() {
        let crypto = Crypto::generate();
        let signature = crypto.sign(b"data").unwrap();
        let signer = Crypto::sign_only(&crypto.private_key_pem().unwrap()).unwrap();
        assert!(matches!(
            signer.verify(b"data", &signature),
            Err(CoreError::VerifyUnavailable)
        ));
    }

    #[test]
    fn test_verify_only_cannot_sign() {
        let crypto = Crypto::generate();
        let verifier = Crypto::verify_only(&crypto.public_key_pem().unwrap()).unwrap();
        assert!(matches!(
            verifier.sign(b"data"),
            Err(CoreError::SignUnavailable)
        ));
    }

    #[test]
    fn test_malformed_pem_rejected() {
        assert!(matches!(
            Crypto::verify_only("not a pem block"),
            Err(CoreError::InvalidPublicKey(_))
        ));
        assert!(matches!(
            Crypto::sign_only("not a pem block"),
            Err(CoreError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn test_wrong_key_fails_verification() {
        let a = Crypto::generate();
        let b = Crypto::generate();
        let signature = a.sign(b"data").unwrap();
        assert!(!b.verify(b"data", &signature).unwrap());
    }

    #[test]
    fn test_signature_from_slice_length() {
        assert!(matches!(
            OwidSignature::from_slice(&[0u8; 63]),
            Err(CoreError::SignatureLength(63))
        ));
        assert!(OwidSignature::from_slice(&[0u8; 64]).is_ok());
    }
}
