//! The OWID value: a signed, timestamped attestation of a domain's
//! endorsement of opaque target data.
//!
//! An OWID is immutable once signed. The target bytes are carried only in
//! memory so that signatures can be produced and checked; they are never
//! part of any serialized form.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{Crypto, OwidSignature};
use crate::error::{CoreError, ValidationError};
use crate::io::{self, Reader};

/// Version byte of the only valid non-empty OWID.
pub const OWID_VERSION_1: u8 = 1;

/// Version byte marking an empty OWID slot in a binary stream.
pub const OWID_VERSION_EMPTY: u8 = 0;

/// A single Open Web ID.
#[derive(Debug, Clone, PartialEq)]
pub struct Owid {
    /// The version of the OWID. Version 1 only.
    pub version: u8,

    /// Domain of the signer that produced the attestation.
    pub domain: String,

    /// Creation time as whole minutes since the 2020-01-01 UTC epoch,
    /// quantized when the OWID is signed.
    pub timestamp: u32,

    /// The 64-byte signature, absent until the OWID is signed.
    pub signature: Option<OwidSignature>,

    /// The data whose binding is asserted. Never serialized.
    pub target: Option<Bytes>,
}

impl Owid {
    /// The creation time as an instant.
    pub fn time(&self) -> DateTime<Utc> {
        io::time_of_minutes(self.timestamp)
    }

    /// The target bytes, required for signing and verification.
    pub fn target_bytes(&self) -> Result<&[u8], CoreError> {
        self.target.as_deref().ok_or(CoreError::MissingTarget)
    }

    /// The byte sequence covered by the signature:
    /// target ∥ domain ∥ timestamp.
    pub fn signed_bytes(&self) -> Result<Vec<u8>, CoreError> {
        let target = self.target_bytes()?;
        let mut buf = Vec::with_capacity(target.len() + self.domain.len() + 5);
        buf.extend_from_slice(target);
        io::write_string(&mut buf, &self.domain)?;
        io::write_u32(&mut buf, self.timestamp);
        Ok(buf)
    }

    /// Sign this OWID with the crypto handle provided, replacing any
    /// existing signature.
    pub(crate) fn sign_with(&mut self, crypto: &Crypto) -> Result<(), CoreError> {
        let data = self.signed_bytes()?;
        self.signature = Some(crypto.sign(&data)?);
        Ok(())
    }

    /// Verify this OWID using the crypto handle provided.
    pub fn verify_with_crypto(&self, crypto: &Crypto) -> Result<bool, CoreError> {
        let signature = self
            .signature
            .as_ref()
            .ok_or(ValidationError::MissingSignature)?;
        let data = self.signed_bytes()?;
        crypto.verify(&data, signature)
    }

    /// Verify this OWID using a public key in SPKI PEM format.
    pub fn verify_with_public_key(&self, public_pem: &str) -> Result<bool, CoreError> {
        self.verify_with_crypto(&Crypto::verify_only(public_pem)?)
    }

    /// Check the structural validity of a signed OWID.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.signature.is_none() {
            return Err(ValidationError::MissingSignature);
        }
        if self.domain.is_empty() {
            return Err(ValidationError::MissingDomain);
        }
        if self.version != OWID_VERSION_1 {
            return Err(ValidationError::UnsupportedVersion(self.version));
        }
        Ok(())
    }

    /// Append the binary form to the buffer provided.
    pub fn to_buffer(&self, buf: &mut Vec<u8>) -> Result<(), CoreError> {
        let signature = self
            .signature
            .as_ref()
            .ok_or(ValidationError::MissingSignature)?;
        io::write_byte(buf, self.version);
        io::write_string(buf, &self.domain)?;
        io::write_u32(buf, self.timestamp);
        io::write_signature(buf, signature.as_bytes())
    }

    /// The binary form as a byte array.
    pub fn as_byte_array(&self) -> Result<Vec<u8>, CoreError> {
        let mut buf = Vec::new();
        self.to_buffer(&mut buf)?;
        Ok(buf)
    }

    /// The binary form as a standard base64 string.
    pub fn as_base64(&self) -> Result<String, CoreError> {
        Ok(BASE64.encode(self.as_byte_array()?))
    }

    /// Decode a single version-1 OWID from its binary form.
    ///
    /// The decoded OWID carries no target; attach the original target
    /// bytes before verifying.
    pub fn from_byte_array(bytes: &[u8]) -> Result<Owid, CoreError> {
        match OwidRecord::from_byte_array(bytes)? {
            OwidRecord::Owid(owid) => Ok(owid),
            OwidRecord::Empty => Err(CoreError::MalformedOwid(
                "expected an OWID, found an empty marker".into(),
            )),
        }
    }

    /// Decode a single OWID from its standard base64 form.
    pub fn from_base64(value: &str) -> Result<Owid, CoreError> {
        let bytes = BASE64
            .decode(value)
            .map_err(|e| CoreError::MalformedOwid(format!("base64: {e}")))?;
        Self::from_byte_array(&bytes)
    }

    /// The JSON form: version, domain, timestamp in minutes, signature in
    /// standard base64.
    pub fn marshal_json(&self) -> Result<String, CoreError> {
        let signature = self
            .signature
            .as_ref()
            .ok_or(ValidationError::MissingSignature)?;
        let json = OwidJson {
            version: self.version,
            domain: self.domain.clone(),
            timestamp: self.timestamp,
            signature: BASE64.encode(signature.as_bytes()),
        };
        Ok(serde_json::to_string(&json)?)
    }

    /// Decode the JSON form. A missing version defaults to 1; a missing
    /// domain, timestamp or signature fails. The result is re-validated.
    pub fn unmarshal_json(data: &str) -> Result<Owid, CoreError> {
        let json: OwidJson = serde_json::from_str(data)?;
        let raw = BASE64
            .decode(&json.signature)
            .map_err(|e| CoreError::MalformedOwid(format!("signature base64: {e}")))?;
        let owid = Owid {
            version: json.version,
            domain: json.domain,
            timestamp: json.timestamp,
            signature: Some(OwidSignature::from_slice(&raw)?),
            target: None,
        };
        owid.validate()?;
        Ok(owid)
    }
}

/// An OWID slot as it appears in a binary stream: either the version-0
/// empty marker or a version-1 record. Any other version byte is
/// rejected at decode.
#[derive(Debug, Clone, PartialEq)]
pub enum OwidRecord {
    Empty,
    Owid(Owid),
}

impl OwidRecord {
    /// Append the binary form to the buffer provided.
    pub fn to_buffer(&self, buf: &mut Vec<u8>) -> Result<(), CoreError> {
        match self {
            OwidRecord::Empty => {
                io::write_byte(buf, OWID_VERSION_EMPTY);
                Ok(())
            }
            OwidRecord::Owid(owid) => owid.to_buffer(buf),
        }
    }

    /// Decode the next OWID slot from the reader.
    pub fn from_buffer(reader: &mut Reader<'_>) -> Result<OwidRecord, CoreError> {
        let version = reader.read_byte()?;
        match version {
            OWID_VERSION_EMPTY => Ok(OwidRecord::Empty),
            OWID_VERSION_1 => {
                let domain = reader.read_string()?;
                let timestamp = reader.read_u32()?;
                let signature = OwidSignature::from_bytes(reader.read_signature()?);
                Ok(OwidRecord::Owid(Owid {
                    version,
                    domain,
                    timestamp,
                    signature: Some(signature),
                    target: None,
                }))
            }
            v => Err(CoreError::UnsupportedVersion(v)),
        }
    }

    /// Decode an OWID slot from a byte array.
    pub fn from_byte_array(bytes: &[u8]) -> Result<OwidRecord, CoreError> {
        Self::from_buffer(&mut Reader::new(bytes))
    }
}

#[derive(Serialize, Deserialize)]
struct OwidJson {
    #[serde(default = "default_version")]
    version: u8,
    domain: String,
    timestamp: u32,
    signature: String,
}

fn default_version() -> u8 {
    OWID_VERSION_1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SIGNATURE_LENGTH;

    fn signed_owid() -> (Owid, Crypto) {
        let crypto = Crypto::generate();
        let mut owid = Owid {
            version: OWID_VERSION_1,
            domain: "example.com".into(),
            timestamp: io::minutes_since_epoch(Utc::now()).unwrap(),
            signature: None,
            target: Some(Bytes::from_static(b"hello")),
        };
        owid.sign_with(&crypto).unwrap();
        (owid, crypto)
    }

    #[test]
    fn test_binary_roundtrip() {
        let (owid, crypto) = signed_owid();
        let bytes = owid.as_byte_array().unwrap();

        let mut decoded = Owid::from_byte_array(&bytes).unwrap();
        assert_eq!(decoded.version, owid.version);
        assert_eq!(decoded.domain, owid.domain);
        assert_eq!(decoded.timestamp, owid.timestamp);
        assert_eq!(decoded.signature, owid.signature);

        // Re-encoding reproduces the input byte for byte.
        assert_eq!(decoded.as_byte_array().unwrap(), bytes);

        decoded.target = Some(Bytes::from_static(b"hello"));
        assert!(decoded.verify_with_crypto(&crypto).unwrap());
    }

    #[test]
    fn test_base64_roundtrip() {
        let (owid, _) = signed_owid();
        let encoded = owid.as_base64().unwrap();
        let decoded = Owid::from_base64(&encoded).unwrap();
        assert_eq!(decoded.signature, owid.signature);
    }

    #[test]
    fn test_empty_record_roundtrip() {
        let mut buf = Vec::new();
        OwidRecord::Empty.to_buffer(&mut buf).unwrap();
        assert_eq!(buf, vec![OWID_VERSION_EMPTY]);
        assert_eq!(
            OwidRecord::from_byte_array(&buf).unwrap(),
            OwidRecord::Empty
        );
    }

    #[test]
    fn test_unknown_version_rejected() {
        let (owid, _) = signed_owid();
        let mut bytes = owid.as_byte_array().unwrap();
        bytes[0] = 2;
        assert!(matches!(
            OwidRecord::from_byte_array(&bytes),
            Err(CoreError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_truncated_buffer_rejected() {
        let (owid, _) = signed_owid();
        let bytes = owid.as_byte_array().unwrap();
        let result = Owid::from_byte_array(&bytes[..bytes.len() - 10]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unsigned_owid_does_not_marshal() {
        let owid = Owid {
            version: OWID_VERSION_1,
            domain: "example.com".into(),
            timestamp: 0,
            signature: None,
            target: None,
        };
        assert!(owid.as_byte_array().is_err());
        assert!(owid.marshal_json().is_err());
    }

    #[test]
    fn test_domain_with_null_does_not_marshal() {
        let (mut owid, _) = signed_owid();
        owid.domain = "bad\0domain".into();
        assert!(matches!(
            owid.as_byte_array(),
            Err(CoreError::EmbeddedNull)
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let (owid, crypto) = signed_owid();
        let json = owid.marshal_json().unwrap();
        let mut decoded = Owid::unmarshal_json(&json).unwrap();
        assert_eq!(decoded.version, owid.version);
        assert_eq!(decoded.domain, owid.domain);
        assert_eq!(decoded.timestamp, owid.timestamp);
        assert_eq!(decoded.signature, owid.signature);

        decoded.target = Some(Bytes::from_static(b"hello"));
        assert!(decoded.verify_with_crypto(&crypto).unwrap());
    }

    #[test]
    fn test_json_version_defaults_to_one() {
        let (owid, _) = signed_owid();
        let signature = BASE64.encode(owid.signature.unwrap().as_bytes());
        let json = format!(
            r#"{{"domain":"example.com","timestamp":{},"signature":"{}"}}"#,
            owid.timestamp, signature
        );
        let decoded = Owid::unmarshal_json(&json).unwrap();
        assert_eq!(decoded.version, OWID_VERSION_1);
    }

    #[test]
    fn test_json_missing_fields_rejected() {
        assert!(Owid::unmarshal_json(r#"{"timestamp":1,"signature":"AA=="}"#).is_err());
        assert!(Owid::unmarshal_json(r#"{"domain":"a.com","signature":"AA=="}"#).is_err());
        assert!(Owid::unmarshal_json(r#"{"domain":"a.com","timestamp":1}"#).is_err());
    }

    #[test]
    fn test_json_short_signature_rejected() {
        let json = format!(
            r#"{{"domain":"example.com","timestamp":1,"signature":"{}"}}"#,
            BASE64.encode([0u8; 10])
        );
        assert!(matches!(
            Owid::unmarshal_json(&json),
            Err(CoreError::SignatureLength(10))
        ));
    }

    #[test]
    fn test_validate_errors() {
        let (owid, _) = signed_owid();

        let mut unsigned = owid.clone();
        unsigned.signature = None;
        assert_eq!(
            unsigned.validate().unwrap_err(),
            ValidationError::MissingSignature
        );

        let mut no_domain = owid.clone();
        no_domain.domain.clear();
        assert_eq!(
            no_domain.validate().unwrap_err(),
            ValidationError::MissingDomain
        );

        let mut bad_version = owid.clone();
        bad_version.version = 3;
        assert_eq!(
            bad_version.validate().unwrap_err(),
            ValidationError::UnsupportedVersion(3)
        );

        assert!(owid.validate().is_ok());
    }

    #[test]
    fn test_signature_is_64_bytes() {
        let (owid, _) = signed_owid();
        assert_eq!(owid.signature.unwrap().as_bytes().len(), SIGNATURE_LENGTH);
    }

    #[test]
    fn test_verify_without_target_fails() {
        let (owid, crypto) = signed_owid();
        let bytes = owid.as_byte_array().unwrap();
        let decoded = Owid::from_byte_array(&bytes).unwrap();
        assert!(matches!(
            decoded.verify_with_crypto(&crypto),
            Err(CoreError::MissingTarget)
        ));
    }

    #[test]
    fn test_stream_of_records() {
        let (owid, _) = signed_owid();
        let mut buf = Vec::new();
        OwidRecord::Empty.to_buffer(&mut buf).unwrap();
        OwidRecord::Owid(owid.clone()).to_buffer(&mut buf).unwrap();
        OwidRecord::Empty.to_buffer(&mut buf).unwrap();

        let mut reader = Reader::new(&buf);
        assert_eq!(
            OwidRecord::from_buffer(&mut reader).unwrap(),
            OwidRecord::Empty
        );
        match OwidRecord::from_buffer(&mut reader).unwrap() {
            OwidRecord::Owid(o) => assert_eq!(o.domain, owid.domain),
            other => panic!("expected OWID, got {other:?}"),
        }
        assert_eq!(
            OwidRecord::from_buffer(&mut reader).unwrap(),
            OwidRecord::Empty
        );
        assert_eq!(reader.remaining(), 0);
    }
}
