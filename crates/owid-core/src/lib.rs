//! # OWID Core
//!
//! Pure primitives for Open Web IDs: short, self-describing attestations
//! binding opaque target data to the domain that signed it at a specific
//! minute in time.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`Owid`] - The attestation value: version, domain, timestamp, signature
//! - [`Signer`] - A registered domain holding an ordered key history
//! - [`Keys`] - A (private, public, created) key record
//! - [`PublicSigner`] - Public-key-only projection safe to publish
//!
//! ## Wire Forms
//!
//! OWIDs serialize to a fixed little-endian binary layout (see [`io`]),
//! to standard base64 of that layout, and to a small JSON object.
//!
//! ## Example
//!
//! ```
//! use owid_core::{Keys, Signer};
//!
//! let keys = Keys::generate().unwrap();
//! let signer = Signer::new(
//!     "example.com",
//!     "Example Org",
//!     "https://example.com/terms",
//!     keys,
//! ).unwrap();
//!
//! let owid = signer.create_and_sign("hello").unwrap();
//! assert!(signer.verify(&owid).unwrap());
//! ```

pub mod crypto;
pub mod error;
pub mod io;
pub mod keys;
pub mod owid;
pub mod signer;

pub use crypto::{Crypto, OwidSignature};
pub use error::{CoreError, ValidationError};
pub use io::SIGNATURE_LENGTH;
pub use keys::{order_for_verify, Keys, PublicKey};
pub use owid::{Owid, OwidRecord, OWID_VERSION_1, OWID_VERSION_EMPTY};
pub use signer::{
    PublicSigner, Signer, MAX_NAME_LENGTH, MAX_TERMS_URL_LENGTH, MIN_NAME_LENGTH,
    VERIFY_TOLERANCE_MINUTES,
};
