//! # OWID Service
//!
//! Glue around the OWID core and store: configuration with environment
//! fallback, access control for privileged operations, the HTTP surface,
//! and client-side verification against a remote signer's published
//! keys.

pub mod access;
pub mod config;
pub mod error;
pub mod remote;
pub mod services;
pub mod web;

pub use access::{Access, DenyAll, FixedAccess};
pub use config::{new_store, Configuration};
pub use error::ServiceError;
pub use remote::{fetch_public_signer, verify_remote};
pub use services::Services;
pub use web::router;
