//! Access control gating privileged operations such as key rotation.

use async_trait::async_trait;

use crate::error::ServiceError;

/// Decides whether a caller-supplied access key is valid.
#[async_trait]
pub trait Access: Send + Sync {
    /// True when the access key provided is valid.
    async fn allowed(&self, key: &str) -> Result<bool, ServiceError>;
}

/// Access backed by a fixed list of keys.
pub struct FixedAccess {
    keys: Vec<String>,
}

impl FixedAccess {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl Access for FixedAccess {
    async fn allowed(&self, key: &str) -> Result<bool, ServiceError> {
        Ok(!key.is_empty() && self.keys.iter().any(|k| k == key))
    }
}

/// Access that denies everything, the default when no keys are
/// configured.
pub struct DenyAll;

#[async_trait]
impl Access for DenyAll {
    async fn allowed(&self, _key: &str) -> Result<bool, ServiceError> {
        Ok(false)
    }
}
