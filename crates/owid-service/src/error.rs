//! Error types for the OWID service layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use owid_core::CoreError;
use owid_store::StoreError;
use thiserror::Error;

/// Errors raised by the service layer and its HTTP surface.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(
        "no storage backend configured; set owidFile or owidSqlite in the \
         configuration, or the OWID_FILE or OWID_SQLITE environment variables"
    )]
    NoStoreConfigured,

    #[error("access denied")]
    AccessDenied,

    #[error("no signer registered for domain '{0}'")]
    UnknownDomain(String),

    #[error("domain '{0}' already registered")]
    AlreadyRegistered(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("domain '{domain}' returned code '{status}'")]
    RemoteStatus { domain: String, status: u16 },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ServiceError {
    /// The HTTP status code this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AccessDenied => StatusCode::UNAUTHORIZED,
            Self::UnknownDomain(_) => StatusCode::NOT_FOUND,
            Self::AlreadyRegistered(_) | Self::BadRequest(_) | Self::Core(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::RemoteStatus { .. } | Self::Http(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::NoStoreConfigured | Self::Internal(_) | Self::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}
