use std::fmt;

use async_trait::async_trait;
use keystash_core::storage::BoxError;
use thiserror::Error;

/// Structured failure classes a secrets service must expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// The secret identifier does not exist remotely.
    NotFound,
    /// A create was rejected because the identifier already exists.
    AlreadyExists,
    /// Anything else: permissions, throttling, connectivity, bad requests.
    Other,
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BackendErrorKind::NotFound => "not found",
            BackendErrorKind::AlreadyExists => "already exists",
            BackendErrorKind::Other => "request failed",
        };
        f.write_str(label)
    }
}

/// Error returned by a [`SecretsBackend`], classified at the point of the call.
#[derive(Debug, Error)]
#[error("secrets backend: {kind}")]
pub struct BackendError {
    kind: BackendErrorKind,
    #[source]
    source: BoxError,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, source: impl Into<BoxError>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub fn not_found(source: impl Into<BoxError>) -> Self {
        Self::new(BackendErrorKind::NotFound, source)
    }

    pub fn already_exists(source: impl Into<BoxError>) -> Self {
        Self::new(BackendErrorKind::AlreadyExists, source)
    }

    pub fn other(source: impl Into<BoxError>) -> Self {
        Self::new(BackendErrorKind::Other, source)
    }

    pub fn kind(&self) -> BackendErrorKind {
        self.kind
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == BackendErrorKind::NotFound
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind == BackendErrorKind::AlreadyExists
    }
}

/// Pre-authenticated client for a remote secret-management service.
///
/// Identifiers are fully qualified (prefix already applied). Timeouts and
/// retries are the implementation's concern.
#[async_trait]
pub trait SecretsBackend: Send + Sync {
    async fn get_secret_value(&self, secret_id: &str) -> Result<Vec<u8>, BackendError>;

    /// Must fail with [`BackendErrorKind::AlreadyExists`] when `secret_id` exists.
    async fn create_secret(&self, secret_id: &str, payload: &[u8]) -> Result<(), BackendError>;

    async fn update_secret(&self, secret_id: &str, payload: &[u8]) -> Result<(), BackendError>;

    async fn delete_secret(&self, secret_id: &str) -> Result<(), BackendError>;
}
