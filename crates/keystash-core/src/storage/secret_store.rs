use std::{fmt, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

/// Boxed error used to carry the underlying cause of a remote failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Remote operation that produced a [`StoreError::Remote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Operation::Read => "get secret value",
            Operation::Create => "create secret",
            Operation::Update => "update secret",
            Operation::Delete => "delete secret",
        };
        f.write_str(label)
    }
}

/// Errors produced by secret store implementations.
///
/// A missing secret is never an error: reads return `None` and deletes succeed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be constructed from the given collaborators.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
    /// The remote service rejected or failed an operation.
    #[error("{operation} failed for {secret_id}")]
    Remote {
        operation: Operation,
        secret_id: String,
        #[source]
        source: BoxError,
    },
    /// Local storage failure (e.g. a poisoned cache lock).
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

impl StoreError {
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    pub fn remote(
        operation: Operation,
        secret_id: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Remote {
            operation,
            secret_id: secret_id.into(),
            source: source.into(),
        }
    }

    pub fn lock_poisoned(err: impl fmt::Display) -> Self {
        Self::Storage {
            reason: format!("lock poisoned: {err}"),
        }
    }
}

/// Contract for reading, writing, and deleting named binary secrets.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the payload for `name`; `Ok(None)` when the secret does not exist.
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Persist a payload under `name`, creating or overwriting it.
    async fn write(&self, name: &str, payload: &[u8]) -> Result<(), StoreError>;

    /// Remove `name` (idempotent).
    async fn delete(&self, name: &str) -> Result<(), StoreError>;
}

/// Store that holds nothing: reads are empty, writes and deletes succeed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoopStore;

#[async_trait]
impl SecretStore for NoopStore {
    async fn read(&self, _name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(None)
    }

    async fn write(&self, _name: &str, _payload: &[u8]) -> Result<(), StoreError> {
        Ok(())
    }

    async fn delete(&self, _name: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

/// An unset store is a valid store: `None` behaves like [`NoopStore`].
#[async_trait]
impl<S: SecretStore> SecretStore for Option<S> {
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match self {
            Some(store) => store.read(name).await,
            None => Ok(None),
        }
    }

    async fn write(&self, name: &str, payload: &[u8]) -> Result<(), StoreError> {
        match self {
            Some(store) => store.write(name, payload).await,
            None => Ok(()),
        }
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        match self {
            Some(store) => store.delete(name).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<S: SecretStore + ?Sized> SecretStore for Arc<S> {
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).read(name).await
    }

    async fn write(&self, name: &str, payload: &[u8]) -> Result<(), StoreError> {
        (**self).write(name, payload).await
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        (**self).delete(name).await
    }
}

#[async_trait]
impl<S: SecretStore + ?Sized> SecretStore for Box<S> {
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).read(name).await
    }

    async fn write(&self, name: &str, payload: &[u8]) -> Result<(), StoreError> {
        (**self).write(name, payload).await
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        (**self).delete(name).await
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn unset_store_is_a_noop() {
        let store: Option<MemoryStore> = None;

        store.write("k", b"v").await.expect("write should succeed");
        assert_eq!(store.read("k").await.expect("read should succeed"), None);
        store.delete("k").await.expect("delete should succeed");
        store.delete("k").await.expect("delete again should succeed");
    }

    #[tokio::test]
    async fn noop_store_never_holds_data() {
        let store = NoopStore;
        store.write("db-pass", b"s3cr3t").await.expect("write");
        assert_eq!(store.read("db-pass").await.expect("read"), None);
        store.delete("db-pass").await.expect("delete");
    }

    #[tokio::test]
    async fn set_option_forwards_to_inner_store() {
        let inner = MemoryStore::new();
        let store = Some(inner.clone());

        store.write("k", b"v").await.expect("write");
        assert_eq!(inner.read("k").await.expect("read"), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn trait_objects_forward_through_box_and_arc() {
        let boxed: Box<dyn SecretStore> = Box::new(MemoryStore::new());
        boxed.write("k", b"v").await.expect("write");
        assert_eq!(boxed.read("k").await.expect("read"), Some(b"v".to_vec()));

        let shared: Arc<dyn SecretStore> = Arc::new(MemoryStore::new());
        shared.write("k", b"v").await.expect("write");
        shared.delete("k").await.expect("delete");
        assert_eq!(shared.read("k").await.expect("read"), None);
    }

    #[test]
    fn remote_error_names_operation_and_identifier() {
        let err = StoreError::remote(Operation::Delete, "app/prod/api-key", "access denied");

        assert_eq!(
            err.to_string(),
            "delete secret failed for app/prod/api-key"
        );
        let source = err.source().expect("source should be kept");
        assert_eq!(source.to_string(), "access denied");
    }
}
