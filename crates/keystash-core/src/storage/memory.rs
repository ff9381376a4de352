use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;

use super::{SecretStore, StoreError};

/// Volatile in-process store for tests and ephemeral use. Nothing is persisted.
///
/// Clones share the same map. The map does not allocate until the first write.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.recovered().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.recovered().contains_key(name)
    }

    // Inspection still works after a panic poisoned the lock.
    fn recovered(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<u8>>>, StoreError> {
        self.inner.lock().map_err(StoreError::lock_poisoned)
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries()?.get(name).cloned())
    }

    async fn write(&self, name: &str, payload: &[u8]) -> Result<(), StoreError> {
        self.entries()?.insert(name.to_string(), payload.to_vec());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.entries()?.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_read_delete_round_trip() {
        let store = MemoryStore::new();

        store.write("db-pass", b"s3cr3t").await.expect("write");
        let value = store.read("db-pass").await.expect("read");
        assert_eq!(value.as_deref(), Some(&b"s3cr3t"[..]));

        store.delete("db-pass").await.expect("delete");
        assert_eq!(store.read("db-pass").await.expect("read after delete"), None);
    }

    #[tokio::test]
    async fn missing_secret_reads_as_none() {
        let store = MemoryStore::new();
        assert_eq!(store.read("never-written").await.expect("read"), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store.delete("ghost").await.expect("delete missing");
        store.delete("ghost").await.expect("delete missing again");

        store.write("k", b"v").await.expect("write");
        store.delete("k").await.expect("delete");
        store.delete("k").await.expect("delete again");
        assert!(!store.contains("k"));
    }

    #[tokio::test]
    async fn repeated_write_keeps_single_entry() {
        let store = MemoryStore::new();
        store.write("k", b"v").await.expect("write");
        store.write("k", b"v").await.expect("write again");

        assert_eq!(store.len(), 1);
        assert_eq!(store.read("k").await.expect("read"), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn write_overwrites_and_keeps_empty_payloads() {
        let store = MemoryStore::new();
        store.write("k", b"old").await.expect("write");
        store.write("k", b"").await.expect("overwrite");

        assert_eq!(store.read("k").await.expect("read"), Some(Vec::new()));
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.write("shared", b"1").await.expect("write");

        assert!(other.contains("shared"));
    }

    #[tokio::test]
    async fn inspection_survives_poisoned_lock() {
        let store = MemoryStore::new();
        store.write("k", b"v").await.expect("write");

        let inner = Arc::clone(&store.inner);
        let _ = std::thread::spawn(move || {
            let _guard = inner.lock().expect("lock");
            panic!("poison the map");
        })
        .join();

        assert_eq!(store.len(), 1);
        assert!(store.contains("k"));
        let err = store.read("k").await.expect_err("read reports poisoning");
        assert!(matches!(err, StoreError::Storage { .. }));
    }
}
