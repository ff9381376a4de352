use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use keystash_core::storage::{join_secret_id, Operation, SecretStore, StoreError};
use tracing::{debug, instrument};

use crate::backend::SecretsBackend;

/// `SecretStore` backed by a remote secrets service with a local cache in front.
///
/// Reads are served from the cache when possible and populate it on a remote hit.
/// Writes and deletes go to the service and then update the cache.
///
/// The cache assumes this process is the only writer under `prefix`. Another
/// writer's changes are not observed for names already cached; call
/// [`invalidate`](Self::invalidate) or [`clear_cache`](Self::clear_cache) when
/// that assumption does not hold.
pub struct RemoteSecretStore<B> {
    client: Arc<B>,
    prefix: String,
    cache: Mutex<Cache>,
}

/// Cached payloads plus a generation bumped by every write, delete, and
/// invalidation. A read only caches its fetch if the generation it saw before
/// the remote call is still current.
#[derive(Debug, Default)]
struct Cache {
    entries: HashMap<String, Vec<u8>>,
    generation: u64,
}

impl Cache {
    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn evict(&mut self, name: &str) {
        self.bump();
        self.entries.remove(name);
    }

    fn store(&mut self, name: &str, payload: Vec<u8>) {
        self.bump();
        self.entries.insert(name.to_string(), payload);
    }
}

impl<B> fmt::Debug for RemoteSecretStore<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSecretStore")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl<B: SecretsBackend> RemoteSecretStore<B> {
    /// Fails with `InvalidConfiguration` when `client` is `None` or `prefix` is blank.
    pub fn new(client: Option<Arc<B>>, prefix: impl Into<String>) -> Result<Self, StoreError> {
        let client = client
            .ok_or_else(|| StoreError::invalid_configuration("secrets client cannot be absent"))?;

        let prefix = prefix.into();
        if prefix.trim().is_empty() {
            return Err(StoreError::invalid_configuration(
                "secret prefix cannot be empty",
            ));
        }

        debug!(%prefix, "initialized remote secret store");
        Ok(Self {
            client,
            prefix,
            cache: Mutex::new(Cache::default()),
        })
    }

    pub fn builder() -> RemoteSecretStoreBuilder<B> {
        RemoteSecretStoreBuilder::new()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Remote identifier for a logical secret name.
    pub fn secret_id(&self, name: &str) -> String {
        join_secret_id(&self.prefix, name)
    }

    /// Drop the cached payload for `name` without touching the service.
    pub fn invalidate(&self, name: &str) -> Result<(), StoreError> {
        self.cache()?.evict(name);
        Ok(())
    }

    pub fn clear_cache(&self) -> Result<(), StoreError> {
        let mut cache = self.cache()?;
        cache.bump();
        cache.entries.clear();
        Ok(())
    }

    /// Number of cached payloads. Counting is safe on a poisoned lock.
    pub fn cached_len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    // Never hold the guard across an await.
    fn cache(&self) -> Result<MutexGuard<'_, Cache>, StoreError> {
        self.cache.lock().map_err(StoreError::lock_poisoned)
    }
}

#[async_trait]
impl<B: SecretsBackend> SecretStore for RemoteSecretStore<B> {
    #[instrument(skip_all, fields(name = %name))]
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let (cached, generation) = {
            let cache = self.cache()?;
            (cache.entries.get(name).cloned(), cache.generation)
        };
        if let Some(payload) = cached {
            debug!("cache hit");
            return Ok(Some(payload));
        }

        let secret_id = self.secret_id(name);
        debug!(%secret_id, "cache miss, fetching secret");
        match self.client.get_secret_value(&secret_id).await {
            Ok(payload) => {
                let mut cache = self.cache()?;
                if cache.generation == generation {
                    cache.entries.insert(name.to_string(), payload.clone());
                } else {
                    debug!(%secret_id, "cache changed during fetch, not caching");
                }
                Ok(Some(payload))
            }
            Err(err) if err.is_not_found() => {
                debug!(%secret_id, "secret does not exist");
                Ok(None)
            }
            Err(err) => Err(StoreError::remote(Operation::Read, secret_id, err)),
        }
    }

    #[instrument(skip_all, fields(name = %name))]
    async fn write(&self, name: &str, payload: &[u8]) -> Result<(), StoreError> {
        let secret_id = self.secret_id(name);
        // Reads already in flight must not cache what they fetch.
        self.cache()?.bump();

        match self.client.create_secret(&secret_id, payload).await {
            Ok(()) => debug!(%secret_id, "created secret"),
            Err(err) if err.is_already_exists() => {
                debug!(%secret_id, "secret exists, updating");
                self.client
                    .update_secret(&secret_id, payload)
                    .await
                    .map_err(|err| StoreError::remote(Operation::Update, secret_id.as_str(), err))?;
            }
            Err(err) => return Err(StoreError::remote(Operation::Create, secret_id, err)),
        }

        self.cache()?.store(name, payload.to_vec());
        Ok(())
    }

    #[instrument(skip_all, fields(name = %name))]
    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.cache()?.evict(name);

        let secret_id = self.secret_id(name);
        let result = match self.client.delete_secret(&secret_id).await {
            Ok(()) => {
                debug!(%secret_id, "deleted secret");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                debug!(%secret_id, "secret already absent");
                Ok(())
            }
            Err(err) => Err(StoreError::remote(Operation::Delete, secret_id, err)),
        };

        // A read that ran while the remote delete was pending may have cached the old payload.
        self.cache()?.evict(name);
        result
    }
}

/// Builder for [`RemoteSecretStore`]; `build` validates like [`RemoteSecretStore::new`].
pub struct RemoteSecretStoreBuilder<B> {
    client: Option<Arc<B>>,
    prefix: String,
}

impl<B: SecretsBackend> RemoteSecretStoreBuilder<B> {
    fn new() -> Self {
        Self {
            client: None,
            prefix: String::new(),
        }
    }

    pub fn client(mut self, client: Arc<B>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn build(self) -> Result<RemoteSecretStore<B>, StoreError> {
        RemoteSecretStore::new(self.client, self.prefix)
    }
}
