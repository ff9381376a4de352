use std::sync::Arc;

use crate::config::{Backend, Config};
use color_eyre::Result;
use keystash_core::storage::{MemoryStore, SecretStore};
use keystash_storage::{aws::AwsSecretsBackend, remote_store::RemoteSecretStore};
use tracing::debug;

/// Build the store selected by config.
pub async fn store_from_config(config: &Config) -> Result<Box<dyn SecretStore>> {
    match config.backend {
        Backend::Memory => {
            debug!("initializing in-memory store");
            Ok(Box::new(MemoryStore::new()))
        }
        Backend::Aws => {
            let aws = config.aws.clone().unwrap_or_default();
            let client = AwsSecretsBackend::from_settings(&aws.settings()).await;
            let store = RemoteSecretStore::builder()
                .client(Arc::new(client))
                .prefix(aws.prefix.unwrap_or_default())
                .build()?;
            debug!(prefix = store.prefix(), "initializing AWS Secrets Manager store");
            Ok(Box::new(store))
        }
    }
}
