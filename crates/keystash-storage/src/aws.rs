//! # AWS Secrets Manager backend
//!
//! Implements [`SecretsBackend`] on top of the official AWS SDK. Service errors
//! are classified from the SDK's modeled exceptions:
//! - `ResourceNotFoundException` on get/delete maps to `NotFound`
//! - `ResourceExistsException` on create maps to `AlreadyExists`
//! - everything else (including dispatch and timeout failures) maps to `Other`

use std::fmt;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_secretsmanager::{error::SdkError, primitives::Blob, Client};
use tracing::info;

use crate::backend::{BackendError, BackendErrorKind, SecretsBackend};

/// Settings used to build an SDK client from the default credential chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsSettings {
    pub region: Option<String>,
    pub profile: Option<String>,
    /// Endpoint override, e.g. a LocalStack URL.
    pub endpoint_url: Option<String>,
    /// Skip the recovery window when deleting.
    pub force_delete: bool,
}

/// AWS Secrets Manager client.
#[derive(Clone)]
pub struct AwsSecretsBackend {
    client: Client,
    force_delete: bool,
}

impl fmt::Debug for AwsSecretsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSecretsBackend")
            .field("force_delete", &self.force_delete)
            .finish_non_exhaustive()
    }
}

impl AwsSecretsBackend {
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            force_delete: false,
        }
    }

    /// Load SDK config from the environment, applying any overrides in `settings`.
    pub async fn from_settings(settings: &AwsSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &settings.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint) = &settings.endpoint_url {
            info!(%endpoint, "routing Secrets Manager requests to endpoint override");
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        info!(region = ?sdk_config.region(), "loaded AWS SDK config");

        Self::from_client(Client::new(&sdk_config)).with_force_delete(settings.force_delete)
    }

    pub fn with_force_delete(mut self, force_delete: bool) -> Self {
        self.force_delete = force_delete;
        self
    }
}

#[async_trait]
impl SecretsBackend for AwsSecretsBackend {
    async fn get_secret_value(&self, secret_id: &str) -> Result<Vec<u8>, BackendError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|err| {
                classify(err, |e| {
                    e.is_resource_not_found_exception()
                        .then_some(BackendErrorKind::NotFound)
                })
            })?;

        // Secrets created outside keystash may only carry a string value.
        if let Some(blob) = output.secret_binary() {
            return Ok(blob.as_ref().to_vec());
        }
        Ok(output
            .secret_string()
            .map(|text| text.as_bytes().to_vec())
            .unwrap_or_default())
    }

    async fn create_secret(&self, secret_id: &str, payload: &[u8]) -> Result<(), BackendError> {
        self.client
            .create_secret()
            .name(secret_id)
            .secret_binary(Blob::new(payload))
            .send()
            .await
            .map_err(|err| {
                classify(err, |e| {
                    e.is_resource_exists_exception()
                        .then_some(BackendErrorKind::AlreadyExists)
                })
            })?;
        Ok(())
    }

    async fn update_secret(&self, secret_id: &str, payload: &[u8]) -> Result<(), BackendError> {
        self.client
            .update_secret()
            .secret_id(secret_id)
            .secret_binary(Blob::new(payload))
            .send()
            .await
            .map_err(|err| {
                classify(err, |e| {
                    e.is_resource_not_found_exception()
                        .then_some(BackendErrorKind::NotFound)
                })
            })?;
        Ok(())
    }

    async fn delete_secret(&self, secret_id: &str) -> Result<(), BackendError> {
        self.client
            .delete_secret()
            .secret_id(secret_id)
            .set_force_delete_without_recovery(self.force_delete.then_some(true))
            .send()
            .await
            .map_err(|err| {
                classify(err, |e| {
                    e.is_resource_not_found_exception()
                        .then_some(BackendErrorKind::NotFound)
                })
            })?;
        Ok(())
    }
}

/// Map an SDK failure to a [`BackendError`] using the modeled service error,
/// falling back to `Other` for non-service failures.
fn classify<E, R>(
    err: SdkError<E, R>,
    kind_of: impl FnOnce(&E) -> Option<BackendErrorKind>,
) -> BackendError
where
    E: std::error::Error + Send + Sync + 'static,
    R: fmt::Debug + Send + Sync + 'static,
{
    let kind = err
        .as_service_error()
        .and_then(kind_of)
        .unwrap_or(BackendErrorKind::Other);
    BackendError::new(kind, err)
}
