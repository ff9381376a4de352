//! Remote-backed storage for keystash.
//! `RemoteSecretStore` layers a read-through/write-through cache over any
//! `SecretsBackend`; the AWS Secrets Manager backend is enabled by the `aws` feature.

#[cfg(feature = "aws")]
pub mod aws;
pub mod backend;
pub mod remote_store;
