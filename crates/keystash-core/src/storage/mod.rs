mod memory;
mod secret_id;
mod secret_store;

pub use memory::MemoryStore;
pub use secret_id::join_secret_id;
pub use secret_store::{BoxError, NoopStore, Operation, SecretStore, StoreError};
