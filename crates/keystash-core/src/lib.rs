//! Core abstractions for keystash: the secret storage contract, its error
//! taxonomy, and the in-process store implementations.
//! Remote-backed stores live in `keystash-storage`.

pub mod storage;
