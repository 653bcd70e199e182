//! corvid-store: persistent multi-value key-value store.
//!
//! A map from byte-string key to an ordered list of byte-string values,
//! optionally backed by an append-only change log. The log is replayed on
//! open; tail corruption is detected and truncated automatically, so the
//! map always equals the fold of the durable record prefix.

pub mod api;
pub mod changelog;
pub mod store;

pub use api::{SharedStore, StoreApi, StoreApiError};
pub use changelog::{Change, ChangeLog, LogError, SyncPolicy};
pub use store::{KvStore, StoreError};
