//! Async store surface shared by handlers and the RPC shim.
//!
//! Handlers talk to a [`StoreApi`], so the same code runs against the
//! in-process store or a remote store service.

use crate::store::KvStore;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum StoreApiError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The store operations handlers are allowed to perform.
#[async_trait::async_trait]
pub trait StoreApi: Send + Sync {
    /// Append `value` under `key`.
    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreApiError>;
    /// Snapshot copy of the values under `key`.
    async fn get(&self, key: &[u8]) -> Result<Vec<Vec<u8>>, StoreApiError>;
    /// Drop all values under `key`; reports whether the key existed.
    async fn remove(&self, key: &[u8]) -> Result<bool, StoreApiError>;
}

/// Shared handle to an in-process [`KvStore`].
///
/// A single readers-writer lock guards the map and the change log together:
/// readers proceed in parallel and never touch the file, mutators are
/// exclusive for the map update plus log append.
#[derive(Debug, Clone)]
pub struct SharedStore {
    inner: Arc<RwLock<KvStore>>,
}

impl SharedStore {
    pub fn new(store: KvStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Drop every key and value.
    pub async fn clear(&self) -> Result<(), StoreApiError> {
        self.inner
            .write()
            .await
            .clear()
            .map_err(|e| StoreApiError::Unavailable(e.to_string()))
    }
}

#[async_trait::async_trait]
impl StoreApi for SharedStore {
    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreApiError> {
        self.inner
            .write()
            .await
            .put(key, value)
            .map_err(|e| StoreApiError::Unavailable(e.to_string()))
    }

    async fn get(&self, key: &[u8]) -> Result<Vec<Vec<u8>>, StoreApiError> {
        Ok(self.inner.read().await.get(key))
    }

    async fn remove(&self, key: &[u8]) -> Result<bool, StoreApiError> {
        self.inner
            .write()
            .await
            .remove(key)
            .map_err(|e| StoreApiError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_puts_lose_nothing() {
        let store = SharedStore::new(KvStore::new());

        const WRITERS: usize = 8;
        const PUTS_PER_WRITER: usize = 50;

        let mut tasks = Vec::new();
        for w in 0..WRITERS {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..PUTS_PER_WRITER {
                    let value = format!("{}-{}", w, i);
                    store.put(b"shared", value.as_bytes()).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let values = store.get(b"shared").await.unwrap();
        assert_eq!(values.len(), WRITERS * PUTS_PER_WRITER);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reads_and_writes() {
        let store = SharedStore::new(KvStore::new());
        let payload = vec![0xabu8; 64];

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            let payload = payload.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..50 {
                    store.put(b"contended", &payload).await.unwrap();
                }
            }));
        }
        for _ in 0..4 {
            let store = store.clone();
            let payload = payload.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..100 {
                    for value in store.get(b"contended").await.unwrap() {
                        assert_eq!(value, payload, "no torn value may be observed");
                    }
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.get(b"contended").await.unwrap().len(), 200);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_clears_interleaved_with_writes() {
        let store = SharedStore::new(KvStore::new());
        let payload = vec![0x5au8; 32];

        let mut tasks = Vec::new();
        for _ in 0..3 {
            let store = store.clone();
            let payload = payload.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..50 {
                    store.put(b"churn", &payload).await.unwrap();
                }
            }));
        }
        {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..20 {
                    store.clear().await.unwrap();
                    tokio::task::yield_now().await;
                }
            }));
        }
        {
            let store = store.clone();
            let payload = payload.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..100 {
                    for value in store.get(b"churn").await.unwrap() {
                        assert_eq!(value, payload);
                    }
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_shared_clear_and_len() {
        let store = SharedStore::new(KvStore::new());
        store.put(b"a", b"1").await.unwrap();
        store.put(b"b", b"2").await.unwrap();
        assert_eq!(store.len().await, 2);
        assert!(!store.is_empty().await);

        store.clear().await.unwrap();
        assert!(store.is_empty().await);
        assert!(!store.remove(b"a").await.unwrap());
    }
}
