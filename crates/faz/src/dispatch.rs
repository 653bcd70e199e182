//! Event dispatch over a dynamic hook table.
//!
//! The dispatcher holds a process-wide mapping from integer event type to a
//! handler drawn from a static registry of known functions. It never looks
//! inside the payloads it routes.

use crate::FazError;
use corvid_store::StoreApi;
use prost_types::Any;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Boxed future returned by a handler invocation.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Any, FazError>> + Send>>;

/// A handler: unpacks the inbound payload, works the store, packs the
/// reply payload.
pub type HandlerFn = fn(Any, Arc<dyn StoreApi>) -> HandlerFuture;

/// The compile-time table of known handlers, by symbolic name.
pub type Registry = &'static [(&'static str, HandlerFn)];

#[derive(Clone, Copy)]
struct Hooked {
    name: &'static str,
    func: HandlerFn,
}

/// Function-as-a-Service dispatcher.
pub struct Faz {
    store: Arc<dyn StoreApi>,
    known: Registry,
    hooks: RwLock<HashMap<i32, Hooked>>,
}

impl std::fmt::Debug for Faz {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Faz").finish_non_exhaustive()
    }
}

impl Faz {
    pub fn new(store: Arc<dyn StoreApi>, known: Registry) -> Self {
        Self {
            store,
            known,
            hooks: RwLock::new(HashMap::new()),
        }
    }

    /// Bind `event_type` to the named handler, replacing any prior binding.
    /// Fails `NotFound` if the name is not in the registry.
    pub async fn hook(&self, event_type: i32, function_name: &str) -> Result<(), FazError> {
        let Some(&(name, func)) = self.known.iter().find(|(n, _)| *n == function_name) else {
            tracing::error!("cannot hook {:?}: not a known function", function_name);
            return Err(FazError::NotFound(format!(
                "function {:?} not found among known functions",
                function_name
            )));
        };
        self.hooks
            .write()
            .await
            .insert(event_type, Hooked { name, func });
        tracing::info!("hooked {} to event type {}", name, event_type);
        Ok(())
    }

    /// Drop the binding for `event_type`. Fails `NotFound` if none exists.
    pub async fn unhook(&self, event_type: i32) -> Result<(), FazError> {
        if self.hooks.write().await.remove(&event_type).is_none() {
            tracing::error!("cannot unhook event type {}: not bound", event_type);
            return Err(FazError::NotFound(format!(
                "event type {} is not bound",
                event_type
            )));
        }
        tracing::info!("unhooked event type {}", event_type);
        Ok(())
    }

    /// Run `payload` through the handler bound to `event_type` and return
    /// its reply payload.
    ///
    /// The table's read lock is held across the call, so a concurrent
    /// unhook waits for in-flight events while concurrent events still run
    /// in parallel.
    pub async fn event(&self, event_type: i32, payload: Any) -> Result<Any, FazError> {
        let hooks = self.hooks.read().await;
        let Some(hooked) = hooks.get(&event_type).copied() else {
            tracing::error!("event type {} is not bound", event_type);
            return Err(FazError::NotFound(format!(
                "event type {} is not bound",
                event_type
            )));
        };
        tracing::debug!("dispatching event type {} to {}", event_type, hooked.name);
        (hooked.func)(payload, Arc::clone(&self.store)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corvid_store::{KvStore, SharedStore};

    fn echo(payload: Any, _store: Arc<dyn StoreApi>) -> HandlerFuture {
        Box::pin(async move { Ok(payload) })
    }

    fn record(payload: Any, store: Arc<dyn StoreApi>) -> HandlerFuture {
        Box::pin(async move {
            store.put(b"seen", &payload.value).await?;
            Ok(Any::default())
        })
    }

    const TEST_REGISTRY: Registry = &[("Echo", echo), ("Record", record)];

    fn dispatcher() -> (Faz, SharedStore) {
        let store = SharedStore::new(KvStore::new());
        let faz = Faz::new(Arc::new(store.clone()), TEST_REGISTRY);
        (faz, store)
    }

    fn payload(bytes: &[u8]) -> Any {
        Any {
            type_url: "type.googleapis.com/test.Payload".into(),
            value: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_hook_unknown_function() {
        let (faz, _) = dispatcher();
        let result = faz.hook(0, "NoSuchFunction").await;
        assert!(matches!(result, Err(FazError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_event_unbound_type() {
        let (faz, _) = dispatcher();
        let result = faz.event(42, payload(b"x")).await;
        assert!(matches!(result, Err(FazError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unhook_unbound_type() {
        let (faz, _) = dispatcher();
        assert!(matches!(faz.unhook(3).await, Err(FazError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_hook_event_unhook_cycle() {
        let (faz, _) = dispatcher();
        faz.hook(7, "Echo").await.unwrap();

        let reply = faz.event(7, payload(b"hello")).await.unwrap();
        assert_eq!(reply.value, b"hello");

        faz.unhook(7).await.unwrap();
        assert!(matches!(
            faz.event(7, payload(b"hello")).await,
            Err(FazError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rehook_replaces_binding() {
        let (faz, store) = dispatcher();
        faz.hook(1, "Echo").await.unwrap();
        faz.hook(1, "Record").await.unwrap();

        faz.event(1, payload(b"observed")).await.unwrap();
        assert_eq!(
            store.get(b"seen").await.unwrap(),
            vec![b"observed".to_vec()]
        );
    }

    #[tokio::test]
    async fn test_handler_reaches_store() {
        let (faz, store) = dispatcher();
        faz.hook(2, "Record").await.unwrap();
        faz.event(2, payload(b"first")).await.unwrap();
        faz.event(2, payload(b"second")).await.unwrap();
        assert_eq!(
            store.get(b"seen").await.unwrap(),
            vec![b"first".to_vec(), b"second".to_vec()]
        );
    }
}
