//! gRPC service implementations.
//!
//! Bridges the tonic-generated service traits to the store and the
//! dispatch layer in the `corvid-store` and `corvid-faz` crates.

use corvid_faz::{Faz, FazError};
use corvid_proto::faz as fazpb;
use corvid_proto::kvstore as kvpb;
use corvid_store::{SharedStore, StoreApi};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tonic::{Request, Response, Status, Streaming};

fn status_from(err: FazError) -> Status {
    match err {
        FazError::NotFound(msg) => Status::not_found(msg),
        FazError::AlreadyExists(msg) => Status::already_exists(msg),
        FazError::Unavailable(msg) => Status::unavailable(msg),
        FazError::InvalidArgument(msg) => Status::invalid_argument(msg),
        FazError::Internal(msg) => Status::internal(msg),
    }
}

// ---------------------------------------------------------------------------
// Store gRPC service
// ---------------------------------------------------------------------------

/// Exposes the in-process store across the process boundary.
#[derive(Debug)]
pub struct StoreService {
    pub store: SharedStore,
}

#[tonic::async_trait]
impl kvpb::key_value_store_server::KeyValueStore for StoreService {
    async fn put(
        &self,
        request: Request<kvpb::PutRequest>,
    ) -> Result<Response<kvpb::PutReply>, Status> {
        corvid_metrics::metrics().store_puts.inc();
        let _timer = corvid_metrics::start_store_timer("put");
        let req = request.into_inner();

        self.store
            .put(&req.key, &req.value)
            .await
            .map_err(|e| Status::unavailable(e.to_string()))?;

        Ok(Response::new(kvpb::PutReply {}))
    }

    type GetStream = Pin<Box<dyn Stream<Item = Result<kvpb::GetReply, Status>> + Send + 'static>>;

    async fn get(
        &self,
        request: Request<Streaming<kvpb::GetRequest>>,
    ) -> Result<Response<Self::GetStream>, Status> {
        let mut inbound = request.into_inner();
        let store = self.store.clone();
        let (tx, rx) = mpsc::channel(16);

        // Each inbound request frame yields one outbound frame per value.
        tokio::spawn(async move {
            loop {
                let req = match inbound.message().await {
                    Ok(Some(req)) => req,
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        break;
                    }
                };
                corvid_metrics::metrics().store_gets.inc();
                let _timer = corvid_metrics::start_store_timer("get");
                match store.get(&req.key).await {
                    Ok(values) => {
                        for value in values {
                            if tx.send(Ok(kvpb::GetReply { value })).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(Status::unavailable(e.to_string()))).await;
                        return;
                    }
                }
            }
        });

        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }

    async fn remove(
        &self,
        request: Request<kvpb::RemoveRequest>,
    ) -> Result<Response<kvpb::RemoveReply>, Status> {
        corvid_metrics::metrics().store_removes.inc();
        let _timer = corvid_metrics::start_store_timer("remove");
        let req = request.into_inner();

        let existed = self
            .store
            .remove(&req.key)
            .await
            .map_err(|e| Status::unavailable(e.to_string()))?;
        if !existed {
            return Err(Status::not_found("key not found"));
        }

        Ok(Response::new(kvpb::RemoveReply {}))
    }
}

// ---------------------------------------------------------------------------
// Faz gRPC service
// ---------------------------------------------------------------------------

/// Exposes the dispatcher's hook table and event entry point.
#[derive(Debug)]
pub struct FazService {
    pub faz: Arc<Faz>,
}

#[tonic::async_trait]
impl fazpb::faz_server::Faz for FazService {
    async fn hook(
        &self,
        request: Request<fazpb::HookRequest>,
    ) -> Result<Response<fazpb::HookReply>, Status> {
        corvid_metrics::metrics().hooks.inc();
        let req = request.into_inner();

        self.faz
            .hook(req.event_type, &req.event_function)
            .await
            .map_err(status_from)?;

        Ok(Response::new(fazpb::HookReply {}))
    }

    async fn unhook(
        &self,
        request: Request<fazpb::UnhookRequest>,
    ) -> Result<Response<fazpb::UnhookReply>, Status> {
        corvid_metrics::metrics().unhooks.inc();
        let req = request.into_inner();

        self.faz.unhook(req.event_type).await.map_err(status_from)?;

        Ok(Response::new(fazpb::UnhookReply {}))
    }

    async fn event(
        &self,
        request: Request<fazpb::EventRequest>,
    ) -> Result<Response<fazpb::EventReply>, Status> {
        let req = request.into_inner();
        let m = corvid_metrics::metrics();
        m.events.inc();
        let label = req.event_type.to_string();
        m.events_by_type.with_label_values(&[&label]).inc();
        let _timer = corvid_metrics::start_event_timer(&label);

        let payload = req.payload.unwrap_or_default();
        let reply = self
            .faz
            .event(req.event_type, payload)
            .await
            .map_err(status_from)?;

        Ok(Response::new(fazpb::EventReply {
            payload: Some(reply),
        }))
    }
}

// ---------------------------------------------------------------------------
// Router assembly
// ---------------------------------------------------------------------------

/// Build a tonic `Router` serving the store and faz services.
pub fn build_server(store: SharedStore, faz: Arc<Faz>) -> tonic::transport::server::Router {
    let store_svc = StoreService { store };
    let faz_svc = FazService { faz };

    tonic::transport::Server::builder()
        .add_service(kvpb::key_value_store_server::KeyValueStoreServer::new(
            store_svc,
        ))
        .add_service(fazpb::faz_server::FazServer::new(faz_svc))
}
