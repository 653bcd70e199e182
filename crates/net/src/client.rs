//! gRPC client implementing [`StoreApi`].
//!
//! `StoreClient` lets handlers and the dispatch layer work a remote store
//! service exactly the way they work the in-process one.

use corvid_proto::kvstore as kvpb;
use corvid_store::{StoreApi, StoreApiError};
use kvpb::key_value_store_client::KeyValueStoreClient;
use tonic::transport::Channel;
use tonic::Code;

/// Store handle backed by a remote store service.
#[derive(Debug, Clone)]
pub struct StoreClient {
    client: KeyValueStoreClient<Channel>,
}

impl StoreClient {
    /// Connect to a store service, e.g. `http://127.0.0.1:50001`.
    pub async fn connect(endpoint: String) -> Result<Self, tonic::transport::Error> {
        Ok(Self {
            client: KeyValueStoreClient::connect(endpoint).await?,
        })
    }
}

fn unavailable(status: tonic::Status) -> StoreApiError {
    StoreApiError::Unavailable(status.message().to_string())
}

#[async_trait::async_trait]
impl StoreApi for StoreClient {
    async fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreApiError> {
        let mut client = self.client.clone();
        client
            .put(kvpb::PutRequest {
                key: key.to_vec(),
                value: value.to_vec(),
            })
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn get(&self, key: &[u8]) -> Result<Vec<Vec<u8>>, StoreApiError> {
        let mut client = self.client.clone();
        // Single request frame, then collect every streamed value frame.
        let requests = tokio_stream::iter([kvpb::GetRequest { key: key.to_vec() }]);
        let mut inbound = client.get(requests).await.map_err(unavailable)?.into_inner();

        let mut values = Vec::new();
        while let Some(reply) = inbound.message().await.map_err(unavailable)? {
            values.push(reply.value);
        }
        Ok(values)
    }

    async fn remove(&self, key: &[u8]) -> Result<bool, StoreApiError> {
        let mut client = self.client.clone();
        match client
            .remove(kvpb::RemoveRequest { key: key.to_vec() })
            .await
        {
            Ok(_) => Ok(true),
            Err(status) if status.code() == Code::NotFound => Ok(false),
            Err(status) => Err(unavailable(status)),
        }
    }
}
