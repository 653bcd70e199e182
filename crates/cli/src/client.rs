//! Client-side wrapper over the Faz service for the caw workload.
//!
//! Packs typed requests into `Any` envelopes, fires them as events, and
//! unpacks the typed replies.

use corvid_caw::names;
use corvid_caw::EVENT_BINDINGS;
use corvid_faz::{pack, unpack};
use corvid_proto::caw as pb;
use corvid_proto::faz as fazpb;
use corvid_proto::faz::faz_client::FazClient;
use tonic::transport::Channel;
use tonic::Status;

pub struct CawClient {
    client: FazClient<Channel>,
}

impl CawClient {
    pub async fn connect(endpoint: String) -> Result<Self, tonic::transport::Error> {
        Ok(Self {
            client: FazClient::connect(endpoint).await?,
        })
    }

    /// Bind every caw function to its event type.
    pub async fn hook_all(&mut self) -> Result<(), Status> {
        for &(event_type, event_function) in EVENT_BINDINGS {
            self.client
                .hook(fazpb::HookRequest {
                    event_type,
                    event_function: event_function.to_string(),
                })
                .await?;
            println!("Hooked {} to event type {}.", event_function, event_type);
        }
        Ok(())
    }

    /// Drop every caw function binding.
    pub async fn unhook_all(&mut self) -> Result<(), Status> {
        for &(event_type, _) in EVENT_BINDINGS {
            self.client
                .unhook(fazpb::UnhookRequest { event_type })
                .await?;
            println!("Unhooked event type {}.", event_type);
        }
        Ok(())
    }

    async fn event(
        &mut self,
        event_type: pb::EventType,
        payload: prost_types::Any,
    ) -> Result<prost_types::Any, Status> {
        let reply = self
            .client
            .event(fazpb::EventRequest {
                event_type: event_type as i32,
                payload: Some(payload),
            })
            .await?;
        Ok(reply.into_inner().payload.unwrap_or_default())
    }

    pub async fn register_user(&mut self, username: &str) -> Result<(), Status> {
        let payload = pack(
            names::REGISTERUSER_REQUEST,
            &pb::RegisteruserRequest {
                username: username.to_string(),
            },
        );
        self.event(pb::EventType::RegisterUser, payload).await?;
        Ok(())
    }

    pub async fn follow(&mut self, username: &str, to_follow: &str) -> Result<(), Status> {
        let payload = pack(
            names::FOLLOW_REQUEST,
            &pb::FollowRequest {
                username: username.to_string(),
                to_follow: to_follow.to_string(),
            },
        );
        self.event(pb::EventType::Follow, payload).await?;
        Ok(())
    }

    pub async fn profile(&mut self, username: &str) -> Result<pb::ProfileReply, Status> {
        let payload = pack(
            names::PROFILE_REQUEST,
            &pb::ProfileRequest {
                username: username.to_string(),
            },
        );
        let reply = self.event(pb::EventType::Profile, payload).await?;
        unpack(&reply, names::PROFILE_REPLY).map_err(|e| Status::internal(e.to_string()))
    }

    pub async fn caw(
        &mut self,
        username: &str,
        text: &str,
        parent_id: &str,
    ) -> Result<pb::Caw, Status> {
        let payload = pack(
            names::CAW_REQUEST,
            &pb::CawRequest {
                username: username.to_string(),
                text: text.to_string(),
                parent_id: parent_id.to_string(),
            },
        );
        let reply = self.event(pb::EventType::Caw, payload).await?;
        let reply: pb::CawReply =
            unpack(&reply, names::CAW_REPLY).map_err(|e| Status::internal(e.to_string()))?;
        reply
            .caw
            .ok_or_else(|| Status::internal("reply carries no caw"))
    }

    pub async fn read(&mut self, caw_id: &str) -> Result<Vec<pb::Caw>, Status> {
        let payload = pack(
            names::READ_REQUEST,
            &pb::ReadRequest {
                caw_id: caw_id.to_string(),
            },
        );
        let reply = self.event(pb::EventType::Read, payload).await?;
        let reply: pb::ReadReply =
            unpack(&reply, names::READ_REPLY).map_err(|e| Status::internal(e.to_string()))?;
        Ok(reply.caws)
    }

    pub async fn stream(
        &mut self,
        hashtag: &str,
        since_useconds: i64,
    ) -> Result<Vec<pb::Caw>, Status> {
        let payload = pack(
            names::STREAM_REQUEST,
            &pb::StreamRequest {
                hashtag: hashtag.to_string(),
                timestamp: Some(pb::Timestamp {
                    seconds: since_useconds / 1_000_000,
                    useconds: since_useconds,
                }),
            },
        );
        let reply = self.event(pb::EventType::Stream, payload).await?;
        let reply: pb::StreamReply =
            unpack(&reply, names::STREAM_REPLY).map_err(|e| Status::internal(e.to_string()))?;
        Ok(reply.caws)
    }
}
