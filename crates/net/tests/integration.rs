//! Integration test: spin up the store and faz services with real gRPC,
//! then drive the store shim and the caw workload through them.

use corvid_caw::names;
use corvid_faz::{pack, unpack, Faz};
use corvid_net::{build_server, StoreClient};
use corvid_proto::caw as pb;
use corvid_proto::faz as fazpb;
use corvid_proto::faz::faz_client::FazClient;
use corvid_store::{KvStore, SharedStore, StoreApi, SyncPolicy};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::Duration;
use tonic::transport::Channel;
use tonic::Code;

struct TestServer {
    addr: SocketAddr,
    _dir: tempfile::TempDir,
}

async fn spawn_server(port: u16) -> TestServer {
    let addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();

    let dir = tempfile::TempDir::new().unwrap();
    let store = KvStore::open(&dir.path().join("caw.db"), SyncPolicy::None).unwrap();
    let shared = SharedStore::new(store);

    let faz = Arc::new(Faz::new(
        Arc::new(shared.clone()),
        corvid_caw::REGISTRY,
    ));
    let router = build_server(shared, faz);

    tokio::spawn(async move {
        router.serve(addr).await.unwrap();
    });

    // Wait for server to be ready
    tokio::time::sleep(Duration::from_millis(100)).await;

    TestServer { addr, _dir: dir }
}

async fn faz_client(addr: SocketAddr) -> FazClient<Channel> {
    FazClient::connect(format!("http://{}", addr)).await.unwrap()
}

async fn hook_all(client: &mut FazClient<Channel>) {
    for &(event_type, event_function) in corvid_caw::EVENT_BINDINGS {
        client
            .hook(fazpb::HookRequest {
                event_type,
                event_function: event_function.to_string(),
            })
            .await
            .unwrap();
    }
}

async fn send_event(
    client: &mut FazClient<Channel>,
    event_type: pb::EventType,
    payload: prost_types::Any,
) -> Result<prost_types::Any, tonic::Status> {
    let reply = client
        .event(fazpb::EventRequest {
            event_type: event_type as i32,
            payload: Some(payload),
        })
        .await?;
    Ok(reply.into_inner().payload.unwrap_or_default())
}

async fn register(client: &mut FazClient<Channel>, username: &str) -> Result<(), tonic::Status> {
    let payload = pack(
        names::REGISTERUSER_REQUEST,
        &pb::RegisteruserRequest {
            username: username.to_string(),
        },
    );
    send_event(client, pb::EventType::RegisterUser, payload).await?;
    Ok(())
}

#[tokio::test]
async fn test_store_rpc_put_get_remove() {
    let server = spawn_server(18100).await;
    let store = StoreClient::connect(format!("http://{}", server.addr))
        .await
        .unwrap();

    store.put(b"k", b"v1").await.unwrap();
    store.put(b"k", b"v2").await.unwrap();

    let values = store.get(b"k").await.unwrap();
    assert_eq!(values, vec![b"v1".to_vec(), b"v2".to_vec()]);

    assert!(store.get(b"missing").await.unwrap().is_empty());

    assert!(store.remove(b"k").await.unwrap());
    assert!(!store.remove(b"k").await.unwrap(), "second remove is NotFound");
    assert!(store.get(b"k").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_store_rpc_binary_payloads() {
    let server = spawn_server(18110).await;
    let store = StoreClient::connect(format!("http://{}", server.addr))
        .await
        .unwrap();

    let key = vec![0x00u8, 0xff, b'\n'];
    let value = vec![0x80u8; 300];
    store.put(&key, &value).await.unwrap();
    store.put(b"", b"").await.unwrap();

    assert_eq!(store.get(&key).await.unwrap(), vec![value]);
    assert_eq!(store.get(b"").await.unwrap(), vec![b"".to_vec()]);
}

#[tokio::test]
async fn test_hook_unknown_function_is_not_found() {
    let server = spawn_server(18120).await;
    let mut client = faz_client(server.addr).await;

    let status = client
        .hook(fazpb::HookRequest {
            event_type: 0,
            event_function: "Shout".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn test_event_without_hook_is_not_found() {
    let server = spawn_server(18130).await;
    let mut client = faz_client(server.addr).await;

    let payload = pack(
        names::REGISTERUSER_REQUEST,
        &pb::RegisteruserRequest {
            username: "eren".to_string(),
        },
    );
    let status = send_event(&mut client, pb::EventType::RegisterUser, payload)
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn test_unhook_then_event_fails() {
    let server = spawn_server(18140).await;
    let mut client = faz_client(server.addr).await;
    hook_all(&mut client).await;

    client
        .unhook(fazpb::UnhookRequest {
            event_type: pb::EventType::RegisterUser as i32,
        })
        .await
        .unwrap();

    let status = register(&mut client, "eren").await.unwrap_err();
    assert_eq!(status.code(), Code::NotFound);

    // Unhooking twice is NotFound too.
    let status = client
        .unhook(fazpb::UnhookRequest {
            event_type: pb::EventType::RegisterUser as i32,
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn test_register_and_follow_flow() {
    let server = spawn_server(18150).await;
    let mut client = faz_client(server.addr).await;
    hook_all(&mut client).await;

    register(&mut client, "eren").await.unwrap();
    let status = register(&mut client, "eren").await.unwrap_err();
    assert_eq!(status.code(), Code::AlreadyExists);

    register(&mut client, "mikasa").await.unwrap();

    let follow = pack(
        names::FOLLOW_REQUEST,
        &pb::FollowRequest {
            username: "mikasa".to_string(),
            to_follow: "eren".to_string(),
        },
    );
    send_event(&mut client, pb::EventType::Follow, follow.clone())
        .await
        .unwrap();
    let status = send_event(&mut client, pb::EventType::Follow, follow)
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::AlreadyExists);

    let profile = pack(
        names::PROFILE_REQUEST,
        &pb::ProfileRequest {
            username: "eren".to_string(),
        },
    );
    let reply = send_event(&mut client, pb::EventType::Profile, profile)
        .await
        .unwrap();
    let reply: pb::ProfileReply = unpack(&reply, names::PROFILE_REPLY).unwrap();
    assert_eq!(reply.followers, vec!["mikasa"]);
    assert!(reply.following.is_empty());
}

#[tokio::test]
async fn test_caw_read_stream_flow() {
    let server = spawn_server(18160).await;
    let mut client = faz_client(server.addr).await;
    hook_all(&mut client).await;

    register(&mut client, "sasha").await.unwrap();

    let post = pack(
        names::CAW_REQUEST,
        &pb::CawRequest {
            username: "sasha".to_string(),
            text: "fresh #bread #bread from the oven".to_string(),
            parent_id: String::new(),
        },
    );
    let reply = send_event(&mut client, pb::EventType::Caw, post).await.unwrap();
    let reply: pb::CawReply = unpack(&reply, names::CAW_REPLY).unwrap();
    let root = reply.caw.unwrap();
    assert!(!root.id.is_empty());

    let reply_post = pack(
        names::CAW_REQUEST,
        &pb::CawRequest {
            username: "sasha".to_string(),
            text: "still warm".to_string(),
            parent_id: root.id.clone(),
        },
    );
    let reply = send_event(&mut client, pb::EventType::Caw, reply_post)
        .await
        .unwrap();
    let reply: pb::CawReply = unpack(&reply, names::CAW_REPLY).unwrap();
    let child = reply.caw.unwrap();

    let read = pack(
        names::READ_REQUEST,
        &pb::ReadRequest {
            caw_id: root.id.clone(),
        },
    );
    let reply = send_event(&mut client, pb::EventType::Read, read).await.unwrap();
    let reply: pb::ReadReply = unpack(&reply, names::READ_REPLY).unwrap();
    let ids: Vec<&str> = reply.caws.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec![root.id.as_str(), child.id.as_str()]);

    let stream = pack(
        names::STREAM_REQUEST,
        &pb::StreamRequest {
            hashtag: "bread".to_string(),
            timestamp: Some(pb::Timestamp {
                seconds: 0,
                useconds: 0,
            }),
        },
    );
    let reply = send_event(&mut client, pb::EventType::Stream, stream)
        .await
        .unwrap();
    let reply: pb::StreamReply = unpack(&reply, names::STREAM_REPLY).unwrap();
    assert_eq!(reply.caws.len(), 1, "duplicated hashtag appears once");
    assert_eq!(reply.caws[0].id, root.id);

    let cursor = reply.caws[0].timestamp.as_ref().unwrap().useconds;
    let drained = pack(
        names::STREAM_REQUEST,
        &pb::StreamRequest {
            hashtag: "bread".to_string(),
            timestamp: Some(pb::Timestamp {
                seconds: cursor / 1_000_000,
                useconds: cursor,
            }),
        },
    );
    let reply = send_event(&mut client, pb::EventType::Stream, drained)
        .await
        .unwrap();
    let reply: pb::StreamReply = unpack(&reply, names::STREAM_REPLY).unwrap();
    assert!(reply.caws.is_empty());
}

#[tokio::test]
async fn test_caw_requires_registered_author() {
    let server = spawn_server(18170).await;
    let mut client = faz_client(server.addr).await;
    hook_all(&mut client).await;

    let post = pack(
        names::CAW_REQUEST,
        &pb::CawRequest {
            username: "stranger".to_string(),
            text: "hello".to_string(),
            parent_id: String::new(),
        },
    );
    let status = send_event(&mut client, pb::EventType::Caw, post)
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn test_handlers_share_store_with_rpc_shim() {
    let server = spawn_server(18180).await;
    let mut client = faz_client(server.addr).await;
    hook_all(&mut client).await;

    register(&mut client, "connie").await.unwrap();

    // The handler's write is visible through the store RPC surface.
    let store = StoreClient::connect(format!("http://{}", server.addr))
        .await
        .unwrap();
    let values = store.get(b"user.connie").await.unwrap();
    assert_eq!(values, vec![b"".to_vec()]);
}
