//! The social-application handlers.
//!
//! Each handler unpacks a typed request from the opaque event payload,
//! reads or mutates the store through the well-known keys, and packs a
//! typed reply. Handlers are stateless; all state lives in the store.

use crate::names::*;
use crate::{hashtag, keys};
use corvid_faz::{pack, unpack, FazError, HandlerFuture, Registry};
use corvid_proto::caw as pb;
use corvid_store::StoreApi;
use prost::Message;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Handlers known to the dispatch layer, by the names clients hook with.
pub const REGISTRY: Registry = &[
    ("RegisterUser", register_user),
    ("Follow", follow),
    ("Profile", profile),
    ("Caw", post_caw),
    ("Read", read_thread),
    ("Stream", stream_hashtag),
];

/// Event-type wire numbers and the handler names they are hooked to.
pub const EVENT_BINDINGS: &[(i32, &str)] = &[
    (pb::EventType::RegisterUser as i32, "RegisterUser"),
    (pb::EventType::Follow as i32, "Follow"),
    (pb::EventType::Profile as i32, "Profile"),
    (pb::EventType::Caw as i32, "Caw"),
    (pb::EventType::Read as i32, "Read"),
    (pb::EventType::Stream as i32, "Stream"),
];

async fn user_exists(username: &str, store: &dyn StoreApi) -> Result<bool, FazError> {
    Ok(!store.get(&keys::user(username)).await?.is_empty())
}

async fn caw_exists(id: &str, store: &dyn StoreApi) -> Result<bool, FazError> {
    Ok(!store.get(&keys::caw(id)).await?.is_empty())
}

fn text(value: Vec<u8>) -> String {
    String::from_utf8_lossy(&value).into_owned()
}

fn micros_since_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as i64
}

/// `<microseconds>-<4 hex>`: naturally time-ordered, with enough randomness
/// to avoid collisions at low posting rates.
fn new_caw_id(us: i64) -> String {
    let quartet: u16 = rand::thread_rng().gen();
    format!("{}-{:04x}", us, quartet)
}

/// Registers a username. Fails `AlreadyExists` if it is taken.
pub fn register_user(payload: prost_types::Any, store: Arc<dyn StoreApi>) -> HandlerFuture {
    Box::pin(async move {
        let request: pb::RegisteruserRequest = unpack(&payload, REGISTERUSER_REQUEST)?;
        if user_exists(&request.username, store.as_ref()).await? {
            return Err(FazError::AlreadyExists("user already exists".into()));
        }
        store.put(&keys::user(&request.username), b"").await?;
        Ok(pack(REGISTERUSER_REPLY, &pb::RegisteruserReply {}))
    })
}

/// Makes `username` follow `to_follow`. Fails `NotFound` if either user is
/// unregistered and `AlreadyExists` if the edge is already present.
pub fn follow(payload: prost_types::Any, store: Arc<dyn StoreApi>) -> HandlerFuture {
    Box::pin(async move {
        let request: pb::FollowRequest = unpack(&payload, FOLLOW_REQUEST)?;
        let username = &request.username;
        let to_follow = &request.to_follow;
        if !user_exists(username, store.as_ref()).await?
            || !user_exists(to_follow, store.as_ref()).await?
        {
            return Err(FazError::NotFound("user not found".into()));
        }
        let pair = keys::following_pair(username, to_follow);
        if !store.get(&pair).await?.is_empty() {
            return Err(FazError::AlreadyExists(
                "user is already following the followee".into(),
            ));
        }
        // Three dependent writes with no transactional envelope: a failure
        // part-way leaves the earlier entries in place and surfaces as
        // Unavailable.
        store.put(&pair, b"").await?;
        if let Err(e) = store.put(&keys::followings(username), to_follow.as_bytes()).await {
            tracing::error!(
                "stored follow pair but failed to update followings: username={}, to_follow={}",
                username,
                to_follow
            );
            return Err(e.into());
        }
        if let Err(e) = store.put(&keys::followers(to_follow), username.as_bytes()).await {
            tracing::error!(
                "updated followings but failed to update followers: username={}, to_follow={}",
                username,
                to_follow
            );
            return Err(e.into());
        }
        Ok(pack(FOLLOW_REPLY, &pb::FollowReply {}))
    })
}

/// Returns who `username` follows and who follows them.
pub fn profile(payload: prost_types::Any, store: Arc<dyn StoreApi>) -> HandlerFuture {
    Box::pin(async move {
        let request: pb::ProfileRequest = unpack(&payload, PROFILE_REQUEST)?;
        if !user_exists(&request.username, store.as_ref()).await? {
            return Err(FazError::NotFound("user not found".into()));
        }
        let following = store
            .get(&keys::followings(&request.username))
            .await?
            .into_iter()
            .map(text)
            .collect();
        let followers = store
            .get(&keys::followers(&request.username))
            .await?
            .into_iter()
            .map(text)
            .collect();
        Ok(pack(
            PROFILE_REPLY,
            &pb::ProfileReply {
                following,
                followers,
            },
        ))
    })
}

/// Posts a caw, optionally as a reply, and files it under each unique
/// hashtag in its text.
pub fn post_caw(payload: prost_types::Any, store: Arc<dyn StoreApi>) -> HandlerFuture {
    Box::pin(async move {
        let request: pb::CawRequest = unpack(&payload, CAW_REQUEST)?;
        if !user_exists(&request.username, store.as_ref()).await? {
            return Err(FazError::NotFound("user not found".into()));
        }
        if !request.parent_id.is_empty() && !caw_exists(&request.parent_id, store.as_ref()).await? {
            return Err(FazError::NotFound(format!(
                "caw {} to reply to not found",
                request.parent_id
            )));
        }

        let us = micros_since_epoch();
        let id = new_caw_id(us);
        let caw = pb::Caw {
            username: request.username.clone(),
            text: request.text.clone(),
            id: id.clone(),
            parent_id: request.parent_id.clone(),
            timestamp: Some(pb::Timestamp {
                seconds: us / 1_000_000,
                useconds: us,
            }),
        };

        store.put(&keys::caw(&id), &caw.encode_to_vec()).await?;
        if !request.parent_id.is_empty() {
            store
                .put(&keys::replies(&request.parent_id), id.as_bytes())
                .await?;
        }
        for tag in hashtag::extract(&request.text) {
            store.put(&keys::hashtag(&tag), id.as_bytes()).await?;
        }

        Ok(pack(CAW_REPLY, &pb::CawReply { caw: Some(caw) }))
    })
}

/// Reads the thread rooted at a caw id in breadth-first order.
pub fn read_thread(payload: prost_types::Any, store: Arc<dyn StoreApi>) -> HandlerFuture {
    Box::pin(async move {
        let request: pb::ReadRequest = unpack(&payload, READ_REQUEST)?;
        if !caw_exists(&request.caw_id, store.as_ref()).await? {
            return Err(FazError::NotFound(format!(
                "caw {} not found",
                request.caw_id
            )));
        }

        // Explicit queue; reply depth is unbounded by user input.
        let mut caws = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(request.caw_id.clone());
        while let Some(current) = queue.pop_front() {
            let values = store.get(&keys::caw(&current)).await?;
            let caw = match values.as_slice() {
                [value] => pb::Caw::decode(value.as_slice()).map_err(|e| {
                    tracing::error!("error decoding caw {}: {}", current, e);
                    FazError::Unavailable(format!("error reading caw {}", current))
                })?,
                _ => {
                    tracing::error!(
                        "error finding caw {}: {} record(s) found, expected 1",
                        current,
                        values.len()
                    );
                    return Err(FazError::Unavailable(format!(
                        "error reading caw {}",
                        current
                    )));
                }
            };
            for reply_id in store.get(&keys::replies(&current)).await? {
                queue.push_back(text(reply_id));
            }
            caws.push(caw);
        }

        Ok(pack(READ_REPLY, &pb::ReadReply { caws }))
    })
}

/// Returns caws in a hashtag bucket newer than the request's cursor.
/// Undecodable bucket entries are logged and skipped.
pub fn stream_hashtag(payload: prost_types::Any, store: Arc<dyn StoreApi>) -> HandlerFuture {
    Box::pin(async move {
        let request: pb::StreamRequest = unpack(&payload, STREAM_REQUEST)?;
        let since = request.timestamp.map(|t| t.useconds).unwrap_or(0);

        let mut caws = Vec::new();
        for id in store.get(&keys::hashtag(&request.hashtag)).await? {
            let id = text(id);
            let values = store.get(&keys::caw(&id)).await?;
            let [value] = values.as_slice() else {
                tracing::error!(
                    "error finding caw {}: {} record(s) found, expected 1",
                    id,
                    values.len()
                );
                continue;
            };
            match pb::Caw::decode(value.as_slice()) {
                Ok(caw) => {
                    let useconds = caw.timestamp.as_ref().map(|t| t.useconds).unwrap_or(0);
                    if useconds > since {
                        caws.push(caw);
                    }
                }
                Err(e) => tracing::error!("error decoding caw {}: {}", id, e),
            }
        }

        Ok(pack(STREAM_REPLY, &pb::StreamReply { caws }))
    })
}
