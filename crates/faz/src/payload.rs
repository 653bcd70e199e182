//! Opaque payload envelopes.
//!
//! Events carry `google.protobuf.Any` payloads: a type URL plus bytes. The
//! dispatch layer passes them through untouched; each handler unpacks its
//! own concrete type, so new handlers never change the dispatcher.

use crate::FazError;
use prost::Message;
use prost_types::Any;

const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// Wrap `message` in an `Any` envelope under its full protobuf name
/// (e.g. `corvid.caw.FollowRequest`).
pub fn pack<M: Message>(full_name: &str, message: &M) -> Any {
    Any {
        type_url: format!("{TYPE_URL_PREFIX}{full_name}"),
        value: message.encode_to_vec(),
    }
}

/// Unpack an `Any` envelope expected to hold `full_name`.
pub fn unpack<M: Message + Default>(any: &Any, full_name: &str) -> Result<M, FazError> {
    let held = any.type_url.rsplit('/').next().unwrap_or(&any.type_url);
    if held != full_name {
        return Err(FazError::Internal(format!(
            "payload holds {:?}, expected {}",
            any.type_url, full_name
        )));
    }
    M::decode(any.value.as_slice())
        .map_err(|e| FazError::Internal(format!("failed to decode {}: {}", full_name, e)))
}
