//! Key composition for the social catalog.
//!
//! Every handler-level entity is a key in the store; these builders are the
//! single source of truth for the key shapes.

const USER: &str = "user.";
const FOLLOWINGS: &str = "user_followings.";
const FOLLOWERS: &str = "user_followers.";
const FOLLOWING_PAIR: &str = "following_pair.";
const CAW: &str = "caw.";
const REPLY: &str = "caw_reply.";
const HASHTAG: &str = "caw_hashtag.";

/// Existence marker for a registered user.
pub fn user(username: &str) -> Vec<u8> {
    format!("{USER}{username}").into_bytes()
}

/// List of users `username` follows.
pub fn followings(username: &str) -> Vec<u8> {
    format!("{FOLLOWINGS}{username}").into_bytes()
}

/// List of users following `username`.
pub fn followers(username: &str) -> Vec<u8> {
    format!("{FOLLOWERS}{username}").into_bytes()
}

/// Uniqueness guard for a directed follow edge. The follower's name length
/// is baked in so ("ab","cd") and ("abc","d") produce distinct keys.
pub fn following_pair(follower: &str, followee: &str) -> Vec<u8> {
    format!("{FOLLOWING_PAIR}{}.{follower}.{followee}", follower.len()).into_bytes()
}

/// The serialized post record for a caw id.
pub fn caw(id: &str) -> Vec<u8> {
    format!("{CAW}{id}").into_bytes()
}

/// List of caw ids replying to `parent_id`.
pub fn replies(parent_id: &str) -> Vec<u8> {
    format!("{REPLY}{parent_id}").into_bytes()
}

/// List of caw ids whose text mentions `tag`.
pub fn hashtag(tag: &str) -> Vec<u8> {
    format!("{HASHTAG}{tag}").into_bytes()
}
