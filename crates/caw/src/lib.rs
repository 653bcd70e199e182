//! corvid-caw: the social-application handlers.
//!
//! Stateless functions over the store implementing registration, follows,
//! profiles, posting, thread reads, and hashtag streaming. All state is
//! key composition over the multi-value store.

pub mod handler;
pub mod hashtag;
pub mod keys;
pub mod names;

pub use handler::{EVENT_BINDINGS, REGISTRY};
