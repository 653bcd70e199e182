//! corvid-faz: Function-as-a-Service dispatch layer.
//!
//! Clients bind integer event types to named handler functions drawn from a
//! static registry, then dispatch opaque payloads through them with shared
//! access to the store. The dispatcher is schema-agnostic: payloads are
//! `Any` envelopes only their handler knows how to unpack.

pub mod dispatch;
pub mod error;
pub mod payload;

pub use dispatch::{Faz, HandlerFn, HandlerFuture, Registry};
pub use error::FazError;
pub use payload::{pack, unpack};
