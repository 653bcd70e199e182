//! gRPC networking layer for corvid.
//!
//! Provides:
//! - `StoreService`: bridges the store proto to [`corvid_store::SharedStore`],
//!   including the bidirectional streaming `Get`
//! - `FazService`: bridges the faz proto to [`corvid_faz::Faz`]
//! - `StoreClient`: implements [`corvid_store::StoreApi`] over tonic
//! - `build_server`: assembles both services into a tonic `Router`

pub mod client;
pub mod server;

pub use client::StoreClient;
pub use server::{build_server, FazService, StoreService};
