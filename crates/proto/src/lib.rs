//! Generated gRPC code for corvid protobuf definitions.

/// Key-value store service (Put, Get, Remove).
pub mod kvstore {
    tonic::include_proto!("corvid.kvstore");
}

/// Faz service (Hook, Unhook, Event).
pub mod faz {
    tonic::include_proto!("corvid.faz");
}

/// Caw payload types, the post record, and the event-type enumeration.
pub mod caw {
    tonic::include_proto!("corvid.caw");
}
