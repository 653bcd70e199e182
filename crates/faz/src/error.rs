//! Error taxonomy shared by dispatch and handlers.

use corvid_store::StoreApiError;

#[derive(Debug, thiserror::Error)]
pub enum FazError {
    /// A referenced entity is absent; retrying will fail the same way.
    #[error("{0}")]
    NotFound(String),
    /// A uniqueness precondition was violated.
    #[error("{0}")]
    AlreadyExists(String),
    /// Transient I/O or intermediate-state inconsistency; retry may succeed.
    #[error("{0}")]
    Unavailable(String),
    /// Caller-side validation failure.
    #[error("{0}")]
    InvalidArgument(String),
    /// Payload decode failure or broken handler assumption.
    #[error("{0}")]
    Internal(String),
}

impl From<StoreApiError> for FazError {
    fn from(e: StoreApiError) -> Self {
        FazError::Unavailable(e.to_string())
    }
}
