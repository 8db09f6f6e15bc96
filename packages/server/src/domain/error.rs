//! Domain error types.

use thiserror::Error;

/// Value object construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("'{0}' is not a valid UUID")]
    InvalidUuid(String),
}

/// Connection session state machine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The session is already bound to a user and room
    #[error("connection is already authenticated")]
    AlreadyBound,

    /// A room-scoped operation was attempted before authentication
    #[error("connection is not authenticated")]
    Unauthenticated,
}

/// Repository errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("storage failure: {0}")]
    StorageFailure(String),
}
