//! UseCase error types.

use thiserror::Error;

use crate::domain::{RepositoryError, SessionError};

/// Authentication failures, reported to the offending connection only
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The connection's outbound channel is gone
    #[error("connection closed during authentication")]
    ConnectionClosed,
}

/// Message sending failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("failed to store message: {0}")]
    Storage(#[from] RepositoryError),
}
