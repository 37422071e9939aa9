//! Client error types.

use parley_core::ServiceError;
use thiserror::Error;

/// Errors raised by a [`crate::Transport`] implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Operation requires an open connection.
    #[error("not connected")]
    NotConnected,
}

/// Errors returned by the socket adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SocketError {
    /// Adapter task has exited.
    #[error("socket adapter closed")]
    Closed,

    /// Underlying transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<TransportError> for ServiceError {
    fn from(err: TransportError) -> Self {
        Self::wrap(err)
    }
}

impl From<SocketError> for ServiceError {
    fn from(err: SocketError) -> Self {
        Self::wrap(err)
    }
}
