//! Error taxonomy for asynchronous work.
//!
//! Every effect boundary converts failures into a [`ServiceError`] carried as
//! data inside a completion action. Errors never cross the reducer boundary
//! as panics or early returns.

use std::fmt;

use thiserror::Error;

/// Errors surfaced by external collaborators (HTTP, socket, credentials).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Credentials were rejected.
    ///
    /// The only error with a cross-cutting reaction: the root feature tears
    /// down stored credentials regardless of which feature observed it.
    #[error("unauthorized")]
    Unauthorized,

    /// A required resource or precondition is missing.
    ///
    /// Terminal for the activation that observed it (e.g. no active account).
    #[error("not found")]
    NotFound,

    /// Server reported the cached copy is still current.
    #[error("not modified")]
    NotModified,

    /// Server-supplied human readable failure.
    #[error("{0}")]
    Unexpected(String),

    /// Any other transport, decoding or runtime failure.
    #[error("{0}")]
    Wrapped(String),
}

impl ServiceError {
    /// Wrap an arbitrary underlying error.
    pub fn wrap(err: impl fmt::Display) -> Self {
        Self::Wrapped(err.to_string())
    }

    /// Returns true if this error requires credential teardown.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Build an error from a caught panic payload.
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::Wrapped(format!("effect panicked: {detail}"))
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        Self::wrap(err)
    }
}
